// SPDX-License-Identifier: MIT OR Apache-2.0
//! `procgen` - command line front end for procedural texture graphs.
//!
//! Loads graph documents, applies variable overrides, drains the update
//! worklist with a flat-color preview renderer and reports the result.

mod cli;
mod preview;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Command, UpdateArgs};
use preview::{to_hex, FlatColorRenderer};
use procgen_editor_graph::{
    create_builtin_registry, Designer, DesignerDocument, DesignerSettings, PropertyKind, PropertyValue, Variable,
};
use std::path::Path;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(cli.log_level().into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("procgen v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(cli.command) {
        tracing::error!("{e:#}");
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Update(args) => update(&args),
        Command::Inspect { graph } => inspect(&graph),
        Command::Convert { input, output } => convert(&input, &output),
        Command::Types => {
            list_types();
            Ok(())
        }
    }
}

fn read_document(path: &Path) -> Result<DesignerDocument> {
    DesignerDocument::load_from_file(path).with_context(|| format!("Failed to read graph {}", path.display()))
}

fn update(args: &UpdateArgs) -> Result<()> {
    let settings = match &args.settings {
        Some(path) => DesignerSettings::load(path)
            .with_context(|| format!("Failed to read settings {}", path.display()))?,
        None => DesignerSettings::default(),
    };
    let document = read_document(&args.graph)?;
    let registry = create_builtin_registry();
    let mut designer = Designer::load(&document, &registry, settings).context("Failed to build graph")?;

    for assignment in &args.set {
        let (name, text) = assignment
            .split_once('=')
            .with_context(|| format!("Expected NAME=VALUE, got '{assignment}'"))?;
        let Some(kind) = designer.variable(name).map(Variable::kind) else {
            bail!("Unknown variable '{name}'");
        };
        let value = parse_value(kind, text)?;
        let nodes = designer.set_variable(name, value)?;
        tracing::info!(variable = name, nodes, "Variable overridden");
    }

    let mut renderer = FlatColorRenderer::default();
    let report = designer.update(&mut renderer).context("Update failed")?;

    for node in designer.nodes() {
        let output = match node.output_value() {
            Some(value) => value.to_display_string(),
            None => renderer.color(node.id).map(to_hex).unwrap_or_else(|| "-".to_string()),
        };
        let state = if node.needs_update() { "dirty" } else { "clean" };
        println!("{:<14} {:<5} {:>11} {}  {}", node.type_name, state, node.size().to_string(), output, node.id);
    }
    println!(
        "{} rendered, {} waiting, {} failed",
        report.rendered.len(),
        report.waiting.len(),
        report.failed.len()
    );

    if let Some(out) = &args.out {
        designer
            .save()
            .save_to_file(out)
            .with_context(|| format!("Failed to write {}", out.display()))?;
    }
    Ok(())
}

fn inspect(path: &Path) -> Result<()> {
    let document = read_document(path)?;
    let registry = create_builtin_registry();
    let designer = Designer::load(&document, &registry, DesignerSettings::default()).context("Failed to build graph")?;

    println!("Nodes ({}):", designer.graph().node_count());
    for node in designer.nodes() {
        println!("  {} {} \"{}\" at ({}, {})", node.id, node.type_name, node.title, node.position[0], node.position[1]);
        for property in node.properties() {
            let marker = if property.is_exposed() { "*" } else { " " };
            println!(
                "    {marker}{} = {}",
                property.name,
                property.value().to_display_string()
            );
        }
    }

    println!("Connections ({}):", designer.graph().connection_count());
    for connection in designer.graph().connections() {
        let left = designer.node(connection.left_node_id).map_or("?", |n| n.type_name.as_str());
        let right = designer.node(connection.right_node_id).map_or("?", |n| n.type_name.as_str());
        let output = if connection.left_output_name.is_empty() {
            "out"
        } else {
            connection.left_output_name.as_str()
        };
        println!("  {left}.{output} -> {right}.{}", connection.right_input_name);
    }

    println!("Variables ({}):", designer.variables().len());
    for variable in designer.variables().iter() {
        println!(
            "  {} : {} = {} ({} binding(s))",
            variable.name,
            variable.kind(),
            variable.value().to_display_string(),
            variable.bindings().len()
        );
    }
    Ok(())
}

fn convert(input: &Path, output: &Path) -> Result<()> {
    let document = read_document(input)?;
    document
        .save_to_file(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Converted {} -> {}", input.display(), output.display());
    Ok(())
}

fn list_types() {
    let registry = create_builtin_registry();
    for node_type in registry.types() {
        let category = format!("{:?}", node_type.category);
        println!("{:<14} {:<10} {}", node_type.type_name, category, node_type.description);
    }
}

/// Parse a command line value for a variable of `kind`.
///
/// Accepts JSON (`4`, `true`, `[1, 0, 0, 1]`, `"text"`). Text kinds also
/// take the raw argument when it is not a JSON string.
fn parse_value(kind: PropertyKind, text: &str) -> Result<PropertyValue> {
    let json: serde_json::Value =
        serde_json::from_str(text).unwrap_or_else(|_| serde_json::Value::String(text.to_string()));

    let value = match kind {
        PropertyKind::Float => json.as_f64().map(|v| PropertyValue::Float(v as f32)),
        PropertyKind::Int => json.as_i64().map(|v| PropertyValue::Int(v as i32)),
        PropertyKind::Bool => json.as_bool().map(PropertyValue::Bool),
        PropertyKind::Enum => json.as_u64().map(|v| PropertyValue::Enum(v as usize)),
        PropertyKind::String => Some(PropertyValue::String(json.as_str().unwrap_or(text).to_string())),
        PropertyKind::Asset => Some(PropertyValue::Asset(json.as_str().unwrap_or(text).to_string())),
        PropertyKind::File => Some(PropertyValue::File(json.as_str().unwrap_or(text).to_string())),
        PropertyKind::Color => serde_json::from_value::<[f32; 4]>(json).ok().map(PropertyValue::Color),
        PropertyKind::Vector2 => serde_json::from_value::<[f32; 2]>(json).ok().map(PropertyValue::Vector2),
        PropertyKind::Gradient | PropertyKind::Transform2D => serde_json::from_value::<PropertyValue>(json)
            .ok()
            .filter(|v| v.kind() == kind),
    };
    value.with_context(|| format!("'{text}' is not a valid {kind} value"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value(PropertyKind::Float, "4").unwrap(), PropertyValue::Float(4.0));
        assert_eq!(parse_value(PropertyKind::Int, "-3").unwrap(), PropertyValue::Int(-3));
        assert_eq!(parse_value(PropertyKind::Bool, "true").unwrap(), PropertyValue::Bool(true));
        assert_eq!(
            parse_value(PropertyKind::Color, "[1, 0, 0.5, 1]").unwrap(),
            PropertyValue::Color([1.0, 0.0, 0.5, 1.0])
        );
        assert_eq!(
            parse_value(PropertyKind::String, "hello").unwrap(),
            PropertyValue::String("hello".into())
        );
        assert!(parse_value(PropertyKind::Int, "1.5").is_err());
        assert!(parse_value(PropertyKind::Vector2, "[1]").is_err());
    }

    #[test]
    fn test_update_writes_output() {
        let registry = create_builtin_registry();
        let mut designer = Designer::default();
        let color = designer.add_node(registry.create_node("color").unwrap(), true).unwrap();
        let invert = designer.add_node(registry.create_node("invert").unwrap(), true).unwrap();
        designer.add_connection(color, invert, "color").unwrap();
        designer.define_variable("tint", "Tint", PropertyKind::Color).unwrap();
        designer.bind_variable("tint", color, "color").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let graph = dir.path().join("graph.ron");
        let out = dir.path().join("out.json");
        designer.save().save_to_file(&graph).unwrap();

        update(&UpdateArgs {
            graph,
            settings: None,
            set: vec!["tint=[1, 0, 0, 1]".to_string()],
            out: Some(out.clone()),
        })
        .unwrap();

        let saved = DesignerDocument::load_from_file(&out).unwrap();
        let loaded = Designer::load(&saved, &registry, DesignerSettings::default()).unwrap();
        assert_eq!(loaded.evaluate(color, "color"), Some(PropertyValue::Color([1.0, 0.0, 0.0, 1.0])));
        assert!(loaded.node(invert).is_some());
    }

    #[test]
    fn test_unknown_variable_fails() {
        let dir = tempfile::tempdir().unwrap();
        let graph = dir.path().join("graph.json");
        Designer::default().save().save_to_file(&graph).unwrap();

        let err = update(&UpdateArgs {
            graph,
            settings: None,
            set: vec!["missing=1".to_string()],
            out: None,
        })
        .unwrap_err();
        assert!(err.to_string().contains("Unknown variable"));
    }

    #[test]
    fn test_convert_ron_to_json() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("graph.ron");
        let output = dir.path().join("graph.json");
        let registry = create_builtin_registry();
        let mut designer = Designer::default();
        designer.add_node(registry.create_node("noise").unwrap(), true).unwrap();
        designer.save().save_to_file(&input).unwrap();

        convert(&input, &output).unwrap();
        assert_eq!(
            DesignerDocument::load_from_file(&output).unwrap(),
            DesignerDocument::load_from_file(&input).unwrap()
        );
    }
}
