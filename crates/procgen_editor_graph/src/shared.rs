// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared handle for multi-threaded hosts.
//!
//! Every [`Designer`] operation assumes exclusive access, so the whole
//! designer sits behind one mutex. Resource loads do not need the lock:
//! their [`ResourceCompleter`](crate::resource::ResourceCompleter)s are
//! `Send` on their own.

use crate::designer::Designer;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// Cloneable, thread-safe handle to one designer
#[derive(Debug, Clone, Default)]
pub struct SharedDesigner {
    inner: Arc<Mutex<Designer>>,
}

impl SharedDesigner {
    /// Wrap a designer
    pub fn new(designer: Designer) -> Self {
        Self {
            inner: Arc::new(Mutex::new(designer)),
        }
    }

    /// Lock the designer for a sequence of operations
    pub fn lock(&self) -> MutexGuard<'_, Designer> {
        self.inner.lock()
    }

    /// Run `f` with the designer locked
    pub fn with<R>(&self, f: impl FnOnce(&mut Designer) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

impl From<Designer> for SharedDesigner {
    fn from(designer: Designer) -> Self {
        Self::new(designer)
    }
}
