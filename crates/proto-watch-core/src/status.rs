//! ---
//! pw_section: "01-core-functionality"
//! pw_subsection: "module"
//! pw_type: "source"
//! pw_scope: "code"
//! pw_description: "Primary watch pipeline and generation lifecycle."
//! pw_version: "v0.1.0"
//! pw_owner: "tbd"
//! ---
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

pub const INITIAL_STATUS: &str = "Watching for changes...";

/// Single status line shared between the pipeline and the display.
///
/// Holds only the latest message; there is no history.
#[derive(Debug, Clone)]
pub struct StatusBoard {
    inner: Arc<Mutex<String>>,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBoard {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(INITIAL_STATUS.to_owned())),
        }
    }

    pub fn get(&self) -> String {
        self.inner.lock().clone()
    }

    pub fn set(&self, status: impl Into<String>) {
        *self.inner.lock() = status.into();
    }

    pub fn file_changed(&self, path: &Path) {
        self.set(format!("File changed: {}", path.display()));
    }
}
