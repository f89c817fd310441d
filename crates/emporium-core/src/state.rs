//! Application state shared with the command layer

use parking_lot::RwLock;
use std::sync::Arc;

use crate::console::Console;
use crate::error::CoreError;
use crate::Result;

/// Thread-safe holder for the console; empty until installed and after shutdown.
#[derive(Clone, Default)]
pub struct AppState {
    console: Arc<RwLock<Option<Console>>>,
}

impl AppState {
    pub fn new(console: Console) -> Self {
        Self {
            console: Arc::new(RwLock::new(Some(console))),
        }
    }

    pub fn install(&self, console: Console) {
        if let Some(previous) = self.console.write().replace(console) {
            previous.dispose();
        }
    }

    /// A handle to the console. Handles share state, so the lock is not held
    /// while a command awaits.
    pub fn console(&self) -> Result<Console> {
        self.console
            .read()
            .as_ref()
            .cloned()
            .ok_or(CoreError::NotInitialized)
    }

    pub fn shutdown(&self) {
        if let Some(console) = self.console.write().take() {
            console.dispose();
            tracing::info!("Console shut down");
        }
    }
}
