use std::sync::Arc;

use crate::database::LogStore;

/// Shared by every request for the lifetime of the process.
pub struct AppState {
    pub store: Arc<dyn LogStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn LogStore>) -> Arc<Self> {
        Arc::new(Self { store })
    }
}
