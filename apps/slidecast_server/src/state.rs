use std::sync::Arc;

use crate::pipeline::Exporter;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub exporter: Arc<Exporter>,
}

impl AppState {
    pub fn new(exporter: Exporter) -> Self {
        Self {
            exporter: Arc::new(exporter),
        }
    }
}
