pub mod config;
pub mod error;
pub mod pipeline;
pub mod routes;
pub mod state;

pub use config::{ConfigError, Preset, ServerConfig};
pub use error::ExportError;
pub use pipeline::{ExportSettings, Exporter};
pub use routes::router;
pub use state::AppState;
