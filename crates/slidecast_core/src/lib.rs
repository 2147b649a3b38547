pub mod caption;
pub mod error;
pub mod settings;
pub mod types;
pub mod workspace;

pub use error::{CoreError, Result};
pub use settings::RenderSettings;
pub use types::{
    AssetKind, AssetReference, CaptionRecord, ConcatenatedVideo, ExportRequest, FinalArtifact, Segment,
};
pub use workspace::Workspace;
