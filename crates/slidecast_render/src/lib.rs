pub mod concat;
pub mod encode;
pub mod engine;
pub mod error;
pub mod mux;
pub mod probe;
pub mod segment;

pub use concat::concatenate;
pub use encode::{encode_artifact, EncodedVideo, MP4_MEDIA_TYPE};
pub use engine::{EngineJob, FfmpegEngine, MediaEngine, Stage};
pub use error::{EngineFailure, RenderError, Result};
pub use mux::mux_audio;
pub use probe::MediaProbe;
pub use segment::render_segments;
