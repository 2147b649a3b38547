pub mod download;
pub mod error;
pub mod resolve;

pub use download::{AssetFetcher, FetchSettings, FetchedAssets};
pub use error::{FetchError, Result};
pub use resolve::{resolve, ResolvedAssets};
