use std::path::Path;

use crate::models::config::Transform;
use crate::models::error::ReaderError;
use crate::models::time::MediaTime;

/// Container-level facts about a finished asset.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetInfo {
    pub duration: MediaTime,
    pub frame_rate: f64,
    pub orientation: Transform,
}

/// Probes finished container files for metadata and rendered frames.
///
/// Backs `Clip`'s memoized derived properties; implementations may be as
/// heavyweight as a full demux, which is why results are cached per clip.
pub trait AssetInspector: Send + Sync {
    fn probe(&self, path: &Path) -> Result<AssetInfo, ReaderError>;

    /// Render the frame at `at` as encoded image bytes.
    fn frame_image(&self, path: &Path, at: MediaTime) -> Result<Vec<u8>, ReaderError>;
}
