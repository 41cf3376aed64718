use std::path::Path;

use crate::models::buffer::{FormatDescription, MediaKind, TimedBuffer};
use crate::models::clip::Clip;
use crate::models::config::Transform;
use crate::models::error::{ExportError, ReaderError};
use crate::models::time::{MediaTime, TimeRange};

/// Handle to a readable track.
pub type TrackId = usize;

/// Container reader status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderStatus {
    Idle,
    Reading,
    Completed,
    Failed,
    Cancelled,
}

/// One decodable track in a source asset.
#[derive(Debug, Clone)]
pub struct TrackInfo {
    pub id: TrackId,
    pub kind: MediaKind,
    pub format: FormatDescription,
    pub transform: Transform,
}

/// Interface presented by the external decoder/container demuxer.
///
/// Pull-based: each `copy_next_sample` call decodes and hands back one
/// buffer, or `None` when the track is exhausted. Per-track ordering is
/// guaranteed by the reader; cross-track interleaving is the caller's choice.
pub trait MediaReader: Send {
    fn tracks(&self) -> Vec<TrackInfo>;

    /// Total duration of the readable range.
    fn duration(&self) -> MediaTime;

    /// Begin decoding. Returns `false` if the reader cannot start.
    fn start_reading(&mut self) -> bool;

    fn copy_next_sample(&mut self, track: TrackId) -> Option<TimedBuffer>;

    fn status(&self) -> ReaderStatus;

    fn error(&self) -> Option<ReaderError>;

    /// Flip to `Cancelled`; in-flight pulls complete first (polled, not
    /// preemptive).
    fn cancel_reading(&mut self);
}

/// Opens readers over on-disk assets and clip compositions.
pub trait AssetLibrary: Send + Sync {
    /// Open a reader over `path`, optionally constrained to `range`.
    fn open(&self, path: &Path, range: Option<TimeRange>) -> Result<Box<dyn MediaReader>, ExportError>;

    /// Build a reader over the end-to-end concatenation of `clips`,
    /// preserving each clip's orientation transform.
    fn compose(&self, clips: &[Clip]) -> Result<Box<dyn MediaReader>, ExportError>;
}
