use std::path::Path;

use crate::models::buffer::{Dimensions, FormatDescription, MediaKind, TimedBuffer};
use crate::models::config::EncoderSettings;
use crate::models::error::WriterError;
use crate::models::time::MediaTime;

/// Handle to an input track added to a writer.
pub type WriterInputId = usize;

/// Container writer status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterStatus {
    Unknown,
    Writing,
    Completed,
    Failed,
    Cancelled,
}

/// Interface presented by the external encoder/container muxer.
///
/// One writer produces one container file. Inputs are added per track, the
/// session timeline is anchored with `start_session`, and buffers are only
/// appended while `is_ready_for_more_data` reports readiness (backpressure).
/// The callback fires on the session's drain thread — implementations must
/// tolerate calls from a thread other than the one that created them.
pub trait MediaWriter: Send {
    /// Add an encoder input for `kind`. Fails once writing has started on
    /// writers that do not support late input attachment.
    fn add_input(
        &mut self,
        kind: MediaKind,
        settings: EncoderSettings,
        format_hint: Option<&FormatDescription>,
    ) -> Result<WriterInputId, WriterError>;

    /// Attach a pixel-buffer adaptor to a video input, sized to `dimensions`.
    fn attach_pixel_adaptor(
        &mut self,
        input: WriterInputId,
        dimensions: Dimensions,
    ) -> Result<(), WriterError>;

    /// Begin writing. Returns `false` if the writer refuses to start; the
    /// concrete failure is then available through `error()`.
    fn start_writing(&mut self) -> bool;

    /// Anchor the container timeline at `at`. Called exactly once, with the
    /// first accepted buffer's rebased timestamp.
    fn start_session(&mut self, at: MediaTime);

    /// Whether `input` can accept another buffer right now.
    fn is_ready_for_more_data(&self, input: WriterInputId) -> bool;

    /// Append one buffer. Returns `false` on refusal or encode failure.
    fn append(&mut self, input: WriterInputId, buffer: &TimedBuffer) -> bool;

    /// Finalize the container. Single-shot; blocks until the file is durable.
    fn finish_writing(&mut self) -> Result<(), WriterError>;

    /// Abort writing, leaving the partial file for the caller to remove.
    fn cancel_writing(&mut self);

    fn status(&self) -> WriterStatus;

    fn error(&self) -> Option<WriterError>;

    /// Destination path of the container file.
    fn output_path(&self) -> &Path;
}

/// Creates one `MediaWriter` per destination file.
pub trait MediaWriterFactory: Send + Sync {
    fn make_writer(&self, destination: &Path) -> Result<Box<dyn MediaWriter>, WriterError>;
}
