//! # camera-capture-core
//!
//! Platform-agnostic camera capture and recording core library.
//!
//! Provides multi-clip recording with pause/resume, timestamp rebasing,
//! clip merging, trim export, and still-photo capture. Platform-specific
//! backends implement the `CaptureService`, `MediaWriter` and `AssetLibrary`
//! traits and plug into the generic `Recorder`.
//!
//! ## Architecture
//!
//! ```text
//! camera-capture-core (this crate)
//! ├── traits/       ← CaptureService, MediaWriter, MediaReader, AssetInspector, RecorderDelegate
//! ├── models/       ← MediaTime, TimedBuffer, Clip, configurations, errors, status enums
//! ├── pipeline/     ← bounded buffer channels, audio retry queue
//! ├── session/      ← Recorder (device orchestrator), RecordingSession (clip writer)
//! ├── export/       ← Exporter (read→write pump), Trimmer
//! └── storage/      ← clip file naming, sidecar metadata
//! ```

pub mod export;
pub mod models;
pub mod pipeline;
pub mod session;
pub mod storage;
pub mod traits;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-export key types at crate root for convenience.
pub use export::exporter::{ExportCancellation, ExportConfiguration, Exporter};
pub use export::trimmer::Trimmer;
pub use models::buffer::{Dimensions, FormatDescription, MediaKind, TimedBuffer};
pub use models::clip::Clip;
pub use models::config::{
    AudioConfiguration, EncoderSettings, PhotoConfiguration, SessionPreset, Transform,
    VideoConfiguration,
};
pub use models::error::{
    ExportError, RecorderError, SessionError, TrimError,
};
pub use models::photo::{Photo, PhotoSource};
pub use models::state::{
    AuthorizationStatus, DevicePosition, FlashMode, PhotoStatus, RecordStatus, TorchMode,
};
pub use models::time::{MediaTime, TimeRange};
pub use pipeline::channel::{buffer_channel, BufferReceiver, BufferSender};
pub use session::recorder::{Recorder, RecorderDiagnostics, RecorderOptions};
pub use session::recording::{RecordingSession, SessionServices};
pub use traits::asset_inspector::AssetInspector;
pub use traits::capture_service::{CaptureDevice, CaptureService};
pub use traits::media_reader::{AssetLibrary, MediaReader};
pub use traits::media_writer::{MediaWriter, MediaWriterFactory};
pub use traits::recorder_delegate::RecorderDelegate;
