use std::path::PathBuf;

use thiserror::Error;

use super::buffer::MediaKind;

/// Failures reported by a container writer collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WriterError {
    #[error("cannot add {0:?} input: {1}")]
    CannotAddInput(MediaKind, String),

    #[error("writer refused to start: {0}")]
    StartFailed(String),

    #[error("append failed: {0}")]
    AppendFailed(String),

    #[error("finalizing container failed: {0}")]
    FinishFailed(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Failures reported by a container reader collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReaderError {
    #[error("cannot open asset: {0}")]
    OpenFailed(String),

    #[error("decode failed: {0}")]
    DecodeFailed(String),
}

/// Failures reported by the capture device / session collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("device busy")]
    Busy,

    #[error("device not available")]
    NotAvailable,

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("configuration lock failed: {0}")]
    LockFailed(String),

    #[error("capture failed: {0}")]
    CaptureFailed(String),
}

/// Reasons a new clip could not be started.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClipStartFailure {
    #[error("cannot add audio input: {0}")]
    CannotAddAudioInput(String),

    #[error("cannot add video input: {0}")]
    CannotAddVideoInput(String),

    #[error("writer start failed: {0}")]
    WriterStart(String),
}

/// Failures raised by `RecordingSession` operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("a clip is already being written")]
    ClipInProgress,

    #[error("clip start failed: {0}")]
    ClipStartFailed(#[from] ClipStartFailure),

    #[error("finishing clip failed: {0}")]
    FinishFailed(WriterError),

    #[error("no clips to merge")]
    NothingToMerge,

    #[error("merging clips failed: {0}")]
    MergeFailed(ExportError),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Failures raised by `Recorder` operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecorderError {
    #[error("access to {0:?} denied")]
    AccessDenied(MediaKind),

    #[error("not authorized for {0:?}")]
    NotAuthorized(MediaKind),

    #[error("a recording is already in progress")]
    RecordInProgress,

    #[error("cannot add capture device: {0}")]
    CannotAddDevice(DeviceError),

    #[error("cannot add audio output: {0}")]
    CannotAddAudioOutput(DeviceError),

    #[error("cannot add video output: {0}")]
    CannotAddVideoOutput(DeviceError),

    #[error("cannot add photo output: {0}")]
    CannotAddPhotoOutput(DeviceError),

    #[error("cannot set capture preset: {0}")]
    CannotSetPreset(DeviceError),

    #[error("failed to capture photo: {0}")]
    FailedToCapturePhoto(String),

    #[error("failed to pause recording: {0}")]
    FailedToPauseRecording(SessionError),

    #[error("failed to stop recording: {0}")]
    FailedToStopRecording(SessionError),

    #[error("failed to set torch: {0}")]
    FailedToSetTorch(DeviceError),

    #[error("torch not available on the current device")]
    TorchNotAvailable,

    #[error("torch not supported by the current device")]
    TorchNotSupported,

    #[error(transparent)]
    Session(SessionError),
}

/// Failures raised by the export pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExportError {
    #[error("export setup failed: {0}")]
    SetupFailure(String),

    #[error("reading source failed: {0}")]
    ReadingFailure(String),

    #[error("writing output failed: {0}")]
    WritingFailure(String),

    #[error("export cancelled")]
    Cancelled,
}

/// Failures raised by the trimmer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrimError {
    #[error("source file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("could not create export session: {0}")]
    ExportSessionCreationFailed(String),

    #[error("trim cancelled")]
    Cancelled,

    #[error("trim export failed: {0}")]
    ExportFailed(ExportError),
}

/// Failures deriving encoder settings from a configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("video dimensions unavailable: {0}")]
    MissingDimensions(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
