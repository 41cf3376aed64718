use crate::models::buffer::MediaKind;
use crate::models::config::{PhotoConfiguration, SessionPreset};
use crate::models::error::DeviceError;
use crate::models::photo::Photo;
use crate::models::state::{AuthorizationStatus, DevicePosition, TorchMode};
use crate::pipeline::channel::BufferSender;

/// Configuration surface of a camera device.
///
/// The device driver has a single-writer configuration contract: every
/// mutation happens between `lock_for_configuration` and
/// `unlock_for_configuration`, and the lock must be released on every exit
/// path.
pub trait CaptureDevice: Send {
    fn position(&self) -> DevicePosition;

    fn has_torch(&self) -> bool;

    fn is_torch_available(&self) -> bool;

    fn lock_for_configuration(&mut self) -> Result<(), DeviceError>;

    fn unlock_for_configuration(&mut self);

    fn set_torch_mode(&mut self, mode: TorchMode) -> Result<(), DeviceError>;

    fn set_focus_point(&mut self, x: f32, y: f32) -> Result<(), DeviceError>;

    fn set_exposure_point(&mut self, x: f32, y: f32) -> Result<(), DeviceError>;
}

/// Interface presented by the platform capture session.
///
/// The service owns the hardware graph. Buffer delivery is push-based: the
/// service writes timestamped buffers into the kind-tagged channel senders
/// registered through `add_audio_output`/`add_video_output`, from its own
/// audio and video producer threads (exactly one producer per kind).
pub trait CaptureService: Send {
    fn authorization_status(&self, kind: MediaKind) -> AuthorizationStatus;

    fn set_preset(&mut self, preset: SessionPreset) -> Result<(), DeviceError>;

    /// Attach the camera at `position`, replacing any current camera input.
    fn add_camera(&mut self, position: DevicePosition) -> Result<(), DeviceError>;

    fn add_audio_output(&mut self, sender: BufferSender) -> Result<(), DeviceError>;

    fn add_video_output(&mut self, sender: BufferSender) -> Result<(), DeviceError>;

    fn add_photo_output(&mut self) -> Result<(), DeviceError>;

    fn start_running(&mut self);

    /// Idempotent teardown of the capture graph.
    fn stop_running(&mut self);

    /// The currently attached camera, if any.
    fn device(&mut self) -> Option<&mut dyn CaptureDevice>;

    /// Capture a still through the photo output. Single-shot: blocks until
    /// the hardware callback resolves exactly once.
    fn capture_photo(&mut self, config: &PhotoConfiguration) -> Result<Photo, DeviceError>;
}
