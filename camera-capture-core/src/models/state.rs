/// Recording status state machine.
///
/// Transitions:
/// ```text
/// initial → initialized → recording ⇄ paused
///                              ↓
///                          finished → saving
/// ```
/// Only `initialized`, `recording` and `paused` accept buffers from the
/// capture producers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    Initial,
    Initialized,
    Recording,
    Paused,
    Finished,
    Saving,
}

impl RecordStatus {
    pub fn accepts_buffers(&self) -> bool {
        matches!(self, Self::Initialized | Self::Recording | Self::Paused)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }
}

/// Still-photo capture state machine: `initial → capturing → finished | failed`.
///
/// At most one capture may be in flight; a second request while `capturing`
/// fails fast instead of queueing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoStatus {
    Initial,
    Capturing,
    Finished,
    Failed,
}

impl PhotoStatus {
    pub fn is_capturing(&self) -> bool {
        matches!(self, Self::Capturing)
    }
}

/// Torch (continuous light) mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TorchMode {
    Off,
    On,
    Auto,
}

/// Flash mode for still captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashMode {
    Off,
    On,
    Auto,
}

/// Physical position of a camera device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevicePosition {
    Front,
    Back,
}

impl DevicePosition {
    pub fn opposite(&self) -> DevicePosition {
        match self {
            Self::Front => Self::Back,
            Self::Back => Self::Front,
        }
    }
}

/// Authorization state for a media kind, as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    NotDetermined,
    Denied,
    Authorized,
}
