use crate::models::clip::Clip;
use crate::models::error::RecorderError;
use crate::models::photo::Photo;
use crate::models::state::RecordStatus;

/// Event delegate for recorder notifications.
///
/// Subscribed at construction and dropped at teardown; there is no ambient
/// global observer. Methods are called from the drain thread — implementations
/// marshal to their own context if needed.
pub trait RecorderDelegate: Send + Sync {
    fn on_record_status_changed(&self, status: RecordStatus);

    /// Called after each accepted buffer with the total recorded duration.
    fn on_duration_updated(&self, seconds: f64);

    fn on_clip_finished(&self, clip: &Clip);

    fn on_photo_captured(&self, photo: &Photo);

    fn on_error(&self, error: &RecorderError);
}
