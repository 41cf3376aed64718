use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Where a photo's pixels came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoSource {
    /// Captured through the dedicated still-photo output.
    Still,
    /// Synthesized from the most recent video buffer while recording.
    VideoFrame,
}

/// A captured still image.
#[derive(Debug, Clone)]
pub struct Photo {
    pub id: Uuid,
    pub data: Arc<[u8]>,
    pub created_at: DateTime<Utc>,
    pub source: PhotoSource,
}

impl Photo {
    pub fn new(data: impl Into<Arc<[u8]>>, source: PhotoSource) -> Self {
        Self {
            id: Uuid::new_v4(),
            data: data.into(),
            created_at: Utc::now(),
            source,
        }
    }
}
