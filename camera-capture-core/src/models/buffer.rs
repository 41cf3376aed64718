use std::sync::Arc;

use super::time::MediaTime;

/// Kind of media carried by a buffer or track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Audio,
    Video,
}

/// Pixel dimensions of a video frame or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Format hints attached to buffers by the capture producer.
///
/// Used to lazily derive encoder settings when a configuration leaves
/// dimensions or audio layout unspecified.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatDescription {
    pub kind: MediaKind,
    pub dimensions: Option<Dimensions>,
    pub sample_rate: Option<f64>,
    pub channels: Option<u16>,
    pub codec: Option<String>,
}

impl FormatDescription {
    pub fn video(dimensions: Dimensions) -> Self {
        Self {
            kind: MediaKind::Video,
            dimensions: Some(dimensions),
            sample_rate: None,
            channels: None,
            codec: None,
        }
    }

    pub fn audio(sample_rate: f64, channels: u16) -> Self {
        Self {
            kind: MediaKind::Audio,
            dimensions: None,
            sample_rate: Some(sample_rate),
            channels: Some(channels),
            codec: None,
        }
    }
}

/// A timestamped chunk of raw media data delivered by the capture producer.
///
/// The payload is opaque to this crate and shared, so rebasing a timestamp is
/// copy-on-shift: the returned buffer aliases the same payload with new
/// timing. A buffer is never mutated once appended to a writer.
#[derive(Debug, Clone)]
pub struct TimedBuffer {
    data: Arc<[u8]>,
    pub presentation_timestamp: MediaTime,
    pub duration: MediaTime,
    pub kind: MediaKind,
    format: Arc<FormatDescription>,
}

impl TimedBuffer {
    pub fn new(
        data: impl Into<Arc<[u8]>>,
        presentation_timestamp: MediaTime,
        duration: MediaTime,
        format: FormatDescription,
    ) -> Self {
        let kind = format.kind;
        Self {
            data: data.into(),
            presentation_timestamp,
            duration,
            kind,
            format: Arc::new(format),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    pub fn format(&self) -> &FormatDescription {
        &self.format
    }

    /// Timestamp of the instant just past this buffer.
    pub fn end_timestamp(&self) -> MediaTime {
        self.presentation_timestamp + self.duration
    }

    /// Shift the presentation timestamp back by `offset`, sharing the payload.
    pub fn offset_timestamp(&self, offset: MediaTime) -> TimedBuffer {
        let mut shifted = self.clone();
        shifted.presentation_timestamp = self.presentation_timestamp - offset;
        shifted
    }

    /// Replace the duration, sharing the payload.
    pub fn with_duration(&self, duration: MediaTime) -> TimedBuffer {
        let mut retimed = self.clone();
        retimed.duration = duration;
        retimed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn video_buffer(pts_secs: f64, dur_secs: f64) -> TimedBuffer {
        TimedBuffer::new(
            vec![0u8; 16],
            MediaTime::from_seconds(pts_secs, 600),
            MediaTime::from_seconds(dur_secs, 600),
            FormatDescription::video(Dimensions::new(1920, 1080)),
        )
    }

    #[test]
    fn kind_follows_format() {
        let buf = video_buffer(0.0, 0.1);
        assert_eq!(buf.kind, MediaKind::Video);

        let audio = TimedBuffer::new(
            vec![0u8; 8],
            MediaTime::zero(),
            MediaTime::from_seconds(0.02, 44100),
            FormatDescription::audio(44100.0, 2),
        );
        assert_eq!(audio.kind, MediaKind::Audio);
    }

    #[test]
    fn offset_is_copy_on_shift() {
        let buf = video_buffer(1.0, 0.1);
        let shifted = buf.offset_timestamp(MediaTime::from_seconds(0.4, 600));

        assert_relative_eq!(shifted.presentation_timestamp.seconds(), 0.6);
        // Original untouched, payload shared.
        assert_relative_eq!(buf.presentation_timestamp.seconds(), 1.0);
        assert!(Arc::ptr_eq(&buf.data, &shifted.data));
    }

    #[test]
    fn end_timestamp_adds_duration() {
        let buf = video_buffer(0.2, 0.1);
        assert_relative_eq!(buf.end_timestamp().seconds(), 0.3, epsilon = 1e-9);
    }

    #[test]
    fn with_duration_keeps_timestamp() {
        let buf = video_buffer(0.2, 0.2);
        let retimed = buf.with_duration(MediaTime::from_seconds(0.1, 600));
        assert_relative_eq!(retimed.presentation_timestamp.seconds(), 0.2);
        assert_relative_eq!(retimed.duration.seconds(), 0.1);
    }
}
