use std::collections::BTreeMap;

use serde::Serialize;

use super::buffer::{Dimensions, FormatDescription};
use super::error::ConfigError;
use super::state::FlashMode;
use super::time::MediaTime;

/// A single encoder setting value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SettingValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

/// Encoder-ready settings map handed to the container writer.
pub type EncoderSettings = BTreeMap<String, SettingValue>;

/// Well-known encoder setting keys.
pub mod keys {
    pub const CODEC: &str = "codec";
    pub const WIDTH: &str = "width";
    pub const HEIGHT: &str = "height";
    pub const BITRATE: &str = "bitrate";
    pub const SAMPLE_RATE: &str = "sample-rate";
    pub const CHANNELS: &str = "channels";
    pub const STABILIZATION: &str = "stabilization";
    pub const TRANSFORM: &str = "transform";
}

/// Capture session preset requested from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPreset {
    Low,
    Medium,
    High,
    Photo,
}

/// Video codecs the writer may be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    H264,
    Hevc,
}

impl VideoCodec {
    fn as_str(&self) -> &'static str {
        match self {
            Self::H264 => "h264",
            Self::Hevc => "hevc",
        }
    }
}

/// Audio codecs the writer may be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCodec {
    Aac,
}

impl AudioCodec {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Aac => "aac",
        }
    }
}

/// Video stabilization intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StabilizationMode {
    Off,
    Standard,
    Cinematic,
    Auto,
}

impl StabilizationMode {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Standard => "standard",
            Self::Cinematic => "cinematic",
            Self::Auto => "auto",
        }
    }
}

/// Rotation applied to recorded video, in quarter turns clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transform {
    #[default]
    Identity,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl Transform {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Rotate90 => "rotate-90",
            Self::Rotate180 => "rotate-180",
            Self::Rotate270 => "rotate-270",
        }
    }
}

/// User intent for video recording, translated into encoder settings.
///
/// Immutable snapshot: changed only between clips, with the pipeline told to
/// re-derive settings before the next buffer is accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoConfiguration {
    pub preset: SessionPreset,
    pub codec: VideoCodec,
    /// Target bitrate in bits per second. Derived from pixel count when unset.
    pub bitrate: Option<u32>,
    /// Explicit output dimensions. Falls back to the source format.
    pub dimensions: Option<Dimensions>,
    /// Target aspect ratio (width / height), applied to source dimensions
    /// when no explicit dimensions are given.
    pub aspect_ratio: Option<f64>,
    pub transform: Transform,
    pub stabilization: StabilizationMode,
    /// Cap on frames per second. Buffers arriving faster are retimed/dropped.
    pub max_frame_rate: Option<f64>,
}

impl Default for VideoConfiguration {
    fn default() -> Self {
        Self {
            preset: SessionPreset::High,
            codec: VideoCodec::H264,
            bitrate: None,
            dimensions: None,
            aspect_ratio: None,
            transform: Transform::Identity,
            stabilization: StabilizationMode::Auto,
            max_frame_rate: None,
        }
    }
}

impl VideoConfiguration {
    /// Resolve the output dimensions for this configuration.
    ///
    /// Order: explicit dimensions, then the source format's dimensions
    /// (reshaped by `aspect_ratio` when set).
    pub fn resolved_dimensions(
        &self,
        format: Option<&FormatDescription>,
    ) -> Result<Dimensions, ConfigError> {
        if let Some(dims) = self.dimensions {
            return Ok(dims);
        }
        let source = format
            .and_then(|f| f.dimensions)
            .ok_or_else(|| ConfigError::MissingDimensions("no dimensions configured and no source format".into()))?;
        if let Some(ratio) = self.aspect_ratio {
            if ratio <= 0.0 {
                return Err(ConfigError::Invalid(format!("aspect ratio {ratio} must be positive")));
            }
            let height = (source.width as f64 / ratio).round() as u32;
            return Ok(Dimensions::new(source.width, height.min(source.height).max(2)));
        }
        Ok(source)
    }

    /// Build the encoder-ready settings map.
    pub fn output_settings(
        &self,
        format: Option<&FormatDescription>,
    ) -> Result<EncoderSettings, ConfigError> {
        let dims = self.resolved_dimensions(format)?;
        let bitrate = self.bitrate.unwrap_or_else(|| default_video_bitrate(dims));

        let mut settings = EncoderSettings::new();
        settings.insert(keys::CODEC.into(), SettingValue::Str(self.codec.as_str().into()));
        settings.insert(keys::WIDTH.into(), SettingValue::Int(dims.width as i64));
        settings.insert(keys::HEIGHT.into(), SettingValue::Int(dims.height as i64));
        settings.insert(keys::BITRATE.into(), SettingValue::Int(bitrate as i64));
        settings.insert(
            keys::STABILIZATION.into(),
            SettingValue::Str(self.stabilization.as_str().into()),
        );
        settings.insert(
            keys::TRANSFORM.into(),
            SettingValue::Str(self.transform.as_str().into()),
        );
        Ok(settings)
    }

    /// Floor interval between consecutive frames, from `max_frame_rate`.
    pub fn min_frame_duration(&self) -> Option<MediaTime> {
        let rate = self.max_frame_rate?;
        if rate <= 0.0 {
            return None;
        }
        Some(MediaTime::from_seconds(1.0 / rate, 600))
    }
}

/// Extract `width`/`height` from an encoder settings map.
pub fn settings_dimensions(settings: &EncoderSettings) -> Option<Dimensions> {
    match (settings.get(keys::WIDTH), settings.get(keys::HEIGHT)) {
        (Some(SettingValue::Int(w)), Some(SettingValue::Int(h))) if *w > 0 && *h > 0 => {
            Some(Dimensions::new(*w as u32, *h as u32))
        }
        _ => None,
    }
}

/// 0.1 bit per pixel at 30fps, clamped to a sane floor.
fn default_video_bitrate(dims: Dimensions) -> u32 {
    let bits = dims.pixel_count() as f64 * 30.0 * 0.1;
    (bits as u32).max(500_000)
}

/// User intent for audio recording.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioConfiguration {
    pub codec: AudioCodec,
    pub bitrate: u32,
    /// Falls back to the source format's rate when unset.
    pub sample_rate: Option<f64>,
    /// Falls back to the source format's channel count when unset.
    pub channels: Option<u16>,
}

impl Default for AudioConfiguration {
    fn default() -> Self {
        Self {
            codec: AudioCodec::Aac,
            bitrate: 128_000,
            sample_rate: None,
            channels: None,
        }
    }
}

impl AudioConfiguration {
    pub fn output_settings(
        &self,
        format: Option<&FormatDescription>,
    ) -> Result<EncoderSettings, ConfigError> {
        let sample_rate = self
            .sample_rate
            .or_else(|| format.and_then(|f| f.sample_rate))
            .unwrap_or(44_100.0);
        let channels = self
            .channels
            .or_else(|| format.and_then(|f| f.channels))
            .unwrap_or(2);
        if sample_rate <= 0.0 {
            return Err(ConfigError::Invalid(format!("sample rate {sample_rate} must be positive")));
        }
        if channels == 0 {
            return Err(ConfigError::Invalid("channel count must be positive".into()));
        }

        let mut settings = EncoderSettings::new();
        settings.insert(keys::CODEC.into(), SettingValue::Str(self.codec.as_str().into()));
        settings.insert(keys::BITRATE.into(), SettingValue::Int(self.bitrate as i64));
        settings.insert(keys::SAMPLE_RATE.into(), SettingValue::Float(sample_rate));
        settings.insert(keys::CHANNELS.into(), SettingValue::Int(channels as i64));
        Ok(settings)
    }
}

/// User intent for still-photo capture.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoConfiguration {
    pub flash_mode: FlashMode,
    /// JPEG quality in `0.0..=1.0`.
    pub quality: f64,
}

impl Default for PhotoConfiguration {
    fn default() -> Self {
        Self {
            flash_mode: FlashMode::Off,
            quality: 0.9,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::buffer::MediaKind;
    use approx::assert_relative_eq;

    fn video_format(width: u32, height: u32) -> FormatDescription {
        FormatDescription::video(Dimensions::new(width, height))
    }

    #[test]
    fn explicit_dimensions_win() {
        let config = VideoConfiguration {
            dimensions: Some(Dimensions::new(1280, 720)),
            ..Default::default()
        };
        let settings = config.output_settings(Some(&video_format(1920, 1080))).unwrap();
        assert_eq!(settings.get(keys::WIDTH), Some(&SettingValue::Int(1280)));
        assert_eq!(settings.get(keys::HEIGHT), Some(&SettingValue::Int(720)));
    }

    #[test]
    fn dimensions_fall_back_to_format() {
        let config = VideoConfiguration::default();
        let settings = config.output_settings(Some(&video_format(1920, 1080))).unwrap();
        assert_eq!(settings.get(keys::WIDTH), Some(&SettingValue::Int(1920)));
        assert_eq!(settings.get(keys::HEIGHT), Some(&SettingValue::Int(1080)));
    }

    #[test]
    fn aspect_ratio_reshapes_source() {
        let config = VideoConfiguration {
            aspect_ratio: Some(1.0),
            ..Default::default()
        };
        let dims = config.resolved_dimensions(Some(&video_format(1080, 1920))).unwrap();
        assert_eq!(dims, Dimensions::new(1080, 1080));
    }

    #[test]
    fn missing_dimensions_is_an_error() {
        let config = VideoConfiguration::default();
        let err = config.output_settings(None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingDimensions(_)));

        // An audio-only format description carries no dimensions either.
        let audio = FormatDescription::audio(44_100.0, 2);
        assert_eq!(audio.kind, MediaKind::Audio);
        assert!(config.output_settings(Some(&audio)).is_err());
    }

    #[test]
    fn bitrate_defaults_from_pixels() {
        let config = VideoConfiguration::default();
        let settings = config.output_settings(Some(&video_format(1920, 1080))).unwrap();
        let Some(SettingValue::Int(bitrate)) = settings.get(keys::BITRATE) else {
            panic!("bitrate missing");
        };
        assert_eq!(*bitrate, (1920u64 * 1080 * 3) as i64);
    }

    #[test]
    fn min_frame_duration_from_rate() {
        let config = VideoConfiguration {
            max_frame_rate: Some(25.0),
            ..Default::default()
        };
        assert_relative_eq!(config.min_frame_duration().unwrap().seconds(), 0.04, epsilon = 1e-3);
        assert!(VideoConfiguration::default().min_frame_duration().is_none());
    }

    #[test]
    fn audio_settings_fall_back_to_format() {
        let config = AudioConfiguration::default();
        let format = FormatDescription::audio(48_000.0, 1);
        let settings = config.output_settings(Some(&format)).unwrap();
        assert_eq!(settings.get(keys::SAMPLE_RATE), Some(&SettingValue::Float(48_000.0)));
        assert_eq!(settings.get(keys::CHANNELS), Some(&SettingValue::Int(1)));
        assert_eq!(settings.get(keys::CODEC), Some(&SettingValue::Str("aac".into())));
    }

    #[test]
    fn audio_settings_default_without_format() {
        let settings = AudioConfiguration::default().output_settings(None).unwrap();
        assert_eq!(settings.get(keys::SAMPLE_RATE), Some(&SettingValue::Float(44_100.0)));
        assert_eq!(settings.get(keys::CHANNELS), Some(&SettingValue::Int(2)));
    }
}
