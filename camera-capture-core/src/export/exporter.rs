use std::collections::HashSet;
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::models::buffer::{FormatDescription, MediaKind};
use crate::models::config::{
    keys, settings_dimensions, AudioConfiguration, EncoderSettings, SettingValue,
    VideoConfiguration,
};
use crate::models::error::ExportError;
use crate::models::time::{MediaTime, TimeRange};
use crate::traits::media_reader::{MediaReader, ReaderStatus, TrackId, TrackInfo};
use crate::traits::media_writer::{MediaWriter, WriterInputId, WriterStatus};

/// What to transcode to. `None` configurations mean passthrough: settings
/// are derived from the source track's format.
#[derive(Debug, Clone, Default)]
pub struct ExportConfiguration {
    pub video: Option<VideoConfiguration>,
    pub audio: Option<AudioConfiguration>,
    /// Sub-range of the source to export; the whole asset when unset.
    pub time_range: Option<TimeRange>,
}

/// Cooperative cancellation token for a running export.
///
/// Polled between samples: the in-flight sample always completes before the
/// flag is observed.
#[derive(Clone)]
pub struct ExportCancellation(Arc<AtomicBool>);

impl ExportCancellation {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress callback, called with a ratio in `0.0..=1.0` after each
/// processed video sample.
pub type ProgressFn<'a> = &'a dyn Fn(f64);

struct TrackPlan {
    track: TrackInfo,
    input: WriterInputId,
}

/// Bulk reader→writer transcode with pull-based backpressure.
///
/// Each source track gets a dedicated writer input; samples are pulled only
/// while the input reports readiness. Failure or cancellation deletes the
/// partial output file before the typed error is returned.
pub struct Exporter {
    reader: Box<dyn MediaReader>,
    writer: Box<dyn MediaWriter>,
    config: ExportConfiguration,
    cancelled: Arc<AtomicBool>,
}

impl Exporter {
    pub fn new(
        reader: Box<dyn MediaReader>,
        writer: Box<dyn MediaWriter>,
        config: ExportConfiguration,
    ) -> Self {
        Self {
            reader,
            writer,
            config,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Token for cancelling this export from another thread.
    pub fn cancellation(&self) -> ExportCancellation {
        ExportCancellation(Arc::clone(&self.cancelled))
    }

    /// Run the export to completion.
    pub fn export(&mut self, progress: Option<ProgressFn<'_>>) -> Result<(), ExportError> {
        let tracks = self.reader.tracks();
        if tracks.is_empty() {
            return Err(ExportError::SetupFailure("source has no tracks".into()));
        }

        // Validate every track's output settings before the reader or writer
        // is started, so a bad configuration leaves no partial file.
        let mut planned: Vec<(TrackInfo, EncoderSettings)> = Vec::new();
        for track in tracks {
            let settings = self.settings_for_track(&track)?;
            planned.push((track, settings));
        }

        let mut plans = Vec::new();
        for (track, settings) in planned {
            let input = self
                .writer
                .add_input(track.kind, settings.clone(), Some(&track.format))
                .map_err(|e| ExportError::SetupFailure(e.to_string()))?;
            if track.kind == MediaKind::Video {
                if let Some(dims) = settings_dimensions(&settings) {
                    self.writer
                        .attach_pixel_adaptor(input, dims)
                        .map_err(|e| ExportError::SetupFailure(e.to_string()))?;
                }
            }
            plans.push(TrackPlan { track, input });
        }

        if !self.reader.start_reading() {
            let reason = self
                .reader
                .error()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "reader refused to start".into());
            return Err(ExportError::ReadingFailure(reason));
        }
        if !self.writer.start_writing() {
            let reason = self
                .writer
                .error()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "writer refused to start".into());
            self.reader.cancel_reading();
            return Err(self.fail(ExportError::WritingFailure(reason)));
        }
        self.writer.start_session(MediaTime::zero());

        let trim_start = self
            .config
            .time_range
            .map(|r| r.start)
            .unwrap_or_else(MediaTime::zero);
        let total = self
            .config
            .time_range
            .map(|r| r.duration())
            .unwrap_or_else(|| self.reader.duration());

        let result = self.pump(&plans, trim_start, total, progress);
        match result {
            Ok(()) => self
                .writer
                .finish_writing()
                .map_err(|e| self.fail(ExportError::WritingFailure(e.to_string()))),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Pull samples per track while the corresponding writer input is ready.
    fn pump(
        &mut self,
        plans: &[TrackPlan],
        trim_start: MediaTime,
        total: MediaTime,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<(), ExportError> {
        let mut exhausted: HashSet<TrackId> = HashSet::new();

        while exhausted.len() < plans.len() {
            if self.cancelled.load(Ordering::SeqCst) {
                self.reader.cancel_reading();
                return Err(ExportError::Cancelled);
            }
            if self.reader.status() == ReaderStatus::Failed {
                return Err(ExportError::ReadingFailure(self.reader_reason()));
            }
            if self.writer.status() == WriterStatus::Failed {
                return Err(ExportError::WritingFailure(self.writer_reason()));
            }

            let mut pulled_any = false;
            for plan in plans {
                if exhausted.contains(&plan.track.id) {
                    continue;
                }
                while self.writer.is_ready_for_more_data(plan.input) {
                    if self.cancelled.load(Ordering::SeqCst) {
                        self.reader.cancel_reading();
                        return Err(ExportError::Cancelled);
                    }
                    let Some(sample) = self.reader.copy_next_sample(plan.track.id) else {
                        if self.reader.status() == ReaderStatus::Failed {
                            return Err(ExportError::ReadingFailure(self.reader_reason()));
                        }
                        exhausted.insert(plan.track.id);
                        break;
                    };
                    pulled_any = true;

                    // Rebase to the trim start so output timestamps begin at
                    // zero.
                    let rebased = sample.offset_timestamp(trim_start);
                    if !self.writer.append(plan.input, &rebased) {
                        if self.writer.status() == WriterStatus::Failed {
                            return Err(ExportError::WritingFailure(self.writer_reason()));
                        }
                        // Transient refusal: retry this input later.
                        break;
                    }
                    if plan.track.kind == MediaKind::Video {
                        if let Some(report) = progress {
                            let elapsed = rebased.end_timestamp().seconds();
                            let ratio = if total.seconds() > 0.0 {
                                (elapsed / total.seconds()).clamp(0.0, 1.0)
                            } else {
                                1.0
                            };
                            report(ratio);
                        }
                    }
                }
            }

            if !pulled_any && exhausted.len() < plans.len() {
                // Writer backpressure: wait for readiness without spinning.
                thread::sleep(Duration::from_millis(1));
            }
        }
        Ok(())
    }

    fn settings_for_track(&self, track: &TrackInfo) -> Result<EncoderSettings, ExportError> {
        match track.kind {
            MediaKind::Video => match &self.config.video {
                Some(config) => config
                    .output_settings(Some(&track.format))
                    .map_err(|e| ExportError::SetupFailure(e.to_string())),
                None => passthrough_video_settings(&track.format),
            },
            MediaKind::Audio => match &self.config.audio {
                Some(config) => config
                    .output_settings(Some(&track.format))
                    .map_err(|e| ExportError::SetupFailure(e.to_string())),
                None => Ok(passthrough_audio_settings(&track.format)),
            },
        }
    }

    fn reader_reason(&self) -> String {
        self.reader
            .error()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "reader failed".into())
    }

    fn writer_reason(&self) -> String {
        self.writer
            .error()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "writer failed".into())
    }

    /// Abort both ends and delete the partial output file.
    fn fail(&mut self, error: ExportError) -> ExportError {
        self.writer.cancel_writing();
        let path = self.writer.output_path().to_path_buf();
        if path.exists() {
            if let Err(e) = fs::remove_file(&path) {
                log::warn!("could not delete partial export {}: {e}", path.display());
            }
        }
        error
    }
}

fn passthrough_video_settings(format: &FormatDescription) -> Result<EncoderSettings, ExportError> {
    let dims = format.dimensions.ok_or_else(|| {
        ExportError::SetupFailure("video output settings missing width/height".into())
    })?;
    let mut settings = EncoderSettings::new();
    settings.insert(
        keys::CODEC.into(),
        SettingValue::Str(format.codec.clone().unwrap_or_else(|| "h264".into())),
    );
    settings.insert(keys::WIDTH.into(), SettingValue::Int(dims.width as i64));
    settings.insert(keys::HEIGHT.into(), SettingValue::Int(dims.height as i64));
    Ok(settings)
}

fn passthrough_audio_settings(format: &FormatDescription) -> EncoderSettings {
    let mut settings = EncoderSettings::new();
    settings.insert(
        keys::CODEC.into(),
        SettingValue::Str(format.codec.clone().unwrap_or_else(|| "aac".into())),
    );
    settings.insert(
        keys::SAMPLE_RATE.into(),
        SettingValue::Float(format.sample_rate.unwrap_or(44_100.0)),
    );
    settings.insert(
        keys::CHANNELS.into(),
        SettingValue::Int(format.channels.unwrap_or(2) as i64),
    );
    settings
}
