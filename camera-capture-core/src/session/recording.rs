use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use uuid::Uuid;

use crate::export::exporter::{ExportConfiguration, Exporter};
use crate::models::buffer::{Dimensions, FormatDescription, MediaKind, TimedBuffer};
use crate::models::clip::Clip;
use crate::models::config::{settings_dimensions, EncoderSettings};
use crate::models::error::{ClipStartFailure, ExportError, SessionError};
use crate::models::time::MediaTime;
use crate::pipeline::retry_queue::RetryQueue;
use crate::storage::{clip_store, metadata};
use crate::traits::media_reader::AssetLibrary;
use crate::traits::media_writer::{MediaWriter, MediaWriterFactory, WriterInputId, WriterStatus};

/// External collaborators a session needs to write and compose clips.
#[derive(Clone)]
pub struct SessionServices {
    pub writer_factory: Arc<dyn MediaWriterFactory>,
    pub asset_library: Arc<dyn AssetLibrary>,
}

/// Owns the clips of one recording and the writer for the clip currently
/// being written.
///
/// Per-clip cycle: `idle → writing → finishing → idle`, with a cancelling
/// path for a segment that accumulated no media. Pause/resume is realized by
/// finishing the current clip and starting a new one on resume; `time_offset`
/// additionally smooths producer gaps *within* one clip (see
/// [`note_interruption`](Self::note_interruption)).
///
/// Not internally synchronized: the owning recorder serializes every call.
pub struct RecordingSession {
    identifier: Uuid,
    output_directory: PathBuf,
    services: SessionServices,

    clips: Vec<Clip>,
    clip_index: usize,

    writer: Option<Box<dyn MediaWriter>>,
    audio_input: Option<WriterInputId>,
    video_input: Option<WriterInputId>,

    audio_settings: Option<(EncoderSettings, Option<FormatDescription>)>,
    video_settings: Option<(EncoderSettings, Option<FormatDescription>)>,
    has_configured_audio: bool,
    has_configured_video: bool,

    has_started_recording: bool,
    current_clip_has_audio: bool,
    current_clip_has_video: bool,

    /// Container time base, fixed by the first accepted buffer of either kind.
    start_timestamp: Option<MediaTime>,
    /// Accumulated gap compensation subtracted from every input timestamp.
    time_offset: MediaTime,
    /// Set by `note_interruption`; resolved by the next appended buffer.
    pending_rebase: bool,
    last_audio_timestamp: Option<MediaTime>,
    last_video_timestamp: Option<MediaTime>,

    completed_duration: MediaTime,
    current_clip_duration: MediaTime,

    skipped_audio: RetryQueue,
    dropped_video: u64,
}

impl RecordingSession {
    pub fn new(output_directory: PathBuf, services: SessionServices) -> Self {
        Self {
            identifier: Uuid::new_v4(),
            output_directory,
            services,
            clips: Vec::new(),
            clip_index: 0,
            writer: None,
            audio_input: None,
            video_input: None,
            audio_settings: None,
            video_settings: None,
            has_configured_audio: false,
            has_configured_video: false,
            has_started_recording: false,
            current_clip_has_audio: false,
            current_clip_has_video: false,
            start_timestamp: None,
            time_offset: MediaTime::zero(),
            pending_rebase: false,
            last_audio_timestamp: None,
            last_video_timestamp: None,
            completed_duration: MediaTime::zero(),
            current_clip_duration: MediaTime::zero(),
            skipped_audio: RetryQueue::default(),
            dropped_video: 0,
        }
    }

    pub fn identifier(&self) -> Uuid {
        self.identifier
    }

    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    pub fn has_active_writer(&self) -> bool {
        self.writer.is_some()
    }

    pub fn has_configured_audio(&self) -> bool {
        self.has_configured_audio
    }

    pub fn has_configured_video(&self) -> bool {
        self.has_configured_video
    }

    pub fn has_started_recording(&self) -> bool {
        self.has_started_recording
    }

    /// Total recorded duration: finished clips plus the clip in progress.
    /// Monotonically non-decreasing while recording.
    pub fn total_duration(&self) -> MediaTime {
        self.completed_duration + self.current_clip_duration
    }

    /// Video buffers dropped because the writer was not ready.
    pub fn dropped_video_buffers(&self) -> u64 {
        self.dropped_video
    }

    /// Store (and when a writer is active, attach) the audio encoder input.
    /// Idempotent; callable mid-session after a configuration refresh.
    pub fn configure_audio(
        &mut self,
        settings: EncoderSettings,
        format: Option<&FormatDescription>,
    ) -> bool {
        self.audio_settings = Some((settings, format.cloned()));
        if self.writer.is_some() && self.audio_input.is_none() {
            if let Err(e) = self.attach_audio_input() {
                log::error!("configuring audio input failed: {e}");
                return false;
            }
        }
        self.has_configured_audio = true;
        true
    }

    /// Store (and when a writer is active, attach) the video encoder input
    /// plus its pixel-buffer adaptor.
    pub fn configure_video(
        &mut self,
        settings: EncoderSettings,
        format: Option<&FormatDescription>,
    ) -> bool {
        self.video_settings = Some((settings, format.cloned()));
        if self.writer.is_some() && self.video_input.is_none() {
            if let Err(e) = self.attach_video_input() {
                log::error!("configuring video input failed: {e}");
                return false;
            }
        }
        self.has_configured_video = true;
        true
    }

    /// Force settings to be re-derived from the next buffers' formats.
    pub fn mark_configuration_stale(&mut self) {
        self.has_configured_audio = false;
        self.has_configured_video = false;
    }

    /// Create the clip file and writer for a new segment.
    ///
    /// Fails atomically: on any error no session state has changed and no
    /// writer is retained.
    pub fn begin_new_clip(&mut self) -> Result<(), SessionError> {
        if self.writer.is_some() {
            return Err(SessionError::ClipInProgress);
        }

        let path = clip_store::clip_file_path(&self.output_directory, self.identifier, self.clip_index);
        clip_store::prepare_destination(&path)?;

        let mut writer = self
            .services
            .writer_factory
            .make_writer(&path)
            .map_err(|e| ClipStartFailure::WriterStart(e.to_string()))?;

        let mut audio_input = None;
        if self.has_configured_audio {
            if let Some((settings, format)) = &self.audio_settings {
                let id = writer
                    .add_input(MediaKind::Audio, settings.clone(), format.as_ref())
                    .map_err(|e| ClipStartFailure::CannotAddAudioInput(e.to_string()))?;
                audio_input = Some(id);
            }
        }

        let mut video_input = None;
        if self.has_configured_video {
            if let Some((settings, format)) = &self.video_settings {
                let id = writer
                    .add_input(MediaKind::Video, settings.clone(), format.as_ref())
                    .map_err(|e| ClipStartFailure::CannotAddVideoInput(e.to_string()))?;
                if let Some(dims) = adaptor_dimensions(settings, format.as_ref()) {
                    writer
                        .attach_pixel_adaptor(id, dims)
                        .map_err(|e| ClipStartFailure::CannotAddVideoInput(e.to_string()))?;
                }
                video_input = Some(id);
            }
        }

        if !writer.start_writing() {
            let reason = writer
                .error()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "writer refused to start".into());
            return Err(ClipStartFailure::WriterStart(reason).into());
        }

        self.writer = Some(writer);
        self.audio_input = audio_input;
        self.video_input = video_input;
        self.has_started_recording = true;
        self.start_timestamp = None;
        self.time_offset = MediaTime::zero();
        self.pending_rebase = false;
        self.last_audio_timestamp = None;
        self.last_video_timestamp = None;
        self.current_clip_has_audio = false;
        self.current_clip_has_video = false;
        self.current_clip_duration = MediaTime::zero();
        self.clip_index += 1;
        Ok(())
    }

    /// Flag a gap in buffer delivery (producer paused without a clip
    /// boundary). The next appended buffer recomputes `time_offset` so its
    /// rebased timestamp lands contiguously after the last written one.
    pub fn note_interruption(&mut self) {
        self.pending_rebase = true;
    }

    /// Append a video buffer.
    ///
    /// Returns `false` when the buffer was dropped: no configured video
    /// input, or the writer cannot take more data right now. Video drops are
    /// acceptable; there is no retry.
    pub fn append_video_buffer(
        &mut self,
        buffer: &TimedBuffer,
        min_frame_duration: Option<MediaTime>,
    ) -> bool {
        if buffer.kind != MediaKind::Video {
            return false;
        }
        let Some(input) = self.video_input else {
            return false;
        };
        if !self.input_ready(input) {
            self.dropped_video += 1;
            return false;
        }

        self.resolve_pending_rebase(buffer.presentation_timestamp, self.last_video_timestamp);

        let mut out = buffer.offset_timestamp(self.time_offset);
        if let Some(floor) = min_frame_duration {
            // Retime to the configured frame cadence; the offset absorbs the
            // difference so subsequent frames stay contiguous.
            if out.duration > floor {
                self.time_offset += out.duration - floor;
                out = out.with_duration(floor);
            }
        }

        self.start_session_if_necessary(out.presentation_timestamp);

        let appended = self
            .writer
            .as_mut()
            .map_or(false, |w| w.append(input, &out));
        if appended {
            self.current_clip_has_video = true;
            self.last_video_timestamp = Some(out.end_timestamp());
            self.update_duration(out.end_timestamp());
        } else {
            self.dropped_video += 1;
        }
        appended
    }

    /// Append an audio buffer, retrying any previously skipped ones first.
    ///
    /// A buffer the writer is not ready for goes into the bounded retry
    /// queue and is retried together with the next incoming buffer. Returns
    /// the aggregated success of the whole batch.
    pub fn append_audio_buffer(&mut self, buffer: &TimedBuffer) -> bool {
        if buffer.kind != MediaKind::Audio {
            return false;
        }
        let Some(input) = self.audio_input else {
            return false;
        };

        let mut batch = self.skipped_audio.drain();
        batch.push(buffer.clone());

        for (index, buf) in batch.iter().enumerate() {
            if !self.input_ready(input) {
                self.requeue(&batch[index..]);
                return false;
            }

            self.resolve_pending_rebase(buf.presentation_timestamp, self.last_audio_timestamp);
            let out = buf.offset_timestamp(self.time_offset);
            self.start_session_if_necessary(out.presentation_timestamp);

            let appended = self
                .writer
                .as_mut()
                .map_or(false, |w| w.append(input, &out));
            if !appended {
                // Keep per-track order: everything from here on waits.
                self.requeue(&batch[index..]);
                return false;
            }
            self.current_clip_has_audio = true;
            self.last_audio_timestamp = Some(out.end_timestamp());
            self.update_duration(out.end_timestamp());
        }
        true
    }

    /// Finish the clip currently being written.
    ///
    /// Safe on an idle session (`Ok(None)`). A segment with no media is
    /// cancelled and its file deleted (`Ok(None)`). Clip-local state is reset
    /// regardless of outcome.
    pub fn finish_clip(&mut self) -> Result<Option<Clip>, SessionError> {
        let Some(mut writer) = self.writer.take() else {
            self.reset();
            return Ok(None);
        };
        let path = writer.output_path().to_path_buf();

        if !self.current_clip_has_audio && !self.current_clip_has_video {
            writer.cancel_writing();
            if let Err(e) = fs::remove_file(&path) {
                if path.exists() {
                    log::warn!("could not delete empty clip file {}: {e}", path.display());
                }
            }
            self.reset();
            return Ok(None);
        }

        let clip_duration = self.current_clip_duration;
        let finish = writer.finish_writing();
        self.completed_duration += clip_duration;
        self.reset();

        match finish {
            Ok(()) => {
                let clip = Clip::new(path.clone());
                self.write_sidecar(&clip, clip_duration);
                self.clips.push(clip.clone());
                Ok(Some(clip))
            }
            Err(e) => Err(SessionError::FinishFailed(e)),
        }
    }

    /// Concatenate all recorded clips into one output file.
    ///
    /// A single clip short-circuits to its own file (callers should prefer
    /// using the clip directly). N > 1 composes through the asset library and
    /// transcodes into `{sessionID}-TV-merged.mov`.
    pub fn merge_clips(&self, config: &ExportConfiguration) -> Result<PathBuf, SessionError> {
        if self.clips.is_empty() {
            return Err(SessionError::NothingToMerge);
        }
        if self.clips.len() == 1 {
            return Ok(self.clips[0].file_url.clone());
        }

        let destination = clip_store::merged_file_path(&self.output_directory, self.identifier);
        clip_store::prepare_destination(&destination)?;

        let reader = self
            .services
            .asset_library
            .compose(&self.clips)
            .map_err(SessionError::MergeFailed)?;
        let writer = self
            .services
            .writer_factory
            .make_writer(&destination)
            .map_err(|e| SessionError::MergeFailed(ExportError::SetupFailure(e.to_string())))?;

        let mut exporter = Exporter::new(reader, writer, config.clone());
        exporter
            .export(None)
            .map_err(SessionError::MergeFailed)?;
        Ok(destination)
    }

    /// Drop per-clip transient configuration. The accumulated clip list is
    /// untouched.
    pub fn reset(&mut self) {
        self.audio_input = None;
        self.video_input = None;
        self.audio_settings = None;
        self.video_settings = None;
        self.has_configured_audio = false;
        self.has_configured_video = false;
        self.current_clip_has_audio = false;
        self.current_clip_has_video = false;
        self.start_timestamp = None;
        self.time_offset = MediaTime::zero();
        self.pending_rebase = false;
        self.last_audio_timestamp = None;
        self.last_video_timestamp = None;
        self.current_clip_duration = MediaTime::zero();
        self.skipped_audio.clear();
    }

    /// Explicitly drop all recorded clips, optionally deleting their files.
    pub fn clear_clips(&mut self, delete_files: bool) {
        if delete_files {
            for clip in &self.clips {
                if let Err(e) = fs::remove_file(&clip.file_url) {
                    log::warn!("could not delete clip file {}: {e}", clip.file_url.display());
                }
            }
        }
        self.clips.clear();
        self.completed_duration = MediaTime::zero();
    }

    // --- Internal helpers ---

    fn input_ready(&self, input: WriterInputId) -> bool {
        self.writer
            .as_ref()
            .map_or(false, |w| w.status() == WriterStatus::Writing && w.is_ready_for_more_data(input))
    }

    fn resolve_pending_rebase(&mut self, incoming: MediaTime, track_last: Option<MediaTime>) {
        if !self.pending_rebase {
            return;
        }
        // First buffer after the gap wins; prefer the same track's last
        // written end, falling back to the other track's.
        let last = track_last
            .or(self.last_video_timestamp)
            .or(self.last_audio_timestamp);
        if let Some(last) = last {
            self.time_offset = incoming - last;
        }
        self.pending_rebase = false;
    }

    /// Fix the session time base exactly once, from the first accepted
    /// buffer of either kind.
    fn start_session_if_necessary(&mut self, at: MediaTime) {
        if self.start_timestamp.is_some() {
            return;
        }
        self.start_timestamp = Some(at);
        if let Some(writer) = self.writer.as_mut() {
            writer.start_session(at);
        }
    }

    fn update_duration(&mut self, end: MediaTime) {
        if let Some(start) = self.start_timestamp {
            let elapsed = end - start;
            if elapsed > self.current_clip_duration {
                self.current_clip_duration = elapsed;
            }
        }
    }

    fn attach_audio_input(&mut self) -> Result<(), ClipStartFailure> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        if let Some((settings, format)) = &self.audio_settings {
            let id = writer
                .add_input(MediaKind::Audio, settings.clone(), format.as_ref())
                .map_err(|e| ClipStartFailure::CannotAddAudioInput(e.to_string()))?;
            self.audio_input = Some(id);
        }
        Ok(())
    }

    fn attach_video_input(&mut self) -> Result<(), ClipStartFailure> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        if let Some((settings, format)) = &self.video_settings {
            let id = writer
                .add_input(MediaKind::Video, settings.clone(), format.as_ref())
                .map_err(|e| ClipStartFailure::CannotAddVideoInput(e.to_string()))?;
            if let Some(dims) = adaptor_dimensions(settings, format.as_ref()) {
                writer
                    .attach_pixel_adaptor(id, dims)
                    .map_err(|e| ClipStartFailure::CannotAddVideoInput(e.to_string()))?;
            }
            self.video_input = Some(id);
        }
        Ok(())
    }

    fn requeue(&mut self, rest: &[TimedBuffer]) {
        for buf in rest {
            self.skipped_audio.push(buf.clone());
        }
    }

    fn write_sidecar(&self, clip: &Clip, duration: MediaTime) {
        let checksum = match metadata::sha256_file(&clip.file_url) {
            Ok(checksum) => checksum,
            Err(e) => {
                log::warn!("clip checksum failed: {e}");
                return;
            }
        };
        let sidecar = metadata::ClipMetadata {
            id: clip.id.to_string(),
            file_path: clip.file_url.to_string_lossy().into_owned(),
            duration_secs: duration.seconds(),
            created_at: clip.created_at.to_rfc3339(),
            checksum,
        };
        if let Err(e) = metadata::write_metadata(&sidecar, &clip.file_url) {
            log::warn!("writing clip sidecar failed: {e}");
        }
    }
}

/// Pixel adaptor dimensions: explicit settings first, source format second.
fn adaptor_dimensions(
    settings: &EncoderSettings,
    format: Option<&FormatDescription>,
) -> Option<Dimensions> {
    settings_dimensions(settings).or_else(|| format.and_then(|f| f.dimensions))
}
