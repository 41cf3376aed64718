use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::export::exporter::ExportConfiguration;
use crate::models::buffer::{MediaKind, TimedBuffer};
use crate::models::clip::Clip;
use crate::models::config::{
    AudioConfiguration, PhotoConfiguration, SessionPreset, VideoConfiguration,
};
use crate::models::error::RecorderError;
use crate::models::photo::{Photo, PhotoSource};
use crate::models::state::{AuthorizationStatus, DevicePosition, PhotoStatus, RecordStatus, TorchMode};
use crate::models::time::MediaTime;
use crate::pipeline::channel::{buffer_channel, default_capacity, BufferReceiver};
use crate::traits::capture_service::CaptureService;
use crate::traits::recorder_delegate::RecorderDelegate;

use super::recording::{RecordingSession, SessionServices};

/// Construction-time recorder settings.
#[derive(Clone)]
pub struct RecorderOptions {
    pub output_directory: PathBuf,
    pub preset: SessionPreset,
    pub video: VideoConfiguration,
    pub audio: AudioConfiguration,
    pub photo: PhotoConfiguration,
    pub position: DevicePosition,
    /// Auto-finish the recording once the total duration reaches this.
    pub max_clip_duration: Option<MediaTime>,
    /// Floor interval between processed video frames; faster arrivals are
    /// dropped instead of blocking the producer.
    pub min_time_between_frames: Option<Duration>,
}

impl RecorderOptions {
    pub fn new(output_directory: PathBuf) -> Self {
        Self {
            output_directory,
            preset: SessionPreset::High,
            video: VideoConfiguration::default(),
            audio: AudioConfiguration::default(),
            photo: PhotoConfiguration::default(),
            position: DevicePosition::Back,
            max_clip_duration: None,
            min_time_between_frames: None,
        }
    }
}

/// Intake and drop counters for debugging capture sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecorderDiagnostics {
    pub video_buffers_received: u64,
    pub audio_buffers_received: u64,
    pub video_buffers_dropped: u64,
    pub audio_buffers_dropped: u64,
    pub rate_limited_video: u64,
}

/// Mutable state shared between the public API and the drain thread.
///
/// The single mutex is the serialization point for every session mutation:
/// clip transitions cannot race buffer appends because both sides go through
/// it.
struct Shared {
    record_status: RecordStatus,
    photo_status: PhotoStatus,
    torch_mode: TorchMode,
    session: Option<RecordingSession>,
    video_config: VideoConfiguration,
    audio_config: AudioConfiguration,
    needs_update_configuration: bool,
    last_video_buffer: Option<TimedBuffer>,
    last_video_instant: Option<Instant>,
    min_time_between_frames: Option<Duration>,
    max_clip_duration: Option<MediaTime>,
    diagnostics: RecorderDiagnostics,
}

/// Deferred delegate notifications, emitted after the shared lock is
/// released.
enum DelegateEvent {
    Status(RecordStatus),
    Duration(f64),
    Clip(Clip),
    Photo(Photo),
    Error(RecorderError),
}

fn emit(delegate: Option<&Arc<dyn RecorderDelegate>>, events: Vec<DelegateEvent>) {
    let Some(delegate) = delegate else {
        return;
    };
    for event in events {
        match event {
            DelegateEvent::Status(status) => delegate.on_record_status_changed(status),
            DelegateEvent::Duration(seconds) => delegate.on_duration_updated(seconds),
            DelegateEvent::Clip(clip) => delegate.on_clip_finished(&clip),
            DelegateEvent::Photo(photo) => delegate.on_photo_captured(&photo),
            DelegateEvent::Error(error) => delegate.on_error(&error),
        }
    }
}

/// Orchestrates the capture device session and feeds its buffers into a
/// `RecordingSession`.
///
/// Generic over the platform capture service. Buffers arrive on two bounded
/// channels (one per media kind) and are drained by a named background
/// thread; every mutation of recording state goes through one shared mutex.
pub struct Recorder<S: CaptureService> {
    service: S,
    session_services: SessionServices,
    options: RecorderOptions,
    position: DevicePosition,
    delegate: Option<Arc<dyn RecorderDelegate>>,
    shared: Arc<Mutex<Shared>>,
    drain_running: Arc<AtomicBool>,
    drain_handle: Option<thread::JoinHandle<()>>,
}

impl<S: CaptureService> Recorder<S> {
    pub fn new(
        service: S,
        session_services: SessionServices,
        options: RecorderOptions,
        delegate: Option<Arc<dyn RecorderDelegate>>,
    ) -> Self {
        let shared = Shared {
            record_status: RecordStatus::Initial,
            photo_status: PhotoStatus::Initial,
            torch_mode: TorchMode::Off,
            session: None,
            video_config: options.video.clone(),
            audio_config: options.audio.clone(),
            needs_update_configuration: false,
            last_video_buffer: None,
            last_video_instant: None,
            min_time_between_frames: options.min_time_between_frames,
            max_clip_duration: options.max_clip_duration,
            diagnostics: RecorderDiagnostics::default(),
        };
        let position = options.position;
        Self {
            service,
            session_services,
            options,
            position,
            delegate,
            shared: Arc::new(Mutex::new(shared)),
            drain_running: Arc::new(AtomicBool::new(false)),
            drain_handle: None,
        }
    }

    pub fn record_status(&self) -> RecordStatus {
        self.shared.lock().record_status
    }

    pub fn photo_status(&self) -> PhotoStatus {
        self.shared.lock().photo_status
    }

    pub fn torch_mode(&self) -> TorchMode {
        self.shared.lock().torch_mode
    }

    pub fn position(&self) -> DevicePosition {
        self.position
    }

    pub fn seconds_recorded(&self) -> f64 {
        self.shared
            .lock()
            .session
            .as_ref()
            .map_or(0.0, |s| s.total_duration().seconds())
    }

    pub fn clips(&self) -> Vec<Clip> {
        self.shared
            .lock()
            .session
            .as_ref()
            .map_or_else(Vec::new, |s| s.clips().to_vec())
    }

    pub fn diagnostics(&self) -> RecorderDiagnostics {
        self.shared.lock().diagnostics
    }

    /// Set up the capture graph and start receiving buffers.
    ///
    /// On failure the recorder unwinds back to `Initial` with no torn state.
    pub fn start(&mut self) -> Result<(), RecorderError> {
        if self.shared.lock().record_status != RecordStatus::Initial {
            return Err(RecorderError::RecordInProgress);
        }

        for kind in [MediaKind::Video, MediaKind::Audio] {
            match self.service.authorization_status(kind) {
                AuthorizationStatus::Authorized => {}
                AuthorizationStatus::Denied => return Err(RecorderError::AccessDenied(kind)),
                AuthorizationStatus::NotDetermined => {
                    return Err(RecorderError::NotAuthorized(kind))
                }
            }
        }

        if let Err(e) = self.configure_capture_graph() {
            self.teardown();
            return Err(e);
        }

        self.shared.lock().record_status = RecordStatus::Initialized;
        emit(
            self.delegate.as_ref(),
            vec![DelegateEvent::Status(RecordStatus::Initialized)],
        );
        Ok(())
    }

    /// Begin (or resume) recording. The next video or audio buffer lazily
    /// opens a clip.
    pub fn record(&mut self) -> Result<(), RecorderError> {
        let changed = {
            let mut s = self.shared.lock();
            match s.record_status {
                RecordStatus::Initialized | RecordStatus::Paused => {
                    s.record_status = RecordStatus::Recording;
                    true
                }
                RecordStatus::Recording => false,
                other => {
                    log::warn!("record() ignored in status {other:?}");
                    false
                }
            }
        };
        if changed {
            emit(
                self.delegate.as_ref(),
                vec![DelegateEvent::Status(RecordStatus::Recording)],
            );
        }
        Ok(())
    }

    /// Finish the current clip and move to `Paused`.
    ///
    /// A recorder that never started recording no-ops. On failure the status
    /// is left unchanged so the caller can retry or abandon.
    pub fn pause(&mut self) -> Result<(), RecorderError> {
        let mut events = Vec::new();
        {
            let mut s = self.shared.lock();
            if s.record_status != RecordStatus::Recording {
                return Ok(());
            }
            let Shared {
                session,
                record_status,
                ..
            } = &mut *s;
            let Some(session) = session.as_mut() else {
                return Ok(());
            };
            match session.finish_clip() {
                Ok(clip) => {
                    *record_status = RecordStatus::Paused;
                    if let Some(clip) = clip {
                        events.push(DelegateEvent::Clip(clip));
                    }
                    events.push(DelegateEvent::Status(RecordStatus::Paused));
                }
                Err(e) => return Err(RecorderError::FailedToPauseRecording(e)),
            }
        }
        self.turn_torch_off_soft();
        emit(self.delegate.as_ref(), events);
        Ok(())
    }

    /// Finish the recording and tear the capture session down.
    ///
    /// Returns the lone clip, or the merged output when more than one clip
    /// was recorded. Teardown runs regardless of the outcome; any underlying
    /// error is rethrown afterwards.
    pub fn stop_recording(&mut self) -> Result<Option<Clip>, RecorderError> {
        let mut events = Vec::new();
        let result = self.finish_and_merge(&mut events);
        self.teardown();
        {
            let mut s = self.shared.lock();
            s.record_status = RecordStatus::Initial;
        }
        events.push(DelegateEvent::Status(RecordStatus::Initial));
        emit(self.delegate.as_ref(), events);
        result
    }

    /// Capture a still photo.
    ///
    /// While recording, the photo is synthesized from the most recent video
    /// buffer instead of interrupting capture. Only one capture may be in
    /// flight; a second request fails fast.
    pub fn take_photo(&mut self) -> Result<Photo, RecorderError> {
        let (recording, frame) = {
            let mut s = self.shared.lock();
            if s.photo_status.is_capturing() {
                return Err(RecorderError::FailedToCapturePhoto(
                    "a photo capture is already in flight".into(),
                ));
            }
            s.photo_status = PhotoStatus::Capturing;
            (s.record_status.is_recording(), s.last_video_buffer.clone())
        };

        let result = if recording {
            frame
                .map(|b| Photo::new(b.data().to_vec(), PhotoSource::VideoFrame))
                .ok_or_else(|| {
                    RecorderError::FailedToCapturePhoto("no video frame available yet".into())
                })
        } else {
            self.service
                .capture_photo(&self.options.photo)
                .map_err(|e| RecorderError::FailedToCapturePhoto(e.to_string()))
        };

        self.shared.lock().photo_status = match result {
            Ok(_) => PhotoStatus::Finished,
            Err(_) => PhotoStatus::Failed,
        };
        if let Ok(photo) = &result {
            emit(
                self.delegate.as_ref(),
                vec![DelegateEvent::Photo(photo.clone())],
            );
        }
        result
    }

    /// Switch to the camera at `position`, pausing and resuming around the
    /// hardware swap when recording (which produces a clip boundary).
    pub fn set_device_position(&mut self, position: DevicePosition) -> Result<(), RecorderError> {
        if position == self.position {
            return Ok(());
        }
        let was_recording = self.shared.lock().record_status.is_recording();
        if was_recording {
            self.pause()?;
        }
        self.service
            .add_camera(position)
            .map_err(RecorderError::CannotAddDevice)?;
        self.position = position;
        self.shared.lock().needs_update_configuration = true;
        if was_recording {
            self.record()?;
        }
        Ok(())
    }

    pub fn flip_camera(&mut self) -> Result<(), RecorderError> {
        self.set_device_position(self.position.opposite())
    }

    /// Set the torch mode. The device is untouched when the torch is
    /// unsupported or currently unavailable.
    pub fn set_torch_mode(&mut self, mode: TorchMode) -> Result<(), RecorderError> {
        let Some(device) = self.service.device() else {
            return Err(RecorderError::TorchNotAvailable);
        };
        if !device.has_torch() {
            return Err(RecorderError::TorchNotSupported);
        }
        if !device.is_torch_available() {
            return Err(RecorderError::TorchNotAvailable);
        }

        device
            .lock_for_configuration()
            .map_err(RecorderError::FailedToSetTorch)?;
        let result = device.set_torch_mode(mode);
        device.unlock_for_configuration();
        result.map_err(RecorderError::FailedToSetTorch)?;

        self.shared.lock().torch_mode = mode;
        Ok(())
    }

    /// Point focus and exposure at `(x, y)`. Hardware refusal degrades
    /// silently.
    pub fn set_focus_point(&mut self, x: f32, y: f32) {
        let Some(device) = self.service.device() else {
            return;
        };
        if let Err(e) = device.lock_for_configuration() {
            log::warn!("focus configuration lock failed: {e}");
            return;
        }
        if let Err(e) = device.set_focus_point(x, y) {
            log::warn!("setting focus point failed: {e}");
        }
        if let Err(e) = device.set_exposure_point(x, y) {
            log::warn!("setting exposure point failed: {e}");
        }
        device.unlock_for_configuration();
    }

    /// Flag a gap in buffer delivery (e.g. app sleep) so the session rebases
    /// the next buffer contiguously.
    pub fn note_interruption(&mut self) {
        if let Some(session) = self.shared.lock().session.as_mut() {
            session.note_interruption();
        }
    }

    // --- Internal helpers ---

    fn configure_capture_graph(&mut self) -> Result<(), RecorderError> {
        self.service
            .set_preset(self.options.preset)
            .map_err(RecorderError::CannotSetPreset)?;
        self.service
            .add_camera(self.position)
            .map_err(RecorderError::CannotAddDevice)?;

        let (video_tx, video_rx) =
            buffer_channel(MediaKind::Video, default_capacity(MediaKind::Video));
        let (audio_tx, audio_rx) =
            buffer_channel(MediaKind::Audio, default_capacity(MediaKind::Audio));
        self.service
            .add_video_output(video_tx)
            .map_err(RecorderError::CannotAddVideoOutput)?;
        self.service
            .add_audio_output(audio_tx)
            .map_err(RecorderError::CannotAddAudioOutput)?;
        self.service
            .add_photo_output()
            .map_err(RecorderError::CannotAddPhotoOutput)?;

        self.shared.lock().session = Some(RecordingSession::new(
            self.options.output_directory.clone(),
            self.session_services.clone(),
        ));

        self.spawn_drain(video_rx, audio_rx);
        self.service.start_running();
        Ok(())
    }

    fn spawn_drain(&mut self, video_rx: BufferReceiver, audio_rx: BufferReceiver) {
        self.drain_running.store(true, Ordering::SeqCst);

        let running = Arc::clone(&self.drain_running);
        let shared = Arc::clone(&self.shared);
        let delegate = self.delegate.clone();

        let handle = thread::Builder::new()
            .name("capture-drain".into())
            .spawn(move || {
                while running.load(Ordering::SeqCst) {
                    crossbeam_channel::select! {
                        recv(video_rx.inner()) -> msg => match msg {
                            Ok(buffer) => handle_video_buffer(&shared, delegate.as_ref(), buffer),
                            Err(_) => break,
                        },
                        recv(audio_rx.inner()) -> msg => match msg {
                            Ok(buffer) => handle_audio_buffer(&shared, delegate.as_ref(), buffer),
                            Err(_) => break,
                        },
                        default(Duration::from_millis(100)) => {}
                    }
                }
            })
            .expect("failed to spawn drain thread");

        self.drain_handle = Some(handle);
    }

    fn finish_and_merge(
        &mut self,
        events: &mut Vec<DelegateEvent>,
    ) -> Result<Option<Clip>, RecorderError> {
        let mut s = self.shared.lock();
        if s.session.is_none() {
            return Ok(None);
        }
        s.record_status = RecordStatus::Finished;
        events.push(DelegateEvent::Status(RecordStatus::Finished));

        let Shared {
            session,
            record_status,
            video_config,
            audio_config,
            ..
        } = &mut *s;
        let Some(session) = session.as_mut() else {
            return Ok(None);
        };

        let last = session
            .finish_clip()
            .map_err(RecorderError::FailedToStopRecording)?;
        if let Some(clip) = &last {
            events.push(DelegateEvent::Clip(clip.clone()));
        }

        match session.clips() {
            [] => Ok(None),
            [only] => Ok(Some(only.clone())),
            _ => {
                *record_status = RecordStatus::Saving;
                events.push(DelegateEvent::Status(RecordStatus::Saving));
                let config = ExportConfiguration {
                    video: Some(video_config.clone()),
                    audio: Some(audio_config.clone()),
                    time_range: None,
                };
                let path = session
                    .merge_clips(&config)
                    .map_err(RecorderError::FailedToStopRecording)?;
                Ok(Some(Clip::new(path)))
            }
        }
    }

    /// Idempotent teardown: stop the drain thread, stop the device session,
    /// drop the recording session and its duration counters.
    fn teardown(&mut self) {
        self.drain_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.drain_handle.take() {
            let _ = handle.join();
        }
        self.service.stop_running();

        let mut s = self.shared.lock();
        s.session = None;
        s.last_video_buffer = None;
        s.last_video_instant = None;
        s.needs_update_configuration = false;
    }

    fn turn_torch_off_soft(&mut self) {
        if self.shared.lock().torch_mode == TorchMode::Off {
            return;
        }
        if let Err(e) = self.set_torch_mode(TorchMode::Off) {
            log::warn!("turning torch off failed: {e}");
        }
    }
}

impl<S: CaptureService> Drop for Recorder<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}

// --- Drain-thread buffer intake ---

fn handle_video_buffer(
    shared: &Mutex<Shared>,
    delegate: Option<&Arc<dyn RecorderDelegate>>,
    buffer: TimedBuffer,
) {
    let mut events = Vec::new();
    'locked: {
        let mut s = shared.lock();
        if !s.record_status.accepts_buffers() {
            return;
        }

        // Non-blocking rate limit: a frame arriving under the floor interval
        // is dropped rather than stalling the producer.
        if let Some(min) = s.min_time_between_frames {
            if let Some(last) = s.last_video_instant {
                if last.elapsed() < min {
                    s.diagnostics.rate_limited_video += 1;
                    return;
                }
            }
        }
        s.last_video_instant = Some(Instant::now());
        s.last_video_buffer = Some(buffer.clone());
        s.diagnostics.video_buffers_received += 1;

        if s.needs_update_configuration {
            if let Some(session) = s.session.as_mut() {
                session.mark_configuration_stale();
            }
            s.needs_update_configuration = false;
        }

        let Shared {
            session,
            record_status,
            video_config,
            max_clip_duration,
            diagnostics,
            ..
        } = &mut *s;
        let Some(session) = session.as_mut() else {
            return;
        };

        if !session.has_configured_video() {
            match video_config.output_settings(Some(buffer.format())) {
                Ok(settings) => {
                    session.configure_video(settings, Some(buffer.format()));
                }
                Err(e) => log::warn!("video encoder settings unavailable: {e}"),
            }
        }

        if *record_status == RecordStatus::Recording {
            if !session.has_active_writer() {
                if let Err(e) = session.begin_new_clip() {
                    events.push(DelegateEvent::Error(RecorderError::Session(e)));
                    break 'locked;
                }
            }

            let appended =
                session.append_video_buffer(&buffer, video_config.min_frame_duration());
            if !appended {
                diagnostics.video_buffers_dropped += 1;
            }

            if let Some(max) = max_clip_duration {
                if session.total_duration() >= *max {
                    match session.finish_clip() {
                        Ok(Some(clip)) => events.push(DelegateEvent::Clip(clip)),
                        Ok(None) => {}
                        Err(e) => events.push(DelegateEvent::Error(RecorderError::Session(e))),
                    }
                    *record_status = RecordStatus::Finished;
                    events.push(DelegateEvent::Status(RecordStatus::Finished));
                }
            }
            events.push(DelegateEvent::Duration(session.total_duration().seconds()));
        }
    }
    emit(delegate, events);
}

fn handle_audio_buffer(
    shared: &Mutex<Shared>,
    delegate: Option<&Arc<dyn RecorderDelegate>>,
    buffer: TimedBuffer,
) {
    let mut events = Vec::new();
    'locked: {
        let mut s = shared.lock();
        if !s.record_status.accepts_buffers() {
            return;
        }
        s.diagnostics.audio_buffers_received += 1;

        let Shared {
            session,
            record_status,
            audio_config,
            diagnostics,
            ..
        } = &mut *s;
        let Some(session) = session.as_mut() else {
            return;
        };

        if !session.has_configured_audio() {
            match audio_config.output_settings(Some(buffer.format())) {
                Ok(settings) => {
                    session.configure_audio(settings, Some(buffer.format()));
                }
                Err(e) => log::warn!("audio encoder settings unavailable: {e}"),
            }
        }

        if *record_status == RecordStatus::Recording {
            if !session.has_active_writer() {
                if let Err(e) = session.begin_new_clip() {
                    events.push(DelegateEvent::Error(RecorderError::Session(e)));
                    break 'locked;
                }
            }
            if !session.append_audio_buffer(&buffer) {
                diagnostics.audio_buffers_dropped += 1;
            }
            events.push(DelegateEvent::Duration(session.total_duration().seconds()));
        }
    }
    emit(delegate, events);
}
