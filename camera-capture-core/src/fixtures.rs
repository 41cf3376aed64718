//! In-memory mock collaborators shared by the unit tests.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::buffer::{Dimensions, FormatDescription, MediaKind, TimedBuffer};
use crate::models::clip::Clip;
use crate::models::config::{EncoderSettings, PhotoConfiguration, SessionPreset, Transform};
use crate::models::error::{DeviceError, ExportError, ReaderError, WriterError};
use crate::models::photo::{Photo, PhotoSource};
use crate::models::state::{AuthorizationStatus, DevicePosition, TorchMode};
use crate::models::time::{MediaTime, TimeRange};
use crate::pipeline::channel::BufferSender;
use crate::traits::capture_service::{CaptureDevice, CaptureService};
use crate::traits::media_reader::{AssetLibrary, MediaReader, ReaderStatus, TrackId, TrackInfo};
use crate::traits::media_writer::{MediaWriter, MediaWriterFactory, WriterInputId, WriterStatus};

// --- Buffer builders ---

pub fn video_buffer(pts_secs: f64, dur_secs: f64) -> TimedBuffer {
    TimedBuffer::new(
        vec![0xABu8; 32],
        MediaTime::from_seconds(pts_secs, 600),
        MediaTime::from_seconds(dur_secs, 600),
        FormatDescription::video(Dimensions::new(1920, 1080)),
    )
}

pub fn audio_buffer(pts_secs: f64, dur_secs: f64) -> TimedBuffer {
    TimedBuffer::new(
        vec![0xCDu8; 16],
        MediaTime::from_seconds(pts_secs, 600),
        MediaTime::from_seconds(dur_secs, 600),
        FormatDescription::audio(44_100.0, 2),
    )
}

pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("camera_capture_fixture_{name}"));
    fs::create_dir_all(&dir).expect("scratch dir");
    dir
}

// --- Writer ---

#[derive(Debug)]
pub struct InputRecord {
    pub kind: MediaKind,
    pub settings: EncoderSettings,
    pub adaptor: Option<Dimensions>,
    pub ready: bool,
}

/// Observable state of a `MemoryWriter`, shared with the test through an
/// `Arc` so it stays inspectable after the session takes ownership.
#[derive(Debug, Default)]
pub struct WriterLog {
    pub inputs: Vec<InputRecord>,
    pub appended: Vec<(WriterInputId, TimedBuffer)>,
    pub session_start: Option<MediaTime>,
    pub started: bool,
    pub finished: bool,
    pub cancelled: bool,
    pub fail_start: bool,
    pub fail_finish: bool,
    pub refuse_inputs: bool,
}

impl WriterLog {
    /// Rebased timestamps of appended buffers for `kind`, in append order.
    pub fn timestamps(&self, kind: MediaKind) -> Vec<f64> {
        self.appended
            .iter()
            .filter(|(_, b)| b.kind == kind)
            .map(|(_, b)| b.presentation_timestamp.seconds())
            .collect()
    }

    pub fn set_ready(&mut self, kind: MediaKind, ready: bool) {
        for input in self.inputs.iter_mut().filter(|i| i.kind == kind) {
            input.ready = ready;
        }
    }
}

pub struct MemoryWriter {
    path: PathBuf,
    status: WriterStatus,
    pub log: Arc<Mutex<WriterLog>>,
}

impl MemoryWriter {
    pub fn new(path: PathBuf, log: Arc<Mutex<WriterLog>>) -> Self {
        Self {
            path,
            status: WriterStatus::Unknown,
            log,
        }
    }
}

impl MediaWriter for MemoryWriter {
    fn add_input(
        &mut self,
        kind: MediaKind,
        settings: EncoderSettings,
        _format_hint: Option<&FormatDescription>,
    ) -> Result<WriterInputId, WriterError> {
        let mut log = self.log.lock();
        if log.refuse_inputs {
            return Err(WriterError::CannotAddInput(kind, "refused".into()));
        }
        log.inputs.push(InputRecord {
            kind,
            settings,
            adaptor: None,
            ready: true,
        });
        Ok(log.inputs.len() - 1)
    }

    fn attach_pixel_adaptor(
        &mut self,
        input: WriterInputId,
        dimensions: Dimensions,
    ) -> Result<(), WriterError> {
        self.log.lock().inputs[input].adaptor = Some(dimensions);
        Ok(())
    }

    fn start_writing(&mut self) -> bool {
        let mut log = self.log.lock();
        if log.fail_start {
            self.status = WriterStatus::Failed;
            return false;
        }
        log.started = true;
        drop(log);
        if fs::write(&self.path, b"").is_err() {
            self.status = WriterStatus::Failed;
            return false;
        }
        self.status = WriterStatus::Writing;
        true
    }

    fn start_session(&mut self, at: MediaTime) {
        self.log.lock().session_start = Some(at);
    }

    fn is_ready_for_more_data(&self, input: WriterInputId) -> bool {
        self.status == WriterStatus::Writing && self.log.lock().inputs[input].ready
    }

    fn append(&mut self, input: WriterInputId, buffer: &TimedBuffer) -> bool {
        if self.status != WriterStatus::Writing {
            return false;
        }
        self.log.lock().appended.push((input, buffer.clone()));
        true
    }

    fn finish_writing(&mut self) -> Result<(), WriterError> {
        let mut log = self.log.lock();
        if log.fail_finish {
            self.status = WriterStatus::Failed;
            return Err(WriterError::FinishFailed("simulated".into()));
        }
        log.finished = true;
        let payload: Vec<u8> = log
            .appended
            .iter()
            .flat_map(|(_, b)| b.data().to_vec())
            .collect();
        drop(log);
        fs::write(&self.path, payload).map_err(|e| WriterError::Storage(e.to_string()))?;
        self.status = WriterStatus::Completed;
        Ok(())
    }

    fn cancel_writing(&mut self) {
        self.log.lock().cancelled = true;
        self.status = WriterStatus::Cancelled;
    }

    fn status(&self) -> WriterStatus {
        self.status
    }

    fn error(&self) -> Option<WriterError> {
        match self.status {
            WriterStatus::Failed => Some(WriterError::StartFailed("simulated".into())),
            _ => None,
        }
    }

    fn output_path(&self) -> &Path {
        &self.path
    }
}

/// Factory retaining a log handle for every writer it creates.
#[derive(Default)]
pub struct MemoryWriterFactory {
    pub created: Mutex<Vec<Arc<Mutex<WriterLog>>>>,
    /// Applied to the next created writer's log.
    pub fail_next_start: Mutex<bool>,
    pub refuse_next_inputs: Mutex<bool>,
}

impl MemoryWriterFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn last_log(&self) -> Arc<Mutex<WriterLog>> {
        Arc::clone(self.created.lock().last().expect("no writer created"))
    }
}

impl MediaWriterFactory for MemoryWriterFactory {
    fn make_writer(&self, destination: &Path) -> Result<Box<dyn MediaWriter>, WriterError> {
        let log = Arc::new(Mutex::new(WriterLog::default()));
        if std::mem::take(&mut *self.fail_next_start.lock()) {
            log.lock().fail_start = true;
        }
        if std::mem::take(&mut *self.refuse_next_inputs.lock()) {
            log.lock().refuse_inputs = true;
        }
        self.created.lock().push(Arc::clone(&log));
        Ok(Box::new(MemoryWriter::new(destination.to_path_buf(), log)))
    }
}

// --- Reader / library ---

pub struct MemoryReader {
    tracks: Vec<TrackInfo>,
    samples: Vec<VecDeque<TimedBuffer>>,
    duration: MediaTime,
    status: ReaderStatus,
    /// Fail after this many successful pulls, when set.
    pub fail_after: Option<usize>,
    pulls: usize,
}

impl MemoryReader {
    pub fn new(track_samples: Vec<(MediaKind, Vec<TimedBuffer>)>) -> Self {
        let mut tracks = Vec::new();
        let mut samples = Vec::new();
        let mut duration = MediaTime::zero();
        for (id, (kind, bufs)) in track_samples.into_iter().enumerate() {
            let format = bufs
                .first()
                .map(|b| b.format().clone())
                .unwrap_or_else(|| FormatDescription::audio(44_100.0, 2));
            if let Some(last) = bufs.last() {
                if last.end_timestamp() > duration {
                    duration = last.end_timestamp();
                }
            }
            tracks.push(TrackInfo {
                id,
                kind,
                format,
                transform: Transform::Identity,
            });
            samples.push(bufs.into());
        }
        Self {
            tracks,
            samples,
            duration,
            status: ReaderStatus::Idle,
            fail_after: None,
            pulls: 0,
        }
    }
}

impl MediaReader for MemoryReader {
    fn tracks(&self) -> Vec<TrackInfo> {
        self.tracks.clone()
    }

    fn duration(&self) -> MediaTime {
        self.duration
    }

    fn start_reading(&mut self) -> bool {
        self.status = ReaderStatus::Reading;
        true
    }

    fn copy_next_sample(&mut self, track: TrackId) -> Option<TimedBuffer> {
        if self.status != ReaderStatus::Reading {
            return None;
        }
        if let Some(limit) = self.fail_after {
            if self.pulls >= limit {
                self.status = ReaderStatus::Failed;
                return None;
            }
        }
        let sample = self.samples.get_mut(track)?.pop_front();
        if sample.is_some() {
            self.pulls += 1;
        }
        if self.samples.iter().all(|q| q.is_empty()) && self.status == ReaderStatus::Reading {
            self.status = ReaderStatus::Completed;
        }
        sample
    }

    fn status(&self) -> ReaderStatus {
        self.status
    }

    fn error(&self) -> Option<ReaderError> {
        match self.status {
            ReaderStatus::Failed => Some(ReaderError::DecodeFailed("simulated".into())),
            _ => None,
        }
    }

    fn cancel_reading(&mut self) {
        self.status = ReaderStatus::Cancelled;
    }
}

type ReaderBuilder = Box<dyn Fn() -> MemoryReader + Send + Sync>;

/// Library producing `MemoryReader`s; `compose` concatenates nothing fancy,
/// it just replays whatever the builder yields.
pub struct MemoryLibrary {
    builder: ReaderBuilder,
    pub composed_clip_counts: Mutex<Vec<usize>>,
}

impl MemoryLibrary {
    pub fn new(builder: impl Fn() -> MemoryReader + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            builder: Box::new(builder),
            composed_clip_counts: Mutex::new(Vec::new()),
        })
    }
}

impl AssetLibrary for MemoryLibrary {
    fn open(
        &self,
        _path: &Path,
        _range: Option<TimeRange>,
    ) -> Result<Box<dyn MediaReader>, ExportError> {
        Ok(Box::new((self.builder)()))
    }

    fn compose(&self, clips: &[Clip]) -> Result<Box<dyn MediaReader>, ExportError> {
        self.composed_clip_counts.lock().push(clips.len());
        Ok(Box::new((self.builder)()))
    }
}

// --- Capture service ---

pub struct FakeDevice {
    pub position: DevicePosition,
    pub torch_available: bool,
    pub torch_mode: TorchMode,
    pub locked: bool,
    pub lock_count: usize,
    pub unlock_count: usize,
    pub fail_focus: bool,
}

impl FakeDevice {
    pub fn new(position: DevicePosition) -> Self {
        Self {
            position,
            torch_available: true,
            torch_mode: TorchMode::Off,
            locked: false,
            lock_count: 0,
            unlock_count: 0,
            fail_focus: false,
        }
    }
}

impl CaptureDevice for FakeDevice {
    fn position(&self) -> DevicePosition {
        self.position
    }

    fn has_torch(&self) -> bool {
        true
    }

    fn is_torch_available(&self) -> bool {
        self.torch_available
    }

    fn lock_for_configuration(&mut self) -> Result<(), DeviceError> {
        self.locked = true;
        self.lock_count += 1;
        Ok(())
    }

    fn unlock_for_configuration(&mut self) {
        self.locked = false;
        self.unlock_count += 1;
    }

    fn set_torch_mode(&mut self, mode: TorchMode) -> Result<(), DeviceError> {
        if !self.torch_available {
            return Err(DeviceError::NotAvailable);
        }
        self.torch_mode = mode;
        Ok(())
    }

    fn set_focus_point(&mut self, _x: f32, _y: f32) -> Result<(), DeviceError> {
        if self.fail_focus {
            return Err(DeviceError::LockFailed("focus refused".into()));
        }
        Ok(())
    }

    fn set_exposure_point(&mut self, _x: f32, _y: f32) -> Result<(), DeviceError> {
        Ok(())
    }
}

pub struct FakeCaptureService {
    pub authorization: AuthorizationStatus,
    pub device: Option<FakeDevice>,
    pub audio_sender: Option<BufferSender>,
    pub video_sender: Option<BufferSender>,
    pub preset: Option<SessionPreset>,
    pub running: bool,
    pub cameras_added: Vec<DevicePosition>,
    pub photo_output_added: bool,
    pub fail_add_camera: bool,
    pub fail_photo: bool,
}

impl FakeCaptureService {
    pub fn authorized() -> Self {
        Self {
            authorization: AuthorizationStatus::Authorized,
            device: None,
            audio_sender: None,
            video_sender: None,
            preset: None,
            running: false,
            cameras_added: Vec::new(),
            photo_output_added: false,
            fail_add_camera: false,
            fail_photo: false,
        }
    }

    pub fn denied() -> Self {
        Self {
            authorization: AuthorizationStatus::Denied,
            ..Self::authorized()
        }
    }
}

impl CaptureService for FakeCaptureService {
    fn authorization_status(&self, _kind: MediaKind) -> AuthorizationStatus {
        self.authorization
    }

    fn set_preset(&mut self, preset: SessionPreset) -> Result<(), DeviceError> {
        self.preset = Some(preset);
        Ok(())
    }

    fn add_camera(&mut self, position: DevicePosition) -> Result<(), DeviceError> {
        if self.fail_add_camera {
            return Err(DeviceError::Busy);
        }
        self.cameras_added.push(position);
        self.device = Some(FakeDevice::new(position));
        Ok(())
    }

    fn add_audio_output(&mut self, sender: BufferSender) -> Result<(), DeviceError> {
        self.audio_sender = Some(sender);
        Ok(())
    }

    fn add_video_output(&mut self, sender: BufferSender) -> Result<(), DeviceError> {
        self.video_sender = Some(sender);
        Ok(())
    }

    fn add_photo_output(&mut self) -> Result<(), DeviceError> {
        self.photo_output_added = true;
        Ok(())
    }

    fn start_running(&mut self) {
        self.running = true;
    }

    fn stop_running(&mut self) {
        self.running = false;
    }

    fn device(&mut self) -> Option<&mut dyn CaptureDevice> {
        self.device.as_mut().map(|d| d as &mut dyn CaptureDevice)
    }

    fn capture_photo(&mut self, _config: &PhotoConfiguration) -> Result<Photo, DeviceError> {
        if self.fail_photo {
            return Err(DeviceError::CaptureFailed("simulated".into()));
        }
        Ok(Photo::new(vec![0xEEu8; 8], PhotoSource::Still))
    }
}
