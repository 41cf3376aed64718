use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::traits::asset_inspector::{AssetInfo, AssetInspector};

use super::error::ReaderError;
use super::time::MediaTime;

/// A finished recording segment backed by a container file on disk.
///
/// Immutable after creation except for cached derived properties, each
/// computed on demand and memoized. Completed clips are never auto-deleted;
/// callers remove files explicitly.
#[derive(Debug, Clone)]
pub struct Clip {
    pub id: Uuid,
    pub file_url: PathBuf,
    pub created_at: DateTime<Utc>,
    info_cache: Arc<Mutex<Option<AssetInfo>>>,
    thumbnail_cache: Arc<Mutex<Option<Arc<[u8]>>>>,
    last_frame_cache: Arc<Mutex<Option<Arc<[u8]>>>>,
}

impl Clip {
    pub fn new(file_url: PathBuf) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_url,
            created_at: Utc::now(),
            info_cache: Arc::new(Mutex::new(None)),
            thumbnail_cache: Arc::new(Mutex::new(None)),
            last_frame_cache: Arc::new(Mutex::new(None)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_url
    }

    /// Probe (and memoize) container-level info: duration, frame rate,
    /// orientation.
    pub fn info(&self, inspector: &dyn AssetInspector) -> Result<AssetInfo, ReaderError> {
        let mut cache = self.info_cache.lock();
        if let Some(info) = &*cache {
            return Ok(info.clone());
        }
        let info = inspector.probe(&self.file_url)?;
        *cache = Some(info.clone());
        Ok(info)
    }

    pub fn duration(&self, inspector: &dyn AssetInspector) -> Result<MediaTime, ReaderError> {
        Ok(self.info(inspector)?.duration)
    }

    pub fn frame_rate(&self, inspector: &dyn AssetInspector) -> Result<f64, ReaderError> {
        Ok(self.info(inspector)?.frame_rate)
    }

    /// Encoded image bytes for the first frame, memoized.
    pub fn thumbnail(&self, inspector: &dyn AssetInspector) -> Result<Arc<[u8]>, ReaderError> {
        let mut cache = self.thumbnail_cache.lock();
        if let Some(bytes) = &*cache {
            return Ok(Arc::clone(bytes));
        }
        let bytes: Arc<[u8]> = inspector.frame_image(&self.file_url, MediaTime::zero())?.into();
        *cache = Some(Arc::clone(&bytes));
        Ok(bytes)
    }

    /// Encoded image bytes for the last frame, memoized.
    pub fn last_frame(&self, inspector: &dyn AssetInspector) -> Result<Arc<[u8]>, ReaderError> {
        let mut cache = self.last_frame_cache.lock();
        if let Some(bytes) = &*cache {
            return Ok(Arc::clone(bytes));
        }
        let at = self.info(inspector)?.duration;
        let bytes: Arc<[u8]> = inspector.frame_image(&self.file_url, at)?.into();
        *cache = Some(Arc::clone(&bytes));
        Ok(bytes)
    }

    /// File size in bytes, read from the filesystem on each call.
    pub fn file_size(&self) -> std::io::Result<u64> {
        Ok(fs::metadata(&self.file_url)?.len())
    }
}
