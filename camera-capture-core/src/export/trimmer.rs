use std::path::Path;
use std::sync::Arc;

use crate::models::error::{ExportError, TrimError};
use crate::models::time::TimeRange;
use crate::traits::media_reader::AssetLibrary;
use crate::traits::media_writer::MediaWriterFactory;

use super::exporter::{ExportConfiguration, Exporter};

/// Stateless sub-range trim over the export pipeline. Single attempt, no
/// retry.
pub struct Trimmer {
    library: Arc<dyn AssetLibrary>,
    writer_factory: Arc<dyn MediaWriterFactory>,
}

impl Trimmer {
    pub fn new(library: Arc<dyn AssetLibrary>, writer_factory: Arc<dyn MediaWriterFactory>) -> Self {
        Self {
            library,
            writer_factory,
        }
    }

    /// Trim `source` to `range`, writing the result to `destination`.
    ///
    /// A missing source fails with `FileNotFound` before the destination is
    /// touched.
    pub fn trim(&self, source: &Path, destination: &Path, range: TimeRange) -> Result<(), TrimError> {
        if !source.exists() {
            return Err(TrimError::FileNotFound(source.to_path_buf()));
        }

        let reader = self
            .library
            .open(source, Some(range))
            .map_err(|e| TrimError::ExportSessionCreationFailed(e.to_string()))?;
        let writer = self
            .writer_factory
            .make_writer(destination)
            .map_err(|e| TrimError::ExportSessionCreationFailed(e.to_string()))?;

        let config = ExportConfiguration {
            time_range: Some(range),
            ..Default::default()
        };
        Exporter::new(reader, writer, config)
            .export(None)
            .map_err(|e| match e {
                ExportError::Cancelled => TrimError::Cancelled,
                other => TrimError::ExportFailed(other),
            })
    }
}
