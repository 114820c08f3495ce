use std::{fs, io::Write, path::{Path, PathBuf}};
use serde::Serialize;
use tracing::info;

use crate::errors::EnrichError;
use crate::types::EnrichedRecord;

/// Serializes `value` next to `path` in a temp file and renames it into
/// place, so a reader never observes a half written file
pub fn write_json_atomic<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
    pretty: bool
) -> Result<(), EnrichError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from(".")
    };

    fs::create_dir_all(&parent).map_err(|e|
        EnrichError::Io(std::io::Error::new(
            e.kind(), format!("create dir {}: {e}", parent.display())
        ))
    )?;

    let mut temp = tempfile::NamedTempFile::new_in(&parent)?;
    {
        let mut writer = std::io::BufWriter::new(temp.as_file_mut());
        if pretty {
            serde_json::to_writer_pretty(&mut writer, value)?;
        } else {
            serde_json::to_writer(&mut writer, value)?;
        }
        writer.write_all(b"\n")?;
        writer.flush()?;
    }

    temp.persist(path).map_err(|e|
        EnrichError::Io(std::io::Error::new(
            e.error.kind(), format!("persist {}: {}", path.display(), e.error)
        ))
    )?;
    Ok(())
}

/// Writes the run's records as an indented JSON array, replacing
/// whatever the previous run left behind
pub struct ReportSink {
    path: PathBuf
}

impl ReportSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, records: &[EnrichedRecord]) -> Result<&Path, EnrichError> {
        write_json_atomic(&self.path, records, true)?;
        info!(path = %self.path.display(), records = records.len(), "report.written");
        Ok(&self.path)
    }
}
