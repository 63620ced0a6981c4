//! Newline-delimited JSON files, one per category, inside a session
//! directory.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{LogSink, Result, SinkError};
use crate::events::Category;

/// One open category stream.
struct CategoryFile {
    path: PathBuf,
    file: File,
    /// Length of the file after the last complete batch.
    offset: u64,
}

impl CategoryFile {
    fn open_or_create(path: PathBuf) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(SinkError::Io)?;

        let offset = file.metadata().map_err(SinkError::Io)?.len();

        tracing::debug!(
            target: "recorder::flush",
            "Opened/created log: {} at offset {}",
            path.display(),
            offset
        );

        Ok(Self { path, file, offset })
    }
}

/// File-backed sink writing `<session_dir>/<category>.jsonl`.
///
/// Files are opened lazily on the first batch of each category and always
/// appended to, so a resumed session id continues its existing files.
pub struct FileSink {
    session_dir: PathBuf,
    files: HashMap<Category, CategoryFile>,
}

impl FileSink {
    /// Creates the session directory if needed.
    pub fn open(session_dir: impl AsRef<Path>) -> Result<Self> {
        let session_dir = session_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&session_dir).map_err(SinkError::Io)?;

        Ok(Self {
            session_dir,
            files: HashMap::new(),
        })
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    /// Path the category is (or will be) written to.
    pub fn path_for(&self, category: Category) -> PathBuf {
        self.session_dir.join(category.file_name())
    }

    fn stream(&mut self, category: Category) -> Result<&mut CategoryFile> {
        let path = self.path_for(category);
        match self.files.entry(category) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(CategoryFile::open_or_create(path)?)),
        }
    }
}

impl LogSink for FileSink {
    fn append_lines(&mut self, category: Category, lines: &[String]) -> Result<()> {
        if lines.is_empty() {
            return Ok(());
        }

        let mut batch = Vec::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
        for line in lines {
            batch.extend_from_slice(line.as_bytes());
            batch.push(b'\n');
        }

        let stream = self.stream(category)?;
        if let Err(error) = stream.file.write_all(&batch) {
            // Roll back whatever part of the batch reached the file so a retry
            // does not duplicate lines.
            let actual = stream.file.metadata().map(|m| m.len()).unwrap_or(stream.offset);
            if actual != stream.offset && stream.file.set_len(stream.offset).is_err() {
                return Err(SinkError::PartialWrite {
                    category,
                    offset: stream.offset,
                    expected: batch.len(),
                    actual: actual.saturating_sub(stream.offset),
                });
            }
            return Err(SinkError::Io(error));
        }

        stream.offset += batch.len() as u64;
        tracing::trace!(
            target: "recorder::flush",
            path = %stream.path.display(),
            lines = lines.len(),
            "batch appended"
        );
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        for stream in self.files.values_mut() {
            stream.file.flush().map_err(SinkError::Io)?;
            stream.file.sync_data().map_err(SinkError::Io)?;
        }
        Ok(())
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        if let Err(e) = self.sync() {
            tracing::warn!(
                target: "recorder::flush",
                "Failed to sync {} on drop: {}",
                self.session_dir.display(),
                e
            );
        }
    }
}
