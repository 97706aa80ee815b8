//! Incremental reading of a growing log file

use crate::error::FileAccessError;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};

/// Follows a log file from the point it was opened
///
/// Only complete lines are returned. A line still being written is held back
/// until its newline arrives.
pub struct LogTailer {
    path: PathBuf,
    reader: BufReader<File>,
    /// Bytes of the file consumed as returned lines, plus the initial seek
    offset: u64,
    pending: Vec<u8>,
}

impl LogTailer {
    /// Opens `path` and positions the cursor at its current end
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, FileAccessError> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)
            .await
            .map_err(|e| FileAccessError::new(&path, e))?;
        let offset = file
            .seek(SeekFrom::End(0))
            .await
            .map_err(|e| FileAccessError::new(&path, e))?;

        tracing::info!(path = %path.display(), offset, "Tailing log file");

        Ok(Self {
            path,
            reader: BufReader::new(file),
            offset,
            pending: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Position just after the last returned line
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Returns the next complete line, or `None` if nothing new has been written
    pub async fn next_line(&mut self) -> Result<Option<String>, FileAccessError> {
        let read = self
            .reader
            .read_until(b'\n', &mut self.pending)
            .await
            .map_err(|e| FileAccessError::new(&self.path, e))?;

        if self.pending.last() == Some(&b'\n') {
            let line = std::mem::take(&mut self.pending);
            self.offset += line.len() as u64;
            return Ok(Some(decode_line(&line)));
        }

        if read == 0 {
            self.detect_truncation().await?;
        }
        Ok(None)
    }

    /// Re-seeks to the end if the file has shrunk below what was already read
    async fn detect_truncation(&mut self) -> Result<(), FileAccessError> {
        let len = self
            .reader
            .get_ref()
            .metadata()
            .await
            .map_err(|e| FileAccessError::new(&self.path, e))?
            .len();

        let consumed = self.offset + self.pending.len() as u64;
        if len >= consumed {
            return Ok(());
        }

        tracing::warn!(
            path = %self.path.display(),
            previous_offset = consumed,
            new_len = len,
            "Log file was truncated, resuming from its new end"
        );
        self.pending.clear();
        self.offset = self
            .reader
            .seek(SeekFrom::End(0))
            .await
            .map_err(|e| FileAccessError::new(&self.path, e))?;
        Ok(())
    }
}

fn decode_line(raw: &[u8]) -> String {
    let mut end = raw.len();
    while end > 0 && matches!(raw[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn append(file: &NamedTempFile, text: &str) {
        let mut handle = std::fs::OpenOptions::new()
            .append(true)
            .open(file.path())
            .unwrap();
        handle.write_all(text.as_bytes()).unwrap();
        handle.flush().unwrap();
    }

    #[tokio::test]
    async fn test_existing_content_is_skipped() {
        let file = NamedTempFile::new().unwrap();
        append(&file, "[Fri Oct 16 09:00:00 2026] old line one\nold line two\n");

        let mut tailer = LogTailer::open(file.path()).await.unwrap();
        assert!(tailer.offset() > 0);
        assert_eq!(tailer.next_line().await.unwrap(), None);
        assert_eq!(tailer.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_appended_lines_returned_in_order_once() {
        let file = NamedTempFile::new().unwrap();
        append(&file, "before open\n");
        let mut tailer = LogTailer::open(file.path()).await.unwrap();
        let start = tailer.offset();

        append(&file, "first\nsecond\n");
        assert_eq!(tailer.next_line().await.unwrap().as_deref(), Some("first"));
        append(&file, "third\r\n");
        assert_eq!(tailer.next_line().await.unwrap().as_deref(), Some("second"));
        assert_eq!(tailer.next_line().await.unwrap().as_deref(), Some("third"));
        assert_eq!(tailer.next_line().await.unwrap(), None);
        assert_eq!(tailer.offset(), start + "first\nsecond\nthird\r\n".len() as u64);
    }

    #[tokio::test]
    async fn test_partial_line_held_until_complete() {
        let file = NamedTempFile::new().unwrap();
        let mut tailer = LogTailer::open(file.path()).await.unwrap();

        append(&file, "You say, '!pc Cloak");
        assert_eq!(tailer.next_line().await.unwrap(), None);
        assert_eq!(tailer.offset(), 0);

        append(&file, " of Flames'\n");
        assert_eq!(
            tailer.next_line().await.unwrap().as_deref(),
            Some("You say, '!pc Cloak of Flames'")
        );
    }

    #[tokio::test]
    async fn test_truncation_reseeks_to_end() {
        let file = NamedTempFile::new().unwrap();
        append(&file, "a long line that will be discarded\n");
        let mut tailer = LogTailer::open(file.path()).await.unwrap();

        file.as_file().set_len(0).unwrap();
        assert_eq!(tailer.next_line().await.unwrap(), None);
        assert_eq!(tailer.offset(), 0);

        append(&file, "fresh\n");
        assert_eq!(tailer.next_line().await.unwrap().as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_replaced() {
        let file = NamedTempFile::new().unwrap();
        let mut tailer = LogTailer::open(file.path()).await.unwrap();

        let mut handle = std::fs::OpenOptions::new()
            .append(true)
            .open(file.path())
            .unwrap();
        handle.write_all(b"Ca\xefn\n").unwrap();

        let line = tailer.next_line().await.unwrap().unwrap();
        assert!(line.starts_with("Ca"));
        assert!(line.ends_with('n'));
    }

    #[tokio::test]
    async fn test_missing_file_is_access_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eqlog_Nobody_teek.txt");
        let err = LogTailer::open(&path).await.err().unwrap();
        assert_eq!(err.path, path);
    }
}
