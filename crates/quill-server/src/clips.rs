//! Append-only store for received audio clips.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tokio::io::AsyncWriteExt;
use tracing::debug;

const EXTENSION: &str = "webm";
/// Attempts at a unique name when two clips land in the same microsecond.
const MAX_NAME_ATTEMPTS: u32 = 16;

/// Writes every received blob to a directory, one file per clip, named by
/// local receive time. Files are never read back or removed.
#[derive(Clone, Debug)]
pub struct ClipStore {
    dir: PathBuf,
}

impl ClipStore {
    /// Open the store, creating `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Directory clips are written to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist one clip and return its path.
    pub async fn save(&self, bytes: &[u8]) -> std::io::Result<PathBuf> {
        let stem = clip_stem(Local::now());
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = if attempt == 0 {
                format!("{stem}.{EXTENSION}")
            } else {
                format!("{stem}_{attempt}.{EXTENSION}")
            };
            let path = self.dir.join(name);
            let mut file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            };
            file.write_all(bytes).await?;
            file.flush().await?;
            debug!(path = %path.display(), bytes = bytes.len(), "saved clip");
            return Ok(path);
        }
        Err(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free clip name for {stem}"),
        ))
    }
}

/// `YYYYMMDD_HHMMSS_micro` for a receive time.
pub fn clip_stem(at: DateTime<Local>) -> String {
    at.format("%Y%m%d_%H%M%S_%6f").to_string()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn stem_format() {
        let at = Local
            .with_ymd_and_hms(2024, 3, 9, 7, 5, 2)
            .unwrap()
            + chrono::Duration::microseconds(42);
        assert_eq!(clip_stem(at), "20240309_070502_000042");
    }

    #[test]
    fn new_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("clips");
        let store = ClipStore::new(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(store.dir(), dir);
    }

    #[tokio::test]
    async fn save_writes_bytes() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ClipStore::new(tmp.path()).unwrap();
        let path = store.save(b"webm bytes").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"webm bytes");
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with(".webm"));
        // YYYYMMDD_HHMMSS_micro.webm
        assert_eq!(name.len(), "20240309_070502_000042.webm".len());
    }

    #[tokio::test]
    async fn saves_never_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ClipStore::new(tmp.path()).unwrap();
        let mut paths = Vec::new();
        for i in 0..5u8 {
            paths.push(store.save(&[i]).await.unwrap());
        }
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), 5);
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 5);
    }

    #[tokio::test]
    async fn save_fails_when_directory_removed() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("gone");
        let store = ClipStore::new(&dir).unwrap();
        std::fs::remove_dir(&dir).unwrap();
        assert!(store.save(b"x").await.is_err());
    }
}
