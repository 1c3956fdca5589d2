//! In-memory adapters for tests and dry runs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::ports::clock::Clock;
use crate::ports::filesystem::FileSystem;

/// Filesystem held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: Mutex<BTreeMap<PathBuf, String>>,
}

impl MemoryFileSystem {
    /// Creates an empty filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a filesystem holding a single file.
    #[must_use]
    pub fn with_file(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        let fs = Self::new();
        if let Ok(mut files) = fs.files.lock() {
            files.insert(path.into(), contents.into());
        }
        fs
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_to_string(
        &self,
        path: &Path,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let files = self.files.lock().map_err(|e| e.to_string())?;
        files.get(path).cloned().ok_or_else(|| format!("not found: {}", path.display()).into())
    }

    fn write(
        &self,
        path: &Path,
        contents: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut files = self.files.lock().map_err(|e| e.to_string())?;
        files.insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files
            .lock()
            .is_ok_and(|files| files.keys().any(|p| p == path || p.starts_with(path)))
    }
}

/// Clock frozen at a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_and_reads_files() {
        let fs = MemoryFileSystem::new();
        fs.write(Path::new("/out/a/test_a.py"), "x").unwrap();

        assert!(fs.exists(Path::new("/out/a/test_a.py")));
        assert!(fs.exists(Path::new("/out/a")));
        assert!(!fs.exists(Path::new("/out/b")));
        assert_eq!(fs.read_to_string(Path::new("/out/a/test_a.py")).unwrap(), "x");
        assert!(fs.read_to_string(Path::new("/missing")).is_err());
    }

    #[test]
    fn fixed_clock_never_moves() {
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let clock = FixedClock(at);
        assert_eq!(clock.now(), at);
        assert_eq!(clock.now(), at);
    }
}
