//! Content-compared file output.
//!
//! Nothing is written when the destination already holds the same bytes, so
//! an unchanged rebuild leaves every timestamp alone.

use std::fs;
use std::path::Path;

use crate::error::{CraftError, Result};

/// Counts of files touched and left alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub written: usize,
    pub unchanged: usize,
}

/// Writes files only when their content differs.
#[derive(Debug, Default)]
pub struct OutputWriter {
    stats: WriteStats,
}

impl OutputWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `bytes` to `dest` unless it already holds exactly them.
    ///
    /// Returns whether a write happened.
    pub fn write_if_changed(&mut self, dest: &Path, bytes: &[u8]) -> Result<bool> {
        if fs::read(dest).is_ok_and(|existing| existing == bytes) {
            tracing::debug!(path = %dest.display(), "unchanged");
            self.stats.unchanged += 1;
            return Ok(false);
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| CraftError::io(parent, "Failed to create directory", e))?;
        }
        fs::write(dest, bytes).map_err(|e| CraftError::io(dest, "Failed to write file", e))?;
        tracing::info!(path = %dest.display(), bytes = bytes.len(), "wrote");
        self.stats.written += 1;
        Ok(true)
    }

    /// Copy `src` to `dest` unless `dest` is already byte-identical.
    pub fn copy_if_changed(&mut self, src: &Path, dest: &Path) -> Result<bool> {
        let bytes = fs::read(src).map_err(|e| CraftError::io(src, "Failed to read asset", e))?;
        self.write_if_changed(dest, &bytes)
    }

    pub fn stats(&self) -> WriteStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("a/b/c.bin");
        let mut writer = OutputWriter::new();

        assert!(writer.write_if_changed(&dest, b"abc").unwrap());
        assert_eq!(fs::read(&dest).unwrap(), b"abc");
        assert_eq!(writer.stats(), WriteStats { written: 1, unchanged: 0 });
    }

    #[test]
    fn test_identical_content_skipped() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.bin");
        let dest = dir.path().join("dest.bin");
        fs::write(&src, [1, 2, 3]).unwrap();
        fs::write(&dest, [1, 2, 3]).unwrap();

        let mut writer = OutputWriter::new();
        assert!(!writer.copy_if_changed(&src, &dest).unwrap());

        fs::write(&src, [1, 2, 4]).unwrap();
        assert!(writer.copy_if_changed(&src, &dest).unwrap());
        assert_eq!(fs::read(&dest).unwrap(), vec![1, 2, 4]);
        assert_eq!(writer.stats(), WriteStats { written: 1, unchanged: 1 });
    }

    #[test]
    fn test_missing_source_is_io_error() {
        let dir = TempDir::new().unwrap();
        let mut writer = OutputWriter::new();
        let err = writer
            .copy_if_changed(&dir.path().join("nope"), &dir.path().join("out"))
            .unwrap_err();
        assert!(matches!(err, CraftError::Io { .. }));
    }
}
