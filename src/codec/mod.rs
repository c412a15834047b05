//! On-disk formats.
//!
//! - [`xml`] — WN-LMF XML, as one file or split per lexicographer file
//! - [`yaml`] — the sharded YAML corpus
//! - [`chunked`] — streaming reader for YAML shards too large to parse whole
//!
//! Every writer renders into memory first and replaces the target through a
//! temporary file in the same directory, so a failed write never leaves a
//! truncated file behind.

pub mod chunked;
pub mod xml;
pub mod yaml;

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::CodecError;

/// Result type for codec operations.
pub type CodecResult<T> = std::result::Result<T, CodecError>;

pub(crate) fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> CodecError + '_ {
    move |source| CodecError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Replace `path` with `contents` once they are completely on disk.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> CodecResult<()> {
    let dir = parent_dir(path);
    std::fs::create_dir_all(&dir).map_err(io_err(&dir))?;
    let mut tmp = NamedTempFile::new_in(&dir).map_err(io_err(&dir))?;
    tmp.write_all(contents.as_bytes()).map_err(io_err(path))?;
    tmp.as_file().sync_all().map_err(io_err(path))?;
    tmp.persist(path).map_err(|e| CodecError::Io {
        path: path.display().to_string(),
        source: e.error,
    })?;
    tracing::debug!(path = %path.display(), bytes = contents.len(), "wrote file");
    Ok(())
}

pub(crate) fn read_to_string(path: &Path) -> CodecResult<String> {
    std::fs::read_to_string(path).map_err(io_err(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_replaces_whole_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("out.txt");
        write_atomic(&path, "first version, longer").unwrap();
        write_atomic(&path, "second").unwrap();
        assert_eq!(read_to_string(&path).unwrap(), "second");
        let leftovers = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = read_to_string(Path::new("/nonexistent/lexnet/file.xml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/lexnet/file.xml"));
    }
}
