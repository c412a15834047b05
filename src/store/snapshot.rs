//! Whole-lexicon snapshot cache for the in-memory backend.
//!
//! Parsing a full corpus is slow, so a fully loaded [`Lexicon`] is written to
//! one bincode file, prefixed by the list of sources it was built from. The
//! snapshot is valid while that list matches the current one and no source is
//! newer than it. Callers on the durable backend do not use it.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tempfile::NamedTempFile;

use crate::error::StoreError;
use crate::model::Lexicon;

use super::StoreResult;

/// Snapshot file plus the source files it was built from.
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    path: PathBuf,
    sources: Vec<PathBuf>,
}

fn modified(path: &Path) -> StoreResult<SystemTime> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| StoreError::Io { source: e })
}

impl SnapshotCache {
    pub fn new(path: impl Into<PathBuf>, mut sources: Vec<PathBuf>) -> Self {
        sources.sort();
        sources.dedup();
        Self {
            path: path.into(),
            sources,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    fn open_reader(&self) -> StoreResult<BufReader<File>> {
        let file = File::open(&self.path).map_err(|e| StoreError::Io { source: e })?;
        Ok(BufReader::new(file))
    }

    /// The source list stored ahead of the lexicon.
    pub fn recorded_sources(&self) -> StoreResult<Vec<PathBuf>> {
        bincode::deserialize_from(self.open_reader()?).map_err(|e| StoreError::Serialization {
            message: format!("snapshot {} unreadable: {e}", self.path.display()),
        })
    }

    /// True when the snapshot is missing, was built from a different set of
    /// sources, or any source is newer than it.
    pub fn is_stale(&self) -> StoreResult<bool> {
        if !self.path.exists() {
            return Ok(true);
        }
        match self.recorded_sources() {
            Ok(recorded) if recorded == self.sources => {}
            Ok(recorded) => {
                tracing::debug!(
                    recorded = recorded.len(),
                    current = self.sources.len(),
                    "snapshot built from a different source set"
                );
                return Ok(true);
            }
            Err(e) => {
                tracing::warn!(error = %e, "snapshot header unreadable");
                return Ok(true);
            }
        }
        let watermark = modified(&self.path)?;
        for source in &self.sources {
            if modified(source)? > watermark {
                tracing::debug!(source = %source.display(), "snapshot older than source");
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Delete the snapshot so the next load re-parses the sources.
    pub fn invalidate(&self) -> StoreResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "snapshot invalidated");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io { source: e }),
        }
    }

    pub fn load(&self) -> StoreResult<Lexicon> {
        let unreadable = |e: bincode::Error| StoreError::Serialization {
            message: format!("snapshot {} unreadable: {e}", self.path.display()),
        };
        let mut reader = self.open_reader()?;
        let _sources: Vec<PathBuf> = bincode::deserialize_from(&mut reader).map_err(unreadable)?;
        bincode::deserialize_from(&mut reader).map_err(unreadable)
    }

    /// Write the snapshot through a temporary file that replaces the old one
    /// only once complete.
    pub fn store(&self, lexicon: &Lexicon) -> StoreResult<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::Io { source: e })?;
        let tmp = NamedTempFile::new_in(&dir).map_err(|e| StoreError::Io { source: e })?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            let encode_failed = |e: bincode::Error| StoreError::Serialization {
                message: format!("snapshot encode failed: {e}"),
            };
            bincode::serialize_into(&mut writer, &self.sources).map_err(encode_failed)?;
            bincode::serialize_into(&mut writer, lexicon).map_err(encode_failed)?;
            writer.flush().map_err(|e| StoreError::Io { source: e })?;
        }
        tmp.persist(&self.path)
            .map_err(|e| StoreError::Io { source: e.error })?;
        tracing::info!(
            path = %self.path.display(),
            entries = lexicon.entries.len(),
            synsets = lexicon.synsets.len(),
            "snapshot written"
        );
        Ok(())
    }

    /// Return the cached lexicon, or rebuild it with `loader` and cache the
    /// result when the snapshot is stale.
    pub fn reload_if_stale<E, F>(&self, loader: F) -> Result<Lexicon, E>
    where
        F: FnOnce() -> Result<Lexicon, E>,
        E: From<StoreError>,
    {
        if !self.is_stale()? {
            match self.load() {
                Ok(lexicon) => {
                    tracing::info!(path = %self.path.display(), "loaded lexicon from snapshot");
                    return Ok(lexicon);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "snapshot unreadable, rebuilding from sources");
                }
            }
        }
        let lexicon = loader()?;
        self.store(&lexicon)?;
        Ok(lexicon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LexiconHeader;
    use std::time::Duration;
    use tempfile::TempDir;

    fn touch_later(path: &Path, than: &Path) {
        let base = std::fs::metadata(than).unwrap().modified().unwrap();
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(base + Duration::from_secs(10)).unwrap();
    }

    #[test]
    fn rebuilds_only_when_sources_change() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("wn.xml");
        std::fs::write(&source, "<LexicalResource/>").unwrap();
        let cache = SnapshotCache::new(dir.path().join("wn.bin"), vec![source.clone()]);
        assert!(cache.is_stale().unwrap());

        let mut calls = 0;
        let first: Result<Lexicon, StoreError> = cache.reload_if_stale(|| {
            calls += 1;
            Ok(Lexicon::new(LexiconHeader::new("oewn")))
        });
        assert_eq!(first.unwrap().header.id, "oewn");
        assert!(!cache.is_stale().unwrap());

        let second: Result<Lexicon, StoreError> = cache.reload_if_stale(|| {
            calls += 1;
            Ok(Lexicon::new(LexiconHeader::new("other")))
        });
        assert_eq!(second.unwrap().header.id, "oewn");
        assert_eq!(calls, 1);

        touch_later(&source, cache.path());
        assert!(cache.is_stale().unwrap());
    }

    #[test]
    fn removed_or_added_source_makes_snapshot_stale() {
        let dir = TempDir::new().unwrap();
        let noun = dir.path().join("noun.animal.yaml");
        let verb = dir.path().join("verb.motion.yaml");
        std::fs::write(&noun, "{}").unwrap();
        std::fs::write(&verb, "{}").unwrap();
        let snapshot = dir.path().join("wn.bin");

        let both = SnapshotCache::new(&snapshot, vec![verb.clone(), noun.clone()]);
        both.store(&Lexicon::new(LexiconHeader::new("oewn"))).unwrap();
        assert!(!both.is_stale().unwrap());
        assert_eq!(both.recorded_sources().unwrap(), vec![noun.clone(), verb.clone()]);
        assert_eq!(both.load().unwrap().header.id, "oewn");

        std::fs::remove_file(&verb).unwrap();
        let after_delete = SnapshotCache::new(&snapshot, vec![noun.clone()]);
        assert!(after_delete.is_stale().unwrap());

        let mut calls = 0;
        let rebuilt: Result<Lexicon, StoreError> = after_delete.reload_if_stale(|| {
            calls += 1;
            Ok(Lexicon::new(LexiconHeader::new("rebuilt")))
        });
        assert_eq!(rebuilt.unwrap().header.id, "rebuilt");
        assert_eq!(calls, 1);
        assert!(!after_delete.is_stale().unwrap());

        let with_new = SnapshotCache::new(&snapshot, vec![noun, dir.path().join("adj.all.yaml")]);
        assert!(with_new.is_stale().unwrap());
    }

    #[test]
    fn invalidate_forces_reload() {
        let dir = TempDir::new().unwrap();
        let cache = SnapshotCache::new(dir.path().join("wn.bin"), Vec::new());
        cache.store(&Lexicon::new(LexiconHeader::new("oewn"))).unwrap();
        assert!(!cache.is_stale().unwrap());
        cache.invalidate().unwrap();
        assert!(cache.is_stale().unwrap());
        cache.invalidate().unwrap();
    }
}
