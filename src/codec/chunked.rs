//! Streaming reader for large YAML mappings.
//!
//! Lines are buffered until the buffer reaches a byte threshold; the buffer
//! is then cut before the next line that starts a new top-level key (no
//! indentation, not a sequence item, not a comment). Each chunk is a valid
//! mapping on its own and is parsed independently.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::CodecError;

use super::{CodecResult, io_err};

/// Default chunk threshold in bytes.
pub const DEFAULT_CHUNK_THRESHOLD: usize = 1 << 20;

/// Yields top-level-aligned chunks of a YAML mapping.
pub struct ChunkedYamlReader<R> {
    reader: R,
    threshold: usize,
    buffer: String,
    path: String,
    done: bool,
}

impl ChunkedYamlReader<BufReader<File>> {
    pub fn open(path: &Path, threshold: usize) -> CodecResult<Self> {
        let file = File::open(path).map_err(io_err(path))?;
        Ok(Self::new(BufReader::new(file), threshold, path.display().to_string()))
    }
}

impl<R: BufRead> ChunkedYamlReader<R> {
    pub fn new(reader: R, threshold: usize, path: impl Into<String>) -> Self {
        Self {
            reader,
            threshold: threshold.max(1),
            buffer: String::new(),
            path: path.into(),
            done: false,
        }
    }

    /// Parse every chunk as a mapping and concatenate the pairs in file order.
    pub fn read_pairs<T: DeserializeOwned>(self) -> CodecResult<Vec<(String, T)>> {
        let path = self.path.clone();
        let mut pairs = Vec::new();
        let mut chunks = 0usize;
        for chunk in self {
            let chunk = chunk?;
            chunks += 1;
            let map: Option<serde_yaml::Mapping> =
                serde_yaml::from_str(&chunk).map_err(|e| CodecError::Yaml {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
            for (key, value) in map.unwrap_or_default() {
                let key = match key {
                    serde_yaml::Value::String(s) => s,
                    other => serde_yaml::to_string(&other)
                        .map(|s| s.trim_end().to_string())
                        .map_err(|e| CodecError::Yaml {
                            path: path.clone(),
                            message: e.to_string(),
                        })?,
                };
                let value: T = serde_yaml::from_value(value).map_err(|e| CodecError::Yaml {
                    path: path.clone(),
                    message: format!("{key}: {e}"),
                })?;
                pairs.push((key, value));
            }
        }
        tracing::debug!(path = %path, chunks, pairs = pairs.len(), "read yaml shard");
        Ok(pairs)
    }
}

fn starts_top_level_key(line: &str) -> bool {
    line.chars()
        .next()
        .is_some_and(|c| !c.is_whitespace() && c != '-' && c != '#')
}

impl<R: BufRead> Iterator for ChunkedYamlReader<R> {
    type Item = CodecResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut line = String::new();
        loop {
            line.clear();
            match self.reader.read_line(&mut line) {
                Ok(0) => {
                    self.done = true;
                    let rest = std::mem::take(&mut self.buffer);
                    return (!rest.trim().is_empty()).then_some(Ok(rest));
                }
                Ok(_) => {
                    if self.buffer.len() >= self.threshold && starts_top_level_key(&line) {
                        let chunk = std::mem::replace(&mut self.buffer, line);
                        return Some(Ok(chunk));
                    }
                    self.buffer.push_str(&line);
                }
                Err(source) => {
                    self.done = true;
                    return Some(Err(CodecError::Io {
                        path: self.path.clone(),
                        source,
                    }));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::io::Cursor;

    const DOC: &str = "\
# leading comment
alpha:
  definition:
  - first letter
  members:
  - a
beta:
  definition:
  - second letter
  members:
  - b
'gamma: quoted':
  members:
  - c
delta:
  members: []
";

    #[test]
    fn splits_only_at_top_level_keys() {
        let reader = ChunkedYamlReader::new(Cursor::new(DOC), 10, "test");
        let chunks: Vec<String> = reader.map(|c| c.unwrap()).collect();
        assert_eq!(chunks.len(), 4);
        assert!(chunks[0].starts_with("# leading comment\nalpha:"));
        assert!(chunks[1].starts_with("beta:"));
        assert_eq!(chunks.concat(), DOC);
    }

    #[test]
    fn chunked_parse_matches_whole_parse() {
        let whole: BTreeMap<String, serde_yaml::Value> = serde_yaml::from_str(DOC).unwrap();
        let pairs: Vec<(String, serde_yaml::Value)> =
            ChunkedYamlReader::new(Cursor::new(DOC), 16, "test")
                .read_pairs()
                .unwrap();
        let keys: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["alpha", "beta", "gamma: quoted", "delta"]);
        let chunked: BTreeMap<String, serde_yaml::Value> = pairs.into_iter().collect();
        assert_eq!(chunked, whole);
    }

    #[test]
    fn large_threshold_yields_one_chunk() {
        let reader = ChunkedYamlReader::new(Cursor::new(DOC), DEFAULT_CHUNK_THRESHOLD, "test");
        assert_eq!(reader.count(), 1);
    }

    #[test]
    fn malformed_chunk_reports_path() {
        let bad = "alpha: [unclosed\n";
        let err = ChunkedYamlReader::new(Cursor::new(bad), 10, "bad.yaml")
            .read_pairs::<serde_yaml::Value>()
            .unwrap_err();
        assert!(matches!(err, CodecError::Yaml { ref path, .. } if path == "bad.yaml"));
    }
}
