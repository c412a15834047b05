//! Identifier and key codec.
//!
//! Every cross-reference in every format goes through this module:
//!
//! - [`lemma`]: reversible escaping of written forms into id tokens
//! - [`sense_key`]: `%`-style sense keys and their storage-safe mapping
//! - [`alloc`]: hash-derived ids for new synsets
//!
//! Node ids follow a fixed grammar:
//!
//! | node    | shape                                             |
//! |---------|---------------------------------------------------|
//! | entry   | `<ns>-<escaped lemma>-<pos>`                      |
//! | synset  | `<ns>-<8 digits>-<pos>`                           |
//! | sense   | `<ns>-<escaped lemma>-<pos>-<8 digits>-<2 digits>` |

pub mod alloc;
pub mod lemma;
pub mod sense_key;

use regex::Regex;

use crate::error::KeyError;
use crate::model::PartOfSpeech;

pub use alloc::new_synset_id;
pub use lemma::{escape_lemma, unescape_lemma};
pub use sense_key::{
    SenseKey, compute_sense_key, gen_lex_id, lexfile_number, map_sense_key, unmap_sense_key,
};

/// Result type for identifier and key operations.
pub type KeyResult<T> = std::result::Result<T, KeyError>;

const POS_CLASS: &str = "[nvarstcpxu]";

pub fn entry_id(ns: &str, written_form: &str, pos: PartOfSpeech) -> String {
    format!("{ns}-{}-{}", escape_lemma(written_form), pos.as_char())
}

pub fn synset_id(ns: &str, number: u32, pos: PartOfSpeech) -> String {
    format!("{ns}-{number:08}-{}", pos.as_char())
}

/// Sense id for `written_form` in `synset`, at 1-based member `index`.
pub fn sense_id(written_form: &str, synset: &str, index: usize) -> KeyResult<String> {
    let parsed = SynsetId::parse(synset)?;
    Ok(format!(
        "{}-{}-{}-{:08}-{index:02}",
        parsed.namespace,
        escape_lemma(written_form),
        parsed.pos.as_char(),
        parsed.number
    ))
}

/// Replace the trailing member index of a sense id.
pub fn with_sense_index(sense_id: &str, index: usize) -> String {
    match sense_id.rsplit_once('-') {
        Some((head, _)) => format!("{head}-{index:02}"),
        None => sense_id.to_string(),
    }
}

/// Trailing member index of a sense id, if it has one.
pub fn sense_index(sense_id: &str) -> Option<u32> {
    let (_, tail) = sense_id.rsplit_once('-')?;
    if tail.len() == 2 && tail.bytes().all(|b| b.is_ascii_digit()) {
        tail.parse().ok()
    } else {
        None
    }
}

/// Synset id without the namespace prefix, as used in the YAML corpus.
pub fn short_synset_id<'a>(ns: &str, id: &'a str) -> &'a str {
    id.strip_prefix(ns)
        .and_then(|rest| rest.strip_prefix('-'))
        .unwrap_or(id)
}

pub fn full_synset_id(ns: &str, short: &str) -> String {
    format!("{ns}-{short}")
}

/// The parts of a synset id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynsetId {
    pub namespace: String,
    pub number: u32,
    pub pos: PartOfSpeech,
}

impl SynsetId {
    pub fn parse(id: &str) -> KeyResult<Self> {
        let malformed = || KeyError::MalformedId {
            kind: "synset",
            id: id.to_string(),
        };
        let mut parts = id.rsplitn(3, '-');
        let (Some(pos), Some(number), Some(namespace)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };
        if number.len() != 8 || !number.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let pos = pos.parse::<PartOfSpeech>().map_err(|_| malformed())?;
        Ok(Self {
            namespace: namespace.to_string(),
            number: number.parse().map_err(|_| malformed())?,
            pos,
        })
    }
}

/// The parts of a sense id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenseIdParts {
    pub lemma_token: String,
    pub pos: PartOfSpeech,
    pub number: u32,
    pub index: u32,
}

/// Compiled id patterns for one namespace.
#[derive(Debug, Clone)]
pub struct IdGrammar {
    entry: Regex,
    synset: Regex,
    sense: Regex,
}

impl IdGrammar {
    pub fn new(ns: &str) -> KeyResult<Self> {
        if ns.is_empty() || !ns.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(KeyError::InvalidNamespace {
                namespace: ns.to_string(),
            });
        }
        let ns = regex::escape(ns);
        let compile = |pattern: String| {
            Regex::new(&pattern).map_err(|_| KeyError::InvalidNamespace {
                namespace: ns.clone(),
            })
        };
        Ok(Self {
            entry: compile(format!(r"^{ns}-(.+)-({POS_CLASS})$"))?,
            synset: compile(format!(r"^{ns}-([0-9]{{8}})-({POS_CLASS})$"))?,
            sense: compile(format!(r"^{ns}-(.+)-({POS_CLASS})-([0-9]{{8}})-([0-9]{{2}})$"))?,
        })
    }

    pub fn is_entry_id(&self, id: &str) -> bool {
        self.entry
            .captures(id)
            .is_some_and(|c| unescape_lemma(&c[1]).is_ok())
    }

    pub fn is_synset_id(&self, id: &str) -> bool {
        self.synset.is_match(id)
    }

    pub fn is_sense_id(&self, id: &str) -> bool {
        self.parse_sense_id(id).is_some()
    }

    pub fn parse_sense_id(&self, id: &str) -> Option<SenseIdParts> {
        let caps = self.sense.captures(id)?;
        unescape_lemma(&caps[1]).ok()?;
        Some(SenseIdParts {
            lemma_token: caps[1].to_string(),
            pos: caps[2].parse().ok()?,
            number: caps[3].parse().ok()?,
            index: caps[4].parse().ok()?,
        })
    }

    /// Part of speech suffix of an entry id.
    pub fn entry_pos(&self, id: &str) -> Option<PartOfSpeech> {
        self.entry.captures(id).and_then(|c| c[2].parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_ids() {
        assert_eq!(entry_id("oewn", "hot dog", PartOfSpeech::Noun), "oewn-hot_dog-n");
        assert_eq!(synset_id("oewn", 1740, PartOfSpeech::Noun), "oewn-00001740-n");
        assert_eq!(
            sense_id("dog", "oewn-02086723-n", 1).unwrap(),
            "oewn-dog-n-02086723-01"
        );
    }

    #[test]
    fn sense_index_helpers() {
        let id = "oewn-dog-n-02086723-01";
        assert_eq!(sense_index(id), Some(1));
        assert_eq!(with_sense_index(id, 3), "oewn-dog-n-02086723-03");
    }

    #[test]
    fn short_ids() {
        assert_eq!(short_synset_id("oewn", "oewn-00001740-n"), "00001740-n");
        assert_eq!(full_synset_id("oewn", "00001740-n"), "oewn-00001740-n");
    }

    #[test]
    fn parses_synset_id() {
        let parsed = SynsetId::parse("oewn-02086723-n").unwrap();
        assert_eq!(parsed.number, 2086723);
        assert_eq!(parsed.pos, PartOfSpeech::Noun);
        assert!(SynsetId::parse("oewn-2086723-n").is_err());
        assert!(SynsetId::parse("oewn-02086723-q").is_err());
    }

    #[test]
    fn grammar_checks_each_kind() {
        let g = IdGrammar::new("oewn").unwrap();
        assert!(g.is_entry_id("oewn-hot_dog-n"));
        assert!(g.is_synset_id("oewn-02086723-n"));
        assert!(g.is_sense_id("oewn-dog-n-02086723-01"));
        assert!(!g.is_synset_id("pwn-02086723-n"));
        assert!(!g.is_sense_id("oewn-dog-n-02086723-1"));
        assert!(!g.is_entry_id("oewn-dog%-n"));
        let parts = g.parse_sense_id("oewn-well--being-n-14447908-01").unwrap();
        assert_eq!(parts.lemma_token, "well--being");
        assert_eq!(parts.index, 1);
    }

    #[test]
    fn rejects_bad_namespace() {
        assert!(IdGrammar::new("").is_err());
        assert!(IdGrammar::new("o-ewn").is_err());
    }
}
