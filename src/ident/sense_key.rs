//! Sense keys: construction, parsing and the storage-safe mapping.

use std::fmt;
use std::str::FromStr;

use crate::error::KeyError;
use crate::model::{LexicalEntry, PartOfSpeech, Sense, SynsetRelType};
use crate::store::LexiconStore;

use super::{KeyResult, sense_index};

/// Lexicographer file names and their fixed numbers.
pub const LEXFILES: &[(&str, u8)] = &[
    ("adj.all", 0),
    ("adj.pert", 1),
    ("adv.all", 2),
    ("noun.Tops", 3),
    ("noun.act", 4),
    ("noun.animal", 5),
    ("noun.artifact", 6),
    ("noun.attribute", 7),
    ("noun.body", 8),
    ("noun.cognition", 9),
    ("noun.communication", 10),
    ("noun.event", 11),
    ("noun.feeling", 12),
    ("noun.food", 13),
    ("noun.group", 14),
    ("noun.location", 15),
    ("noun.motive", 16),
    ("noun.object", 17),
    ("noun.person", 18),
    ("noun.phenomenon", 19),
    ("noun.plant", 20),
    ("noun.possession", 21),
    ("noun.process", 22),
    ("noun.quantity", 23),
    ("noun.relation", 24),
    ("noun.shape", 25),
    ("noun.state", 26),
    ("noun.substance", 27),
    ("noun.time", 28),
    ("verb.body", 29),
    ("verb.change", 30),
    ("verb.cognition", 31),
    ("verb.communication", 32),
    ("verb.competition", 33),
    ("verb.consumption", 34),
    ("verb.contact", 35),
    ("verb.creation", 36),
    ("verb.emotion", 37),
    ("verb.motion", 38),
    ("verb.perception", 39),
    ("verb.possession", 40),
    ("verb.social", 41),
    ("verb.stative", 42),
    ("verb.weather", 43),
    ("adj.ppl", 44),
    ("contrib.colloq", 50),
    ("contrib.plwn", 51),
];

pub fn lexfile_number(name: &str) -> KeyResult<u8> {
    LEXFILES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, num)| *num)
        .ok_or_else(|| KeyError::UnknownLexfile {
            lexfile: name.to_string(),
        })
}

pub fn lexfile_name(number: u8) -> Option<&'static str> {
    LEXFILES.iter().find(|(_, n)| *n == number).map(|(name, _)| *name)
}

/// The digit a part of speech contributes to a sense key.
pub fn sense_type(pos: PartOfSpeech) -> KeyResult<u8> {
    match pos {
        PartOfSpeech::Noun => Ok(1),
        PartOfSpeech::Verb => Ok(2),
        PartOfSpeech::Adjective => Ok(3),
        PartOfSpeech::Adverb => Ok(4),
        PartOfSpeech::AdjectiveSatellite => Ok(5),
        other => Err(KeyError::NoSenseType {
            pos: other.as_char(),
        }),
    }
}

/// Lemma part of a key: lower-cased, spaces to underscores.
pub fn key_lemma(written_form: &str) -> String {
    written_form.to_lowercase().replace(' ', "_")
}

// ---------------------------------------------------------------------------
// SenseKey
// ---------------------------------------------------------------------------

/// A parsed `lemma%t:ff:ll:head:hh` key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SenseKey {
    pub lemma: String,
    pub ss_type: u8,
    pub lexfile: u8,
    pub lex_id: u8,
    pub head_word: String,
    pub head_id: Option<u8>,
}

impl fmt::Display for SenseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}%{}:{:02}:{:02}:{}:",
            self.lemma, self.ss_type, self.lexfile, self.lex_id, self.head_word
        )?;
        if let Some(id) = self.head_id {
            write!(f, "{id:02}")?;
        }
        Ok(())
    }
}

impl FromStr for SenseKey {
    type Err = KeyError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| KeyError::InvalidSenseKey {
            key: key.to_string(),
            reason: reason.to_string(),
        };
        let (lemma, info) = key.rsplit_once('%').ok_or_else(|| invalid("missing `%`"))?;
        if lemma.is_empty() {
            return Err(invalid("empty lemma"));
        }
        let (rest, head_id) = info
            .rsplit_once(':')
            .ok_or_else(|| invalid("expected five `:`-separated fields"))?;
        let fields: Vec<&str> = rest.splitn(4, ':').collect();
        let [ss_type, lexfile, lex_id, head_word] = fields[..] else {
            return Err(invalid("expected five `:`-separated fields"));
        };
        let number = |field: &str, what: &str| -> KeyResult<u8> {
            if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid(&format!("{what} is not a number")));
            }
            field.parse().map_err(|_| invalid(&format!("{what} out of range")))
        };
        let ss_type = number(ss_type, "sense type")?;
        if !(1..=5).contains(&ss_type) {
            return Err(invalid("sense type must be 1-5"));
        }
        Ok(SenseKey {
            lemma: lemma.to_string(),
            ss_type,
            lexfile: number(lexfile, "lexfile")?,
            lex_id: number(lex_id, "lex id")?,
            head_word: head_word.to_string(),
            head_id: if head_id.is_empty() {
                None
            } else {
                Some(number(head_id, "head id")?)
            },
        })
    }
}

// ---------------------------------------------------------------------------
// Key computation
// ---------------------------------------------------------------------------

/// Lex id for a sense that has no declared key yet: the highest lex id among
/// keyed siblings plus the sense's position among unkeyed ones (1-based).
pub fn gen_lex_id(entry: &LexicalEntry, sense: &Sense) -> KeyResult<u8> {
    let mut max = 0u32;
    let mut unseen = 1u32;
    let mut seen = false;
    for sibling in &entry.senses {
        if sibling.id == sense.id {
            seen = true;
            continue;
        }
        match &sibling.key {
            Some(key) => {
                let parsed: SenseKey = key.parse()?;
                max = max.max(u32::from(parsed.lex_id));
            }
            None if !seen => unseen += 1,
            None => {}
        }
    }
    let lex_id = max + unseen;
    u8::try_from(lex_id)
        .ok()
        .filter(|id| *id <= 99)
        .ok_or_else(|| KeyError::LexIdOverflow {
            lemma: entry.lemma.written_form.clone(),
            lex_id,
        })
}

/// Compute the canonical key of `sense`, owned by `entry`.
///
/// The entry is passed explicitly so keys can be computed for entries that
/// are being built and are not in the store yet.
pub fn compute_sense_key<S: LexiconStore + ?Sized>(
    store: &S,
    entry: &LexicalEntry,
    sense: &Sense,
) -> KeyResult<SenseKey> {
    let synset = store
        .synset_by_id(&sense.synset)?
        .ok_or_else(|| KeyError::UnknownSynset {
            id: sense.synset.clone(),
        })?;
    let ss_type = sense_type(synset.part_of_speech)?;
    let lexfile = lexfile_number(&synset.lexfile)?;
    let lex_id = match &sense.key {
        Some(key) => key.parse::<SenseKey>()?.lex_id,
        None => gen_lex_id(entry, sense)?,
    };
    let (head_word, head_id) = if synset.part_of_speech == PartOfSpeech::AdjectiveSatellite {
        let head = satellite_head(store, &synset.id, synset.targets(SynsetRelType::Similar))?;
        (head.lemma, Some(head.lex_id))
    } else {
        (String::new(), None)
    };
    Ok(SenseKey {
        lemma: key_lemma(&entry.lemma.written_form),
        ss_type,
        lexfile,
        lex_id,
        head_word,
        head_id,
    })
}

/// Resolve the key of the head sense of a satellite synset.
fn satellite_head<'a, S: LexiconStore + ?Sized>(
    store: &S,
    satellite: &str,
    similar: impl Iterator<Item = &'a str>,
) -> KeyResult<SenseKey> {
    let targets: Vec<&str> = similar.collect();
    let [target] = targets[..] else {
        return Err(KeyError::SatelliteHead {
            synset: satellite.to_string(),
            found: targets.len(),
        });
    };
    let head = store
        .synset_by_id(target)?
        .ok_or_else(|| KeyError::UnknownSynset {
            id: target.to_string(),
        })?;
    let unkeyed = || KeyError::HeadUnkeyed {
        synset: head.id.clone(),
    };

    // The head sense is the member whose sense id carries the lowest index.
    let mut best: Option<(u32, String)> = None;
    for member in &head.members {
        let Some(entry) = store.entry_by_id(member)? else {
            continue;
        };
        let Some(sense) = entry.sense_for_synset(&head.id) else {
            continue;
        };
        let index = sense_index(&sense.id).unwrap_or(u32::MAX);
        if best.as_ref().is_none_or(|(i, _)| index < *i) {
            best = Some((index, sense.key.clone().ok_or_else(unkeyed)?));
        }
    }
    let (_, key) = best.ok_or_else(unkeyed)?;
    key.parse()
}

// ---------------------------------------------------------------------------
// Storage-safe mapping
// ---------------------------------------------------------------------------

const KEY_SIGILS: &[(char, &str)] = &[
    ('\'', "apos"),
    ('!', "excl"),
    ('#', "num"),
    ('$', "dollar"),
    ('%', "percnt"),
    ('&', "amp"),
    ('(', "lpar"),
    (')', "rpar"),
    ('*', "ast"),
    ('+', "plus"),
    (',', "comma"),
    ('/', "sol"),
    ('{', "lbrace"),
    ('|', "vert"),
    ('}', "rbrace"),
    ('~', "tilde"),
    ('¢', "cent"),
    ('£', "pound"),
    ('§', "sect"),
    ('©', "copy"),
    ('®', "reg"),
    ('°', "deg"),
    ('´', "acute"),
    ('¶', "para"),
    ('º', "ordm"),
    (':', "colon"),
    (' ', "space"),
];

#[derive(Clone, Copy, PartialEq, Eq)]
enum KeyPart {
    /// Before the `%`: `_` and `.` are literal.
    Lemma,
    /// After the `%`: `:` becomes `.`, so `_` and `.` must be escaped.
    Info,
}

fn push_sigil(out: &mut String, name: &str) {
    out.push('-');
    out.push_str(name);
    out.push('-');
}

fn escape_key_part(text: &str, part: KeyPart) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match (c, part) {
            ('-', _) => out.push_str("--"),
            ('_' | '.', KeyPart::Lemma) => out.push(c),
            (':', KeyPart::Info) => out.push('.'),
            ('_', KeyPart::Info) => push_sigil(&mut out, "sp"),
            ('.', KeyPart::Info) => push_sigil(&mut out, "dot"),
            _ if c.is_alphanumeric() => out.push(c),
            _ => match KEY_SIGILS.iter().find(|(ch, _)| *ch == c) {
                Some((_, name)) => push_sigil(&mut out, name),
                None => push_sigil(&mut out, &format!("u{:x}", c as u32)),
            },
        }
    }
    out
}

fn key_sigil_char(name: &str, part: KeyPart) -> Option<char> {
    match (name, part) {
        ("sp", KeyPart::Info) => return Some('_'),
        ("dot", KeyPart::Info) => return Some('.'),
        _ => {}
    }
    if let Some((c, _)) = KEY_SIGILS.iter().find(|(_, n)| *n == name) {
        return Some(*c);
    }
    let hex = name.strip_prefix('u')?;
    if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
}

fn unescape_key_part(mapped: &str, text: &str, part: KeyPart) -> KeyResult<String> {
    let invalid = |reason: String| KeyError::InvalidEscape {
        token: mapped.to_string(),
        reason,
    };
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(c) = rest.chars().next() {
        if c == '-' {
            let body = &rest[1..];
            if let Some(tail) = body.strip_prefix('-') {
                out.push('-');
                rest = tail;
                continue;
            }
            let end = body
                .find('-')
                .ok_or_else(|| invalid("unterminated sigil".into()))?;
            let name = &body[..end];
            out.push(
                key_sigil_char(name, part)
                    .ok_or_else(|| invalid(format!("unknown sigil `{name}`")))?,
            );
            rest = &body[end + 1..];
            continue;
        }
        match (c, part) {
            ('.', KeyPart::Info) => out.push(':'),
            ('_', KeyPart::Info) => return Err(invalid("bare `_` in key info".into())),
            _ => out.push(c),
        }
        rest = &rest[c.len_utf8()..];
    }
    Ok(out)
}

/// Map a `%`-style sense key to an identifier safe for XML ids and database
/// keys: `<ns>-<lemma part>__<info part>`.
pub fn map_sense_key(ns: &str, key: &str) -> String {
    match key.rfind('%') {
        Some(p) => format!(
            "{ns}-{}__{}",
            escape_key_part(&key[..p], KeyPart::Lemma),
            escape_key_part(&key[p + 1..], KeyPart::Info)
        ),
        None => format!("{ns}-{}", escape_key_part(key, KeyPart::Info)),
    }
}

/// Invert [`map_sense_key`].
pub fn unmap_sense_key(ns: &str, mapped: &str) -> KeyResult<String> {
    let body = mapped
        .strip_prefix(ns)
        .and_then(|r| r.strip_prefix('-'))
        .ok_or_else(|| KeyError::InvalidEscape {
            token: mapped.to_string(),
            reason: format!("missing `{ns}-` prefix"),
        })?;
    match body.rfind("__") {
        Some(p) => Ok(format!(
            "{}%{}",
            unescape_key_part(mapped, &body[..p], KeyPart::Lemma)?,
            unescape_key_part(mapped, &body[p + 2..], KeyPart::Info)?
        )),
        None => unescape_key_part(mapped, body, KeyPart::Info),
    }
}
