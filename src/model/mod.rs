//! The lexicon object graph: entries, senses, synsets and their relations.
//!
//! These are plain data types. Invariants that span nodes (relation symmetry,
//! dense ordinals, member order) are maintained by [`crate::edit`] and checked
//! by [`crate::validate`].

pub mod relation;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

pub use relation::{
    OTHER_SENSE_SUBTYPES, RelationType, SenseRelType, SenseRelation, SynsetRelType,
    SynsetRelation,
};

/// ILI value of a synset that has not been linked yet.
pub const ILI_UNASSIGNED: &str = "in";

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Part of speech, as the single character used in ids and WN-LMF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PartOfSpeech {
    Noun,
    Verb,
    Adjective,
    Adverb,
    AdjectiveSatellite,
    NamedEntity,
    Conjunction,
    Adposition,
    Other,
    Unknown,
}

impl PartOfSpeech {
    pub const ALL: &'static [PartOfSpeech] = &[
        PartOfSpeech::Noun,
        PartOfSpeech::Verb,
        PartOfSpeech::Adjective,
        PartOfSpeech::Adverb,
        PartOfSpeech::AdjectiveSatellite,
        PartOfSpeech::NamedEntity,
        PartOfSpeech::Conjunction,
        PartOfSpeech::Adposition,
        PartOfSpeech::Other,
        PartOfSpeech::Unknown,
    ];

    pub const fn as_char(self) -> char {
        match self {
            PartOfSpeech::Noun => 'n',
            PartOfSpeech::Verb => 'v',
            PartOfSpeech::Adjective => 'a',
            PartOfSpeech::Adverb => 'r',
            PartOfSpeech::AdjectiveSatellite => 's',
            PartOfSpeech::NamedEntity => 't',
            PartOfSpeech::Conjunction => 'c',
            PartOfSpeech::Adposition => 'p',
            PartOfSpeech::Other => 'x',
            PartOfSpeech::Unknown => 'u',
        }
    }

    pub fn from_char(c: char) -> Result<Self, ModelError> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_char() == c)
            .ok_or_else(|| ModelError::UnknownValue {
                what: "part of speech",
                value: c.to_string(),
            })
    }

    /// Equality up to the adjective/satellite distinction.
    pub fn equal_pos(self, other: PartOfSpeech) -> bool {
        self == other || (self.is_adjectival() && other.is_adjectival())
    }

    pub fn is_adjectival(self) -> bool {
        matches!(self, PartOfSpeech::Adjective | PartOfSpeech::AdjectiveSatellite)
    }
}

impl fmt::Display for PartOfSpeech {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for PartOfSpeech {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_char(c),
            _ => Err(ModelError::UnknownValue {
                what: "part of speech",
                value: s.to_string(),
            }),
        }
    }
}

/// Syntactic position marker for adjective senses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdjPosition {
    Attributive,
    Predicative,
    Postpositive,
}

impl AdjPosition {
    pub const fn as_str(self) -> &'static str {
        match self {
            AdjPosition::Attributive => "a",
            AdjPosition::Predicative => "p",
            AdjPosition::Postpositive => "ip",
        }
    }
}

impl FromStr for AdjPosition {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "a" => Ok(AdjPosition::Attributive),
            "p" => Ok(AdjPosition::Predicative),
            "ip" => Ok(AdjPosition::Postpositive),
            _ => Err(ModelError::UnknownValue {
                what: "adjective position",
                value: s.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// Lexicon-level metadata written on the `<Lexicon>` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexiconHeader {
    /// Namespace id, also the prefix of every node id.
    pub id: String,
    pub label: String,
    pub language: String,
    pub email: String,
    pub license: String,
    pub version: String,
    pub citation: Option<String>,
    pub url: String,
}

impl LexiconHeader {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: String::new(),
            language: "en".into(),
            email: String::new(),
            license: String::new(),
            version: String::new(),
            citation: None,
            url: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lemma {
    pub written_form: String,
    pub part_of_speech: PartOfSpeech,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pronunciation {
    pub value: String,
    pub variety: Option<String>,
}

/// A citation form plus part of speech, owning its senses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexicalEntry {
    pub id: String,
    pub lemma: Lemma,
    pub forms: Vec<String>,
    pub pronunciations: Vec<Pronunciation>,
    pub senses: Vec<Sense>,
}

impl LexicalEntry {
    pub fn new(id: impl Into<String>, written_form: impl Into<String>, pos: PartOfSpeech) -> Self {
        Self {
            id: id.into(),
            lemma: Lemma {
                written_form: written_form.into(),
                part_of_speech: pos,
            },
            forms: Vec::new(),
            pronunciations: Vec::new(),
            senses: Vec::new(),
        }
    }

    /// The sense of this entry that points at `synset`, if any.
    pub fn sense_for_synset(&self, synset: &str) -> Option<&Sense> {
        self.senses.iter().find(|s| s.synset == synset)
    }

    pub fn sense(&self, sense_id: &str) -> Option<&Sense> {
        self.senses.iter().find(|s| s.id == sense_id)
    }

    pub fn sense_mut(&mut self, sense_id: &str) -> Option<&mut Sense> {
        self.senses.iter_mut().find(|s| s.id == sense_id)
    }

    /// Sort senses by ordinal and make ordinals dense again.
    pub fn repack(&mut self) {
        self.senses.sort_by_key(|s| s.n);
        for (i, sense) in self.senses.iter_mut().enumerate() {
            sense.n = i;
        }
    }
}

/// The join between one entry and one synset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sense {
    pub id: String,
    /// Declared `%`-style sense key.
    pub key: Option<String>,
    pub synset: String,
    /// Zero-based position within the owning entry.
    pub n: usize,
    pub adjposition: Option<AdjPosition>,
    pub relations: Vec<SenseRelation>,
    pub subcat: Vec<String>,
}

impl Sense {
    pub fn new(id: impl Into<String>, synset: impl Into<String>, n: usize) -> Self {
        Self {
            id: id.into(),
            key: None,
            synset: synset.into(),
            n,
            adjposition: None,
            relations: Vec::new(),
            subcat: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub text: String,
    pub source: Option<String>,
}

impl Example {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: None,
        }
    }
}

/// A meaning node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Synset {
    pub id: String,
    pub ili: String,
    pub part_of_speech: PartOfSpeech,
    pub lexfile: String,
    pub definitions: Vec<String>,
    pub ili_definition: Option<String>,
    pub examples: Vec<Example>,
    pub relations: Vec<SynsetRelation>,
    /// Member entry ids. Order is literal and encodes historical sense rank.
    pub members: Vec<String>,
    pub source: Option<String>,
}

impl Synset {
    pub fn new(id: impl Into<String>, pos: PartOfSpeech, lexfile: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ili: ILI_UNASSIGNED.to_string(),
            part_of_speech: pos,
            lexfile: lexfile.into(),
            definitions: Vec::new(),
            ili_definition: None,
            examples: Vec::new(),
            relations: Vec::new(),
            members: Vec::new(),
            source: None,
        }
    }

    /// Targets of relations of the given type, in stored order.
    pub fn targets(&self, rel_type: SynsetRelType) -> impl Iterator<Item = &str> {
        self.relations
            .iter()
            .filter(move |r| r.rel_type == rel_type)
            .map(|r| r.target.as_str())
    }
}

/// A subcategorization frame shared by verb senses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntacticBehaviour {
    pub id: String,
    pub frame: String,
}

// ---------------------------------------------------------------------------
// Comments side table
// ---------------------------------------------------------------------------

/// What an XML comment is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CommentAnchor {
    /// An entry, sense or synset, by id.
    Node(String),
    /// One synset or sense relation: endpoints, `relType` name and, for
    /// `other` sense relations, the `dc:type` sub-type.
    Relation {
        source: String,
        target: String,
        rel_type: String,
        other_type: Option<String>,
    },
}

impl CommentAnchor {
    pub fn synset_relation(source: &str, relation: &SynsetRelation) -> Self {
        Self::Relation {
            source: source.to_string(),
            target: relation.target.clone(),
            rel_type: relation.rel_type.name().to_string(),
            other_type: None,
        }
    }

    pub fn sense_relation(source: &str, relation: &SenseRelation) -> Self {
        Self::Relation {
            source: source.to_string(),
            target: relation.target.clone(),
            rel_type: relation.rel_type.name().to_string(),
            other_type: relation.other_type.clone(),
        }
    }

    /// Whether the anchor names `id` as node or relation endpoint.
    pub fn mentions(&self, id: &str) -> bool {
        match self {
            Self::Node(n) => n == id,
            Self::Relation { source, target, .. } => source == id || target == id,
        }
    }
}

/// Human-authored comments keyed by the element they annotate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comments(BTreeMap<CommentAnchor, Vec<String>>);

impl Comments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, anchor: CommentAnchor, text: impl Into<String>) {
        self.0.entry(anchor).or_default().push(text.into());
    }

    pub fn get(&self, anchor: &CommentAnchor) -> &[String] {
        self.0.get(anchor).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn node(&self, id: &str) -> &[String] {
        self.get(&CommentAnchor::Node(id.to_string()))
    }

    /// Comments on every relation from `source` to `target`, whatever its type.
    pub fn relation(&self, source: &str, target: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(anchor, _)| {
                matches!(anchor, CommentAnchor::Relation { source: s, target: t, .. }
                    if s == source && t == target)
            })
            .flat_map(|(_, texts)| texts.iter().map(String::as_str))
            .collect()
    }

    /// Drop every comment that mentions `id` as node or relation endpoint.
    pub fn forget(&mut self, id: &str) {
        self.0.retain(|anchor, _| !anchor.mentions(id));
    }

    /// Drop the comments of the relations between `a` and `b`, either direction.
    pub fn forget_pair(&mut self, a: &str, b: &str) {
        self.0.retain(|anchor, _| match anchor {
            CommentAnchor::Relation { source, target, .. } => {
                !((source == a && target == b) || (source == b && target == a))
            }
            CommentAnchor::Node(_) => true,
        });
    }

    /// Move every comment that mentions `old` over to `new`.
    pub fn rename(&mut self, old: &str, new: &str) {
        let moved: Vec<CommentAnchor> = self
            .0
            .keys()
            .filter(|anchor| anchor.mentions(old))
            .cloned()
            .collect();
        let swap = |id: String| if id == old { new.to_string() } else { id };
        for anchor in moved {
            let Some(texts) = self.0.remove(&anchor) else {
                continue;
            };
            let renamed = match anchor {
                CommentAnchor::Node(id) => CommentAnchor::Node(swap(id)),
                CommentAnchor::Relation {
                    source,
                    target,
                    rel_type,
                    other_type,
                } => CommentAnchor::Relation {
                    source: swap(source),
                    target: swap(target),
                    rel_type,
                    other_type,
                },
            };
            self.0.entry(renamed).or_default().extend(texts);
        }
    }

    pub fn extend(&mut self, other: Comments) {
        for (anchor, texts) in other.0 {
            self.0.entry(anchor).or_default().extend(texts);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CommentAnchor, &Vec<String>)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Lexicon
// ---------------------------------------------------------------------------

/// Root aggregate: owns every entry and synset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lexicon {
    pub header: LexiconHeader,
    pub entries: Vec<LexicalEntry>,
    pub synsets: Vec<Synset>,
    pub frames: Vec<SyntacticBehaviour>,
    pub comments: Comments,
}

impl Lexicon {
    pub fn new(header: LexiconHeader) -> Self {
        Self {
            header,
            entries: Vec::new(),
            synsets: Vec::new(),
            frames: Vec::new(),
            comments: Comments::new(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.header.id
    }

    pub fn sense_count(&self) -> usize {
        self.entries.iter().map(|e| e.senses.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pos_chars_parse_back() {
        for &pos in PartOfSpeech::ALL {
            assert_eq!(PartOfSpeech::from_char(pos.as_char()).unwrap(), pos);
        }
        assert!("q".parse::<PartOfSpeech>().is_err());
        assert!("nn".parse::<PartOfSpeech>().is_err());
    }

    #[test]
    fn satellite_agrees_with_adjective() {
        assert!(PartOfSpeech::Adjective.equal_pos(PartOfSpeech::AdjectiveSatellite));
        assert!(PartOfSpeech::AdjectiveSatellite.equal_pos(PartOfSpeech::Adjective));
        assert!(!PartOfSpeech::Noun.equal_pos(PartOfSpeech::Verb));
    }

    #[test]
    fn repack_makes_ordinals_dense() {
        let mut entry = LexicalEntry::new("oewn-dog-n", "dog", PartOfSpeech::Noun);
        entry.senses.push(Sense::new("b", "s2", 5));
        entry.senses.push(Sense::new("a", "s1", 2));
        entry.repack();
        assert_eq!(entry.senses[0].id, "a");
        assert_eq!(entry.senses[0].n, 0);
        assert_eq!(entry.senses[1].n, 1);
    }

    #[test]
    fn comments_forget_node_and_relations() {
        let mut comments = Comments::new();
        comments.add(CommentAnchor::Node("x".into()), "about x");
        comments.add(
            CommentAnchor::synset_relation("y", &SynsetRelation::new("x", SynsetRelType::Also)),
            "y to x",
        );
        comments.add(CommentAnchor::Node("y".into()), "about y");
        comments.forget("x");
        assert!(comments.node("x").is_empty());
        assert!(comments.relation("y", "x").is_empty());
        assert_eq!(comments.node("y"), ["about y".to_string()]);
    }

    #[test]
    fn relation_anchors_tell_types_apart() {
        let also = SynsetRelation::new("b", SynsetRelType::Also);
        let similar = SynsetRelation::new("b", SynsetRelType::Similar);
        let mut comments = Comments::new();
        comments.add(CommentAnchor::synset_relation("a", &also), "checked by hand");
        assert_eq!(comments.get(&CommentAnchor::synset_relation("a", &also)).len(), 1);
        assert!(comments.get(&CommentAnchor::synset_relation("a", &similar)).is_empty());
        assert_eq!(comments.relation("a", "b"), ["checked by hand"]);

        comments.forget_pair("b", "a");
        assert!(comments.is_empty());
    }

    #[test]
    fn rename_moves_node_and_relation_comments() {
        let mut comments = Comments::new();
        let rel = SenseRelation::new("old", SenseRelType::Antonym);
        comments.add(CommentAnchor::Node("old".into()), "about old");
        comments.add(CommentAnchor::sense_relation("other", &rel), "other to old");
        comments.rename("old", "new");

        assert!(comments.node("old").is_empty());
        assert_eq!(comments.node("new"), ["about old".to_string()]);
        assert!(comments.relation("other", "old").is_empty());
        assert_eq!(comments.relation("other", "new"), ["other to old"]);
        assert_eq!(comments.len(), 2);
    }
}
