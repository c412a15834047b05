//! The sharded YAML corpus.
//!
//! Layout of a corpus directory:
//!
//! | file                 | content                                          |
//! |----------------------|--------------------------------------------------|
//! | `entries-<a..z>.yaml`| lemma → pos → forms, pronunciations, senses      |
//! | `entries-0.yaml`     | lemmas not starting with an ASCII letter         |
//! | `<lexfile>.yaml`     | short synset id → synset                         |
//! | `frames.yaml`        | frame id → subcategorization frame               |
//!
//! Synsets are referenced by id without the namespace prefix, senses by their
//! sense key, and members by lemma. Sense ids are not stored; they are derived
//! on load from the lemma, the synset and the lemma's member position. Only
//! the canonical half of each inverse pair is written.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::ident::{entry_id, full_synset_id, lexfile_number, sense_id, short_synset_id};
use crate::model::{
    AdjPosition, Example, ILI_UNASSIGNED, LexicalEntry, Lexicon, LexiconHeader,
    OTHER_SENSE_SUBTYPES, PartOfSpeech, Pronunciation, RelationType, Sense, SenseRelType,
    SenseRelation, Synset, SynsetRelType, SynsetRelation, SyntacticBehaviour,
};

use super::chunked::ChunkedYamlReader;
use super::{CodecResult, io_err, write_atomic};

pub const FRAMES_FILE: &str = "frames.yaml";
const ENTRIES_PREFIX: &str = "entries-";

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct EntryDoc {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    form: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pronunciation: Vec<PronunciationDoc>,
    #[serde(default)]
    sense: Vec<SenseDoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PronunciationDoc {
    value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    variety: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SenseDoc {
    /// The sense key.
    id: String,
    synset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    adjposition: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    subcat: Vec<String>,
    #[serde(flatten)]
    relations: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SynsetDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ili: Option<String>,
    #[serde(rename = "partOfSpeech")]
    part_of_speech: String,
    #[serde(default)]
    definition: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    example: Vec<ExampleDoc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(default)]
    members: Vec<String>,
    #[serde(flatten)]
    relations: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum ExampleDoc {
    Text(String),
    Sourced { text: String, source: String },
}

fn yaml_err(path: &Path, err: impl std::fmt::Display) -> CodecError {
    CodecError::Yaml {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

fn unresolved(reference: &str, context: impl Into<String>) -> CodecError {
    CodecError::Unresolved {
        reference: reference.to_string(),
        context: context.into(),
    }
}

/// Shard file for a lemma: `entries-<first letter>.yaml` or `entries-0.yaml`.
pub fn entry_shard(lemma: &str) -> String {
    match lemma.chars().next().map(|c| c.to_ascii_lowercase()) {
        Some(c) if c.is_ascii_lowercase() => format!("{ENTRIES_PREFIX}{c}.yaml"),
        _ => format!("{ENTRIES_PREFIX}0.yaml"),
    }
}

fn sense_rel_key(r: &SenseRelation) -> &str {
    match (&r.rel_type, &r.other_type) {
        (SenseRelType::Other, Some(sub)) => sub.as_str(),
        _ => r.rel_type.name(),
    }
}

fn parse_sense_rel_key(key: &str) -> CodecResult<(SenseRelType, Option<String>)> {
    if OTHER_SENSE_SUBTYPES.contains(&key) {
        return Ok((SenseRelType::Other, Some(key.to_string())));
    }
    Ok((key.parse()?, None))
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

enum Shard {
    Entries(PathBuf),
    Lexfile(String, PathBuf),
}

fn list_shards(dir: &Path) -> CodecResult<Vec<Shard>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err(dir))? {
        let path = entry.map_err(io_err(dir))?.path();
        if path.extension().is_some_and(|e| e == "yaml") {
            paths.push(path);
        }
    }
    paths.sort();
    let mut shards = Vec::new();
    for path in paths {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name == FRAMES_FILE {
            continue;
        }
        if name.starts_with(ENTRIES_PREFIX) {
            shards.push(Shard::Entries(path));
        } else if let Some(lexfile) = name.strip_suffix(".yaml") {
            shards.push(Shard::Lexfile(lexfile.to_string(), path.clone()));
        }
    }
    Ok(shards)
}

/// Load a YAML corpus directory. The header is not part of the corpus and
/// comes from configuration.
pub fn load_yaml(dir: &Path, header: LexiconHeader, chunk_threshold: usize) -> CodecResult<Lexicon> {
    let ns = header.id.clone();
    let mut lexicon = Lexicon::new(header);

    let frames_path = dir.join(FRAMES_FILE);
    if frames_path.exists() {
        let frames: Vec<(String, String)> =
            ChunkedYamlReader::open(&frames_path, chunk_threshold)?.read_pairs()?;
        lexicon.frames = frames
            .into_iter()
            .map(|(id, frame)| SyntacticBehaviour { id, frame })
            .collect();
    }

    let mut synset_docs: Vec<(String, String, SynsetDoc)> = Vec::new();
    let mut entry_docs: Vec<(String, BTreeMap<String, EntryDoc>)> = Vec::new();
    for shard in list_shards(dir)? {
        match shard {
            Shard::Entries(path) => {
                entry_docs.extend(
                    ChunkedYamlReader::open(&path, chunk_threshold)?
                        .read_pairs::<BTreeMap<String, EntryDoc>>()?,
                )
            }
            Shard::Lexfile(lexfile, path) => {
                let docs: Vec<(String, SynsetDoc)> =
                    ChunkedYamlReader::open(&path, chunk_threshold)?.read_pairs()?;
                synset_docs.extend(docs.into_iter().map(|(id, d)| (lexfile.clone(), id, d)));
            }
        }
    }

    // Synsets first: sense ids need member positions.
    let mut synset_pos: HashMap<String, usize> = HashMap::new();
    let mut member_lemmas: Vec<Vec<String>> = Vec::new();
    for (lexfile, short, doc) in synset_docs {
        let id = full_synset_id(&ns, &short);
        let mut synset = Synset::new(id.clone(), doc.part_of_speech.parse()?, lexfile);
        synset.ili = doc.ili.unwrap_or_else(|| ILI_UNASSIGNED.to_string());
        synset.definitions = doc.definition;
        synset.source = doc.source;
        synset.examples = doc
            .example
            .into_iter()
            .map(|ex| match ex {
                ExampleDoc::Text(text) => Example::new(text),
                ExampleDoc::Sourced { text, source } => Example {
                    text,
                    source: Some(source),
                },
            })
            .collect();
        for (key, targets) in doc.relations {
            let rel_type: SynsetRelType = key.parse()?;
            for target in targets {
                synset
                    .relations
                    .push(SynsetRelation::new(full_synset_id(&ns, &target), rel_type));
            }
        }
        if synset_pos.insert(id.clone(), lexicon.synsets.len()).is_some() {
            return Err(CodecError::Duplicate { what: "synset", id });
        }
        member_lemmas.push(doc.members);
        lexicon.synsets.push(synset);
    }

    let mut key_to_sense: HashMap<String, String> = HashMap::new();
    let mut member_entry: HashMap<(String, String), String> = HashMap::new();
    let mut pending: Vec<(usize, usize, BTreeMap<String, Vec<String>>)> = Vec::new();
    let mut entry_ids: HashSet<String> = HashSet::new();

    for (lemma, by_pos) in entry_docs {
        for (pos, doc) in by_pos {
            let pos: PartOfSpeech = pos.parse()?;
            let id = entry_id(&ns, &lemma, pos);
            if !entry_ids.insert(id.clone()) {
                return Err(CodecError::Duplicate { what: "entry", id });
            }
            let mut entry = LexicalEntry::new(id, lemma.clone(), pos);
            entry.forms = doc.form;
            entry.pronunciations = doc
                .pronunciation
                .into_iter()
                .map(|p| Pronunciation {
                    value: p.value,
                    variety: p.variety,
                })
                .collect();
            let entry_index = lexicon.entries.len();
            for (n, sdoc) in doc.sense.into_iter().enumerate() {
                let synset = full_synset_id(&ns, &sdoc.synset);
                let index = *synset_pos
                    .get(&synset)
                    .ok_or_else(|| unresolved(&sdoc.synset, format!("sense {}", sdoc.id)))?;
                let position = member_lemmas[index]
                    .iter()
                    .position(|m| *m == lemma)
                    .ok_or_else(|| unresolved(&lemma, format!("members of {synset}")))?;
                let mut sense = Sense::new(sense_id(&lemma, &synset, position + 1)?, synset.clone(), n);
                sense.adjposition = sdoc
                    .adjposition
                    .as_deref()
                    .map(str::parse::<AdjPosition>)
                    .transpose()?;
                sense.subcat = sdoc.subcat;
                if key_to_sense
                    .insert(sdoc.id.clone(), sense.id.clone())
                    .is_some()
                {
                    return Err(CodecError::Duplicate {
                        what: "sense key",
                        id: sdoc.id,
                    });
                }
                sense.key = Some(sdoc.id);
                member_entry.insert((lemma.clone(), synset), entry.id.clone());
                if !sdoc.relations.is_empty() {
                    pending.push((entry_index, entry.senses.len(), sdoc.relations));
                }
                entry.senses.push(sense);
            }
            lexicon.entries.push(entry);
        }
    }

    for (ei, si, relations) in pending {
        let source = lexicon.entries[ei].senses[si].id.clone();
        let mut resolved = Vec::new();
        for (key, targets) in relations {
            let (rel_type, other_type) = parse_sense_rel_key(&key)?;
            for target_key in targets {
                let target = key_to_sense
                    .get(&target_key)
                    .ok_or_else(|| unresolved(&target_key, format!("{key} of {source}")))?;
                let mut relation = SenseRelation::new(target.clone(), rel_type);
                relation.other_type = other_type.clone();
                resolved.push(relation);
            }
        }
        lexicon.entries[ei].senses[si].relations = resolved;
    }

    for (synset, lemmas) in lexicon.synsets.iter_mut().zip(member_lemmas) {
        synset.members = lemmas
            .into_iter()
            .map(|lemma| {
                member_entry
                    .get(&(lemma.clone(), synset.id.clone()))
                    .cloned()
                    .ok_or_else(|| unresolved(&lemma, format!("members of {}", synset.id)))
            })
            .collect::<CodecResult<_>>()?;
    }

    let restored = restore_inverses(&mut lexicon);
    tracing::info!(
        dir = %dir.display(),
        entries = lexicon.entries.len(),
        synsets = lexicon.synsets.len(),
        restored,
        "loaded yaml"
    );
    Ok(lexicon)
}

/// Mirrors `(target, source, inverse)` that are derived and not yet present.
fn missing_mirrors<'a, T: RelationType>(
    edges: impl Iterator<Item = (&'a str, &'a str, T)> + Clone,
) -> Vec<(String, String, T)> {
    let existing: HashSet<(&str, &str, T)> = edges.clone().collect();
    let mut seen = HashSet::new();
    edges
        .filter_map(|(source, target, t)| {
            let inv = t.inverse().filter(|inv| inv.is_derived())?;
            (!existing.contains(&(target, source, inv)) && seen.insert((target, source, inv)))
                .then(|| (target.to_string(), source.to_string(), inv))
        })
        .collect()
}

/// Add the derived halves of inverse pairs. Returns how many were added.
fn restore_inverses(lexicon: &mut Lexicon) -> usize {
    let synset_mirrors = missing_mirrors(lexicon.synsets.iter().flat_map(|s| {
        s.relations
            .iter()
            .map(move |r| (s.id.as_str(), r.target.as_str(), r.rel_type))
    }));
    let sense_mirrors = missing_mirrors(lexicon.entries.iter().flat_map(|e| {
        e.senses.iter().flat_map(|s| {
            s.relations
                .iter()
                .map(move |r| (s.id.as_str(), r.target.as_str(), r.rel_type))
        })
    }));
    let added = synset_mirrors.len() + sense_mirrors.len();

    let synset_pos: HashMap<String, usize> = lexicon
        .synsets
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id.clone(), i))
        .collect();
    for (holder, target, rel_type) in synset_mirrors {
        if let Some(&i) = synset_pos.get(&holder) {
            lexicon.synsets[i]
                .relations
                .push(SynsetRelation::new(target, rel_type));
        }
    }

    let sense_pos: HashMap<String, (usize, usize)> = lexicon
        .entries
        .iter()
        .enumerate()
        .flat_map(|(ei, e)| {
            e.senses
                .iter()
                .enumerate()
                .map(move |(si, s)| (s.id.clone(), (ei, si)))
        })
        .collect();
    for (holder, target, rel_type) in sense_mirrors {
        if let Some(&(ei, si)) = sense_pos.get(&holder) {
            lexicon.entries[ei].senses[si]
                .relations
                .push(SenseRelation::new(target, rel_type));
        }
    }
    added
}

// ---------------------------------------------------------------------------
// Saving
// ---------------------------------------------------------------------------

/// Whether `source =t=> target` is written: derived halves are dropped when
/// the canonical half is present to regenerate them.
fn written<T: RelationType>(existing: &HashSet<(&str, &str, T)>, source: &str, target: &str, t: T) -> bool {
    !(t.is_derived()
        && t.inverse()
            .is_some_and(|inv| existing.contains(&(target, source, inv))))
}

fn edge_set<'a, T: RelationType>(
    edges: impl Iterator<Item = (&'a str, &'a str, T)>,
) -> HashSet<(&'a str, &'a str, T)> {
    edges.collect()
}

/// Write `lexicon` as a YAML corpus into `dir`. Returns the number of files.
///
/// Every sense must carry a sense key, since keys are how senses are named
/// in the corpus.
pub fn save_yaml(lexicon: &Lexicon, dir: &Path) -> CodecResult<usize> {
    let ns = lexicon.namespace();
    let mut keys: HashMap<&str, &str> = HashMap::new();
    for sense in lexicon.entries.iter().flat_map(|e| &e.senses) {
        let key = sense.key.as_deref().ok_or_else(|| CodecError::UnkeyedSense {
            sense: sense.id.clone(),
        })?;
        keys.insert(&sense.id, key);
    }
    let lemma_of: HashMap<&str, &str> = lexicon
        .entries
        .iter()
        .map(|e| (e.id.as_str(), e.lemma.written_form.as_str()))
        .collect();

    let sense_edges = edge_set(lexicon.entries.iter().flat_map(|e| {
        e.senses.iter().flat_map(|s| {
            s.relations
                .iter()
                .map(move |r| (s.id.as_str(), r.target.as_str(), r.rel_type))
        })
    }));
    let synset_edges = edge_set(lexicon.synsets.iter().flat_map(|s| {
        s.relations
            .iter()
            .map(move |r| (s.id.as_str(), r.target.as_str(), r.rel_type))
    }));

    let mut entry_shards: BTreeMap<String, BTreeMap<String, BTreeMap<String, EntryDoc>>> =
        BTreeMap::new();
    for entry in &lexicon.entries {
        let mut senses: Vec<&Sense> = entry.senses.iter().collect();
        senses.sort_by_key(|s| s.n);
        let mut doc = EntryDoc {
            form: entry.forms.clone(),
            pronunciation: entry
                .pronunciations
                .iter()
                .map(|p| PronunciationDoc {
                    value: p.value.clone(),
                    variety: p.variety.clone(),
                })
                .collect(),
            sense: Vec::new(),
        };
        for sense in senses {
            let mut relations: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for r in &sense.relations {
                if !written(&sense_edges, &sense.id, &r.target, r.rel_type) {
                    continue;
                }
                let target = keys
                    .get(r.target.as_str())
                    .ok_or_else(|| CodecError::UnkeyedSense {
                        sense: r.target.clone(),
                    })?;
                relations
                    .entry(sense_rel_key(r).to_string())
                    .or_default()
                    .push(target.to_string());
            }
            doc.sense.push(SenseDoc {
                id: keys[sense.id.as_str()].to_string(),
                synset: short_synset_id(ns, &sense.synset).to_string(),
                adjposition: sense.adjposition.map(|a| a.as_str().to_string()),
                subcat: sense.subcat.clone(),
                relations,
            });
        }
        let by_pos = entry_shards
            .entry(entry_shard(&entry.lemma.written_form))
            .or_default()
            .entry(entry.lemma.written_form.clone())
            .or_default();
        let pos = entry.lemma.part_of_speech.as_char().to_string();
        if by_pos.insert(pos, doc).is_some() {
            return Err(CodecError::Duplicate {
                what: "entry",
                id: entry.id.clone(),
            });
        }
    }

    let mut lexfile_shards: BTreeMap<String, BTreeMap<String, SynsetDoc>> = BTreeMap::new();
    for synset in &lexicon.synsets {
        let mut relations: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for r in &synset.relations {
            if written(&synset_edges, &synset.id, &r.target, r.rel_type) {
                relations
                    .entry(r.rel_type.name().to_string())
                    .or_default()
                    .push(short_synset_id(ns, &r.target).to_string());
            }
        }
        let members = synset
            .members
            .iter()
            .map(|m| {
                lemma_of
                    .get(m.as_str())
                    .map(|l| l.to_string())
                    .ok_or_else(|| unresolved(m, format!("members of {}", synset.id)))
            })
            .collect::<CodecResult<Vec<_>>>()?;
        let doc = SynsetDoc {
            ili: (synset.ili != ILI_UNASSIGNED).then(|| synset.ili.clone()),
            part_of_speech: synset.part_of_speech.as_char().to_string(),
            definition: synset.definitions.clone(),
            example: synset
                .examples
                .iter()
                .map(|ex| match &ex.source {
                    Some(source) => ExampleDoc::Sourced {
                        text: ex.text.clone(),
                        source: source.clone(),
                    },
                    None => ExampleDoc::Text(ex.text.clone()),
                })
                .collect(),
            source: synset.source.clone(),
            members,
            relations,
        };
        lexfile_shards
            .entry(synset.lexfile.clone())
            .or_default()
            .insert(short_synset_id(ns, &synset.id).to_string(), doc);
    }

    std::fs::create_dir_all(dir).map_err(io_err(dir))?;
    let mut written_files: HashSet<PathBuf> = HashSet::new();
    for (name, shard) in &entry_shards {
        written_files.insert(write_shard(dir, name, shard)?);
    }
    for (lexfile, shard) in &lexfile_shards {
        written_files.insert(write_shard(dir, &format!("{lexfile}.yaml"), shard)?);
    }
    let frames: BTreeMap<&str, &str> = lexicon
        .frames
        .iter()
        .map(|f| (f.id.as_str(), f.frame.as_str()))
        .collect();
    written_files.insert(write_shard(dir, FRAMES_FILE, &frames)?);

    for shard in list_shards(dir)? {
        let stale = match shard {
            Shard::Entries(path) => path,
            Shard::Lexfile(lexfile, path) if lexfile_number(&lexfile).is_ok() => path,
            Shard::Lexfile(..) => continue,
        };
        if !written_files.contains(&stale) {
            std::fs::remove_file(&stale).map_err(io_err(&stale))?;
            tracing::info!(path = %stale.display(), "removed stale shard");
        }
    }

    tracing::info!(
        dir = %dir.display(),
        files = written_files.len(),
        entries = lexicon.entries.len(),
        synsets = lexicon.synsets.len(),
        "saved yaml"
    );
    Ok(written_files.len())
}

fn write_shard<T: Serialize>(dir: &Path, name: &str, value: &T) -> CodecResult<PathBuf> {
    let path = dir.join(name);
    let text = serde_yaml::to_string(value).map_err(|e| yaml_err(&path, e))?;
    write_atomic(&path, &text)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Lexicon {
        let mut lex = Lexicon::new(LexiconHeader::new("oewn"));
        let mut animal = Synset::new("oewn-02086723-n", PartOfSpeech::Noun, "noun.animal");
        animal.ili = "i46360".into();
        animal.definitions.push("a member of the genus Canis".into());
        animal.examples.push(Example::new("the dog barked"));
        animal.examples.push(Example {
            text: "every dog has its day".into(),
            source: Some("proverb".into()),
        });
        animal.members = vec!["oewn-dog-n".into(), "oewn-domestic_dog-n".into()];
        animal
            .relations
            .push(SynsetRelation::new("oewn-02085998-n", SynsetRelType::Hypernym));
        let mut canine = Synset::new("oewn-02085998-n", PartOfSpeech::Noun, "noun.animal");
        canine.definitions.push("a canine".into());
        canine.members = vec!["oewn-canine-n".into()];
        canine
            .relations
            .push(SynsetRelation::new("oewn-02086723-n", SynsetRelType::Hyponym));
        let mut hot = Synset::new("oewn-01247240-a", PartOfSpeech::Adjective, "adj.all");
        hot.definitions.push("high temperature".into());
        hot.members = vec!["oewn-hot-a".into()];
        let mut cold = Synset::new("oewn-01251128-a", PartOfSpeech::Adjective, "adj.all");
        cold.definitions.push("low temperature".into());
        cold.members = vec!["oewn-cold-a".into()];
        lex.synsets = vec![animal, canine, hot, cold];

        let mut dog = LexicalEntry::new("oewn-dog-n", "dog", PartOfSpeech::Noun);
        dog.forms.push("dogs".into());
        let mut s = Sense::new("oewn-dog-n-02086723-01", "oewn-02086723-n", 0);
        s.key = Some("dog%1:05:00::".into());
        dog.senses.push(s);
        let mut domestic = LexicalEntry::new("oewn-domestic_dog-n", "domestic dog", PartOfSpeech::Noun);
        let mut s = Sense::new("oewn-domestic_dog-n-02086723-02", "oewn-02086723-n", 0);
        s.key = Some("domestic_dog%1:05:00::".into());
        domestic.senses.push(s);
        let mut canine_e = LexicalEntry::new("oewn-canine-n", "canine", PartOfSpeech::Noun);
        let mut s = Sense::new("oewn-canine-n-02085998-01", "oewn-02085998-n", 0);
        s.key = Some("canine%1:05:00::".into());
        canine_e.senses.push(s);
        let mut hot_e = LexicalEntry::new("oewn-hot-a", "hot", PartOfSpeech::Adjective);
        let mut s = Sense::new("oewn-hot-a-01247240-01", "oewn-01247240-a", 0);
        s.key = Some("hot%3:00:01::".into());
        s.adjposition = Some(AdjPosition::Predicative);
        s.relations
            .push(SenseRelation::new("oewn-cold-a-01251128-01", SenseRelType::Antonym));
        let mut other = SenseRelation::new("oewn-cold-a-01251128-01", SenseRelType::Other);
        other.other_type = Some("property".into());
        s.relations.push(other);
        hot_e.senses.push(s);
        let mut cold_e = LexicalEntry::new("oewn-cold-a", "cold", PartOfSpeech::Adjective);
        let mut s = Sense::new("oewn-cold-a-01251128-01", "oewn-01251128-a", 0);
        s.key = Some("cold%3:00:01::".into());
        s.relations
            .push(SenseRelation::new("oewn-hot-a-01247240-01", SenseRelType::Antonym));
        cold_e.senses.push(s);
        lex.entries = vec![dog, domestic, canine_e, hot_e, cold_e];
        lex.frames.push(SyntacticBehaviour {
            id: "via".into(),
            frame: "Somebody ----s".into(),
        });
        lex
    }

    fn normalized(mut lex: Lexicon) -> Lexicon {
        lex.entries.sort_by(|a, b| a.id.cmp(&b.id));
        lex.synsets.sort_by(|a, b| a.id.cmp(&b.id));
        for s in &mut lex.synsets {
            s.relations
                .sort_by(|a, b| (a.rel_type, &a.target).cmp(&(b.rel_type, &b.target)));
        }
        for e in &mut lex.entries {
            for s in &mut e.senses {
                s.relations.sort_by(|a, b| {
                    (a.rel_type, &a.target, &a.other_type).cmp(&(b.rel_type, &b.target, &b.other_type))
                });
            }
        }
        lex
    }

    #[test]
    fn save_then_load_is_lossless() {
        let dir = TempDir::new().unwrap();
        let lex = sample();
        save_yaml(&lex, dir.path()).unwrap();
        let back = load_yaml(dir.path(), LexiconHeader::new("oewn"), 64).unwrap();
        assert_eq!(normalized(back), normalized(lex));
    }

    #[test]
    fn only_canonical_half_is_written() {
        let dir = TempDir::new().unwrap();
        save_yaml(&sample(), dir.path()).unwrap();
        let animals = std::fs::read_to_string(dir.path().join("noun.animal.yaml")).unwrap();
        assert!(animals.contains("hypernym"));
        assert!(!animals.contains("hyponym"));
        assert!(animals.contains("02086723-n"));
        assert!(!animals.contains("oewn-"));
        let adjectives = std::fs::read_to_string(dir.path().join("entries-h.yaml")).unwrap();
        assert!(adjectives.contains("antonym"));
        assert!(adjectives.contains("property"));
        assert!(dir.path().join("entries-d.yaml").exists());
        assert!(dir.path().join("frames.yaml").exists());
    }

    #[test]
    fn orphan_derived_relation_survives() {
        let dir = TempDir::new().unwrap();
        let mut lex = sample();
        lex.synsets[0].relations.clear();
        save_yaml(&lex, dir.path()).unwrap();
        let back = load_yaml(dir.path(), LexiconHeader::new("oewn"), 1 << 20).unwrap();
        let canine = back.synsets.iter().find(|s| s.id == "oewn-02085998-n").unwrap();
        assert_eq!(canine.relations.len(), 1);
        assert_eq!(canine.relations[0].rel_type, SynsetRelType::Hyponym);
        let animal = back.synsets.iter().find(|s| s.id == "oewn-02086723-n").unwrap();
        assert!(animal.relations.is_empty());
    }

    #[test]
    fn sense_ids_follow_member_position() {
        let dir = TempDir::new().unwrap();
        save_yaml(&sample(), dir.path()).unwrap();
        let back = load_yaml(dir.path(), LexiconHeader::new("oewn"), 1 << 20).unwrap();
        let domestic = back
            .entries
            .iter()
            .find(|e| e.id == "oewn-domestic_dog-n")
            .unwrap();
        assert_eq!(domestic.senses[0].id, "oewn-domestic_dog-n-02086723-02");
    }

    #[test]
    fn unkeyed_sense_refuses_to_save() {
        let dir = TempDir::new().unwrap();
        let mut lex = sample();
        lex.entries[0].senses[0].key = None;
        let err = save_yaml(&lex, dir.path()).unwrap_err();
        assert!(matches!(err, CodecError::UnkeyedSense { .. }));
    }

    #[test]
    fn unresolved_member_is_an_error() {
        let dir = TempDir::new().unwrap();
        save_yaml(&sample(), dir.path()).unwrap();
        let path = dir.path().join("noun.animal.yaml");
        let text = std::fs::read_to_string(&path).unwrap().replace("- canine", "- wolf");
        std::fs::write(&path, text).unwrap();
        let err = load_yaml(dir.path(), LexiconHeader::new("oewn"), 1 << 20).unwrap_err();
        assert!(matches!(err, CodecError::Unresolved { .. }));
    }

    #[test]
    fn shard_names() {
        assert_eq!(entry_shard("Dog"), "entries-d.yaml");
        assert_eq!(entry_shard("'hood"), "entries-0.yaml");
        assert_eq!(entry_shard("élan"), "entries-0.yaml");
    }
}
