//! Read-only integrity checks over a lexicon store.
//!
//! The validator never stops at the first problem: every check runs and each
//! finding becomes a [`Violation`]. Where a mechanical repair exists, the
//! violation carries it as an edit [`Operation`], so a fix script is just the
//! list of `fix` payloads.

pub mod cycles;

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;

use serde::Serialize;

use crate::edit::Operation;
use crate::error::LexnetResult;
use crate::ident::{
    IdGrammar, SynsetId, compute_sense_key, entry_id, escape_lemma, lexfile_number, sense_index,
};
use crate::model::{
    ILI_UNASSIGNED, LexicalEntry, Lexicon, OTHER_SENSE_SUBTYPES, PartOfSpeech, RelationType,
    Sense, SenseRelType, Synset, SynsetRelType,
};
use crate::store::{LexiconStore, collect_lexicon};

use cycles::find_cycles;

/// Root of the noun hierarchy in the default namespace layout (`entity`).
pub const DEFAULT_ROOT_NUMBER: &str = "00001740-n";

// ---------------------------------------------------------------------------
// Violations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    MalformedId,
    DanglingReference,
    Duplicate,
    Asymmetry,
    Cycle,
    Collision,
    StaleDerivedValue,
    Structure,
}

impl ViolationKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ViolationKind::MalformedId => "malformed-id",
            ViolationKind::DanglingReference => "dangling-reference",
            ViolationKind::Duplicate => "duplicate",
            ViolationKind::Asymmetry => "asymmetry",
            ViolationKind::Cycle => "cycle",
            ViolationKind::Collision => "collision",
            ViolationKind::StaleDerivedValue => "stale-derived-value",
            ViolationKind::Structure => "structure",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub kind: ViolationKind,
    /// Id of the node the finding is reported on.
    pub node: String,
    pub message: String,
    /// Edit that repairs the finding, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<Operation>,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.node, self.message)
    }
}

/// Everything one validation run found.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub violations: Vec<Violation>,
}

impl Report {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn of_kind(&self, kind: ViolationKind) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.kind == kind)
    }

    /// Count per kind.
    pub fn summary(&self) -> BTreeMap<ViolationKind, usize> {
        let mut counts = BTreeMap::new();
        for v in &self.violations {
            *counts.entry(v.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Repair operations in report order, without repeats.
    pub fn fixes(&self) -> Vec<Operation> {
        let mut seen = Vec::new();
        for op in self.violations.iter().filter_map(|v| v.fix.as_ref()) {
            if !seen.contains(op) {
                seen.push(op.clone());
            }
        }
        seen
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidateConfig {
    /// Noun synsets allowed to have no hypernym.
    pub roots: Vec<String>,
}

impl ValidateConfig {
    pub fn for_namespace(ns: &str) -> Self {
        Self {
            roots: vec![format!("{ns}-{DEFAULT_ROOT_NUMBER}")],
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Run every check against `store`.
pub fn validate<S: LexiconStore + ?Sized>(store: &S, config: &ValidateConfig) -> LexnetResult<Report> {
    let lexicon = collect_lexicon(store)?;
    let mut checker = Checker::new(store, &lexicon, config)?;
    checker.run();
    let report = checker.report;
    tracing::info!(
        entries = lexicon.entries.len(),
        synsets = lexicon.synsets.len(),
        violations = report.len(),
        "validated"
    );
    Ok(report)
}

struct Checker<'a, S: ?Sized> {
    store: &'a S,
    lexicon: &'a Lexicon,
    config: &'a ValidateConfig,
    grammar: IdGrammar,
    entries: HashMap<&'a str, &'a LexicalEntry>,
    synsets: HashMap<&'a str, &'a Synset>,
    senses: HashMap<&'a str, (&'a LexicalEntry, &'a Sense)>,
    report: Report,
}

impl<'a, S: LexiconStore + ?Sized> Checker<'a, S> {
    fn new(store: &'a S, lexicon: &'a Lexicon, config: &'a ValidateConfig) -> LexnetResult<Self> {
        let grammar = IdGrammar::new(lexicon.namespace())?;
        let entries = lexicon.entries.iter().map(|e| (e.id.as_str(), e)).collect();
        let synsets = lexicon.synsets.iter().map(|s| (s.id.as_str(), s)).collect();
        let senses = lexicon
            .entries
            .iter()
            .flat_map(|e| e.senses.iter().map(move |s| (s.id.as_str(), (e, s))))
            .collect();
        Ok(Self {
            store,
            lexicon,
            config,
            grammar,
            entries,
            synsets,
            senses,
            report: Report::default(),
        })
    }

    fn push(&mut self, kind: ViolationKind, node: &str, message: impl Into<String>) {
        self.push_fix(kind, node, message, None);
    }

    fn push_fix(
        &mut self,
        kind: ViolationKind,
        node: &str,
        message: impl Into<String>,
        fix: Option<Operation>,
    ) {
        self.report.violations.push(Violation {
            kind,
            node: node.to_string(),
            message: message.into(),
            fix,
        });
    }

    fn run(&mut self) {
        let lexicon = self.lexicon;
        for entry in &lexicon.entries {
            self.check_entry(entry);
            for sense in &entry.senses {
                self.check_sense(entry, sense);
                self.check_sense_relations(sense);
            }
        }
        for synset in &lexicon.synsets {
            self.check_synset(synset);
            self.check_synset_relations(synset);
            self.check_hypernyms(synset);
        }
        self.check_collisions();
        self.check_global_duplicates();
        self.check_cycles();
    }

    // -----------------------------------------------------------------------
    // Entries and senses
    // -----------------------------------------------------------------------

    fn check_entry(&mut self, entry: &LexicalEntry) {
        use ViolationKind::*;
        let pos = entry.lemma.part_of_speech;
        if !self.grammar.is_entry_id(&entry.id) {
            self.push(MalformedId, &entry.id, "entry id does not match the id grammar");
        } else if self.grammar.entry_pos(&entry.id) != Some(pos) {
            self.push(
                MalformedId,
                &entry.id,
                format!("entry id suffix disagrees with lemma part of speech {pos}"),
            );
        } else {
            let expected = entry_id(self.lexicon.namespace(), &entry.lemma.written_form, pos);
            if expected != entry.id {
                self.push(
                    StaleDerivedValue,
                    &entry.id,
                    format!("entry id should be {expected} for lemma \"{}\"", entry.lemma.written_form),
                );
            }
        }
        if entry.senses.is_empty() {
            self.push(Structure, &entry.id, "entry has no senses");
        }
        let mut synsets = HashSet::new();
        for sense in &entry.senses {
            if !synsets.insert(sense.synset.as_str()) {
                self.push(
                    Duplicate,
                    &entry.id,
                    format!("two senses point at synset {}", sense.synset),
                );
            }
        }
    }

    fn check_sense(&mut self, entry: &LexicalEntry, sense: &Sense) {
        use ViolationKind::*;
        let parts = self.grammar.parse_sense_id(&sense.id);
        if parts.is_none() {
            self.push(MalformedId, &sense.id, "sense id does not match the id grammar");
        }
        let mut subcats = HashSet::new();
        for frame in &sense.subcat {
            if !subcats.insert(frame.as_str()) {
                self.push(Duplicate, &sense.id, format!("subcat frame {frame} listed twice"));
            }
        }
        let Some(synset) = self.synsets.get(sense.synset.as_str()).copied() else {
            self.push(
                DanglingReference,
                &sense.id,
                format!("sense points at missing synset {}", sense.synset),
            );
            return;
        };
        if !entry.lemma.part_of_speech.equal_pos(synset.part_of_speech) {
            self.push(
                Structure,
                &sense.id,
                format!(
                    "entry part of speech {} disagrees with synset part of speech {}",
                    entry.lemma.part_of_speech, synset.part_of_speech
                ),
            );
        }
        if sense.adjposition.is_some() && !synset.part_of_speech.is_adjectival() {
            self.push(Structure, &sense.id, "adjective position on a non-adjective sense");
        }

        match synset.members.iter().position(|m| *m == entry.id) {
            None => self.push(
                Asymmetry,
                &sense.id,
                format!("entry {} is not a member of {}", entry.id, synset.id),
            ),
            Some(position) => {
                let expected = position as u32 + 1;
                if sense_index(&sense.id) != Some(expected) {
                    self.push(
                        StaleDerivedValue,
                        &sense.id,
                        format!("sense id index should be {expected:02}, the member position"),
                    );
                }
            }
        }
        if let (Some(parts), Ok(parsed)) = (&parts, SynsetId::parse(&synset.id))
            && (parts.lemma_token != escape_lemma(&entry.lemma.written_form)
                || parts.number != parsed.number
                || parts.pos != parsed.pos)
        {
            self.push(
                StaleDerivedValue,
                &sense.id,
                format!("sense id does not match lemma \"{}\" and synset {}", entry.lemma.written_form, synset.id),
            );
        }

        match &sense.key {
            None => self.push(StaleDerivedValue, &sense.id, "sense has no sense key"),
            Some(declared) => match compute_sense_key(self.store, entry, sense) {
                Ok(computed) => {
                    let computed = computed.to_string();
                    if computed != *declared {
                        self.push(
                            StaleDerivedValue,
                            &sense.id,
                            format!("sense key {declared} should be {computed}"),
                        );
                    }
                }
                Err(e) => self.push(Structure, &sense.id, format!("cannot compute sense key: {e}")),
            },
        }
    }

    fn check_sense_relations(&mut self, sense: &Sense) {
        use ViolationKind::*;
        let source_pos = self
            .synsets
            .get(sense.synset.as_str())
            .map(|s| s.part_of_speech);
        let mut seen = HashSet::new();
        for r in &sense.relations {
            if !seen.insert((r.target.as_str(), r.rel_type, r.other_type.as_deref())) {
                self.push(
                    Duplicate,
                    &sense.id,
                    format!("relation {} to {} listed twice", r.rel_type, r.target),
                );
                continue;
            }
            if r.target == sense.id {
                self.push(Structure, &sense.id, format!("{} relation to itself", r.rel_type));
                continue;
            }
            let Some((_, target)) = self.senses.get(r.target.as_str()).copied() else {
                self.push_fix(
                    DanglingReference,
                    &sense.id,
                    format!("{} relation to missing sense {}", r.rel_type, r.target),
                    Some(Operation::DeleteSenseRelation {
                        source: sense.id.clone(),
                        target: r.target.clone(),
                    }),
                );
                continue;
            };
            if let Some(inv) = r.rel_type.inverse()
                && !target
                    .relations
                    .iter()
                    .any(|back| back.target == sense.id && back.rel_type == inv)
            {
                self.push_fix(
                    Asymmetry,
                    &sense.id,
                    format!("{} relation to {} lacks its inverse {inv}", r.rel_type, r.target),
                    Some(Operation::AddSenseRelation {
                        source: r.target.clone(),
                        rel_type: inv,
                        target: sense.id.clone(),
                    }),
                );
            }
            if r.rel_type == SenseRelType::Pertainym
                && source_pos.is_some_and(|p| !p.is_adjectival() && p != PartOfSpeech::Adverb)
            {
                self.push(Structure, &sense.id, "pertainym on a sense that is not an adjective or adverb");
            }
            if r.rel_type == SenseRelType::Other
                && r.other_type
                    .as_deref()
                    .is_some_and(|t| !OTHER_SENSE_SUBTYPES.contains(&t))
            {
                self.push(
                    Structure,
                    &sense.id,
                    format!("unknown relation sub-type {:?}", r.other_type),
                );
            }
        }
    }

    // -----------------------------------------------------------------------
    // Synsets
    // -----------------------------------------------------------------------

    fn check_synset(&mut self, synset: &Synset) {
        use ViolationKind::*;
        if !self.grammar.is_synset_id(&synset.id) {
            self.push(MalformedId, &synset.id, "synset id does not match the id grammar");
        } else if SynsetId::parse(&synset.id).is_ok_and(|p| p.pos != synset.part_of_speech) {
            self.push(
                MalformedId,
                &synset.id,
                format!("synset id suffix disagrees with part of speech {}", synset.part_of_speech),
            );
        }
        if lexfile_number(&synset.lexfile).is_err() {
            self.push(Structure, &synset.id, format!("unknown lexicographer file {:?}", synset.lexfile));
        }

        if synset.members.is_empty() {
            self.push_fix(
                Structure,
                &synset.id,
                "synset has no members",
                Some(Operation::DeleteSynset {
                    synset: synset.id.clone(),
                }),
            );
        }
        let mut members = HashSet::new();
        for member in &synset.members {
            if !members.insert(member.as_str()) {
                self.push(Duplicate, &synset.id, format!("member {member} listed twice"));
                continue;
            }
            match self.entries.get(member.as_str()).copied() {
                None => self.push(
                    DanglingReference,
                    &synset.id,
                    format!("member {member} is not an entry"),
                ),
                Some(entry) if entry.sense_for_synset(&synset.id).is_none() => self.push(
                    Asymmetry,
                    &synset.id,
                    format!("member {member} has no sense for this synset"),
                ),
                Some(_) => {}
            }
        }

        if synset.definitions.iter().all(|d| d.trim().is_empty()) {
            self.push(Structure, &synset.id, "synset has no definition");
        } else if synset.definitions.iter().any(|d| d.trim().is_empty()) {
            self.push(Structure, &synset.id, "synset has an empty definition");
        }
        let mut definitions = HashSet::new();
        for d in &synset.definitions {
            if !definitions.insert(d.as_str()) {
                self.push(Duplicate, &synset.id, format!("definition {d:?} listed twice"));
            }
        }

        if synset.part_of_speech == PartOfSpeech::AdjectiveSatellite {
            let similar = synset.targets(SynsetRelType::Similar).count();
            if similar != 1 {
                self.push(
                    Structure,
                    &synset.id,
                    format!("satellite has {similar} similar relations, expected exactly one"),
                );
            }
        }
    }

    fn check_synset_relations(&mut self, synset: &Synset) {
        use ViolationKind::*;
        let mut seen = HashSet::new();
        for r in &synset.relations {
            if !seen.insert((r.target.as_str(), r.rel_type)) {
                self.push(
                    Duplicate,
                    &synset.id,
                    format!("relation {} to {} listed twice", r.rel_type, r.target),
                );
                continue;
            }
            if r.target == synset.id {
                self.push(Structure, &synset.id, format!("{} relation to itself", r.rel_type));
                continue;
            }
            let Some(target) = self.synsets.get(r.target.as_str()).copied() else {
                self.push_fix(
                    DanglingReference,
                    &synset.id,
                    format!("{} relation to missing synset {}", r.rel_type, r.target),
                    Some(Operation::DeleteRelation {
                        source: synset.id.clone(),
                        target: r.target.clone(),
                    }),
                );
                continue;
            };
            if let Some(inv) = r.rel_type.inverse()
                && !target
                    .relations
                    .iter()
                    .any(|back| back.target == synset.id && back.rel_type == inv)
            {
                self.push_fix(
                    Asymmetry,
                    &synset.id,
                    format!("{} relation to {} lacks its inverse {inv}", r.rel_type, r.target),
                    Some(Operation::AddRelation {
                        source: r.target.clone(),
                        rel_type: inv,
                        target: synset.id.clone(),
                    }),
                );
            }
        }
    }

    fn check_hypernyms(&mut self, synset: &'a Synset) {
        use ViolationKind::*;
        let hypernyms: Vec<&str> = synset.targets(SynsetRelType::Hypernym).collect();
        let instance_of = synset.targets(SynsetRelType::InstanceHypernym).count();

        if synset.part_of_speech == PartOfSpeech::Noun
            && hypernyms.is_empty()
            && instance_of == 0
            && !self.config.roots.contains(&synset.id)
        {
            self.push(Structure, &synset.id, "noun synset has no hypernym");
        }
        if !hypernyms.is_empty() && instance_of > 0 {
            self.push(Structure, &synset.id, "synset has both hypernym and instance hypernym");
        }
        for &h in &hypernyms {
            let Some(target) = self.synsets.get(h).copied() else {
                continue;
            };
            if !synset.part_of_speech.equal_pos(target.part_of_speech) {
                self.push(
                    Structure,
                    &synset.id,
                    format!("hypernym {h} has part of speech {}", target.part_of_speech),
                );
            }
            if target.targets(SynsetRelType::InstanceHypernym).next().is_some() {
                self.push(Structure, &synset.id, format!("hypernym {h} is an instance"));
            }
        }
        if hypernyms.len() > 1 {
            let direct: HashSet<&str> = hypernyms.iter().copied().collect();
            let mut reported = HashSet::new();
            for &h in &hypernyms {
                for ancestor in self.ancestors(h) {
                    if ancestor != h && direct.contains(ancestor) && reported.insert(ancestor) {
                        self.push_fix(
                            Structure,
                            &synset.id,
                            format!("hypernym {ancestor} is already implied through {h}"),
                            Some(Operation::DeleteRelation {
                                source: synset.id.clone(),
                                target: ancestor.to_string(),
                            }),
                        );
                    }
                }
            }
        }
    }

    /// Every synset reachable from `start` through hypernym links.
    fn ancestors(&self, start: &'a str) -> HashSet<&'a str> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([start]);
        while let Some(id) = queue.pop_front() {
            let Some(synset) = self.synsets.get(id).copied() else {
                continue;
            };
            for next in synset.targets(SynsetRelType::Hypernym) {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        seen
    }

    // -----------------------------------------------------------------------
    // Whole-lexicon checks
    // -----------------------------------------------------------------------

    fn check_collisions(&mut self) {
        let lexicon = self.lexicon;
        let ns = lexicon.namespace();
        let mut tokens: BTreeMap<String, Vec<&str>> = BTreeMap::new();
        for entry in &lexicon.entries {
            tokens
                .entry(entry_id(ns, &entry.lemma.written_form, entry.lemma.part_of_speech))
                .or_default()
                .push(&entry.lemma.written_form);
        }
        for (id, forms) in tokens {
            if forms.len() > 1 {
                self.push(
                    ViolationKind::Collision,
                    &id,
                    format!("{} lemmas escape to the same id: {forms:?}", forms.len()),
                );
            }
        }
    }

    fn check_global_duplicates(&mut self) {
        use ViolationKind::Duplicate;
        let lexicon = self.lexicon;

        let mut keys: HashMap<&str, &str> = HashMap::new();
        for sense in lexicon.entries.iter().flat_map(|e| &e.senses) {
            if let Some(key) = sense.key.as_deref()
                && let Some(first) = keys.insert(key, &sense.id)
            {
                self.push(Duplicate, &sense.id, format!("sense key {key} also used by {first}"));
            }
        }

        let mut ilis: HashMap<&str, &str> = HashMap::new();
        let mut definitions: HashMap<&str, &str> = HashMap::new();
        for synset in &lexicon.synsets {
            if !synset.ili.is_empty()
                && synset.ili != ILI_UNASSIGNED
                && let Some(first) = ilis.insert(&synset.ili, &synset.id)
            {
                self.push(
                    Duplicate,
                    &synset.id,
                    format!("ILI {} also used by {first}", synset.ili),
                );
            }
            for d in synset.definitions.iter().filter(|d| !d.trim().is_empty()) {
                match definitions.get(d.as_str()) {
                    Some(&first) if first != synset.id => self.push(
                        Duplicate,
                        &synset.id,
                        format!("definition {d:?} also used by {first}"),
                    ),
                    Some(_) => {}
                    None => {
                        definitions.insert(d, &synset.id);
                    }
                }
            }
        }
    }

    fn check_cycles(&mut self) {
        let lexicon = self.lexicon;
        let synset_edges = move |types: &'static [SynsetRelType]| {
            lexicon.synsets.iter().flat_map(move |s| {
                s.relations
                    .iter()
                    .filter(move |r| types.contains(&r.rel_type))
                    .map(move |r| (s.id.as_str(), r.target.as_str()))
            })
        };
        const TAXONOMY: &[SynsetRelType] = &[SynsetRelType::Hypernym, SynsetRelType::InstanceHypernym];
        const DOMAINS: &[SynsetRelType] = &[
            SynsetRelType::DomainTopic,
            SynsetRelType::DomainRegion,
            SynsetRelType::Exemplifies,
        ];
        const SENSE_DOMAINS: &[SenseRelType] = &[
            SenseRelType::DomainTopic,
            SenseRelType::DomainRegion,
            SenseRelType::Exemplifies,
        ];
        let sense_edges = lexicon.entries.iter().flat_map(|e| {
            e.senses.iter().flat_map(|s| {
                s.relations
                    .iter()
                    .filter(|r| SENSE_DOMAINS.contains(&r.rel_type))
                    .map(move |r| (s.id.as_str(), r.target.as_str()))
            })
        });

        let families = [
            ("hypernym", find_cycles(synset_edges(TAXONOMY))),
            ("domain", find_cycles(synset_edges(DOMAINS))),
            ("sense domain", find_cycles(sense_edges)),
        ];
        for (family, found) in families {
            for cycle in found {
                self.push(
                    ViolationKind::Cycle,
                    cycle.anchor(),
                    format!("{family} cycle through {}", cycle.members.join(", ")),
                );
            }
        }
    }
}
