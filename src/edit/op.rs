//! Edit operations as data.
//!
//! The validator's fix mode proposes these instead of applying them, and the
//! CLI prints them; [`Editor::apply`] executes one.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{SenseRelType, SynsetRelType};
use crate::store::LexiconStore;

use super::{EditResult, Editor, NewSynset};

/// One call into the relation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    AddRelation {
        source: String,
        rel_type: SynsetRelType,
        target: String,
    },
    DeleteRelation {
        source: String,
        target: String,
    },
    UpdateRelationType {
        source: String,
        target: String,
        rel_type: SynsetRelType,
    },
    UpdateRelationSource {
        source: String,
        target: String,
        new_source: String,
    },
    UpdateRelationTarget {
        source: String,
        target: String,
        new_target: String,
    },
    ReverseRelation {
        source: String,
        target: String,
    },
    AddSenseRelation {
        source: String,
        rel_type: SenseRelType,
        target: String,
    },
    DeleteSenseRelation {
        source: String,
        target: String,
    },
    UpdateSenseRelationType {
        source: String,
        target: String,
        rel_type: SenseRelType,
    },
    UpdateSenseRelationSource {
        source: String,
        target: String,
        new_source: String,
    },
    UpdateSenseRelationTarget {
        source: String,
        target: String,
        new_target: String,
    },
    ReverseSenseRelation {
        source: String,
        target: String,
    },
    AddSynset(NewSynset),
    DeleteSynset {
        synset: String,
    },
    AddEntry {
        synset: String,
        lemma: String,
        index: Option<usize>,
        n: Option<usize>,
    },
    DeleteEntry {
        synset: String,
        lemma: String,
    },
    MoveEntry {
        lemma: String,
        from: String,
        to: String,
    },
    ChangeDefinition {
        synset: String,
        definition: String,
    },
    AddExample {
        synset: String,
        text: String,
        source: Option<String>,
    },
    DeleteExample {
        synset: String,
        text: String,
    },
    SetIli {
        synset: String,
        ili: String,
    },
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Operation::*;
        match self {
            AddRelation {
                source,
                rel_type,
                target,
            } => write!(f, "add-relation {source} {rel_type} {target}"),
            DeleteRelation { source, target } => write!(f, "delete-relation {source} {target}"),
            UpdateRelationType {
                source,
                target,
                rel_type,
            } => write!(f, "update-relation-type {source} {target} {rel_type}"),
            UpdateRelationSource {
                source,
                target,
                new_source,
            } => write!(f, "update-relation-source {source} {target} {new_source}"),
            UpdateRelationTarget {
                source,
                target,
                new_target,
            } => write!(f, "update-relation-target {source} {target} {new_target}"),
            ReverseRelation { source, target } => write!(f, "reverse-relation {source} {target}"),
            AddSenseRelation {
                source,
                rel_type,
                target,
            } => write!(f, "add-sense-relation {source} {rel_type} {target}"),
            DeleteSenseRelation { source, target } => {
                write!(f, "delete-sense-relation {source} {target}")
            }
            UpdateSenseRelationType {
                source,
                target,
                rel_type,
            } => write!(f, "update-sense-relation-type {source} {target} {rel_type}"),
            UpdateSenseRelationSource {
                source,
                target,
                new_source,
            } => write!(f, "update-sense-relation-source {source} {target} {new_source}"),
            UpdateSenseRelationTarget {
                source,
                target,
                new_target,
            } => write!(f, "update-sense-relation-target {source} {target} {new_target}"),
            ReverseSenseRelation { source, target } => {
                write!(f, "reverse-sense-relation {source} {target}")
            }
            AddSynset(new) => write!(
                f,
                "add-synset {} {} {:?}",
                new.part_of_speech, new.lexfile, new.definition
            ),
            DeleteSynset { synset } => write!(f, "delete-synset {synset}"),
            AddEntry {
                synset,
                lemma,
                index,
                n,
            } => {
                write!(f, "add-entry {synset} {lemma:?}")?;
                if let Some(i) = index {
                    write!(f, " --index {i}")?;
                }
                if let Some(n) = n {
                    write!(f, " --n {n}")?;
                }
                Ok(())
            }
            DeleteEntry { synset, lemma } => write!(f, "delete-entry {synset} {lemma:?}"),
            MoveEntry { lemma, from, to } => write!(f, "move-entry {lemma:?} {from} {to}"),
            ChangeDefinition { synset, definition } => {
                write!(f, "change-definition {synset} {definition:?}")
            }
            AddExample { synset, text, .. } => write!(f, "add-example {synset} {text:?}"),
            DeleteExample { synset, text } => write!(f, "delete-example {synset} {text:?}"),
            SetIli { synset, ili } => write!(f, "set-ili {synset} {ili}"),
        }
    }
}

impl<S: LexiconStore> Editor<S> {
    /// Execute one operation.
    pub fn apply(&mut self, op: &Operation) -> EditResult<()> {
        use Operation::*;
        tracing::debug!(op = %op, "apply");
        match op {
            AddRelation {
                source,
                rel_type,
                target,
            } => self.add_relation(source, *rel_type, target).map(drop),
            DeleteRelation { source, target } => self.delete_relation(source, target),
            UpdateRelationType {
                source,
                target,
                rel_type,
            } => self.update_relation_type(source, target, *rel_type),
            UpdateRelationSource {
                source,
                target,
                new_source,
            } => self.update_relation_source(source, target, new_source),
            UpdateRelationTarget {
                source,
                target,
                new_target,
            } => self.update_relation_target(source, target, new_target),
            ReverseRelation { source, target } => self.reverse_relation(source, target),
            AddSenseRelation {
                source,
                rel_type,
                target,
            } => self.add_sense_relation(source, *rel_type, target).map(drop),
            DeleteSenseRelation { source, target } => self.delete_sense_relation(source, target),
            UpdateSenseRelationType {
                source,
                target,
                rel_type,
            } => self.update_sense_relation_type(source, target, *rel_type),
            UpdateSenseRelationSource {
                source,
                target,
                new_source,
            } => self.update_sense_relation_source(source, target, new_source),
            UpdateSenseRelationTarget {
                source,
                target,
                new_target,
            } => self.update_sense_relation_target(source, target, new_target),
            ReverseSenseRelation { source, target } => self.reverse_sense_relation(source, target),
            AddSynset(new) => self.add_synset(new.clone()).map(drop),
            DeleteSynset { synset } => self.delete_synset(synset),
            AddEntry {
                synset,
                lemma,
                index,
                n,
            } => self.add_entry(synset, lemma, *index, *n).map(drop),
            DeleteEntry { synset, lemma } => self.delete_entry(synset, lemma),
            MoveEntry { lemma, from, to } => self.move_entry(lemma, from, to).map(drop),
            ChangeDefinition { synset, definition } => self.change_definition(synset, definition),
            AddExample {
                synset,
                text,
                source,
            } => self.add_example(synset, text, source.as_deref()),
            DeleteExample { synset, text } => self.delete_example(synset, text),
            SetIli { synset, ili } => self.set_ili(synset, ili),
        }
    }

    /// Execute operations in order, stopping at the first failure.
    pub fn apply_all<'a>(&mut self, ops: impl IntoIterator<Item = &'a Operation>) -> EditResult<usize> {
        let mut applied = 0;
        for op in ops {
            self.apply(op)?;
            applied += 1;
        }
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::EditConfig;
    use crate::model::{Lexicon, LexiconHeader, PartOfSpeech};
    use crate::store::mem::MemStore;

    #[test]
    fn operations_serialize_with_wn_names() {
        let op = Operation::AddRelation {
            source: "oewn-00000001-n".into(),
            rel_type: SynsetRelType::InstanceHypernym,
            target: "oewn-00000002-n".into(),
        };
        let json = serde_json::to_string(&op).unwrap();
        assert!(json.contains(r#""op":"add_relation""#));
        assert!(json.contains(r#""rel_type":"instance_hypernym""#));
        let back: Operation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, op);
        assert_eq!(
            op.to_string(),
            "add-relation oewn-00000001-n instance_hypernym oewn-00000002-n"
        );
    }

    #[test]
    fn apply_runs_a_script() {
        let mut ed = Editor::new(
            MemStore::new(Lexicon::new(LexiconHeader::new("oewn"))),
            EditConfig::default(),
        );
        let a = ed
            .add_synset(NewSynset::new("a small dog", PartOfSpeech::Noun, "noun.animal"))
            .unwrap();
        let b = ed
            .add_synset(NewSynset::new("a dog", PartOfSpeech::Noun, "noun.animal"))
            .unwrap();
        let script = vec![
            Operation::AddEntry {
                synset: a.clone(),
                lemma: "puppy".into(),
                index: None,
                n: None,
            },
            Operation::AddRelation {
                source: a.clone(),
                rel_type: SynsetRelType::Hypernym,
                target: b.clone(),
            },
            Operation::ReverseRelation {
                source: a.clone(),
                target: b.clone(),
            },
        ];
        assert_eq!(ed.apply_all(&script).unwrap(), 3);
        let b_synset = ed.store().synset_by_id(&b).unwrap().unwrap();
        assert_eq!(b_synset.relations[0].target, a);
        assert_eq!(b_synset.relations[0].rel_type, SynsetRelType::Hypernym);
    }
}
