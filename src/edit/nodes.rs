//! Node operations: synsets, entries and synset text fields.
//!
//! Deletions cascade: relations touching the node are removed with
//! [`Editor::delete_pair`] first, so their mirrors go too. Member lists and
//! sense ordinals are re-packed afterwards, and sense ids whose member index
//! changed are renamed in place together with every relation pointing at them.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::EditError;
use crate::ident::{self, compute_sense_key, lexfile_number, new_synset_id};
use crate::model::{Comments, Example, LexicalEntry, PartOfSpeech, Sense, Synset};
use crate::store::LexiconStore;

use super::{EditResult, Editor, Layer, SenseLayer, SynsetLayer};

/// Everything needed to create a synset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSynset {
    pub definition: String,
    pub part_of_speech: PartOfSpeech,
    pub lexfile: String,
    #[serde(default)]
    pub ili: Option<String>,
    #[serde(default)]
    pub examples: Vec<Example>,
    #[serde(default)]
    pub source: Option<String>,
}

impl NewSynset {
    pub fn new(definition: impl Into<String>, pos: PartOfSpeech, lexfile: impl Into<String>) -> Self {
        Self {
            definition: definition.into(),
            part_of_speech: pos,
            lexfile: lexfile.into(),
            ili: None,
            examples: Vec::new(),
            source: None,
        }
    }
}

impl<S: LexiconStore> Editor<S> {
    fn load_synset(&self, id: &str) -> EditResult<Synset> {
        Ok(self
            .store
            .synset_by_id(id)?
            .ok_or_else(|| EditError::UnknownSynset { id: id.to_string() })?
            .into_owned())
    }

    /// Member entry of `synset` whose written form is `lemma`.
    fn member_entry(&self, synset: &Synset, lemma: &str) -> EditResult<LexicalEntry> {
        for member in &synset.members {
            if let Some(entry) = self.store.entry_by_id(member)?
                && entry.lemma.written_form == lemma
            {
                return Ok(entry.into_owned());
            }
        }
        Err(EditError::NotAMember {
            lemma: lemma.to_string(),
            synset: synset.id.clone(),
        })
    }

    // -----------------------------------------------------------------------
    // Synsets
    // -----------------------------------------------------------------------

    /// Create a synset with a hash-derived id. It has no members until
    /// [`Editor::add_entry`] is called.
    pub fn add_synset(&mut self, new: NewSynset) -> EditResult<String> {
        if new.definition.trim().is_empty() {
            return Err(EditError::EmptyDefinition);
        }
        lexfile_number(&new.lexfile)?;
        let id = new_synset_id(
            &self.store,
            &self.config.namespace,
            new.part_of_speech,
            &new.definition,
        )?;
        let mut synset = Synset::new(id.clone(), new.part_of_speech, new.lexfile);
        synset.definitions.push(new.definition);
        if let Some(ili) = new.ili {
            synset.ili = ili;
        }
        synset.examples = new.examples;
        synset.source = new.source;
        self.store.add_synset(synset)?;
        tracing::info!(synset = %id, "added synset");
        Ok(id)
    }

    /// Delete a synset with every relation touching it and every sense
    /// pointing at it.
    pub fn delete_synset(&mut self, id: &str) -> EditResult<()> {
        let synset = self.load_synset(id)?;

        let mut neighbours: BTreeSet<String> =
            synset.relations.iter().map(|r| r.target.clone()).collect();
        neighbours.extend(self.store.synset_referrers(id)?);
        for other in &neighbours {
            self.delete_pair::<SynsetLayer>(id, other)?;
        }

        let synset = self.load_synset(id)?;
        for member in synset.members.iter().rev() {
            let Some(entry) = self.store.entry_by_id(member)? else {
                continue;
            };
            let lemma = entry.lemma.written_form.clone();
            self.delete_entry(id, &lemma)?;
        }
        self.store.del_synset(id)?;
        self.store.edit_comments(&mut |c: &mut Comments| c.forget(id))?;
        tracing::info!(synset = %id, relations = neighbours.len(), "deleted synset");
        Ok(())
    }

    pub fn change_definition(&mut self, id: &str, definition: &str) -> EditResult<()> {
        if definition.trim().is_empty() {
            return Err(EditError::EmptyDefinition);
        }
        let mut synset = self.load_synset(id)?;
        match synset.definitions.first_mut() {
            Some(first) => *first = definition.to_string(),
            None => synset.definitions.push(definition.to_string()),
        }
        self.store.add_synset(synset)?;
        tracing::debug!(synset = %id, "definition changed");
        Ok(())
    }

    pub fn add_example(&mut self, id: &str, text: &str, source: Option<&str>) -> EditResult<()> {
        let mut synset = self.load_synset(id)?;
        synset.examples.push(Example {
            text: text.to_string(),
            source: source.map(str::to_string),
        });
        self.store.add_synset(synset)?;
        Ok(())
    }

    pub fn delete_example(&mut self, id: &str, text: &str) -> EditResult<()> {
        let mut synset = self.load_synset(id)?;
        let before = synset.examples.len();
        synset.examples.retain(|e| e.text != text);
        if synset.examples.len() == before {
            return Err(EditError::UnknownExample {
                synset: id.to_string(),
                text: text.to_string(),
            });
        }
        self.store.add_synset(synset)?;
        Ok(())
    }

    pub fn set_ili(&mut self, id: &str, ili: &str) -> EditResult<()> {
        let mut synset = self.load_synset(id)?;
        synset.ili = ili.to_string();
        self.store.add_synset(synset)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Entries
    // -----------------------------------------------------------------------

    /// Add `lemma` to `synset`, at member position `index` and sense ordinal
    /// `n` (both default to the end). The entry is created when needed and
    /// the new sense gets a computed key. Returns the new sense id.
    pub fn add_entry(
        &mut self,
        synset_id: &str,
        lemma: &str,
        index: Option<usize>,
        n: Option<usize>,
    ) -> EditResult<String> {
        let mut synset = self.load_synset(synset_id)?;
        let pos = synset.part_of_speech;
        let entry_id = ident::entry_id(&self.config.namespace, lemma, pos);
        let mut entry = match self.store.entry_by_id(&entry_id)? {
            Some(e) => e.into_owned(),
            None => LexicalEntry::new(entry_id.clone(), lemma, pos),
        };
        if synset.members.contains(&entry_id) || entry.sense_for_synset(synset_id).is_some() {
            return Err(EditError::AlreadyMember {
                lemma: lemma.to_string(),
                synset: synset_id.to_string(),
            });
        }
        let index = index.unwrap_or(synset.members.len());
        if index > synset.members.len() {
            return Err(EditError::IndexOutOfRange {
                what: "member",
                index,
                max: synset.members.len(),
            });
        }
        let n = n.unwrap_or(entry.senses.len());
        if n > entry.senses.len() {
            return Err(EditError::IndexOutOfRange {
                what: "sense",
                index: n,
                max: entry.senses.len(),
            });
        }

        let sense_id = ident::sense_id(lemma, synset_id, index + 1)?;
        for sense in entry.senses.iter_mut().filter(|s| s.n >= n) {
            sense.n += 1;
        }
        entry.senses.push(Sense::new(sense_id.clone(), synset_id, n));
        entry.repack();
        let key = {
            let sense = entry
                .sense(&sense_id)
                .ok_or_else(|| EditError::UnknownSense { id: sense_id.clone() })?;
            compute_sense_key(&self.store, &entry, sense)?
        };
        if let Some(sense) = entry.sense_mut(&sense_id) {
            sense.key = Some(key.to_string());
        }

        synset.members.insert(index, entry_id.clone());
        self.store.add_entry(entry)?;
        self.store.add_synset(synset)?;
        self.renumber_members(synset_id)?;
        tracing::info!(synset = %synset_id, lemma = %lemma, sense = %sense_id, key = %key, "added entry");
        Ok(sense_id)
    }

    /// Remove `lemma` from `synset`: its sense relations go first, then the
    /// sense; the entry goes when it has no senses left.
    pub fn delete_entry(&mut self, synset_id: &str, lemma: &str) -> EditResult<()> {
        let synset = self.load_synset(synset_id)?;
        let entry = self.member_entry(&synset, lemma)?;
        let sense = entry
            .sense_for_synset(synset_id)
            .ok_or_else(|| EditError::NotAMember {
                lemma: lemma.to_string(),
                synset: synset_id.to_string(),
            })?
            .clone();

        let mut neighbours: BTreeSet<String> =
            sense.relations.iter().map(|r| r.target.clone()).collect();
        neighbours.extend(self.store.sense_referrers(&sense.id)?);
        neighbours.remove(&sense.id);
        for other in &neighbours {
            self.delete_pair::<SenseLayer>(&sense.id, other)?;
        }

        let mut entry = self
            .store
            .entry_by_id(&entry.id)?
            .ok_or_else(|| EditError::UnknownSense { id: sense.id.clone() })?
            .into_owned();
        entry.senses.retain(|s| s.id != sense.id);
        self.store.edit_comments(&mut |c: &mut Comments| c.forget(&sense.id))?;
        if entry.senses.is_empty() {
            self.store.del_entry(&entry.id)?;
            self.store.edit_comments(&mut |c: &mut Comments| c.forget(&entry.id))?;
            tracing::info!(entry = %entry.id, "deleted entry with its last sense");
        } else {
            entry.repack();
            self.store.add_entry(entry.clone())?;
        }

        let mut synset = self.load_synset(synset_id)?;
        synset.members.retain(|m| *m != entry.id);
        self.store.add_synset(synset)?;
        self.renumber_members(synset_id)?;
        tracing::info!(synset = %synset_id, lemma = %lemma, sense = %sense.id, "deleted entry");
        Ok(())
    }

    /// Move `lemma` from one synset to another, keeping its ordinal. The key
    /// is recomputed for the new synset.
    pub fn move_entry(&mut self, lemma: &str, from: &str, to: &str) -> EditResult<String> {
        let source = self.load_synset(from)?;
        let target = self.load_synset(to)?;
        let entry = self.member_entry(&source, lemma)?;
        let n = entry.sense_for_synset(from).map(|s| s.n);
        if target.members.contains(&entry.id) {
            return Err(EditError::AlreadyMember {
                lemma: lemma.to_string(),
                synset: to.to_string(),
            });
        }
        self.delete_entry(from, lemma)?;
        let remaining = match self.store.entry_by_id(&ident::entry_id(
            &self.config.namespace,
            lemma,
            target.part_of_speech,
        ))? {
            Some(e) => e.senses.len(),
            None => 0,
        };
        let n = n.map(|n| n.min(remaining));
        self.add_entry(to, lemma, None, n)
    }

    /// Make every member's sense id carry its 1-based member position,
    /// renaming senses and rewriting relations that point at renamed ids.
    fn renumber_members(&mut self, synset_id: &str) -> EditResult<()> {
        let synset = self.load_synset(synset_id)?;
        for (position, member) in synset.members.iter().enumerate() {
            let Some(entry) = self.store.entry_by_id(member)? else {
                continue;
            };
            let Some(sense) = entry.sense_for_synset(synset_id) else {
                continue;
            };
            let wanted = ident::with_sense_index(&sense.id, position + 1);
            if wanted != sense.id {
                let old = sense.id.clone();
                self.rename_sense(&old, &wanted)?;
            }
        }
        Ok(())
    }

    fn rename_sense(&mut self, old: &str, new: &str) -> EditResult<()> {
        let referrers = self.store.sense_referrers(old)?;
        let unknown = || EditError::UnknownSense { id: old.to_string() };
        let owner = self.store.sense_owner(old)?.ok_or_else(unknown)?;
        let mut entry = self
            .store
            .entry_by_id(&owner)?
            .ok_or_else(unknown)?
            .into_owned();
        if let Some(sense) = entry.sense_mut(old) {
            sense.id = new.to_string();
        }
        self.store.add_entry(entry)?;

        for referrer in referrers {
            let referrer = if referrer == old { new.to_string() } else { referrer };
            let Some(mut edges) = <SenseLayer as Layer<S>>::edges(&self.store, &referrer)? else {
                continue;
            };
            for edge in edges.iter_mut().filter(|e| e.target == old) {
                edge.target = new.to_string();
            }
            <SenseLayer as Layer<S>>::set_edges(&mut self.store, &referrer, edges)?;
        }
        self.store.edit_comments(&mut |c: &mut Comments| c.rename(old, new))?;
        tracing::debug!(old = %old, new = %new, "renamed sense");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::EditConfig;
    use crate::model::{Lexicon, LexiconHeader, SenseRelType, SynsetRelType};
    use crate::store::mem::MemStore;

    fn editor() -> Editor<MemStore> {
        Editor::new(
            MemStore::new(Lexicon::new(LexiconHeader::new("oewn"))),
            EditConfig::default(),
        )
    }

    fn noun(ed: &mut Editor<MemStore>, definition: &str) -> String {
        ed.add_synset(NewSynset::new(definition, PartOfSpeech::Noun, "noun.animal"))
            .unwrap()
    }

    #[test]
    fn add_entry_assigns_id_and_key() {
        let mut ed = editor();
        let s1 = noun(&mut ed, "a domesticated carnivore");
        let sense = ed.add_entry(&s1, "dog", Some(0), None).unwrap();
        let number = &s1[5..13];
        assert_eq!(sense, format!("oewn-dog-n-{number}-01"));
        let stored = ed.store().sense_by_id(&sense).unwrap().unwrap();
        assert_eq!(stored.key.as_deref(), Some("dog%1:05:01::"));
        assert_eq!(ed.store().members_by_id(&s1).unwrap(), vec!["dog"]);
    }

    #[test]
    fn inserting_a_member_renumbers_followers() {
        let mut ed = editor();
        let s1 = noun(&mut ed, "a domesticated carnivore");
        let dog = ed.add_entry(&s1, "dog", None, None).unwrap();
        let cur = ed.add_entry(&s1, "cur", None, None).unwrap();
        ed.add_sense_relation(&cur, SenseRelType::Also, &dog).unwrap();

        let hound = ed.add_entry(&s1, "hound", Some(0), None).unwrap();
        assert!(hound.ends_with("-01"));
        assert_eq!(ed.store().members_by_id(&s1).unwrap(), vec!["hound", "dog", "cur"]);

        let new_dog = dog.replace("-01", "-02");
        let new_cur = cur.replace("-02", "-03");
        assert!(ed.store().sense_by_id(&dog).unwrap().is_none());
        let cur_sense = ed.store().sense_by_id(&new_cur).unwrap().unwrap();
        assert_eq!(cur_sense.relations[0].target, new_dog);
        let dog_sense = ed.store().sense_by_id(&new_dog).unwrap().unwrap();
        assert_eq!(dog_sense.relations[0].target, new_cur);
    }

    #[test]
    fn ordinals_stay_dense() {
        let mut ed = editor();
        let s1 = noun(&mut ed, "first meaning");
        let s2 = noun(&mut ed, "second meaning");
        let s3 = noun(&mut ed, "third meaning");
        ed.add_entry(&s1, "bank", None, None).unwrap();
        ed.add_entry(&s2, "bank", None, None).unwrap();
        ed.add_entry(&s3, "bank", None, Some(0)).unwrap();
        let entry = ed.store().entry_by_id("oewn-bank-n").unwrap().unwrap();
        let order: Vec<&str> = entry.senses.iter().map(|s| s.synset.as_str()).collect();
        assert_eq!(order, vec![s3.as_str(), s1.as_str(), s2.as_str()]);

        ed.delete_entry(&s1, "bank").unwrap();
        let entry = ed.store().entry_by_id("oewn-bank-n").unwrap().unwrap();
        let ns: Vec<usize> = entry.senses.iter().map(|s| s.n).collect();
        assert_eq!(ns, vec![0, 1]);
    }

    #[test]
    fn delete_synset_cascades() {
        let mut ed = editor();
        let dog = noun(&mut ed, "a domesticated carnivore");
        let mammal = noun(&mut ed, "any mammal");
        ed.add_entry(&dog, "dog", None, None).unwrap();
        ed.add_relation(&dog, SynsetRelType::Hypernym, &mammal).unwrap();

        ed.delete_synset(&dog).unwrap();
        assert!(ed.store().synset_by_id(&dog).unwrap().is_none());
        assert!(ed.store().entry_by_id("oewn-dog-n").unwrap().is_none());
        let mammal = ed.store().synset_by_id(&mammal).unwrap().unwrap();
        assert!(mammal.relations.is_empty());
    }

    #[test]
    fn deleted_nodes_take_their_comments() {
        use crate::model::{CommentAnchor, SynsetRelation};

        let mut ed = editor();
        let dog = noun(&mut ed, "a domesticated carnivore");
        let mammal = noun(&mut ed, "any mammal");
        let sense = ed.add_entry(&dog, "dog", None, None).unwrap();
        ed.add_relation(&dog, SynsetRelType::Hypernym, &mammal).unwrap();
        let hypernym = SynsetRelation::new(mammal.clone(), SynsetRelType::Hypernym);
        let comments = ed.store_mut().comments_mut();
        comments.add(CommentAnchor::Node(dog.clone()), "about the synset");
        comments.add(CommentAnchor::Node(sense.clone()), "about the sense");
        comments.add(CommentAnchor::Node("oewn-dog-n".into()), "about the entry");
        comments.add(CommentAnchor::synset_relation(&dog, &hypernym), "about the link");
        comments.add(CommentAnchor::Node(mammal.clone()), "stays");

        ed.delete_synset(&dog).unwrap();
        let comments = &ed.store().lexicon().comments;
        assert_eq!(comments.len(), 1);
        assert_eq!(comments.node(&mammal), ["stays".to_string()]);
    }

    #[test]
    fn renumbered_senses_keep_their_comments() {
        use crate::model::{CommentAnchor, SenseRelation};

        let mut ed = editor();
        let s1 = noun(&mut ed, "a domesticated carnivore");
        let dog = ed.add_entry(&s1, "dog", None, None).unwrap();
        let cur = ed.add_entry(&s1, "cur", None, None).unwrap();
        ed.add_sense_relation(&cur, SenseRelType::Also, &dog).unwrap();
        let also = SenseRelation::new(dog.clone(), SenseRelType::Also);
        let comments = ed.store_mut().comments_mut();
        comments.add(CommentAnchor::Node(cur.clone()), "a cur");
        comments.add(CommentAnchor::sense_relation(&cur, &also), "seen also");

        ed.add_entry(&s1, "hound", Some(0), None).unwrap();
        let new_dog = dog.replace("-01", "-02");
        let new_cur = cur.replace("-02", "-03");
        let comments = &ed.store().lexicon().comments;
        assert!(comments.node(&cur).is_empty());
        assert_eq!(comments.node(&new_cur), ["a cur".to_string()]);
        assert_eq!(comments.relation(&new_cur, &new_dog), ["seen also"]);
        assert_eq!(comments.len(), 2);
    }

    #[test]
    fn move_entry_recomputes_key() {
        let mut ed = editor();
        let a = noun(&mut ed, "a domesticated carnivore");
        let b = ed
            .add_synset(NewSynset::new("a person", PartOfSpeech::Noun, "noun.person"))
            .unwrap();
        ed.add_entry(&a, "dog", None, None).unwrap();
        let moved = ed.move_entry("dog", &a, &b).unwrap();
        let sense = ed.store().sense_by_id(&moved).unwrap().unwrap();
        assert_eq!(sense.key.as_deref(), Some("dog%1:18:01::"));
        assert!(ed.store().members_by_id(&a).unwrap().is_empty());
    }

    #[test]
    fn text_fields() {
        let mut ed = editor();
        let s = noun(&mut ed, "old text");
        ed.change_definition(&s, "new text").unwrap();
        ed.add_example(&s, "the dog barked", None).unwrap();
        ed.set_ili(&s, "i12345").unwrap();
        let synset = ed.store().synset_by_id(&s).unwrap().unwrap().into_owned();
        assert_eq!(synset.definitions, vec!["new text"]);
        assert_eq!(synset.ili, "i12345");
        ed.delete_example(&s, "the dog barked").unwrap();
        assert!(matches!(
            ed.delete_example(&s, "the dog barked"),
            Err(EditError::UnknownExample { .. })
        ));
        assert!(matches!(
            ed.change_definition(&s, "  "),
            Err(EditError::EmptyDefinition)
        ));
    }

    #[test]
    fn unknown_lexfile_is_rejected() {
        let mut ed = editor();
        let err = ed
            .add_synset(NewSynset::new("x", PartOfSpeech::Noun, "noun.unicorn"))
            .unwrap_err();
        assert!(matches!(err, EditError::Key(_)));
    }
}
