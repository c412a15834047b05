//! In-memory lexicon store.
//!
//! Owns a [`Lexicon`] and keeps hash indices over it consistent on every
//! mutation: node positions, sense owners, lemma lookups and reverse relation
//! indices for both layers. Entries and synsets keep their document order, and
//! member lists are never re-sorted.

use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap};

use crate::model::{Comments, LexicalEntry, Lexicon, LexiconHeader, Synset};

use super::{LexiconStore, StoreResult};

/// The whole lexicon in memory with lookup indices.
#[derive(Debug, Clone)]
pub struct MemStore {
    lexicon: Lexicon,
    entry_pos: HashMap<String, usize>,
    synset_pos: HashMap<String, usize>,
    sense_owner: HashMap<String, String>,
    lemma_entries: HashMap<String, BTreeSet<String>>,
    synset_referrers: HashMap<String, BTreeSet<String>>,
    sense_referrers: HashMap<String, BTreeSet<String>>,
}

impl MemStore {
    /// Take ownership of a lexicon and index it.
    pub fn new(lexicon: Lexicon) -> Self {
        let mut store = Self {
            lexicon,
            entry_pos: HashMap::new(),
            synset_pos: HashMap::new(),
            sense_owner: HashMap::new(),
            lemma_entries: HashMap::new(),
            synset_referrers: HashMap::new(),
            sense_referrers: HashMap::new(),
        };
        store.reindex();
        store
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn into_lexicon(self) -> Lexicon {
        self.lexicon
    }

    /// Comments are not indexed, so they may be edited freely.
    pub fn comments_mut(&mut self) -> &mut Comments {
        &mut self.lexicon.comments
    }

    pub fn entry_count(&self) -> usize {
        self.lexicon.entries.len()
    }

    pub fn synset_count(&self) -> usize {
        self.lexicon.synsets.len()
    }

    fn reindex(&mut self) {
        self.entry_pos.clear();
        self.synset_pos.clear();
        self.sense_owner.clear();
        self.lemma_entries.clear();
        self.synset_referrers.clear();
        self.sense_referrers.clear();

        let entries = std::mem::take(&mut self.lexicon.entries);
        for (i, entry) in entries.iter().enumerate() {
            self.entry_pos.insert(entry.id.clone(), i);
            self.index_entry(entry);
        }
        self.lexicon.entries = entries;

        let synsets = std::mem::take(&mut self.lexicon.synsets);
        for (i, synset) in synsets.iter().enumerate() {
            self.synset_pos.insert(synset.id.clone(), i);
            self.index_synset(synset);
        }
        self.lexicon.synsets = synsets;

        tracing::debug!(
            entries = self.entry_pos.len(),
            synsets = self.synset_pos.len(),
            senses = self.sense_owner.len(),
            "indexed in-memory lexicon"
        );
    }

    fn index_entry(&mut self, entry: &LexicalEntry) {
        self.lemma_entries
            .entry(entry.lemma.written_form.clone())
            .or_default()
            .insert(entry.id.clone());
        for sense in &entry.senses {
            self.sense_owner.insert(sense.id.clone(), entry.id.clone());
            for rel in &sense.relations {
                self.sense_referrers
                    .entry(rel.target.clone())
                    .or_default()
                    .insert(sense.id.clone());
            }
        }
    }

    fn unindex_entry(&mut self, entry: &LexicalEntry) {
        if let Some(ids) = self.lemma_entries.get_mut(&entry.lemma.written_form) {
            ids.remove(&entry.id);
            if ids.is_empty() {
                self.lemma_entries.remove(&entry.lemma.written_form);
            }
        }
        for sense in &entry.senses {
            self.sense_owner.remove(&sense.id);
            for rel in &sense.relations {
                remove_referrer(&mut self.sense_referrers, &rel.target, &sense.id);
            }
        }
    }

    fn index_synset(&mut self, synset: &Synset) {
        for rel in &synset.relations {
            self.synset_referrers
                .entry(rel.target.clone())
                .or_default()
                .insert(synset.id.clone());
        }
    }

    fn unindex_synset(&mut self, synset: &Synset) {
        for rel in &synset.relations {
            remove_referrer(&mut self.synset_referrers, &rel.target, &synset.id);
        }
    }
}

fn remove_referrer(index: &mut HashMap<String, BTreeSet<String>>, target: &str, source: &str) {
    if let Some(set) = index.get_mut(target) {
        set.remove(source);
        if set.is_empty() {
            index.remove(target);
        }
    }
}

/// Remove `vec[idx]` and shift the recorded positions of everything after it.
fn remove_at<T>(vec: &mut Vec<T>, pos: &mut HashMap<String, usize>, idx: usize, id: impl Fn(&T) -> &str) -> T {
    let removed = vec.remove(idx);
    for item in &vec[idx..] {
        if let Some(p) = pos.get_mut(id(item)) {
            *p -= 1;
        }
    }
    removed
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new(Lexicon::new(LexiconHeader::new("oewn")))
    }
}

impl LexiconStore for MemStore {
    fn header(&self) -> StoreResult<Cow<'_, LexiconHeader>> {
        Ok(Cow::Borrowed(&self.lexicon.header))
    }

    fn entry_by_id(&self, id: &str) -> StoreResult<Option<Cow<'_, LexicalEntry>>> {
        Ok(self
            .entry_pos
            .get(id)
            .map(|&i| Cow::Borrowed(&self.lexicon.entries[i])))
    }

    fn synset_by_id(&self, id: &str) -> StoreResult<Option<Cow<'_, Synset>>> {
        Ok(self
            .synset_pos
            .get(id)
            .map(|&i| Cow::Borrowed(&self.lexicon.synsets[i])))
    }

    fn sense_owner(&self, sense_id: &str) -> StoreResult<Option<String>> {
        Ok(self.sense_owner.get(sense_id).cloned())
    }

    fn entry_by_lemma(&self, lemma: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .lemma_entries
            .get(lemma)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn synset_referrers(&self, target: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .synset_referrers
            .get(target)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn sense_referrers(&self, target: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .sense_referrers
            .get(target)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn entry_ids(&self) -> StoreResult<Vec<String>> {
        Ok(self.lexicon.entries.iter().map(|e| e.id.clone()).collect())
    }

    fn synset_ids(&self) -> StoreResult<Vec<String>> {
        Ok(self.lexicon.synsets.iter().map(|s| s.id.clone()).collect())
    }

    fn add_entry(&mut self, entry: LexicalEntry) -> StoreResult<()> {
        match self.entry_pos.get(&entry.id).copied() {
            Some(i) => {
                let old = std::mem::replace(&mut self.lexicon.entries[i], entry);
                self.unindex_entry(&old);
                let new = self.lexicon.entries[i].clone();
                self.index_entry(&new);
            }
            None => {
                self.index_entry(&entry);
                self.entry_pos
                    .insert(entry.id.clone(), self.lexicon.entries.len());
                self.lexicon.entries.push(entry);
            }
        }
        Ok(())
    }

    fn edit_comments(&mut self, edit: &mut dyn FnMut(&mut Comments)) -> StoreResult<()> {
        edit(&mut self.lexicon.comments);
        Ok(())
    }

    fn del_entry(&mut self, id: &str) -> StoreResult<()> {
        let Some(i) = self.entry_pos.remove(id) else {
            return Ok(());
        };
        let old = remove_at(&mut self.lexicon.entries, &mut self.entry_pos, i, |e| &e.id);
        self.unindex_entry(&old);
        Ok(())
    }

    fn add_synset(&mut self, synset: Synset) -> StoreResult<()> {
        match self.synset_pos.get(&synset.id).copied() {
            Some(i) => {
                let old = std::mem::replace(&mut self.lexicon.synsets[i], synset);
                self.unindex_synset(&old);
                let new = self.lexicon.synsets[i].clone();
                self.index_synset(&new);
            }
            None => {
                self.index_synset(&synset);
                self.synset_pos
                    .insert(synset.id.clone(), self.lexicon.synsets.len());
                self.lexicon.synsets.push(synset);
            }
        }
        Ok(())
    }

    fn del_synset(&mut self, id: &str) -> StoreResult<()> {
        let Some(i) = self.synset_pos.remove(id) else {
            return Ok(());
        };
        let old = remove_at(&mut self.lexicon.synsets, &mut self.synset_pos, i, |s| &s.id);
        self.unindex_synset(&old);
        Ok(())
    }
}
