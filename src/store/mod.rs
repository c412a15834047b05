//! Graph storage for lexnet.
//!
//! Two backends implement one contract, [`LexiconStore`]:
//!
//! - [`MemStore`] — the whole lexicon in memory with hash indices
//! - [`DurableStore`] — entries and synsets as blobs in redb, with a bounded
//!   write-back buffer
//!
//! [`SnapshotCache`] avoids re-parsing sources for the in-memory backend.
//!
//! [`MemStore`]: mem::MemStore
//! [`DurableStore`]: durable::DurableStore
//! [`SnapshotCache`]: snapshot::SnapshotCache

pub mod durable;
pub mod mem;
pub mod snapshot;

use std::borrow::Cow;

use crate::error::StoreError;
use crate::model::{Comments, LexicalEntry, Lexicon, LexiconHeader, Sense, Synset};

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Query and mutation contract shared by every backend.
///
/// Reads return [`Cow`] so the in-memory backend can lend borrows while the
/// disk backend hands out owned, deserialized values. Mutations replace whole
/// nodes; keeping relations symmetric is the caller's job.
pub trait LexiconStore {
    fn header(&self) -> StoreResult<Cow<'_, LexiconHeader>>;

    fn entry_by_id(&self, id: &str) -> StoreResult<Option<Cow<'_, LexicalEntry>>>;

    fn synset_by_id(&self, id: &str) -> StoreResult<Option<Cow<'_, Synset>>>;

    /// Id of the entry owning a sense.
    fn sense_owner(&self, sense_id: &str) -> StoreResult<Option<String>>;

    /// Ids of the entries whose written form is exactly `lemma`, sorted.
    fn entry_by_lemma(&self, lemma: &str) -> StoreResult<Vec<String>>;

    /// Synsets holding a relation that targets `target`, sorted.
    fn synset_referrers(&self, target: &str) -> StoreResult<Vec<String>>;

    /// Senses holding a relation that targets `target`, sorted.
    fn sense_referrers(&self, target: &str) -> StoreResult<Vec<String>>;

    /// Entry ids in document order: first insertion decides the position,
    /// replacement keeps it.
    fn entry_ids(&self) -> StoreResult<Vec<String>>;

    /// Synset ids in document order, like [`LexiconStore::entry_ids`].
    fn synset_ids(&self) -> StoreResult<Vec<String>>;

    /// Insert or replace an entry.
    fn add_entry(&mut self, entry: LexicalEntry) -> StoreResult<()>;

    fn del_entry(&mut self, id: &str) -> StoreResult<()>;

    /// Insert or replace a synset.
    fn add_synset(&mut self, synset: Synset) -> StoreResult<()>;

    fn del_synset(&mut self, id: &str) -> StoreResult<()>;

    /// Run `edit` against the comment side table.
    fn edit_comments(&mut self, edit: &mut dyn FnMut(&mut Comments)) -> StoreResult<()>;

    /// Make pending writes visible to every reader.
    fn flush(&mut self) -> StoreResult<()> {
        Ok(())
    }

    fn sense_by_id(&self, id: &str) -> StoreResult<Option<Cow<'_, Sense>>> {
        let Some(owner) = self.sense_owner(id)? else {
            return Ok(None);
        };
        Ok(match self.entry_by_id(&owner)? {
            Some(Cow::Borrowed(entry)) => entry.sense(id).map(Cow::Borrowed),
            Some(Cow::Owned(entry)) => entry.sense(id).cloned().map(Cow::Owned),
            None => None,
        })
    }

    /// Written forms of a synset's members, in member order.
    fn members_by_id(&self, synset: &str) -> StoreResult<Vec<String>> {
        let Some(synset) = self.synset_by_id(synset)? else {
            return Ok(Vec::new());
        };
        let mut lemmas = Vec::with_capacity(synset.members.len());
        for member in &synset.members {
            if let Some(entry) = self.entry_by_id(member)? {
                lemmas.push(entry.lemma.written_form.clone());
            }
        }
        Ok(lemmas)
    }

    /// Remove one sense from its entry and re-pack the entry's ordinals.
    ///
    /// The entry itself stays, even when this was its last sense.
    fn del_sense(&mut self, sense_id: &str) -> StoreResult<()> {
        let Some(owner) = self.sense_owner(sense_id)? else {
            return Err(StoreError::NotFound {
                key: sense_id.to_string(),
            });
        };
        let Some(entry) = self.entry_by_id(&owner)? else {
            return Err(StoreError::NotFound { key: owner });
        };
        let mut entry = entry.into_owned();
        entry.senses.retain(|s| s.id != sense_id);
        entry.repack();
        self.add_entry(entry)
    }
}

/// Copy every node of a store into a standalone [`Lexicon`].
///
/// Frames and comments are not collected; the result carries none.
pub fn collect_lexicon<S: LexiconStore + ?Sized>(store: &S) -> StoreResult<Lexicon> {
    let mut lexicon = Lexicon::new(store.header()?.into_owned());
    for id in store.entry_ids()? {
        if let Some(entry) = store.entry_by_id(&id)? {
            lexicon.entries.push(entry.into_owned());
        }
    }
    for id in store.synset_ids()? {
        if let Some(synset) = store.synset_by_id(&id)? {
            lexicon.synsets.push(synset.into_owned());
        }
    }
    Ok(lexicon)
}
