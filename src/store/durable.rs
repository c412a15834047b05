//! Disk-backed lexicon store on redb.
//!
//! Entries and synsets are bincode blobs keyed by id. Auxiliary tables index
//! senses, lemmas and reverse relations so queries never deserialize the whole
//! corpus. Two sequence tables per node kind remember insertion order, so ids
//! come back in document order rather than key order. Mutations are queued in a bounded buffer and applied in a single
//! write transaction when the buffer fills or before any read, so every read
//! observes every earlier write.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use redb::{
    Database, MultimapTable, MultimapTableDefinition, ReadableMultimapTable, ReadableTable, Table,
    TableDefinition,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StoreError;
use crate::model::{Comments, LexicalEntry, Lexicon, LexiconHeader, Synset, SyntacticBehaviour};

use super::{LexiconStore, StoreResult, collect_lexicon};

type BlobTable = TableDefinition<'static, &'static str, &'static [u8]>;
type StrTable = TableDefinition<'static, &'static str, &'static str>;
type MultiTable = MultimapTableDefinition<'static, &'static str, &'static str>;
type OrderTable = TableDefinition<'static, u64, &'static str>;
type SeqTable = TableDefinition<'static, &'static str, u64>;

const ENTRIES: BlobTable = TableDefinition::new("entries");
const SYNSETS: BlobTable = TableDefinition::new("synsets");
const SENSE_SYNSET: StrTable = TableDefinition::new("sense_synset");
const SENSE_ENTRY: StrTable = TableDefinition::new("sense_entry");
const LEMMA_ENTRIES: MultiTable = MultimapTableDefinition::new("lemma_entries");
const LEMMA_SYNSETS: MultiTable = MultimapTableDefinition::new("lemma_synsets");
const SYNSET_REFERRERS: MultiTable = MultimapTableDefinition::new("synset_referrers");
const SENSE_REFERRERS: MultiTable = MultimapTableDefinition::new("sense_referrers");
const ENTRY_ORDER: OrderTable = TableDefinition::new("entry_order");
const ENTRY_SEQ: SeqTable = TableDefinition::new("entry_seq");
const SYNSET_ORDER: OrderTable = TableDefinition::new("synset_order");
const SYNSET_SEQ: SeqTable = TableDefinition::new("synset_seq");
const META: BlobTable = TableDefinition::new("meta");

const META_HEADER: &str = "header";
const META_FRAMES: &str = "frames";
const META_COMMENTS: &str = "comments";

/// Default number of queued mutations before a flush.
pub const DEFAULT_CACHE_SIZE: usize = 1000;

fn redb_err<E: std::fmt::Display>(op: &'static str) -> impl FnOnce(E) -> StoreError {
    move |e| StoreError::Redb {
        message: format!("{op} failed: {e}"),
    }
}

fn encode<T: Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| StoreError::Serialization {
        message: format!("encode failed: {e}"),
    })
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Serialization {
        message: format!("decode failed: {e}"),
    })
}

/// A queued mutation.
#[derive(Debug)]
enum Pending {
    PutEntry(LexicalEntry),
    DelEntry(String),
    PutSynset(Synset),
    DelSynset(String),
}

/// Every table a flush touches, opened once per transaction.
struct Tables<'txn> {
    entries: Table<'txn, &'static str, &'static [u8]>,
    synsets: Table<'txn, &'static str, &'static [u8]>,
    sense_synset: Table<'txn, &'static str, &'static str>,
    sense_entry: Table<'txn, &'static str, &'static str>,
    lemma_entries: MultimapTable<'txn, &'static str, &'static str>,
    lemma_synsets: MultimapTable<'txn, &'static str, &'static str>,
    synset_referrers: MultimapTable<'txn, &'static str, &'static str>,
    sense_referrers: MultimapTable<'txn, &'static str, &'static str>,
    entry_order: Table<'txn, u64, &'static str>,
    entry_seq: Table<'txn, &'static str, u64>,
    synset_order: Table<'txn, u64, &'static str>,
    synset_seq: Table<'txn, &'static str, u64>,
}

/// Give `id` the next sequence number unless it already has one.
fn place(
    order: &mut Table<'_, u64, &'static str>,
    seq: &mut Table<'_, &'static str, u64>,
    id: &str,
) -> StoreResult<()> {
    if seq.get(id).map_err(redb_err("get"))?.is_some() {
        return Ok(());
    }
    let next = match order.last().map_err(redb_err("last"))? {
        Some((last, _)) => last.value() + 1,
        None => 0,
    };
    order.insert(next, id).map_err(redb_err("insert"))?;
    seq.insert(id, next).map_err(redb_err("insert"))?;
    Ok(())
}

fn unplace(
    order: &mut Table<'_, u64, &'static str>,
    seq: &mut Table<'_, &'static str, u64>,
    id: &str,
) -> StoreResult<()> {
    let position = seq
        .remove(id)
        .map_err(redb_err("remove"))?
        .map(|g| g.value());
    if let Some(position) = position {
        order.remove(position).map_err(redb_err("remove"))?;
    }
    Ok(())
}

impl<'txn> Tables<'txn> {
    fn open(txn: &'txn redb::WriteTransaction) -> StoreResult<Self> {
        Ok(Self {
            entries: txn.open_table(ENTRIES).map_err(redb_err("open_table"))?,
            synsets: txn.open_table(SYNSETS).map_err(redb_err("open_table"))?,
            sense_synset: txn.open_table(SENSE_SYNSET).map_err(redb_err("open_table"))?,
            sense_entry: txn.open_table(SENSE_ENTRY).map_err(redb_err("open_table"))?,
            lemma_entries: txn
                .open_multimap_table(LEMMA_ENTRIES)
                .map_err(redb_err("open_multimap_table"))?,
            lemma_synsets: txn
                .open_multimap_table(LEMMA_SYNSETS)
                .map_err(redb_err("open_multimap_table"))?,
            synset_referrers: txn
                .open_multimap_table(SYNSET_REFERRERS)
                .map_err(redb_err("open_multimap_table"))?,
            sense_referrers: txn
                .open_multimap_table(SENSE_REFERRERS)
                .map_err(redb_err("open_multimap_table"))?,
            entry_order: txn.open_table(ENTRY_ORDER).map_err(redb_err("open_table"))?,
            entry_seq: txn.open_table(ENTRY_SEQ).map_err(redb_err("open_table"))?,
            synset_order: txn.open_table(SYNSET_ORDER).map_err(redb_err("open_table"))?,
            synset_seq: txn.open_table(SYNSET_SEQ).map_err(redb_err("open_table"))?,
        })
    }

    /// Drop every table a flush touches, leaving the transaction with none.
    fn clear(txn: &redb::WriteTransaction) -> StoreResult<()> {
        for table in [ENTRIES, SYNSETS] {
            txn.delete_table(table).map_err(redb_err("delete_table"))?;
        }
        for table in [SENSE_SYNSET, SENSE_ENTRY] {
            txn.delete_table(table).map_err(redb_err("delete_table"))?;
        }
        for table in [LEMMA_ENTRIES, LEMMA_SYNSETS, SYNSET_REFERRERS, SENSE_REFERRERS] {
            txn.delete_multimap_table(table)
                .map_err(redb_err("delete_multimap_table"))?;
        }
        for table in [ENTRY_ORDER, SYNSET_ORDER] {
            txn.delete_table(table).map_err(redb_err("delete_table"))?;
        }
        for table in [ENTRY_SEQ, SYNSET_SEQ] {
            txn.delete_table(table).map_err(redb_err("delete_table"))?;
        }
        Ok(())
    }

    fn apply(&mut self, op: &Pending) -> StoreResult<()> {
        match op {
            Pending::PutEntry(entry) => self.put_entry(entry),
            Pending::DelEntry(id) => {
                self.remove_entry(id)?;
                unplace(&mut self.entry_order, &mut self.entry_seq, id)
            }
            Pending::PutSynset(synset) => self.put_synset(synset),
            Pending::DelSynset(id) => {
                self.remove_synset(id)?;
                unplace(&mut self.synset_order, &mut self.synset_seq, id)
            }
        }
    }

    fn put_entry(&mut self, entry: &LexicalEntry) -> StoreResult<()> {
        self.remove_entry(&entry.id)?;
        self.insert_entry(entry)?;
        place(&mut self.entry_order, &mut self.entry_seq, &entry.id)
    }

    fn put_synset(&mut self, synset: &Synset) -> StoreResult<()> {
        self.remove_synset(&synset.id)?;
        self.insert_synset(synset)?;
        place(&mut self.synset_order, &mut self.synset_seq, &synset.id)
    }

    fn stored_entry(&self, id: &str) -> StoreResult<Option<LexicalEntry>> {
        let bytes = self
            .entries
            .get(id)
            .map_err(redb_err("get"))?
            .map(|g| g.value().to_vec());
        bytes.map(|b| decode(&b)).transpose()
    }

    fn insert_entry(&mut self, entry: &LexicalEntry) -> StoreResult<()> {
        let bytes = encode(entry)?;
        let lemma = entry.lemma.written_form.as_str();
        self.entries
            .insert(entry.id.as_str(), bytes.as_slice())
            .map_err(redb_err("insert"))?;
        self.lemma_entries
            .insert(lemma, entry.id.as_str())
            .map_err(redb_err("insert"))?;
        for sense in &entry.senses {
            self.sense_synset
                .insert(sense.id.as_str(), sense.synset.as_str())
                .map_err(redb_err("insert"))?;
            self.sense_entry
                .insert(sense.id.as_str(), entry.id.as_str())
                .map_err(redb_err("insert"))?;
            self.lemma_synsets
                .insert(lemma, sense.synset.as_str())
                .map_err(redb_err("insert"))?;
            for rel in &sense.relations {
                self.sense_referrers
                    .insert(rel.target.as_str(), sense.id.as_str())
                    .map_err(redb_err("insert"))?;
            }
        }
        Ok(())
    }

    fn remove_entry(&mut self, id: &str) -> StoreResult<()> {
        let Some(old) = self.stored_entry(id)? else {
            return Ok(());
        };
        self.entries.remove(id).map_err(redb_err("remove"))?;
        let lemma = old.lemma.written_form.as_str();
        self.lemma_entries
            .remove(lemma, id)
            .map_err(redb_err("remove"))?;
        for sense in &old.senses {
            self.sense_synset
                .remove(sense.id.as_str())
                .map_err(redb_err("remove"))?;
            self.sense_entry
                .remove(sense.id.as_str())
                .map_err(redb_err("remove"))?;
            if !self.lemma_still_in_synset(lemma, &sense.synset)? {
                self.lemma_synsets
                    .remove(lemma, sense.synset.as_str())
                    .map_err(redb_err("remove"))?;
            }
            for rel in &sense.relations {
                self.sense_referrers
                    .remove(rel.target.as_str(), sense.id.as_str())
                    .map_err(redb_err("remove"))?;
            }
        }
        Ok(())
    }

    /// Whether another stored entry with the same written form still has a
    /// sense in `synset`.
    fn lemma_still_in_synset(&self, lemma: &str, synset: &str) -> StoreResult<bool> {
        let mut others = Vec::new();
        for id in self.lemma_entries.get(lemma).map_err(redb_err("get"))? {
            others.push(id.map_err(redb_err("get"))?.value().to_string());
        }
        for other in others {
            if let Some(entry) = self.stored_entry(&other)?
                && entry.sense_for_synset(synset).is_some()
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn insert_synset(&mut self, synset: &Synset) -> StoreResult<()> {
        let bytes = encode(synset)?;
        self.synsets
            .insert(synset.id.as_str(), bytes.as_slice())
            .map_err(redb_err("insert"))?;
        for rel in &synset.relations {
            self.synset_referrers
                .insert(rel.target.as_str(), synset.id.as_str())
                .map_err(redb_err("insert"))?;
        }
        Ok(())
    }

    fn remove_synset(&mut self, id: &str) -> StoreResult<()> {
        let bytes = self
            .synsets
            .remove(id)
            .map_err(redb_err("remove"))?
            .map(|g| g.value().to_vec());
        let Some(bytes) = bytes else {
            return Ok(());
        };
        let old: Synset = decode(&bytes)?;
        for rel in &old.relations {
            self.synset_referrers
                .remove(rel.target.as_str(), id)
                .map_err(redb_err("remove"))?;
        }
        Ok(())
    }
}

/// Lexicon store persisted in a single redb file.
pub struct DurableStore {
    db: Database,
    path: PathBuf,
    pending: Mutex<Vec<Pending>>,
    cache_size: usize,
}

impl DurableStore {
    /// Open or create the database at `path`, creating every table.
    pub fn open(path: &Path, cache_size: usize) -> StoreResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io { source: e })?;
        }
        let db = Database::create(path).map_err(|e| StoreError::Redb {
            message: format!("failed to open redb at {}: {e}", path.display()),
        })?;

        let txn = db.begin_write().map_err(redb_err("begin_write"))?;
        {
            Tables::open(&txn)?;
            txn.open_table(META).map_err(redb_err("open_table"))?;
        }
        txn.commit().map_err(redb_err("commit"))?;

        tracing::info!(path = %path.display(), cache_size, "opened durable store");
        Ok(Self {
            db,
            path: path.to_path_buf(),
            pending: Mutex::new(Vec::new()),
            cache_size: cache_size.max(1),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of mutations waiting for the next flush.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().expect("write buffer lock poisoned").len()
    }

    fn enqueue(&self, op: Pending) -> StoreResult<()> {
        let len = {
            let mut pending = self.pending.lock().expect("write buffer lock poisoned");
            pending.push(op);
            pending.len()
        };
        if len >= self.cache_size {
            self.flush_pending()?;
        }
        Ok(())
    }

    /// Apply every queued mutation in one write transaction.
    ///
    /// On failure the queue is restored, so nothing is lost.
    fn flush_pending(&self) -> StoreResult<()> {
        let mut pending = self.pending.lock().expect("write buffer lock poisoned");
        if pending.is_empty() {
            return Ok(());
        }
        let ops = std::mem::take(&mut *pending);
        match self.write_ops(&ops) {
            Ok(()) => {
                tracing::debug!(ops = ops.len(), "flushed write buffer");
                Ok(())
            }
            Err(e) => {
                *pending = ops;
                Err(e)
            }
        }
    }

    fn write_ops(&self, ops: &[Pending]) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(redb_err("begin_write"))?;
        {
            let mut tables = Tables::open(&txn)?;
            for op in ops {
                tables.apply(op)?;
            }
        }
        txn.commit().map_err(redb_err("commit"))
    }

    fn read_blob<T: DeserializeOwned>(
        &self,
        table: BlobTable,
        key: &str,
    ) -> StoreResult<Option<T>> {
        self.flush_pending()?;
        let txn = self.db.begin_read().map_err(redb_err("begin_read"))?;
        let table = txn.open_table(table).map_err(redb_err("open_table"))?;
        let bytes = table
            .get(key)
            .map_err(redb_err("get"))?
            .map(|g| g.value().to_vec());
        bytes.map(|b| decode(&b)).transpose()
    }

    fn read_str(&self, table: StrTable, key: &str) -> StoreResult<Option<String>> {
        self.flush_pending()?;
        let txn = self.db.begin_read().map_err(redb_err("begin_read"))?;
        let table = txn.open_table(table).map_err(redb_err("open_table"))?;
        Ok(table
            .get(key)
            .map_err(redb_err("get"))?
            .map(|g| g.value().to_string()))
    }

    fn read_multi(
        &self,
        table: MultiTable,
        key: &str,
    ) -> StoreResult<Vec<String>> {
        self.flush_pending()?;
        let txn = self.db.begin_read().map_err(redb_err("begin_read"))?;
        let table = txn
            .open_multimap_table(table)
            .map_err(redb_err("open_multimap_table"))?;
        let mut out = Vec::new();
        for value in table.get(key).map_err(redb_err("get"))? {
            out.push(value.map_err(redb_err("get"))?.value().to_string());
        }
        Ok(out)
    }

    /// Ids of one node kind, in sequence order.
    fn read_order(&self, table: OrderTable) -> StoreResult<Vec<String>> {
        self.flush_pending()?;
        let txn = self.db.begin_read().map_err(redb_err("begin_read"))?;
        let table = txn.open_table(table).map_err(redb_err("open_table"))?;
        let mut out = Vec::new();
        for item in table.iter().map_err(redb_err("iter"))? {
            let (_, id) = item.map_err(redb_err("iter"))?;
            out.push(id.value().to_string());
        }
        Ok(out)
    }

    fn put_meta<T: Serialize>(&self, key: &str, value: &T) -> StoreResult<()> {
        let bytes = encode(value)?;
        let txn = self.db.begin_write().map_err(redb_err("begin_write"))?;
        {
            let mut table = txn.open_table(META).map_err(redb_err("open_table"))?;
            table
                .insert(key, bytes.as_slice())
                .map_err(redb_err("insert"))?;
        }
        txn.commit().map_err(redb_err("commit"))
    }

    pub fn set_header(&self, header: &LexiconHeader) -> StoreResult<()> {
        self.put_meta(META_HEADER, header)
    }

    pub fn frames(&self) -> StoreResult<Vec<SyntacticBehaviour>> {
        Ok(self.read_blob(META, META_FRAMES)?.unwrap_or_default())
    }

    pub fn comments(&self) -> StoreResult<Comments> {
        Ok(self.read_blob(META, META_COMMENTS)?.unwrap_or_default())
    }

    /// Synsets that have a member with this written form.
    pub fn synsets_by_lemma(&self, lemma: &str) -> StoreResult<Vec<String>> {
        self.read_multi(LEMMA_SYNSETS, lemma)
    }

    /// Synset a sense points at, from the auxiliary index.
    pub fn sense_synset(&self, sense_id: &str) -> StoreResult<Option<String>> {
        self.read_str(SENSE_SYNSET, sense_id)
    }

    /// Replace the whole database with `lexicon`: header, frames, comments
    /// and every node, in one transaction.
    ///
    /// Nodes already in the file are dropped, not merged. Queued writes are
    /// discarded since the import supersedes them.
    pub fn import(&mut self, lexicon: &Lexicon) -> StoreResult<()> {
        let dropped = std::mem::take(&mut *self.pending.lock().expect("write buffer lock poisoned"));
        if !dropped.is_empty() {
            tracing::debug!(ops = dropped.len(), "import discards queued writes");
        }

        let txn = self.db.begin_write().map_err(redb_err("begin_write"))?;
        Tables::clear(&txn)?;
        {
            let mut meta = txn.open_table(META).map_err(redb_err("open_table"))?;
            for (key, bytes) in [
                (META_HEADER, encode(&lexicon.header)?),
                (META_FRAMES, encode(&lexicon.frames)?),
                (META_COMMENTS, encode(&lexicon.comments)?),
            ] {
                meta.insert(key, bytes.as_slice())
                    .map_err(redb_err("insert"))?;
            }
            let mut tables = Tables::open(&txn)?;
            for entry in &lexicon.entries {
                tables.put_entry(entry)?;
            }
            for synset in &lexicon.synsets {
                tables.put_synset(synset)?;
            }
        }
        txn.commit().map_err(redb_err("commit"))?;
        tracing::info!(
            entries = lexicon.entries.len(),
            synsets = lexicon.synsets.len(),
            path = %self.path.display(),
            "imported lexicon into durable store"
        );
        Ok(())
    }

    /// Rebuild a complete [`Lexicon`] from the database.
    pub fn export(&self) -> StoreResult<Lexicon> {
        let mut lexicon = collect_lexicon(self)?;
        lexicon.frames = self.frames()?;
        lexicon.comments = self.comments()?;
        Ok(lexicon)
    }
}

impl LexiconStore for DurableStore {
    fn header(&self) -> StoreResult<Cow<'_, LexiconHeader>> {
        self.read_blob(META, META_HEADER)?
            .map(Cow::Owned)
            .ok_or_else(|| StoreError::NotFound {
                key: META_HEADER.to_string(),
            })
    }

    fn entry_by_id(&self, id: &str) -> StoreResult<Option<Cow<'_, LexicalEntry>>> {
        Ok(self.read_blob(ENTRIES, id)?.map(Cow::Owned))
    }

    fn synset_by_id(&self, id: &str) -> StoreResult<Option<Cow<'_, Synset>>> {
        Ok(self.read_blob(SYNSETS, id)?.map(Cow::Owned))
    }

    fn sense_owner(&self, sense_id: &str) -> StoreResult<Option<String>> {
        self.read_str(SENSE_ENTRY, sense_id)
    }

    fn entry_by_lemma(&self, lemma: &str) -> StoreResult<Vec<String>> {
        self.read_multi(LEMMA_ENTRIES, lemma)
    }

    fn synset_referrers(&self, target: &str) -> StoreResult<Vec<String>> {
        self.read_multi(SYNSET_REFERRERS, target)
    }

    fn sense_referrers(&self, target: &str) -> StoreResult<Vec<String>> {
        self.read_multi(SENSE_REFERRERS, target)
    }

    fn entry_ids(&self) -> StoreResult<Vec<String>> {
        self.read_order(ENTRY_ORDER)
    }

    fn synset_ids(&self) -> StoreResult<Vec<String>> {
        self.read_order(SYNSET_ORDER)
    }

    fn add_entry(&mut self, entry: LexicalEntry) -> StoreResult<()> {
        self.enqueue(Pending::PutEntry(entry))
    }

    fn del_entry(&mut self, id: &str) -> StoreResult<()> {
        self.enqueue(Pending::DelEntry(id.to_string()))
    }

    fn add_synset(&mut self, synset: Synset) -> StoreResult<()> {
        self.enqueue(Pending::PutSynset(synset))
    }

    fn del_synset(&mut self, id: &str) -> StoreResult<()> {
        self.enqueue(Pending::DelSynset(id.to_string()))
    }

    fn flush(&mut self) -> StoreResult<()> {
        self.flush_pending()
    }

    /// Comments live in one meta blob, written back only when `edit`
    /// changed it.
    fn edit_comments(&mut self, edit: &mut dyn FnMut(&mut Comments)) -> StoreResult<()> {
        let before = self.comments()?;
        let mut after = before.clone();
        edit(&mut after);
        if after != before {
            self.put_meta(META_COMMENTS, &after)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for DurableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableStore")
            .field("path", &self.path)
            .field("cache_size", &self.cache_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PartOfSpeech, Sense};
    use tempfile::TempDir;

    fn entry(id: &str, lemma: &str, synset: &str) -> LexicalEntry {
        let mut e = LexicalEntry::new(id, lemma, PartOfSpeech::Noun);
        e.senses
            .push(Sense::new(format!("{id}-{}-01", &synset[5..13]), synset, 0));
        e
    }

    #[test]
    fn writes_are_buffered_until_a_read() {
        let dir = TempDir::new().unwrap();
        let mut store = DurableStore::open(&dir.path().join("lex.redb"), 100).unwrap();
        store
            .add_entry(entry("oewn-dog-n", "dog", "oewn-00000001-n"))
            .unwrap();
        assert_eq!(store.pending_len(), 1);

        let dog = store.entry_by_id("oewn-dog-n").unwrap().unwrap();
        assert_eq!(dog.lemma.written_form, "dog");
        assert_eq!(store.pending_len(), 0);
        assert_eq!(
            store.synsets_by_lemma("dog").unwrap(),
            vec!["oewn-00000001-n"]
        );
    }

    #[test]
    fn full_buffer_flushes_itself() {
        let dir = TempDir::new().unwrap();
        let mut store = DurableStore::open(&dir.path().join("lex.redb"), 2).unwrap();
        store
            .add_entry(entry("oewn-dog-n", "dog", "oewn-00000001-n"))
            .unwrap();
        store
            .add_entry(entry("oewn-cat-n", "cat", "oewn-00000002-n"))
            .unwrap();
        assert_eq!(store.pending_len(), 0);
    }

    #[test]
    fn replacing_an_entry_drops_stale_index_rows() {
        let dir = TempDir::new().unwrap();
        let mut store = DurableStore::open(&dir.path().join("lex.redb"), 10).unwrap();
        store
            .add_entry(entry("oewn-dog-n", "dog", "oewn-00000001-n"))
            .unwrap();
        store
            .add_entry(entry("oewn-dog-n", "dog", "oewn-00000002-n"))
            .unwrap();
        assert_eq!(
            store.synsets_by_lemma("dog").unwrap(),
            vec!["oewn-00000002-n"]
        );
        store.del_entry("oewn-dog-n").unwrap();
        assert!(store.entry_by_lemma("dog").unwrap().is_empty());
        assert!(store.synsets_by_lemma("dog").unwrap().is_empty());
    }

    #[test]
    fn missing_header_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = DurableStore::open(&dir.path().join("lex.redb"), 10).unwrap();
        assert!(matches!(store.header(), Err(StoreError::NotFound { .. })));
        store.set_header(&LexiconHeader::new("oewn")).unwrap();
        assert_eq!(store.header().unwrap().id, "oewn");
    }
}
