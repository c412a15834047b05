//! Deterministic allocation of new synset ids.

use sha2::{Digest, Sha256};

use crate::error::KeyError;
use crate::model::PartOfSpeech;
use crate::store::LexiconStore;

use super::{KeyResult, synset_id};

/// Numbers of newly allocated synsets live in the `8NNNNNNN` block.
pub const NEW_SYNSET_BASE: u32 = 80_000_000;

/// Hash a definition into the new-synset number block.
pub fn definition_number(definition: &str) -> u32 {
    let digest = Sha256::digest(definition.as_bytes());
    let prefix = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    NEW_SYNSET_BASE + prefix % 10_000_000
}

/// Allocate the id for a new synset with the given definition.
///
/// An id already present in the store is an error: either the same definition
/// was submitted twice or two definitions share a hash bucket. Both need a
/// human decision.
pub fn new_synset_id<S: LexiconStore + ?Sized>(
    store: &S,
    ns: &str,
    pos: PartOfSpeech,
    definition: &str,
) -> KeyResult<String> {
    let id = synset_id(ns, definition_number(definition), pos);
    if store.synset_by_id(&id)?.is_some() {
        return Err(KeyError::Collision { id });
    }
    Ok(id)
}
