//! Relation engine: every mutation of a loaded lexicon goes through [`Editor`].
//!
//! The editor keeps three invariants across edits:
//!
//! - relations whose type has an inverse exist in both directions
//! - nothing points at a deleted node
//! - sense ordinals and member indices stay dense
//!
//! Every precondition is checked before the first write, so a failed operation
//! leaves the store as it was.

pub mod nodes;
pub mod op;
pub mod relations;

use crate::error::EditError;
use crate::model::{
    Comments, RelationType, SenseRelType, SenseRelation, SynsetRelType, SynsetRelation,
};
use crate::store::LexiconStore;

pub use nodes::NewSynset;
pub use op::Operation;

/// Result type for edit operations.
pub type EditResult<T> = std::result::Result<T, EditError>;

/// Settings the editor needs from the lexicon configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditConfig {
    /// Prefix of every id the editor invents.
    pub namespace: String,
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            namespace: "oewn".into(),
        }
    }
}

/// Applies edit operations to a store.
#[derive(Debug)]
pub struct Editor<S: LexiconStore> {
    store: S,
    config: EditConfig,
}

impl<S: LexiconStore> Editor<S> {
    pub fn new(store: S, config: EditConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Direct store access bypasses every invariant the editor maintains.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    /// Write any buffered changes through to the backend.
    pub fn flush(&mut self) -> EditResult<()> {
        Ok(self.store.flush()?)
    }
}

// ---------------------------------------------------------------------------
// Layers
// ---------------------------------------------------------------------------

/// A relation value stored on a node of some layer.
pub trait Edge: Clone + PartialEq + std::fmt::Debug {
    type Rel: RelationType;

    fn target(&self) -> &str;
    fn rel_type(&self) -> Self::Rel;
    fn with_target(&self, target: &str) -> Self;
    fn with_rel_type(&self, rel_type: Self::Rel) -> Self;

    /// The edge the target must carry back to `source`, if the type has an
    /// inverse.
    fn mirror(&self, source: &str) -> Option<Self> {
        self.rel_type()
            .inverse()
            .map(|inv| self.with_target(source).with_rel_type(inv))
    }
}

impl Edge for SynsetRelation {
    type Rel = SynsetRelType;

    fn target(&self) -> &str {
        &self.target
    }

    fn rel_type(&self) -> SynsetRelType {
        self.rel_type
    }

    fn with_target(&self, target: &str) -> Self {
        SynsetRelation::new(target, self.rel_type)
    }

    fn with_rel_type(&self, rel_type: SynsetRelType) -> Self {
        SynsetRelation::new(self.target.clone(), rel_type)
    }
}

impl Edge for SenseRelation {
    type Rel = SenseRelType;

    fn target(&self) -> &str {
        &self.target
    }

    fn rel_type(&self) -> SenseRelType {
        self.rel_type
    }

    fn with_target(&self, target: &str) -> Self {
        SenseRelation {
            target: target.to_string(),
            rel_type: self.rel_type,
            other_type: self.other_type.clone(),
        }
    }

    fn with_rel_type(&self, rel_type: SenseRelType) -> Self {
        SenseRelation {
            target: self.target.clone(),
            rel_type,
            other_type: if rel_type == SenseRelType::Other {
                self.other_type.clone()
            } else {
                None
            },
        }
    }
}

/// Access to the relation lists of one node kind.
pub trait Layer<S: LexiconStore + ?Sized> {
    type Edge: Edge;

    fn unknown(id: &str) -> EditError;

    /// Relations of `id`, or `None` if the node does not exist.
    fn edges(store: &S, id: &str) -> EditResult<Option<Vec<Self::Edge>>>;

    fn set_edges(store: &mut S, id: &str, edges: Vec<Self::Edge>) -> EditResult<()>;
}

/// Synset-level relations.
pub struct SynsetLayer;

/// Sense-level relations, reached through the owning entry.
pub struct SenseLayer;

impl<S: LexiconStore + ?Sized> Layer<S> for SynsetLayer {
    type Edge = SynsetRelation;

    fn unknown(id: &str) -> EditError {
        EditError::UnknownSynset { id: id.to_string() }
    }

    fn edges(store: &S, id: &str) -> EditResult<Option<Vec<SynsetRelation>>> {
        Ok(store.synset_by_id(id)?.map(|s| s.relations.clone()))
    }

    fn set_edges(store: &mut S, id: &str, edges: Vec<SynsetRelation>) -> EditResult<()> {
        let mut synset = store
            .synset_by_id(id)?
            .ok_or_else(|| <Self as Layer<S>>::unknown(id))?
            .into_owned();
        synset.relations = edges;
        store.add_synset(synset)?;
        Ok(())
    }
}

impl<S: LexiconStore + ?Sized> Layer<S> for SenseLayer {
    type Edge = SenseRelation;

    fn unknown(id: &str) -> EditError {
        EditError::UnknownSense { id: id.to_string() }
    }

    fn edges(store: &S, id: &str) -> EditResult<Option<Vec<SenseRelation>>> {
        Ok(store.sense_by_id(id)?.map(|s| s.relations.clone()))
    }

    fn set_edges(store: &mut S, id: &str, edges: Vec<SenseRelation>) -> EditResult<()> {
        let owner = store.sense_owner(id)?.ok_or_else(|| <Self as Layer<S>>::unknown(id))?;
        let mut entry = store
            .entry_by_id(&owner)?
            .ok_or_else(|| <Self as Layer<S>>::unknown(id))?
            .into_owned();
        let sense = entry.sense_mut(id).ok_or_else(|| <Self as Layer<S>>::unknown(id))?;
        sense.relations = edges;
        store.add_entry(entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Pair primitives
// ---------------------------------------------------------------------------

impl<S: LexiconStore> Editor<S> {
    /// Insert `edge` on `source` and its mirror on the target.
    ///
    /// Returns `false` (and changes nothing) when the forward edge already
    /// exists.
    pub(crate) fn add_edge<L: Layer<S>>(&mut self, source: &str, edge: L::Edge) -> EditResult<bool> {
        let target = edge.target().to_string();
        if source == target {
            return Err(EditError::InvalidRelation {
                source_id: source.to_string(),
                rel_type: edge.rel_type().to_string(),
                target,
                reason: "a node cannot relate to itself".into(),
            });
        }
        let mut forward = L::edges(&self.store, source)?.ok_or_else(|| L::unknown(source))?;
        let mut backward = L::edges(&self.store, &target)?.ok_or_else(|| L::unknown(&target))?;

        let same = |e: &L::Edge, t: &str, r: <L::Edge as Edge>::Rel| {
            e.target() == t && e.rel_type() == r
        };
        if forward.iter().any(|e| same(e, &target, edge.rel_type())) {
            tracing::warn!(
                source = %source,
                rel = %edge.rel_type(),
                target = %target,
                "relation already present, nothing to add"
            );
            return Ok(false);
        }

        let mirror = edge.mirror(source);
        tracing::debug!(source = %source, rel = %edge.rel_type(), target = %target, "add relation");
        forward.push(edge);
        L::set_edges(&mut self.store, source, forward)?;

        if let Some(mirror) = mirror
            && !backward.iter().any(|e| same(e, source, mirror.rel_type()))
        {
            tracing::debug!(source = %target, rel = %mirror.rel_type(), target = %source, "add inverse");
            backward.push(mirror);
            L::set_edges(&mut self.store, &target, backward)?;
        }
        Ok(true)
    }

    /// Remove every edge between `a` and `b`, in both directions and of any
    /// type. `b` may be missing, so dangling edges can be cleaned up.
    pub(crate) fn delete_pair<L: Layer<S>>(&mut self, a: &str, b: &str) -> EditResult<usize> {
        let forward = L::edges(&self.store, a)?.ok_or_else(|| L::unknown(a))?;
        let backward = L::edges(&self.store, b)?.unwrap_or_default();

        let (gone_fwd, kept_fwd): (Vec<_>, Vec<_>) =
            forward.into_iter().partition(|e| e.target() == b);
        let (gone_back, kept_back): (Vec<_>, Vec<_>) = if a == b {
            (Vec::new(), Vec::new())
        } else {
            backward.into_iter().partition(|e| e.target() == a)
        };
        let removed = gone_fwd.len() + gone_back.len();
        if removed == 0 {
            return Err(EditError::NoRelation {
                source_id: a.to_string(),
                target: b.to_string(),
            });
        }
        if !gone_fwd.is_empty() {
            L::set_edges(&mut self.store, a, kept_fwd)?;
        }
        if !gone_back.is_empty() {
            L::set_edges(&mut self.store, b, kept_back)?;
        }
        self.store.edit_comments(&mut |c: &mut Comments| c.forget_pair(a, b))?;
        tracing::debug!(a = %a, b = %b, removed, "deleted relation pair");
        Ok(removed)
    }

    /// The single edge from `source` to `target`.
    pub(crate) fn unique_edge<L: Layer<S>>(&self, source: &str, target: &str) -> EditResult<L::Edge> {
        let edges = L::edges(&self.store, source)?.ok_or_else(|| L::unknown(source))?;
        let mut found: Vec<L::Edge> = edges.into_iter().filter(|e| e.target() == target).collect();
        match found.len() {
            0 => Err(EditError::NoRelation {
                source_id: source.to_string(),
                target: target.to_string(),
            }),
            1 => Ok(found.remove(0)),
            count => Err(EditError::AmbiguousRelation {
                source_id: source.to_string(),
                target: target.to_string(),
                count,
            }),
        }
    }

    /// Replace the symmetric pair between `source` and `target` with `edge`
    /// placed on `new_source`.
    ///
    /// The sole primitive behind update and reverse: the old pair is removed
    /// as a whole and the new pair is added as a whole.
    pub(crate) fn replace_pair<L: Layer<S>>(
        &mut self,
        source: &str,
        target: &str,
        new_source: &str,
        edge: L::Edge,
    ) -> EditResult<()> {
        self.unique_edge::<L>(source, target)?;
        if L::edges(&self.store, target)?.is_none() {
            return Err(L::unknown(target));
        }
        if L::edges(&self.store, new_source)?.is_none() {
            return Err(L::unknown(new_source));
        }
        if L::edges(&self.store, edge.target())?.is_none() {
            return Err(L::unknown(edge.target()));
        }
        if new_source == edge.target() {
            return Err(EditError::InvalidRelation {
                source_id: new_source.to_string(),
                rel_type: edge.rel_type().to_string(),
                target: edge.target().to_string(),
                reason: "a node cannot relate to itself".into(),
            });
        }
        self.delete_pair::<L>(source, target)?;
        self.add_edge::<L>(new_source, edge)?;
        Ok(())
    }
}
