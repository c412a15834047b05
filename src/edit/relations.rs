//! Public relation operations for both layers.
//!
//! Sense-level operations mirror the synset-level ones; the only difference
//! is that a sense is resolved to its owning entry before it is edited.

use crate::model::{SenseRelType, SenseRelation, SynsetRelType, SynsetRelation};
use crate::store::LexiconStore;

use super::{EditResult, Edge, Editor, SenseLayer, SynsetLayer};

impl<S: LexiconStore> Editor<S> {
    /// Add `source =rel_type=> target` and its inverse, if the type has one.
    ///
    /// Returns `false` when the relation was already present.
    pub fn add_relation(
        &mut self,
        source: &str,
        rel_type: SynsetRelType,
        target: &str,
    ) -> EditResult<bool> {
        self.add_edge::<SynsetLayer>(source, SynsetRelation::new(target, rel_type))
    }

    /// Remove every relation between the two synsets, in both directions.
    pub fn delete_relation(&mut self, source: &str, target: &str) -> EditResult<()> {
        self.delete_pair::<SynsetLayer>(source, target)?;
        Ok(())
    }

    pub fn update_relation_type(
        &mut self,
        source: &str,
        target: &str,
        rel_type: SynsetRelType,
    ) -> EditResult<()> {
        let edge = self.unique_edge::<SynsetLayer>(source, target)?;
        self.replace_pair::<SynsetLayer>(source, target, source, edge.with_rel_type(rel_type))
    }

    /// Move the relation so it starts at `new_source`.
    pub fn update_relation_source(
        &mut self,
        source: &str,
        target: &str,
        new_source: &str,
    ) -> EditResult<()> {
        let edge = self.unique_edge::<SynsetLayer>(source, target)?;
        self.replace_pair::<SynsetLayer>(source, target, new_source, edge)
    }

    /// Move the relation so it ends at `new_target`.
    pub fn update_relation_target(
        &mut self,
        source: &str,
        target: &str,
        new_target: &str,
    ) -> EditResult<()> {
        let edge = self.unique_edge::<SynsetLayer>(source, target)?;
        self.replace_pair::<SynsetLayer>(source, target, source, edge.with_target(new_target))
    }

    /// Turn `source =t=> target` into `target =t=> source`.
    pub fn reverse_relation(&mut self, source: &str, target: &str) -> EditResult<()> {
        let edge = self.unique_edge::<SynsetLayer>(source, target)?;
        self.replace_pair::<SynsetLayer>(source, target, target, edge.with_target(source))
    }

    pub fn add_sense_relation(
        &mut self,
        source: &str,
        rel_type: SenseRelType,
        target: &str,
    ) -> EditResult<bool> {
        self.add_edge::<SenseLayer>(source, SenseRelation::new(target, rel_type))
    }

    /// Add an `other` sense relation carrying a sub-type.
    pub fn add_other_sense_relation(
        &mut self,
        source: &str,
        other_type: &str,
        target: &str,
    ) -> EditResult<bool> {
        let mut edge = SenseRelation::new(target, SenseRelType::Other);
        edge.other_type = Some(other_type.to_string());
        self.add_edge::<SenseLayer>(source, edge)
    }

    pub fn delete_sense_relation(&mut self, source: &str, target: &str) -> EditResult<()> {
        self.delete_pair::<SenseLayer>(source, target)?;
        Ok(())
    }

    pub fn update_sense_relation_type(
        &mut self,
        source: &str,
        target: &str,
        rel_type: SenseRelType,
    ) -> EditResult<()> {
        let edge = self.unique_edge::<SenseLayer>(source, target)?;
        self.replace_pair::<SenseLayer>(source, target, source, edge.with_rel_type(rel_type))
    }

    pub fn update_sense_relation_source(
        &mut self,
        source: &str,
        target: &str,
        new_source: &str,
    ) -> EditResult<()> {
        let edge = self.unique_edge::<SenseLayer>(source, target)?;
        self.replace_pair::<SenseLayer>(source, target, new_source, edge)
    }

    pub fn update_sense_relation_target(
        &mut self,
        source: &str,
        target: &str,
        new_target: &str,
    ) -> EditResult<()> {
        let edge = self.unique_edge::<SenseLayer>(source, target)?;
        self.replace_pair::<SenseLayer>(source, target, source, edge.with_target(new_target))
    }

    pub fn reverse_sense_relation(&mut self, source: &str, target: &str) -> EditResult<()> {
        let edge = self.unique_edge::<SenseLayer>(source, target)?;
        self.replace_pair::<SenseLayer>(source, target, target, edge.with_target(source))
    }
}
