// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # lexnet
//!
//! A wordnet graph engine: lexical entries, senses and synsets joined by
//! typed, mostly symmetric relations.
//!
//! ## Architecture
//!
//! - **Model** (`model`): entries, senses, synsets, closed relation enums
//!   with exhaustive inverse tables
//! - **Identifiers** (`ident`): lemma escaping, id grammar, sense keys and
//!   hash-based synset id allocation
//! - **Storage** (`store`): one [`store::LexiconStore`] contract, an
//!   in-memory backend and a redb-backed durable one
//! - **Editing** (`edit`): relation and node edits that keep both halves of
//!   every symmetric relation and every derived id consistent
//! - **Codecs** (`codec`): WN-LMF XML (whole file or split by lexfile) and
//!   sharded YAML
//! - **Validation** (`validate`): read-only checks producing a report with
//!   mechanical fixes
//!
//! ## Library usage
//!
//! ```no_run
//! use lexnet::edit::{EditConfig, Editor, NewSynset};
//! use lexnet::model::{Lexicon, LexiconHeader, PartOfSpeech, SynsetRelType};
//! use lexnet::store::mem::MemStore;
//!
//! let store = MemStore::new(Lexicon::new(LexiconHeader::new("oewn")));
//! let mut editor = Editor::new(store, EditConfig::default());
//! let dog = editor
//!     .add_synset(NewSynset::new("a domesticated canid", PartOfSpeech::Noun, "noun.animal"))
//!     .unwrap();
//! let mammal = editor
//!     .add_synset(NewSynset::new("a warm-blooded vertebrate", PartOfSpeech::Noun, "noun.animal"))
//!     .unwrap();
//! editor.add_entry(&dog, "dog", None, None).unwrap();
//! editor.add_relation(&dog, SynsetRelType::Hypernym, &mammal).unwrap();
//! ```

pub mod codec;
pub mod config;
pub mod edit;
pub mod error;
pub mod ident;
pub mod model;
pub mod store;
pub mod validate;

pub use config::LexnetConfig;
pub use error::{LexnetError, LexnetResult};
