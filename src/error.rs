//! Rich diagnostic error types for lexnet.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so users know exactly what
//! went wrong and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for lexnet.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum LexnetError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Edit(#[from] EditError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Model errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum ModelError {
    #[error("unknown {what}: \"{value}\"")]
    #[diagnostic(
        code(lexnet::model::unknown_value),
        help(
            "Enumerated values (parts of speech, relation types, adjective positions) \
             are a closed set. Check the spelling against the WN-LMF schema."
        )
    )]
    UnknownValue { what: &'static str, value: String },
}

// ---------------------------------------------------------------------------
// Identifier / key errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum KeyError {
    #[error("malformed {kind} id: {id}")]
    #[diagnostic(
        code(lexnet::key::malformed_id),
        help(
            "Entry ids look like `<ns>-<lemma>-<pos>`, synset ids like \
             `<ns>-<8 digits>-<pos>` and sense ids like \
             `<ns>-<lemma>-<pos>-<8 digits>-<2 digits>`."
        )
    )]
    MalformedId { kind: &'static str, id: String },

    #[error("invalid escape in \"{token}\": {reason}")]
    #[diagnostic(
        code(lexnet::key::invalid_escape),
        help("The token was not produced by the lemma or key escaper. Re-derive it from the written form.")
    )]
    InvalidEscape { token: String, reason: String },

    #[error("invalid sense key \"{key}\": {reason}")]
    #[diagnostic(
        code(lexnet::key::invalid_sense_key),
        help("Sense keys look like `lemma%<type>:<lexfile>:<lex id>:<head word>:<head id>`.")
    )]
    InvalidSenseKey { key: String, reason: String },

    #[error("unknown lexicographer file: {lexfile}")]
    #[diagnostic(
        code(lexnet::key::unknown_lexfile),
        help("Lexicographer files are fixed (e.g. `noun.animal`, `verb.motion`, `adj.all`).")
    )]
    UnknownLexfile { lexfile: String },

    #[error("part of speech {pos} has no sense key type")]
    #[diagnostic(
        code(lexnet::key::no_sense_type),
        help("Only nouns, verbs, adjectives, adverbs and satellites carry sense keys.")
    )]
    NoSenseType { pos: char },

    #[error("lex id overflow for {lemma}: {lex_id} does not fit in two digits")]
    #[diagnostic(
        code(lexnet::key::lex_id_overflow),
        help("The entry has too many senses in one lexicographer file. Split or merge senses first.")
    )]
    LexIdOverflow { lemma: String, lex_id: u32 },

    #[error("satellite synset {synset} has {found} similar relations, expected exactly one")]
    #[diagnostic(
        code(lexnet::key::satellite_head),
        help(
            "A satellite adjective takes its head word from the single synset it is \
             `similar` to. Add or remove `similar` relations until exactly one remains."
        )
    )]
    SatelliteHead { synset: String, found: usize },

    #[error("head synset {synset} has no keyed first member")]
    #[diagnostic(
        code(lexnet::key::head_unkeyed),
        help("Assign a sense key to the first member of the head synset before keying its satellites.")
    )]
    HeadUnkeyed { synset: String },

    #[error("synset {id} does not exist")]
    #[diagnostic(
        code(lexnet::key::unknown_synset),
        help("The sense points at a synset that is not loaded.")
    )]
    UnknownSynset { id: String },

    #[error("new synset id {id} is already in use")]
    #[diagnostic(
        code(lexnet::key::collision),
        help(
            "The definition hashes to an existing synset id. This is either a resubmission \
             of an identical definition or a true hash collision. Reword the definition, \
             or pick the id explicitly."
        )
    )]
    Collision { id: String },

    #[error("invalid namespace \"{namespace}\"")]
    #[diagnostic(
        code(lexnet::key::namespace),
        help("The namespace prefix must be non-empty and contain only ASCII letters and digits.")
    )]
    InvalidNamespace { namespace: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("I/O error: {source}")]
    #[diagnostic(
        code(lexnet::store::io),
        help(
            "A filesystem operation failed. Check that the data directory exists, \
             has correct permissions, and that the disk is not full."
        )
    )]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("redb transaction error: {message}")]
    #[diagnostic(
        code(lexnet::store::redb),
        help(
            "The embedded database encountered a transaction error. \
             Try re-importing into a fresh database file. \
             If the problem persists, file a bug report."
        )
    )]
    Redb { message: String },

    #[error("serialization error: {message}")]
    #[diagnostic(
        code(lexnet::store::serde),
        help(
            "Failed to serialize or deserialize a stored value. \
             This usually means the stored format changed between versions. \
             Rebuild the database or snapshot from the source files."
        )
    )]
    Serialization { message: String },

    #[error("key not found: {key}")]
    #[diagnostic(
        code(lexnet::store::not_found),
        help("The requested id does not exist in the store. Verify the id is correct.")
    )]
    NotFound { key: String },
}

// ---------------------------------------------------------------------------
// Edit errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum EditError {
    #[error("synset not found: {id}")]
    #[diagnostic(
        code(lexnet::edit::unknown_synset),
        help("Check the synset id; ids look like `<ns>-<8 digits>-<pos>`.")
    )]
    UnknownSynset { id: String },

    #[error("sense not found: {id}")]
    #[diagnostic(
        code(lexnet::edit::unknown_sense),
        help("Check the sense id; ids look like `<ns>-<lemma>-<pos>-<8 digits>-<2 digits>`.")
    )]
    UnknownSense { id: String },

    #[error("no relation between {source_id} and {target}")]
    #[diagnostic(
        code(lexnet::edit::no_relation),
        help("Only existing relations can be deleted, updated or reversed.")
    )]
    NoRelation { source_id: String, target: String },

    #[error("{count} relation types link {source_id} to {target}, expected exactly one")]
    #[diagnostic(
        code(lexnet::edit::ambiguous_relation),
        help("Delete the pair and re-add the intended relation instead.")
    )]
    AmbiguousRelation {
        source_id: String,
        target: String,
        count: usize,
    },

    #[error("invalid relation {source_id} ={rel_type}=> {target}: {reason}")]
    #[diagnostic(
        code(lexnet::edit::invalid_relation),
        help("Relations must join two distinct, existing nodes of the same layer.")
    )]
    InvalidRelation {
        source_id: String,
        rel_type: String,
        target: String,
        reason: String,
    },

    #[error("\"{lemma}\" is not a member of {synset}")]
    #[diagnostic(
        code(lexnet::edit::not_a_member),
        help("List the members of the synset to find the exact written form.")
    )]
    NotAMember { lemma: String, synset: String },

    #[error("\"{lemma}\" is already a member of {synset}")]
    #[diagnostic(
        code(lexnet::edit::already_member),
        help("A lemma can appear only once per synset.")
    )]
    AlreadyMember { lemma: String, synset: String },

    #[error("{what} index {index} out of range (0..={max})")]
    #[diagnostic(
        code(lexnet::edit::index_out_of_range),
        help("Member and sense positions are dense; insert at most one past the last position.")
    )]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        max: usize,
    },

    #[error("example not found in {synset}: \"{text}\"")]
    #[diagnostic(
        code(lexnet::edit::unknown_example),
        help("Examples are matched by their exact text.")
    )]
    UnknownExample { synset: String, text: String },

    #[error("definition must not be empty")]
    #[diagnostic(
        code(lexnet::edit::empty_definition),
        help("Every synset needs at least one non-empty definition.")
    )]
    EmptyDefinition,

    #[error(transparent)]
    #[diagnostic(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Codec errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum CodecError {
    #[error("failed to access {path}")]
    #[diagnostic(
        code(lexnet::codec::io),
        help("Check that the file exists and that you have read/write permissions.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("XML error in {path}: {message}")]
    #[diagnostic(
        code(lexnet::codec::xml),
        help("The file is not well-formed WN-LMF XML. Check the reported position.")
    )]
    Xml { path: String, message: String },

    #[error("unexpected <{element}> inside <{parent}>")]
    #[diagnostic(
        code(lexnet::codec::unexpected_element),
        help("Only WN-LMF elements are accepted, in their schema position.")
    )]
    UnexpectedElement { element: String, parent: String },

    #[error("<{element}> is missing attribute `{attribute}`")]
    #[diagnostic(
        code(lexnet::codec::missing_attribute),
        help("Add the attribute; it is required by the WN-LMF schema.")
    )]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("YAML error in {path}: {message}")]
    #[diagnostic(
        code(lexnet::codec::yaml),
        help("The shard is not valid corpus YAML. Check indentation and the reported position.")
    )]
    Yaml { path: String, message: String },

    #[error("unresolved reference {reference} in {context}")]
    #[diagnostic(
        code(lexnet::codec::unresolved),
        help(
            "Short ids, sense keys and member lemmas must resolve to loaded nodes. \
             Check that every shard of the corpus was loaded."
        )
    )]
    Unresolved { reference: String, context: String },

    #[error("sense {sense} has no sense key and cannot be referenced in YAML")]
    #[diagnostic(
        code(lexnet::codec::unkeyed_sense),
        help("Assign sense keys (see `ident::compute_sense_key`) before saving as YAML.")
    )]
    UnkeyedSense { sense: String },

    #[error("duplicate {what}: {id}")]
    #[diagnostic(
        code(lexnet::codec::duplicate),
        help("Ids must be unique across the whole corpus.")
    )]
    Duplicate { what: &'static str, id: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(lexnet::config::read),
        help("Ensure the config file exists and is valid TOML.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    #[diagnostic(
        code(lexnet::config::parse),
        help("Check the TOML syntax in the config file.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(lexnet::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {message}")]
    #[diagnostic(code(lexnet::config::invalid), help("Check the config fields. {message}"))]
    Invalid { message: String },
}

/// Convenience alias for functions returning lexnet results.
pub type LexnetResult<T> = std::result::Result<T, LexnetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_converts_to_lexnet_error() {
        let err = StoreError::NotFound { key: "oewn-dog-n".into() };
        let top: LexnetError = err.into();
        assert!(matches!(top, LexnetError::Store(StoreError::NotFound { .. })));
    }

    #[test]
    fn edit_error_wraps_key_error() {
        let key_err = KeyError::Collision {
            id: "oewn-81234567-n".into(),
        };
        let edit_err: EditError = key_err.into();
        assert!(matches!(edit_err, EditError::Key(KeyError::Collision { .. })));
    }

    #[test]
    fn error_display_messages_are_descriptive() {
        let err = KeyError::SatelliteHead {
            synset: "oewn-00001234-s".into(),
            found: 2,
        };
        let msg = format!("{err}");
        assert!(msg.contains("oewn-00001234-s"));
        assert!(msg.contains('2'));
    }
}
