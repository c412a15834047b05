//! WN-LMF XML reader and writer.
//!
//! The reader is a single pass over the quick-xml event stream. Comments are
//! attached to anchored elements (entries, senses, synsets and relations) in
//! the same pass: a comment on the same line as an anchor's tag belongs to
//! that anchor, an own-line comment belongs to the next anchor.
//!
//! The writer emits one element per line and puts an anchor's comments at the
//! end of its start tag, which is exactly the layout the reader recognizes.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};

use crate::error::CodecError;
use crate::ident::{map_sense_key, unmap_sense_key};
use crate::model::{
    AdjPosition, CommentAnchor, Comments, Example, ILI_UNASSIGNED, Lemma, LexicalEntry, Lexicon,
    LexiconHeader, PartOfSpeech, Pronunciation, Sense, SenseRelType, SenseRelation, Synset,
    SynsetRelType, SynsetRelation, SyntacticBehaviour,
};

use super::{CodecResult, read_to_string, write_atomic};

const DOCTYPE: &str =
    r#"<!DOCTYPE LexicalResource SYSTEM "http://globalwordnet.github.io/schemas/WN-LMF-1.3.dtd">"#;
const DC_NAMESPACE: &str = "https://globalwordnet.github.io/schemas/dc/";

/// File name prefix of the per-lexfile split.
pub const SPLIT_PREFIX: &str = "wn-";
/// Bucket holding frames and entries without senses in the split layout.
pub const SPLIT_MISC: &str = "lexicon";

fn xml_err(path: &str, err: impl std::fmt::Display) -> CodecError {
    CodecError::Xml {
        path: path.to_string(),
        message: err.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Parse a WN-LMF document. `path` is only used in error messages.
pub fn read_xml(text: &str, path: &str) -> CodecResult<Lexicon> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(false);
    let mut state = LmfReader::new(path);
    loop {
        let event = reader
            .read_event()
            .map_err(|e| xml_err(path, format!("{e} at byte {}", reader.buffer_position())))?;
        match event {
            Event::Start(e) => {
                let name = element_name(&e);
                state.open(&name, &e)?;
                state.stack.push(name);
            }
            Event::Empty(e) => {
                let name = element_name(&e);
                state.open(&name, &e)?;
                state.close(&name)?;
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                state.stack.pop();
                state.close(&name)?;
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(|e| xml_err(path, e))?;
                state.text(&text);
            }
            Event::CData(c) => state.text(&String::from_utf8_lossy(&c)),
            Event::Comment(c) => state.comment(String::from_utf8_lossy(&c).trim()),
            Event::Eof => break,
            _ => {}
        }
    }
    state.finish()
}

/// Read and parse one XML file.
pub fn load_xml(path: &Path) -> CodecResult<Lexicon> {
    let text = read_to_string(path)?;
    let lexicon = read_xml(&text, &path.display().to_string())?;
    tracing::info!(
        path = %path.display(),
        entries = lexicon.entries.len(),
        synsets = lexicon.synsets.len(),
        comments = lexicon.comments.len(),
        "loaded xml"
    );
    Ok(lexicon)
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

/// Attributes of one element, unescaped.
struct Attrs {
    element: String,
    values: Vec<(String, String)>,
}

impl Attrs {
    fn parse(element: &str, e: &BytesStart<'_>, path: &str) -> CodecResult<Self> {
        let mut values = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|err| xml_err(path, err))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(|err| xml_err(path, err))?;
            values.push((key, value.into_owned()));
        }
        Ok(Self {
            element: element.to_string(),
            values,
        })
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn string(&self, name: &str) -> String {
        self.get(name).unwrap_or_default().to_string()
    }

    fn require(&self, element: &'static str, name: &'static str) -> CodecResult<String> {
        debug_assert_eq!(self.element, element);
        self.get(name)
            .map(str::to_string)
            .ok_or(CodecError::MissingAttribute {
                element,
                attribute: name,
            })
    }
}

/// Which text-bearing element is open.
enum TextSlot {
    Definition,
    IliDefinition,
    Example { source: Option<String> },
    Pronunciation { variety: Option<String> },
}

/// Same-line / next-anchor comment association.
#[derive(Default)]
struct CommentTracker {
    line_anchor: Option<CommentAnchor>,
    pending: Vec<String>,
    comments: Comments,
}

impl CommentTracker {
    fn anchor(&mut self, anchor: CommentAnchor) {
        for text in self.pending.drain(..) {
            self.comments.add(anchor.clone(), text);
        }
        self.line_anchor = Some(anchor);
    }

    fn newline(&mut self) {
        self.line_anchor = None;
    }

    fn comment(&mut self, text: &str) {
        match &self.line_anchor {
            Some(anchor) => self.comments.add(anchor.clone(), text),
            None => self.pending.push(text.to_string()),
        }
    }
}

struct LmfReader<'p> {
    path: &'p str,
    lexicon: Lexicon,
    stack: Vec<String>,
    entry: Option<LexicalEntry>,
    sense: Option<Sense>,
    synset: Option<Synset>,
    slot: Option<TextSlot>,
    buffer: String,
    tracker: CommentTracker,
}

impl<'p> LmfReader<'p> {
    fn new(path: &'p str) -> Self {
        Self {
            path,
            lexicon: Lexicon::new(LexiconHeader::new("")),
            stack: Vec::new(),
            entry: None,
            sense: None,
            synset: None,
            slot: None,
            buffer: String::new(),
            tracker: CommentTracker::default(),
        }
    }

    fn unexpected(&self, element: &str) -> CodecError {
        CodecError::UnexpectedElement {
            element: element.to_string(),
            parent: self
                .stack
                .last()
                .cloned()
                .unwrap_or_else(|| "document".into()),
        }
    }

    fn entry_mut(&mut self, element: &str) -> CodecResult<&mut LexicalEntry> {
        if self.sense.is_some() || self.entry.is_none() {
            return Err(self.unexpected(element));
        }
        let parent = self.stack.last().cloned().unwrap_or_default();
        self.entry
            .as_mut()
            .ok_or_else(|| CodecError::UnexpectedElement {
                element: element.to_string(),
                parent,
            })
    }

    fn open(&mut self, name: &str, e: &BytesStart<'_>) -> CodecResult<()> {
        let attrs = Attrs::parse(name, e, self.path)?;
        match name {
            "LexicalResource" => {}
            "Lexicon" => self.lexicon.header = read_header(&attrs)?,
            "LexicalEntry" => {
                let id = attrs.require("LexicalEntry", "id")?;
                self.tracker.anchor(CommentAnchor::Node(id.clone()));
                self.entry = Some(LexicalEntry::new(id, "", PartOfSpeech::Unknown));
            }
            "Lemma" => {
                let lemma = Lemma {
                    written_form: attrs.require("Lemma", "writtenForm")?,
                    part_of_speech: attrs.require("Lemma", "partOfSpeech")?.parse()?,
                };
                self.entry_mut(name)?.lemma = lemma;
            }
            "Pronunciation" => {
                if self.entry.is_none() {
                    return Err(self.unexpected(name));
                }
                self.begin_text(TextSlot::Pronunciation {
                    variety: attrs.get("variety").map(str::to_string),
                });
            }
            "Form" => {
                let form = attrs.require("Form", "writtenForm")?;
                self.entry_mut(name)?.forms.push(form);
            }
            "Sense" => {
                let ns = self.lexicon.header.id.clone();
                let position = self.entry_mut(name)?.senses.len();
                let mut sense = Sense::new(
                    attrs.require("Sense", "id")?,
                    attrs.require("Sense", "synset")?,
                    position,
                );
                if let Some(n) = attrs.get("n") {
                    sense.n = n
                        .parse()
                        .map_err(|_| xml_err(self.path, format!("bad sense ordinal n=\"{n}\"")))?;
                }
                if let Some(mapped) = attrs.get("dc:identifier") {
                    sense.key = Some(unmap_sense_key(&ns, mapped)?);
                }
                if let Some(pos) = attrs.get("adjposition") {
                    sense.adjposition = Some(pos.parse::<AdjPosition>()?);
                }
                if let Some(subcat) = attrs.get("subcat") {
                    sense.subcat = subcat.split_whitespace().map(str::to_string).collect();
                }
                self.tracker.anchor(CommentAnchor::Node(sense.id.clone()));
                self.sense = Some(sense);
            }
            "SenseRelation" => {
                let rel_type: SenseRelType = attrs.require("SenseRelation", "relType")?.parse()?;
                let mut relation =
                    SenseRelation::new(attrs.require("SenseRelation", "target")?, rel_type);
                relation.other_type = attrs.get("dc:type").map(str::to_string);
                let Some(sense) = self.sense.as_mut() else {
                    return Err(self.unexpected(name));
                };
                let anchor = CommentAnchor::sense_relation(&sense.id, &relation);
                sense.relations.push(relation);
                self.tracker.anchor(anchor);
            }
            "Synset" => {
                if self.entry.is_some() || self.synset.is_some() {
                    return Err(self.unexpected(name));
                }
                let mut synset = Synset::new(
                    attrs.require("Synset", "id")?,
                    attrs.require("Synset", "partOfSpeech")?.parse()?,
                    attrs.string("lexfile"),
                );
                synset.ili = attrs.get("ili").unwrap_or(ILI_UNASSIGNED).to_string();
                synset.members = attrs
                    .get("members")
                    .unwrap_or_default()
                    .split_whitespace()
                    .map(str::to_string)
                    .collect();
                synset.source = attrs.get("dc:source").map(str::to_string);
                self.tracker.anchor(CommentAnchor::Node(synset.id.clone()));
                self.synset = Some(synset);
            }
            "Definition" | "ILIDefinition" | "Example" => {
                if self.synset.is_none() {
                    return Err(self.unexpected(name));
                }
                self.begin_text(match name {
                    "Definition" => TextSlot::Definition,
                    "ILIDefinition" => TextSlot::IliDefinition,
                    _ => TextSlot::Example {
                        source: attrs.get("dc:source").map(str::to_string),
                    },
                });
            }
            "SynsetRelation" => {
                let rel_type: SynsetRelType = attrs.require("SynsetRelation", "relType")?.parse()?;
                let target = attrs.require("SynsetRelation", "target")?;
                let Some(synset) = self.synset.as_mut() else {
                    return Err(self.unexpected(name));
                };
                let relation = SynsetRelation::new(target, rel_type);
                let anchor = CommentAnchor::synset_relation(&synset.id, &relation);
                synset.relations.push(relation);
                self.tracker.anchor(anchor);
            }
            "SyntacticBehaviour" => {
                self.lexicon.frames.push(SyntacticBehaviour {
                    id: attrs.require("SyntacticBehaviour", "id")?,
                    frame: attrs.require("SyntacticBehaviour", "subcategorizationFrame")?,
                });
            }
            _ => return Err(self.unexpected(name)),
        }
        Ok(())
    }

    fn close(&mut self, name: &str) -> CodecResult<()> {
        match name {
            "LexicalEntry" => {
                if let Some(entry) = self.entry.take() {
                    self.tracker.line_anchor = Some(CommentAnchor::Node(entry.id.clone()));
                    self.lexicon.entries.push(entry);
                }
            }
            "Sense" => {
                if let Some(sense) = self.sense.take() {
                    self.tracker.line_anchor = Some(CommentAnchor::Node(sense.id.clone()));
                    if let Some(entry) = self.entry.as_mut() {
                        entry.senses.push(sense);
                    }
                }
            }
            "Synset" => {
                if let Some(synset) = self.synset.take() {
                    self.tracker.line_anchor = Some(CommentAnchor::Node(synset.id.clone()));
                    self.lexicon.synsets.push(synset);
                }
            }
            "Definition" | "ILIDefinition" | "Example" | "Pronunciation" => self.end_text(),
            _ => {}
        }
        Ok(())
    }

    fn begin_text(&mut self, slot: TextSlot) {
        self.slot = Some(slot);
        self.buffer.clear();
    }

    fn end_text(&mut self) {
        let text = std::mem::take(&mut self.buffer);
        match self.slot.take() {
            Some(TextSlot::Definition) => {
                if let Some(s) = self.synset.as_mut() {
                    s.definitions.push(text);
                }
            }
            Some(TextSlot::IliDefinition) => {
                if let Some(s) = self.synset.as_mut() {
                    s.ili_definition = Some(text);
                }
            }
            Some(TextSlot::Example { source }) => {
                if let Some(s) = self.synset.as_mut() {
                    s.examples.push(Example { text, source });
                }
            }
            Some(TextSlot::Pronunciation { variety }) => {
                if let Some(e) = self.entry.as_mut() {
                    e.pronunciations.push(Pronunciation {
                        value: text,
                        variety,
                    });
                }
            }
            None => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.slot.is_some() {
            self.buffer.push_str(text);
        }
        if text.contains('\n') {
            self.tracker.newline();
        }
    }

    fn comment(&mut self, text: &str) {
        self.tracker.comment(text);
    }

    fn finish(mut self) -> CodecResult<Lexicon> {
        if !self.tracker.pending.is_empty() {
            tracing::warn!(
                path = self.path,
                count = self.tracker.pending.len(),
                "dropping trailing comments with no following element"
            );
        }
        if self.lexicon.header.id.is_empty() {
            return Err(CodecError::MissingAttribute {
                element: "Lexicon",
                attribute: "id",
            });
        }
        self.lexicon.comments = self.tracker.comments;
        Ok(self.lexicon)
    }
}

fn read_header(attrs: &Attrs) -> CodecResult<LexiconHeader> {
    Ok(LexiconHeader {
        id: attrs.require("Lexicon", "id")?,
        label: attrs.string("label"),
        language: attrs.string("language"),
        email: attrs.string("email"),
        license: attrs.string("license"),
        version: attrs.string("version"),
        citation: attrs.get("citation").map(str::to_string),
        url: attrs.string("url"),
    })
}

// ---------------------------------------------------------------------------
// Document order
// ---------------------------------------------------------------------------

/// Positions of nodes and relations in an existing document.
///
/// Applied before writing so that regenerating a file keeps its order and
/// only new items move to the end.
#[derive(Debug, Default, Clone)]
pub struct DocumentOrder {
    entries: HashMap<String, usize>,
    senses: HashMap<String, usize>,
    synsets: HashMap<String, usize>,
    relations: HashMap<(String, String), usize>,
}

impl DocumentOrder {
    pub fn of(lexicon: &Lexicon) -> Self {
        let mut order = Self::default();
        for (i, entry) in lexicon.entries.iter().enumerate() {
            order.entries.insert(entry.id.clone(), i);
            for (j, sense) in entry.senses.iter().enumerate() {
                order.senses.insert(sense.id.clone(), j);
                for (k, r) in sense.relations.iter().enumerate() {
                    order
                        .relations
                        .entry((sense.id.clone(), r.target.clone()))
                        .or_insert(k);
                }
            }
        }
        for (i, synset) in lexicon.synsets.iter().enumerate() {
            order.synsets.insert(synset.id.clone(), i);
            for (k, r) in synset.relations.iter().enumerate() {
                order
                    .relations
                    .entry((synset.id.clone(), r.target.clone()))
                    .or_insert(k);
            }
        }
        order
    }

    fn rank(map: &HashMap<String, usize>, id: &str) -> usize {
        map.get(id).copied().unwrap_or(usize::MAX)
    }

    fn relation_rank(&self, source: &str, target: &str) -> usize {
        self.relations
            .get(&(source.to_string(), target.to_string()))
            .copied()
            .unwrap_or(usize::MAX)
    }

    /// Reorder `lexicon` in place. Sorting is stable, so unknown items keep
    /// their relative order after all known ones. Member lists are literal
    /// and never reordered.
    pub fn apply(&self, lexicon: &mut Lexicon) {
        lexicon
            .entries
            .sort_by_key(|e| Self::rank(&self.entries, &e.id));
        for entry in &mut lexicon.entries {
            entry.senses.sort_by_key(|s| Self::rank(&self.senses, &s.id));
            for sense in &mut entry.senses {
                let source = sense.id.clone();
                sense
                    .relations
                    .sort_by_key(|r| self.relation_rank(&source, &r.target));
            }
        }
        lexicon
            .synsets
            .sort_by_key(|s| Self::rank(&self.synsets, &s.id));
        for synset in &mut lexicon.synsets {
            let source = synset.id.clone();
            synset
                .relations
                .sort_by_key(|r| self.relation_rank(&source, &r.target));
        }
    }
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

struct XmlWriter<'a> {
    out: String,
    comments: &'a Comments,
}

impl<'a> XmlWriter<'a> {
    fn indent(&mut self, depth: usize) {
        for _ in 0..depth {
            self.out.push_str("  ");
        }
    }

    fn tag(&mut self, name: &str, attrs: &[(&str, &str)]) {
        self.out.push('<');
        self.out.push_str(name);
        for (key, value) in attrs {
            self.out.push(' ');
            self.out.push_str(key);
            self.out.push_str("=\"");
            self.out.push_str(&escape(*value));
            self.out.push('"');
        }
    }

    fn start(
        &mut self,
        depth: usize,
        name: &str,
        attrs: &[(&str, &str)],
        empty: bool,
        anchor: Option<&CommentAnchor>,
    ) {
        self.indent(depth);
        self.tag(name, attrs);
        self.out.push_str(if empty { "/>" } else { ">" });
        if let Some(anchor) = anchor {
            for text in self.comments.get(anchor) {
                self.out.push_str(" <!-- ");
                self.out.push_str(&sanitize_comment(text));
                self.out.push_str(" -->");
            }
        }
        self.out.push('\n');
    }

    fn text_element(&mut self, depth: usize, name: &str, attrs: &[(&str, &str)], text: &str) {
        self.indent(depth);
        self.tag(name, attrs);
        self.out.push('>');
        self.out.push_str(&escape(text));
        self.out.push_str("</");
        self.out.push_str(name);
        self.out.push_str(">\n");
    }

    fn end(&mut self, depth: usize, name: &str) {
        self.indent(depth);
        self.out.push_str("</");
        self.out.push_str(name);
        self.out.push_str(">\n");
    }
}

fn sanitize_comment(text: &str) -> String {
    let mut out = text.replace("--", "- -");
    if out.ends_with('-') {
        out.push(' ');
    }
    out
}

/// Render a lexicon as a WN-LMF document, in the lexicon's own order.
pub fn write_xml(lexicon: &Lexicon) -> String {
    let ns = lexicon.namespace();
    let mut w = XmlWriter {
        out: String::new(),
        comments: &lexicon.comments,
    };
    w.out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    w.out.push_str(DOCTYPE);
    w.out.push('\n');
    w.start(0, "LexicalResource", &[("xmlns:dc", DC_NAMESPACE)], false, None);

    let h = &lexicon.header;
    let mut attrs = vec![
        ("id", h.id.as_str()),
        ("label", h.label.as_str()),
        ("language", h.language.as_str()),
        ("email", h.email.as_str()),
        ("license", h.license.as_str()),
        ("version", h.version.as_str()),
    ];
    if let Some(citation) = &h.citation {
        attrs.push(("citation", citation.as_str()));
    }
    attrs.push(("url", h.url.as_str()));
    w.start(1, "Lexicon", &attrs, false, None);

    for entry in &lexicon.entries {
        write_entry(&mut w, ns, entry);
    }
    for synset in &lexicon.synsets {
        write_synset(&mut w, synset);
    }
    for frame in &lexicon.frames {
        w.start(
            2,
            "SyntacticBehaviour",
            &[("id", frame.id.as_str()), ("subcategorizationFrame", frame.frame.as_str())],
            true,
            None,
        );
    }

    w.end(1, "Lexicon");
    w.end(0, "LexicalResource");
    w.out
}

fn write_entry(w: &mut XmlWriter<'_>, ns: &str, entry: &LexicalEntry) {
    w.start(
        2,
        "LexicalEntry",
        &[("id", entry.id.as_str())],
        false,
        Some(&CommentAnchor::Node(entry.id.clone())),
    );
    let pos = entry.lemma.part_of_speech.as_char().to_string();
    let lemma_attrs = [
        ("writtenForm", entry.lemma.written_form.as_str()),
        ("partOfSpeech", pos.as_str()),
    ];
    if entry.pronunciations.is_empty() {
        w.start(3, "Lemma", &lemma_attrs, true, None);
    } else {
        w.start(3, "Lemma", &lemma_attrs, false, None);
        for p in &entry.pronunciations {
            match &p.variety {
                Some(v) => w.text_element(4, "Pronunciation", &[("variety", v.as_str())], &p.value),
                None => w.text_element(4, "Pronunciation", &[], &p.value),
            }
        }
        w.end(3, "Lemma");
    }
    for form in &entry.forms {
        w.start(3, "Form", &[("writtenForm", form.as_str())], true, None);
    }
    for sense in &entry.senses {
        write_sense(w, ns, sense);
    }
    w.end(2, "LexicalEntry");
}

fn write_sense(w: &mut XmlWriter<'_>, ns: &str, sense: &Sense) {
    let n = sense.n.to_string();
    let mapped = sense.key.as_deref().map(|k| map_sense_key(ns, k));
    let subcat = sense.subcat.join(" ");
    let mut attrs = vec![
        ("id", sense.id.as_str()),
        ("synset", sense.synset.as_str()),
        ("n", n.as_str()),
    ];
    if let Some(mapped) = &mapped {
        attrs.push(("dc:identifier", mapped.as_str()));
    }
    if let Some(adj) = sense.adjposition {
        attrs.push(("adjposition", adj.as_str()));
    }
    if !subcat.is_empty() {
        attrs.push(("subcat", subcat.as_str()));
    }
    let anchor = CommentAnchor::Node(sense.id.clone());
    if sense.relations.is_empty() {
        w.start(3, "Sense", &attrs, true, Some(&anchor));
        return;
    }
    w.start(3, "Sense", &attrs, false, Some(&anchor));
    for r in &sense.relations {
        let mut attrs = vec![("relType", r.rel_type.name()), ("target", r.target.as_str())];
        if let Some(other) = &r.other_type {
            attrs.push(("dc:type", other.as_str()));
        }
        let anchor = CommentAnchor::sense_relation(&sense.id, r);
        w.start(4, "SenseRelation", &attrs, true, Some(&anchor));
    }
    w.end(3, "Sense");
}

fn write_synset(w: &mut XmlWriter<'_>, synset: &Synset) {
    let members = synset.members.join(" ");
    let pos = synset.part_of_speech.as_char().to_string();
    let mut attrs = vec![
        ("id", synset.id.as_str()),
        ("ili", synset.ili.as_str()),
        ("members", members.as_str()),
        ("partOfSpeech", pos.as_str()),
        ("lexfile", synset.lexfile.as_str()),
    ];
    if let Some(source) = &synset.source {
        attrs.push(("dc:source", source.as_str()));
    }
    let anchor = CommentAnchor::Node(synset.id.clone());
    let empty = synset.definitions.is_empty()
        && synset.ili_definition.is_none()
        && synset.relations.is_empty()
        && synset.examples.is_empty();
    w.start(2, "Synset", &attrs, empty, Some(&anchor));
    if empty {
        return;
    }
    for d in &synset.definitions {
        w.text_element(3, "Definition", &[], d);
    }
    if let Some(d) = &synset.ili_definition {
        w.text_element(3, "ILIDefinition", &[], d);
    }
    for r in &synset.relations {
        let anchor = CommentAnchor::synset_relation(&synset.id, r);
        w.start(
            3,
            "SynsetRelation",
            &[("relType", r.rel_type.name()), ("target", r.target.as_str())],
            true,
            Some(&anchor),
        );
    }
    for ex in &synset.examples {
        match &ex.source {
            Some(source) => w.text_element(3, "Example", &[("dc:source", source.as_str())], &ex.text),
            None => w.text_element(3, "Example", &[], &ex.text),
        }
    }
    w.end(2, "Synset");
}

/// Write `lexicon` to `path`, keeping the order of the file being replaced.
pub fn save_xml(lexicon: &Lexicon, path: &Path) -> CodecResult<()> {
    let mut ordered = Cow::Borrowed(lexicon);
    if path.exists() {
        match load_xml(path) {
            Ok(previous) => DocumentOrder::of(&previous).apply(ordered.to_mut()),
            Err(e) => tracing::warn!(
                path = %path.display(),
                error = %e,
                "existing file unreadable, writing in lexicon order"
            ),
        }
    }
    write_atomic(path, &write_xml(&ordered))?;
    tracing::info!(
        path = %path.display(),
        entries = lexicon.entries.len(),
        synsets = lexicon.synsets.len(),
        "saved xml"
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Per-lexfile split
// ---------------------------------------------------------------------------

fn split_path(dir: &Path, bucket: &str) -> PathBuf {
    dir.join(format!("{SPLIT_PREFIX}{bucket}.xml"))
}

fn is_split_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(SPLIT_PREFIX) && n.ends_with(".xml"))
}

/// Partition a lexicon into one lexicon per lexicographer file.
///
/// Synsets go to their lexfile, senses follow their synset, and an entry
/// appears in every bucket that holds one of its senses. Frames and entries
/// without senses go to the [`SPLIT_MISC`] bucket.
pub fn split_by_lexfile(lexicon: &Lexicon) -> BTreeMap<String, Lexicon> {
    let mut buckets: BTreeMap<String, Lexicon> = BTreeMap::new();
    let mut home: HashMap<&str, String> = HashMap::new();
    let lexfile_of: HashMap<&str, &str> = lexicon
        .synsets
        .iter()
        .map(|s| (s.id.as_str(), s.lexfile.as_str()))
        .collect();

    for synset in &lexicon.synsets {
        let name = lexfile_or_misc(&synset.lexfile);
        home.insert(&synset.id, name.clone());
        buckets
            .entry(name)
            .or_insert_with(|| Lexicon::new(lexicon.header.clone()))
            .synsets
            .push(synset.clone());
    }

    for entry in &lexicon.entries {
        let mut parts: Vec<(String, LexicalEntry)> = Vec::new();
        for sense in &entry.senses {
            let name = lexfile_or_misc(lexfile_of.get(sense.synset.as_str()).copied().unwrap_or(""));
            home.insert(&sense.id, name.clone());
            match parts.iter_mut().find(|(n, _)| *n == name) {
                Some((_, part)) => part.senses.push(sense.clone()),
                None => {
                    let mut part = entry.clone();
                    part.senses = vec![sense.clone()];
                    parts.push((name, part));
                }
            }
        }
        if parts.is_empty() {
            parts.push((SPLIT_MISC.to_string(), entry.clone()));
        }
        home.insert(&entry.id, parts[0].0.clone());
        for (name, part) in parts {
            buckets
                .entry(name)
                .or_insert_with(|| Lexicon::new(lexicon.header.clone()))
                .entries
                .push(part);
        }
    }

    let misc = buckets
        .entry(SPLIT_MISC.to_string())
        .or_insert_with(|| Lexicon::new(lexicon.header.clone()));
    misc.frames = lexicon.frames.clone();

    for (anchor, texts) in lexicon.comments.iter() {
        let owner = match anchor {
            CommentAnchor::Node(id) => id.as_str(),
            CommentAnchor::Relation { source, .. } => source.as_str(),
        };
        let name = home
            .get(owner)
            .cloned()
            .unwrap_or_else(|| SPLIT_MISC.to_string());
        if let Some(b) = buckets.get_mut(&name) {
            for text in texts {
                b.comments.add(anchor.clone(), text.clone());
            }
        }
    }
    buckets
}

fn lexfile_or_misc(lexfile: &str) -> String {
    if lexfile.is_empty() {
        SPLIT_MISC.to_string()
    } else {
        lexfile.to_string()
    }
}

/// Write one `wn-<lexfile>.xml` per lexicographer file into `dir`, removing
/// split files whose lexfile no longer exists. Returns the number of files.
pub fn save_xml_dir(lexicon: &Lexicon, dir: &Path) -> CodecResult<usize> {
    std::fs::create_dir_all(dir).map_err(super::io_err(dir))?;
    let buckets = split_by_lexfile(lexicon);
    let mut written = HashSet::new();
    for (name, part) in &buckets {
        let path = split_path(dir, name);
        save_xml(part, &path)?;
        written.insert(path);
    }
    for stale in list_split_files(dir)? {
        if !written.contains(&stale) {
            std::fs::remove_file(&stale).map_err(super::io_err(&stale))?;
            tracing::info!(path = %stale.display(), "removed stale split file");
        }
    }
    Ok(buckets.len())
}

fn list_split_files(dir: &Path) -> CodecResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(super::io_err(dir))? {
        let path = entry.map_err(super::io_err(dir))?.path();
        if is_split_file(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Load and merge every split file in `dir`.
pub fn load_xml_dir(dir: &Path) -> CodecResult<Lexicon> {
    let files = list_split_files(dir)?;
    let mut merged: Option<Lexicon> = None;
    let mut entry_pos: HashMap<String, usize> = HashMap::new();
    let mut synset_ids: HashSet<String> = HashSet::new();
    let mut frame_ids: HashSet<String> = HashSet::new();

    for path in &files {
        let part = load_xml(path)?;
        let target = merged.get_or_insert_with(|| Lexicon::new(part.header.clone()));
        for entry in part.entries {
            match entry_pos.get(&entry.id) {
                Some(&i) => {
                    let existing = &mut target.entries[i];
                    for form in entry.forms {
                        if !existing.forms.contains(&form) {
                            existing.forms.push(form);
                        }
                    }
                    for p in entry.pronunciations {
                        if !existing.pronunciations.contains(&p) {
                            existing.pronunciations.push(p);
                        }
                    }
                    existing.senses.extend(entry.senses);
                }
                None => {
                    entry_pos.insert(entry.id.clone(), target.entries.len());
                    target.entries.push(entry);
                }
            }
        }
        for synset in part.synsets {
            if !synset_ids.insert(synset.id.clone()) {
                return Err(CodecError::Duplicate {
                    what: "synset",
                    id: synset.id,
                });
            }
            target.synsets.push(synset);
        }
        for frame in part.frames {
            if frame_ids.insert(frame.id.clone()) {
                target.frames.push(frame);
            }
        }
        target.comments.extend(part.comments);
    }

    let mut lexicon = merged.ok_or_else(|| CodecError::Io {
        path: dir.display().to_string(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "no split files"),
    })?;
    for entry in &mut lexicon.entries {
        entry.senses.sort_by_key(|s| s.n);
    }
    tracing::info!(
        dir = %dir.display(),
        files = files.len(),
        entries = lexicon.entries.len(),
        synsets = lexicon.synsets.len(),
        "loaded split xml"
    );
    Ok(lexicon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE LexicalResource SYSTEM "http://globalwordnet.github.io/schemas/WN-LMF-1.3.dtd">
<LexicalResource xmlns:dc="https://globalwordnet.github.io/schemas/dc/">
  <Lexicon id="oewn" label="Open English Wordnet" language="en" email="a@b.c" license="CC-BY 4.0" version="2024" url="https://example.org">
    <!-- the canine -->
    <LexicalEntry id="oewn-dog-n">
      <Lemma writtenForm="dog" partOfSpeech="n">
        <Pronunciation variety="GB">dɒɡ</Pronunciation>
      </Lemma>
      <Form writtenForm="dogs"/>
      <Sense id="oewn-dog-n-02086723-01" synset="oewn-02086723-n" n="0" dc:identifier="oewn-dog__1.05.00.."/> <!-- main sense -->
    </LexicalEntry>
    <Synset id="oewn-02086723-n" ili="i46360" members="oewn-dog-n" partOfSpeech="n" lexfile="noun.animal">
      <Definition>a member of the genus &lt;Canis&gt;</Definition>
      <SynsetRelation relType="hypernym" target="oewn-02085998-n"/> <!-- checked 2024 -->
      <Example dc:source="Kipling">the dog barked &amp; ran</Example>
    </Synset>
    <Synset id="oewn-02085998-n" ili="in" members="" partOfSpeech="n" lexfile="noun.animal">
      <Definition>a canine</Definition>
      <SynsetRelation relType="hyponym" target="oewn-02086723-n"/>
    </Synset>
    <SyntacticBehaviour id="via" subcategorizationFrame="Somebody ----s"/>
  </Lexicon>
</LexicalResource>
"#;

    #[test]
    fn reads_sample_document() {
        let lex = read_xml(SAMPLE, "sample.xml").unwrap();
        assert_eq!(lex.header.id, "oewn");
        assert_eq!(lex.header.citation, None);
        let dog = &lex.entries[0];
        assert_eq!(dog.lemma.written_form, "dog");
        assert_eq!(dog.forms, vec!["dogs"]);
        assert_eq!(dog.pronunciations[0].variety.as_deref(), Some("GB"));
        assert_eq!(dog.senses[0].key.as_deref(), Some("dog%1:05:00::"));
        let synset = &lex.synsets[0];
        assert_eq!(synset.definitions[0], "a member of the genus <Canis>");
        assert_eq!(synset.examples[0].text, "the dog barked & ran");
        assert_eq!(synset.examples[0].source.as_deref(), Some("Kipling"));
        assert_eq!(synset.members, vec!["oewn-dog-n"]);
        assert!(lex.synsets[1].members.is_empty());
        assert_eq!(lex.frames[0].frame, "Somebody ----s");
    }

    #[test]
    fn comments_attach_to_anchors() {
        let lex = read_xml(SAMPLE, "sample.xml").unwrap();
        assert_eq!(lex.comments.node("oewn-dog-n"), ["the canine".to_string()]);
        assert_eq!(
            lex.comments.node("oewn-dog-n-02086723-01"),
            ["main sense".to_string()]
        );
        assert_eq!(
            lex.comments.relation("oewn-02086723-n", "oewn-02085998-n"),
            ["checked 2024"]
        );
        assert_eq!(lex.comments.len(), 3);
    }

    #[test]
    fn write_then_read_is_lossless() {
        let lex = read_xml(SAMPLE, "sample.xml").unwrap();
        let text = write_xml(&lex);
        let back = read_xml(&text, "rewritten.xml").unwrap();
        assert_eq!(back, lex);
        assert!(text.contains("<!-- checked 2024 -->"));
        assert!(text.contains("&lt;Canis&gt;"));
    }

    #[test]
    fn comment_dashes_are_sanitized() {
        let mut lex = read_xml(SAMPLE, "sample.xml").unwrap();
        lex.comments
            .add(CommentAnchor::Node("oewn-02085998-n".into()), "a -- b");
        let back = read_xml(&write_xml(&lex), "x").unwrap();
        assert_eq!(back.comments.node("oewn-02085998-n"), ["a - - b".to_string()]);
    }

    #[test]
    fn unknown_element_is_rejected() {
        let bad = SAMPLE.replace("<Form writtenForm=\"dogs\"/>", "<Tag>x</Tag>");
        let err = read_xml(&bad, "bad.xml").unwrap_err();
        assert!(matches!(err, CodecError::UnexpectedElement { ref element, .. } if element == "Tag"));
    }

    #[test]
    fn missing_required_attribute_is_reported() {
        let bad = SAMPLE.replace(r#"<Synset id="oewn-02085998-n""#, "<Synset");
        let err = read_xml(&bad, "bad.xml").unwrap_err();
        assert!(matches!(
            err,
            CodecError::MissingAttribute {
                element: "Synset",
                attribute: "id"
            }
        ));
    }

    #[test]
    fn save_keeps_existing_order_and_appends_new() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wn.xml");
        let lex = read_xml(SAMPLE, "sample.xml").unwrap();
        save_xml(&lex, &path).unwrap();

        let mut shuffled = lex.clone();
        shuffled.synsets.reverse();
        let mut fresh = Synset::new("oewn-00000001-n", PartOfSpeech::Noun, "noun.animal");
        fresh.definitions.push("new".into());
        shuffled.synsets.insert(0, fresh);
        save_xml(&shuffled, &path).unwrap();

        let back = load_xml(&path).unwrap();
        let ids: Vec<&str> = back.synsets.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["oewn-02086723-n", "oewn-02085998-n", "oewn-00000001-n"]);
    }

    #[test]
    fn split_dir_round_trip_merges_entries() {
        let dir = TempDir::new().unwrap();
        let mut lex = read_xml(SAMPLE, "sample.xml").unwrap();
        let mut verb = Synset::new("oewn-01047745-v", PartOfSpeech::Verb, "verb.motion");
        verb.definitions.push("chase".into());
        verb.members.push("oewn-dog-v".into());
        lex.synsets.push(verb);
        let mut dog_v = LexicalEntry::new("oewn-dog-v", "dog", PartOfSpeech::Verb);
        dog_v
            .senses
            .push(Sense::new("oewn-dog-v-01047745-01", "oewn-01047745-v", 0));
        lex.entries.push(dog_v);

        let files = save_xml_dir(&lex, dir.path()).unwrap();
        assert_eq!(files, 3);
        assert!(dir.path().join("wn-noun.animal.xml").exists());
        assert!(dir.path().join("wn-verb.motion.xml").exists());
        assert!(dir.path().join("wn-lexicon.xml").exists());

        let back = load_xml_dir(dir.path()).unwrap();
        assert_eq!(back.entries.len(), 2);
        assert_eq!(back.synsets.len(), 3);
        assert_eq!(back.frames, lex.frames);
        assert_eq!(back.comments, lex.comments);
        let dog = back.entries.iter().find(|e| e.id == "oewn-dog-n").unwrap();
        assert_eq!(dog, &lex.entries[0]);
    }

    #[test]
    fn split_dir_removes_stale_files() {
        let dir = TempDir::new().unwrap();
        let lex = read_xml(SAMPLE, "sample.xml").unwrap();
        std::fs::write(dir.path().join("wn-verb.stative.xml"), "stale").unwrap();
        save_xml_dir(&lex, dir.path()).unwrap();
        assert!(!dir.path().join("wn-verb.stative.xml").exists());
    }
}
