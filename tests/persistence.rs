//! Persistence tests: the durable store and the snapshot cache must give
//! back exactly what was put in, across reopen.

use std::cell::Cell;
use std::fs::File;
use std::time::{Duration, SystemTime};

use lexnet::codec::{xml, yaml};
use lexnet::edit::{EditConfig, Editor, NewSynset};
use lexnet::error::LexnetError;
use lexnet::model::{
    CommentAnchor, Lexicon, LexiconHeader, PartOfSpeech, Synset, SynsetRelType, SynsetRelation,
};
use lexnet::store::LexiconStore;
use lexnet::store::durable::DurableStore;
use lexnet::store::mem::MemStore;
use lexnet::store::snapshot::SnapshotCache;
use tempfile::TempDir;

const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE LexicalResource SYSTEM "http://globalwordnet.github.io/schemas/WN-LMF-1.3.dtd">
<LexicalResource xmlns:dc="https://globalwordnet.github.io/schemas/dc/">
  <Lexicon id="oewn" label="Open English Wordnet" language="en" email="a@b.c" license="CC-BY 4.0" version="2024" url="https://example.org">
    <LexicalEntry id="oewn-run-v">
      <Lemma writtenForm="run" partOfSpeech="v"/>
      <Sense id="oewn-run-v-01926311-01" synset="oewn-01926311-v" n="0" dc:identifier="oewn-run__2.38.01.." subcat="via"/>
    </LexicalEntry>
    <Synset id="oewn-01926311-v" ili="i35560" members="oewn-run-v" partOfSpeech="v" lexfile="verb.motion">
      <Definition>move fast by using one's feet</Definition> <!-- the common sense -->
    </Synset>
    <SyntacticBehaviour id="via" subcategorizationFrame="Somebody ----s"/>
  </Lexicon>
</LexicalResource>
"#;

#[test]
fn durable_import_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("wn.redb");
    let lexicon = xml::read_xml(DOCUMENT, "wn.xml").unwrap();
    assert_eq!(lexicon.comments.len(), 1);

    {
        let mut store = DurableStore::open(&db, 16).unwrap();
        store.import(&lexicon).unwrap();
        store.flush().unwrap();
    }

    let store = DurableStore::open(&db, 16).unwrap();
    let exported = store.export().unwrap();
    assert_eq!(exported, lexicon);
    let sense = store.sense_by_id("oewn-run-v-01926311-01").unwrap().unwrap();
    assert_eq!(sense.key.as_deref(), Some("run%2:38:01::"));
    assert_eq!(sense.subcat, vec!["via"]);
}

#[test]
fn editor_changes_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("wn.redb");

    let (dog, canine) = {
        let store = DurableStore::open(&db, 4).unwrap();
        store.set_header(&LexiconHeader::new("oewn")).unwrap();
        let mut ed = Editor::new(store, EditConfig::default());
        let dog = ed
            .add_synset(NewSynset::new("a domesticated canid", PartOfSpeech::Noun, "noun.animal"))
            .unwrap();
        let canine = ed
            .add_synset(NewSynset::new("a canine", PartOfSpeech::Noun, "noun.animal"))
            .unwrap();
        ed.add_entry(&dog, "dog", None, None).unwrap();
        ed.add_relation(&dog, SynsetRelType::Hypernym, &canine).unwrap();
        ed.flush().unwrap();
        (dog, canine)
    };

    let store = DurableStore::open(&db, 4).unwrap();
    let canine_synset = store.synset_by_id(&canine).unwrap().unwrap();
    assert_eq!(
        canine_synset.targets(SynsetRelType::Hyponym).collect::<Vec<_>>(),
        vec![dog.as_str()]
    );
    assert_eq!(store.entry_by_lemma("dog").unwrap(), vec!["oewn-dog-n"]);
    assert_eq!(store.synset_referrers(&dog).unwrap(), vec![canine.clone()]);
}

#[test]
fn xml_and_db_exports_agree() {
    let dir = TempDir::new().unwrap();
    let lexicon = xml::read_xml(DOCUMENT, "wn.xml").unwrap();
    let mut store = DurableStore::open(&dir.path().join("wn.redb"), 100).unwrap();
    store.import(&lexicon).unwrap();

    let path = dir.path().join("out.xml");
    xml::save_xml(&store.export().unwrap(), &path).unwrap();
    assert_eq!(xml::load_xml(&path).unwrap(), lexicon);
}

fn touch_later(path: &std::path::Path) {
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(60))
        .unwrap();
}

#[test]
fn snapshot_skips_parsing_until_sources_change() {
    let dir = TempDir::new().unwrap();
    let yaml_dir = dir.path().join("yaml");
    let lexicon = xml::read_xml(DOCUMENT, "wn.xml").unwrap();
    yaml::save_yaml(&lexicon, &yaml_dir).unwrap();
    let shard = yaml_dir.join("verb.motion.yaml");
    assert!(shard.exists());

    let cache = SnapshotCache::new(dir.path().join("wn.bin"), vec![shard.clone()]);
    let parses = Cell::new(0);
    let load = || {
        parses.set(parses.get() + 1);
        yaml::load_yaml(&yaml_dir, lexicon.header.clone(), 1 << 20).map_err(LexnetError::from)
    };

    let first: Lexicon = cache.reload_if_stale(load).unwrap();
    let second: Lexicon = cache.reload_if_stale(load).unwrap();
    assert_eq!(parses.get(), 1);
    assert_eq!(first, second);
    assert_eq!(first.synsets, lexicon.synsets);

    touch_later(&shard);
    cache.reload_if_stale(load).unwrap();
    assert_eq!(parses.get(), 2);

    cache.invalidate().unwrap();
    assert!(cache.is_stale().unwrap());
}

#[test]
fn import_replaces_what_the_database_held() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("wn.redb");
    let run = xml::read_xml(DOCUMENT, "wn.xml").unwrap();

    let mut ed = Editor::new(
        MemStore::new(Lexicon::new(LexiconHeader::new("oewn"))),
        EditConfig::default(),
    );
    let stone = ed
        .add_synset(NewSynset::new("a lump of rock", PartOfSpeech::Noun, "noun.object"))
        .unwrap();
    ed.add_entry(&stone, "stone", None, None).unwrap();
    let other = ed.into_store().into_lexicon();

    let mut store = DurableStore::open(&db, 8).unwrap();
    store.import(&run).unwrap();
    store.import(&other).unwrap();
    drop(store);

    let store = DurableStore::open(&db, 8).unwrap();
    assert_eq!(store.export().unwrap(), other);
    assert!(store.entry_by_id("oewn-run-v").unwrap().is_none());
    assert!(store.sense_owner("oewn-run-v-01926311-01").unwrap().is_none());
    assert!(store.comments().unwrap().is_empty());
    assert!(store.frames().unwrap().is_empty());
}

#[test]
fn durable_editor_drops_comments_of_deleted_relations() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("wn.redb");
    let mut lexicon = Lexicon::new(LexiconHeader::new("oewn"));
    let mut warm = Synset::new("oewn-00000001-a", PartOfSpeech::Adjective, "adj.all");
    warm.definitions.push("warm to the touch".into());
    let mut hot = Synset::new("oewn-00000002-a", PartOfSpeech::Adjective, "adj.all");
    hot.definitions.push("mildly hot".into());
    for (from, to) in [(&mut warm, "oewn-00000002-a"), (&mut hot, "oewn-00000001-a")] {
        from.relations.push(SynsetRelation::new(to, SynsetRelType::Also));
        from.relations.push(SynsetRelation::new(to, SynsetRelType::Similar));
    }
    lexicon.comments.add(
        CommentAnchor::synset_relation("oewn-00000001-a", &warm.relations[0]),
        "checked by hand",
    );
    lexicon.comments.add(CommentAnchor::Node("oewn-00000002-a".into()), "kept");
    lexicon.synsets = vec![warm, hot];

    {
        let mut store = DurableStore::open(&db, 4).unwrap();
        store.import(&lexicon).unwrap();
        let mut ed = Editor::new(store, EditConfig::default());
        ed.delete_relation("oewn-00000001-a", "oewn-00000002-a").unwrap();
        ed.add_relation("oewn-00000001-a", SynsetRelType::Antonym, "oewn-00000002-a")
            .unwrap();
        ed.flush().unwrap();
    }

    let store = DurableStore::open(&db, 4).unwrap();
    let comments = store.comments().unwrap();
    assert!(comments.relation("oewn-00000001-a", "oewn-00000002-a").is_empty());
    assert_eq!(comments.node("oewn-00000002-a"), ["kept".to_string()]);
    let text = xml::write_xml(&store.export().unwrap());
    assert!(text.contains(r#"relType="antonym""#));
    assert!(!text.contains("checked by hand"));
}
