//! End-to-end tests for editing and validation.
//!
//! These drive the public editor API against the in-memory backend and then
//! check the result with the validator, the way a curation session would.

use lexnet::edit::{EditConfig, Editor, NewSynset, Operation};
use lexnet::error::EditError;
use lexnet::ident::{map_sense_key, unmap_sense_key};
use lexnet::model::{Lexicon, LexiconHeader, PartOfSpeech, SenseRelType, SynsetRelType};
use lexnet::store::LexiconStore;
use lexnet::store::mem::MemStore;
use lexnet::validate::{ValidateConfig, ViolationKind, validate};

fn editor() -> Editor<MemStore> {
    Editor::new(
        MemStore::new(Lexicon::new(LexiconHeader::new("oewn"))),
        EditConfig::default(),
    )
}

fn noun(ed: &mut Editor<MemStore>, definition: &str) -> String {
    ed.add_synset(NewSynset::new(definition, PartOfSpeech::Noun, "noun.animal"))
        .unwrap()
}

#[test]
fn dog_mammal_scenario() {
    let mut ed = editor();
    let s1 = noun(&mut ed, "a domesticated carnivore");
    ed.add_entry(&s1, "dog", Some(0), None).unwrap();
    let s2 = noun(&mut ed, "any mammal");
    ed.add_relation(&s1, SynsetRelType::Hypernym, &s2).unwrap();

    let mammal = ed.store().synset_by_id(&s2).unwrap().unwrap();
    assert_eq!(mammal.targets(SynsetRelType::Hyponym).collect::<Vec<_>>(), vec![s1.as_str()]);
    drop(mammal);

    ed.delete_entry(&s1, "dog").unwrap();
    assert!(ed.store().entry_by_id("oewn-dog-n").unwrap().is_none());
    let s1_after = ed.store().synset_by_id(&s1).unwrap().unwrap().into_owned();
    assert!(s1_after.members.is_empty());
    assert_eq!(s1_after.targets(SynsetRelType::Hypernym).count(), 1);

    let report = validate(ed.store(), &ValidateConfig { roots: vec![s2.clone()] }).unwrap();
    let empty: Vec<_> = report
        .violations
        .iter()
        .filter(|v| v.node == s1 && v.message == "synset has no members")
        .collect();
    assert_eq!(empty.len(), 1);
    assert_eq!(empty[0].kind, ViolationKind::Structure);
    assert_eq!(
        empty[0].fix,
        Some(Operation::DeleteSynset { synset: s1.clone() })
    );
}

#[test]
fn fixing_empty_synsets_leaves_a_clean_lexicon() {
    let mut ed = editor();
    let s1 = noun(&mut ed, "a domesticated carnivore");
    let s2 = noun(&mut ed, "any mammal");
    ed.add_entry(&s1, "dog", None, None).unwrap();
    ed.add_entry(&s2, "mammal", None, None).unwrap();
    ed.add_relation(&s1, SynsetRelType::Hypernym, &s2).unwrap();
    ed.delete_entry(&s1, "dog").unwrap();

    let config = ValidateConfig { roots: vec![s2.clone()] };
    let report = validate(ed.store(), &config).unwrap();
    ed.apply_all(&report.fixes()).unwrap();

    assert!(ed.store().synset_by_id(&s1).unwrap().is_none());
    let mammal = ed.store().synset_by_id(&s2).unwrap().unwrap();
    assert!(mammal.relations.is_empty());
}

#[test]
fn run_sense_key_and_mapping() {
    let mut ed = editor();
    let synset = ed
        .add_synset(NewSynset::new(
            "move fast by using one's feet",
            PartOfSpeech::Verb,
            "verb.motion",
        ))
        .unwrap();
    let sense_id = ed.add_entry(&synset, "run", None, None).unwrap();
    let sense = ed.store().sense_by_id(&sense_id).unwrap().unwrap();
    let key = sense.key.clone().unwrap();
    assert_eq!(key, "run%2:38:01::");

    let mapped = map_sense_key("oewn", &key);
    assert!(mapped.starts_with("oewn-"));
    assert!(!mapped.contains('%') && !mapped.contains(':'));
    assert_eq!(unmap_sense_key("oewn", &mapped).unwrap(), key);
}

#[test]
fn add_is_idempotent_and_delete_removes_both_halves() {
    let mut ed = editor();
    let a = noun(&mut ed, "a puppy");
    let b = noun(&mut ed, "a dog");
    assert!(ed.add_relation(&a, SynsetRelType::Hypernym, &b).unwrap());
    assert!(!ed.add_relation(&a, SynsetRelType::Hypernym, &b).unwrap());
    assert_eq!(ed.store().synset_by_id(&a).unwrap().unwrap().relations.len(), 1);
    assert_eq!(ed.store().synset_by_id(&b).unwrap().unwrap().relations.len(), 1);

    ed.delete_relation(&a, &b).unwrap();
    assert!(ed.store().synset_by_id(&a).unwrap().unwrap().relations.is_empty());
    assert!(ed.store().synset_by_id(&b).unwrap().unwrap().relations.is_empty());
    assert!(matches!(
        ed.delete_relation(&a, &b),
        Err(EditError::NoRelation { .. })
    ));
}

#[test]
fn three_cycle_reports_one_violation() {
    let mut ed = editor();
    let a = noun(&mut ed, "first of three");
    let b = noun(&mut ed, "second of three");
    let c = noun(&mut ed, "third of three");
    for (lemma, id) in [("alpha", &a), ("beta", &b), ("gamma", &c)] {
        ed.add_entry(id, lemma, None, None).unwrap();
    }
    ed.add_relation(&a, SynsetRelType::Hypernym, &b).unwrap();
    ed.add_relation(&b, SynsetRelType::Hypernym, &c).unwrap();
    ed.add_relation(&c, SynsetRelType::Hypernym, &a).unwrap();

    let report = validate(ed.store(), &ValidateConfig::for_namespace("oewn")).unwrap();
    assert_eq!(report.len(), 1, "{:#?}", report.violations);
    let cycle = &report.violations[0];
    assert_eq!(cycle.kind, ViolationKind::Cycle);
    assert_eq!(cycle.node, [&a, &b, &c].into_iter().min().unwrap().as_str());
}

#[test]
fn deleting_a_member_renumbers_the_rest() {
    let mut ed = editor();
    let s = noun(&mut ed, "a domesticated carnivore");
    ed.add_entry(&s, "dog", None, None).unwrap();
    let second = ed.add_entry(&s, "domestic dog", None, None).unwrap();
    assert!(second.ends_with("-02"));
    let other = noun(&mut ed, "a wild carnivore");
    let wolf = ed.add_entry(&other, "wolf", None, None).unwrap();
    ed.add_sense_relation(&wolf, SenseRelType::Antonym, &second).unwrap();

    ed.delete_entry(&s, "dog").unwrap();
    let entry = ed.store().entry_by_id("oewn-domestic_dog-n").unwrap().unwrap();
    let renamed = entry.senses[0].id.clone();
    assert!(renamed.ends_with("-01"));
    let wolf_sense = ed.store().sense_by_id(&wolf).unwrap().unwrap();
    assert_eq!(wolf_sense.relations[0].target, renamed);

    let report = validate(
        ed.store(),
        &ValidateConfig {
            roots: vec![s.clone(), other.clone()],
        },
    )
    .unwrap();
    assert!(report.is_clean(), "{:#?}", report.violations);
}

#[test]
fn move_entry_recomputes_key() {
    let mut ed = editor();
    let animal = noun(&mut ed, "a domesticated carnivore");
    let person = ed
        .add_synset(NewSynset::new(
            "a dull unattractive person",
            PartOfSpeech::Noun,
            "noun.person",
        ))
        .unwrap();
    ed.add_entry(&animal, "dog", None, None).unwrap();
    let moved = ed.move_entry("dog", &animal, &person).unwrap();
    let sense = ed.store().sense_by_id(&moved).unwrap().unwrap();
    assert_eq!(sense.synset, person);
    assert!(sense.key.as_deref().is_some_and(|k| k.starts_with("dog%1:18:")));
    assert!(ed.store().synset_by_id(&animal).unwrap().unwrap().members.is_empty());
}
