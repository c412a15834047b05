//! Benchmarks for lexicon editing, validation and codecs.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use lexnet::codec::xml;
use lexnet::edit::{EditConfig, Editor, NewSynset};
use lexnet::ident::{map_sense_key, unmap_sense_key};
use lexnet::model::{Lexicon, LexiconHeader, PartOfSpeech, SynsetRelType};
use lexnet::store::collect_lexicon;
use lexnet::store::mem::MemStore;
use lexnet::validate::{ValidateConfig, validate};

/// A chain of `n` noun synsets, each the hypernym of the next, one lemma each.
fn chain(n: usize) -> Editor<MemStore> {
    let mut ed = Editor::new(
        MemStore::new(Lexicon::new(LexiconHeader::new("oewn"))),
        EditConfig::default(),
    );
    let mut previous: Option<String> = None;
    for i in 0..n {
        let id = ed
            .add_synset(NewSynset::new(
                format!("synthetic concept number {i}"),
                PartOfSpeech::Noun,
                "noun.artifact",
            ))
            .unwrap();
        ed.add_entry(&id, &format!("thing{i}"), None, None).unwrap();
        if let Some(parent) = &previous {
            ed.add_relation(&id, SynsetRelType::Hypernym, parent).unwrap();
        }
        previous = Some(id);
    }
    ed
}

fn bench_add_relation(c: &mut Criterion) {
    c.bench_function("build_chain_100", |bench| {
        bench.iter(|| black_box(chain(100)))
    });
}

fn bench_validate(c: &mut Criterion) {
    let ed = chain(500);
    let config = ValidateConfig::for_namespace("oewn");
    c.bench_function("validate_500", |bench| {
        bench.iter(|| black_box(validate(ed.store(), &config).unwrap()))
    });
}

fn bench_xml(c: &mut Criterion) {
    let lexicon = collect_lexicon(chain(500).store()).unwrap();
    let text = xml::write_xml(&lexicon);
    c.bench_function("write_xml_500", |bench| {
        bench.iter(|| black_box(xml::write_xml(&lexicon)))
    });
    c.bench_function("read_xml_500", |bench| {
        bench.iter(|| black_box(xml::read_xml(&text, "bench.xml").unwrap()))
    });
}

fn bench_key_mapping(c: &mut Criterion) {
    c.bench_function("map_unmap_key", |bench| {
        bench.iter(|| {
            let mapped = map_sense_key("oewn", black_box("abaxial%5:00:00:dorsal:02"));
            black_box(unmap_sense_key("oewn", &mapped).unwrap())
        })
    });
}

criterion_group!(
    benches,
    bench_add_relation,
    bench_validate,
    bench_xml,
    bench_key_mapping
);
criterion_main!(benches);
