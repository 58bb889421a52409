#![cfg(test)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use std::error::Error;
use tempfile::TempDir;
use terndb::error::StorageError;
use terndb::model::{Graph, Literal, Term, Triple, Uri};
use terndb::store::Store;

const BASE: &str = "http://test.org/";

fn uri(name: &str) -> Uri {
    Uri::new(format!("{BASE}{name}"))
}

fn triples_of(store: &Store) -> Result<BTreeSet<Triple>, StorageError> {
    store.iter().collect()
}

#[test]
fn insert_then_has() -> Result<(), Box<dyn Error>> {
    let store = Store::new("http://ex/")?;
    let triple = Triple::new(
        Uri::new("http://ex/a"),
        Uri::new("http://ex/p"),
        Literal::new_simple_literal("hello"),
    );
    assert!(!store.has(&triple)?);
    assert!(store.insert(&triple)?);
    assert!(store.has(&triple)?);
    assert_eq!(store.stats()?.num_terms, 3);
    Ok(())
}

#[test]
fn insert_is_idempotent() -> Result<(), Box<dyn Error>> {
    let store = Store::new("http://ex/")?;
    let triple = Triple::new(
        Uri::new("http://ex/a"),
        Uri::new("http://ex/p"),
        Literal::new_simple_literal("hello"),
    );
    assert!(store.insert(&triple)?);
    assert!(!store.insert(&triple)?);
    assert_eq!(store.stats()?.num_terms, 3);
    assert_eq!(store.describe(&Uri::new("http://ex/a"), false)?.len(), 1);
    Ok(())
}

#[test]
fn describe_returns_all_objects_of_a_subject() -> Result<(), Box<dyn Error>> {
    let store = Store::new(BASE)?;
    let first = Triple::new(uri("a"), uri("p"), uri("o1"));
    let second = Triple::new(uri("a"), uri("p"), Literal::from("o2"));
    store.insert(&first)?;
    store.insert(&second)?;

    let graph = store.describe(&uri("a"), false)?;
    assert_eq!(graph.len(), 2);
    assert!(graph.contains(&first));
    assert!(graph.contains(&second));
    Ok(())
}

#[test]
fn describe_as_object_includes_incoming_edges() -> Result<(), Box<dyn Error>> {
    let store = Store::new(BASE)?;
    let outgoing = Triple::new(uri("a"), uri("p"), uri("b"));
    let incoming = Triple::new(uri("c"), uri("q"), uri("a"));
    let unrelated = Triple::new(uri("c"), uri("q"), Literal::from("x"));
    for triple in [&outgoing, &incoming, &unrelated] {
        store.insert(triple)?;
    }

    let subject_only = store.describe(&uri("a"), false)?;
    assert_eq!(subject_only.len(), 1);
    assert!(subject_only.contains(&outgoing));

    let both = store.describe(&uri("a"), true)?;
    assert_eq!(both.len(), 2);
    assert!(both.contains(&incoming));

    assert!(store.describe(&uri("unknown"), true)?.is_empty());
    Ok(())
}

#[test]
fn delete_sweeps_orphaned_terms() -> Result<(), Box<dyn Error>> {
    let store = Store::new(BASE)?;
    let triple = Triple::new(uri("a"), uri("p"), Literal::from("o"));
    store.insert(&triple)?;
    store.delete(&triple)?;

    assert!(!store.has(&triple)?);
    assert_eq!(store.stats()?.num_terms, 0);
    assert_eq!(triples_of(&store)?.len(), 0);
    assert!(matches!(
        store.delete(&triple),
        Err(StorageError::NotFound)
    ));
    Ok(())
}

#[test]
fn delete_keeps_terms_shared_with_other_triples() -> Result<(), Box<dyn Error>> {
    let store = Store::new(BASE)?;
    let kept = Triple::new(uri("a"), uri("p"), uri("b"));
    let dropped = Triple::new(uri("a"), uri("p"), Literal::from("x"));
    store.insert(&kept)?;
    store.insert(&dropped)?;

    store.delete(&dropped)?;
    assert!(store.has(&kept)?);
    // a, p and b survive; the literal is gone
    assert_eq!(store.stats()?.num_terms, 3);
    Ok(())
}

#[test]
fn dump_emits_the_expected_turtle() -> Result<(), Box<dyn Error>> {
    let store = Store::new("http://ex/")?;
    store.insert(&Triple::new(
        Uri::new("http://ex/a"),
        Uri::new("http://ex/p"),
        Literal::new_language_tagged_literal("x", "en")?,
    ))?;

    let mut out = Vec::new();
    store.dump(&mut out)?;
    assert_eq!(
        String::from_utf8(out)?,
        "@base <http://ex/> .\n<a> <p> \"x\"@en .\n"
    );
    Ok(())
}

#[test]
fn dump_reimports_to_the_same_graph() -> Result<(), Box<dyn Error>> {
    let store = Store::new(BASE)?;
    let rdf_type = Uri::new("http://www.w3.org/1999/02/22-rdf-syntax-ns#type");
    let triples = [
        Triple::new(uri("a"), rdf_type.clone(), uri("Widget")),
        Triple::new(uri("a"), uri("p"), Literal::from(42_i32)),
        Triple::new(uri("a"), uri("p"), Literal::from("x\n\"quoted\"")),
        Triple::new(
            uri("a"),
            uri("p"),
            Literal::new_language_tagged_literal("x", "en")?,
        ),
        Triple::new(uri("b"), uri("q"), Uri::new("http://elsewhere.org/c")),
        Triple::new(
            uri("b"),
            uri("q"),
            Literal::new_typed_literal("v", Uri::new("http://elsewhere.org/dt")),
        ),
    ];
    for triple in &triples {
        store.insert(triple)?;
    }

    let mut out = Vec::new();
    store.dump(&mut out)?;
    let text = String::from_utf8(out)?;
    assert!(text.starts_with(&format!("@base <{BASE}> .\n")));
    assert!(text.contains("a <Widget>"));
    assert!(text.contains(" ;\n\t"));

    let copy = Store::new(BASE)?;
    copy.import(text.as_bytes(), 1000)?;
    assert_eq!(triples_of(&copy)?, triples_of(&store)?);
    assert_eq!(triples_of(&store)?, triples.into_iter().collect());
    Ok(())
}

#[test]
fn import_counts_include_the_final_partial_batch() -> Result<(), Box<dyn Error>> {
    let mut data = String::new();
    for i in 0..25 {
        data.push_str(&format!("<{BASE}s{i}> <{BASE}p> \"v{i}\" .\n"));
    }

    let store = Store::new(BASE)?;
    assert_eq!(store.import(data.as_bytes(), 10)?, 25);
    assert_eq!(triples_of(&store)?.len(), 25);
    Ok(())
}

#[test]
fn import_skips_unparsable_statements() -> Result<(), Box<dyn Error>> {
    let data = format!(
        "<{BASE}a> <{BASE}p> \"ok\" .\n\
         this is not turtle .\n\
         _:blank <{BASE}p> \"dropped\" .\n\
         <{BASE}b> <{BASE}p> \"also ok\" .\n"
    );
    let store = Store::new(BASE)?;
    assert_eq!(store.import(data.as_bytes(), 1000)?, 2);
    assert_eq!(triples_of(&store)?.len(), 2);
    Ok(())
}

#[test]
fn for_each_propagates_the_callback_error() -> Result<(), Box<dyn Error>> {
    let store = Store::new(BASE)?;
    store.insert(&Triple::new(uri("a"), uri("p"), uri("b")))?;
    store.insert(&Triple::new(uri("c"), uri("p"), uri("d")))?;

    let mut seen = 0;
    let result = store.for_each(|_| {
        seen += 1;
        Err(StorageError::NotFound)
    });
    assert!(matches!(result, Err(StorageError::NotFound)));
    assert_eq!(seen, 1);
    Ok(())
}

#[test]
fn persisted_triples_survive_reopen() -> Result<(), Box<dyn Error>> {
    let dir = TempDir::new()?;
    let mut rng = StdRng::seed_from_u64(0x5EED);
    let graph = random_graph(&mut rng, 1000);

    {
        let store = Store::open(dir.path(), BASE)?;
        store.import_graph(&graph)?;
        store.flush()?;
    }

    let store = Store::open(dir.path(), BASE)?;
    assert_eq!(triples_of(&store)?, graph.iter().collect::<BTreeSet<_>>());
    Ok(())
}

#[test]
fn reopen_with_a_different_base_fails() -> Result<(), Box<dyn Error>> {
    let dir = TempDir::new()?;
    {
        let store = Store::open(dir.path(), BASE)?;
        store.insert(&Triple::new(uri("a"), uri("p"), uri("b")))?;
        store.flush()?;
    }
    assert!(Store::open(dir.path(), "http://elsewhere.org/").is_err());
    Ok(())
}

#[test]
fn describe_parity_with_the_reference_graph() -> Result<(), Box<dyn Error>> {
    let mut rng = StdRng::seed_from_u64(42);
    let graph = random_graph(&mut rng, 200);
    let store = Store::new(BASE)?;
    store.import_graph(&graph)?;

    let subjects: BTreeSet<Uri> = graph.iter().map(|t| t.subject).collect();
    for subject in subjects {
        assert_eq!(
            store.describe(&subject, false)?,
            graph.describe(&subject, false),
            "describe({subject}, false) diverges from the reference"
        );
        assert_eq!(
            store.describe(&subject, true)?,
            graph.describe(&subject, true),
            "describe({subject}, true) diverges from the reference"
        );
    }
    Ok(())
}

#[test]
fn deleting_every_triple_empties_the_store() -> Result<(), Box<dyn Error>> {
    let mut rng = StdRng::seed_from_u64(7);
    let graph = random_graph(&mut rng, 300);
    let store = Store::new(BASE)?;

    for triple in graph.iter() {
        store.insert(&triple)?;
    }
    assert_eq!(triples_of(&store)?.len(), graph.len());

    for triple in graph.iter() {
        store.delete(&triple)?;
        assert!(!store.has(&triple)?);
    }
    assert_eq!(store.stats()?.num_terms, 0);
    assert_eq!(triples_of(&store)?.len(), 0);
    Ok(())
}

/// Generates a random graph in the shape real data has: a pool of subjects
/// and predicates, objects that are other nodes, external URIs or literals
/// of every supported kind.
fn random_graph(rng: &mut StdRng, size: usize) -> Graph {
    let subjects: Vec<Uri> = (0..(size / 10).max(2))
        .map(|_| uri(&random_name(rng)))
        .collect();
    let predicates: Vec<Uri> = (0..10).map(|_| uri(&random_name(rng))).collect();

    let mut graph = Graph::new();
    while graph.len() < size {
        let subject = subjects[rng.gen_range(0..subjects.len())].clone();
        let predicate = predicates[rng.gen_range(0..predicates.len())].clone();
        let object: Term = match rng.gen_range(0..100) {
            0..=19 => subjects[rng.gen_range(0..subjects.len())].clone().into(),
            20..=24 => {
                Uri::new(format!("http://elsewhere.org/{}", random_name(rng))).into()
            }
            _ => random_literal(rng).into(),
        };
        graph.insert(Triple::new(subject, predicate, object));
    }
    graph
}

fn random_name(rng: &mut StdRng) -> String {
    const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ-./";
    (0..rng.gen_range(1..30))
        .map(|_| char::from(LETTERS[rng.gen_range(0..LETTERS.len())]))
        .collect()
}

fn random_literal(rng: &mut StdRng) -> Literal {
    match rng.gen_range(0..10) {
        0 => Literal::from(rng.gen::<bool>()),
        1 => Literal::from(rng.gen::<i32>()),
        2 => Literal::from(rng.gen::<i64>()),
        3 => Literal::from(rng.gen::<u32>()),
        4 => Literal::from(rng.gen::<f64>()),
        5 => Literal::new_language_tagged_literal(random_name(rng), "en")
            .expect("the tag is valid"),
        6 => Literal::new_typed_literal(
            random_name(rng),
            Uri::new(format!("http://elsewhere.org/dt/{}", random_name(rng))),
        ),
        _ => Literal::new_simple_literal(random_name(rng)),
    }
}
