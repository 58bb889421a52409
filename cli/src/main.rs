use crate::cli::{Args, Command};
use anyhow::{bail, Context};
use clap::Parser;
use std::fs::File;
use std::io::{stdin, stdout, BufReader, Write};
use std::path::Path;
use terndb::io::TurtleReader;
use terndb::model::{Term, Triple, Uri};
use terndb::store::Store;

mod cli;

pub fn main() -> anyhow::Result<()> {
    match Args::parse().command {
        Command::Import {
            location,
            base,
            file,
            batch_size,
        } => {
            let store = open(&location, &base)?;
            let count = match file {
                Some(file) => {
                    let reader = BufReader::new(File::open(&file).with_context(|| {
                        format!("cannot open {}", file.display())
                    })?);
                    store.import(reader, batch_size)?
                }
                None => store.import(stdin().lock(), batch_size)?,
            };
            store.flush()?;
            eprintln!("imported {count} triples");
            Ok(())
        }
        Command::Dump { location, base } => {
            let store = open(&location, &base)?;
            store.dump(stdout().lock())?;
            Ok(())
        }
        Command::Insert {
            location,
            base,
            subject,
            predicate,
            object,
        } => {
            let store = open(&location, &base)?;
            let triple = triple_from_args(store.base(), &subject, &predicate, &object)?;
            let inserted = store.insert(&triple)?;
            store.flush()?;
            eprintln!("{}", if inserted { "inserted" } else { "already stored" });
            Ok(())
        }
        Command::Delete {
            location,
            base,
            subject,
            predicate,
            object,
        } => {
            let store = open(&location, &base)?;
            let triple = triple_from_args(store.base(), &subject, &predicate, &object)?;
            store
                .delete(&triple)
                .with_context(|| format!("cannot delete {triple}"))?;
            store.flush()?;
            eprintln!("deleted");
            Ok(())
        }
        Command::Has {
            location,
            base,
            subject,
            predicate,
            object,
        } => {
            let store = open(&location, &base)?;
            let triple = triple_from_args(store.base(), &subject, &predicate, &object)?;
            println!("{}", store.has(&triple)?);
            Ok(())
        }
        Command::Describe {
            location,
            base,
            uri,
            as_object,
        } => {
            let store = open(&location, &base)?;
            let node = resolve_uri(store.base(), &uri);
            let graph = store.describe(&node, as_object)?;
            let mut out = stdout().lock();
            for triple in graph.iter() {
                writeln!(out, "{triple} .")?;
            }
            Ok(())
        }
        Command::Stats { location, base } => {
            let stats = open(&location, &base)?.stats()?;
            println!("terms: {}", stats.num_terms);
            if let Some(path) = stats.path {
                println!("path: {}", path.display());
            }
            println!("size: {} bytes", stats.size_in_bytes);
            Ok(())
        }
    }
}

fn open(location: &Path, base: &str) -> anyhow::Result<Store> {
    Store::open(location, base)
        .with_context(|| format!("cannot open the store at {}", location.display()))
}

fn resolve_uri(base: &str, uri: &str) -> Uri {
    Uri::new(uri).resolve(&Uri::new(base))
}

/// Assembles a triple from the command line arguments: bare subject and
/// predicate URIs and an object in Turtle syntax, parsed by the same reader
/// the importer uses.
fn triple_from_args(
    base: &str,
    subject: &str,
    predicate: &str,
    object: &str,
) -> anyhow::Result<Triple> {
    let statement = format!("<s> <p> {object} .\n");
    let object: Term = match TurtleReader::new(statement.as_bytes())
        .with_base(Uri::new(base))
        .next()
    {
        Some(Ok(triple)) => triple.object,
        Some(Err(e)) => return Err(e).context(format!("invalid object term {object:?}")),
        None => bail!("invalid object term {object:?}"),
    };
    Ok(Triple::new(
        resolve_uri(base, subject),
        resolve_uri(base, predicate),
        object,
    ))
}
