use clap::{Parser, Subcommand, ValueHint};
use std::path::PathBuf;

#[derive(Parser)]
#[command(about, version, name = "terndb")]
/// Terndb embedded RDF triple store command line tool
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Load a Turtle or N-Triples file into the store
    ///
    /// Statements that fail to parse are skipped; the number of imported
    /// triples is reported on stderr.
    Import {
        /// Directory in which the data is persisted
        #[arg(short, long, value_hint = ValueHint::DirPath)]
        location: PathBuf,
        /// Base URI of the store
        #[arg(short, long, default_value = "http://localhost/")]
        base: String,
        /// File to load; stdin is used if absent
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,
        /// Number of triples committed per transaction
        #[arg(long, default_value_t = 1000)]
        batch_size: usize,
    },
    /// Write the whole store as Turtle to standard output
    Dump {
        /// Directory in which the data is persisted
        #[arg(short, long, value_hint = ValueHint::DirPath)]
        location: PathBuf,
        /// Base URI of the store
        #[arg(short, long, default_value = "http://localhost/")]
        base: String,
    },
    /// Add a single triple
    Insert {
        /// Directory in which the data is persisted
        #[arg(short, long, value_hint = ValueHint::DirPath)]
        location: PathBuf,
        /// Base URI of the store
        #[arg(short, long, default_value = "http://localhost/")]
        base: String,
        /// Subject URI, absolute or relative to the base
        subject: String,
        /// Predicate URI, absolute or relative to the base
        predicate: String,
        /// Object in Turtle syntax, e.g. `<uri>`, `"text"@en` or
        /// `"1"^^<http://www.w3.org/2001/XMLSchema#int>`
        object: String,
    },
    /// Remove a single triple
    ///
    /// Fails if the triple is not stored.
    Delete {
        /// Directory in which the data is persisted
        #[arg(short, long, value_hint = ValueHint::DirPath)]
        location: PathBuf,
        /// Base URI of the store
        #[arg(short, long, default_value = "http://localhost/")]
        base: String,
        /// Subject URI, absolute or relative to the base
        subject: String,
        /// Predicate URI, absolute or relative to the base
        predicate: String,
        /// Object in Turtle syntax
        object: String,
    },
    /// Check whether a triple is stored
    Has {
        /// Directory in which the data is persisted
        #[arg(short, long, value_hint = ValueHint::DirPath)]
        location: PathBuf,
        /// Base URI of the store
        #[arg(short, long, default_value = "http://localhost/")]
        base: String,
        /// Subject URI, absolute or relative to the base
        subject: String,
        /// Predicate URI, absolute or relative to the base
        predicate: String,
        /// Object in Turtle syntax
        object: String,
    },
    /// Print all triples where a node is the subject
    Describe {
        /// Directory in which the data is persisted
        #[arg(short, long, value_hint = ValueHint::DirPath)]
        location: PathBuf,
        /// Base URI of the store
        #[arg(short, long, default_value = "http://localhost/")]
        base: String,
        /// The node URI, absolute or relative to the base
        uri: String,
        /// Also include the triples where the node is the object
        #[arg(long)]
        as_object: bool,
    },
    /// Print statistics about the store
    Stats {
        /// Directory in which the data is persisted
        #[arg(short, long, value_hint = ValueHint::DirPath)]
        location: PathBuf,
        /// Base URI of the store
        #[arg(short, long, default_value = "http://localhost/")]
        base: String,
    },
}
