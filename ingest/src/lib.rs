//! Parsing and loading of tagged Bible corpora.
//!
//! Files flow through [source](crate::source) (zip and encoding
//! handling), [scanner](crate::scanner) (verse blocks),
//! [row](crate::row) (word rows) and into the `db` loader, driven by
//! [pipeline](crate::pipeline). [reconcile](crate::reconcile) is a
//! separate maintenance pass over words that are already stored.

pub mod books;
pub mod error;
pub mod lexicon_file;
pub mod pipeline;
pub mod reconcile;
pub mod row;
pub mod scanner;
pub mod source;

pub use error::IngestError;
pub use pipeline::{CorpusVariant, IngestConfig, IngestionContext, IngestionPipeline, RunSummary};
pub use reconcile::{reconcile, ReconcileOptions, ReconcileReport};
