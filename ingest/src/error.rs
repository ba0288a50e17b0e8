use std::path::PathBuf;

use thiserror::Error;

use db::DbError;

/// Errors raised while ingesting or reconciling a corpus.
///
/// Only `FileFormat` stops work on a file; the others are recorded
/// against a row, a block or a batch and processing carries on.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("'{}' could not be read as a corpus file. Cause: {}", path.display(), cause)]
    FileFormat { path: PathBuf, cause: String },

    #[error("Line {}: {}", line, message)]
    Parse { line: usize, message: String },

    #[error(
        "'{}' matches {} lexicon headwords ({}), no identifier assigned.",
        surface_form,
        candidates.len(),
        candidates.join(", ")
    )]
    StrongsIdAmbiguity {
        surface_form: String,
        candidates: Vec<String>,
    },

    #[error(transparent)]
    Database(#[from] DbError),
}

impl IngestError {
    pub(crate) fn file_format<E: ToString>(path: &std::path::Path, cause: E) -> Self {
        IngestError::FileFormat {
            path: path.to_path_buf(),
            cause: cause.to_string(),
        }
    }
}
