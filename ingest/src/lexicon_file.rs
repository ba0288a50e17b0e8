//! Reading lexicon exports into [LexiconEntry](db::models::LexiconEntry) values.
//!
//! The expected layout is one entry per line:
//! `strongs<TAB>headword<TAB>transliteration<TAB>gloss`. Lines starting
//! with `#`, blank lines and lines whose first column is not a Strong's
//! number (titles, column headers) are skipped.

use std::path::Path;

use log::{info, warn};

use db::models::{LexiconEntry, StrongsId};

use crate::error::IngestError;
use crate::source;

/// Entries and row errors read from one lexicon file.
#[derive(Debug, Default)]
pub struct LexiconFile {
    pub entries: Vec<LexiconEntry>,
    pub errors: Vec<IngestError>,
}

/// Reads a lexicon export, zipped or not.
pub fn read(path: &Path) -> Result<LexiconFile, IngestError> {
    let text = source::open(path)?;
    let file = parse(&text);
    info!(
        "Read {} lexicon entries from {} ({} rows rejected)",
        file.entries.len(),
        path.display(),
        file.errors.len()
    );
    Ok(file)
}

pub fn parse(text: &str) -> LexiconFile {
    let mut file = LexiconFile::default();

    for (i, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let columns: Vec<&str> = line.split('\t').map(str::trim).collect();
        let strongs_id = match StrongsId::normalize(columns[0]) {
            Some(StrongsId::Other(_)) | None => continue,
            Some(id) => id,
        };

        let headword = columns.get(1).copied().unwrap_or("");
        if headword.is_empty() {
            let e = IngestError::Parse {
                line: i + 1,
                message: format!("lexicon entry {} has no headword", strongs_id),
            };
            warn!("{}", e);
            file.errors.push(e);
            continue;
        }

        file.entries.push(LexiconEntry {
            strongs_id,
            headword: headword.to_string(),
            transliteration: columns.get(2).copied().unwrap_or("").to_string(),
            gloss: columns.get(3).copied().unwrap_or("").to_string(),
        });
    }

    file
}
