//! Parsing of a single tab-delimited word row.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use db::models::{StrongsId, VerseKey, WordRecord};

lazy_static! {
    /// `#03`, or a merged range such as `#03 - #04`.
    static ref INDEX_RE: Regex = Regex::new(r"^#(\d+)(?:\s*-\s*#(\d+))?$").unwrap();
}

/// Why a row could not become a word.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RowError {
    #[error("row has {} column(s), expected at least an index and a surface form", columns)]
    TooShort { columns: usize },

    #[error("'{}' is not a word index", index)]
    BadIndex { index: String },

    #[error("word index must start at 1, found '{}'", index)]
    ZeroPosition { index: String },

    #[error("row has no surface form")]
    MissingSurface,
}

/// One word row, with every column after the surface form optional.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WordRow {
    pub position: i32,
    /// Last position covered by a merged index (`#03 - #04` covers 3 and
    /// 4); equal to `position` otherwise.
    pub last_position: i32,
    pub surface_form: String,
    pub strongs_field: Option<String>,
    pub cross_language_word: Option<String>,
    pub gloss: Option<String>,
    pub transliteration: Option<String>,
    pub morphology: Option<String>,
    pub cross_language_position: Option<String>,
}

/// Whether the first column of a line looks like a word index.
pub fn is_word_index(column: &str) -> bool {
    INDEX_RE.is_match(column.trim())
}

/// Parses the columns of one row. Missing trailing columns are `None`.
pub fn parse_row(columns: &[&str]) -> Result<WordRow, RowError> {
    if columns.len() < 2 {
        return Err(RowError::TooShort {
            columns: columns.len(),
        });
    }

    let index = columns[0].trim();
    let caps = INDEX_RE.captures(index).ok_or_else(|| RowError::BadIndex {
        index: index.to_string(),
    })?;
    let position: i32 = caps[1].parse().map_err(|_| RowError::BadIndex {
        index: index.to_string(),
    })?;
    if position == 0 {
        return Err(RowError::ZeroPosition {
            index: index.to_string(),
        });
    }
    let last_position = match caps.get(2) {
        Some(end) => end
            .as_str()
            .parse::<i32>()
            .ok()
            .filter(|end| *end >= position)
            .ok_or_else(|| RowError::BadIndex {
                index: index.to_string(),
            })?,
        None => position,
    };

    let surface_form = columns[1].trim();
    if surface_form.is_empty() {
        return Err(RowError::MissingSurface);
    }

    let column = |i: usize| -> Option<String> {
        columns
            .get(i)
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(|c| c.to_string())
    };

    Ok(WordRow {
        position,
        last_position,
        surface_form: surface_form.to_string(),
        strongs_field: column(2),
        cross_language_word: column(3),
        gloss: column(4),
        transliteration: column(5),
        morphology: column(6),
        cross_language_position: column(7),
    })
}

impl WordRow {
    /// Whether the index merged several source tokens.
    pub fn spans_multiple(&self) -> bool {
        self.last_position > self.position
    }

    /// Turns the row into a record of the given verse, deriving its
    /// Strong's id from the Strong's column.
    pub fn into_record(self, verse_ref: VerseKey) -> WordRecord {
        let strongs_id = self.strongs_field.as_deref().and_then(StrongsId::normalize);

        WordRecord {
            verse_ref,
            word_position: self.position,
            surface_form: self.surface_form,
            strongs_id,
            grammar_code: self.strongs_field,
            morphology_code: self.morphology,
            transliteration: self.transliteration,
            gloss: self.gloss,
            cross_language_word: self.cross_language_word,
            cross_language_position: self.cross_language_position,
        }
    }
}

#[cfg(test)]
mod tests {
    use db::models::Language;

    use super::*;

    #[test]
    fn two_columns() {
        let row = parse_row(&["#01", "Γράφω"]).unwrap();
        assert_eq!(row.position, 1);
        assert_eq!(row.surface_form, "Γράφω");
        assert_eq!(row.strongs_field, None);
        assert_eq!(row.morphology, None);

        let key = VerseKey {
            book_name: "3 John".to_string(),
            chapter: 1,
            verse: 1,
        };
        assert_eq!(row.into_record(key).strongs_id, None);
    }

    #[test]
    fn all_columns() {
        let row = parse_row(&[
            "#02",
            "בָּרָא",
            "{H1254a}",
            "ἐποίησεν",
            "he created",
            "ba.Ra'",
            "HVqp3ms",
            "Gen.1.1#03",
        ])
        .unwrap();

        assert_eq!(row.cross_language_word.as_deref(), Some("ἐποίησεν"));
        assert_eq!(row.gloss.as_deref(), Some("he created"));
        assert_eq!(row.transliteration.as_deref(), Some("ba.Ra'"));
        assert_eq!(row.morphology.as_deref(), Some("HVqp3ms"));
        assert_eq!(row.cross_language_position.as_deref(), Some("Gen.1.1#03"));

        let key = VerseKey {
            book_name: "Genesis".to_string(),
            chapter: 1,
            verse: 1,
        };
        let record = row.into_record(key);
        assert_eq!(
            record.strongs_id,
            Some(StrongsId::Extended {
                lang: Language::Hebrew,
                code: "1254".to_string(),
                suffix: 'a',
            })
        );
        assert_eq!(record.grammar_code.as_deref(), Some("{H1254a}"));
    }

    #[test]
    fn merged_index() {
        let row = parse_row(&["#03 - #04", "καὶ ἐγένετο"]).unwrap();
        assert_eq!(row.position, 3);
        assert_eq!(row.last_position, 4);
        assert!(row.spans_multiple());

        let row = parse_row(&["#05", "λόγος"]).unwrap();
        assert_eq!(row.last_position, 5);
        assert!(!row.spans_multiple());

        assert_eq!(
            parse_row(&["#04 - #02", "x"]),
            Err(RowError::BadIndex {
                index: "#04 - #02".to_string()
            })
        );
    }

    #[test]
    fn empty_cells_are_none() {
        let row = parse_row(&["#01", "Γράφω", "", " ", "to write"]).unwrap();
        assert_eq!(row.strongs_field, None);
        assert_eq!(row.cross_language_word, None);
        assert_eq!(row.gloss.as_deref(), Some("to write"));
    }

    #[test]
    fn malformed_rows() {
        assert_eq!(
            parse_row(&["#01"]),
            Err(RowError::TooShort { columns: 1 })
        );
        assert_eq!(
            parse_row(&["#00", "x"]),
            Err(RowError::ZeroPosition {
                index: "#00".to_string()
            })
        );
        assert_eq!(parse_row(&["#01", "  "]), Err(RowError::MissingSurface));
        assert!(matches!(
            parse_row(&["Word", "x"]),
            Err(RowError::BadIndex { .. })
        ));
    }
}
