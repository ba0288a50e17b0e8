use serde_derive::Serialize;

use crate::schema::{lexicon, words};

/// Identity of a verse within one translation source.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VerseKey {
    pub book_name: String,
    pub chapter: i32,
    pub verse: i32,
}

/// A parsed verse, ready to be loaded.
///
/// Verse 0 is used for Psalm titles and other superscriptions.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VerseRecord {
    pub book_code: String,
    pub book_name: String,
    pub chapter: i32,
    pub verse: i32,
    pub text: String,
    pub translation_source: String,
}

impl VerseRecord {
    pub fn key(&self) -> VerseKey {
        VerseKey {
            book_name: self.book_name.clone(),
            chapter: self.chapter,
            verse: self.verse,
        }
    }
}

/// A single tagged word belonging to a verse.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WordRecord {
    pub verse_ref: VerseKey,
    pub word_position: i32,
    pub surface_form: String,
    pub strongs_id: Option<StrongsId>,
    /// The Strong's/grammar column exactly as it appeared in the source.
    pub grammar_code: Option<String>,
    pub morphology_code: Option<String>,
    pub transliteration: Option<String>,
    pub gloss: Option<String>,
    /// The Hebrew/Greek word this word translates, for tagged translations.
    pub cross_language_word: Option<String>,
    pub cross_language_position: Option<String>,
}

/// Model representing a lexicon headword.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LexiconEntry {
    pub strongs_id: StrongsId,
    pub headword: String,
    pub transliteration: String,
    pub gloss: String,
}

/// Row shape of the `lexicon` table.
#[derive(Clone, Debug, Queryable, Insertable)]
#[diesel(table_name = lexicon)]
pub struct LexiconRow {
    pub strongs_id: String,
    pub headword: String,
    pub transliteration: String,
    pub gloss: String,
}

impl From<&LexiconEntry> for LexiconRow {
    fn from(entry: &LexiconEntry) -> Self {
        Self {
            strongs_id: entry.strongs_id.to_string(),
            headword: entry.headword.to_owned(),
            transliteration: entry.transliteration.to_owned(),
            gloss: entry.gloss.to_owned(),
        }
    }
}

/// A persisted word as seen by the reconciliation pass, with enough of
/// its verse to locate it in the source corpus.
#[derive(Clone, Debug, Queryable, Serialize)]
pub struct StoredWord {
    pub id: i32,
    pub book_name: String,
    pub chapter: i32,
    pub verse: i32,
    pub word_position: i32,
    pub surface_form: String,
    pub strongs_id: Option<String>,
    pub grammar_code: Option<String>,
}

/// Columns the reconciliation pass is allowed to change. `None` leaves
/// the column untouched.
#[derive(Clone, Debug, Default, AsChangeset)]
#[diesel(table_name = words)]
pub struct WordCorrection {
    pub strongs_id: Option<String>,
    pub surface_form: Option<String>,
}

impl WordCorrection {
    pub fn is_empty(&self) -> bool {
        self.strongs_id.is_none() && self.surface_form.is_none()
    }
}

mod strongs;
pub use self::strongs::{Language, StrongsId};
