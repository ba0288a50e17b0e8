use diesel::connection::{AnsiTransactionManager, TransactionManager};
use diesel::prelude::*;
use diesel::sql_types::BigInt;

use crate::models::*;
use crate::DbError;

// Row id generated by the most recent successful insert on this connection.
sql_function!(fn last_insert_rowid() -> BigInt);

/// Result of inserting a word that may already exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A word already occupies this `(verse, position)`.
    Duplicate,
}

/// Trait implemented by transactional sinks for verses and words.
///
/// Transactions are explicit so that callers can choose their own
/// commit boundaries; a failed insert leaves the open transaction usable.
pub trait Store {
    fn begin(&mut self) -> Result<(), DbError>;

    fn commit(&mut self) -> Result<(), DbError>;

    fn rollback(&mut self) -> Result<(), DbError>;

    /// Counts the verses stored under a translation source.
    fn count_by_source(&mut self, source: &str) -> Result<i64, DbError>;

    /// Deletes every verse of a translation source along with its words.
    ///
    /// Returns the number of verses deleted.
    fn delete_by_source(&mut self, source: &str) -> Result<usize, DbError>;

    /// Finds the id of an already stored verse.
    fn find_verse(&mut self, source: &str, key: &VerseKey) -> Result<Option<i32>, DbError>;

    /// Inserts a verse and returns its generated id.
    fn insert_verse(&mut self, verse: &VerseRecord) -> Result<i32, DbError>;

    fn insert_word(&mut self, verse_id: i32, word: &WordRecord) -> Result<InsertOutcome, DbError>;

    /// Gets all words of a translation source in insertion order.
    fn words_for_source(&mut self, source: &str) -> Result<Vec<StoredWord>, DbError>;

    fn update_word(&mut self, word_id: i32, correction: &WordCorrection) -> Result<(), DbError>;
}

/// [Store](crate::store::Store) backed by a single SQLite connection.
pub struct SqliteStore {
    conn: SqliteConnection,
}

impl SqliteStore {
    pub fn new(conn: SqliteConnection) -> Self {
        Self { conn }
    }

    pub fn connection(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }

    pub fn into_inner(self) -> SqliteConnection {
        self.conn
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::verses)]
struct NewVerse<'a> {
    book_code: &'a str,
    book_name: &'a str,
    chapter: i32,
    verse: i32,
    text: &'a str,
    translation_source: &'a str,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::words)]
struct NewWord<'a> {
    verse_id: i32,
    word_position: i32,
    surface_form: &'a str,
    strongs_id: Option<String>,
    grammar_code: Option<&'a str>,
    morphology_code: Option<&'a str>,
    transliteration: Option<&'a str>,
    gloss: Option<&'a str>,
    cross_language_word: Option<&'a str>,
    cross_language_position: Option<&'a str>,
}

impl Store for SqliteStore {
    fn begin(&mut self) -> Result<(), DbError> {
        AnsiTransactionManager::begin_transaction(&mut self.conn).map_err(DbError::from)
    }

    fn commit(&mut self) -> Result<(), DbError> {
        AnsiTransactionManager::commit_transaction(&mut self.conn).map_err(DbError::from)
    }

    fn rollback(&mut self) -> Result<(), DbError> {
        AnsiTransactionManager::rollback_transaction(&mut self.conn).map_err(DbError::from)
    }

    fn count_by_source(&mut self, source: &str) -> Result<i64, DbError> {
        use crate::schema::verses;

        verses::table
            .filter(verses::translation_source.eq(source))
            .count()
            .get_result(&mut self.conn)
            .map_err(DbError::from)
    }

    fn delete_by_source(&mut self, source: &str) -> Result<usize, DbError> {
        use crate::schema::{verses, words};

        // Explicit so the cascade does not depend on the foreign_keys pragma.
        let verse_ids = verses::table
            .filter(verses::translation_source.eq(source))
            .select(verses::id);
        diesel::delete(words::table.filter(words::verse_id.eq_any(verse_ids)))
            .execute(&mut self.conn)?;

        diesel::delete(verses::table.filter(verses::translation_source.eq(source)))
            .execute(&mut self.conn)
            .map_err(DbError::from)
    }

    fn find_verse(&mut self, source: &str, key: &VerseKey) -> Result<Option<i32>, DbError> {
        use crate::schema::verses;

        verses::table
            .filter(verses::translation_source.eq(source))
            .filter(verses::book_name.eq(&key.book_name))
            .filter(verses::chapter.eq(key.chapter))
            .filter(verses::verse.eq(key.verse))
            .select(verses::id)
            .first(&mut self.conn)
            .optional()
            .map_err(DbError::from)
    }

    fn insert_verse(&mut self, verse: &VerseRecord) -> Result<i32, DbError> {
        use crate::schema::verses;

        diesel::insert_into(verses::table)
            .values(&NewVerse {
                book_code: &verse.book_code,
                book_name: &verse.book_name,
                chapter: verse.chapter,
                verse: verse.verse,
                text: &verse.text,
                translation_source: &verse.translation_source,
            })
            .execute(&mut self.conn)?;

        let id: i64 = diesel::select(last_insert_rowid()).get_result(&mut self.conn)?;
        i32::try_from(id).map_err(|_| DbError::Other {
            cause: format!("Verse id {} does not fit the id column", id),
        })
    }

    fn insert_word(&mut self, verse_id: i32, word: &WordRecord) -> Result<InsertOutcome, DbError> {
        use crate::schema::words;
        use diesel::result::{DatabaseErrorKind, Error};

        let result = diesel::insert_into(words::table)
            .values(&NewWord {
                verse_id,
                word_position: word.word_position,
                surface_form: &word.surface_form,
                strongs_id: word.strongs_id.as_ref().map(|id| id.to_string()),
                grammar_code: word.grammar_code.as_deref(),
                morphology_code: word.morphology_code.as_deref(),
                transliteration: word.transliteration.as_deref(),
                gloss: word.gloss.as_deref(),
                cross_language_word: word.cross_language_word.as_deref(),
                cross_language_position: word.cross_language_position.as_deref(),
            })
            .execute(&mut self.conn);

        match result {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                Ok(InsertOutcome::Duplicate)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn words_for_source(&mut self, source: &str) -> Result<Vec<StoredWord>, DbError> {
        use crate::schema::{verses, words};

        words::table
            .inner_join(verses::table)
            .filter(verses::translation_source.eq(source))
            .select((
                words::id,
                verses::book_name,
                verses::chapter,
                verses::verse,
                words::word_position,
                words::surface_form,
                words::strongs_id,
                words::grammar_code,
            ))
            .order_by(words::id)
            .load(&mut self.conn)
            .map_err(DbError::from)
    }

    fn update_word(&mut self, word_id: i32, correction: &WordCorrection) -> Result<(), DbError> {
        use crate::schema::words;

        if correction.is_empty() {
            return Ok(());
        }

        let updated = diesel::update(words::table.find(word_id))
            .set(correction)
            .execute(&mut self.conn)?;
        match updated {
            0 => Err(DbError::Other {
                cause: format!("Word {} no longer exists", word_id),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{establish_connection, run_migrations};

    pub fn memory_store() -> SqliteStore {
        let mut conn = establish_connection(":memory:").unwrap();
        run_migrations(&mut conn).unwrap();
        SqliteStore::new(conn)
    }

    pub fn verse(source: &str, verse: i32) -> VerseRecord {
        VerseRecord {
            book_code: "Gen".to_string(),
            book_name: "Genesis".to_string(),
            chapter: 1,
            verse,
            text: "בְּרֵאשִׁית בָּרָא".to_string(),
            translation_source: source.to_string(),
        }
    }

    pub fn word(verse: &VerseRecord, position: i32, strongs: Option<&str>) -> WordRecord {
        WordRecord {
            verse_ref: verse.key(),
            word_position: position,
            surface_form: format!("w{}", position),
            strongs_id: strongs.map(|s| s.parse().unwrap()),
            grammar_code: strongs.map(|s| format!("{{{}}}", s)),
            morphology_code: Some("HR/Ncfsa".to_string()),
            transliteration: None,
            gloss: None,
            cross_language_word: None,
            cross_language_position: None,
        }
    }

    #[test]
    fn insert_and_dedup() {
        let mut store = memory_store();
        let gen_1_1 = verse("TAHOT", 1);

        let id = store.insert_verse(&gen_1_1).unwrap();
        assert_eq!(
            store.find_verse("TAHOT", &gen_1_1.key()).unwrap(),
            Some(id)
        );
        assert_eq!(store.find_verse("OTHER", &gen_1_1.key()).unwrap(), None);

        let first = word(&gen_1_1, 1, Some("H7225"));
        assert_eq!(
            store.insert_word(id, &first).unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(
            store.insert_word(id, &first).unwrap(),
            InsertOutcome::Duplicate
        );

        // Same verse key under another source is a different verse.
        assert!(store.insert_verse(&verse("OTHER", 1)).is_ok());
        match store.insert_verse(&gen_1_1) {
            Err(DbError::Constraint { .. }) => {}
            other => panic!("expected a constraint error, got {:?}", other),
        }
    }

    #[test]
    fn delete_by_source_removes_words() {
        let mut store = memory_store();

        for source in &["A", "B"] {
            let v = verse(source, 1);
            let id = store.insert_verse(&v).unwrap();
            store.insert_word(id, &word(&v, 1, None)).unwrap();
            store.insert_word(id, &word(&v, 2, None)).unwrap();
        }

        assert_eq!(store.delete_by_source("A").unwrap(), 1);
        assert_eq!(store.count_by_source("A").unwrap(), 0);
        assert!(store.words_for_source("A").unwrap().is_empty());
        assert_eq!(store.count_by_source("B").unwrap(), 1);
        assert_eq!(store.words_for_source("B").unwrap().len(), 2);
    }

    #[test]
    fn update_word_changes_only_given_columns() {
        let mut store = memory_store();
        let v = verse("TAHOT", 1);
        let id = store.insert_verse(&v).unwrap();
        store.insert_word(id, &word(&v, 1, Some("H1254"))).unwrap();

        let stored = store.words_for_source("TAHOT").unwrap();
        assert_eq!(stored[0].strongs_id.as_deref(), Some("H1254"));
        assert_eq!(stored[0].book_name, "Genesis");

        store
            .update_word(
                stored[0].id,
                &WordCorrection {
                    strongs_id: Some("H1254a".to_string()),
                    surface_form: None,
                },
            )
            .unwrap();

        let stored = store.words_for_source("TAHOT").unwrap();
        assert_eq!(stored[0].strongs_id.as_deref(), Some("H1254a"));
        assert_eq!(stored[0].surface_form, "w1");
        assert!(store
            .update_word(
                9999,
                &WordCorrection {
                    strongs_id: Some("H0001".to_string()),
                    surface_form: None,
                },
            )
            .is_err());
    }

    #[test]
    fn rollback_discards_batch() {
        let mut store = memory_store();

        store.begin().unwrap();
        store.insert_verse(&verse("TAHOT", 1)).unwrap();
        store.rollback().unwrap();
        assert_eq!(store.count_by_source("TAHOT").unwrap(), 0);

        store.begin().unwrap();
        store.insert_verse(&verse("TAHOT", 1)).unwrap();
        store.commit().unwrap();
        assert_eq!(store.count_by_source("TAHOT").unwrap(), 1);
    }
}
