//! Batch loading of parsed verses and words into a [Store](crate::store::Store).

use std::collections::HashMap;

use log::{debug, error, info, warn};
use serde_derive::Serialize;

use crate::models::{VerseKey, VerseRecord, WordRecord};
use crate::store::{InsertOutcome, Store};
use crate::DbError;

/// Default number of verses per transaction.
pub const DEFAULT_VERSE_BATCH: usize = 500;

/// Default number of words per transaction.
pub const DEFAULT_WORD_BATCH: usize = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoaderConfig {
    pub verse_batch: usize,
    pub word_batch: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            verse_batch: DEFAULT_VERSE_BATCH,
            word_batch: DEFAULT_WORD_BATCH,
        }
    }
}

/// Counts produced by one call to the loader.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    /// Verses removed by the full replace before inserting.
    pub verses_deleted: usize,
    pub verses_inserted: usize,
    /// Verses already present when appending.
    pub verses_existing: usize,
    pub words_inserted: usize,
    pub words_skipped_as_duplicate: usize,
    pub row_errors: usize,
    pub batch_errors: usize,
}

impl LoadSummary {
    pub fn merge(&mut self, other: &LoadSummary) {
        self.verses_deleted += other.verses_deleted;
        self.verses_inserted += other.verses_inserted;
        self.verses_existing += other.verses_existing;
        self.words_inserted += other.words_inserted;
        self.words_skipped_as_duplicate += other.words_skipped_as_duplicate;
        self.row_errors += other.row_errors;
        self.batch_errors += other.batch_errors;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Replace,
    Append,
}

/// Persists verses and their words in bounded transactions.
pub struct RelationalLoader<'s, S: Store + ?Sized> {
    store: &'s mut S,
    config: LoaderConfig,
}

impl<'s, S: Store + ?Sized> RelationalLoader<'s, S> {
    pub fn new(store: &'s mut S, config: LoaderConfig) -> Self {
        Self {
            store,
            config: LoaderConfig {
                verse_batch: config.verse_batch.max(1),
                word_batch: config.word_batch.max(1),
            },
        }
    }

    /// Replaces everything stored for `source` with the given records.
    ///
    /// Fails only if the existing rows cannot be removed; row and batch
    /// failures after that are counted in the summary.
    pub fn load(
        &mut self,
        source: &str,
        verses: &[VerseRecord],
        words: &[WordRecord],
    ) -> Result<LoadSummary, DbError> {
        self.run(Mode::Replace, source, verses, words)
    }

    /// Adds records to `source` without removing anything. Verses that
    /// already exist are reused and words already stored are skipped.
    pub fn append(
        &mut self,
        source: &str,
        verses: &[VerseRecord],
        words: &[WordRecord],
    ) -> Result<LoadSummary, DbError> {
        self.run(Mode::Append, source, verses, words)
    }

    fn run(
        &mut self,
        mode: Mode,
        source: &str,
        verses: &[VerseRecord],
        words: &[WordRecord],
    ) -> Result<LoadSummary, DbError> {
        let mut summary = LoadSummary::default();

        if mode == Mode::Replace {
            summary.verses_deleted = self.truncate(source)?;
        }

        let ids = self.insert_verses(mode, source, verses, &mut summary);
        self.insert_words(&ids, words, &mut summary);

        info!(
            "Loaded '{}': {} verses ({} replaced), {} words, {} duplicates, {} row errors, {} failed batches",
            source,
            summary.verses_inserted,
            summary.verses_deleted,
            summary.words_inserted,
            summary.words_skipped_as_duplicate,
            summary.row_errors,
            summary.batch_errors
        );
        Ok(summary)
    }

    fn truncate(&mut self, source: &str) -> Result<usize, DbError> {
        if self.store.count_by_source(source)? == 0 {
            return Ok(0);
        }

        self.store.begin()?;
        let deleted = match self.store.delete_by_source(source) {
            Ok(deleted) => deleted,
            Err(e) => {
                self.abandon();
                return Err(e);
            }
        };
        if let Err(e) = self.store.commit() {
            self.abandon();
            return Err(e);
        }

        info!("Removed {} existing verses of '{}'", deleted, source);
        Ok(deleted)
    }

    fn insert_verses(
        &mut self,
        mode: Mode,
        source: &str,
        verses: &[VerseRecord],
        summary: &mut LoadSummary,
    ) -> HashMap<VerseKey, i32> {
        let mut ids = HashMap::with_capacity(verses.len());

        for (batch, chunk) in verses.chunks(self.config.verse_batch).enumerate() {
            if let Err(e) = self.store.begin() {
                error!("Could not start verse batch {}: {}", batch, e);
                summary.batch_errors += 1;
                continue;
            }

            let mut pending = Vec::with_capacity(chunk.len());
            let mut inserted = 0;
            let mut existing = 0;
            for verse in chunk {
                if verse.translation_source != source {
                    warn!(
                        "{} {}:{} belongs to '{}', not '{}'",
                        verse.book_name, verse.chapter, verse.verse, verse.translation_source, source
                    );
                    summary.row_errors += 1;
                    continue;
                }

                if mode == Mode::Append {
                    match self.store.find_verse(source, &verse.key()) {
                        Ok(Some(id)) => {
                            pending.push((verse.key(), id));
                            existing += 1;
                            continue;
                        }
                        Ok(None) => {}
                        Err(e) => {
                            warn!("{} {}:{}: {}", verse.book_name, verse.chapter, verse.verse, e);
                            summary.row_errors += 1;
                            continue;
                        }
                    }
                }

                match self.store.insert_verse(verse) {
                    Ok(id) => {
                        pending.push((verse.key(), id));
                        inserted += 1;
                    }
                    Err(e) => {
                        warn!("{} {}:{}: {}", verse.book_name, verse.chapter, verse.verse, e);
                        summary.row_errors += 1;
                    }
                }
            }

            match self.store.commit() {
                Ok(()) => {
                    debug!("Committed verse batch {} ({} verses)", batch, inserted);
                    summary.verses_inserted += inserted;
                    summary.verses_existing += existing;
                    ids.extend(pending);
                }
                Err(e) => {
                    error!("Verse batch {} was not committed: {}", batch, e);
                    self.abandon();
                    summary.batch_errors += 1;
                }
            }
        }

        ids
    }

    fn insert_words(
        &mut self,
        ids: &HashMap<VerseKey, i32>,
        words: &[WordRecord],
        summary: &mut LoadSummary,
    ) {
        for (batch, chunk) in words.chunks(self.config.word_batch).enumerate() {
            if let Err(e) = self.store.begin() {
                error!("Could not start word batch {}: {}", batch, e);
                summary.batch_errors += 1;
                continue;
            }

            let mut inserted = 0;
            let mut duplicates = 0;
            for word in chunk {
                let verse = &word.verse_ref;
                let verse_id = match ids.get(verse) {
                    Some(id) => *id,
                    None => {
                        warn!(
                            "{} {}:{} #{}: verse was not stored, word dropped",
                            verse.book_name, verse.chapter, verse.verse, word.word_position
                        );
                        summary.row_errors += 1;
                        continue;
                    }
                };

                match self.store.insert_word(verse_id, word) {
                    Ok(InsertOutcome::Inserted) => inserted += 1,
                    Ok(InsertOutcome::Duplicate) => duplicates += 1,
                    Err(e) => {
                        warn!(
                            "{} {}:{} #{}: {}",
                            verse.book_name, verse.chapter, verse.verse, word.word_position, e
                        );
                        summary.row_errors += 1;
                    }
                }
            }

            match self.store.commit() {
                Ok(()) => {
                    debug!("Committed word batch {} ({} words)", batch, inserted);
                    summary.words_inserted += inserted;
                    summary.words_skipped_as_duplicate += duplicates;
                }
                Err(e) => {
                    error!("Word batch {} was not committed: {}", batch, e);
                    self.abandon();
                    summary.batch_errors += 1;
                }
            }
        }
    }

    fn abandon(&mut self) {
        if let Err(e) = self.store.rollback() {
            debug!("Rollback after failed batch: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StoredWord, WordCorrection};
    use crate::store::tests::{memory_store, verse, word};
    use crate::store::SqliteStore;

    fn batch(source: &str, verse_count: i32) -> (Vec<VerseRecord>, Vec<WordRecord>) {
        let verses: Vec<VerseRecord> = (1..=verse_count).map(|v| verse(source, v)).collect();
        let words = verses
            .iter()
            .flat_map(|v| vec![word(v, 1, Some("H7225")), word(v, 2, Some("H1254a"))])
            .collect();
        (verses, words)
    }

    fn small_batches() -> LoaderConfig {
        LoaderConfig {
            verse_batch: 3,
            word_batch: 4,
        }
    }

    #[test]
    fn load_replaces_source() {
        let mut store = memory_store();

        let (verses, words) = batch("X", 10);
        let first = RelationalLoader::new(&mut store, small_batches())
            .load("X", &verses, &words)
            .unwrap();
        assert_eq!(first.verses_inserted, 10);
        assert_eq!(first.words_inserted, 20);
        assert_eq!(first.verses_deleted, 0);

        let (verses, words) = batch("X", 7);
        let second = RelationalLoader::new(&mut store, small_batches())
            .load("X", &verses, &words)
            .unwrap();
        assert_eq!(second.verses_deleted, 10);
        assert_eq!(second.verses_inserted, 7);
        assert_eq!(store.count_by_source("X").unwrap(), 7);
        assert_eq!(store.words_for_source("X").unwrap().len(), 14);
    }

    #[test]
    fn load_leaves_other_sources_alone() {
        let mut store = memory_store();

        let (verses, words) = batch("A", 2);
        RelationalLoader::new(&mut store, LoaderConfig::default())
            .load("A", &verses, &words)
            .unwrap();
        let (verses, words) = batch("B", 3);
        RelationalLoader::new(&mut store, LoaderConfig::default())
            .load("B", &verses, &words)
            .unwrap();

        assert_eq!(store.count_by_source("A").unwrap(), 2);
        assert_eq!(store.count_by_source("B").unwrap(), 3);
    }

    #[test]
    fn append_twice_is_idempotent() {
        let mut store = memory_store();
        let (verses, words) = batch("X", 5);

        let first = RelationalLoader::new(&mut store, small_batches())
            .append("X", &verses, &words)
            .unwrap();
        assert_eq!(first.words_inserted, words.len());

        let second = RelationalLoader::new(&mut store, small_batches())
            .append("X", &verses, &words)
            .unwrap();
        assert_eq!(second.verses_inserted, 0);
        assert_eq!(second.verses_existing, 5);
        assert_eq!(second.words_inserted, 0);
        assert_eq!(second.words_skipped_as_duplicate, words.len());
        assert_eq!(store.count_by_source("X").unwrap(), 5);
        assert_eq!(store.words_for_source("X").unwrap().len(), words.len());
    }

    #[test]
    fn duplicate_words_in_one_batch_are_counted() {
        let mut store = memory_store();
        let (verses, mut words) = batch("X", 1);
        words.push(words[0].clone());

        let summary = RelationalLoader::new(&mut store, LoaderConfig::default())
            .load("X", &verses, &words)
            .unwrap();
        assert_eq!(summary.words_inserted, 2);
        assert_eq!(summary.words_skipped_as_duplicate, 1);
        assert_eq!(summary.row_errors, 0);
    }

    #[test]
    fn row_errors_do_not_abort_batch() {
        let mut store = memory_store();
        let (mut verses, mut words) = batch("X", 3);
        // Same key twice: the second insert violates the unique constraint.
        verses.push(verses[0].clone());
        // A word whose verse is not part of the load.
        words.push(word(&verse("X", 99), 1, None));
        // A verse tagged with another source.
        verses.push(verse("Y", 1));

        let summary = RelationalLoader::new(&mut store, small_batches())
            .load("X", &verses, &words)
            .unwrap();
        assert_eq!(summary.verses_inserted, 3);
        assert_eq!(summary.words_inserted, 6);
        assert_eq!(summary.row_errors, 3);
        assert_eq!(summary.batch_errors, 0);
        assert_eq!(store.count_by_source("Y").unwrap(), 0);
    }

    /// Store whose Nth commit fails, to exercise batch abandonment.
    struct FailingCommit {
        inner: SqliteStore,
        commits: usize,
        fail_on: usize,
    }

    impl Store for FailingCommit {
        fn begin(&mut self) -> Result<(), DbError> {
            self.inner.begin()
        }

        fn commit(&mut self) -> Result<(), DbError> {
            self.commits += 1;
            if self.commits == self.fail_on {
                return Err(DbError::Other {
                    cause: "disk I/O error".to_string(),
                });
            }
            self.inner.commit()
        }

        fn rollback(&mut self) -> Result<(), DbError> {
            self.inner.rollback()
        }

        fn count_by_source(&mut self, source: &str) -> Result<i64, DbError> {
            self.inner.count_by_source(source)
        }

        fn delete_by_source(&mut self, source: &str) -> Result<usize, DbError> {
            self.inner.delete_by_source(source)
        }

        fn find_verse(&mut self, source: &str, key: &VerseKey) -> Result<Option<i32>, DbError> {
            self.inner.find_verse(source, key)
        }

        fn insert_verse(&mut self, verse: &VerseRecord) -> Result<i32, DbError> {
            self.inner.insert_verse(verse)
        }

        fn insert_word(
            &mut self,
            verse_id: i32,
            word: &WordRecord,
        ) -> Result<InsertOutcome, DbError> {
            self.inner.insert_word(verse_id, word)
        }

        fn words_for_source(&mut self, source: &str) -> Result<Vec<StoredWord>, DbError> {
            self.inner.words_for_source(source)
        }

        fn update_word(
            &mut self,
            word_id: i32,
            correction: &WordCorrection,
        ) -> Result<(), DbError> {
            self.inner.update_word(word_id, correction)
        }
    }

    #[test]
    fn failed_commit_abandons_only_that_batch() {
        let mut store = FailingCommit {
            inner: memory_store(),
            commits: 0,
            fail_on: 2,
        };
        let (verses, words) = batch("X", 6);

        // Verse batches of 3: the second one (verses 4-6) is lost, and so
        // are the words that pointed at it.
        let summary = RelationalLoader::new(&mut store, small_batches())
            .load("X", &verses, &words)
            .unwrap();
        assert_eq!(summary.batch_errors, 1);
        assert_eq!(summary.verses_inserted, 3);
        assert_eq!(summary.words_inserted, 6);
        assert_eq!(summary.row_errors, 6);
        assert_eq!(store.inner.count_by_source("X").unwrap(), 3);
    }
}
