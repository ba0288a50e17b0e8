//! Drives a set of corpus files through scanning and loading.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};
use serde_derive::Serialize;

use db::lexicon::{resolve, Lexicon, Resolution};
use db::loader::{DEFAULT_VERSE_BATCH, DEFAULT_WORD_BATCH};
use db::models::{StrongsId, VerseKey, VerseRecord, WordRecord};
use db::{LoadSummary, LoaderConfig, RelationalLoader, Store};

use crate::reconcile::{ReconcileOptions, DEFAULT_RECONCILE_LIMIT};
use crate::{scanner, source};

/// The tagged corpora this pipeline knows how to read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CorpusVariant {
    Hebrew,
    Greek,
    Arabic,
}

impl CorpusVariant {
    /// Translation source tag used when none is given.
    pub fn default_source(self) -> &'static str {
        match self {
            CorpusVariant::Hebrew => "TAHOT",
            CorpusVariant::Greek => "TAGNT",
            CorpusVariant::Arabic => "TTARASVD",
        }
    }
}

impl fmt::Display for CorpusVariant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            CorpusVariant::Hebrew => "hebrew",
            CorpusVariant::Greek => "greek",
            CorpusVariant::Arabic => "arabic",
        };
        write!(f, "{}", name)
    }
}

/// Tunables for one run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IngestConfig {
    pub verse_batch: usize,
    pub word_batch: usize,
    pub reconcile_limit: usize,
    /// Add to a source instead of replacing it.
    pub append: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            verse_batch: DEFAULT_VERSE_BATCH,
            word_batch: DEFAULT_WORD_BATCH,
            reconcile_limit: DEFAULT_RECONCILE_LIMIT,
            append: false,
        }
    }
}

impl IngestConfig {
    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            verse_batch: self.verse_batch,
            word_batch: self.word_batch,
        }
    }

    pub fn reconcile_options(&self, dry_run: bool) -> ReconcileOptions {
        ReconcileOptions {
            limit: self.reconcile_limit,
            dry_run,
        }
    }
}

/// Everything a run needs: where to write, what to validate against and
/// how to batch.
pub struct IngestionContext<S: Store, L: Lexicon> {
    pub store: S,
    pub lexicon: L,
    pub config: IngestConfig,
}

impl<S: Store, L: Lexicon> IngestionContext<S, L> {
    pub fn new(store: S, lexicon: L, config: IngestConfig) -> Self {
        Self {
            store,
            lexicon,
            config,
        }
    }
}

/// A file that could not be read at all.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub cause: String,
}

/// Counts for one run over a set of files.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub source: String,
    pub files_processed: usize,
    pub files_failed: usize,
    pub verses_parsed: usize,
    pub words_parsed: usize,
    pub parse_errors: usize,
    pub strongs_exact: usize,
    /// Extended ids known to the lexicon only by their base code.
    pub strongs_partial: usize,
    pub strongs_unresolved: usize,
    pub grammatical_markers: usize,
    /// Codes of no known grammar, by occurrence count.
    pub unclassified_codes: BTreeMap<String, usize>,
    pub load: LoadSummary,
    /// Set when the load could not start, e.g. the old rows were not removed.
    pub load_error: Option<String>,
    pub failures: Vec<FileFailure>,
}

impl RunSummary {
    /// No file failed and every batch reached the store.
    pub fn is_success(&self) -> bool {
        self.files_failed == 0 && self.load.batch_errors == 0 && self.load_error.is_none()
    }
}

/// Verses and words gathered from every file of a run.
#[derive(Default)]
struct Parsed {
    verses: Vec<VerseRecord>,
    words: Vec<WordRecord>,
    keys: HashSet<VerseKey>,
}

pub struct IngestionPipeline<'c, S: Store, L: Lexicon> {
    ctx: &'c mut IngestionContext<S, L>,
}

impl<'c, S: Store, L: Lexicon> IngestionPipeline<'c, S, L> {
    pub fn new(ctx: &'c mut IngestionContext<S, L>) -> Self {
        Self { ctx }
    }

    /// Parses every file, then loads the result under `source_tag` in one
    /// pass. Unreadable files are skipped and reported. When nothing could
    /// be parsed the store is left untouched.
    pub fn run<P: AsRef<Path>>(&mut self, source_tag: &str, paths: &[P]) -> RunSummary {
        let mut summary = RunSummary {
            source: source_tag.to_string(),
            ..RunSummary::default()
        };
        let mut parsed = Parsed::default();

        for path in paths {
            self.read_file(path.as_ref(), source_tag, &mut parsed, &mut summary);
        }

        summary.verses_parsed = parsed.verses.len();
        summary.words_parsed = parsed.words.len();
        self.classify(&parsed.words, &mut summary);

        if parsed.verses.is_empty() {
            warn!(
                "No verses parsed for '{}', existing rows left in place",
                source_tag
            );
        } else {
            let config = self.ctx.config;
            let mut loader = RelationalLoader::new(&mut self.ctx.store, config.loader_config());
            let result = if config.append {
                loader.append(source_tag, &parsed.verses, &parsed.words)
            } else {
                loader.load(source_tag, &parsed.verses, &parsed.words)
            };
            match result {
                Ok(load) => summary.load = load,
                Err(e) => {
                    error!("Load of '{}' abandoned: {}", source_tag, e);
                    summary.load_error = Some(e.to_string());
                }
            }
        }

        info!(
            "Run '{}': {} files ({} failed), {} verses, {} words, {} parse errors, {} unresolved ids, {} unclassified codes",
            source_tag,
            summary.files_processed,
            summary.files_failed,
            summary.verses_parsed,
            summary.words_parsed,
            summary.parse_errors,
            summary.strongs_unresolved,
            summary.unclassified_codes.len()
        );
        summary
    }

    fn read_file(
        &self,
        path: &Path,
        source_tag: &str,
        parsed: &mut Parsed,
        summary: &mut RunSummary,
    ) {
        let text = match source::open(path) {
            Ok(text) => text,
            Err(e) => {
                error!("{}", e);
                summary.files_failed += 1;
                summary.failures.push(FileFailure {
                    path: path.to_path_buf(),
                    cause: e.to_string(),
                });
                return;
            }
        };

        let output = scanner::scan(&text, source_tag);
        summary.files_processed += 1;
        summary.parse_errors += output.errors.len();

        let mut verses = 0;
        for block in output.blocks {
            if !parsed.keys.insert(block.verse.key()) {
                warn!(
                    "{}:{}: {} {}:{} was already read from another file, skipped",
                    path.display(),
                    block.line,
                    block.verse.book_name,
                    block.verse.chapter,
                    block.verse.verse
                );
                summary.parse_errors += 1;
                continue;
            }
            verses += 1;
            parsed.verses.push(block.verse);
            parsed.words.extend(block.words);
        }
        info!("Read {} verses from {}", verses, path.display());
    }

    fn classify(&self, words: &[WordRecord], summary: &mut RunSummary) {
        let lexicon = &self.ctx.lexicon;
        if lexicon.is_empty() {
            warn!("Lexicon is empty, every Strong's id will count as unresolved");
        }

        for word in words {
            let id = match &word.strongs_id {
                Some(id) => id,
                None => continue,
            };
            match resolve(lexicon, id) {
                Resolution::Exact(_) => summary.strongs_exact += 1,
                Resolution::Partial(_) => summary.strongs_partial += 1,
                Resolution::Exempt => summary.grammatical_markers += 1,
                Resolution::Unresolved => {
                    debug!(
                        "{} {}:{} #{}: {} not in lexicon",
                        word.verse_ref.book_name,
                        word.verse_ref.chapter,
                        word.verse_ref.verse,
                        word.word_position,
                        id
                    );
                    summary.strongs_unresolved += 1;
                }
                Resolution::Unclassified => {
                    if let StrongsId::Other(code) = id {
                        *summary.unclassified_codes.entry(code.to_owned()).or_insert(0) += 1;
                    }
                }
            }
        }

        for (code, count) in &summary.unclassified_codes {
            warn!("Unclassified code '{}' seen {} time(s)", code, count);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use db::lexicon::MemoryLexicon;
    use db::models::LexiconEntry;
    use db::{establish_connection, run_migrations, SqliteStore};
    use tempfile::TempDir;

    use super::*;

    fn context() -> IngestionContext<SqliteStore, MemoryLexicon> {
        let mut conn = establish_connection(":memory:").unwrap();
        run_migrations(&mut conn).unwrap();
        let lexicon = vec![LexiconEntry {
            strongs_id: "G1125".parse().unwrap(),
            headword: "γράφω".to_string(),
            transliteration: "graphō".to_string(),
            gloss: "to write".to_string(),
        }]
        .into_iter()
        .collect();
        IngestionContext::new(SqliteStore::new(conn), lexicon, IngestConfig::default())
    }

    fn write(dir: &TempDir, name: &str, text: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn counts_across_files() {
        let dir = TempDir::new().unwrap();
        let a = write(
            &dir,
            "3Jn.txt",
            "3Jn.1.1\n===\n#01\tΓράφω\t{G1125}\n#02\tx\tG9999\n#03\ty\tA77\n",
        );
        let b = write(
            &dir,
            "3Jn-dup.txt",
            "3Jn.1.1\n===\n#01\tz\n3Jn.1.2\n===\n#01\tw\t{G1125}\n",
        );
        let missing = dir.path().join("missing.txt");

        let mut ctx = context();
        let summary = IngestionPipeline::new(&mut ctx).run("TAGNT", &[a, b, missing]);

        assert_eq!(summary.files_processed, 2);
        assert_eq!(summary.files_failed, 1);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.verses_parsed, 2);
        assert_eq!(summary.words_parsed, 4);
        assert_eq!(summary.parse_errors, 1);
        assert_eq!(summary.strongs_exact, 2);
        assert_eq!(summary.strongs_unresolved, 1);
        assert_eq!(summary.unclassified_codes.get("A77"), Some(&1));
        assert_eq!(summary.load.verses_inserted, 2);
        assert_eq!(summary.load.words_inserted, 4);
        assert!(!summary.is_success());
        assert_eq!(ctx.store.count_by_source("TAGNT").unwrap(), 2);
    }

    #[test]
    fn empty_run_keeps_existing_rows() {
        let dir = TempDir::new().unwrap();
        let good = write(&dir, "a.txt", "Jud.1.1\n===\n#01\tἸούδας\n");
        let empty = write(&dir, "b.txt", "nothing to see\n");

        let mut ctx = context();
        IngestionPipeline::new(&mut ctx).run("TAGNT", &[good]);
        let summary = IngestionPipeline::new(&mut ctx).run("TAGNT", &[empty]);

        assert!(summary.is_success());
        assert_eq!(summary.verses_parsed, 0);
        assert_eq!(summary.load, LoadSummary::default());
        assert_eq!(ctx.store.count_by_source("TAGNT").unwrap(), 1);
    }

    #[test]
    fn variant_defaults() {
        assert_eq!(CorpusVariant::Hebrew.default_source(), "TAHOT");
        assert_eq!(CorpusVariant::Greek.to_string(), "greek");
        assert_eq!(IngestConfig::default().reconcile_options(true).limit, 300);
    }
}
