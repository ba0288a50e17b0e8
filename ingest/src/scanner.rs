//! Splits corpus text into verse blocks.
//!
//! A block is a reference line (`Gen.1.1`), a line of `=`, an optional
//! column header and then one tab-delimited row per word. Anything else
//! in the file (title pages, footers, notes) is skipped.

use std::collections::HashSet;

use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;

use db::models::{VerseKey, VerseRecord, WordRecord};

use crate::books;
use crate::error::IngestError;
use crate::row::{is_word_index, parse_row};

/// First-column labels that mark a column-header line.
const HEADER_LABELS: [&str; 5] = ["#", "word", "index", "ref", "no."];

lazy_static! {
    static ref VERSE_REF_RE: Regex = Regex::new(r"^([A-Za-z0-9]{3})\.(\d+)\.(\d+)\s*$").unwrap();
    static ref SEPARATOR_RE: Regex = Regex::new(r"^=+$").unwrap();
}

/// A verse with the words tagged in it.
#[derive(Clone, Debug, PartialEq)]
pub struct VerseBlock {
    pub verse: VerseRecord,
    pub words: Vec<WordRecord>,
    /// Line of the reference that opened the block.
    pub line: usize,
}

/// Everything recovered from one file.
#[derive(Debug, Default)]
pub struct ScanOutput {
    pub blocks: Vec<VerseBlock>,
    pub errors: Vec<IngestError>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Scanning,
    ExpectSeparator,
    ExpectHeaderOrWords,
    InWordRows,
}

/// Line-oriented state machine over a corpus file.
pub struct RecordScanner<'a> {
    source_tag: &'a str,
    state: State,
    current: Option<VerseBlock>,
    positions: HashSet<i32>,
    seen: HashSet<VerseKey>,
    output: ScanOutput,
}

/// Scans `text` into blocks tagged with `source_tag`.
pub fn scan(text: &str, source_tag: &str) -> ScanOutput {
    let mut scanner = RecordScanner::new(source_tag);
    for (i, line) in text.lines().enumerate() {
        scanner.feed(i + 1, line);
    }
    scanner.finish()
}

impl<'a> RecordScanner<'a> {
    pub fn new(source_tag: &'a str) -> Self {
        Self {
            source_tag,
            state: State::Scanning,
            current: None,
            positions: HashSet::new(),
            seen: HashSet::new(),
            output: ScanOutput::default(),
        }
    }

    /// Processes one line; `line_no` is 1-based and only used in errors.
    pub fn feed(&mut self, line_no: usize, line: &str) {
        if let Some(caps) = VERSE_REF_RE.captures(line) {
            self.open_block(line_no, &caps[1], &caps[2], &caps[3]);
            return;
        }

        if line.trim().is_empty() {
            return;
        }

        match self.state {
            State::Scanning => {}
            State::ExpectSeparator => {
                if SEPARATOR_RE.is_match(line.trim()) {
                    self.state = State::ExpectHeaderOrWords;
                }
            }
            State::ExpectHeaderOrWords => {
                self.state = State::InWordRows;
                if !is_header(line) {
                    self.word_row(line_no, line);
                }
            }
            State::InWordRows => self.word_row(line_no, line),
        }
    }

    /// Flushes the block in progress and returns what was scanned.
    pub fn finish(mut self) -> ScanOutput {
        self.close_block();
        self.output
    }

    fn open_block(&mut self, line_no: usize, book: &str, chapter: &str, verse: &str) {
        self.close_block();
        self.state = State::Scanning;

        let (chapter, verse) = match (chapter.parse::<i32>(), verse.parse::<i32>()) {
            (Ok(chapter), Ok(verse)) if chapter > 0 => (chapter, verse),
            _ => {
                self.error(
                    line_no,
                    format!("'{}.{}.{}' is not a valid verse reference", book, chapter, verse),
                );
                return;
            }
        };

        let (book_code, book_name) = match books::resolve(book) {
            Some(b) => (b.code.to_string(), b.name.to_string()),
            None => {
                warn!("Line {}: unknown book abbreviation '{}'", line_no, book);
                (book.to_string(), book.to_string())
            }
        };

        let verse = VerseRecord {
            book_code,
            book_name,
            chapter,
            verse,
            text: String::new(),
            translation_source: self.source_tag.to_string(),
        };
        if !self.seen.insert(verse.key()) {
            self.error(
                line_no,
                format!(
                    "{} {}:{} appears more than once; later block skipped",
                    verse.book_name, verse.chapter, verse.verse
                ),
            );
            return;
        }

        self.current = Some(VerseBlock {
            verse,
            words: Vec::new(),
            line: line_no,
        });
        self.positions.clear();
        self.state = State::ExpectSeparator;
    }

    fn close_block(&mut self) {
        if let Some(block) = self.current.take() {
            self.output.blocks.push(block);
        }
    }

    fn word_row(&mut self, line_no: usize, line: &str) {
        let columns: Vec<&str> = line.split('\t').collect();
        if !is_word_index(columns[0]) {
            return;
        }

        let row = match parse_row(&columns) {
            Ok(row) => row,
            Err(e) => {
                self.error(line_no, e.to_string());
                return;
            }
        };

        // A merged index reserves every position it covers, so a later row
        // reusing one of them is a duplicate rather than a gap filler.
        let covered = row.position..=row.last_position;
        if let Some(taken) = covered.clone().find(|p| self.positions.contains(p)) {
            self.error(
                line_no,
                format!("word #{} repeats an earlier position in this verse", taken),
            );
            return;
        }
        self.positions.extend(covered);
        if row.spans_multiple() {
            debug!(
                "Line {}: #{} covers positions {} to {}",
                line_no, row.position, row.position, row.last_position
            );
        }

        if let Some(block) = self.current.as_mut() {
            if !block.verse.text.is_empty() {
                block.verse.text.push(' ');
            }
            block.verse.text.push_str(&row.surface_form);

            let key = block.verse.key();
            block.words.push(row.into_record(key));
        }
    }

    fn error(&mut self, line: usize, message: String) {
        let e = IngestError::Parse { line, message };
        warn!("{}", e);
        self.output.errors.push(e);
    }
}

fn is_header(line: &str) -> bool {
    let first = line
        .split('\t')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase();
    if is_word_index(&first) {
        return false;
    }
    HEADER_LABELS
        .iter()
        .any(|label| first == *label || (label.len() > 1 && first.starts_with(label)))
}
