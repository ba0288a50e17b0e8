//! Three-letter book abbreviations used by the tagged corpora.

use std::collections::HashMap;

use lazy_static::lazy_static;

/// Array of books in canonical order, as `(abbreviation, name)`.
const BOOKS: [(&str, &str); 66] = [
    ("Gen", "Genesis"),
    ("Exo", "Exodus"),
    ("Lev", "Leviticus"),
    ("Num", "Numbers"),
    ("Deu", "Deuteronomy"),
    ("Jos", "Joshua"),
    ("Jdg", "Judges"),
    ("Rut", "Ruth"),
    ("1Sa", "1 Samuel"),
    ("2Sa", "2 Samuel"),
    ("1Ki", "1 Kings"),
    ("2Ki", "2 Kings"),
    ("1Ch", "1 Chronicles"),
    ("2Ch", "2 Chronicles"),
    ("Ezr", "Ezra"),
    ("Neh", "Nehemiah"),
    ("Est", "Esther"),
    ("Job", "Job"),
    ("Psa", "Psalms"),
    ("Pro", "Proverbs"),
    ("Ecc", "Ecclesiastes"),
    ("Sng", "Song of Solomon"),
    ("Isa", "Isaiah"),
    ("Jer", "Jeremiah"),
    ("Lam", "Lamentations"),
    ("Ezk", "Ezekiel"),
    ("Dan", "Daniel"),
    ("Hos", "Hosea"),
    ("Jol", "Joel"),
    ("Amo", "Amos"),
    ("Oba", "Obadiah"),
    ("Jon", "Jonah"),
    ("Mic", "Micah"),
    ("Nam", "Nahum"),
    ("Hab", "Habakkuk"),
    ("Zep", "Zephaniah"),
    ("Hag", "Haggai"),
    ("Zec", "Zechariah"),
    ("Mal", "Malachi"),
    ("Mat", "Matthew"),
    ("Mrk", "Mark"),
    ("Luk", "Luke"),
    ("Jhn", "John"),
    ("Act", "Acts"),
    ("Rom", "Romans"),
    ("1Co", "1 Corinthians"),
    ("2Co", "2 Corinthians"),
    ("Gal", "Galatians"),
    ("Eph", "Ephesians"),
    ("Php", "Philippians"),
    ("Col", "Colossians"),
    ("1Th", "1 Thessalonians"),
    ("2Th", "2 Thessalonians"),
    ("1Ti", "1 Timothy"),
    ("2Ti", "2 Timothy"),
    ("Tit", "Titus"),
    ("Phm", "Philemon"),
    ("Heb", "Hebrews"),
    ("Jas", "James"),
    ("1Pe", "1 Peter"),
    ("2Pe", "2 Peter"),
    ("1Jn", "1 John"),
    ("2Jn", "2 John"),
    ("3Jn", "3 John"),
    ("Jud", "Jude"),
    ("Rev", "Revelation"),
];

/// Alternate spellings seen in older exports, mapped to the canonical
/// abbreviation.
const ALIASES: [(&str, &str); 10] = [
    ("Eze", "Ezk"),
    ("Joe", "Jol"),
    ("Nah", "Nam"),
    ("Sol", "Sng"),
    ("Son", "Sng"),
    ("Mar", "Mrk"),
    ("Joh", "Jhn"),
    ("Jde", "Jud"),
    ("Phi", "Php"),
    ("Jam", "Jas"),
];

/// A book resolved from its abbreviation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Book {
    pub code: &'static str,
    pub name: &'static str,
}

lazy_static! {
    static ref BY_ABBREVIATION: HashMap<String, Book> = {
        let mut books = HashMap::new();
        for &(code, name) in BOOKS.iter() {
            books.insert(code.to_lowercase(), Book { code, name });
        }
        for &(alias, code) in ALIASES.iter() {
            if let Some(book) = books.get(&code.to_lowercase()).copied() {
                books.insert(alias.to_lowercase(), book);
            }
        }
        books
    };
}

/// Looks up a book by its abbreviation, ignoring case.
pub fn resolve(abbreviation: &str) -> Option<Book> {
    BY_ABBREVIATION.get(&abbreviation.to_lowercase()).copied()
}
