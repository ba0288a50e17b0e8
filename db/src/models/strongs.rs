use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_derive::Serialize;

use crate::DbError;

/// Shortest width a Strong's number is padded to, e.g. `G25` -> `G0025`.
const CODE_WIDTH: usize = 4;

/// Source language of a Strong's number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Language {
    Hebrew,
    Greek,
}

impl Language {
    pub fn prefix(self) -> char {
        match self {
            Language::Hebrew => 'H',
            Language::Greek => 'G',
        }
    }

    fn from_prefix(s: &str) -> Option<Self> {
        match s {
            "H" => Some(Language::Hebrew),
            "G" => Some(Language::Greek),
            _ => None,
        }
    }
}

/// A canonical Strong's concordance identifier.
///
/// Values are built once, when an annotation is read, and are written
/// to the store using their `Display` form: `H0430`, `H3427a`,
/// `H1254G2936`, `H9001`, or the raw text for unclassified codes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum StrongsId {
    Standard {
        lang: Language,
        code: String,
    },
    /// A sense-specific id such as `H3427a`.
    Extended {
        lang: Language,
        code: String,
        suffix: char,
    },
    /// A word of one language annotated with a concept from the other.
    Hybrid {
        primary: Box<StrongsId>,
        secondary: Box<StrongsId>,
    },
    /// Hebrew syntactic markers (`H9xxx`); these have no headword.
    GrammaticalMarker { code: String },
    /// Codes with neither an `H` nor a `G` grammar. Kept verbatim so they
    /// can be classified by hand instead of being dropped.
    Other(String),
}

lazy_static! {
    static ref BRACED_RE: Regex = Regex::new(r"\{([HG])(\d{3,5})([a-zA-Z])?\}").unwrap();
    static ref HYBRID_RE: Regex = Regex::new(r"^([HG])(\d{3,5})([HG])(\d{3,5})$").unwrap();
    static ref BARE_RE: Regex = Regex::new(r"^([HG])(\d{1,5})([a-zA-Z])?$").unwrap();
}

impl StrongsId {
    /// Derives an identifier from a raw code or a grammar annotation.
    ///
    /// Braced codes (`{H0430}`, `{H3427a}`) anywhere in the annotation win
    /// over everything else; an unbraced `H1234G5678` is a hybrid; a bare
    /// code (`G1125`) is accepted as-is. Blank input has no identifier.
    pub fn normalize(raw: &str) -> Option<StrongsId> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if let Some(caps) = BRACED_RE.captures(raw) {
            return Some(Self::from_captures(&caps));
        }

        if let Some(caps) = HYBRID_RE.captures(raw) {
            if caps[1] != caps[3] {
                return Some(StrongsId::Hybrid {
                    primary: Box::new(Self::simple(&caps[1], &caps[2], None)),
                    secondary: Box::new(Self::simple(&caps[3], &caps[4], None)),
                });
            }
        }

        if let Some(caps) = BARE_RE.captures(raw) {
            return Some(Self::from_captures(&caps));
        }

        Some(StrongsId::Other(raw.to_string()))
    }

    /// Builds an id from `(prefix, digits, suffix?)` regex captures.
    fn from_captures(caps: &Captures) -> StrongsId {
        let suffix = caps.get(3).and_then(|m| m.as_str().chars().next());
        Self::simple(&caps[1], &caps[2], suffix)
    }

    fn simple(prefix: &str, digits: &str, suffix: Option<char>) -> StrongsId {
        // The prefix is constrained by the calling regex.
        let lang = Language::from_prefix(prefix).unwrap_or(Language::Hebrew);
        let suffix = suffix.map(|c| c.to_ascii_lowercase());

        // Markers keep their digits as written; padding `H900` to `H0900`
        // would turn it into an ordinary number.
        if lang == Language::Hebrew && digits.starts_with('9') {
            let mut marker = format!("H{}", digits);
            marker.extend(suffix);
            return StrongsId::GrammaticalMarker { code: marker };
        }

        let code = format!("{:0>width$}", digits, width = CODE_WIDTH);

        match suffix {
            Some(suffix) => StrongsId::Extended { lang, code, suffix },
            None => StrongsId::Standard { lang, code },
        }
    }

    /// The suffix-less form of an `Extended` id; other ids are returned as-is.
    pub fn base(&self) -> StrongsId {
        match self {
            StrongsId::Extended { lang, code, .. } => StrongsId::Standard {
                lang: *lang,
                code: code.to_owned(),
            },
            other => other.clone(),
        }
    }

    pub fn language(&self) -> Option<Language> {
        match self {
            StrongsId::Standard { lang, .. } | StrongsId::Extended { lang, .. } => Some(*lang),
            StrongsId::Hybrid { primary, .. } => primary.language(),
            StrongsId::GrammaticalMarker { .. } => Some(Language::Hebrew),
            StrongsId::Other(_) => None,
        }
    }

    pub fn is_grammatical_marker(&self) -> bool {
        matches!(self, StrongsId::GrammaticalMarker { .. })
    }
}

impl fmt::Display for StrongsId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StrongsId::Standard { lang, code } => write!(f, "{}{}", lang.prefix(), code),
            StrongsId::Extended { lang, code, suffix } => {
                write!(f, "{}{}{}", lang.prefix(), code, suffix)
            }
            StrongsId::Hybrid { primary, secondary } => write!(f, "{}{}", primary, secondary),
            StrongsId::GrammaticalMarker { code } => write!(f, "{}", code),
            StrongsId::Other(raw) => write!(f, "{}", raw),
        }
    }
}

impl FromStr for StrongsId {
    type Err = DbError;

    fn from_str(s: &str) -> Result<StrongsId, Self::Err> {
        StrongsId::normalize(s).ok_or_else(|| DbError::InvalidStrongsId {
            code: s.to_string(),
        })
    }
}
