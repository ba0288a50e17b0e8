//! Read-only lexicon lookups used to validate Strong's identifiers.

use std::collections::HashMap;
use std::iter::FromIterator;

use log::debug;

use crate::models::{LexiconEntry, StrongsId};

/// Trait implemented by types that can look up lexicon headwords.
pub trait Lexicon {
    /// Looks up the entry for exactly this identifier.
    fn lookup(&self, id: &StrongsId) -> Option<LexiconEntry>;

    /// Returns every identifier whose headword is exactly `text`.
    fn lookup_by_headword(&self, text: &str) -> Vec<StrongsId>;

    /// Number of entries available.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lexicon held in memory, prefetched once per run.
#[derive(Clone, Debug, Default)]
pub struct MemoryLexicon {
    entries: HashMap<StrongsId, LexiconEntry>,
    headwords: HashMap<String, Vec<StrongsId>>,
}

impl MemoryLexicon {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry, replacing any earlier entry with the same id.
    pub fn insert(&mut self, entry: LexiconEntry) {
        if let Some(previous) = self.entries.remove(&entry.strongs_id) {
            if let Some(ids) = self.headwords.get_mut(&previous.headword) {
                ids.retain(|id| id != &previous.strongs_id);
            }
        }

        self.headwords
            .entry(entry.headword.to_owned())
            .or_default()
            .push(entry.strongs_id.clone());
        self.entries.insert(entry.strongs_id.clone(), entry);
    }
}

impl FromIterator<LexiconEntry> for MemoryLexicon {
    fn from_iter<I: IntoIterator<Item = LexiconEntry>>(iter: I) -> Self {
        let mut lexicon = MemoryLexicon::new();
        for entry in iter {
            lexicon.insert(entry);
        }
        lexicon
    }
}

impl Lexicon for MemoryLexicon {
    fn lookup(&self, id: &StrongsId) -> Option<LexiconEntry> {
        self.entries.get(id).cloned()
    }

    fn lookup_by_headword(&self, text: &str) -> Vec<StrongsId> {
        self.headwords.get(text).cloned().unwrap_or_default()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Outcome of validating an identifier against a lexicon.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution {
    /// The identifier has its own entry.
    Exact(LexiconEntry),
    /// An extended id with no entry of its own, matched on its base code.
    Partial(LexiconEntry),
    /// Grammatical markers are not expected to have entries.
    Exempt,
    /// A Strong's number with no entry.
    Unresolved,
    /// A code of unknown grammar that cannot be validated.
    Unclassified,
}

impl Resolution {
    /// Whether the identifier may be trusted as a correction.
    pub fn resolves(&self) -> bool {
        matches!(
            self,
            Resolution::Exact(_) | Resolution::Partial(_) | Resolution::Exempt
        )
    }
}

/// Validates an identifier against the lexicon.
///
/// Extended ids are looked up with their suffix first and fall back to
/// the base code. Hybrids resolve through their primary id.
pub fn resolve<L: Lexicon + ?Sized>(lexicon: &L, id: &StrongsId) -> Resolution {
    match id {
        StrongsId::GrammaticalMarker { .. } => Resolution::Exempt,
        StrongsId::Other(_) => Resolution::Unclassified,
        StrongsId::Hybrid { primary, .. } => resolve(lexicon, primary),
        StrongsId::Standard { .. } => lexicon
            .lookup(id)
            .map(Resolution::Exact)
            .unwrap_or(Resolution::Unresolved),
        StrongsId::Extended { .. } => {
            if let Some(entry) = lexicon.lookup(id) {
                return Resolution::Exact(entry);
            }
            match lexicon.lookup(&id.base()) {
                Some(entry) => {
                    debug!("Partial lexicon match for {} on {}", id, entry.strongs_id);
                    Resolution::Partial(entry)
                }
                None => Resolution::Unresolved,
            }
        }
    }
}
