//! Maintenance pass that corrects Strong's ids of words already stored.
//!
//! For every word of a translation source:
//!
//! - when the id derived from its grammar column disagrees with the
//!   stored id, the derived id is written, provided the lexicon knows it
//!   (grammatical markers are accepted without a lookup);
//! - when it has no id, none can be taken from its grammar column, and
//!   its surface form is the headword of exactly one lexicon entry, that
//!   entry's id is written;
//! - when its surface form carries a braced annotation that leaked out
//!   of the grammar column, the annotation is removed from the surface
//!   form.
//!
//! Writes are capped per run so that every change can be reviewed;
//! what is left over is counted in the report.

use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;
use serde_derive::Serialize;

use db::lexicon::{resolve, Lexicon, Resolution};
use db::models::{StoredWord, StrongsId, WordCorrection};
use db::Store;

use crate::error::IngestError;

/// Default number of words changed per run.
pub const DEFAULT_RECONCILE_LIMIT: usize = 300;

lazy_static! {
    static ref LEAKED_RE: Regex = Regex::new(r"\{[HG]\d{3,5}[a-zA-Z]?\}").unwrap();
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Most words that may be changed in one run.
    pub limit: usize,
    /// Report what would change without writing anything.
    pub dry_run: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_RECONCILE_LIMIT,
            dry_run: false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub examined: usize,
    /// Stored ids replaced by the grammar-derived id.
    pub corrected: usize,
    /// Missing ids filled in from a unique headword match.
    pub assigned_from_headword: usize,
    pub surface_forms_repaired: usize,
    /// Extended ids accepted on their base code.
    pub partial_matches: usize,
    /// Words with zero or several headword candidates.
    pub ambiguous: usize,
    /// Grammar-derived ids the lexicon does not know.
    pub unresolved: usize,
    /// Changes left for a later run because the limit was reached.
    pub deferred_by_cap: usize,
    /// Updates the store refused.
    pub write_errors: usize,
}

impl ReconcileReport {
    pub fn changed(&self) -> usize {
        self.corrected + self.assigned_from_headword + self.surface_forms_repaired
    }
}

/// What should happen to one word.
#[derive(Debug, Default)]
struct Plan {
    correction: WordCorrection,
    corrected: bool,
    /// The correction matched the lexicon only on its base code.
    partial: bool,
    from_headword: bool,
    repaired: bool,
}

/// Runs the reconciliation pass over `source`.
pub fn reconcile<S, L>(
    store: &mut S,
    lexicon: &L,
    source: &str,
    options: &ReconcileOptions,
) -> Result<ReconcileReport, IngestError>
where
    S: Store + ?Sized,
    L: Lexicon + ?Sized,
{
    let words = store.words_for_source(source)?;
    let mut report = ReconcileReport::default();
    let mut applied = 0;

    if !options.dry_run {
        store.begin()?;
    }

    for word in &words {
        report.examined += 1;

        let plan = plan(word, lexicon, &mut report);
        if plan.correction.is_empty() {
            continue;
        }

        if applied >= options.limit {
            report.deferred_by_cap += 1;
            continue;
        }

        if !options.dry_run {
            if let Err(e) = store.update_word(word.id, &plan.correction) {
                warn!("{}: {}", locate(word), e);
                report.write_errors += 1;
                continue;
            }
        }

        debug!(
            "{}: {:?} -> {:?}",
            locate(word),
            word.strongs_id,
            plan.correction.strongs_id
        );
        applied += 1;
        report.corrected += plan.corrected as usize;
        report.partial_matches += plan.partial as usize;
        report.assigned_from_headword += plan.from_headword as usize;
        report.surface_forms_repaired += plan.repaired as usize;
    }

    if !options.dry_run {
        if let Err(e) = store.commit() {
            if let Err(rollback) = store.rollback() {
                debug!("Rollback after failed reconciliation: {}", rollback);
            }
            return Err(e.into());
        }
    }

    info!(
        "Reconciled '{}': {} examined, {} changed, {} ambiguous, {} unresolved, {} deferred",
        source,
        report.examined,
        report.changed(),
        report.ambiguous,
        report.unresolved,
        report.deferred_by_cap
    );
    Ok(report)
}

fn plan<L: Lexicon + ?Sized>(
    word: &StoredWord,
    lexicon: &L,
    report: &mut ReconcileReport,
) -> Plan {
    let mut plan = Plan::default();

    let stored = word.strongs_id.as_deref().and_then(StrongsId::normalize);
    let leaked = LEAKED_RE.find(&word.surface_form).map(|m| m.as_str().to_string());
    let surface = match leaked {
        Some(_) => LEAKED_RE.replace_all(&word.surface_form, "").trim().to_string(),
        None => word.surface_form.to_owned(),
    };
    if leaked.is_some() && !surface.is_empty() {
        plan.correction.surface_form = Some(surface.to_owned());
        plan.repaired = true;
    }

    let derived = word
        .grammar_code
        .as_deref()
        .and_then(StrongsId::normalize)
        .or_else(|| leaked.as_deref().and_then(StrongsId::normalize));

    let mut try_headword = stored.is_none() && derived.is_none();
    if let Some(derived) = derived.filter(|d| Some(d) != stored.as_ref()) {
        let resolution = resolve(lexicon, &derived);
        if resolution.resolves() {
            plan.partial = matches!(resolution, Resolution::Partial(_));
            plan.correction.strongs_id = Some(derived.to_string());
            plan.corrected = true;
        } else {
            warn!(
                "{}: '{}' is not in the lexicon, stored {:?} kept",
                locate(word),
                derived,
                word.strongs_id
            );
            report.unresolved += 1;
            try_headword = stored.is_none();
        }
    }

    if try_headword {
        let candidates = lexicon.lookup_by_headword(&surface);
        if candidates.len() == 1 {
            plan.correction.strongs_id = Some(candidates[0].to_string());
            plan.from_headword = true;
        } else {
            let e = IngestError::StrongsIdAmbiguity {
                surface_form: surface.to_owned(),
                candidates: candidates.iter().map(|id| id.to_string()).collect(),
            };
            warn!("{}: {}", locate(word), e);
            report.ambiguous += 1;
        }
    }

    plan
}

fn locate(word: &StoredWord) -> String {
    format!(
        "{} {}:{} #{}",
        word.book_name, word.chapter, word.verse, word.word_position
    )
}
