//! Clinical-interest classifier — short categorical codes per trial.
//!
//! Pure, order-independent function of (response, flags, stimulus).
//! Failure short-circuits; all other rules evaluate independently, so a
//! trial can carry several codes at once. An empty code set is a valid,
//! unremarkable outcome.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{FlagKind, Trial};

/// Clinical-interest codes. `Ord` (declaration order) fixes the order
/// codes appear in serialized sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CiCode {
    /// Failure: timed out or no response. Terminal — excludes all others.
    Failure,
    /// Response repeats the stimulus word.
    RepeatedStimulus,
    /// Multi-syllabic-word response (more than one token).
    MultiWord,
    /// Prolonged reaction time.
    ProlongedReaction,
    /// Perseveration marker.
    Perseveration,
}

impl CiCode {
    /// Short code as it appears in exports.
    pub fn as_str(&self) -> &'static str {
        match self {
            CiCode::Failure => "F",
            CiCode::RepeatedStimulus => "RSW",
            CiCode::MultiWord => "MSW",
            CiCode::ProlongedReaction => "PRT",
            CiCode::Perseveration => "(P)",
        }
    }
}

/// Derive the code set for one trial from its response content and its
/// already-computed flags.
pub fn classify_trial(
    trial: &Trial,
    flags: &BTreeSet<FlagKind>,
) -> BTreeSet<CiCode> {
    let mut codes = BTreeSet::new();
    let response = trial.response.trim();

    if flags.contains(&FlagKind::Timeout) || response.is_empty() {
        codes.insert(CiCode::Failure);
        return codes;
    }

    if response.to_lowercase() == trial.stimulus.trim().to_lowercase() {
        codes.insert(CiCode::RepeatedStimulus);
    }
    if response.split_whitespace().count() > 1 {
        codes.insert(CiCode::MultiWord);
    }
    if flags.contains(&FlagKind::TimingOutlierSlow) {
        codes.insert(CiCode::ProlongedReaction);
    }
    if flags.contains(&FlagKind::RepeatedResponse) {
        codes.insert(CiCode::Perseveration);
    }

    codes
}

/// Sum code occurrences across per-trial code sets. Codes with zero
/// occurrences are omitted entirely.
pub fn aggregate_ci_counts<'a, I>(sets: I) -> BTreeMap<String, u32>
where
    I: IntoIterator<Item = &'a BTreeSet<CiCode>>,
{
    let mut counts = BTreeMap::new();
    for set in sets {
        for code in set {
            *counts.entry(code.as_str().to_string()).or_insert(0) += 1;
        }
    }
    counts
}
