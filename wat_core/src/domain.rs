//! Core domain types — pure data, no behaviour.
//!
//! All wire-facing structs serialize with camelCase keys; struct field
//! order IS the canonical nested key order, so field declarations here are
//! part of the wire contract. Optional keys are omitted when absent, never
//! written as `null` — except the NaN-safe summary fields, which serialize
//! as `null` when undefined.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

// ── Trials and flags ───────────────────────────────────────────────

/// A single word-association trial. Immutable once scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trial {
    /// Position in the realized stimulus order, 0-based.
    pub index: u32,
    pub stimulus: String,
    pub response: String,
    pub reaction_time_ms: u32,
    /// Milliseconds from stimulus onset to first keystroke.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub time_to_first_key_ms: Option<u32>,
    pub backspace_count: u32,
    pub edit_count: u32,
    pub composition_count: u32,
    pub practice: bool,
    /// Set by the input collector when the response window elapsed.
    #[serde(default)]
    pub timed_out: bool,
}

/// Per-trial flag kinds emitted by the scoring engine.
///
/// Wire names are locked; `Ord` (declaration order) fixes the order flags
/// appear in serialized sets and count maps.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FlagKind {
    EmptyResponse,
    RepeatedResponse,
    TimingOutlierSlow,
    TimingOutlierFast,
    HighEditing,
    Timeout,
}

impl FlagKind {
    /// Stable wire name, also used in CSV rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagKind::EmptyResponse => "empty_response",
            FlagKind::RepeatedResponse => "repeated_response",
            FlagKind::TimingOutlierSlow => "timing_outlier_slow",
            FlagKind::TimingOutlierFast => "timing_outlier_fast",
            FlagKind::HighEditing => "high_editing",
            FlagKind::Timeout => "timeout",
        }
    }
}

/// Flags derived for one trial. Never hand-edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialFlags {
    pub index: u32,
    pub flags: BTreeSet<FlagKind>,
}

/// Aggregate statistics over all non-practice trials.
///
/// Central-tendency fields are `None` (wire `null`) when no usable
/// reaction times exist; the engine never errors on empty input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringSummary {
    /// Count of non-practice trials, timed-out included.
    pub scored_trials: u32,
    pub mean_rt_ms: Option<f64>,
    pub median_rt_ms: Option<f64>,
    pub stddev_rt_ms: Option<f64>,
    /// Flag occurrences over non-practice trials; zero counts omitted.
    pub flag_counts: BTreeMap<FlagKind, u32>,
}

// ── Session configuration and results ──────────────────────────────

/// How the realized stimulus order was produced.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum OrderPolicy {
    Fixed,
    Shuffled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub pack_id: String,
    pub pack_version: String,
    pub order_policy: OrderPolicy,
    pub seed: u64,
    pub max_response_ms: u32,
}

/// Environment the session ran in, captured by an external collaborator
/// and carried opaquely. Never inspected by scoring or export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentContext {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub app_build: Option<String>,
}

/// Snapshot of the stimulus pack a session ran against.
///
/// Invariant: when `words` is present and non-empty, `content_hash` and
/// `schema_version` are present and the hash equals the canonical word-list
/// digest. `snapshot::normalize` enforces this at every construction site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StimulusPackSnapshot {
    pub pack_id: String,
    pub pack_version: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub content_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub schema_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub source: Option<String>,
    /// Literal word list; stripped under minimal/redacted privacy modes.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub words: Option<Vec<String>>,
}

/// A completed session. Persisted once, read-only thereafter except for
/// deletion. Exclusively owns its trials, flags, summary and snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResult {
    pub id: String,
    pub config: SessionConfig,
    pub trials: Vec<Trial>,
    /// RFC 3339 UTC.
    pub started_at: String,
    pub ended_at: String,
    pub summary: ScoringSummary,
    pub flags: Vec<TrialFlags>,
    pub seed_used: u64,
    /// Realized presentation order: stimulus indices into the pack.
    pub stimulus_order: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub environment: Option<EnvironmentContext>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pack_snapshot: Option<StimulusPackSnapshot>,
    /// Provenance of the originating package when imported.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub imported_from: Option<String>,
    pub scoring_algorithm: String,
    pub app_version: String,
    pub export_schema_version: String,
}

/// Mutable precursor to a `SessionResult`, persisted incrementally.
/// Exactly one draft is active at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSession {
    pub id: String,
    pub config: SessionConfig,
    pub trials: Vec<Trial>,
    pub stimulus_order: Vec<u32>,
    pub started_at: String,
    pub updated_at: String,
}

/// Manual per-trial annotation. Deleted when tags and note are both empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub session_id: String,
    pub trial_index: u32,
    pub tags: BTreeSet<String>,
    pub note: String,
}

impl Annotation {
    /// Empty annotations are removed from storage rather than kept.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.note.trim().is_empty()
    }
}
