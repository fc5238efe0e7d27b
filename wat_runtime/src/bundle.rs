//! Export bundle builder — versioned, privacy-mode-aware (`rb_v3`).
//!
//! The bundle is the hashed unit of export. Top-level key order is part of
//! the wire contract (`BUNDLE_KEY_ORDER`); nested objects rely on struct
//! field order. Building twice from identical inputs, timestamp included,
//! yields canonically identical bytes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use wat_core::canonical::{canonical_json, sha256_hex};
use wat_core::domain::{SessionResult, StimulusPackSnapshot};
use wat_core::snapshot;
use wat_core::{
    APP_VERSION, EXPORT_SCHEMA_VERSION, PROTOCOL_DOC_VERSION,
    SCORING_ALGORITHM,
};

/// Fixed top-level key order for hashing purposes.
pub const BUNDLE_KEY_ORDER: &[&str] = &[
    "exportSchemaVersion",
    "exportedAt",
    "protocolDocVersion",
    "appVersion",
    "scoringAlgorithm",
    "privacy",
    "sessionResult",
    "stimulusPackSnapshot",
    "ciCounts",
    "annotationsSummary",
];

/// What an export may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyMode {
    /// Stimulus words and responses both included.
    Full,
    /// Responses included, stimulus words excluded.
    Minimal,
    /// Neither included; response text blanked, timing retained.
    Redacted,
}

impl PrivacyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrivacyMode::Full => "full",
            PrivacyMode::Minimal => "minimal",
            PrivacyMode::Redacted => "redacted",
        }
    }

    pub fn includes_stimulus_words(&self) -> bool {
        matches!(self, PrivacyMode::Full)
    }

    pub fn includes_responses(&self) -> bool {
        !matches!(self, PrivacyMode::Redacted)
    }
}

/// Records exactly which content categories the bundle carries. The
/// anonymize flag is recorded explicitly, never inferred after the fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivacyManifest {
    pub mode: PrivacyMode,
    pub include_stimulus_words: bool,
    pub include_responses: bool,
    pub identifiers_anonymized: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub export_schema_version: String,
    pub exported_at: String,
    pub protocol_doc_version: String,
    pub app_version: String,
    pub scoring_algorithm: String,
    pub privacy: PrivacyManifest,
    pub session_result: SessionResult,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub stimulus_pack_snapshot: Option<StimulusPackSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ci_counts: Option<BTreeMap<String, u32>>,
    /// Present only when at least one annotation exists for the session —
    /// omitted entirely otherwise, never present-but-empty.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub annotations_summary: Option<BTreeMap<String, u32>>,
}

/// Inputs to the builder. The session carries its own trials, flags and
/// summary; ancillary summaries are attached when available.
#[derive(Debug, Clone)]
pub struct BundleRequest {
    pub mode: PrivacyMode,
    pub session: SessionResult,
    pub ci_counts: Option<BTreeMap<String, u32>>,
    pub annotations_summary: Option<BTreeMap<String, u32>>,
    /// RFC 3339 UTC; caller-supplied so rebuilds are reproducible.
    pub exported_at: String,
    pub anonymize: bool,
}

/// Assemble a privacy-filtered bundle from a completed session.
pub fn build_bundle(request: BundleRequest) -> ExportBundle {
    let mode = request.mode;
    let mut session = request.session;

    // Normalize before any stripping so hash and schema tag survive the
    // removal of the literal word list.
    let snapshot = session
        .pack_snapshot
        .take()
        .map(|s| snapshot::normalize(s, None))
        .map(|mut s| {
            if !mode.includes_stimulus_words() {
                s.words = None;
            }
            s
        });
    session.pack_snapshot = snapshot.clone();

    if !mode.includes_responses() {
        for trial in &mut session.trials {
            trial.response = String::new();
        }
    }

    if request.anonymize {
        session.id = anonymized_id(&session.id);
        session.environment = None;
    }

    let annotations_summary = request
        .annotations_summary
        .filter(|summary| !summary.is_empty());

    ExportBundle {
        export_schema_version: EXPORT_SCHEMA_VERSION.to_string(),
        exported_at: request.exported_at,
        protocol_doc_version: PROTOCOL_DOC_VERSION.to_string(),
        app_version: APP_VERSION.to_string(),
        scoring_algorithm: SCORING_ALGORITHM.to_string(),
        privacy: PrivacyManifest {
            mode,
            include_stimulus_words: mode.includes_stimulus_words(),
            include_responses: mode.includes_responses(),
            identifiers_anonymized: request.anonymize,
        },
        session_result: session,
        stimulus_pack_snapshot: snapshot,
        ci_counts: request.ci_counts.filter(|c| !c.is_empty()),
        annotations_summary,
    }
}

/// Canonical serialization of a bundle — the byte form all digests and
/// comparisons are defined over.
pub fn canonical_bundle_json(bundle: &ExportBundle) -> String {
    let value = serde_json::to_value(bundle)
        .expect("bundle serialization cannot fail");
    canonical_json(&value, BUNDLE_KEY_ORDER)
}

/// Content hash of a bundle's canonical form, used for filenames and
/// provenance labels.
pub fn bundle_content_hash(bundle: &ExportBundle) -> String {
    sha256_hex(canonical_bundle_json(bundle).as_bytes())
}

/// Stable pseudonym for a session id: `anon-` + first 12 hex of its
/// digest. Same input, same pseudonym — exports stay correlatable
/// without exposing the original id.
fn anonymized_id(id: &str) -> String {
    format!("anon-{}", &sha256_hex(id.as_bytes())[..12])
}
