//! Export pipeline — session → bundle → package.
//!
//! One call assembles the whole artifact: CI-code aggregation from the
//! session's own trials and flags, privacy-filtered bundle, both CSV
//! renderings, and the digest-bearing package envelope. The CSVs are
//! rendered from the privacy-filtered session so a redacted package
//! never carries response text anywhere.

use std::collections::BTreeSet;

use wat_core::classifier::{aggregate_ci_counts, classify_trial};
use wat_core::domain::SessionResult;

use crate::bundle::{build_bundle, BundleRequest, PrivacyMode};
use crate::csv::{ci_code_cells, render_csv};
use crate::package::{build_package, ExportPackage};

/// CI-code counts for a scored session, derived from its trials and
/// per-trial flags.
pub fn ci_counts_for(
    session: &SessionResult,
) -> std::collections::BTreeMap<String, u32> {
    let empty = BTreeSet::new();
    let sets: Vec<BTreeSet<_>> = session
        .trials
        .iter()
        .map(|trial| {
            let flags = session
                .flags
                .iter()
                .find(|tf| tf.index == trial.index)
                .map(|tf| &tf.flags)
                .unwrap_or(&empty);
            classify_trial(trial, flags)
        })
        .collect();
    aggregate_ci_counts(sets.iter())
}

/// Build a complete export package for a session.
pub fn export_session(
    session: SessionResult,
    mode: PrivacyMode,
    annotations_summary: Option<std::collections::BTreeMap<String, u32>>,
    exported_at: String,
    anonymize: bool,
) -> ExportPackage {
    let ci_counts = ci_counts_for(&session);
    // CI codes come from the unfiltered trials; redaction must blank
    // response text, not rewrite classifications.
    let code_cells = ci_code_cells(&session);

    let bundle = build_bundle(BundleRequest {
        mode,
        session,
        ci_counts: (!ci_counts.is_empty()).then_some(ci_counts),
        annotations_summary,
        exported_at: exported_at.clone(),
        anonymize,
    });

    // Rows render from the already-filtered session inside the bundle.
    let csv = render_csv(&bundle.session_result, &code_cells, false);
    let csv_redacted = render_csv(&bundle.session_result, &code_cells, true);

    build_package(bundle, csv, csv_redacted, exported_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::verify_package;
    use wat_core::domain::{
        OrderPolicy, SessionConfig, Trial,
    };
    use wat_core::scoring::score_trials;

    fn session() -> SessionResult {
        let trials = vec![
            Trial {
                index: 0,
                stimulus: "night".to_string(),
                response: "night".to_string(),
                reaction_time_ms: 480,
                time_to_first_key_ms: None,
                backspace_count: 0,
                edit_count: 0,
                composition_count: 0,
                practice: false,
                timed_out: false,
            },
            Trial {
                index: 1,
                stimulus: "lamp".to_string(),
                response: "".to_string(),
                reaction_time_ms: 30_000,
                time_to_first_key_ms: None,
                backspace_count: 0,
                edit_count: 0,
                composition_count: 0,
                practice: false,
                timed_out: true,
            },
        ];
        let outcome = score_trials(&trials);
        SessionResult {
            id: "sess-1".to_string(),
            config: SessionConfig {
                pack_id: "core_de".to_string(),
                pack_version: "1.0.0".to_string(),
                order_policy: OrderPolicy::Fixed,
                seed: 1,
                max_response_ms: 30_000,
            },
            trials,
            started_at: "2026-08-30T10:00:00Z".to_string(),
            ended_at: "2026-08-30T10:12:00Z".to_string(),
            summary: outcome.summary,
            flags: outcome.flags,
            seed_used: 1,
            stimulus_order: vec![0, 1],
            environment: None,
            pack_snapshot: None,
            imported_from: None,
            scoring_algorithm: wat_core::SCORING_ALGORITHM.to_string(),
            app_version: wat_core::APP_VERSION.to_string(),
            export_schema_version: wat_core::EXPORT_SCHEMA_VERSION.to_string(),
        }
    }

    #[test]
    fn exported_package_verifies_and_carries_ci_counts() {
        let package = export_session(
            session(),
            PrivacyMode::Full,
            None,
            "2026-08-31T09:00:00Z".to_string(),
            false,
        );
        assert!(verify_package(&package).valid);
        let counts = package.bundle.ci_counts.as_ref().unwrap();
        assert_eq!(counts.get("RSW"), Some(&1));
        assert_eq!(counts.get("F"), Some(&1));
    }

    #[test]
    fn redacted_export_has_no_response_text_anywhere() {
        let package = export_session(
            session(),
            PrivacyMode::Redacted,
            None,
            "2026-08-31T09:00:00Z".to_string(),
            false,
        );
        assert!(package
            .bundle
            .session_result
            .trials
            .iter()
            .all(|t| t.response.is_empty()));
        // "night" appears as a stimulus, never as response content.
        let full_row = package.csv.lines().nth(2).unwrap();
        assert!(full_row.starts_with("0,night,,480"));
        assert!(verify_package(&package).valid);
    }

    #[test]
    fn redacted_export_keeps_original_ci_codes() {
        let package = export_session(
            session(),
            PrivacyMode::Redacted,
            None,
            "2026-08-31T09:00:00Z".to_string(),
            false,
        );
        // Trial 0 repeated its stimulus; the blanked response must not
        // reclassify it as a failure.
        let row = package.csv_redacted.lines().nth(2).unwrap();
        assert!(row.starts_with("0,night,,"));
        assert!(row.contains("RSW"));
        assert!(!row.ends_with(",F"));
        assert_eq!(
            package.bundle.ci_counts.as_ref().unwrap().get("F"),
            Some(&1),
            "only the timed-out trial is a failure"
        );
    }

    #[test]
    fn export_is_reproducible_for_fixed_timestamp() {
        let a = export_session(
            session(),
            PrivacyMode::Full,
            None,
            "2026-08-31T09:00:00Z".to_string(),
            false,
        );
        let b = export_session(
            session(),
            PrivacyMode::Full,
            None,
            "2026-08-31T09:00:00Z".to_string(),
            false,
        );
        assert_eq!(a.package_hash, b.package_hash);
        assert_eq!(
            crate::package::package_to_text(&a),
            crate::package::package_to_text(&b)
        );
    }
}
