//! Tabular trial export and deterministic artifact filenames.
//!
//! One row per trial; the first line is the schema version token so a
//! consumer can reject layouts it does not understand before parsing
//! rows. The redacted variant blanks the response column only — timing
//! and flag columns always survive redaction.

use std::collections::{BTreeMap, BTreeSet};

use wat_core::classifier::classify_trial;
use wat_core::domain::{FlagKind, SessionResult};
use wat_core::CSV_SCHEMA_TOKEN;

/// Column layout, locked per schema token.
pub const CSV_COLUMNS: &[&str] = &[
    "trial_index",
    "stimulus",
    "response",
    "reaction_time_ms",
    "time_to_first_key_ms",
    "backspace_count",
    "edit_count",
    "composition_count",
    "practice",
    "timed_out",
    "flags",
    "ci_codes",
];

/// Render a session's trials as CSV text, deriving CI codes from the
/// session's own responses and flags.
///
/// The session must carry its original response text: classification
/// reads the responses, so feeding an already-redacted `SessionResult`
/// here turns every blanked response into a failure code. The export
/// pipeline precomputes cells via [`ci_code_cells`] and renders through
/// [`render_csv`] instead.
///
/// `redacted` blanks the response column while keeping everything else.
/// Flags and CI codes are joined with `|` inside their cells.
pub fn session_csv(session: &SessionResult, redacted: bool) -> String {
    render_csv(session, &ci_code_cells(session), redacted)
}

/// CI-code cell per trial index. The export pipeline computes this from
/// the unfiltered session so redaction cannot distort the codes.
pub fn ci_code_cells(session: &SessionResult) -> BTreeMap<u32, String> {
    let empty = BTreeSet::new();
    session
        .trials
        .iter()
        .map(|trial| {
            let flags = session
                .flags
                .iter()
                .find(|tf| tf.index == trial.index)
                .map(|tf| &tf.flags)
                .unwrap_or(&empty);
            let cell = classify_trial(trial, flags)
                .iter()
                .map(|c| c.as_str())
                .collect::<Vec<_>>()
                .join("|");
            (trial.index, cell)
        })
        .collect()
}

/// Render rows with caller-supplied CI-code cells.
pub fn render_csv(
    session: &SessionResult,
    ci_codes: &BTreeMap<u32, String>,
    redacted: bool,
) -> String {
    let mut out = String::new();
    out.push_str("# ");
    out.push_str(CSV_SCHEMA_TOKEN);
    out.push('\n');
    out.push_str(&CSV_COLUMNS.join(","));
    out.push('\n');

    let empty = BTreeSet::new();
    for trial in &session.trials {
        let flags = session
            .flags
            .iter()
            .find(|tf| tf.index == trial.index)
            .map(|tf| &tf.flags)
            .unwrap_or(&empty);

        let flag_cell = flags
            .iter()
            .map(|k| FlagKind::as_str(k))
            .collect::<Vec<_>>()
            .join("|");
        let code_cell = ci_codes
            .get(&trial.index)
            .cloned()
            .unwrap_or_default();
        let response = if redacted { "" } else { trial.response.as_str() };
        let ttfk = trial
            .time_to_first_key_ms
            .map(|v| v.to_string())
            .unwrap_or_default();

        let cells = [
            trial.index.to_string(),
            escape(&trial.stimulus),
            escape(response),
            trial.reaction_time_ms.to_string(),
            ttfk,
            trial.backspace_count.to_string(),
            trial.edit_count.to_string(),
            trial.composition_count.to_string(),
            trial.practice.to_string(),
            trial.timed_out.to_string(),
            escape(&flag_cell),
            escape(&code_cell),
        ];
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    out
}

/// RFC 4180-style quoting: quote cells containing separators, quotes or
/// newlines; double embedded quotes.
fn escape(cell: &str) -> String {
    if cell.contains(',') || cell.contains('"') || cell.contains('\n') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

/// Deterministic filename for an exported artifact:
/// `wat_<kind>_<label>_<hash8>_<compact-timestamp>.<ext>`.
///
/// All parts are sanitized to `[A-Za-z0-9._-]`; identical inputs always
/// produce identical names.
pub fn export_filename(
    kind: &str,
    label: &str,
    content_hash: &str,
    exported_at: &str,
    ext: &str,
) -> String {
    let hash8: String = content_hash.chars().take(8).collect();
    let stamp: String = exported_at
        .chars()
        .filter(|c| *c != '-' && *c != ':')
        .collect();
    format!(
        "wat_{}_{}_{}_{}.{}",
        sanitize(kind),
        sanitize(label),
        sanitize(&hash8),
        sanitize(&stamp),
        sanitize(ext),
    )
}

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wat_core::domain::{OrderPolicy, SessionConfig, Trial};
    use wat_core::scoring::score_trials;

    fn session_with_trials(trials: Vec<Trial>) -> SessionResult {
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

    fn trial(index: u32, stimulus: &str, response: &str) -> Trial {
        Trial {
            index,
            stimulus: stimulus.to_string(),
            response: response.to_string(),
            reaction_time_ms: 480,
            time_to_first_key_ms: Some(150),
            backspace_count: 0,
            edit_count: 0,
            composition_count: 0,
            practice: false,
            timed_out: false,
        }
    }

    #[test]
    fn header_carries_schema_token_and_columns() {
        let csv = session_csv(&session_with_trials(vec![]), false);
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("# wat_csv_v1"));
        assert_eq!(lines.next().unwrap(), CSV_COLUMNS.join(","));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn redacted_blanks_response_keeps_timing() {
        let session =
            session_with_trials(vec![trial(0, "night", "day")]);
        let full = session_csv(&session, false);
        let redacted = session_csv(&session, true);

        let full_row = full.lines().nth(2).unwrap();
        let redacted_row = redacted.lines().nth(2).unwrap();
        assert!(full_row.contains(",day,"));
        assert!(!redacted_row.contains("day"));
        assert!(redacted_row.contains(",480,"));
        assert!(redacted_row.contains(",150,"));
    }

    #[test]
    fn cells_with_commas_and_quotes_are_escaped() {
        let session = session_with_trials(vec![trial(
            0,
            "night",
            "dark, \"cold\" sky",
        )]);
        let csv = session_csv(&session, false);
        assert!(csv.contains("\"dark, \"\"cold\"\" sky\""));
    }

    #[test]
    fn flags_and_codes_render_into_cells() {
        let mut timed_out = trial(0, "night", "");
        timed_out.timed_out = true;
        let session = session_with_trials(vec![timed_out]);
        let csv = session_csv(&session, false);
        let row = csv.lines().nth(2).unwrap();
        assert!(row.contains("empty_response|timeout"));
        assert!(row.ends_with(",F"));
    }

    #[test]
    fn rows_align_flags_by_trial_index() {
        let mut session = session_with_trials(vec![
            trial(0, "night", "day"),
            trial(1, "lamp", ""),
        ]);
        // Shuffle the flag records; rows must still match their trials.
        session.flags.reverse();
        let csv = session_csv(&session, false);
        let row1 = csv.lines().nth(3).unwrap();
        assert!(row1.starts_with("1,"));
        assert!(row1.contains("empty_response"));
    }

    #[test]
    fn filenames_are_deterministic_and_safe() {
        let name = export_filename(
            "package",
            "redacted",
            "ab12cd34ef567890",
            "2026-08-31T09:00:00Z",
            "json",
        );
        assert_eq!(name, "wat_package_redacted_ab12cd34_20260831T090000Z.json");
        assert_eq!(
            name,
            export_filename(
                "package",
                "redacted",
                "ab12cd34ef567890",
                "2026-08-31T09:00:00Z",
                "json",
            )
        );
    }

    #[test]
    fn unsafe_characters_are_replaced() {
        let name = export_filename(
            "csv/full",
            "mode name",
            "abcd1234",
            "2026-08-31T09:00:00Z",
            "csv",
        );
        assert!(!name.contains('/'));
        assert!(!name.contains(' '));
        assert!(name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._-".contains(c)));
    }

    #[test]
    fn missing_ttfk_renders_empty_cell() {
        let mut t = trial(0, "night", "day");
        t.time_to_first_key_ms = None;
        let csv = session_csv(&session_with_trials(vec![t]), false);
        let row = csv.lines().nth(2).unwrap();
        assert!(row.contains(",480,,0,"));
    }
}
