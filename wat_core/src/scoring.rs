//! Scoring engine — per-trial flags and session-level summary.
//!
//! Pure function over an ordered trial list. Recomputed whole whenever the
//! trial set changes; never partially updated.
//!
//! Rules:
//!   - Practice trials are flagged but excluded from all aggregates
//!   - Timeout is terminal: no timing flags on a timed-out trial
//!   - Timing outliers via MAD modified z-scores, cutoff 3.5
//!   - MAD of zero or fewer than MIN_SAMPLES_FOR_MAD usable reaction
//!     times suppresses MAD-based detection; the <200 ms fast guard
//!     always applies
//!   - Empty input yields an all-zero summary, never an error

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{FlagKind, ScoringSummary, Trial, TrialFlags};

/// Reaction times under this are always `timing_outlier_fast`, guarding
/// against zero-MAD degenerate sessions.
pub const FAST_GUARD_MS: u32 = 200;

/// Modified z-score magnitude beyond which a trial is a timing outlier.
pub const MAD_Z_CUTOFF: f64 = 3.5;

/// Consistency constant relating MAD to the standard deviation of a
/// normal distribution.
pub const MODIFIED_Z_SCALE: f64 = 0.6745;

/// Minimum usable (non-practice, non-timeout) reaction times before
/// MAD-based outlier detection runs at all.
pub const MIN_SAMPLES_FOR_MAD: usize = 3;

/// Editing is "high" when backspaces + edits exceed
/// `max(HIGH_EDITING_FLOOR, HIGH_EDITING_RATIO * response chars)`.
pub const HIGH_EDITING_FLOOR: u32 = 4;
pub const HIGH_EDITING_RATIO: u32 = 2;

/// Flags plus summary for one trial set.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringOutcome {
    pub flags: Vec<TrialFlags>,
    pub summary: ScoringSummary,
}

/// Score an ordered trial list.
pub fn score_trials(trials: &[Trial]) -> ScoringOutcome {
    // Robust center over non-practice, non-timeout reaction times.
    let usable: Vec<f64> = trials
        .iter()
        .filter(|t| !t.practice && !t.timed_out)
        .map(|t| t.reaction_time_ms as f64)
        .collect();

    let rt_median = median(&usable);
    let mad = rt_median.map(|m| {
        let deviations: Vec<f64> =
            usable.iter().map(|x| (x - m).abs()).collect();
        median(&deviations).unwrap_or(0.0)
    });
    let mad_usable = usable.len() >= MIN_SAMPLES_FOR_MAD
        && matches!(mad, Some(m) if m > 0.0);

    let mut flags = Vec::with_capacity(trials.len());
    for trial in trials {
        let mut set = BTreeSet::new();

        if trial.timed_out {
            set.insert(FlagKind::Timeout);
        }

        let response = trial.response.trim();
        if response.is_empty() {
            set.insert(FlagKind::EmptyResponse);
        } else if response.to_lowercase() == trial.stimulus.trim().to_lowercase() {
            set.insert(FlagKind::RepeatedResponse);
        }

        if trial.backspace_count + trial.edit_count > high_editing_threshold(response) {
            set.insert(FlagKind::HighEditing);
        }

        // Timeout is terminal for timing flags.
        if !trial.timed_out {
            if trial.reaction_time_ms < FAST_GUARD_MS {
                set.insert(FlagKind::TimingOutlierFast);
            } else if mad_usable {
                let m = rt_median.unwrap_or(0.0);
                let z = MODIFIED_Z_SCALE
                    * (trial.reaction_time_ms as f64 - m)
                    / mad.unwrap_or(1.0);
                if z > MAD_Z_CUTOFF {
                    set.insert(FlagKind::TimingOutlierSlow);
                } else if z < -MAD_Z_CUTOFF {
                    set.insert(FlagKind::TimingOutlierFast);
                }
            }
        }

        flags.push(TrialFlags {
            index: trial.index,
            flags: set,
        });
    }

    let summary = summarize(trials, &flags, &usable);
    ScoringOutcome { flags, summary }
}

fn high_editing_threshold(response: &str) -> u32 {
    let chars = response.chars().count() as u32;
    HIGH_EDITING_FLOOR.max(HIGH_EDITING_RATIO * chars)
}

fn summarize(
    trials: &[Trial],
    flags: &[TrialFlags],
    usable: &[f64],
) -> ScoringSummary {
    let scored_trials =
        trials.iter().filter(|t| !t.practice).count() as u32;

    // Flag counts over non-practice trials only.
    let mut flag_counts: BTreeMap<FlagKind, u32> = BTreeMap::new();
    for (trial, tf) in trials.iter().zip(flags) {
        if trial.practice {
            continue;
        }
        for kind in &tf.flags {
            *flag_counts.entry(*kind).or_insert(0) += 1;
        }
    }

    let mean = if usable.is_empty() {
        None
    } else {
        Some(usable.iter().sum::<f64>() / usable.len() as f64)
    };
    let stddev = mean.map(|m| {
        let variance = usable.iter().map(|x| (x - m) * (x - m)).sum::<f64>()
            / usable.len() as f64;
        variance.sqrt()
    });

    ScoringSummary {
        scored_trials,
        mean_rt_ms: mean,
        median_rt_ms: median(usable),
        stddev_rt_ms: stddev,
        flag_counts,
    }
}

/// Median of a sample; `None` on empty input. Even-length samples
/// average the two middle values.
fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("reaction times are finite"));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trial(index: u32, stimulus: &str, response: &str, rt: u32) -> Trial {
        Trial {
            index,
            stimulus: stimulus.to_string(),
            response: response.to_string(),
            reaction_time_ms: rt,
            time_to_first_key_ms: None,
            backspace_count: 0,
            edit_count: 0,
            composition_count: 0,
            practice: false,
            timed_out: false,
        }
    }

    fn flags_of(outcome: &ScoringOutcome, index: u32) -> &BTreeSet<FlagKind> {
        &outcome
            .flags
            .iter()
            .find(|tf| tf.index == index)
            .expect("trial index present")
            .flags
    }

    #[test]
    fn empty_input_yields_zero_summary() {
        let outcome = score_trials(&[]);
        assert!(outcome.flags.is_empty());
        assert_eq!(outcome.summary.scored_trials, 0);
        assert_eq!(outcome.summary.mean_rt_ms, None);
        assert_eq!(outcome.summary.median_rt_ms, None);
        assert_eq!(outcome.summary.stddev_rt_ms, None);
        assert!(outcome.summary.flag_counts.is_empty());
    }

    #[test]
    fn empty_and_whitespace_responses_flagged() {
        let trials = vec![
            trial(0, "night", "", 600),
            trial(1, "lamp", "   ", 610),
            trial(2, "river", "boat", 620),
        ];
        let outcome = score_trials(&trials);
        assert!(flags_of(&outcome, 0).contains(&FlagKind::EmptyResponse));
        assert!(flags_of(&outcome, 1).contains(&FlagKind::EmptyResponse));
        assert!(!flags_of(&outcome, 2).contains(&FlagKind::EmptyResponse));
        assert_eq!(outcome.summary.flag_counts[&FlagKind::EmptyResponse], 2);
    }

    #[test]
    fn repeated_response_is_case_insensitive_and_never_empty() {
        let trials = vec![
            trial(0, "night", "NIGHT", 600),
            trial(1, "lamp", "", 610),
        ];
        let outcome = score_trials(&trials);
        assert!(flags_of(&outcome, 0).contains(&FlagKind::RepeatedResponse));
        assert!(!flags_of(&outcome, 1).contains(&FlagKind::RepeatedResponse));
    }

    #[test]
    fn mad_outliers_slow_and_summary_stats() {
        let rts = [500, 510, 520, 530, 540, 560, 5000];
        let trials: Vec<Trial> = rts
            .iter()
            .enumerate()
            .map(|(i, rt)| trial(i as u32, "night", "day", *rt))
            .collect();
        let outcome = score_trials(&trials);

        // median 530, MAD 20 — only the 5000ms trial crosses 3.5
        assert!(flags_of(&outcome, 6).contains(&FlagKind::TimingOutlierSlow));
        for i in 0..6 {
            assert!(
                !flags_of(&outcome, i).contains(&FlagKind::TimingOutlierSlow),
                "trial {} wrongly flagged slow",
                i
            );
        }
        assert_eq!(outcome.summary.scored_trials, 7);
        assert_eq!(outcome.summary.median_rt_ms, Some(530.0));
    }

    #[test]
    fn fast_guard_applies_even_with_zero_mad() {
        // All identical reaction times: MAD = 0, MAD detection skipped.
        let mut trials: Vec<Trial> = (0..4)
            .map(|i| trial(i, "night", "day", 400))
            .collect();
        trials.push(trial(4, "lamp", "glow", 150));
        let outcome = score_trials(&trials);
        assert!(flags_of(&outcome, 4).contains(&FlagKind::TimingOutlierFast));
        for i in 0..4 {
            assert!(flags_of(&outcome, i).is_empty());
        }
    }

    #[test]
    fn small_samples_suppress_mad_detection() {
        // Two usable trials: below MIN_SAMPLES_FOR_MAD, so the huge gap
        // between them produces no outlier flags.
        let trials = vec![
            trial(0, "night", "day", 300),
            trial(1, "lamp", "glow", 9000),
        ];
        let outcome = score_trials(&trials);
        assert!(flags_of(&outcome, 0).is_empty());
        assert!(flags_of(&outcome, 1).is_empty());
    }

    #[test]
    fn timeout_is_terminal_for_timing_flags() {
        let mut timed_out = trial(0, "night", "", 150);
        timed_out.timed_out = true;
        let rest: Vec<Trial> = (1..5)
            .map(|i| trial(i, "lamp", "glow", 500))
            .collect();
        let mut trials = vec![timed_out];
        trials.extend(rest);

        let outcome = score_trials(&trials);
        let f = flags_of(&outcome, 0);
        assert!(f.contains(&FlagKind::Timeout));
        assert!(f.contains(&FlagKind::EmptyResponse));
        assert!(!f.contains(&FlagKind::TimingOutlierFast));
        assert!(!f.contains(&FlagKind::TimingOutlierSlow));
    }

    #[test]
    fn timed_out_trials_excluded_from_central_tendency() {
        let mut slow = trial(0, "night", "", 30000);
        slow.timed_out = true;
        let trials = vec![
            slow,
            trial(1, "lamp", "glow", 400),
            trial(2, "river", "boat", 600),
        ];
        let outcome = score_trials(&trials);
        assert_eq!(outcome.summary.mean_rt_ms, Some(500.0));
        assert_eq!(outcome.summary.median_rt_ms, Some(500.0));
        assert_eq!(outcome.summary.scored_trials, 3);
    }

    #[test]
    fn practice_trials_flagged_but_not_aggregated() {
        let mut practice = trial(0, "night", "", 600);
        practice.practice = true;
        let trials = vec![practice, trial(1, "lamp", "glow", 500)];
        let outcome = score_trials(&trials);

        assert!(flags_of(&outcome, 0).contains(&FlagKind::EmptyResponse));
        assert_eq!(outcome.summary.scored_trials, 1);
        assert_eq!(
            outcome.summary.flag_counts.get(&FlagKind::EmptyResponse),
            None,
            "practice flags must not be counted"
        );
        assert_eq!(outcome.summary.mean_rt_ms, Some(500.0));
    }

    #[test]
    fn high_editing_threshold_scales_with_response_length() {
        let mut noisy = trial(0, "night", "day", 600);
        noisy.backspace_count = 5;
        noisy.edit_count = 3;
        let mut calm = trial(1, "lamp", "luminescence", 600);
        calm.backspace_count = 5;
        calm.edit_count = 3;
        let trials = vec![noisy, calm, trial(2, "river", "boat", 600)];

        let outcome = score_trials(&trials);
        assert!(flags_of(&outcome, 0).contains(&FlagKind::HighEditing));
        assert!(!flags_of(&outcome, 1).contains(&FlagKind::HighEditing));
    }

    #[test]
    fn scoring_is_pure() {
        let trials = vec![
            trial(0, "night", "day", 480),
            trial(1, "lamp", "glow", 520),
            trial(2, "river", "boat", 640),
        ];
        let a = score_trials(&trials);
        let b = score_trials(&trials);
        assert_eq!(a, b);
    }
}
