//! Snapshot normalizer — backfills hash and schema tag on pack snapshots.
//!
//! Guarantees the data-model invariant at every construction site:
//! words present ⇒ content hash + schema tag present and matching.
//! Values already carried by a snapshot are never overwritten; an absent
//! or empty word list leaves the snapshot unchanged (no hash is ever
//! synthesized from nothing).

use crate::canonical::hash_word_list;
use crate::domain::StimulusPackSnapshot;
use crate::PACK_SCHEMA_VERSION;

/// Normalize a snapshot against an optional word list.
///
/// The word list falls back to the snapshot's own embedded words when the
/// caller has none — import paths often only have the snapshot itself.
pub fn normalize(
    mut snapshot: StimulusPackSnapshot,
    words: Option<&[String]>,
) -> StimulusPackSnapshot {
    let effective: Option<&[String]> = match words {
        Some(w) if !w.is_empty() => Some(w),
        _ => snapshot.words.as_deref().filter(|w| !w.is_empty()),
    };

    let Some(words) = effective else {
        return snapshot;
    };

    if snapshot.content_hash.is_none() {
        snapshot.content_hash = Some(hash_word_list(words));
    }
    if snapshot.schema_version.is_none() {
        snapshot.schema_version = Some(PACK_SCHEMA_VERSION.to_string());
    }
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_snapshot() -> StimulusPackSnapshot {
        StimulusPackSnapshot {
            pack_id: "core_de".to_string(),
            pack_version: "1.2.0".to_string(),
            content_hash: None,
            schema_version: None,
            source: None,
            words: None,
        }
    }

    fn words() -> Vec<String> {
        vec!["night".to_string(), "lamp".to_string(), "river".to_string()]
    }

    #[test]
    fn fills_hash_and_schema_from_word_list() {
        let out = normalize(bare_snapshot(), Some(&words()));
        assert_eq!(out.content_hash, Some(hash_word_list(&words())));
        assert_eq!(out.schema_version, Some(PACK_SCHEMA_VERSION.to_string()));
    }

    #[test]
    fn falls_back_to_embedded_words() {
        let mut snap = bare_snapshot();
        snap.words = Some(words());
        let out = normalize(snap, None);
        assert_eq!(out.content_hash, Some(hash_word_list(&words())));
    }

    #[test]
    fn existing_hash_is_never_overwritten() {
        let mut snap = bare_snapshot();
        snap.content_hash = Some("feed".repeat(16));
        let out = normalize(snap, Some(&words()));
        assert_eq!(out.content_hash, Some("feed".repeat(16)));
        // Schema tag is still backfilled independently.
        assert_eq!(out.schema_version, Some(PACK_SCHEMA_VERSION.to_string()));
    }

    #[test]
    fn no_words_means_no_change() {
        let out = normalize(bare_snapshot(), None);
        assert_eq!(out, bare_snapshot());

        let empty: Vec<String> = Vec::new();
        let out = normalize(bare_snapshot(), Some(&empty));
        assert_eq!(out, bare_snapshot());
    }
}
