//! Draft session lifecycle — one mutable in-progress session at a time.
//!
//! The draft is persisted incrementally through the Atomic Store and
//! converted into an immutable `SessionResult` on completion (running the
//! scoring engine and snapshot normalizer) or discarded.
//!
//! The editing lock is advisory only: it prevents accidental concurrent
//! editing across tabs or processes but is not a correctness mechanism —
//! the staged-commit protocol stays safe even when the lock is bypassed.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wat_core::domain::{
    DraftSession, EnvironmentContext, SessionConfig, SessionResult,
    StimulusPackSnapshot, Trial,
};
use wat_core::scoring::score_trials;
use wat_core::snapshot;
use wat_core::{APP_VERSION, EXPORT_SCHEMA_VERSION, SCORING_ALGORITHM};

use crate::now_rfc3339;
use crate::storage::StorageBackend;
use crate::store::{AtomicStore, StoreError};

/// Backing key for the draft envelope.
pub const DRAFT_KEY: &str = "wat_draft";

/// Advisory lock lifetime.
pub const LOCK_TTL_SECS: i64 = 120;

/// Advisory editing lock. Expired locks are treated as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftLock {
    pub holder: String,
    /// RFC 3339 UTC.
    pub expires_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DraftEnvelope {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    draft: Option<DraftSession>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    lock: Option<DraftLock>,
}

pub struct DraftStore<B: StorageBackend> {
    store: AtomicStore<B>,
}

impl<B: StorageBackend> DraftStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            store: AtomicStore::new(backend, DRAFT_KEY),
        }
    }

    fn load_envelope(&mut self) -> Result<DraftEnvelope, StoreError> {
        Ok(self.store.load()?.unwrap_or_default())
    }

    /// Start a new draft, replacing any existing one.
    pub fn begin(
        &mut self,
        config: SessionConfig,
        stimulus_order: Vec<u32>,
    ) -> Result<DraftSession, StoreError> {
        let now = now_rfc3339();
        let draft = DraftSession {
            id: Uuid::new_v4().to_string(),
            config,
            trials: Vec::new(),
            stimulus_order,
            started_at: now.clone(),
            updated_at: now,
        };
        let mut envelope = self.load_envelope()?;
        envelope.draft = Some(draft.clone());
        self.store.write(&envelope)?;
        Ok(draft)
    }

    pub fn active(&mut self) -> Result<Option<DraftSession>, StoreError> {
        Ok(self.load_envelope()?.draft)
    }

    /// Append a trial to the active draft. No-op result when no draft
    /// exists (the collector may race a discard).
    pub fn append_trial(
        &mut self,
        trial: Trial,
    ) -> Result<Option<DraftSession>, StoreError> {
        let mut envelope = self.load_envelope()?;
        let Some(draft) = envelope.draft.as_mut() else {
            return Ok(None);
        };
        draft.trials.push(trial);
        draft.updated_at = now_rfc3339();
        let updated = draft.clone();
        self.store.write(&envelope)?;
        Ok(Some(updated))
    }

    pub fn discard(&mut self) -> Result<(), StoreError> {
        let mut envelope = self.load_envelope()?;
        envelope.draft = None;
        self.store.write(&envelope)
    }

    /// Convert the active draft into an immutable `SessionResult` and
    /// clear the draft. Returns `None` when no draft is active.
    pub fn complete(
        &mut self,
        environment: Option<EnvironmentContext>,
        pack_snapshot: Option<StimulusPackSnapshot>,
        pack_words: Option<&[String]>,
    ) -> Result<Option<SessionResult>, StoreError> {
        let mut envelope = self.load_envelope()?;
        let Some(draft) = envelope.draft.take() else {
            return Ok(None);
        };
        let result = finalize_draft(draft, environment, pack_snapshot, pack_words);
        self.store.write(&envelope)?;
        Ok(Some(result))
    }

    // ── Advisory lock ──────────────────────────────────────────────

    /// Acquire or refresh the editing lock. Fails (returns false) only
    /// when a different holder has an unexpired lock.
    pub fn acquire_lock(&mut self, holder: &str) -> Result<bool, StoreError> {
        let now = Utc::now();
        let mut envelope = self.load_envelope()?;
        if let Some(lock) = &envelope.lock {
            if lock.holder != holder && !is_expired(lock, now) {
                return Ok(false);
            }
        }
        envelope.lock = Some(DraftLock {
            holder: holder.to_string(),
            expires_at: (now + Duration::seconds(LOCK_TTL_SECS))
                .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        });
        self.store.write(&envelope)?;
        Ok(true)
    }

    pub fn release_lock(&mut self, holder: &str) -> Result<(), StoreError> {
        let mut envelope = self.load_envelope()?;
        if envelope.lock.as_ref().is_some_and(|l| l.holder == holder) {
            envelope.lock = None;
            self.store.write(&envelope)?;
        }
        Ok(())
    }
}

fn is_expired(lock: &DraftLock, now: DateTime<Utc>) -> bool {
    match DateTime::parse_from_rfc3339(&lock.expires_at) {
        Ok(t) => t.with_timezone(&Utc) <= now,
        // Unparseable expiry is treated as expired, not honored forever.
        Err(_) => true,
    }
}

/// Score a finished draft and assemble the immutable session record.
/// The embedded snapshot is normalized so the words-present ⇒
/// hash-present invariant holds from the first construction.
pub fn finalize_draft(
    draft: DraftSession,
    environment: Option<EnvironmentContext>,
    pack_snapshot: Option<StimulusPackSnapshot>,
    pack_words: Option<&[String]>,
) -> SessionResult {
    let outcome = score_trials(&draft.trials);
    let pack_snapshot =
        pack_snapshot.map(|s| snapshot::normalize(s, pack_words));
    let seed_used = draft.config.seed;
    SessionResult {
        id: draft.id,
        config: draft.config,
        trials: draft.trials,
        started_at: draft.started_at,
        ended_at: now_rfc3339(),
        summary: outcome.summary,
        flags: outcome.flags,
        seed_used,
        stimulus_order: draft.stimulus_order,
        environment,
        pack_snapshot,
        imported_from: None,
        scoring_algorithm: SCORING_ALGORITHM.to_string(),
        app_version: APP_VERSION.to_string(),
        export_schema_version: EXPORT_SCHEMA_VERSION.to_string(),
    }
}
