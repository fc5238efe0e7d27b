//! Atomic Store — staged-commit protocol over the raw key-value primitive.
//!
//! Two backing keys per logical store: `<name>` (committed) and
//! `<name>.staging`. A raw `set` is not atomic across an abrupt
//! termination between key writes and can fail mid-operation on
//! capacity, so the committed key is only ever replaced by a complete
//! new serialization:
//!
//!   Write:  serialize → staging → committed → remove staging
//!           staging fails   ⇒ committed untouched, error to caller
//!           committed fails ⇒ prior value (or absence) retained,
//!                             staging left for the next recovery pass
//!   Load:   staging present ⇒ discard it unconditionally, then read
//!           committed — every read is a self-healing recovery point,
//!           there is no separate recovery mode
//!
//! Capacity and other backend failures always propagate; they are never
//! swallowed and never partially apply a write.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::storage::{StorageBackend, StorageError};

/// Failures of a staged-commit store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("committed envelope for {key:?} is not valid JSON: {message}")]
    Corrupt { key: String, message: String },

    #[error("envelope serialization failed: {0}")]
    Serialize(String),
}

/// Suffix distinguishing the staging key from the committed key.
pub const STAGING_SUFFIX: &str = ".staging";

/// A staged-commit store for one logical envelope.
pub struct AtomicStore<B: StorageBackend> {
    backend: B,
    committed_key: String,
    staging_key: String,
}

impl<B: StorageBackend> AtomicStore<B> {
    pub fn new(backend: B, name: &str) -> Self {
        Self {
            backend,
            committed_key: name.to_string(),
            staging_key: format!("{}{}", name, STAGING_SUFFIX),
        }
    }

    /// Load the committed envelope.
    ///
    /// An existing staging key is an abandoned, unconfirmed write — it is
    /// discarded unconditionally before the committed key is read, never
    /// merged or trusted.
    pub fn load<T: DeserializeOwned>(&mut self) -> Result<Option<T>, StoreError> {
        if self.backend.get(&self.staging_key)?.is_some() {
            tracing::warn!(
                key = %self.staging_key,
                "discarding abandoned staging write"
            );
            self.backend.remove(&self.staging_key)?;
        }
        match self.backend.get(&self.committed_key)? {
            None => Ok(None),
            Some(text) => serde_json::from_str(&text).map(Some).map_err(|e| {
                StoreError::Corrupt {
                    key: self.committed_key.clone(),
                    message: e.to_string(),
                }
            }),
        }
    }

    /// Replace the committed envelope via the staging key.
    pub fn write<T: Serialize>(&mut self, value: &T) -> Result<(), StoreError> {
        let text = serde_json::to_string(value)
            .map_err(|e| StoreError::Serialize(e.to_string()))?;

        // Staging failure leaves the committed key untouched.
        self.backend.set(&self.staging_key, &text)?;
        // Committed failure leaves the staging key in place; the next
        // load discards it.
        self.backend.set(&self.committed_key, &text)?;
        self.backend.remove(&self.staging_key)?;

        tracing::debug!(
            key = %self.committed_key,
            bytes = text.len(),
            "committed envelope"
        );
        Ok(())
    }

    /// Remove both keys.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.backend.remove(&self.staging_key)?;
        self.backend.remove(&self.committed_key)?;
        Ok(())
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}
