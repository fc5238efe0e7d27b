//! Stimulus pack files — validation, import, and the pack store.
//!
//! Validation reports a list of `{code, message}` issues and never fails
//! past the validator boundary; only malformed JSON is a parse error.
//! Imported packs are committed through the Atomic Store under
//! `<id>@<version>` keys. Deleting a pack never touches the snapshots
//! embedded in historical sessions — those are owned by the sessions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use wat_core::canonical::hash_word_list;
use wat_core::domain::StimulusPackSnapshot;
use wat_core::PACK_SCHEMA_VERSION;

use crate::storage::StorageBackend;
use crate::store::{AtomicStore, StoreError};

/// Backing key for the packs envelope.
pub const PACKS_KEY: &str = "wat_packs";

/// Provenance block carried by pack files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackProvenance {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub origin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub license: Option<String>,
}

/// A stimulus pack as shipped in a pack file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StimulusPack {
    pub id: String,
    pub version: String,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub provenance: Option<PackProvenance>,
    pub words: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub schema_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub content_hash: Option<String>,
}

impl StimulusPack {
    /// Store key: `<id>@<version>`.
    pub fn key(&self) -> String {
        format!("{}@{}", self.id, self.version)
    }

    /// Snapshot for embedding into a session. Word inclusion is the
    /// caller's privacy decision; hash and schema tag are always filled.
    pub fn snapshot(&self, include_words: bool) -> StimulusPackSnapshot {
        StimulusPackSnapshot {
            pack_id: self.id.clone(),
            pack_version: self.version.clone(),
            content_hash: Some(
                self.content_hash
                    .clone()
                    .unwrap_or_else(|| hash_word_list(&self.words)),
            ),
            schema_version: Some(
                self.schema_version
                    .clone()
                    .unwrap_or_else(|| PACK_SCHEMA_VERSION.to_string()),
            ),
            source: self.source.clone(),
            words: include_words.then(|| self.words.clone()),
        }
    }
}

/// One validation finding. Codes are stable machine-readable tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub code: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(code: &str, message: String) -> Self {
        Self {
            code: code.to_string(),
            message,
        }
    }
}

/// Parse failure for pack files; everything past this is an issue list.
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("pack file is not valid JSON: {0}")]
    Malformed(String),
}

pub fn parse_pack(text: &str) -> Result<StimulusPack, PackError> {
    serde_json::from_str(text).map_err(|e| PackError::Malformed(e.to_string()))
}

/// Validate a pack. Empty vec means importable.
pub fn validate_pack(pack: &StimulusPack) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if pack.id.trim().is_empty() {
        issues.push(ValidationIssue::new(
            "empty_id",
            "pack id must be non-empty".to_string(),
        ));
    }
    if pack.version.trim().is_empty() {
        issues.push(ValidationIssue::new(
            "empty_version",
            "pack version must be non-empty".to_string(),
        ));
    }
    if pack.words.is_empty() {
        issues.push(ValidationIssue::new(
            "empty_word_list",
            "pack carries no stimulus words".to_string(),
        ));
    }
    if pack.words.iter().any(|w| w.trim().is_empty()) {
        issues.push(ValidationIssue::new(
            "blank_word",
            "word list contains blank entries".to_string(),
        ));
    }
    if let Some(declared) = &pack.content_hash {
        let actual = hash_word_list(&pack.words);
        if declared != &actual {
            issues.push(ValidationIssue::new(
                "content_hash_mismatch",
                format!(
                    "declared content hash {} does not match computed {}",
                    declared, actual
                ),
            ));
        }
    }
    if let Some(schema) = &pack.schema_version {
        if schema != PACK_SCHEMA_VERSION {
            issues.push(ValidationIssue::new(
                "unknown_schema_version",
                format!(
                    "pack schema {:?} differs from current {:?}",
                    schema, PACK_SCHEMA_VERSION
                ),
            ));
        }
    }

    issues
}

/// Result of an import attempt. `imported == false` always comes with at
/// least one issue explaining why.
#[derive(Debug, Clone, PartialEq)]
pub struct PackImportOutcome {
    pub imported: bool,
    pub key: Option<String>,
    pub issues: Vec<ValidationIssue>,
}

pub struct PackStore<B: StorageBackend> {
    store: AtomicStore<B>,
}

impl<B: StorageBackend> PackStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            store: AtomicStore::new(backend, PACKS_KEY),
        }
    }

    fn load_all(
        &mut self,
    ) -> Result<BTreeMap<String, StimulusPack>, StoreError> {
        Ok(self.store.load()?.unwrap_or_default())
    }

    /// Validate, backfill hash/schema tag, and commit. Validation issues
    /// block the commit but are reported, not thrown; storage failures
    /// are real errors.
    pub fn import(
        &mut self,
        mut pack: StimulusPack,
    ) -> Result<PackImportOutcome, StoreError> {
        let issues = validate_pack(&pack);
        if !issues.is_empty() {
            return Ok(PackImportOutcome {
                imported: false,
                key: None,
                issues,
            });
        }

        // Same backfill rule as the snapshot normalizer: fill what is
        // missing, never overwrite what the file declares.
        if pack.content_hash.is_none() {
            pack.content_hash = Some(hash_word_list(&pack.words));
        }
        if pack.schema_version.is_none() {
            pack.schema_version = Some(PACK_SCHEMA_VERSION.to_string());
        }

        let key = pack.key();
        let mut all = self.load_all()?;
        all.insert(key.clone(), pack);
        self.store.write(&all)?;
        Ok(PackImportOutcome {
            imported: true,
            key: Some(key),
            issues: Vec::new(),
        })
    }

    pub fn get(
        &mut self,
        id: &str,
        version: &str,
    ) -> Result<Option<StimulusPack>, StoreError> {
        Ok(self.load_all()?.remove(&format!("{}@{}", id, version)))
    }

    pub fn list_keys(&mut self) -> Result<Vec<String>, StoreError> {
        Ok(self.load_all()?.into_keys().collect())
    }

    pub fn delete(
        &mut self,
        id: &str,
        version: &str,
    ) -> Result<bool, StoreError> {
        let key = format!("{}@{}", id, version);
        let mut all = self.load_all()?;
        let existed = all.remove(&key).is_some();
        if existed {
            self.store.write(&all)?;
        }
        Ok(existed)
    }
}
