//! Schema compatibility checker — non-blocking version warnings.
//!
//! Pure comparison of an imported artifact's version tags against current
//! known values. Mismatches produce warnings, never errors; absent fields
//! are "unknown", not "mismatched", and never warn. Import proceeds
//! regardless — format evolution is additive-only.

use serde::{Deserialize, Serialize};

use wat_core::{APP_VERSION, EXPORT_SCHEMA_VERSION, PROTOCOL_DOC_VERSION};

use crate::bundle::ExportBundle;

/// Privacy modes this build understands.
pub const KNOWN_PRIVACY_MODES: &[&str] = &["full", "minimal", "redacted"];

/// One informational warning: which field differed and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatWarning {
    pub field: String,
    pub message: String,
}

/// Version tags as recorded on an imported artifact. Absent tags are
/// carried as `None` and never warned about.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtifactVersions {
    pub export_schema_version: Option<String>,
    pub protocol_doc_version: Option<String>,
    pub app_version: Option<String>,
    pub privacy_mode: Option<String>,
}

impl ArtifactVersions {
    pub fn of_bundle(bundle: &ExportBundle) -> Self {
        Self {
            export_schema_version: Some(bundle.export_schema_version.clone()),
            protocol_doc_version: Some(bundle.protocol_doc_version.clone()),
            app_version: Some(bundle.app_version.clone()),
            privacy_mode: Some(bundle.privacy.mode.as_str().to_string()),
        }
    }
}

/// Compare recorded tags against current values. One warning per
/// differing field; an empty vec means fully current.
pub fn check_compatibility(versions: &ArtifactVersions) -> Vec<CompatWarning> {
    let mut warnings = Vec::new();

    if let Some(found) = &versions.export_schema_version {
        if found != EXPORT_SCHEMA_VERSION {
            warnings.push(CompatWarning {
                field: "exportSchemaVersion".to_string(),
                message: format!(
                    "artifact uses schema {:?}, current is {:?}",
                    found, EXPORT_SCHEMA_VERSION
                ),
            });
        }
    }
    if let Some(found) = &versions.protocol_doc_version {
        if found != PROTOCOL_DOC_VERSION {
            warnings.push(CompatWarning {
                field: "protocolDocVersion".to_string(),
                message: format!(
                    "artifact follows protocol document {:?}, current is {:?}",
                    found, PROTOCOL_DOC_VERSION
                ),
            });
        }
    }
    if let Some(found) = &versions.app_version {
        if found != APP_VERSION {
            warnings.push(CompatWarning {
                field: "appVersion".to_string(),
                message: format!(
                    "artifact was produced by app version {:?}, current is {:?}",
                    found, APP_VERSION
                ),
            });
        }
    }
    if let Some(found) = &versions.privacy_mode {
        if !KNOWN_PRIVACY_MODES.contains(&found.as_str()) {
            warnings.push(CompatWarning {
                field: "privacy.mode".to_string(),
                message: format!("unrecognized privacy mode {:?}", found),
            });
        }
    }

    warnings
}
