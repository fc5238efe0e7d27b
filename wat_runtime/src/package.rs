//! Export package builder & verifier (`pkg_v1`).
//!
//! The package is the self-describing envelope around a bundle plus its
//! two tabular renderings. Its digest is computed over the canonical
//! serialization of the envelope with the `packageHash` field excluded;
//! verification recomputes that digest and reports expected vs. actual.
//! Tamper evidence: any byte-level change to the bundle or either CSV
//! changes the actual digest.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use wat_core::canonical::{canonical_json, sha256_hex};
use wat_core::{HASH_ALGORITHM, PACKAGE_VERSION};

use crate::bundle::ExportBundle;

/// Fixed top-level key order of the package envelope.
pub const PACKAGE_KEY_ORDER: &[&str] = &[
    "packageVersion",
    "packageHash",
    "hashAlgorithm",
    "exportedAt",
    "bundle",
    "csv",
    "csvRedacted",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPackage {
    pub package_version: String,
    pub package_hash: String,
    pub hash_algorithm: String,
    pub exported_at: String,
    pub bundle: ExportBundle,
    pub csv: String,
    pub csv_redacted: String,
}

/// Outcome of a verification. Mismatch is a comparable result, never an
/// error — callers report specifics from `expected` vs `actual`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityReport {
    pub valid: bool,
    pub expected: String,
    pub actual: String,
}

/// Parse failures. Only malformed input errors here; integrity and
/// compatibility problems are values, not errors.
#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("package is not valid JSON: {0}")]
    Malformed(String),

    #[error("package is not a JSON object")]
    NotAnObject,
}

/// Wrap a bundle and its tabular renderings, computing the integrity
/// digest last so it covers everything else in the envelope.
pub fn build_package(
    bundle: ExportBundle,
    csv: String,
    csv_redacted: String,
    exported_at: String,
) -> ExportPackage {
    let mut package = ExportPackage {
        package_version: PACKAGE_VERSION.to_string(),
        package_hash: String::new(),
        hash_algorithm: HASH_ALGORITHM.to_string(),
        exported_at,
        bundle,
        csv,
        csv_redacted,
    };
    let value = serde_json::to_value(&package)
        .expect("package serialization cannot fail");
    package.package_hash = digest_excluding_hash(&value);
    package
}

/// Verify a parsed package against its stored digest.
pub fn verify_package(package: &ExportPackage) -> IntegrityReport {
    let value = serde_json::to_value(package)
        .expect("package serialization cannot fail");
    verify_package_value(&value)
}

/// Verify a raw package value. Import paths verify the value as parsed
/// from text, so keys a newer producer added still count toward the
/// digest instead of being silently dropped.
pub fn verify_package_value(value: &Value) -> IntegrityReport {
    let expected = value
        .get("packageHash")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let actual = digest_excluding_hash(value);
    IntegrityReport {
        valid: !expected.is_empty() && expected == actual,
        expected,
        actual,
    }
}

/// Parse a package from exported text. Returns both the typed envelope
/// and the raw value (for digest verification over the received form).
pub fn parse_package(text: &str) -> Result<(ExportPackage, Value), PackageError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| PackageError::Malformed(e.to_string()))?;
    if !value.is_object() {
        return Err(PackageError::NotAnObject);
    }
    let package: ExportPackage = serde_json::from_value(value.clone())
        .map_err(|e| PackageError::Malformed(e.to_string()))?;
    Ok((package, value))
}

/// Canonical text of a package envelope, digest field included.
pub fn package_to_text(package: &ExportPackage) -> String {
    let value = serde_json::to_value(package)
        .expect("package serialization cannot fail");
    canonical_json(&value, PACKAGE_KEY_ORDER)
}

fn digest_excluding_hash(value: &Value) -> String {
    let mut stripped = value.clone();
    if let Some(map) = stripped.as_object_mut() {
        map.remove("packageHash");
    }
    sha256_hex(canonical_json(&stripped, PACKAGE_KEY_ORDER).as_bytes())
}
