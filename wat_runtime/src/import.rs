//! Package import — parse, verify, warn, normalize, commit.
//!
//! The reverse of the export pipeline. Malformed input is the only hard
//! error besides storage failures; digest mismatch and version drift are
//! reported in the `ImportReport` and a mismatched package is simply not
//! committed.

use wat_core::domain::SessionResult;
use wat_core::snapshot;

use crate::compat::{check_compatibility, ArtifactVersions, CompatWarning};
use crate::package::{
    parse_package, verify_package_value, IntegrityReport, PackageError,
};
use crate::sessions::SessionStore;
use crate::storage::StorageBackend;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error(transparent)]
    Package(#[from] PackageError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Everything a caller needs to report an import to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportReport {
    pub integrity: IntegrityReport,
    pub warnings: Vec<CompatWarning>,
    /// Set when the session was committed.
    pub session_id: Option<String>,
}

/// Import an exported package from text into the session store.
///
/// The digest is verified over the received form, so byte-level tampering
/// anywhere in the envelope blocks the commit. The embedded snapshot is
/// re-normalized on the way in, and the committed session records the
/// originating package digest as provenance.
pub fn import_package<B: StorageBackend>(
    sessions: &mut SessionStore<B>,
    text: &str,
) -> Result<ImportReport, ImportError> {
    let (package, raw) = parse_package(text)?;

    let integrity = verify_package_value(&raw);
    let warnings =
        check_compatibility(&ArtifactVersions::of_bundle(&package.bundle));

    if !integrity.valid {
        tracing::warn!(
            expected = %integrity.expected,
            actual = %integrity.actual,
            "package digest mismatch, refusing to commit"
        );
        return Ok(ImportReport {
            integrity,
            warnings,
            session_id: None,
        });
    }

    let mut session: SessionResult = package.bundle.session_result;
    session.pack_snapshot = session
        .pack_snapshot
        .take()
        .map(|s| snapshot::normalize(s, None));
    session.imported_from =
        Some(format!("pkg:{}", &integrity.expected[..12]));

    let session_id = session.id.clone();
    sessions.save(session)?;

    Ok(ImportReport {
        integrity,
        warnings,
        session_id: Some(session_id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::{build_bundle, BundleRequest, PrivacyMode};
    use crate::export::export_session;
    use crate::package::package_to_text;
    use crate::storage::MemoryStorage;
    use wat_core::domain::{
        OrderPolicy, ScoringSummary, SessionConfig, SessionResult,
    };

    fn session(id: &str) -> SessionResult {
        SessionResult {
            id: id.to_string(),
            config: SessionConfig {
                pack_id: "core_de".to_string(),
                pack_version: "1.0.0".to_string(),
                order_policy: OrderPolicy::Fixed,
                seed: 1,
                max_response_ms: 30_000,
            },
            trials: Vec::new(),
            started_at: "2026-08-30T10:00:00Z".to_string(),
            ended_at: "2026-08-30T10:12:00Z".to_string(),
            summary: ScoringSummary {
                scored_trials: 0,
                mean_rt_ms: None,
                median_rt_ms: None,
                stddev_rt_ms: None,
                flag_counts: Default::default(),
            },
            flags: Vec::new(),
            seed_used: 1,
            stimulus_order: Vec::new(),
            environment: None,
            pack_snapshot: None,
            imported_from: None,
            scoring_algorithm: wat_core::SCORING_ALGORITHM.to_string(),
            app_version: wat_core::APP_VERSION.to_string(),
            export_schema_version: wat_core::EXPORT_SCHEMA_VERSION.to_string(),
        }
    }

    fn exported_text(id: &str) -> String {
        let package = export_session(
            session(id),
            PrivacyMode::Full,
            None,
            "2026-08-31T09:00:00Z".to_string(),
            false,
        );
        package_to_text(&package)
    }

    #[test]
    fn round_trip_import_commits_with_provenance() {
        let mut sessions = SessionStore::new(MemoryStorage::new());
        let report =
            import_package(&mut sessions, &exported_text("sess-1")).unwrap();

        assert!(report.integrity.valid);
        assert_eq!(report.session_id.as_deref(), Some("sess-1"));
        let stored = sessions.get("sess-1").unwrap().unwrap();
        let provenance = stored.imported_from.unwrap();
        assert!(provenance.starts_with("pkg:"));
        assert_eq!(provenance.len(), "pkg:".len() + 12);
    }

    #[test]
    fn tampered_text_is_reported_and_not_committed() {
        let mut sessions = SessionStore::new(MemoryStorage::new());
        let tampered = exported_text("sess-1").replace("sess-1", "sess-X");
        let report = import_package(&mut sessions, &tampered).unwrap();

        assert!(!report.integrity.valid);
        assert_eq!(report.session_id, None);
        assert!(sessions.load_all().unwrap().is_empty());
    }

    #[test]
    fn malformed_text_is_a_hard_error() {
        let mut sessions = SessionStore::new(MemoryStorage::new());
        assert!(matches!(
            import_package(&mut sessions, "not json"),
            Err(ImportError::Package(_))
        ));
    }

    #[test]
    fn version_drift_warns_but_still_imports() {
        let mut bundle_session = session("sess-2");
        bundle_session.app_version = "0.0.1-ancient".to_string();
        let mut bundle = build_bundle(BundleRequest {
            mode: PrivacyMode::Full,
            session: bundle_session,
            ci_counts: None,
            annotations_summary: None,
            exported_at: "2026-08-31T09:00:00Z".to_string(),
            anonymize: false,
        });
        // Simulate an artifact produced by an older app build.
        bundle.app_version = "0.0.1-ancient".to_string();
        let package = crate::package::build_package(
            bundle,
            String::new(),
            String::new(),
            "2026-08-31T09:00:00Z".to_string(),
        );

        let mut sessions = SessionStore::new(MemoryStorage::new());
        let report =
            import_package(&mut sessions, &package_to_text(&package)).unwrap();
        assert!(report.integrity.valid);
        assert!(report
            .warnings
            .iter()
            .any(|w| w.field == "appVersion"));
        assert_eq!(report.session_id.as_deref(), Some("sess-2"));
    }
}
