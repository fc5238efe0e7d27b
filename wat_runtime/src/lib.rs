#![forbid(unsafe_code)]

//! WAT Runtime — persistence, packaging and verification.
//!
//! Wraps the pure `wat_core` computations with the effectful layers:
//! the staged-commit Atomic Store over a raw key-value primitive,
//! session/pack/draft/annotation stores, the versioned export bundle and
//! package builders, tabular export, and import-side compatibility and
//! integrity checking.
//!
//! No scoring or hashing logic lives here — all of that is delegated to
//! `wat_core`.

use chrono::{SecondsFormat, Utc};

pub mod annotations;
pub mod bundle;
pub mod compat;
pub mod csv;
pub mod draft;
pub mod export;
pub mod import;
pub mod pack;
pub mod package;
pub mod sessions;
pub mod storage;
pub mod store;

/// Current wall-clock time as an RFC 3339 UTC string with second
/// precision — the timestamp format used on every wire artifact.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
