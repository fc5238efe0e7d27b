#![forbid(unsafe_code)]

//! WAT Core — deterministic scoring, classification and canonical hashing
//! for word-association test sessions.
//!
//! Everything in this crate is a pure, synchronous computation: same input,
//! byte-identical output, on every platform. No I/O, no clocks, no logging.
//! Persistence, packaging and verification live in `wat_runtime`.

/// Export bundle schema identifier. Bump only for breaking layout changes;
/// additive keys stay within the same tag.
pub const EXPORT_SCHEMA_VERSION: &str = "rb_v3";

/// Export package envelope identifier.
pub const PACKAGE_VERSION: &str = "pkg_v1";

/// Stimulus pack schema identifier.
pub const PACK_SCHEMA_VERSION: &str = "pack_v1";

/// Version of the protocol document sessions are administered under.
pub const PROTOCOL_DOC_VERSION: &str = "1.0";

/// Scoring algorithm identifier: MAD modified z-scores, 3.5 cutoff.
pub const SCORING_ALGORITHM: &str = "mad_v1";

/// Digest algorithm recorded in export packages.
pub const HASH_ALGORITHM: &str = "sha256";

/// Header token for the tabular (CSV) trial export.
pub const CSV_SCHEMA_TOKEN: &str = "wat_csv_v1";

/// Producing application version, recorded in every session and bundle.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod canonical;
pub mod classifier;
pub mod domain;
pub mod scoring;
pub mod snapshot;
