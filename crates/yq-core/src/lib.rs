//! yq-core - Core library for yuniql
//!
//! This crate provides the version model, the on-disk workspace layout
//! (version directories and reserved buckets), configuration layering and the
//! applied-version record shared by every other yuniql component.

pub mod checksum;
pub mod config;
pub mod error;
pub mod record;
pub mod script;
pub mod version;
pub mod workspace;

pub use checksum::compute_files_checksum;
pub use config::{Config, ConfigLayer, TransactionMode};
pub use error::{CoreError, CoreResult};
pub use record::{current_version, format_timestamp, parse_timestamp, AppliedVersionRecord, VersionStatus};
pub use script::{ScriptFile, ScriptKind};
pub use version::Version;
pub use workspace::{BaselineLayout, Bucket, VersionDirectory, VersionScan, VersionStore};
