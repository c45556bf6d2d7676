//! yq-engine - Migration engine for yuniql
//!
//! [`MigrationEngine`] resolves pending workspace versions against the
//! metadata table of one database and applies them in order, with
//! per-session, per-version or no transactions. It also runs the `_erase`
//! bucket and consolidates applied history into a new baseline.

pub mod engine;
pub mod error;
mod executor;
mod maintenance;
pub mod report;

pub use engine::{platform_options, MigrationEngine, TOOL_NAME, TOOL_VERSION};
pub use error::{EngineError, EngineResult, ErrorKind, ScriptFailure};
pub use report::{AppliedVersion, EngineState, EraseReport, RebaseReport, RunReport};
