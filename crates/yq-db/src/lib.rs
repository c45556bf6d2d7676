//! yq-db - Platform layer for yuniql
//!
//! This crate provides the `DbConnection` and `PlatformDataService` traits,
//! the platform registry, a DuckDB implementation, PostgreSQL/Redshift over
//! `tokio-postgres`, SQL Server over `tiberius`, MySQL over `sqlx`, and SQL
//! template sets for Snowflake and Oracle.

#[cfg(any(feature = "sqlserver", feature = "mysql"))]
mod bulk;
pub mod connection_string;
pub mod duckdb;
pub mod error;
pub mod mysql;
pub mod oracle;
pub mod postgres;
pub mod redshift;
pub mod registry;
pub mod snowflake;
pub mod sqlserver;
pub mod traits;

pub use duckdb::DuckDbPlatform;
pub use error::{DbError, DbResult, SqlFailure};
pub use mysql::MySqlPlatform;
pub use oracle::OraclePlatform;
pub use postgres::PostgresPlatform;
pub use redshift::RedshiftPlatform;
pub use registry::{PlatformFactory, PlatformRegistry};
pub use snowflake::SnowflakePlatform;
pub use sqlserver::SqlServerPlatform;
pub use traits::{
    parse_bool, record_tokens, DbConnection, PlatformCapabilities, PlatformDataService,
    PlatformFlags, PlatformOptions, SqlTemplates,
};
