//! Platform registry
//!
//! Maps a platform name to a factory. Names are matched case-insensitively.
//! Additional dialects are registered at startup; nothing is loaded from disk.

use crate::duckdb::DuckDbPlatform;
use crate::error::{DbError, DbResult};
use crate::mysql::MySqlPlatform;
use crate::oracle::OraclePlatform;
use crate::postgres::PostgresPlatform;
use crate::redshift::RedshiftPlatform;
use crate::snowflake::SnowflakePlatform;
use crate::sqlserver::SqlServerPlatform;
use crate::traits::{PlatformDataService, PlatformOptions};
use std::collections::BTreeMap;

/// Builds a platform from its options
pub type PlatformFactory = fn(PlatformOptions) -> DbResult<Box<dyn PlatformDataService>>;

/// Name → factory table
#[derive(Default)]
pub struct PlatformRegistry {
    factories: BTreeMap<String, PlatformFactory>,
}

impl PlatformRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in platform
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("duckdb", |o| Ok(Box::new(DuckDbPlatform::new(o)?)));
        registry.register("postgresql", |o| Ok(Box::new(PostgresPlatform::new(o)?)));
        registry.register("sqlserver", |o| Ok(Box::new(SqlServerPlatform::new(o)?)));
        registry.register("mysql", |o| Ok(Box::new(MySqlPlatform::new(o)?)));
        registry.register("snowflake", |o| Ok(Box::new(SnowflakePlatform::new(o)?)));
        registry.register("redshift", |o| Ok(Box::new(RedshiftPlatform::new(o)?)));
        registry.register("oracle", |o| Ok(Box::new(OraclePlatform::new(o)?)));
        registry
    }

    /// Add or replace a platform
    pub fn register(&mut self, name: &str, factory: PlatformFactory) {
        if self
            .factories
            .insert(name.to_ascii_lowercase(), factory)
            .is_some()
        {
            log::debug!("Replaced platform factory '{}'", name);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.to_ascii_lowercase())
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Instantiate the platform registered under `name`
    pub fn create(
        &self,
        name: &str,
        options: PlatformOptions,
    ) -> DbResult<Box<dyn PlatformDataService>> {
        let factory = self
            .factories
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| DbError::UnsupportedPlatform {
                name: name.to_string(),
                available: self.names().join(", "),
            })?;
        log::debug!("Creating platform '{}'", name);
        factory(options)
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
