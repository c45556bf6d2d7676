//! Layered configuration
//!
//! Values come from four layers, lowest precedence first: built-in defaults,
//! the workspace file `yuniql.yml`, `YUNIQL_*` environment variables and the
//! session (command-line) values. Each non-default layer is a [`ConfigLayer`]
//! whose fields are all optional; [`Config::resolve`] folds them into one
//! immutable snapshot that is handed to the engine.

use crate::error::{CoreError, CoreResult};
use crate::version::Version;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Workspace configuration file name
pub const CONFIG_FILE_NAME: &str = "yuniql.yml";

/// Platform used when no layer names one
pub const DEFAULT_PLATFORM: &str = "duckdb";

/// Metadata table used when no layer names one
pub const DEFAULT_META_TABLE: &str = "__yuniqldbversion";

/// Per-statement timeout in seconds
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;

/// Environment variable names read by [`ConfigLayer::from_env_map`]
pub mod env {
    pub const PLATFORM: &str = "YUNIQL_PLATFORM";
    pub const CONNECTION_STRING: &str = "YUNIQL_CONNECTION_STRING";
    pub const WORKSPACE: &str = "YUNIQL_WORKSPACE";
    pub const TARGET_VERSION: &str = "YUNIQL_TARGET_VERSION";
    pub const META_SCHEMA: &str = "YUNIQL_META_SCHEMA";
    pub const META_TABLE: &str = "YUNIQL_META_TABLE";
    pub const COMMAND_TIMEOUT: &str = "YUNIQL_COMMAND_TIMEOUT";
    pub const TRANSACTION_MODE: &str = "YUNIQL_TRANSACTION_MODE";
    pub const TOKENS: &str = "YUNIQL_TOKENS";
}

/// Transaction scope used while applying versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionMode {
    /// One transaction around every pending version of the run
    Session,
    /// One transaction per version
    Version,
    /// Autocommit; each statement commits as it runs
    None,
}

impl fmt::Display for TransactionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionMode::Session => write!(f, "session"),
            TransactionMode::Version => write!(f, "version"),
            TransactionMode::None => write!(f, "none"),
        }
    }
}

impl FromStr for TransactionMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "session" => Ok(TransactionMode::Session),
            "version" => Ok(TransactionMode::Version),
            "none" => Ok(TransactionMode::None),
            other => Err(CoreError::ConfigInvalid {
                message: format!(
                    "unknown transaction mode '{}' (expected session, version or none)",
                    other
                ),
            }),
        }
    }
}

/// Parse a single `KEY=VALUE` token argument.
pub fn parse_token(raw: &str) -> CoreResult<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(CoreError::ConfigInvalid {
            message: format!("token '{}' must have the form KEY=VALUE", raw),
        }),
    }
}

/// Parse a comma separated `K=V,K2=V2` list.
pub fn parse_token_list(raw: &str) -> CoreResult<Vec<(String, String)>> {
    raw.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| parse_token(part.trim()))
        .collect()
}

fn deserialize_tokens<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    let map = BTreeMap::<String, String>::deserialize(deserializer)?;
    Ok(map.into_iter().collect())
}

/// One partial layer of configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub connection_string: Option<String>,
    #[serde(default)]
    pub workspace: Option<PathBuf>,
    #[serde(default)]
    pub target_version: Option<Version>,
    #[serde(default)]
    pub meta_schema: Option<String>,
    #[serde(default)]
    pub meta_table: Option<String>,
    /// Seconds
    #[serde(default)]
    pub command_timeout: Option<u64>,
    #[serde(default)]
    pub transaction_mode: Option<TransactionMode>,
    #[serde(default)]
    pub auto_create_db: Option<bool>,
    #[serde(default)]
    pub continue_after_failure: Option<bool>,
    /// Statement separator override
    #[serde(default)]
    pub delimiter: Option<String>,
    /// Token pairs; later layers append after earlier ones
    #[serde(default, deserialize_with = "deserialize_tokens")]
    pub tokens: Vec<(String, String)>,
}

impl ConfigLayer {
    /// Load a layer from a YAML file
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content).map_err(|e| CoreError::ConfigParseError {
            message: format!("{}: {}", path.display(), e),
        })
    }

    /// Load `yuniql.yml` from a workspace directory if it exists
    pub fn load_from_dir(dir: &Path) -> CoreResult<Option<Self>> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::load(&path).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Build a layer from a map of environment variables
    pub fn from_env_map(vars: &HashMap<String, String>) -> CoreResult<Self> {
        let get = |name: &str| {
            vars.get(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let target_version = get(env::TARGET_VERSION)
            .map(|v| Version::parse(&v))
            .transpose()?;
        let command_timeout = get(env::COMMAND_TIMEOUT)
            .map(|v| {
                v.parse::<u64>().map_err(|_| CoreError::ConfigInvalid {
                    message: format!(
                        "{} must be a number of seconds, got '{}'",
                        env::COMMAND_TIMEOUT,
                        v
                    ),
                })
            })
            .transpose()?;
        let transaction_mode = get(env::TRANSACTION_MODE)
            .map(|v| v.parse::<TransactionMode>())
            .transpose()?;
        let tokens = match get(env::TOKENS) {
            Some(raw) => parse_token_list(&raw)?,
            None => Vec::new(),
        };

        Ok(Self {
            platform: get(env::PLATFORM),
            connection_string: get(env::CONNECTION_STRING),
            workspace: get(env::WORKSPACE).map(PathBuf::from),
            target_version,
            meta_schema: get(env::META_SCHEMA),
            meta_table: get(env::META_TABLE),
            command_timeout,
            transaction_mode,
            tokens,
            ..Self::default()
        })
    }

    /// Build a layer from the current process environment
    pub fn from_process_env() -> CoreResult<Self> {
        let vars: HashMap<String, String> = std::env::vars()
            .filter(|(k, _)| k.starts_with("YUNIQL_"))
            .collect();
        Self::from_env_map(&vars)
    }

    /// Values of `higher` win; token lists are concatenated.
    fn overlay(self, higher: ConfigLayer) -> ConfigLayer {
        let mut tokens = self.tokens;
        tokens.extend(higher.tokens);
        ConfigLayer {
            platform: higher.platform.or(self.platform),
            connection_string: higher.connection_string.or(self.connection_string),
            workspace: higher.workspace.or(self.workspace),
            target_version: higher.target_version.or(self.target_version),
            meta_schema: higher.meta_schema.or(self.meta_schema),
            meta_table: higher.meta_table.or(self.meta_table),
            command_timeout: higher.command_timeout.or(self.command_timeout),
            transaction_mode: higher.transaction_mode.or(self.transaction_mode),
            auto_create_db: higher.auto_create_db.or(self.auto_create_db),
            continue_after_failure: higher
                .continue_after_failure
                .or(self.continue_after_failure),
            delimiter: higher.delimiter.or(self.delimiter),
            tokens,
        }
    }
}

/// Resolved configuration snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    /// Registry name of the platform
    pub platform: String,
    /// Connection string; required by every command that touches a database
    pub connection_string: Option<String>,
    /// Workspace root
    pub workspace: PathBuf,
    /// Highest version to apply
    pub target_version: Option<Version>,
    /// Schema of the metadata table; `None` means the platform default
    pub meta_schema: Option<String>,
    /// Name of the metadata table
    pub meta_table: String,
    /// Per-statement timeout in seconds
    pub command_timeout_secs: u64,
    /// `None` means the platform default
    pub transaction_mode: Option<TransactionMode>,
    pub auto_create_db: bool,
    pub continue_after_failure: bool,
    pub delimiter: Option<String>,
    pub tokens: Vec<(String, String)>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            platform: DEFAULT_PLATFORM.to_string(),
            connection_string: None,
            workspace: PathBuf::from("."),
            target_version: None,
            meta_schema: None,
            meta_table: DEFAULT_META_TABLE.to_string(),
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            transaction_mode: None,
            auto_create_db: false,
            continue_after_failure: false,
            delimiter: None,
            tokens: Vec::new(),
        }
    }
}

impl Config {
    /// Fold the layers over the defaults.
    ///
    /// Precedence is session > environment > file > defaults for every
    /// scalar; tokens from all layers are kept in that same order so a later
    /// layer's mapping for a key wins.
    pub fn resolve(
        file: Option<ConfigLayer>,
        env: ConfigLayer,
        session: ConfigLayer,
    ) -> CoreResult<Self> {
        let merged = file.unwrap_or_default().overlay(env).overlay(session);
        let defaults = Config::default();

        let config = Config {
            platform: merged
                .platform
                .map(|p| p.trim().to_ascii_lowercase())
                .unwrap_or(defaults.platform),
            connection_string: merged.connection_string,
            workspace: merged.workspace.unwrap_or(defaults.workspace),
            target_version: merged.target_version,
            meta_schema: merged.meta_schema,
            meta_table: merged.meta_table.unwrap_or(defaults.meta_table),
            command_timeout_secs: merged
                .command_timeout
                .unwrap_or(defaults.command_timeout_secs),
            transaction_mode: merged.transaction_mode,
            auto_create_db: merged.auto_create_db.unwrap_or(false),
            continue_after_failure: merged.continue_after_failure.unwrap_or(false),
            delimiter: merged.delimiter.filter(|d| !d.trim().is_empty()),
            tokens: merged.tokens,
        };
        config.validate()?;
        Ok(config)
    }

    /// Resolve using the session layer, the process environment and the
    /// `yuniql.yml` of whichever workspace those two select.
    pub fn discover(session: ConfigLayer) -> CoreResult<Self> {
        let env = ConfigLayer::from_process_env()?;
        let workspace = session
            .workspace
            .clone()
            .or_else(|| env.workspace.clone())
            .unwrap_or_else(|| PathBuf::from("."));
        let file = ConfigLayer::load_from_dir(&workspace)?;
        log::debug!(
            "Configuration layers: file={} env_platform={:?}",
            file.is_some(),
            env.platform
        );
        Self::resolve(file, env, session)
    }

    fn validate(&self) -> CoreResult<()> {
        if self.platform.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "platform cannot be empty".to_string(),
            });
        }
        if self.meta_table.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "metadata table name cannot be empty".to_string(),
            });
        }
        if self.command_timeout_secs == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "command timeout must be at least one second".to_string(),
            });
        }
        Ok(())
    }

    /// Connection string or a configuration error naming the ways to set it
    pub fn require_connection_string(&self) -> CoreResult<&str> {
        self.connection_string
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| CoreError::ConfigInvalid {
                message: format!(
                    "missing connection string (use -c/--connection-string or {})",
                    env::CONNECTION_STRING
                ),
            })
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
