//! Migration engine
//!
//! One engine instance owns a configuration snapshot, the workspace and a
//! platform. Every operation opens its own connection, awaits each database
//! call in order and drops the connection before returning.

use crate::error::{EngineError, EngineResult, ScriptFailure};
use crate::executor::{PlannedScript, ScriptRunner};
use crate::report::{AppliedVersion, EngineState, RunReport};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use yq_core::record::current_version;
use yq_core::{
    compute_files_checksum, AppliedVersionRecord, Bucket, Config, TransactionMode, Version,
    VersionDirectory, VersionStatus, VersionStore,
};
use yq_db::{DbConnection, DbError, PlatformDataService, PlatformOptions, PlatformRegistry};
use yq_sql::tokens::reserved;
use yq_sql::{has_executable_content, merge_tokens, SeparatorRule};

/// Value of `applied_by_tool` in metadata rows
pub const TOOL_NAME: &str = "yuniql";

/// Value of `applied_by_tool_version` in metadata rows
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Longest error text stored in `failed_script_error`
const MAX_ERROR_LEN: usize = 4000;

/// Platform options for a resolved configuration
pub fn platform_options(config: &Config) -> EngineResult<PlatformOptions> {
    let mut options = PlatformOptions::new(config.require_connection_string()?);
    options.meta_schema = config.meta_schema.clone();
    options.meta_table = config.meta_table.clone();
    options.command_timeout_secs = config.command_timeout_secs;
    options.separator = config
        .delimiter
        .as_deref()
        .map(SeparatorRule::from_delimiter)
        .transpose()?;
    Ok(options)
}

/// Bookkeeping for the version currently being applied
struct Progress {
    report: RunReport,
    started: Option<Instant>,
}

/// Applies workspace versions to one database
pub struct MigrationEngine {
    config: Config,
    pub(crate) store: VersionStore,
    pub(crate) service: Arc<dyn PlatformDataService>,
    state: EngineState,
}

impl MigrationEngine {
    /// Create an engine; fails if the workspace directory does not exist.
    pub fn new(config: Config, service: Arc<dyn PlatformDataService>) -> EngineResult<Self> {
        let store = VersionStore::open(&config.workspace)?;
        log::debug!(
            "Engine for platform '{}' on workspace {}",
            service.name(),
            store.root().display()
        );
        Ok(Self {
            config,
            store,
            service,
            state: EngineState::Uninitialized,
        })
    }

    /// Create an engine for the platform the configuration names
    pub fn from_registry(config: Config, registry: &PlatformRegistry) -> EngineResult<Self> {
        let options = platform_options(&config)?;
        let service: Arc<dyn PlatformDataService> =
            Arc::from(registry.create(&config.platform, options)?);
        Self::new(config, service)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &VersionStore {
        &self.store
    }

    pub fn service(&self) -> &Arc<dyn PlatformDataService> {
        &self.service
    }

    /// State reached by the last run or verify
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Apply every pending version.
    pub async fn run(&mut self) -> EngineResult<RunReport> {
        self.execute(false).await
    }

    /// Apply every pending version inside one transaction and roll it back.
    ///
    /// Requires transactional DDL. Nothing is persisted, failed or not.
    pub async fn verify(&mut self) -> EngineResult<RunReport> {
        self.execute(true).await
    }

    fn transition(&mut self, next: EngineState) {
        log::debug!("Engine state {} -> {}", self.state, next);
        self.state = next;
    }

    async fn execute(&mut self, verify_only: bool) -> EngineResult<RunReport> {
        self.state = EngineState::Uninitialized;
        match self.prepare_and_apply(verify_only).await {
            Ok(mut report) => {
                self.transition(EngineState::Completed);
                report.state = EngineState::Completed;
                Ok(report)
            }
            Err(err) => {
                self.transition(EngineState::Failed);
                log::debug!("Run failed ({}): {}", err.kind(), err);
                Err(err)
            }
        }
    }

    /// Effective transaction scope for this call
    pub fn transaction_mode(&self, verify_only: bool) -> EngineResult<TransactionMode> {
        let atomic = self.service.capabilities().is_atomic_ddl_supported;
        if verify_only {
            if !atomic {
                return Err(self.unsupported("verify without transactional DDL"));
            }
            return Ok(TransactionMode::Session);
        }
        match self.config.transaction_mode {
            Some(TransactionMode::None) => Ok(TransactionMode::None),
            Some(mode) if !atomic => Err(self.unsupported(&format!(
                "{} transactions without transactional DDL",
                mode
            ))),
            Some(mode) => Ok(mode),
            None if atomic => Ok(TransactionMode::Version),
            None => Ok(TransactionMode::None),
        }
    }

    fn unsupported(&self, capability: &str) -> EngineError {
        DbError::CapabilityNotSupported {
            platform: self.service.name().to_string(),
            capability: capability.to_string(),
        }
        .into()
    }

    async fn prepare_and_apply(&mut self, verify_only: bool) -> EngineResult<RunReport> {
        let service = Arc::clone(&self.service);
        let mode = self.transaction_mode(verify_only)?;
        // duplicates and malformed names fail before any database I/O
        let versions = self.store.resolve()?;

        if !service.database_exists().await? {
            let database = service.database_name()?;
            if verify_only || !self.config.auto_create_db {
                return Err(EngineError::DatabaseNotFound { database });
            }
            service.create_database().await?;
        }

        let conn = service.connect().await?;
        let mut progress = Progress {
            report: RunReport {
                state: EngineState::Applying,
                pending: Vec::new(),
                applied: Vec::new(),
                final_version: None,
                verify_only,
                mode,
            },
            started: None,
        };

        let session = mode == TransactionMode::Session;
        if session {
            conn.begin().await?;
        }
        let result = self
            .apply_versions(&*conn, &versions, mode, &mut progress)
            .await;

        match result {
            Ok(()) => {
                if session && verify_only {
                    conn.rollback().await?;
                    log::info!("Verify succeeded; all changes rolled back");
                } else if session {
                    conn.commit().await?;
                }
                Ok(progress.report)
            }
            Err(err) => {
                if session {
                    rollback_quietly(&*conn).await;
                }
                if !verify_only {
                    if let Some(failure) = err.script_failure() {
                        let elapsed = progress.started.map(elapsed_ms).unwrap_or_default();
                        let outcome = if mode == TransactionMode::None {
                            self.record_failure(&*conn, &versions, failure, elapsed).await
                        } else {
                            match service.connect().await {
                                Ok(fresh) => {
                                    self.record_failure(&*fresh, &versions, failure, elapsed)
                                        .await
                                }
                                Err(e) => Err(e.into()),
                            }
                        };
                        if let Err(e) = outcome {
                            log::error!("Could not record the failure: {}", e);
                        }
                    }
                }
                Err(err)
            }
        }
    }

    async fn apply_versions(
        &mut self,
        conn: &dyn DbConnection,
        versions: &[VersionDirectory],
        mode: TransactionMode,
        progress: &mut Progress,
    ) -> EngineResult<()> {
        self.ensure_configured(conn).await?;
        self.transition(EngineState::Initialized);

        self.transition(EngineState::Resolving);
        let records = self.read_records(conn).await?;
        let current = current_version(&records);
        let target = self.config.target_version;
        let pending: Vec<&VersionDirectory> = versions
            .iter()
            .filter(|d| current.map_or(true, |c| d.version > c))
            .filter(|d| target.map_or(true, |t| d.version <= t))
            .collect();
        progress.report.pending = pending.iter().map(|d| d.version).collect();
        log::info!(
            "Current version: {}; {} pending version(s)",
            current.map_or_else(|| "none".to_string(), |v| v.to_string()),
            pending.len()
        );
        let mut resume = self.resume_point(&records, pending.first().copied(), mode)?;

        self.transition(EngineState::Applying);
        for bucket in [Bucket::Init, Bucket::Pre] {
            self.run_bucket(conn, bucket).await?;
        }

        for dir in pending {
            log::info!("Applying {}", dir.version);
            progress.started = Some(Instant::now());
            let has_row = records.iter().any(|r| r.version == dir.version);
            if mode == TransactionMode::Version {
                conn.begin().await?;
            }
            let skip_through = resume.take();
            match self
                .apply_and_record(conn, dir, skip_through.as_deref(), has_row)
                .await
            {
                Ok(applied) => {
                    if mode == TransactionMode::Version {
                        conn.commit().await?;
                    }
                    progress.report.applied.push(applied);
                }
                Err(err) => {
                    if mode == TransactionMode::Version {
                        rollback_quietly(conn).await;
                    }
                    return Err(err);
                }
            }
        }
        progress.started = None;

        self.run_bucket(conn, Bucket::Draft).await?;

        progress.report.final_version = progress
            .report
            .applied
            .last()
            .map(|a| a.version)
            .or(current);
        Ok(())
    }

    /// Where a non-transactional run resumes after an earlier failure.
    fn resume_point(
        &self,
        records: &[AppliedVersionRecord],
        first: Option<&VersionDirectory>,
        mode: TransactionMode,
    ) -> EngineResult<Option<String>> {
        if mode != TransactionMode::None {
            return Ok(None);
        }
        let Some(dir) = first else {
            return Ok(None);
        };
        let failed_script = records
            .iter()
            .find(|r| r.version == dir.version && !r.is_successful())
            .and_then(|r| r.failed_script_path.clone());
        let Some(script) = failed_script else {
            return Ok(None);
        };
        if !self.config.continue_after_failure {
            return Err(EngineError::PreviousFailure {
                version: dir.version,
                script,
            });
        }
        log::warn!(
            "Continuing {} after previously failed script '{}'",
            dir.version,
            script
        );
        Ok(Some(script))
    }

    async fn apply_and_record(
        &self,
        conn: &dyn DbConnection,
        dir: &VersionDirectory,
        skip_through: Option<&str>,
        has_row: bool,
    ) -> EngineResult<AppliedVersion> {
        let started = Instant::now();
        let checksum = version_checksum(dir)?;

        let draft_prefix = format!("{}/{}", dir.name, Bucket::Draft.dir_name());
        let drafts: Vec<PlannedScript> = dir
            .draft_scripts()?
            .into_iter()
            .map(|file| PlannedScript::new(&draft_prefix, file))
            .collect();
        // drafts re-run on every attempt, so resuming only skips tracked scripts
        let mut plan: Vec<PlannedScript> = Vec::new();
        for file in dir.scripts()? {
            plan.push(PlannedScript::new(&dir.name, file));
        }
        for file in self.store.bucket_scripts(Bucket::Post)? {
            plan.push(PlannedScript::new(Bucket::Post.dir_name(), file));
        }

        let first = match skip_through {
            Some(path) => match plan.iter().position(|s| s.display == path) {
                Some(idx) => {
                    log::warn!("Skipping {} script(s) up to and including '{}'", idx + 1, path);
                    idx + 1
                }
                None => {
                    log::warn!(
                        "'{}' is no longer part of {}; running all of its scripts",
                        path,
                        dir.version
                    );
                    0
                }
            },
            None => 0,
        };

        let tokens = self.script_tokens(Some(dir.version))?;
        let runner = ScriptRunner::new(&*self.service, conn, &tokens);
        let mut batches = 0;
        for script in drafts.iter().chain(&plan[first..]) {
            batches += runner.run(Some(dir.version), script).await?;
        }

        let applied = AppliedVersion {
            version: dir.version,
            scripts: drafts.len() + plan.len() - first,
            batches,
            duration_ms: elapsed_ms(started),
            checksum,
        };
        let record = self.new_record(
            dir.version,
            VersionStatus::Successful,
            applied.duration_ms,
            applied.checksum.clone(),
        );
        self.write_record(conn, &record, has_row).await?;
        Ok(applied)
    }

    async fn run_bucket(&self, conn: &dyn DbConnection, bucket: Bucket) -> EngineResult<usize> {
        let scripts = self.store.bucket_scripts(bucket)?;
        if scripts.is_empty() {
            return Ok(0);
        }
        let tokens = self.script_tokens(None)?;
        let runner = ScriptRunner::new(&*self.service, conn, &tokens);
        let mut batches = 0;
        for file in scripts {
            let script = PlannedScript::new(bucket.dir_name(), file);
            batches += runner.run(None, &script).await?;
        }
        Ok(batches)
    }

    /// Reserved tokens (plus the version being applied) merged with the
    /// configured user tokens
    pub(crate) fn script_tokens(&self, version: Option<Version>) -> EngineResult<Vec<(String, String)>> {
        let mut engine_tokens = self.service.base_tokens()?;
        if let Some(version) = version {
            engine_tokens.push((reserved::VERSION.to_string(), version.to_string()));
        }
        Ok(merge_tokens(&engine_tokens, &self.config.tokens))
    }

    /// Create the metadata schema and table when missing; returns whether
    /// anything was created.
    async fn ensure_configured(&self, conn: &dyn DbConnection) -> EngineResult<bool> {
        let service = &*self.service;
        if conn
            .query_bool(&service.sql_for_check_if_database_configured()?)
            .await?
        {
            return Ok(false);
        }
        let mut ddl = Vec::new();
        if service.capabilities().is_schema_supported
            && !conn
                .query_bool(&service.sql_for_check_if_schema_exists()?)
                .await?
        {
            ddl.push(service.sql_for_create_schema()?);
        }
        ddl.push(service.sql_for_configure_database()?);

        for sql in ddl {
            for stmt in service.break_statements(&sql) {
                if has_executable_content(&stmt) {
                    conn.execute(&stmt).await?;
                }
            }
        }
        log::info!(
            "Created metadata table {}",
            service.capabilities().meta_table_name
        );
        Ok(true)
    }

    pub(crate) async fn read_records(&self, conn: &dyn DbConnection) -> EngineResult<Vec<AppliedVersionRecord>> {
        let rows = conn
            .query_rows(&self.service.sql_for_get_all_versions()?)
            .await?;
        rows.iter()
            .map(|row| AppliedVersionRecord::from_row(row).map_err(EngineError::from))
            .collect()
    }

    pub(crate) fn new_record(
        &self,
        version: Version,
        status: VersionStatus,
        duration_ms: i64,
        checksum: String,
    ) -> AppliedVersionRecord {
        AppliedVersionRecord {
            sequence_id: 0,
            version,
            applied_on_utc: Utc::now(),
            applied_by_user: current_user(),
            applied_by_tool: TOOL_NAME.to_string(),
            applied_by_tool_version: TOOL_VERSION.to_string(),
            status,
            duration_ms,
            checksum,
            failed_script_path: None,
            failed_script_error: None,
            additional_artifacts: None,
        }
    }

    /// Insert a metadata row, or update the existing row for its version
    pub(crate) async fn write_record(
        &self,
        conn: &dyn DbConnection,
        record: &AppliedVersionRecord,
        exists: bool,
    ) -> EngineResult<()> {
        let sql = if exists {
            self.service.sql_for_update_version(record)?
        } else {
            self.service.sql_for_insert_version(record)?
        };
        conn.execute(&sql).await?;
        log::info!("Recorded {} as {}", record.version, record.status);
        Ok(())
    }

    async fn record_failure(
        &self,
        conn: &dyn DbConnection,
        versions: &[VersionDirectory],
        failure: &ScriptFailure,
        duration_ms: i64,
    ) -> EngineResult<()> {
        let Some(version) = failure.version else {
            return Ok(());
        };
        self.ensure_configured(conn).await?;
        let exists = self
            .read_records(conn)
            .await?
            .iter()
            .any(|r| r.version == version);
        let checksum = match versions.iter().find(|d| d.version == version) {
            Some(dir) => version_checksum(dir)?,
            None => String::new(),
        };

        let mut record = self.new_record(version, VersionStatus::Failed, duration_ms, checksum);
        record.failed_script_path = Some(failure.script.clone());
        record.failed_script_error =
            Some(failure.error.to_string().chars().take(MAX_ERROR_LEN).collect());
        self.write_record(conn, &record, exists).await
    }

    /// Highest successful version, or `None` for an unconfigured database
    pub async fn get_current_version(&self) -> EngineResult<Option<Version>> {
        let Some(conn) = self.connect_if_configured().await? else {
            return Ok(None);
        };
        let rows = conn
            .query_rows(&self.service.sql_for_get_current_version()?)
            .await?;
        let mut current = None;
        for raw in rows.into_iter().filter_map(|row| row.into_iter().next().flatten()) {
            let version = Version::parse(raw.trim())?;
            current = current.max(Some(version));
        }
        Ok(current)
    }

    /// Every metadata row in insertion order
    pub async fn list_versions(&self) -> EngineResult<Vec<AppliedVersionRecord>> {
        match self.connect_if_configured().await? {
            Some(conn) => self.read_records(&*conn).await,
            None => Ok(Vec::new()),
        }
    }

    /// Connection to a database that exists and has the metadata table
    pub(crate) async fn connect_if_configured(&self) -> EngineResult<Option<Box<dyn DbConnection>>> {
        if !self.service.database_exists().await? {
            return Ok(None);
        }
        let conn = self.service.connect().await?;
        let configured = conn
            .query_bool(&self.service.sql_for_check_if_database_configured()?)
            .await?;
        Ok(configured.then_some(conn))
    }
}

/// SHA-256 over a version's main scripts in execution order
pub(crate) fn version_checksum(dir: &VersionDirectory) -> EngineResult<String> {
    let bodies = dir
        .scripts()?
        .iter()
        .map(|s| s.read())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(compute_files_checksum(bodies.iter().map(String::as_str)))
}

pub(crate) async fn rollback_quietly(conn: &dyn DbConnection) {
    if let Err(e) = conn.rollback().await {
        log::warn!("Rollback failed: {}", e);
    }
}

pub(crate) fn elapsed_ms(started: Instant) -> i64 {
    i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX)
}

fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
