//! Script execution on one open connection

use crate::error::{EngineError, EngineResult, ScriptFailure};
use yq_core::{ScriptFile, ScriptKind, Version};
use yq_db::{DbConnection, DbError, PlatformDataService};
use yq_sql::tokens::{replace, unresolved};
use yq_sql::has_executable_content;

/// A script together with the workspace-relative path used in logs and
/// metadata rows (`v1.00/01_tables.sql`, `_post/grants.sql`)
#[derive(Debug, Clone)]
pub(crate) struct PlannedScript {
    pub(crate) display: String,
    pub(crate) file: ScriptFile,
}

impl PlannedScript {
    pub(crate) fn new(prefix: &str, file: ScriptFile) -> Self {
        Self {
            display: format!("{}/{}", prefix, file.relative_path),
            file,
        }
    }
}

/// Runs scripts on a connection the caller owns; never begins, commits or
/// rolls back on its own.
pub(crate) struct ScriptRunner<'a> {
    service: &'a dyn PlatformDataService,
    conn: &'a dyn DbConnection,
    tokens: &'a [(String, String)],
}

impl<'a> ScriptRunner<'a> {
    pub(crate) fn new(
        service: &'a dyn PlatformDataService,
        conn: &'a dyn DbConnection,
        tokens: &'a [(String, String)],
    ) -> Self {
        Self {
            service,
            conn,
            tokens,
        }
    }

    /// Execute one script, returning the number of batches sent.
    pub(crate) async fn run(
        &self,
        version: Option<Version>,
        script: &PlannedScript,
    ) -> EngineResult<usize> {
        let batches = match &script.file.kind {
            ScriptKind::Sql => self.run_sql(version, script).await?,
            ScriptKind::BulkCsv { schema, table } => {
                let loaded = self
                    .conn
                    .bulk_import(&script.file.path, schema.as_deref(), table)
                    .await
                    .map_err(|error| failed(version, script, None, None, error))?;
                log::debug!("Loaded {} row(s) into {}", loaded, table);
                1
            }
        };
        log::info!("Executed {} ({} batch(es))", script.display, batches);
        Ok(batches)
    }

    async fn run_sql(&self, version: Option<Version>, script: &PlannedScript) -> EngineResult<usize> {
        let raw = script.file.read()?;
        let sql = replace(self.tokens, &raw);
        let missing = unresolved(&sql);
        if !missing.is_empty() {
            log::warn!(
                "{}: no value for token(s) {}",
                script.display,
                missing.join(", ")
            );
        }

        let mut executed = 0;
        for (idx, batch) in self.service.break_statements(&sql).into_iter().enumerate() {
            let batch_no = idx as u32 + 1;
            if !has_executable_content(&batch) {
                log::trace!("{}: batch {} has nothing to execute", script.display, batch_no);
                continue;
            }
            log::debug!("{}: executing batch {}", script.display, batch_no);
            if let Err(error) = self.conn.execute(&batch).await {
                return Err(failed(version, script, Some(batch), Some(batch_no), error));
            }
            executed += 1;
        }
        Ok(executed)
    }
}

fn failed(
    version: Option<Version>,
    script: &PlannedScript,
    statement: Option<String>,
    batch_no: Option<u32>,
    error: DbError,
) -> EngineError {
    EngineError::ScriptFailed(Box::new(ScriptFailure {
        version,
        script: script.display.clone(),
        statement,
        batch_no,
        error,
    }))
}
