//! Workspace maintenance: `_erase` and baseline consolidation

use crate::engine::{elapsed_ms, rollback_quietly, version_checksum, MigrationEngine};
use crate::error::{EngineError, EngineResult};
use crate::executor::{PlannedScript, ScriptRunner};
use crate::report::{EraseReport, RebaseReport};
use chrono::Utc;
use serde::Serialize;
use std::time::Instant;
use yq_core::{BaselineLayout, Bucket, Version, VersionDirectory, VersionStatus};
use yq_db::DbConnection;

#[derive(Serialize)]
struct BaselineArtifacts<'a> {
    consolidated: &'a [Version],
    archive: String,
    files: &'a [String],
}

impl MigrationEngine {
    /// Run the `_erase` bucket.
    ///
    /// With `force` the scripts run and commit. Without it the call is a dry
    /// check: on transactional platforms the scripts run and are rolled back,
    /// elsewhere they are only listed.
    pub async fn erase(&self, force: bool) -> EngineResult<EraseReport> {
        let scripts: Vec<PlannedScript> = self
            .store
            .bucket_scripts(Bucket::Erase)?
            .into_iter()
            .map(|file| PlannedScript::new(Bucket::Erase.dir_name(), file))
            .collect();
        let names: Vec<String> = scripts.iter().map(|s| s.display.clone()).collect();
        let atomic = self.service.capabilities().is_atomic_ddl_supported;

        if !force && !atomic {
            log::warn!(
                "{} has no transactional DDL; listing _erase scripts without running them",
                self.service.name()
            );
            return Ok(EraseReport {
                scripts: names,
                dry_run: true,
                executed: false,
            });
        }
        if !self.service.database_exists().await? {
            return Err(EngineError::DatabaseNotFound {
                database: self.service.database_name()?,
            });
        }

        let conn = self.service.connect().await?;
        let tokens = self.script_tokens(None)?;
        let runner = ScriptRunner::new(&*self.service, &*conn, &tokens);
        if atomic {
            conn.begin().await?;
        }
        for script in &scripts {
            if let Err(err) = runner.run(None, script).await {
                if atomic {
                    rollback_quietly(&*conn).await;
                }
                return Err(err);
            }
        }
        if atomic && force {
            conn.commit().await?;
        } else if atomic {
            conn.rollback().await?;
            log::info!("Dry run: {} _erase script(s) ran cleanly and were rolled back", names.len());
        }

        Ok(EraseReport {
            scripts: names,
            dry_run: !force,
            executed: true,
        })
    }

    /// Fold every applied version into a new `v0.00` baseline.
    ///
    /// Applied version directories move under `_archive/<stamp>/`; the
    /// metadata table is cleared and holds a single `v0.00` row afterwards.
    pub async fn rebase(&self) -> EngineResult<RebaseReport> {
        let started = Instant::now();
        let versions = self.store.resolve()?;
        let conn = self
            .connect_if_configured()
            .await?
            .ok_or(EngineError::NothingToRebase)?;

        let records = self.read_records(&*conn).await?;
        let applied: Vec<VersionDirectory> = versions
            .into_iter()
            .filter(|d| {
                records
                    .iter()
                    .any(|r| r.is_successful() && r.version == d.version)
            })
            .collect();
        if applied.is_empty() {
            return Err(EngineError::NothingToRebase);
        }

        let stamp = Utc::now().format("%Y%m%d-%H%M%S%3f").to_string();
        let atomic = self.service.capabilities().is_atomic_ddl_supported;
        if atomic {
            conn.begin().await?;
        }
        let layout = match self.consolidate(&*conn, &applied, &stamp, atomic).await {
            Ok(layout) => layout,
            Err(err) => {
                if atomic {
                    rollback_quietly(&*conn).await;
                }
                return Err(err);
            }
        };

        match self.record_baseline(&*conn, &applied, &layout, atomic, started).await {
            Ok(report) => {
                log::info!(
                    "Rebased {} version(s) into {}",
                    report.consolidated.len(),
                    Version::BASELINE
                );
                Ok(report)
            }
            Err(err) => {
                if atomic {
                    rollback_quietly(&*conn).await;
                    self.restore_layout(&layout);
                } else {
                    log::error!(
                        "Version history was cleared but the baseline was not recorded; \
                         archived directories remain in {}",
                        layout.archive_dir.display()
                    );
                }
                Err(err)
            }
        }
    }

    /// Clear the history and move the applied directories into a baseline.
    ///
    /// Returns with the workspace untouched when either step fails.
    async fn consolidate(
        &self,
        conn: &dyn DbConnection,
        applied: &[VersionDirectory],
        stamp: &str,
        atomic: bool,
    ) -> EngineResult<BaselineLayout> {
        let clear = self.service.sql_for_clear_versions()?;
        // a failed file move must leave the history as it was
        if atomic {
            conn.execute(&clear).await?;
        }
        let layout = self.store.consolidate_baseline(applied, stamp)?;
        if !atomic {
            if let Err(err) = conn.execute(&clear).await {
                self.restore_layout(&layout);
                return Err(err.into());
            }
        }
        Ok(layout)
    }

    fn restore_layout(&self, layout: &BaselineLayout) {
        if let Err(err) = self.store.restore_archive(layout) {
            log::error!(
                "Could not move version directories back from {}: {}",
                layout.archive_dir.display(),
                err
            );
        }
    }

    async fn record_baseline(
        &self,
        conn: &dyn DbConnection,
        applied: &[VersionDirectory],
        layout: &BaselineLayout,
        atomic: bool,
        started: Instant,
    ) -> EngineResult<RebaseReport> {
        let consolidated: Vec<Version> = applied.iter().map(|d| d.version).collect();
        let baseline = VersionDirectory {
            version: Version::BASELINE,
            name: Version::BASELINE.to_string(),
            path: self.store.root().join(Version::BASELINE.to_string()),
        };
        let artifacts = BaselineArtifacts {
            consolidated: &consolidated,
            archive: layout.archive_dir.display().to_string(),
            files: &layout.baseline_files,
        };

        let mut record = self.new_record(
            Version::BASELINE,
            VersionStatus::Successful,
            elapsed_ms(started),
            version_checksum(&baseline)?,
        );
        record.additional_artifacts = Some(serde_json::to_string(&artifacts)?);
        self.write_record(conn, &record, false).await?;
        if atomic {
            conn.commit().await?;
        }

        Ok(RebaseReport {
            consolidated,
            archive_dir: layout.archive_dir.clone(),
            baseline_files: layout.baseline_files.clone(),
        })
    }
}
