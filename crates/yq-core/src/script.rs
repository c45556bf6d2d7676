//! Script files inside version and bucket directories

use crate::error::{CoreError, CoreResult};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// What the engine does with a script file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ScriptKind {
    /// Plain SQL, token-replaced and split into batches
    Sql,
    /// Bulk data file loaded into `schema.table`
    BulkCsv {
        schema: Option<String>,
        table: String,
    },
}

/// A single executable file in a version or bucket directory
#[derive(Debug, Clone, Serialize)]
pub struct ScriptFile {
    /// Absolute (or workspace-joined) path
    pub path: PathBuf,
    /// Path relative to the directory it was listed from, `/`-separated
    pub relative_path: String,
    /// How the file is applied
    pub kind: ScriptKind,
}

impl ScriptFile {
    /// Read the script body. The file handle is released before returning.
    pub fn read(&self) -> CoreResult<String> {
        std::fs::read_to_string(&self.path).map_err(|e| CoreError::io(&self.path, e))
    }

    /// File name without directories
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.relative_path)
    }
}

/// Derive the target of a bulk file from its name.
///
/// `regions.csv` loads `regions`, `dbo.regions.csv` loads `dbo.regions` and
/// `01.dbo.regions.csv` loads `dbo.regions` (leading parts only order files).
pub fn bulk_target(file_stem: &str) -> ScriptKind {
    let parts: Vec<&str> = file_stem.split('.').filter(|p| !p.is_empty()).collect();
    match parts.as_slice() {
        [] => ScriptKind::BulkCsv {
            schema: None,
            table: file_stem.to_string(),
        },
        [table] => ScriptKind::BulkCsv {
            schema: None,
            table: (*table).to_string(),
        },
        [.., schema, table] => ScriptKind::BulkCsv {
            schema: Some((*schema).to_string()),
            table: (*table).to_string(),
        },
    }
}

fn classify(path: &Path) -> Option<ScriptKind> {
    let ext = path.extension().and_then(|e| e.to_str())?;
    if ext.eq_ignore_ascii_case("sql") {
        Some(ScriptKind::Sql)
    } else if ext.eq_ignore_ascii_case("csv") {
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        Some(bulk_target(stem))
    } else {
        None
    }
}

/// Whether a directory name is reserved or hidden and never walked into.
fn is_skipped_dir(name: &str) -> bool {
    name.starts_with('_') || name.starts_with('.')
}

/// List the scripts of one directory in execution order.
///
/// Files of the directory itself come first, sorted by file name; nested
/// directories follow, also sorted by name, each walked the same way.
/// Reserved (`_name`) and hidden directories are not entered. A missing
/// directory yields an empty list.
pub fn list_scripts(dir: &Path) -> CoreResult<Vec<ScriptFile>> {
    let mut scripts = Vec::new();
    if dir.is_dir() {
        collect_scripts(dir, dir, &mut scripts)?;
    }
    Ok(scripts)
}

fn collect_scripts(root: &Path, dir: &Path, out: &mut Vec<ScriptFile>) -> CoreResult<()> {
    let mut files = Vec::new();
    let mut subdirs = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| CoreError::io(dir, e))? {
        let entry = entry.map_err(|e| CoreError::io(dir, e))?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if path.is_dir() {
            if !is_skipped_dir(&name) {
                subdirs.push((name, path));
            }
        } else if let Some(kind) = classify(&path) {
            files.push((name, path, kind));
        }
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    subdirs.sort_by(|a, b| a.0.cmp(&b.0));

    for (_, path, kind) in files {
        let relative_path = path
            .strip_prefix(root)
            .unwrap_or(path.as_path())
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        out.push(ScriptFile {
            path,
            relative_path,
            kind,
        });
    }
    for (_, path) in subdirs {
        collect_scripts(root, &path, out)?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "script_test.rs"]
mod tests;
