//! Local workspace: version directories and reserved buckets
//!
//! A workspace root holds the reserved buckets (`_init`, `_pre`, `_draft`,
//! `_post`, `_erase`) plus one `v<major>.<minor>` directory per version.
//! [`VersionStore`] enumerates, validates and creates those directories.

use crate::error::{CoreError, CoreResult};
use crate::script::{list_scripts, ScriptFile};
use crate::version::Version;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory that receives version folders consolidated by a rebase.
pub const ARCHIVE_DIR: &str = "_archive";

/// Reserved, non-versioned script directories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    /// Runs first on every run
    Init,
    /// Runs after `_init`, before any version
    Pre,
    /// Draft scripts, re-run every time and never recorded
    Draft,
    /// Runs after each version's scripts
    Post,
    /// Runs only on erase
    Erase,
}

impl Bucket {
    /// All buckets created by `init`
    pub const ALL: [Bucket; 5] = [
        Bucket::Init,
        Bucket::Pre,
        Bucket::Draft,
        Bucket::Post,
        Bucket::Erase,
    ];

    /// Directory name of the bucket
    pub fn dir_name(&self) -> &'static str {
        match self {
            Bucket::Init => "_init",
            Bucket::Pre => "_pre",
            Bucket::Draft => "_draft",
            Bucket::Post => "_post",
            Bucket::Erase => "_erase",
        }
    }
}

/// A version directory found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionDirectory {
    /// Parsed version
    pub version: Version,
    /// Directory name as found (`v1.2` and `v1.02` both parse to 1.2)
    pub name: String,
    /// Full path
    pub path: PathBuf,
}

impl VersionDirectory {
    /// Main scripts of the version, excluding its `_draft` folder
    pub fn scripts(&self) -> CoreResult<Vec<ScriptFile>> {
        list_scripts(&self.path)
    }

    /// Scripts of the version's own `_draft` folder
    pub fn draft_scripts(&self) -> CoreResult<Vec<ScriptFile>> {
        list_scripts(&self.path.join(Bucket::Draft.dir_name()))
    }
}

/// Result of a best-effort scan of the workspace root
#[derive(Debug, Default)]
pub struct VersionScan {
    /// Parsed version directories in ascending order (duplicates included)
    pub versions: Vec<VersionDirectory>,
    /// Directory names that look like versions but failed to parse
    pub invalid: Vec<CoreError>,
}

impl VersionScan {
    /// Fail on the first duplicate `major.minor`.
    fn check_duplicates(&self) -> CoreResult<()> {
        let mut seen: BTreeMap<Version, &str> = BTreeMap::new();
        for dir in &self.versions {
            if let Some(first) = seen.insert(dir.version, &dir.name) {
                return Err(CoreError::DuplicateVersion {
                    version: dir.version.to_string(),
                    first: first.to_string(),
                    second: dir.name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Outcome of consolidating applied versions into a new baseline
#[derive(Debug, Clone)]
pub struct BaselineLayout {
    /// Where the previous version directories were moved
    pub archive_dir: PathBuf,
    /// The moved directories, at their archived location
    pub archived: Vec<VersionDirectory>,
    /// File names written into the new `v0.00`
    pub baseline_files: Vec<String>,
}

const README: &str = "# yuniql workspace

Directories are applied in this order on every run:

- `_init`  - once per run, before everything else
- `_pre`   - once per run, before the first pending version
- `vX.YY`  - each pending version in ascending order (its own `_draft` folder first)
- `_post`  - after each version
- `_draft` - after all versions, never recorded as applied
- `_erase` - only by `yuniql erase`

Create the next version with `yuniql vnext --minor` or `yuniql vnext --major`.
";

const DOCKERFILE: &str = "FROM yuniql/yuniql:latest
COPY . ./db
";

const GITIGNORE: &str = "*.duckdb
*.duckdb.wal
";

/// On-disk version store rooted at a workspace directory
#[derive(Debug, Clone)]
pub struct VersionStore {
    root: PathBuf,
}

impl VersionStore {
    /// Wrap a workspace path without touching the filesystem
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Wrap an existing workspace path
    pub fn open(root: impl Into<PathBuf>) -> CoreResult<Self> {
        let store = Self::new(root);
        store.ensure_exists()?;
        Ok(store)
    }

    /// Workspace root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a reserved bucket
    pub fn bucket_dir(&self, bucket: Bucket) -> PathBuf {
        self.root.join(bucket.dir_name())
    }

    /// Scripts of a reserved bucket in execution order
    pub fn bucket_scripts(&self, bucket: Bucket) -> CoreResult<Vec<ScriptFile>> {
        list_scripts(&self.bucket_dir(bucket))
    }

    fn ensure_exists(&self) -> CoreResult<()> {
        if self.root.is_dir() {
            Ok(())
        } else {
            Err(CoreError::WorkspaceNotFound {
                path: self.root.display().to_string(),
            })
        }
    }

    /// Create the standard layout. Existing content is never touched, so
    /// calling this repeatedly leaves the same directory set.
    pub fn init(&self) -> CoreResult<()> {
        fs::create_dir_all(&self.root).map_err(|e| CoreError::io(&self.root, e))?;

        for bucket in Bucket::ALL {
            let dir = self.bucket_dir(bucket);
            fs::create_dir_all(&dir).map_err(|e| CoreError::io(&dir, e))?;
        }
        let baseline = self.root.join(Version::BASELINE.to_string());
        if self.scan()?.versions.is_empty() {
            fs::create_dir_all(&baseline).map_err(|e| CoreError::io(&baseline, e))?;
        }

        for (name, content) in [
            ("README.md", README),
            ("Dockerfile", DOCKERFILE),
            (".gitignore", GITIGNORE),
        ] {
            let path = self.root.join(name);
            if !path.exists() {
                fs::write(&path, content).map_err(|e| CoreError::io(&path, e))?;
            }
        }
        log::debug!("Initialized workspace at {}", self.root.display());
        Ok(())
    }

    /// Best-effort scan of version directories.
    ///
    /// Buckets, hidden directories and anything that does not start with
    /// `v<digit>` are skipped. Names that do start that way but fail to parse
    /// are collected in [`VersionScan::invalid`] and the scan continues.
    pub fn scan(&self) -> CoreResult<VersionScan> {
        self.ensure_exists()?;
        let mut scan = VersionScan::default();
        for entry in fs::read_dir(&self.root).map_err(|e| CoreError::io(&self.root, e))? {
            let entry = entry.map_err(|e| CoreError::io(&self.root, e))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !Version::looks_like_version(&name) {
                continue;
            }
            match Version::parse(&name) {
                Ok(version) => scan.versions.push(VersionDirectory {
                    version,
                    name,
                    path,
                }),
                Err(e) => scan.invalid.push(e),
            }
        }
        scan.versions
            .sort_by(|a, b| a.version.cmp(&b.version).then_with(|| a.name.cmp(&b.name)));
        Ok(scan)
    }

    /// All versions in ascending order.
    ///
    /// Malformed names are logged and skipped; duplicates are an error since
    /// there is no way to order them.
    pub fn get_all_versions(&self) -> CoreResult<Vec<Version>> {
        let scan = self.scan()?;
        for invalid in &scan.invalid {
            log::warn!("{}", invalid);
        }
        scan.check_duplicates()?;
        Ok(scan.versions.iter().map(|d| d.version).collect())
    }

    /// All version directories, failing on any malformed or duplicate name.
    pub fn resolve(&self) -> CoreResult<Vec<VersionDirectory>> {
        let mut scan = self.scan()?;
        if !scan.invalid.is_empty() {
            return Err(scan.invalid.remove(0));
        }
        scan.check_duplicates()?;
        Ok(scan.versions)
    }

    /// Highest version on disk (fails closed on malformed names)
    pub fn get_latest_version(&self) -> CoreResult<Version> {
        self.resolve()?
            .last()
            .map(|d| d.version)
            .ok_or_else(|| CoreError::NoVersions {
                path: self.root.display().to_string(),
            })
    }

    /// Create `v{major+1}.00`, optionally seeded with a template file.
    pub fn increment_major(&self, template_file: Option<&Path>) -> CoreResult<Version> {
        let next = self.get_latest_version()?.next_major()?;
        self.create_version(next, template_file)?;
        Ok(next)
    }

    /// Create `v{major}.{minor+1}` after the highest version.
    pub fn increment_minor(&self, template_file: Option<&Path>) -> CoreResult<Version> {
        let next = self.get_latest_version()?.next_minor()?;
        self.create_version(next, template_file)?;
        Ok(next)
    }

    fn create_version(&self, version: Version, template_file: Option<&Path>) -> CoreResult<()> {
        let dir = self.root.join(version.to_string());
        fs::create_dir_all(&dir).map_err(|e| CoreError::io(&dir, e))?;

        if let Some(template) = template_file {
            let file_name = template.file_name().ok_or_else(|| CoreError::ConfigInvalid {
                message: format!("template '{}' has no file name", template.display()),
            })?;
            let target = dir.join(file_name);
            if template.is_file() {
                fs::copy(template, &target).map_err(|e| CoreError::io(template, e))?;
            } else if !target.exists() {
                fs::write(&target, "").map_err(|e| CoreError::io(&target, e))?;
            }
        }
        log::info!("Created version directory {}", dir.display());
        Ok(())
    }

    /// Move version directories under `_archive/<stamp>/`.
    ///
    /// Returns the directories at their new location. Nothing is deleted.
    /// If one move fails, the directories already moved are put back.
    pub fn archive_versions(
        &self,
        versions: &[VersionDirectory],
        stamp: &str,
    ) -> CoreResult<(PathBuf, Vec<VersionDirectory>)> {
        let archive_dir = self.root.join(ARCHIVE_DIR).join(stamp);
        if archive_dir.exists() {
            return Err(CoreError::ConfigInvalid {
                message: format!("archive '{}' already exists", archive_dir.display()),
            });
        }
        fs::create_dir_all(&archive_dir).map_err(|e| CoreError::io(&archive_dir, e))?;

        let mut archived = Vec::with_capacity(versions.len());
        for dir in versions {
            let target = archive_dir.join(&dir.name);
            if let Err(e) = fs::rename(&dir.path, &target) {
                let layout = BaselineLayout {
                    archive_dir,
                    archived,
                    baseline_files: Vec::new(),
                };
                self.undo_or_log(&layout);
                return Err(CoreError::io(&dir.path, e));
            }
            archived.push(VersionDirectory {
                version: dir.version,
                name: dir.name.clone(),
                path: target,
            });
        }
        Ok((archive_dir, archived))
    }

    /// Archive the applied version directories and write a new `v0.00`
    /// holding copies of their scripts in the original execution order.
    ///
    /// On failure the workspace is put back the way it was.
    pub fn consolidate_baseline(
        &self,
        applied: &[VersionDirectory],
        stamp: &str,
    ) -> CoreResult<BaselineLayout> {
        let (archive_dir, archived) = self.archive_versions(applied, stamp)?;
        let mut layout = BaselineLayout {
            archive_dir,
            archived,
            baseline_files: Vec::new(),
        };

        if let Err(err) = self.write_baseline(&mut layout) {
            self.undo_or_log(&layout);
            return Err(err);
        }

        log::info!(
            "Archived {} version(s) into {}",
            layout.archived.len(),
            layout.archive_dir.display()
        );
        Ok(layout)
    }

    fn write_baseline(&self, layout: &mut BaselineLayout) -> CoreResult<()> {
        let baseline = self.root.join(Version::BASELINE.to_string());
        fs::create_dir_all(&baseline).map_err(|e| CoreError::io(&baseline, e))?;

        let mut seq = 0usize;
        for dir in &layout.archived {
            for script in dir.scripts()? {
                seq += 1;
                let name = format!(
                    "{:03}_{}_{}",
                    seq,
                    dir.version,
                    script.relative_path.replace('/', "_")
                );
                let target = baseline.join(&name);
                fs::copy(&script.path, &target).map_err(|e| CoreError::io(&script.path, e))?;
                layout.baseline_files.push(name);
            }
        }
        Ok(())
    }

    /// Undo [`consolidate_baseline`](Self::consolidate_baseline): drop the
    /// generated baseline files and move the archived directories back.
    pub fn restore_archive(&self, layout: &BaselineLayout) -> CoreResult<()> {
        let baseline = self.root.join(Version::BASELINE.to_string());
        for name in &layout.baseline_files {
            let file = baseline.join(name);
            if file.exists() {
                fs::remove_file(&file).map_err(|e| CoreError::io(&file, e))?;
            }
        }
        if is_empty_dir(&baseline) {
            fs::remove_dir(&baseline).map_err(|e| CoreError::io(&baseline, e))?;
        }

        for dir in &layout.archived {
            let original = self.root.join(&dir.name);
            fs::rename(&dir.path, &original).map_err(|e| CoreError::io(&dir.path, e))?;
        }
        if is_empty_dir(&layout.archive_dir) {
            fs::remove_dir(&layout.archive_dir)
                .map_err(|e| CoreError::io(&layout.archive_dir, e))?;
        }
        log::info!(
            "Restored {} version(s) from {}",
            layout.archived.len(),
            layout.archive_dir.display()
        );
        Ok(())
    }

    fn undo_or_log(&self, layout: &BaselineLayout) {
        if let Err(err) = self.restore_archive(layout) {
            log::error!(
                "Could not restore the workspace from {}: {}",
                layout.archive_dir.display(),
                err
            );
        }
    }
}

fn is_empty_dir(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "workspace_test.rs"]
mod tests;
