use anyhow::{anyhow, Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use suivm_core::{ArtifactKey, Environment, SuivmError};
use tracing::{debug, info, warn};

use crate::archive::managed_executables;
use crate::fs_utils::copy_dir_normalized;
use crate::{InstallationStore, VersionRecord};

const STAGING_PREFIX: &str = ".staging-";

/// One stored payload, named by its artifact key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEntry {
    pub key: ArtifactKey,
    pub path: PathBuf,
}

impl BackupEntry {
    pub fn name(&self) -> String {
        self.key.encode()
    }

    /// Managed executables at the top of the payload.
    pub fn executables(&self) -> Result<Vec<String>> {
        managed_executables(&self.path)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupListing {
    pub entries: Vec<BackupEntry>,
    /// Directory names that do not decode as artifact keys.
    pub unrecognized: Vec<String>,
}

impl BackupListing {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.unrecognized.is_empty()
    }

    pub fn by_environment(&self) -> BTreeMap<Environment, Vec<BackupEntry>> {
        let mut grouped: BTreeMap<Environment, Vec<BackupEntry>> = BTreeMap::new();
        for entry in &self.entries {
            grouped
                .entry(entry.key.environment())
                .or_default()
                .push(entry.clone());
        }
        grouped
    }

    pub fn find(&self, key: &ArtifactKey) -> Option<&BackupEntry> {
        self.entries.iter().find(|entry| &entry.key == key)
    }
}

/// What `clean` would do to one environment's backups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPlan {
    pub environment: Environment,
    pub keep: Vec<BackupEntry>,
    pub delete: Vec<BackupEntry>,
}

impl RetentionPlan {
    pub fn keeps(&self, entry: &BackupEntry) -> bool {
        self.keep.iter().any(|kept| kept.key == entry.key)
    }

    pub fn is_empty(&self) -> bool {
        self.delete.is_empty()
    }
}

/// Keeps the highest version (ties broken by canonical name) and every entry
/// matching the active record; the rest of `environment` is deleted.
pub fn plan_retention(
    environment: Environment,
    entries: &[BackupEntry],
    active: Option<&VersionRecord>,
) -> RetentionPlan {
    let mut candidates = entries
        .iter()
        .filter(|entry| entry.key.environment() == environment)
        .cloned()
        .collect::<Vec<_>>();
    candidates.sort_by(|left, right| left.name().cmp(&right.name()));

    if candidates.len() <= 1 {
        return RetentionPlan {
            environment,
            keep: candidates,
            delete: Vec::new(),
        };
    }

    let latest = candidates
        .iter()
        .max_by(|left, right| {
            left.key
                .tag
                .version()
                .cmp(right.key.tag.version())
                .then_with(|| left.name().cmp(&right.name()))
        })
        .map(|entry| entry.key.clone());

    let (keep, delete): (Vec<_>, Vec<_>) = candidates.into_iter().partition(|entry| {
        latest.as_ref() == Some(&entry.key)
            || active.is_some_and(|record| record.matches(&entry.key))
    });

    RetentionPlan {
        environment,
        keep,
        delete,
    }
}

/// Backup entries under the store's backup root.
#[derive(Debug, Clone, Copy)]
pub struct BackupStore<'a> {
    store: &'a InstallationStore,
}

impl<'a> BackupStore<'a> {
    pub fn new(store: &'a InstallationStore) -> Self {
        Self { store }
    }

    pub fn list(&self) -> Result<BackupListing> {
        let dir = self.store.backup_dir();
        let mut listing = BackupListing::default();
        if !dir.exists() {
            return Ok(listing);
        }

        for entry in fs::read_dir(dir)
            .with_context(|| format!("failed to read backup directory: {}", dir.display()))?
        {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            match ArtifactKey::decode(&name) {
                Ok(key) => listing.entries.push(BackupEntry {
                    key,
                    path: entry.path(),
                }),
                Err(_) => {
                    debug!(%name, "backup directory name is not an artifact key");
                    listing.unrecognized.push(name);
                }
            }
        }

        listing.entries.sort_by(|left, right| left.key.cmp(&right.key));
        listing.unrecognized.sort();
        Ok(listing)
    }

    pub fn get(&self, key: &ArtifactKey) -> Result<Option<BackupEntry>> {
        let path = self.store.backup_path(key);
        if !path.is_dir() {
            return Ok(None);
        }
        Ok(Some(BackupEntry {
            key: key.clone(),
            path,
        }))
    }

    /// Stores a copy of `payload_dir` under `key`, replacing any previous
    /// entry. The final path never holds a partial copy.
    pub fn put(&self, key: &ArtifactKey, payload_dir: &Path) -> Result<BackupEntry> {
        let path = self.store.backup_path(key);
        self.write_entry(key, payload_dir, &path)
            .with_context(|| SuivmError::BackupWriteFailed {
                key: key.clone(),
                path: path.clone(),
            })?;
        info!(%key, path = %path.display(), "backup written");
        Ok(BackupEntry {
            key: key.clone(),
            path,
        })
    }

    fn write_entry(&self, key: &ArtifactKey, payload_dir: &Path, path: &Path) -> Result<()> {
        let root = self.store.backup_dir();
        fs::create_dir_all(root)
            .with_context(|| format!("failed to create backup directory: {}", root.display()))?;

        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(root)
            .with_context(|| format!("failed to create staging dir in {}", root.display()))?;
        let staged = staging.path().join(key.encode());
        copy_dir_normalized(payload_dir, &staged)?;

        let replaced = staging.path().join("replaced");
        let had_previous = path.exists();
        if had_previous {
            fs::rename(path, &replaced)
                .with_context(|| format!("failed to move aside {}", path.display()))?;
        }

        if let Err(err) = fs::rename(&staged, path) {
            if had_previous {
                let _ = fs::rename(&replaced, path);
            }
            return Err(err).with_context(|| format!("failed to promote {}", path.display()));
        }
        Ok(())
    }

    pub fn retention_plan(
        &self,
        environment: Environment,
        active: Option<&VersionRecord>,
    ) -> Result<RetentionPlan> {
        let listing = self.list()?;
        Ok(plan_retention(environment, &listing.entries, active))
    }

    /// One plan per environment that has at least one entry.
    pub fn retention_plans(&self, active: Option<&VersionRecord>) -> Result<Vec<RetentionPlan>> {
        let listing = self.list()?;
        Ok(listing
            .by_environment()
            .into_keys()
            .map(|environment| plan_retention(environment, &listing.entries, active))
            .collect())
    }

    /// Deletes the plan's `delete` entries and returns the ones removed.
    pub fn apply(&self, plan: &RetentionPlan) -> Result<Vec<BackupEntry>> {
        let mut removed = Vec::new();
        for entry in &plan.delete {
            if plan.keeps(entry) {
                warn!(key = %entry.key, "refusing to delete a kept backup");
                continue;
            }
            if entry.path != self.store.backup_path(&entry.key) {
                return Err(anyhow!(
                    "backup path {} is outside the backup directory {}",
                    entry.path.display(),
                    self.store.backup_dir().display()
                ));
            }
            if !entry.path.exists() {
                continue;
            }
            fs::remove_dir_all(&entry.path)
                .with_context(|| format!("failed to remove backup {}", entry.path.display()))?;
            info!(key = %entry.key, "backup removed");
            removed.push(entry.clone());
        }
        Ok(removed)
    }
}
