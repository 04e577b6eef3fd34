use anyhow::{anyhow, Context, Result};
use semver::Version;
use std::fs;
use std::path::PathBuf;
use suivm_core::{ArtifactKey, Environment, ReleaseTag};

use crate::fs_utils::remove_file_if_exists;
use crate::InstallationStore;

/// Environment and version of the active installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRecord {
    pub environment: Environment,
    pub version: Version,
}

impl VersionRecord {
    pub fn new(environment: Environment, version: Version) -> Self {
        Self {
            environment,
            version,
        }
    }

    pub fn from_key(key: &ArtifactKey) -> Self {
        Self::new(key.environment(), key.tag.version().clone())
    }

    pub fn tag(&self) -> ReleaseTag {
        ReleaseTag::new(self.environment, self.version.clone())
    }

    pub fn matches(&self, key: &ArtifactKey) -> bool {
        key.environment() == self.environment && key.tag.version() == &self.version
    }
}

pub fn save_version_record(store: &InstallationStore, record: &VersionRecord) -> Result<PathBuf> {
    let mut payload = String::new();
    payload.push_str(&format!("environment={}\n", record.environment));
    payload.push_str(&format!("version={}\n", record.version));

    let path = store.version_record_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let staged = path.with_extension("tmp");
    fs::write(&staged, payload.as_bytes())
        .with_context(|| format!("failed to write version record: {}", staged.display()))?;
    fs::rename(&staged, &path)
        .with_context(|| format!("failed to write version record: {}", path.display()))?;
    Ok(path)
}

pub fn load_version_record(store: &InstallationStore) -> Result<Option<VersionRecord>> {
    let path = store.version_record_path();
    if !path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read version record: {}", path.display()))?;
    let record = parse_version_record(&raw)
        .with_context(|| format!("failed to parse version record: {}", path.display()))?;
    Ok(Some(record))
}

pub fn clear_version_record(store: &InstallationStore) -> Result<bool> {
    let path = store.version_record_path();
    let existed = path.exists();
    remove_file_if_exists(&path)
        .with_context(|| format!("failed to remove version record: {}", path.display()))?;
    Ok(existed)
}

pub(crate) fn parse_version_record(raw: &str) -> Result<VersionRecord> {
    let mut environment = None;
    let mut version = None;

    for line in raw.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        match key.trim() {
            "environment" => {
                environment = Some(
                    value
                        .trim()
                        .parse::<Environment>()
                        .with_context(|| format!("invalid environment: {value}"))?,
                )
            }
            "version" => {
                let value = value.trim();
                let bare = value.strip_prefix('v').unwrap_or(value);
                version = Some(
                    Version::parse(bare).with_context(|| format!("invalid version: {value}"))?,
                )
            }
            _ => {}
        }
    }

    Ok(VersionRecord {
        environment: environment.ok_or_else(|| anyhow!("missing environment"))?,
        version: version.ok_or_else(|| anyhow!("missing version"))?,
    })
}
