use std::path::PathBuf;
use suivm_core::{Arch, ArtifactKey, Environment, Platform};

use crate::{BackupEntry, VersionRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    pub environment: Environment,
    /// Explicit version or tag; latest when absent.
    pub version: Option<String>,
    pub platform: Platform,
    pub arch: Arch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    pub key: ArtifactKey,
    pub file_name: String,
    pub url: String,
    pub current: Option<VersionRecord>,
    pub replaces_backup: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub key: ArtifactKey,
    pub url: String,
    pub downloaded_bytes: u64,
    pub sha256: String,
    pub backup_path: PathBuf,
    pub install_dir: PathBuf,
    pub link_path: PathBuf,
    pub executables: Vec<String>,
    pub previous: Option<VersionRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchPlan {
    Restore(BackupEntry),
    Reinstall(InstallRequest),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    Restored {
        key: ArtifactKey,
        executables: Vec<String>,
        link_path: PathBuf,
        previous: Option<VersionRecord>,
    },
    Reinstalled(InstallOutcome),
}

impl SwitchOutcome {
    pub fn key(&self) -> &ArtifactKey {
        match self {
            Self::Restored { key, .. } => key,
            Self::Reinstalled(outcome) => &outcome.key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UninstallOutcome {
    pub install_dir: PathBuf,
    pub removed_install_dir: bool,
    pub link_path: PathBuf,
    pub removed_link: bool,
    pub previous: Option<VersionRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationStatus {
    pub record: Option<VersionRecord>,
    pub install_dir: PathBuf,
    pub primary_present: bool,
    pub link_path: PathBuf,
    pub link_target: Option<PathBuf>,
}
