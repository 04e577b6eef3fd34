use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use suivm_core::ArtifactKey;

const PRIMARY_STEM: &str = "sui";
const VERSION_RECORD_FILE: &str = "active-version";

/// Every path suivm reads or writes, resolved once per invocation.
///
/// The install location, the backup root and the scratch root are disjoint
/// trees; the activation link lives outside all three.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationStore {
    prefix: PathBuf,
    install_dir: PathBuf,
    backup_dir: PathBuf,
    tmp_dir: PathBuf,
    link_path: PathBuf,
}

impl InstallationStore {
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        let prefix = prefix.into();
        Self {
            install_dir: prefix.join("bin"),
            backup_dir: prefix.join("backups"),
            tmp_dir: prefix.join("tmp"),
            link_path: prefix.join("shims").join(link_file_name()),
            prefix,
        }
    }

    pub fn with_install_dir(mut self, install_dir: impl Into<PathBuf>) -> Self {
        self.install_dir = install_dir.into();
        self
    }

    pub fn with_backup_dir(mut self, backup_dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = backup_dir.into();
        self
    }

    pub fn with_tmp_dir(mut self, tmp_dir: impl Into<PathBuf>) -> Self {
        self.tmp_dir = tmp_dir.into();
        self
    }

    pub fn with_link_path(mut self, link_path: impl Into<PathBuf>) -> Self {
        self.link_path = link_path.into();
        self
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn tmp_dir(&self) -> &Path {
        &self.tmp_dir
    }

    pub fn link_path(&self) -> &Path {
        &self.link_path
    }

    pub fn backup_path(&self, key: &ArtifactKey) -> PathBuf {
        self.backup_dir.join(key.encode())
    }

    pub fn version_record_path(&self) -> PathBuf {
        self.install_dir.join(VERSION_RECORD_FILE)
    }

    /// Location of the primary executable inside the install location.
    pub fn primary_executable_path(&self) -> PathBuf {
        self.install_dir.join(primary_executable_name())
    }

    pub fn ensure_base_dirs(&self) -> Result<()> {
        let link_parent = self.link_path.parent().map(Path::to_path_buf);
        for dir in [
            Some(self.install_dir.clone()),
            Some(self.backup_dir.clone()),
            Some(self.tmp_dir.clone()),
            link_parent,
        ]
        .into_iter()
        .flatten()
        {
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}

pub fn primary_executable_name() -> String {
    if cfg!(windows) {
        format!("{PRIMARY_STEM}.exe")
    } else {
        PRIMARY_STEM.to_string()
    }
}

fn link_file_name() -> String {
    if cfg!(windows) {
        format!("{PRIMARY_STEM}.cmd")
    } else {
        PRIMARY_STEM.to_string()
    }
}

pub fn default_user_prefix() -> Result<PathBuf> {
    if cfg!(windows) {
        let app_data = std::env::var("LOCALAPPDATA")
            .context("LOCALAPPDATA is not set; cannot resolve Windows user prefix")?;
        return Ok(PathBuf::from(app_data).join("suivm"));
    }

    let home = std::env::var("HOME").context("HOME is not set; cannot resolve user prefix")?;
    Ok(PathBuf::from(home).join(".suivm"))
}

/// `~/.local/bin/sui`, or a `.cmd` shim under the user prefix on Windows.
pub fn default_link_path() -> Result<PathBuf> {
    if cfg!(windows) {
        return Ok(default_user_prefix()?.join("shims").join(link_file_name()));
    }

    let home = std::env::var("HOME").context("HOME is not set; cannot resolve link path")?;
    Ok(PathBuf::from(home)
        .join(".local")
        .join("bin")
        .join(link_file_name()))
}
