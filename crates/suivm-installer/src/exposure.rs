use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::InstallationStore;

/// Points the activation link at `target`, replacing whatever link was there.
pub fn activate_link(store: &InstallationStore, target: &Path) -> Result<PathBuf> {
    let link_path = store.link_path().to_path_buf();
    if let Some(parent) = link_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create link directory: {}", parent.display()))?;
    }

    if fs::symlink_metadata(&link_path).is_ok() {
        fs::remove_file(&link_path).with_context(|| {
            format!("failed to replace activation link: {}", link_path.display())
        })?;
    }

    create_link_entry(target, &link_path)?;
    debug!(link = %link_path.display(), target = %target.display(), "activation link updated");
    Ok(link_path)
}

/// Removes the activation link. A regular file at the link path is left
/// alone on unix since suivm never creates one there.
pub fn remove_activation_link(store: &InstallationStore) -> Result<bool> {
    let link_path = store.link_path();
    let Ok(metadata) = fs::symlink_metadata(link_path) else {
        return Ok(false);
    };

    if cfg!(unix) && !metadata.file_type().is_symlink() {
        warn!(path = %link_path.display(), "activation path is not a symlink; leaving it in place");
        return Ok(false);
    }

    fs::remove_file(link_path)
        .with_context(|| format!("failed to remove activation link: {}", link_path.display()))?;
    Ok(true)
}

/// Where the activation link currently points, if it exists.
pub fn link_target(store: &InstallationStore) -> Option<PathBuf> {
    let link_path = store.link_path();
    #[cfg(unix)]
    {
        fs::read_link(link_path).ok()
    }

    #[cfg(windows)]
    {
        let shim = fs::read_to_string(link_path).ok()?;
        shim.lines()
            .find_map(|line| line.split('"').nth(1))
            .map(PathBuf::from)
    }
}

fn create_link_entry(source_path: &Path, destination: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(source_path, destination).with_context(|| {
            format!(
                "failed to create symlink {} -> {}",
                destination.display(),
                source_path.display()
            )
        })
    }

    #[cfg(windows)]
    {
        let shim = format!("@echo off\r\n\"{}\" %*\r\n", source_path.display());
        fs::write(destination, shim.as_bytes())
            .with_context(|| format!("failed to write shim: {}", destination.display()))
    }
}
