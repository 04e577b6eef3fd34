use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tar::Archive;

use crate::layout::primary_executable_name;

const PRIMARY_STEM: &str = "sui";
const COMPANION_PREFIXES: [&str; 2] = ["sui-", "move"];

/// Unpacks a gzip-compressed tarball into `dst`.
pub(crate) fn extract_tgz(archive_path: &Path, dst: &Path) -> Result<()> {
    let file = File::open(archive_path)
        .with_context(|| format!("failed to open archive {}", archive_path.display()))?;
    let mut archive = Archive::new(GzDecoder::new(file));
    archive.set_preserve_permissions(true);
    archive
        .unpack(dst)
        .with_context(|| format!("failed to unpack {}", archive_path.display()))
}

/// Directory holding the host's primary executable (`sui`, or `sui.exe` on
/// Windows): the extraction root, or one directory below it.
pub(crate) fn locate_payload_root(extracted: &Path) -> Result<Option<PathBuf>> {
    if contains_primary(extracted)? {
        return Ok(Some(extracted.to_path_buf()));
    }

    let mut children = fs::read_dir(extracted)
        .with_context(|| format!("failed to read {}", extracted.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    children.sort_by_key(|entry| entry.file_name());
    for child in children {
        if child.file_type()?.is_dir() && contains_primary(&child.path())? {
            return Ok(Some(child.path()));
        }
    }
    Ok(None)
}

fn contains_primary(dir: &Path) -> Result<bool> {
    for entry in fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            continue;
        }
        if entry.file_name().to_str().is_some_and(is_primary_executable) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Whether `name` is the primary executable the activation link points at on
/// this host. A Windows `sui.exe` is not one on unix, and the reverse.
pub fn is_primary_executable(name: &str) -> bool {
    name == primary_executable_name()
}

/// `sui`, `sui-*` and `move*`, with an optional `.exe` suffix.
pub fn is_managed_executable(name: &str) -> bool {
    let stem = strip_exe(name);
    stem == PRIMARY_STEM
        || COMPANION_PREFIXES
            .iter()
            .any(|prefix| stem.starts_with(prefix))
}

/// Names of the managed executables directly inside `dir`, sorted.
pub(crate) fn managed_executables(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(ToString::to_string) else {
            continue;
        };
        if is_managed_executable(&name) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

fn strip_exe(name: &str) -> &str {
    name.strip_suffix(".exe").unwrap_or(name)
}
