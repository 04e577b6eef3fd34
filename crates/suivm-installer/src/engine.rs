use anyhow::{anyhow, Context, Result};
use semver::Version;
use std::fs;
use std::path::{Path, PathBuf};
use suivm_core::{
    Arch, ArtifactKey, Environment, Platform, ReleaseTag, SuivmError, ARTIFACT_PREFIX,
};
use suivm_registry::ReleaseSource;
use suivm_resolver::{ArtifactLocator, ReleaseResolver};
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::archive::{extract_tgz, is_primary_executable, locate_payload_root, managed_executables};
use crate::download::{Downloader, ProgressFn};
use crate::exposure::{activate_link, link_target, remove_activation_link};
use crate::fs_utils::{copy_executable, remove_dir_if_exists};
use crate::{
    load_version_record, primary_executable_name, save_version_record, BackupEntry, BackupStore,
    InstallOutcome, InstallPlan, InstallRequest, InstallationStatus, InstallationStore,
    SwitchOutcome, SwitchPlan, UninstallOutcome, VersionRecord,
};

const INCOMING_PREFIX: &str = ".incoming-";

struct Activation {
    executables: Vec<String>,
    link_path: PathBuf,
}

/// Drives install, update, switch and uninstall against one store.
pub struct InstallEngine<'a, S, D: ?Sized> {
    store: &'a InstallationStore,
    resolver: &'a ReleaseResolver<S>,
    locator: &'a ArtifactLocator,
    downloader: &'a D,
}

impl<'a, S, D> InstallEngine<'a, S, D>
where
    S: ReleaseSource,
    D: Downloader + ?Sized,
{
    pub fn new(
        store: &'a InstallationStore,
        resolver: &'a ReleaseResolver<S>,
        locator: &'a ArtifactLocator,
        downloader: &'a D,
    ) -> Self {
        Self {
            store,
            resolver,
            locator,
            downloader,
        }
    }

    pub fn store(&self) -> &InstallationStore {
        self.store
    }

    pub fn backups(&self) -> BackupStore<'a> {
        BackupStore::new(self.store)
    }

    pub fn plan_install(&self, request: &InstallRequest) -> Result<InstallPlan> {
        let tag = self
            .resolver
            .resolve_tag(request.environment, request.version.as_deref())?;
        let key = ArtifactKey::new(tag, request.platform, request.arch);
        let plan = InstallPlan {
            file_name: key.archive_file_name(),
            url: self.locator.key_download_url(&key),
            current: self.current_record(),
            replaces_backup: self.backups().get(&key)?.is_some(),
            key,
        };
        debug!(key = %plan.key, url = %plan.url, "install planned");
        Ok(plan)
    }

    pub fn install(
        &self,
        request: &InstallRequest,
        progress: &mut ProgressFn<'_>,
    ) -> Result<InstallOutcome> {
        let plan = self.plan_install(request)?;
        self.apply_install(&plan, progress)
    }

    /// Download, extract, back up, then activate `plan.key`.
    ///
    /// Nothing under the install location changes before the backup is
    /// written, so a failure up to that point leaves the active version as is.
    pub fn apply_install(
        &self,
        plan: &InstallPlan,
        progress: &mut ProgressFn<'_>,
    ) -> Result<InstallOutcome> {
        let key = &plan.key;
        let tag = &key.tag;
        let tmp_root = self.store.tmp_dir();
        fs::create_dir_all(tmp_root)
            .with_context(|| format!("failed to create {}", tmp_root.display()))?;

        let download_dir = scratch_dir(tmp_root, "download-")?;
        let archive_path = download_dir.path().join(&plan.file_name);
        let download_failed = || SuivmError::DownloadFailed {
            tag: tag.clone(),
            url: plan.url.clone(),
        };
        info!(%key, url = %plan.url, "downloading");
        let report = self
            .downloader
            .download(&plan.url, &archive_path, progress)
            .with_context(download_failed)?;
        let on_disk = fs::metadata(&archive_path).map(|meta| meta.len()).unwrap_or(0);
        if report.bytes == 0 || on_disk == 0 {
            return Err(anyhow!("received an empty archive").context(download_failed()));
        }

        let extract_dir = scratch_dir(tmp_root, "extract-")?;
        extract_tgz(&archive_path, extract_dir.path()).with_context(|| {
            SuivmError::ExtractFailed {
                tag: tag.clone(),
                path: archive_path.clone(),
            }
        })?;
        let payload_root = locate_payload_root(extract_dir.path())
            .with_context(|| SuivmError::ExtractFailed {
                tag: tag.clone(),
                path: archive_path.clone(),
            })?
            .ok_or_else(|| SuivmError::MissingPrimaryExecutable { tag: tag.clone() })?;
        debug!(payload = %payload_root.display(), "archive extracted");

        let previous = self.current_record();
        let entry = self.backups().put(key, &payload_root)?;

        let activation = self
            .activate(key, &entry.path)
            .and_then(|activation| {
                self.verify_active(key)?;
                Ok(activation)
            })
            .with_context(|| SuivmError::ActivationFailedAfterBackup {
                key: key.clone(),
                backup_path: entry.path.clone(),
            })?;
        info!(%key, "installed");

        Ok(InstallOutcome {
            key: key.clone(),
            url: plan.url.clone(),
            downloaded_bytes: report.bytes,
            sha256: report.sha256,
            backup_path: entry.path,
            install_dir: self.store.install_dir().to_path_buf(),
            link_path: activation.link_path,
            executables: activation.executables,
            previous,
        })
    }

    /// Maps a backup name, tag or `<env>-<version>` fragment to a plan.
    ///
    /// Platform and arch missing from a fragment default to the given ones.
    pub fn plan_switch(&self, target: &str, platform: Platform, arch: Arch) -> Result<SwitchPlan> {
        let target = target.trim();
        let key = match ArtifactKey::decode(target) {
            Ok(key) => key,
            Err(_) => {
                let fragment = parse_switch_fragment(target).ok_or_else(|| {
                    SuivmError::UnresolvableBackupReference {
                        name: target.to_string(),
                    }
                })?;
                ArtifactKey::new(
                    fragment.tag,
                    fragment.platform.unwrap_or(platform),
                    fragment.arch.unwrap_or(arch),
                )
            }
        };

        if let Some(entry) = self.backups().get(&key)? {
            return Ok(SwitchPlan::Restore(entry));
        }
        Ok(SwitchPlan::Reinstall(InstallRequest {
            environment: key.environment(),
            version: Some(key.tag.to_string()),
            platform: key.platform,
            arch: key.arch,
        }))
    }

    pub fn apply_switch(
        &self,
        plan: &SwitchPlan,
        progress: &mut ProgressFn<'_>,
    ) -> Result<SwitchOutcome> {
        match plan {
            SwitchPlan::Restore(entry) => self.restore(entry),
            SwitchPlan::Reinstall(request) => {
                let install_plan = self.plan_install(request)?;
                Ok(SwitchOutcome::Reinstalled(
                    self.apply_install(&install_plan, progress)?,
                ))
            }
        }
    }

    /// Activates the stored backup for `key`; no download.
    pub fn switch_to(&self, key: &ArtifactKey) -> Result<SwitchOutcome> {
        let entry =
            self.backups()
                .get(key)?
                .ok_or_else(|| SuivmError::UnresolvableBackupReference {
                    name: key.encode(),
                })?;
        self.restore(&entry)
    }

    fn restore(&self, entry: &BackupEntry) -> Result<SwitchOutcome> {
        let previous = self.current_record();
        let activation = self
            .activate(&entry.key, &entry.path)
            .with_context(|| format!("failed to activate backup {}", entry.path.display()))?;
        self.verify_active(&entry.key)?;
        info!(key = %entry.key, "switched");

        Ok(SwitchOutcome::Restored {
            key: entry.key.clone(),
            executables: activation.executables,
            link_path: activation.link_path,
            previous,
        })
    }

    /// Removes the install location and the activation link; backups stay.
    pub fn uninstall(&self) -> Result<UninstallOutcome> {
        let previous = self.current_record();
        let install_dir = self.store.install_dir();
        let removed_install_dir = remove_dir_if_exists(install_dir)?;
        let removed_link = remove_activation_link(self.store)?;
        if !removed_install_dir {
            debug!(path = %install_dir.display(), "install location already absent");
        }

        Ok(UninstallOutcome {
            install_dir: install_dir.to_path_buf(),
            removed_install_dir,
            link_path: self.store.link_path().to_path_buf(),
            removed_link,
            previous,
        })
    }

    pub fn status(&self) -> Result<InstallationStatus> {
        Ok(InstallationStatus {
            record: load_version_record(self.store)?,
            install_dir: self.store.install_dir().to_path_buf(),
            primary_present: self.store.primary_executable_path().is_file(),
            link_path: self.store.link_path().to_path_buf(),
            link_target: link_target(self.store),
        })
    }

    fn current_record(&self) -> Option<VersionRecord> {
        match load_version_record(self.store) {
            Ok(record) => record,
            Err(err) => {
                warn!("ignoring unreadable version record: {err:#}");
                None
            }
        }
    }

    fn activate(&self, key: &ArtifactKey, payload_dir: &Path) -> Result<Activation> {
        let executables = promote_executables(self.store.install_dir(), payload_dir)?;
        let link_path = activate_link(self.store, &self.store.primary_executable_path())?;
        let record_path = save_version_record(self.store, &VersionRecord::from_key(key))?;
        debug!(record = %record_path.display(), "version record saved");
        Ok(Activation {
            executables,
            link_path,
        })
    }

    /// Whether `key` is the active installation: the record names its
    /// environment and version and the installed primary executable is the
    /// one stored in its backup.
    pub fn is_active(&self, key: &ArtifactKey) -> Result<bool> {
        if !self.current_record().is_some_and(|record| record.matches(key)) {
            return Ok(false);
        }
        let Some(entry) = self.backups().get(key)? else {
            return Ok(false);
        };
        let installed = self.store.primary_executable_path();
        if !installed.is_file() {
            return Ok(false);
        }
        let stored = entry.path.join(primary_executable_name());
        if !stored.is_file() {
            return Ok(false);
        }
        let installed = fs::read(&installed)
            .with_context(|| format!("failed to read {}", installed.display()))?;
        let stored =
            fs::read(&stored).with_context(|| format!("failed to read {}", stored.display()))?;
        Ok(installed == stored)
    }

    /// The primary executable is a file, the link points at it and the
    /// record names `key`.
    fn verify_active(&self, key: &ArtifactKey) -> Result<()> {
        let primary = self.store.primary_executable_path();
        let linked = link_target(self.store).is_some_and(|target| target == primary);
        let recorded = load_version_record(self.store)
            .ok()
            .flatten()
            .is_some_and(|record| record.matches(key));
        if primary.is_file() && linked && recorded {
            return Ok(());
        }
        Err(SuivmError::SwitchVerificationFailed { key: key.clone() }.into())
    }
}

/// Replaces the managed executables in `install_dir` with those in
/// `payload_dir`. New files are fully copied before any old one is removed.
fn promote_executables(install_dir: &Path, payload_dir: &Path) -> Result<Vec<String>> {
    let names = managed_executables(payload_dir)?;
    if !names.iter().any(|name| is_primary_executable(name)) {
        return Err(anyhow!(
            "no primary executable in {}",
            payload_dir.display()
        ));
    }

    fs::create_dir_all(install_dir)
        .with_context(|| format!("failed to create {}", install_dir.display()))?;
    let incoming = tempfile::Builder::new()
        .prefix(INCOMING_PREFIX)
        .tempdir_in(install_dir)
        .with_context(|| format!("failed to create staging dir in {}", install_dir.display()))?;
    for name in &names {
        copy_executable(&payload_dir.join(name), &incoming.path().join(name))?;
    }

    for stale in managed_executables(install_dir)? {
        let path = install_dir.join(&stale);
        fs::remove_file(&path)
            .with_context(|| format!("failed to remove {}", path.display()))?;
    }
    for name in &names {
        let destination = install_dir.join(name);
        fs::rename(incoming.path().join(name), &destination)
            .with_context(|| format!("failed to move {} into place", destination.display()))?;
    }
    Ok(names)
}

fn scratch_dir(root: &Path, prefix: &str) -> Result<TempDir> {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir_in(root)
        .with_context(|| format!("failed to create scratch dir in {}", root.display()))
}

/// Parts of a switch target that is not a full backup name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SwitchFragment {
    pub tag: ReleaseTag,
    pub platform: Option<Platform>,
    pub arch: Option<Arch>,
}

/// Reads `testnet-v1.40.1`, `testnet-1.40.1` or a partial artifact name such
/// as `sui-testnet-v1.40.1-macos`. Anything after the version must be a
/// platform and then an arch; other tokens (pre-release suffixes included)
/// make the fragment unreadable.
pub(crate) fn parse_switch_fragment(name: &str) -> Option<SwitchFragment> {
    let name = name.strip_suffix(".tgz").unwrap_or(name);
    let name = name.strip_prefix(ARTIFACT_PREFIX).unwrap_or(name);
    let (environment, rest) = Environment::ALL.into_iter().find_map(|environment| {
        let rest = name.strip_prefix(&environment.tag_prefix())?;
        Some((environment, rest))
    })?;
    let rest = rest.strip_prefix('v').unwrap_or(rest);

    let mut tokens = rest.split('-');
    let version = Version::parse(tokens.next()?).ok()?;
    let mut platform = None;
    let mut arch = None;
    for token in tokens {
        if platform.is_none() && arch.is_none() {
            if let Some(parsed) = Platform::parse(token) {
                platform = Some(parsed);
                continue;
            }
        }
        match Arch::parse(token) {
            Some(parsed) if arch.is_none() => arch = Some(parsed),
            _ => return None,
        }
    }

    Some(SwitchFragment {
        tag: ReleaseTag::new(environment, version),
        platform,
        arch,
    })
}
