use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use suivm_installer::{default_user_prefix, InstallationStore};
use suivm_registry::ReleaseSourceConfig;
use suivm_resolver::ArtifactLocator;

pub(crate) const HOME_ENV: &str = "SUIVM_HOME";
pub(crate) const CONFIG_ENV: &str = "SUIVM_CONFIG";
const CONFIG_FILE: &str = "config.toml";

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SuivmConfig {
    pub paths: PathsConfig,
    pub release: ReleaseConfig,
}

/// Relative paths are resolved against the prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct PathsConfig {
    pub install_dir: Option<PathBuf>,
    pub backup_dir: Option<PathBuf>,
    pub tmp_dir: Option<PathBuf>,
    pub link_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ReleaseConfig {
    pub api_url: Option<String>,
    pub release_host: Option<String>,
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub max_pages: Option<u32>,
    pub user_agent: Option<String>,
}

impl SuivmConfig {
    pub(crate) fn parse(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("invalid suivm configuration")
    }

    pub(crate) fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Loads `path` when given, otherwise `<prefix>/config.toml` if present.
    pub(crate) fn discover(path: Option<&Path>, prefix: &Path) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        let default_path = prefix.join(CONFIG_FILE);
        if default_path.is_file() {
            return Self::load(&default_path);
        }
        Ok(Self::default())
    }

    /// Store rooted at `prefix`; `default_link` applies unless the config
    /// names a link path.
    pub(crate) fn store(&self, prefix: &Path, default_link: Option<PathBuf>) -> InstallationStore {
        let resolve = |path: &Path| -> PathBuf {
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                prefix.join(path)
            }
        };

        let mut store = InstallationStore::new(prefix);
        if let Some(link) = default_link {
            store = store.with_link_path(link);
        }
        if let Some(dir) = &self.paths.install_dir {
            store = store.with_install_dir(resolve(dir));
        }
        if let Some(dir) = &self.paths.backup_dir {
            store = store.with_backup_dir(resolve(dir));
        }
        if let Some(dir) = &self.paths.tmp_dir {
            store = store.with_tmp_dir(resolve(dir));
        }
        if let Some(link) = &self.paths.link_path {
            store = store.with_link_path(resolve(link));
        }
        store
    }

    pub(crate) fn source_config(&self) -> ReleaseSourceConfig {
        let defaults = ReleaseSourceConfig::default();
        ReleaseSourceConfig {
            api_url: self.release.api_url.clone().unwrap_or(defaults.api_url),
            max_pages: self.release.max_pages.unwrap_or(defaults.max_pages),
            user_agent: self.release.user_agent.clone().unwrap_or(defaults.user_agent),
        }
    }

    pub(crate) fn locator(&self) -> ArtifactLocator {
        let defaults = ArtifactLocator::default();
        ArtifactLocator {
            release_host: self
                .release
                .release_host
                .clone()
                .unwrap_or(defaults.release_host),
            owner: self.release.owner.clone().unwrap_or(defaults.owner),
            repo: self.release.repo.clone().unwrap_or(defaults.repo),
        }
    }
}

/// `--prefix`, then `$SUIVM_HOME`, then the per-user default.
pub(crate) fn resolve_prefix(flag: Option<&Path>, home_env: Option<&str>) -> Result<PathBuf> {
    if let Some(prefix) = flag {
        return Ok(prefix.to_path_buf());
    }
    match home_env.map(str::trim).filter(|value| !value.is_empty()) {
        Some(home) => Ok(PathBuf::from(home)),
        None => default_user_prefix(),
    }
}

/// `--config`, then `$SUIVM_CONFIG`.
pub(crate) fn resolve_config_path(flag: Option<&Path>, config_env: Option<&str>) -> Option<PathBuf> {
    flag.map(Path::to_path_buf).or_else(|| {
        config_env
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    })
}
