use suivm_core::{Arch, ArtifactKey, Environment, Platform, ReleaseTag, SuivmError};

pub const DEFAULT_RELEASE_HOST: &str = "https://github.com";

/// Maps artifact identities to release archive names and download URLs.
///
/// Pure: no network access and no existence check, the download step finds
/// out whether the archive is really there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLocator {
    pub release_host: String,
    pub owner: String,
    pub repo: String,
}

impl Default for ArtifactLocator {
    fn default() -> Self {
        Self {
            release_host: DEFAULT_RELEASE_HOST.to_string(),
            owner: "MystenLabs".to_string(),
            repo: "sui".to_string(),
        }
    }
}

impl ArtifactLocator {
    pub fn artifact_file_name(&self, tag: &ReleaseTag, platform: Platform, arch: Arch) -> String {
        ArtifactKey::new(tag.clone(), platform, arch).archive_file_name()
    }

    pub fn download_url(&self, tag: &ReleaseTag, platform: Platform, arch: Arch) -> String {
        format!(
            "{}/{}/{}/releases/download/{}/{}",
            self.release_host.trim_end_matches('/'),
            self.owner,
            self.repo,
            tag,
            self.artifact_file_name(tag, platform, arch)
        )
    }

    pub fn key_download_url(&self, key: &ArtifactKey) -> String {
        self.download_url(&key.tag, key.platform, key.arch)
    }
}

/// Turns a user-supplied version into a tag of `environment`.
///
/// `testnet-v1.40.1` is used verbatim, `v1.40.1` and `1.40.1` get the
/// environment prefix. A version prefixed with another environment is
/// rejected rather than silently reinterpreted.
pub fn explicit_tag(environment: Environment, requested: &str) -> Result<ReleaseTag, SuivmError> {
    let requested = requested.trim();
    if requested.starts_with(&environment.tag_prefix()) {
        return ReleaseTag::parse_for(environment, requested);
    }
    if Environment::ALL
        .iter()
        .any(|other| requested.starts_with(&other.tag_prefix()))
    {
        return Err(SuivmError::InvalidReleaseTag {
            tag: requested.to_string(),
        });
    }

    let bare = requested.strip_prefix('v').unwrap_or(requested);
    ReleaseTag::parse_for(environment, &format!("{}v{bare}", environment.tag_prefix())).map_err(
        |_| SuivmError::InvalidReleaseTag {
            tag: requested.to_string(),
        },
    )
}
