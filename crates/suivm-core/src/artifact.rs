use std::fmt;
use std::str::FromStr;

use crate::{Arch, Environment, Platform, ReleaseTag, SuivmError};

/// Leading token of every archive and backup directory name.
pub const ARTIFACT_PREFIX: &str = "sui-";

const ARCHIVE_EXTENSION: &str = ".tgz";

/// Identity of one downloadable build: `(tag, platform, arch)`.
///
/// The canonical string `sui-<tag>-<platform>-<arch>` names both the release
/// archive (with `.tgz`) and the backup directory holding its payload.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArtifactKey {
    pub tag: ReleaseTag,
    pub platform: Platform,
    pub arch: Arch,
}

impl ArtifactKey {
    pub fn new(tag: ReleaseTag, platform: Platform, arch: Arch) -> Self {
        Self {
            tag,
            platform,
            arch,
        }
    }

    pub fn environment(&self) -> Environment {
        self.tag.environment()
    }

    pub fn encode(&self) -> String {
        format!(
            "{ARTIFACT_PREFIX}{}-{}-{}",
            self.tag, self.platform, self.arch
        )
    }

    pub fn archive_file_name(&self) -> String {
        format!("{}{ARCHIVE_EXTENSION}", self.encode())
    }

    /// Inverse of [`ArtifactKey::encode`]; accepts canonical tokens only so that
    /// `decode(name)?.encode() == name` always holds.
    pub fn decode(name: &str) -> Result<Self, SuivmError> {
        let malformed = || SuivmError::MalformedArtifactKey {
            name: name.to_string(),
        };

        let rest = name.strip_prefix(ARTIFACT_PREFIX).ok_or_else(malformed)?;
        let mut parts = rest.rsplitn(3, '-');
        let arch = parts.next().ok_or_else(malformed)?;
        let platform = parts.next().ok_or_else(malformed)?;
        let tag = parts.next().ok_or_else(malformed)?;

        let arch = Arch::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == arch)
            .ok_or_else(malformed)?;
        let platform = Platform::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == platform)
            .ok_or_else(malformed)?;
        let tag = ReleaseTag::parse(tag).map_err(|_| malformed())?;

        Ok(Self {
            tag,
            platform,
            arch,
        })
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for ArtifactKey {
    type Err = SuivmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}
