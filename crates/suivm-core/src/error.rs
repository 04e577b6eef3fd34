use std::path::PathBuf;

use thiserror::Error;

use crate::{ArtifactKey, Environment, ReleaseTag};

/// Lifecycle failures surfaced to the operator.
///
/// Library code raises these through `anyhow`, either as the root error or as
/// context on top of the underlying I/O or transport cause, so callers recover
/// the kind with `err.downcast_ref::<SuivmError>()` without losing the chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SuivmError {
    #[error("no {environment} releases found in the release listing")]
    NoReleasesFound { environment: Environment },

    #[error("failed to download {tag} from {url}")]
    DownloadFailed { tag: ReleaseTag, url: String },

    #[error("failed to extract {tag} archive {}", path.display())]
    ExtractFailed { tag: ReleaseTag, path: PathBuf },

    #[error("archive for {tag} does not contain the primary 'sui' executable")]
    MissingPrimaryExecutable { tag: ReleaseTag },

    #[error(
        "backup {key} was written to {} but activating it failed",
        backup_path.display()
    )]
    ActivationFailedAfterBackup {
        key: ArtifactKey,
        backup_path: PathBuf,
    },

    #[error("activating {key} did not leave an active 'sui' executable and link")]
    SwitchVerificationFailed { key: ArtifactKey },

    #[error("'{name}' does not name an existing backup or a recoverable environment and version")]
    UnresolvableBackupReference { name: String },

    #[error("failed to write backup {key} to {}", path.display())]
    BackupWriteFailed { key: ArtifactKey, path: PathBuf },

    #[error("invalid release tag '{tag}': expected <environment>-v<major>.<minor>.<patch>")]
    InvalidReleaseTag { tag: String },

    #[error("malformed backup name '{name}': expected sui-<environment>-v<version>-<platform>-<arch>")]
    MalformedArtifactKey { name: String },

    #[error("unknown environment '{value}'; supported: mainnet, testnet, devnet")]
    UnknownEnvironment { value: String },

    #[error("unknown platform '{value}'; supported: ubuntu, macos, windows")]
    UnknownPlatform { value: String },

    #[error("unknown architecture '{value}'; supported: x86_64, aarch64, arm64")]
    UnknownArch { value: String },
}

