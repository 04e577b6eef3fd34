use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use semver::Version;

use crate::{Environment, SuivmError};

/// Canonical release identifier, `<environment>-v<major>.<minor>.<patch>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseTag {
    environment: Environment,
    version: Version,
}

impl ReleaseTag {
    pub fn new(environment: Environment, version: Version) -> Self {
        Self {
            environment,
            version,
        }
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn parse(input: &str) -> Result<Self, SuivmError> {
        let invalid = || SuivmError::InvalidReleaseTag {
            tag: input.to_string(),
        };

        let (environment, rest) = input.split_once('-').ok_or_else(invalid)?;
        // Exact lowercase match; "Testnet-v1.0.0" is not a release tag.
        let environment = Environment::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == environment)
            .ok_or_else(invalid)?;
        let raw_version = rest.strip_prefix('v').ok_or_else(invalid)?;
        let version = Version::parse(raw_version).map_err(|_| invalid())?;
        if !version.pre.is_empty() || !version.build.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            environment,
            version,
        })
    }

    /// Parses `input` and requires its embedded environment to be `environment`.
    pub fn parse_for(environment: Environment, input: &str) -> Result<Self, SuivmError> {
        let tag = Self::parse(input)?;
        if tag.environment != environment {
            return Err(SuivmError::InvalidReleaseTag {
                tag: input.to_string(),
            });
        }
        Ok(tag)
    }
}

impl fmt::Display for ReleaseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-v{}", self.environment, self.version)
    }
}

impl FromStr for ReleaseTag {
    type Err = SuivmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Ord for ReleaseTag {
    fn cmp(&self, other: &Self) -> Ordering {
        self.version
            .cmp(&other.version)
            .then_with(|| self.environment.cmp(&other.environment))
    }
}

impl PartialOrd for ReleaseTag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
