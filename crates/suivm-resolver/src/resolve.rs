use anyhow::Result;
use suivm_core::{Environment, ReleaseTag, SuivmError};
use suivm_registry::ReleaseSource;
use tracing::{debug, info};

use crate::locator::explicit_tag;

/// Resolves environments and user-supplied versions to concrete release tags.
#[derive(Debug, Clone)]
pub struct ReleaseResolver<S> {
    source: S,
}

impl<S: ReleaseSource> ReleaseResolver<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Tags of `environment`, newest first as the listing reports them.
    ///
    /// Entries carrying the environment prefix but not the exact tag shape
    /// (release candidates, typos) are skipped.
    pub fn list_versions(&self, environment: Environment) -> Result<Vec<ReleaseTag>> {
        let prefix = environment.tag_prefix();
        let tags = self
            .source
            .release_tags()?
            .into_iter()
            .filter(|raw| raw.starts_with(&prefix))
            .filter_map(|raw| match ReleaseTag::parse_for(environment, &raw) {
                Ok(tag) => Some(tag),
                Err(_) => {
                    debug!(tag = %raw, "skipping release tag that is not <env>-v<semver>");
                    None
                }
            })
            .collect::<Vec<_>>();

        if tags.is_empty() {
            return Err(SuivmError::NoReleasesFound { environment }.into());
        }
        Ok(tags)
    }

    pub fn latest_version(&self, environment: Environment) -> Result<ReleaseTag> {
        let mut tags = self.list_versions(environment)?;
        // list_versions never returns an empty list
        let latest = tags.swap_remove(0);
        info!(%latest, "resolved latest release");
        Ok(latest)
    }

    /// Explicit version when given, latest release of `environment` otherwise.
    pub fn resolve_tag(
        &self,
        environment: Environment,
        requested: Option<&str>,
    ) -> Result<ReleaseTag> {
        match requested.map(str::trim).filter(|value| !value.is_empty()) {
            Some(requested) => Ok(explicit_tag(environment, requested)?),
            None => self.latest_version(environment),
        }
    }
}
