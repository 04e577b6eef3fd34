//! Release listing sources.
//!
//! A source yields raw release tag names in upstream order (newest first);
//! filtering by environment and tag validation happen in the resolver.

mod github;
mod listing;
mod source_types;

pub use github::GithubReleases;
pub use listing::{parse_release_tags, scan_tag_names};
pub use source_types::{ReleaseSourceConfig, DEFAULT_RELEASES_API_URL, DEFAULT_USER_AGENT};

use anyhow::Result;

/// Anything that can produce the release listing.
pub trait ReleaseSource {
    /// Tag names in the order the upstream listing returns them.
    fn release_tags(&self) -> Result<Vec<String>>;
}

impl<T: ReleaseSource + ?Sized> ReleaseSource for &T {
    fn release_tags(&self) -> Result<Vec<String>> {
        (**self).release_tags()
    }
}
