mod locator;
mod resolve;

pub use locator::{explicit_tag, ArtifactLocator, DEFAULT_RELEASE_HOST};
pub use resolve::ReleaseResolver;
