mod artifact;
mod environment;
mod error;
mod tag;

pub use artifact::{ArtifactKey, ARTIFACT_PREFIX};
pub use environment::{Arch, Environment, Platform};
pub use error::SuivmError;
pub use tag::ReleaseTag;

#[cfg(test)]
mod tests;
