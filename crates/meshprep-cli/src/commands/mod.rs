//! Subcommand implementations.

pub mod export;
pub mod generate;
pub mod info;
pub mod repair;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use meshprep::Mesh;

/// Load an STL file, attaching the path to any error.
pub(crate) fn load(input: &Path) -> Result<Mesh> {
    Mesh::load(input).with_context(|| format!("Failed to load mesh from {:?}", input))
}
