//! Grow command implementation.

use crate::utils::{emit, open_input};
use bitweave_core::grow_to;
use std::path::{Path, PathBuf};

/// Replicate the contents of `file` until it is exactly `bytes` long.
pub fn cmd_grow(
    file: &PathBuf,
    bytes: u64,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut input = open_input(file)?;
    let grown = grow_to(input.as_mut(), bytes)?;

    let written = emit(grown, output)?;
    if let Some(path) = output {
        println!("Wrote {} bytes to {}", written, path.display());
    }
    Ok(())
}
