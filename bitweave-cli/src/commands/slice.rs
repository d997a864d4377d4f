//! Slice command implementation.

use crate::utils::{emit, open_input};
use bitweave_core::BitStream;
use std::path::{Path, PathBuf};

/// Cut `length_bits` bits at `offset_bits` out of `file`.
pub fn cmd_slice(
    file: &PathBuf,
    offset_bits: u64,
    length_bits: u64,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut input = open_input(file)?;
    input.set_position_bits(offset_bits)?;
    let slice = input.slice_bits(length_bits)?;

    let written = emit(slice, output)?;
    if let Some(path) = output {
        println!(
            "Wrote {} bits ({} bytes padded) to {}",
            length_bits,
            written,
            path.display()
        );
    }
    Ok(())
}
