//! Find command implementation.

use crate::utils::{describe_offset, open_input, parse_hex};
use bitweave_core::{BitBuffer, BitStream};
use std::path::PathBuf;

/// Print the first byte-aligned occurrence of a pattern in `file`.
pub fn cmd_find(
    file: &PathBuf,
    hex: Option<&str>,
    text: Option<&str>,
    from_bits: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let pattern = match (hex, text) {
        (Some(hex), _) => parse_hex(hex)?,
        (None, Some(text)) => text.as_bytes().to_vec(),
        (None, None) => return Err("either --hex or --text is required".into()),
    };

    let mut input = open_input(file)?;
    let mut needle = BitBuffer::from_bytes(pattern);

    match input.index_of(&mut needle, from_bits)? {
        Some(offset) => println!("Found at {}", describe_offset(offset)),
        None => println!("Not found"),
    }
    Ok(())
}
