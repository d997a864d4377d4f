//! Locate command implementation.

use crate::layout::Layout;
use crate::utils::describe_offset;
use bitweave_core::{BitStream, BitStreamError, BitStreamList};
use std::path::{Path, PathBuf};

/// What to look up in a composed tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocateQuery {
    /// Field covering a byte offset.
    Byte(u64),
    /// Field covering a bit offset.
    Bit(u64),
    /// Offset of a named field.
    Name(String),
}

/// Offset of the element named `name`; the root itself sits at offset 0.
fn position_of(tree: &BitStreamList, name: &str) -> Result<Option<u64>, BitStreamError> {
    if tree.name() == Some(name) {
        return Ok(Some(0));
    }
    tree.try_get_position(name)
}

/// Resolve `query` against the tree built from `layout_path` and print the
/// field for an offset, or the offset for a field name.
pub fn cmd_locate(
    layout_path: &PathBuf,
    query: &LocateQuery,
) -> Result<(), Box<dyn std::error::Error>> {
    let layout = Layout::load(layout_path)?;
    let base = layout_path.parent().unwrap_or(Path::new("."));
    let tree = layout.build(base)?;

    let offset = match query {
        LocateQuery::Name(name) => {
            match position_of(&tree, name)? {
                Some(offset) => println!("{}: {}", name, describe_offset(offset)),
                None => return Err(format!("no field named '{name}'").into()),
            }
            return Ok(());
        }
        LocateQuery::Byte(byte) => byte
            .checked_mul(8)
            .ok_or("byte offset out of range")?,
        LocateQuery::Bit(bit) => *bit,
    };

    match tree.try_get_name(offset)? {
        Some(name) => println!("{}: {}", describe_offset(offset), name),
        None if offset < tree.length_bits()? => {
            println!("{}: <unnamed>", describe_offset(offset))
        }
        None => {
            return Err(format!(
                "offset {} is past the end ({} bits)",
                offset,
                tree.length_bits()?
            )
            .into());
        }
    }
    Ok(())
}
