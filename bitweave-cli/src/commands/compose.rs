//! Compose command implementation.

use crate::layout::{Layout, field_map};
use crate::utils::emit;
use bitweave_core::BitStream;
use log::info;
use std::path::{Path, PathBuf};

/// Build the tree described by `layout_path` and emit its bytes.
///
/// With `json`, the field map is printed instead of a hex dump; bytes are
/// still written when `output` is given.
pub fn cmd_compose(
    layout_path: &PathBuf,
    output: Option<&Path>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let layout = Layout::load(layout_path)?;
    let base = layout_path.parent().unwrap_or(Path::new("."));
    let tree = layout.build(base)?;
    let length = tree.length_bits()?;

    if json {
        let spans = field_map(&tree)?;
        println!("{}", serde_json::to_string_pretty(&spans)?);
        if let Some(path) = output {
            emit(Box::new(tree), Some(path))?;
        }
        return Ok(());
    }

    let written = emit(Box::new(tree), output)?;
    info!("composed {length} bits into {written} bytes");
    if let Some(path) = output {
        println!("Wrote {} bytes ({} bits) to {}", written, length, path.display());
    }
    Ok(())
}
