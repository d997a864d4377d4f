//! JSON data-model layouts.
//!
//! A layout describes a stream tree as nested fields:
//!
//! ```json
//! { "name": "packet",
//!   "fields": [
//!     { "name": "magic", "hex": "cafe" },
//!     { "name": "flags", "hex": "a0", "bits": 3 },
//!     { "name": "body", "fields": [ { "name": "text", "text": "hello" } ] } ] }
//! ```
//!
//! Each field supplies exactly one of `hex`, `text`, `file`, `fill` (zero
//! bits) or `fields`. `bits` cuts a leaf down to a bit length.

use crate::utils::parse_hex;
use bitweave_core::{BitBuffer, BitStream, BitStreamError, BitStreamList, MappedBuffer};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading or building a layout.
#[derive(Error, Debug)]
pub enum LayoutError {
    /// The layout file could not be read.
    #[error("cannot read layout {}: {source}", path.display())]
    Read {
        /// Layout path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The layout is not valid JSON for this schema.
    #[error("invalid layout: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field names no source or more than one.
    #[error("field {field}: expected exactly one of hex, text, file, fill or fields, found {found}")]
    Source {
        /// Field label.
        field: String,
        /// Number of sources given.
        found: usize,
    },

    /// `bits` given on a composite field.
    #[error("field {field}: bits cannot be applied to nested fields")]
    BitsOnComposite {
        /// Field label.
        field: String,
    },

    /// A `hex` value did not decode.
    #[error("field {field}: {message}")]
    Hex {
        /// Field label.
        field: String,
        /// Decoder message.
        message: String,
    },

    /// Building a node failed.
    #[error("field {field}: {source}")]
    Stream {
        /// Field label.
        field: String,
        /// Underlying stream error.
        source: BitStreamError,
    },
}

/// Root of a layout document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Layout {
    /// Name of the root composite.
    #[serde(default)]
    pub name: Option<String>,
    /// Top-level fields.
    #[serde(default)]
    pub fields: Vec<Field>,
}

/// One node of a layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Field {
    /// Field name, used for offset lookups.
    #[serde(default)]
    pub name: Option<String>,
    /// Bytes as hex digits.
    #[serde(default)]
    pub hex: Option<String>,
    /// Bytes as UTF-8 text.
    #[serde(default)]
    pub text: Option<String>,
    /// Bytes from a file, relative to the layout file.
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Number of zero bits.
    #[serde(default)]
    pub fill: Option<u64>,
    /// Nested fields.
    #[serde(default)]
    pub fields: Option<Vec<Field>>,
    /// Keep only the first `bits` bits of a leaf.
    #[serde(default)]
    pub bits: Option<u64>,
}

impl Layout {
    /// Load a layout from a JSON file.
    pub fn load(path: &Path) -> Result<Self, LayoutError> {
        let text = fs::read_to_string(path).map_err(|source| LayoutError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Parse a layout from a JSON string.
    pub fn from_json(text: &str) -> Result<Self, LayoutError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Build the stream tree. Relative `file` paths resolve against `base`.
    pub fn build(&self, base: &Path) -> Result<BitStreamList, LayoutError> {
        let label = self.name.clone().unwrap_or_else(|| "<root>".to_string());
        let mut root = build_list(&self.fields, base, &label)?;
        if let Some(name) = &self.name {
            root.set_name(Some(name.clone()));
        }
        debug!(
            "built layout {label}: {} fields, {} bits",
            self.fields.len(),
            root.length_bits().unwrap_or(0)
        );
        Ok(root)
    }
}

impl Field {
    fn label(&self, index: usize) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("#{index}"),
        }
    }

    fn source_count(&self) -> usize {
        [
            self.hex.is_some(),
            self.text.is_some(),
            self.file.is_some(),
            self.fill.is_some(),
            self.fields.is_some(),
        ]
        .into_iter()
        .filter(|&given| given)
        .count()
    }

    fn build(&self, base: &Path, label: &str) -> Result<Box<dyn BitStream>, LayoutError> {
        let found = self.source_count();
        if found != 1 {
            return Err(LayoutError::Source {
                field: label.to_string(),
                found,
            });
        }

        let stream_err = |source| LayoutError::Stream {
            field: label.to_string(),
            source,
        };

        let mut node: Box<dyn BitStream> = if let Some(fields) = &self.fields {
            if self.bits.is_some() {
                return Err(LayoutError::BitsOnComposite {
                    field: label.to_string(),
                });
            }
            Box::new(build_list(fields, base, label)?)
        } else if let Some(len) = self.fill {
            Box::new(BitBuffer::zeroed_bits(len))
        } else if let Some(path) = &self.file {
            let mapped = MappedBuffer::open(base.join(path)).map_err(stream_err)?;
            Box::new(mapped)
        } else {
            let bytes = match (&self.hex, &self.text) {
                (Some(hex), _) => parse_hex(hex).map_err(|message| LayoutError::Hex {
                    field: label.to_string(),
                    message,
                })?,
                (None, Some(text)) => text.as_bytes().to_vec(),
                (None, None) => Vec::new(),
            };
            Box::new(BitBuffer::from_bytes(bytes))
        };

        if let Some(bits) = self.bits {
            node = node.slice_bits(bits).map_err(stream_err)?;
        }
        node.set_name(self.name.clone());
        Ok(node)
    }
}

fn build_list(fields: &[Field], base: &Path, label: &str) -> Result<BitStreamList, LayoutError> {
    let mut list = BitStreamList::new();
    for (index, field) in fields.iter().enumerate() {
        let child_label = format!("{label}.{}", field.label(index));
        let node = field.build(base, &child_label)?;
        list.push(node).map_err(|source| LayoutError::Stream {
            field: child_label,
            source,
        })?;
    }
    Ok(list)
}

/// Placement of one named or unnamed node in a built tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpan {
    /// Dotted path of names from the root.
    pub path: String,
    /// Absolute offset in bits.
    pub offset_bits: u64,
    /// Length in bits.
    pub length_bits: u64,
    /// Nesting depth, 0 for top-level fields.
    pub depth: usize,
}

/// Walk a built tree and record where every node sits.
pub fn field_map(root: &BitStreamList) -> Result<Vec<FieldSpan>, BitStreamError> {
    let mut spans = Vec::new();
    collect_spans(root, "", 0, 0, &mut spans)?;
    Ok(spans)
}

fn collect_spans(
    list: &BitStreamList,
    prefix: &str,
    base: u64,
    depth: usize,
    spans: &mut Vec<FieldSpan>,
) -> Result<(), BitStreamError> {
    let mut offset = base;
    for (index, child) in list.iter()?.enumerate() {
        let name = child
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("#{index}"));
        let path = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}.{name}")
        };
        let length = child.length_bits()?;

        spans.push(FieldSpan {
            path: path.clone(),
            offset_bits: offset,
            length_bits: length,
            depth,
        });
        if let Some(inner) = child.as_list() {
            collect_spans(inner, &path, offset, depth + 1, spans)?;
        }
        offset += length;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PACKET: &str = r#"{
        "name": "packet",
        "fields": [
            { "name": "magic", "hex": "cafe" },
            { "name": "flags", "hex": "a0", "bits": 3 },
            { "name": "pad", "fill": 5 },
            { "name": "body", "fields": [
                { "name": "text", "text": "hi" },
                { "hex": "00" }
            ] }
        ]
    }"#;

    #[test]
    fn test_build_packet() {
        let layout = Layout::from_json(PACKET).unwrap();
        let mut tree = layout.build(Path::new(".")).unwrap();

        assert_eq!(tree.name(), Some("packet"));
        assert_eq!(tree.length_bits().unwrap(), 16 + 3 + 5 + 24);
        assert_eq!(
            tree.read_to_vec().unwrap(),
            vec![0xCA, 0xFE, 0xA0, b'h', b'i', 0x00]
        );
        assert_eq!(tree.try_get_position("text").unwrap(), Some(24));
    }

    #[test]
    fn test_field_map() {
        let layout = Layout::from_json(PACKET).unwrap();
        let tree = layout.build(Path::new(".")).unwrap();
        let spans = field_map(&tree).unwrap();

        let paths: Vec<_> = spans.iter().map(|s| s.path.as_str()).collect();
        assert_eq!(
            paths,
            ["magic", "flags", "pad", "body", "body.text", "body.#1"]
        );
        assert_eq!(
            spans[4],
            FieldSpan {
                path: "body.text".to_string(),
                offset_bits: 24,
                length_bits: 16,
                depth: 1,
            }
        );
    }

    #[test]
    fn test_file_field_relative_to_base() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("blob.bin"), b"\xFF\x00").unwrap();

        let layout =
            Layout::from_json(r#"{ "fields": [ { "name": "blob", "file": "blob.bin", "bits": 4 } ] }"#)
                .unwrap();
        let mut tree = layout.build(dir.path()).unwrap();
        assert_eq!(tree.length_bits().unwrap(), 4);
        assert_eq!(tree.read_bits(4).unwrap(), (0xF, 4));
        assert_eq!(tree.try_get_name(0).unwrap(), Some("blob"));
    }

    #[test]
    fn test_rejects_ambiguous_field() {
        let layout =
            Layout::from_json(r#"{ "fields": [ { "name": "x", "hex": "00", "text": "a" } ] }"#)
                .unwrap();
        let err = layout.build(Path::new(".")).unwrap_err();
        assert!(matches!(err, LayoutError::Source { found: 2, .. }));
        assert!(err.to_string().contains("<root>.x"));
    }

    #[test]
    fn test_rejects_missing_source() {
        let layout = Layout::from_json(r#"{ "fields": [ {} ] }"#).unwrap();
        assert!(matches!(
            layout.build(Path::new(".")),
            Err(LayoutError::Source { found: 0, .. })
        ));
    }

    #[test]
    fn test_rejects_bits_on_composite() {
        let layout =
            Layout::from_json(r#"{ "fields": [ { "fields": [], "bits": 1 } ] }"#).unwrap();
        assert!(matches!(
            layout.build(Path::new(".")),
            Err(LayoutError::BitsOnComposite { .. })
        ));
    }

    #[test]
    fn test_bits_longer_than_leaf() {
        let layout =
            Layout::from_json(r#"{ "fields": [ { "hex": "ff", "bits": 9 } ] }"#).unwrap();
        assert!(matches!(
            layout.build(Path::new(".")),
            Err(LayoutError::Stream {
                source: BitStreamError::InvalidLength { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(matches!(
            Layout::from_json(r#"{ "fields": [ { "bytes": "00" } ] }"#),
            Err(LayoutError::Parse(_))
        ));
    }
}
