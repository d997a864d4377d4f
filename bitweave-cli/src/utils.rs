//! Utility functions for the CLI.

use bitweave_core::{BitStream, ByteStream, MappedBuffer, pad_bits};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Decode a hex string. Whitespace, `_` and an optional `0x` prefix are ignored.
pub fn parse_hex(text: &str) -> Result<Vec<u8>, String> {
    let text = text.trim();
    let text = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    let digits: Vec<u8> = text
        .bytes()
        .filter(|b| !b.is_ascii_whitespace() && *b != b'_')
        .collect();

    if digits.len() % 2 != 0 {
        return Err(format!("odd number of hex digits ({})", digits.len()));
    }

    digits
        .chunks(2)
        .map(|pair| {
            let hi = hex_value(pair[0])?;
            let lo = hex_value(pair[1])?;
            Ok((hi << 4) | lo)
        })
        .collect()
}

fn hex_value(digit: u8) -> Result<u8, String> {
    match digit {
        b'0'..=b'9' => Ok(digit - b'0'),
        b'a'..=b'f' => Ok(digit - b'a' + 10),
        b'A'..=b'F' => Ok(digit - b'A' + 10),
        _ => Err(format!("invalid hex digit '{}'", digit as char)),
    }
}

/// Format bytes as a classic offset / hex / ASCII dump.
pub fn hex_dump(data: &[u8]) -> String {
    let mut out = String::new();
    for (row, chunk) in data.chunks(16).enumerate() {
        out.push_str(&format!("{:08x}  ", row * 16));
        for i in 0..16 {
            match chunk.get(i) {
                Some(byte) => out.push_str(&format!("{byte:02x} ")),
                None => out.push_str("   "),
            }
            if i == 7 {
                out.push(' ');
            }
        }
        out.push(' ');
        out.extend(chunk.iter().map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        }));
        out.push('\n');
    }
    out
}

/// Open an input file as a memory-mapped leaf.
pub fn open_input(path: &Path) -> Result<Box<dyn BitStream>, Box<dyn std::error::Error>> {
    let mapped = MappedBuffer::open(path)
        .map_err(|e| format!("cannot open {}: {}", path.display(), e))?;
    Ok(Box::new(mapped))
}

/// Pad `stream` to a byte boundary and emit it, either to `output` or as a
/// hex dump on stdout. Returns the number of bytes emitted.
pub fn emit(
    stream: Box<dyn BitStream>,
    output: Option<&Path>,
) -> Result<u64, Box<dyn std::error::Error>> {
    let mut padded = pad_bits(stream)?;
    padded.set_position_bits(0)?;

    match output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            let written = io::copy(&mut ByteStream::new(padded), &mut writer)?;
            writer.flush()?;
            Ok(written)
        }
        None => {
            let bytes = padded.read_to_vec()?;
            print!("{}", hex_dump(&bytes));
            Ok(bytes.len() as u64)
        }
    }
}

/// Format a bit offset as `bit N (byte B + b)`.
pub fn describe_offset(bits: u64) -> String {
    match bits % 8 {
        0 => format!("bit {} (byte {})", bits, bits / 8),
        rem => format!("bit {} (byte {} + {} bits)", bits, bits / 8, rem),
    }
}
