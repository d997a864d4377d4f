//! Growable in-memory leaf node.
//!
//! [`BitBuffer`] is the writable leaf of a stream tree: a byte vector with a
//! bit length and a bit cursor. Writes past the end extend the buffer, and
//! slices are materialised into new buffers so they stay valid independently
//! of the source.
//!
//! # Example
//!
//! ```
//! use bitweave_core::buffer::BitBuffer;
//! use bitweave_core::stream::BitStream;
//!
//! let mut buf = BitBuffer::new();
//! buf.write_bits(0b101, 3).unwrap();
//! buf.write_bits(0b11001, 5).unwrap();
//! assert_eq!(buf.as_bytes(), &[0b1011_1001]);
//!
//! buf.set_position_bits(0).unwrap();
//! assert_eq!(buf.read_bits(3).unwrap(), (0b101, 3));
//! ```

use crate::bits;
use crate::error::{BitStreamError, Result};
use crate::stream::BitStream;

/// A bit-addressable leaf backed by a `Vec<u8>`.
#[derive(Debug, Clone, Default)]
pub struct BitBuffer {
    /// Backing bytes; bits past `len_bits` in the last byte are kept zero.
    data: Vec<u8>,
    /// Length in bits.
    len_bits: u64,
    /// Cursor in bits.
    position: u64,
    /// Symbolic name.
    name: Option<String>,
    /// Set by `dispose`.
    disposed: bool,
}

impl BitBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer holding every bit of `bytes`.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let data = bytes.into();
        let len_bits = data.len() as u64 * 8;
        Self {
            data,
            len_bits,
            ..Self::default()
        }
    }

    /// Create a buffer holding the first `len_bits` bits of `bytes`.
    pub fn from_bits(bytes: impl Into<Vec<u8>>, len_bits: u64) -> Result<Self> {
        let mut data = bytes.into();
        let capacity = data.len() as u64 * 8;
        if len_bits > capacity {
            return Err(BitStreamError::invalid_argument(format!(
                "{len_bits} bits requested from {} bytes",
                data.len()
            )));
        }
        data.truncate(len_bits.div_ceil(8) as usize);
        bits::clear_tail(&mut data, len_bits);
        Ok(Self {
            data,
            len_bits,
            ..Self::default()
        })
    }

    /// Create a buffer of `len_bits` zero bits.
    pub fn zeroed_bits(len_bits: u64) -> Self {
        Self {
            data: vec![0; len_bits.div_ceil(8) as usize],
            len_bits,
            ..Self::default()
        }
    }

    /// Builder-style name assignment.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The backing bytes, left-aligned, with a zero-padded final byte.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the buffer and return its backing bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    fn check_disposed(&self) -> Result<()> {
        if self.disposed {
            return Err(BitStreamError::Disposed);
        }
        Ok(())
    }

    /// Cursor position after writing `bits` bits.
    fn write_end(&self, bits: u64) -> Result<u64> {
        self.position.checked_add(bits).ok_or_else(|| {
            BitStreamError::invalid_argument(format!(
                "write of {bits} bits at position {} overflows",
                self.position
            ))
        })
    }

    /// Make room for `end` bits, extending the length if needed.
    fn ensure_len(&mut self, end: u64) {
        if end > self.len_bits {
            self.data.resize(end.div_ceil(8) as usize, 0);
            self.len_bits = end;
        }
    }
}

impl BitStream for BitBuffer {
    fn length_bits(&self) -> Result<u64> {
        self.check_disposed()?;
        Ok(self.len_bits)
    }

    fn position_bits(&self) -> Result<u64> {
        self.check_disposed()?;
        Ok(self.position)
    }

    fn set_position_bits(&mut self, position: u64) -> Result<()> {
        self.check_disposed()?;
        self.position = position;
        Ok(())
    }

    fn read_bits(&mut self, count: usize) -> Result<(u64, usize)> {
        self.check_disposed()?;
        BitStreamError::check_bit_count(count)?;

        let available = self.len_bits.saturating_sub(self.position);
        let count = (count as u64).min(available) as usize;
        let value = bits::read_bits(&self.data, self.position, count);
        self.position += count as u64;
        Ok((value, count))
    }

    fn write_bits(&mut self, value: u64, count: usize) -> Result<()> {
        self.check_disposed()?;
        BitStreamError::check_bit_count(count)?;
        if count == 0 {
            return Ok(());
        }

        let end = self.write_end(count as u64)?;
        self.ensure_len(end);
        bits::write_bits(&mut self.data, self.position, value, count);
        self.position = end;
        Ok(())
    }

    fn set_length_bits(&mut self, length: u64) -> Result<()> {
        self.check_disposed()?;
        self.data.resize(length.div_ceil(8) as usize, 0);
        bits::clear_tail(&mut self.data, length);
        self.len_bits = length;
        Ok(())
    }

    fn slice_bits(&mut self, length: u64) -> Result<Box<dyn BitStream>> {
        self.check_disposed()?;

        let available = self.len_bits.saturating_sub(self.position);
        if length > available {
            return Err(BitStreamError::invalid_length(length, available));
        }

        let data = bits::copy_bits(&self.data, self.position, length);
        self.position += length;
        Ok(Box::new(Self {
            data,
            len_bits: length,
            ..Self::default()
        }))
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    fn can_write(&self) -> bool {
        !self.disposed
    }

    fn dispose(&mut self) {
        self.data = Vec::new();
        self.len_bits = 0;
        self.position = 0;
        self.disposed = true;
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.check_disposed()?;

        let available = self.len_bits.saturating_sub(self.position) / 8;
        let count = (buf.len() as u64).min(available) as usize;

        if self.position % 8 == 0 {
            let start = (self.position / 8) as usize;
            buf[..count].copy_from_slice(&self.data[start..start + count]);
        } else {
            for (i, byte) in buf[..count].iter_mut().enumerate() {
                *byte = bits::read_bits(&self.data, self.position + i as u64 * 8, 8) as u8;
            }
        }

        self.position += count as u64 * 8;
        Ok(count)
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.check_disposed()?;
        if buf.is_empty() {
            return Ok(());
        }

        let bits = (buf.len() as u64)
            .checked_mul(8)
            .ok_or_else(|| BitStreamError::invalid_argument("write length overflows"))?;
        let end = self.write_end(bits)?;
        self.ensure_len(end);

        if self.position % 8 == 0 {
            let start = (self.position / 8) as usize;
            self.data[start..start + buf.len()].copy_from_slice(buf);
        } else {
            for (i, &byte) in buf.iter().enumerate() {
                bits::write_bits(&mut self.data, self.position + i as u64 * 8, byte as u64, 8);
            }
        }

        self.position = end;
        Ok(())
    }
}
