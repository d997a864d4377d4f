//! The bit stream contract shared by every node of a stream tree.
//!
//! [`BitStream`] is the polymorphic interface the rest of the engine
//! programs against. A node is either a leaf backed by bytes
//! ([`BitBuffer`](crate::buffer::BitBuffer), or a memory-mapped file when the
//! `mmap` feature is enabled) or a composite
//! [`BitStreamList`](crate::list::BitStreamList) of further nodes. Callers
//! read, write, seek and slice through this trait without knowing the shape
//! of the tree.
//!
//! # Bit Ordering
//!
//! Streams are MSB-first: bit 0 of a stream is the most significant bit of
//! its first byte, and multi-bit reads return the first bit read in the most
//! significant position of the value.
//!
//! # Derived algorithms
//!
//! The provided methods [`BitStream::copy_to`], [`BitStream::copy_range_to`]
//! and [`BitStream::index_of`], together with the free functions
//! [`pad_bits`], [`grow_to`] and [`grow_to_bits`], are written only in terms
//! of the contract and behave identically on leaves and composites.
//!
//! # Example
//!
//! ```
//! use bitweave_core::buffer::BitBuffer;
//! use bitweave_core::list::BitStreamList;
//! use bitweave_core::stream::BitStream;
//!
//! let mut list = BitStreamList::new();
//! list.push(Box::new(BitBuffer::from_bytes(b"He".to_vec()))).unwrap();
//! list.push(Box::new(BitBuffer::from_bytes(b"llo".to_vec()))).unwrap();
//!
//! let mut needle = BitBuffer::from_bytes(b"ll".to_vec());
//! assert_eq!(list.index_of(&mut needle, 0).unwrap(), Some(16));
//! assert_eq!(list.read_to_vec().unwrap(), b"Hello");
//! ```

use crate::buffer::BitBuffer;
use crate::error::{BitStreamError, Result};
use crate::list::BitStreamList;
use log::{debug, trace};
use std::fmt;

/// Upper bound for the temporary buffer used by bulk copies (4 MiB).
pub const COPY_BUFFER_LIMIT: usize = 4 * 1024 * 1024;

/// Seed byte used when growing an empty stream.
pub const GROW_SEED: u8 = b'A';

/// Reference point for a seek.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeekOrigin {
    /// Offset from the start of the stream.
    #[default]
    Begin,
    /// Offset from the current cursor.
    Current,
    /// Offset from the end of the stream.
    End,
}

/// A bit-addressable, seekable stream node.
///
/// The cursor may be placed beyond the end of the stream; reads there simply
/// return no data. Every fallible method, including the length and position
/// getters, fails with [`BitStreamError::Disposed`] once [`dispose`] has run.
///
/// [`dispose`]: BitStream::dispose
pub trait BitStream: fmt::Debug {
    /// Length of the stream in bits.
    fn length_bits(&self) -> Result<u64>;

    /// Cursor position in bits.
    fn position_bits(&self) -> Result<u64>;

    /// Move the cursor to an absolute bit position. Positions past the end
    /// are legal.
    fn set_position_bits(&mut self, position: u64) -> Result<()>;

    /// Read up to `count` (0-64) bits.
    ///
    /// Returns the value together with the number of bits actually read,
    /// which is only smaller than `count` at the end of the stream.
    fn read_bits(&mut self, count: usize) -> Result<(u64, usize)>;

    /// Write the low `count` (0-64) bits of `value` at the cursor.
    fn write_bits(&mut self, value: u64, count: usize) -> Result<()>;

    /// Truncate or zero-extend the stream to `length` bits.
    fn set_length_bits(&mut self, length: u64) -> Result<()>;

    /// Produce a new stream holding exactly `length` bits starting at the
    /// cursor, and advance the cursor by `length`.
    fn slice_bits(&mut self, length: u64) -> Result<Box<dyn BitStream>>;

    /// Symbolic name used to attribute offsets back to data model elements.
    fn name(&self) -> Option<&str>;

    /// Set or clear the symbolic name.
    fn set_name(&mut self, name: Option<String>);

    /// Whether the stream accepts writes.
    fn can_write(&self) -> bool;

    /// Release the node and, for composites, every child.
    fn dispose(&mut self);

    /// Whether [`dispose`](BitStream::dispose) has run.
    fn is_disposed(&self) -> bool;

    /// Downcast to a composite.
    fn as_list(&self) -> Option<&BitStreamList> {
        None
    }

    /// Mutable downcast to a composite.
    fn as_list_mut(&mut self) -> Option<&mut BitStreamList> {
        None
    }

    /// Move the cursor relative to `origin` and return the new bit position.
    ///
    /// Fails with [`BitStreamError::InvalidSeek`] if the result would be
    /// negative. The result is not clamped to the stream length.
    fn seek_bits(&mut self, offset: i64, origin: SeekOrigin) -> Result<u64> {
        let base = match origin {
            SeekOrigin::Begin => 0,
            SeekOrigin::Current => self.position_bits()?,
            SeekOrigin::End => self.length_bits()?,
        };
        let target = base as i128 + offset as i128;
        if target < 0 {
            return Err(BitStreamError::invalid_seek(target));
        }
        let target = u64::try_from(target)
            .map_err(|_| BitStreamError::invalid_argument("seek target overflows u64"))?;
        self.set_position_bits(target)?;
        Ok(target)
    }

    /// Read one bit, or `None` at the end of the stream.
    fn read_bit(&mut self) -> Result<Option<bool>> {
        let (value, read) = self.read_bits(1)?;
        Ok((read == 1).then_some(value != 0))
    }

    /// Write one bit.
    fn write_bit(&mut self, bit: bool) -> Result<()> {
        self.write_bits(bit as u64, 1)
    }

    /// Length in whole bytes.
    fn length(&self) -> Result<u64> {
        Ok(self.length_bits()? / 8)
    }

    /// Cursor position in whole bytes.
    fn position(&self) -> Result<u64> {
        Ok(self.position_bits()? / 8)
    }

    /// Byte-granular seek; returns the new position in bytes.
    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> Result<u64> {
        let bits = offset
            .checked_mul(8)
            .ok_or_else(|| BitStreamError::invalid_argument("seek offset overflows"))?;
        Ok(self.seek_bits(bits, origin)? / 8)
    }

    /// Whether the stream can be read.
    fn can_read(&self) -> bool {
        !self.is_disposed()
    }

    /// Whether the stream can seek.
    fn can_seek(&self) -> bool {
        !self.is_disposed()
    }

    /// Read whole bytes into `buf`, returning how many were filled.
    ///
    /// Fewer than eight trailing bits are never delivered; the cursor stays
    /// in front of them.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            let (value, read) = self.read_bits(8)?;
            if read < 8 {
                if read > 0 {
                    self.seek_bits(-(read as i64), SeekOrigin::Current)?;
                }
                break;
            }
            buf[filled] = value as u8;
            filled += 1;
        }
        Ok(filled)
    }

    /// Write every byte of `buf` at the cursor.
    fn write(&mut self, buf: &[u8]) -> Result<()> {
        for &byte in buf {
            self.write_bits(byte as u64, 8)?;
        }
        Ok(())
    }

    /// Read every remaining whole byte.
    fn read_to_vec(&mut self) -> Result<Vec<u8>> {
        let remaining = self.length_bits()?.saturating_sub(self.position_bits()?) / 8;
        let mut out = vec![0u8; remaining as usize];
        let read = self.read(&mut out)?;
        out.truncate(read);
        Ok(out)
    }

    /// Copy everything from the cursor to the end of the stream into `dest`,
    /// including trailing bits that do not fill a byte.
    fn copy_to(&mut self, dest: &mut dyn BitStream) -> Result<()> {
        let size = (self.length()? + 1).min(COPY_BUFFER_LIMIT as u64) as usize;
        let mut buf = vec![0u8; size];

        loop {
            let read = self.read(&mut buf)?;
            if read == 0 {
                break;
            }
            dest.write(&buf[..read])?;
        }

        copy_tail_bits(self, dest)
    }

    /// Skip `offset` bytes from the cursor, then copy exactly `count` bytes
    /// into `dest`. If the copy stops inside the final partial byte of the
    /// stream, those trailing bits are copied too.
    fn copy_range_to(&mut self, dest: &mut dyn BitStream, offset: u64, count: u64) -> Result<()> {
        let skip = i64::try_from(offset)
            .map_err(|_| BitStreamError::invalid_argument("copy offset overflows"))?;
        self.seek(skip, SeekOrigin::Current)?;

        let size = (count + 1).min(COPY_BUFFER_LIMIT as u64) as usize;
        let mut buf = vec![0u8; size];
        let mut remaining = count;

        while remaining > 0 {
            let want = remaining.min(buf.len() as u64) as usize;
            let read = self.read(&mut buf[..want])?;
            if read == 0 {
                return Err(BitStreamError::invalid_length(
                    count * 8,
                    (count - remaining) * 8,
                ));
            }
            dest.write(&buf[..read])?;
            remaining -= read as u64;
        }

        copy_tail_bits(self, dest)
    }

    /// Find the first byte-aligned occurrence of `needle` at or after
    /// `offset_bits`, returning its absolute bit offset.
    ///
    /// The needle length must be a multiple of 8. The cursors of both
    /// streams are restored whatever the outcome.
    fn index_of(&mut self, needle: &mut dyn BitStream, offset_bits: u64) -> Result<Option<u64>> {
        let needle_bits = needle.length_bits()?;
        if needle_bits % 8 != 0 {
            return Err(BitStreamError::invalid_argument(format!(
                "needle length {needle_bits} bits is not a multiple of 8"
            )));
        }

        let needle_pos = needle.position_bits()?;
        needle.set_position_bits(0)?;
        let mut pattern = vec![0u8; (needle_bits / 8) as usize];
        let read = needle.read(&mut pattern);
        needle.set_position_bits(needle_pos)?;
        pattern.truncate(read?);

        if pattern.is_empty() {
            let found = offset_bits <= self.length_bits()?;
            return Ok(found.then_some(offset_bits));
        }

        let saved = self.position_bits()?;
        let found = scan(self, &pattern, offset_bits);
        self.set_position_bits(saved)?;
        found
    }
}

/// Copy the final 0-7 bits left after a byte copy.
fn copy_tail_bits<S: BitStream + ?Sized>(src: &mut S, dest: &mut dyn BitStream) -> Result<()> {
    let tail = src.length_bits()?.saturating_sub(src.position_bits()?);
    if tail > 0 && tail < 8 {
        let (value, read) = src.read_bits(tail as usize)?;
        dest.write_bits(value, read)?;
    }
    Ok(())
}

/// Naive byte scan with backtracking.
fn scan<S: BitStream + ?Sized>(stream: &mut S, pattern: &[u8], offset_bits: u64) -> Result<Option<u64>> {
    stream.set_position_bits(offset_bits)?;

    let mut byte = [0u8; 1];
    let mut idx = 0usize;

    while stream.read(&mut byte)? == 1 {
        if byte[0] != pattern[idx] {
            if idx > 0 {
                stream.seek(-(idx as i64), SeekOrigin::Current)?;
                idx = 0;
            }
        } else {
            idx += 1;
            if idx == pattern.len() {
                let end = stream.position_bits()?;
                return Ok(Some(end - pattern.len() as u64 * 8));
            }
        }
    }

    Ok(None)
}

/// Pad `stream` with zero bits up to the next byte boundary.
///
/// An already aligned stream is returned unchanged. Otherwise the stream is
/// wrapped, together with a freshly written all-zero segment, in a new
/// composite whose length is the next multiple of 8.
pub fn pad_bits(stream: Box<dyn BitStream>) -> Result<Box<dyn BitStream>> {
    let length = stream.length_bits()?;
    let rem = length % 8;
    if rem == 0 {
        return Ok(stream);
    }

    let pad_len = (8 - rem) as usize;
    let mut pad = BitBuffer::new();
    pad.write_bits(0, pad_len)?;
    pad.set_position_bits(0)?;

    let mut list = BitStreamList::new();
    list.push(stream)?;
    list.push(Box::new(pad))?;

    trace!("padded {length}-bit stream with {pad_len} zero bits");
    Ok(Box::new(list))
}

/// Grow `stream` by replication to exactly `length` bytes.
pub fn grow_to(stream: &mut dyn BitStream, length: u64) -> Result<Box<dyn BitStream>> {
    let bits = length
        .checked_mul(8)
        .ok_or_else(|| BitStreamError::invalid_argument("grow length overflows"))?;
    grow_to_bits(stream, bits)
}

/// Grow `stream` by replication to exactly `length` bits.
///
/// The content is repeated from the start until the requested length is
/// reached; a longer source is simply cut. An empty source is seeded with
/// [`GROW_SEED`]. The source cursor is restored.
pub fn grow_to_bits(stream: &mut dyn BitStream, length: u64) -> Result<Box<dyn BitStream>> {
    let saved = stream.position_bits()?;
    let grown = grow_from_start(stream, length);
    stream.set_position_bits(saved)?;
    grown
}

fn grow_from_start(stream: &mut dyn BitStream, length: u64) -> Result<Box<dyn BitStream>> {
    let source_len = stream.length_bits()?;
    stream.set_position_bits(0)?;
    if source_len >= length {
        return stream.slice_bits(length);
    }

    let mut current: Box<dyn BitStream> = if source_len == 0 {
        Box::new(BitBuffer::from_bytes(vec![GROW_SEED]))
    } else {
        stream.slice_bits(source_len)?
    };
    let mut current_len = current.length_bits()?;
    let mut rounds = 0u32;

    // Each round concatenates the stream with a copy of itself.
    while current_len < length {
        current.set_position_bits(0)?;
        let mut copy = BitBuffer::new();
        current.copy_to(&mut copy)?;
        copy.set_position_bits(0)?;
        current.set_position_bits(0)?;

        let mut doubled = BitStreamList::new();
        doubled.push(current)?;
        doubled.push(Box::new(copy))?;
        current_len = doubled.length_bits()?;
        current = Box::new(doubled);
        rounds += 1;
    }

    debug!("grew {source_len}-bit stream to {length} bits in {rounds} rounds");
    current.set_position_bits(0)?;
    current.slice_bits(length)
}
