//! Memory-mapped, file-backed leaf nodes.
//!
//! [`MappedBuffer`] exposes a file as a read-only leaf of a stream tree.
//! The operating system pages data in on demand, so large seed files or
//! captured traffic can be composed into a tree without reading them into
//! memory first. Slices are zero-copy views sharing the same mapping.
//!
//! # Example
//!
//! ```no_run
//! use bitweave_core::list::BitStreamList;
//! use bitweave_core::mmap::MappedBuffer;
//!
//! let mut list = BitStreamList::new();
//! list.push(Box::new(MappedBuffer::open("capture.bin")?.with_name("capture")))?;
//! # Ok::<(), bitweave_core::error::BitStreamError>(())
//! ```
//!
//! # Safety
//!
//! Memory-mapped files can be dangerous if the underlying file is modified by
//! another process while mapped. Only read-only mappings are created.

use crate::bits;
use crate::error::{BitStreamError, Result};
use crate::stream::BitStream;
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// A read-only leaf over a memory-mapped file.
///
/// The mapping is wrapped in an [`Arc`] so slices can share it; each view
/// keeps its own bit window and cursor.
#[derive(Debug, Clone)]
pub struct MappedBuffer {
    /// The mapping, `None` once disposed.
    map: Option<Arc<Mmap>>,
    /// First bit of this view within the mapping.
    start: u64,
    /// Length of this view in bits.
    len_bits: u64,
    /// Cursor in bits, relative to `start`.
    position: u64,
    /// Symbolic name.
    name: Option<String>,
}

impl MappedBuffer {
    /// Open a file and map it read-only.
    ///
    /// # Errors
    ///
    /// Returns [`BitStreamError::Io`] if the file cannot be opened or mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_file(&file)
    }

    /// Map an already open file.
    ///
    /// The caller must ensure the file is not modified while mapped.
    pub fn from_file(file: &File) -> Result<Self> {
        // SAFETY: We create a read-only mapping, and the caller is responsible
        // for ensuring the file is not modified while mapped.
        let mmap = unsafe { Mmap::map(file)? };
        let len_bits = mmap.len() as u64 * 8;
        Ok(Self {
            map: Some(Arc::new(mmap)),
            start: 0,
            len_bits,
            position: 0,
            name: None,
        })
    }

    /// Builder-style name assignment.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn data(&self) -> Result<&[u8]> {
        self.map
            .as_deref()
            .map(|m| &m[..])
            .ok_or(BitStreamError::Disposed)
    }
}

impl BitStream for MappedBuffer {
    fn length_bits(&self) -> Result<u64> {
        self.data()?;
        Ok(self.len_bits)
    }

    fn position_bits(&self) -> Result<u64> {
        self.data()?;
        Ok(self.position)
    }

    fn set_position_bits(&mut self, position: u64) -> Result<()> {
        self.data()?;
        self.position = position;
        Ok(())
    }

    fn read_bits(&mut self, count: usize) -> Result<(u64, usize)> {
        BitStreamError::check_bit_count(count)?;
        let data = self.data()?;

        let available = self.len_bits.saturating_sub(self.position);
        let count = (count as u64).min(available) as usize;
        let value = bits::read_bits(data, self.start + self.position, count);
        self.position += count as u64;
        Ok((value, count))
    }

    fn write_bits(&mut self, _value: u64, _count: usize) -> Result<()> {
        self.data()?;
        Err(BitStreamError::unsupported("write_bits"))
    }

    fn set_length_bits(&mut self, _length: u64) -> Result<()> {
        self.data()?;
        Err(BitStreamError::unsupported("set_length_bits"))
    }

    fn slice_bits(&mut self, length: u64) -> Result<Box<dyn BitStream>> {
        self.data()?;

        let available = self.len_bits.saturating_sub(self.position);
        if length > available {
            return Err(BitStreamError::invalid_length(length, available));
        }

        let view = Self {
            map: self.map.clone(),
            start: self.start + self.position,
            len_bits: length,
            position: 0,
            name: None,
        };
        self.position += length;
        Ok(Box::new(view))
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    fn can_write(&self) -> bool {
        false
    }

    fn dispose(&mut self) {
        self.map = None;
        self.len_bits = 0;
        self.position = 0;
    }

    fn is_disposed(&self) -> bool {
        self.map.is_none()
    }

    fn write(&mut self, _buf: &[u8]) -> Result<()> {
        self.data()?;
        Err(BitStreamError::unsupported("write"))
    }
}
