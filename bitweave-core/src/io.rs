//! `std::io` adapter for bit stream nodes.
//!
//! [`ByteStream`] lets byte-oriented code (file output, sockets, hashers,
//! `std::io::copy`) consume any node of a stream tree without knowing
//! whether it is a leaf or a composite.
//!
//! # Example
//!
//! ```
//! use bitweave_core::buffer::BitBuffer;
//! use bitweave_core::io::ByteStream;
//! use bitweave_core::list::BitStreamList;
//! use bitweave_core::stream::BitStream;
//! use std::io::Read;
//!
//! let mut list = BitStreamList::new();
//! list.push(Box::new(BitBuffer::from_bytes(b"abc".to_vec()))).unwrap();
//! list.push(Box::new(BitBuffer::from_bytes(b"def".to_vec()))).unwrap();
//!
//! let mut out = String::new();
//! ByteStream::new(&mut list).read_to_string(&mut out).unwrap();
//! assert_eq!(out, "abcdef");
//! ```

use crate::stream::{BitStream, SeekOrigin};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::ops::DerefMut;

/// Byte-level `Read`/`Write`/`Seek` view over a bit stream.
///
/// `S` is any mutable handle to a node: `&mut BitBuffer`,
/// `&mut dyn BitStream`, `Box<dyn BitStream>` and so on.
#[derive(Debug)]
pub struct ByteStream<S> {
    inner: S,
}

impl<S> ByteStream<S> {
    /// Wrap a stream handle.
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// Get a reference to the wrapped handle.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Get a mutable reference to the wrapped handle.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Consume the adapter and return the wrapped handle.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S> Read for ByteStream<S>
where
    S: DerefMut,
    S::Target: BitStream,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(BitStream::read(&mut *self.inner, buf)?)
    }
}

impl<S> Write for ByteStream<S>
where
    S: DerefMut,
    S::Target: BitStream,
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        BitStream::write(&mut *self.inner, buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S> Seek for ByteStream<S>
where
    S: DerefMut,
    S::Target: BitStream,
{
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (offset, origin) = match pos {
            SeekFrom::Start(n) => {
                let n = i64::try_from(n).map_err(|_| {
                    io::Error::new(io::ErrorKind::InvalidInput, "seek offset overflows i64")
                })?;
                (n, SeekOrigin::Begin)
            }
            SeekFrom::Current(n) => (n, SeekOrigin::Current),
            SeekFrom::End(n) => (n, SeekOrigin::End),
        };
        Ok(BitStream::seek(&mut *self.inner, offset, origin)?)
    }
}
