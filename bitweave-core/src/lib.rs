//! # Bitweave Core
//!
//! Bit-addressable stream trees for structure-aware data generation.
//!
//! A fuzzer that mutates structured data needs to stitch generated fields back
//! together without copying: a 3-bit flag, a 13-bit length and a byte payload
//! are separate nodes, yet consumers want to read them as one contiguous
//! stream. This crate provides the building blocks:
//!
//! - [`stream`]: The [`BitStream`] contract and the algorithms derived from it
//!   (`copy_to`, `index_of`, [`pad_bits`], [`grow_to`])
//! - [`buffer`]: [`BitBuffer`], the growable in-memory leaf
//! - [`list`]: [`BitStreamList`], an ordered composite that reads as the
//!   concatenation of its children
//! - [`io`]: [`ByteStream`], a `std::io` adapter over any node
//! - `mmap`: `MappedBuffer`, a read-only file-backed leaf (feature `mmap`)
//! - [`error`]: Error types
//!
//! ## Layout
//!
//! ```text
//! BitStreamList "packet"                 bits
//! ├── BitBuffer "flags"     101          0..3
//! ├── BitStreamList "header"
//! │   ├── BitBuffer "len"   0000000001101  3..16
//! │   └── BitBuffer "kind"  0x42         16..24
//! └── BitBuffer "body"      "Hello"      24..64
//! ```
//!
//! Reading the composite yields bytes assembled across node boundaries; names
//! map to offsets and back; slices of a composite share no state with it.
//!
//! ## Example
//!
//! ```rust
//! use bitweave_core::prelude::*;
//!
//! let mut flags = BitBuffer::new().with_name("flags");
//! flags.write_bits(0b101, 3).unwrap();
//!
//! let mut packet = BitStreamList::new().with_name("packet");
//! packet.push(Box::new(flags)).unwrap();
//! packet
//!     .push(Box::new(BitBuffer::from_bits(vec![0x68], 5).unwrap()))
//!     .unwrap();
//! packet
//!     .push(Box::new(BitBuffer::from_bytes(b"Hi".to_vec()).with_name("body")))
//!     .unwrap();
//!
//! assert_eq!(packet.length_bits().unwrap(), 24);
//! assert_eq!(packet.try_get_position("body").unwrap(), Some(8));
//! assert_eq!(packet.read_to_vec().unwrap(), vec![0b1010_1101, b'H', b'i']);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod bits;
pub mod buffer;
pub mod error;
pub mod io;
pub mod list;
#[cfg(feature = "mmap")]
pub mod mmap;
pub mod stream;

// Re-exports for convenience
pub use buffer::BitBuffer;
pub use error::{BitStreamError, Result};
pub use io::ByteStream;
pub use list::BitStreamList;
#[cfg(feature = "mmap")]
pub use mmap::MappedBuffer;
pub use stream::{BitStream, SeekOrigin, grow_to, grow_to_bits, pad_bits};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::buffer::BitBuffer;
    pub use crate::error::{BitStreamError, Result};
    pub use crate::io::ByteStream;
    pub use crate::list::BitStreamList;
    #[cfg(feature = "mmap")]
    pub use crate::mmap::MappedBuffer;
    pub use crate::stream::{BitStream, SeekOrigin, grow_to, grow_to_bits, pad_bits};
}
