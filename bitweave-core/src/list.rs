//! Composite stream: an ordered list of child streams read as one.
//!
//! [`BitStreamList`] owns its children exclusively and presents their
//! concatenation through the [`BitStream`] contract, so trees nest to any
//! depth while still behaving like a single flat stream.
//!
//! # Cursors
//!
//! Only the list's own cursor is durable state. When an operation needs a
//! child, the child's cursor is moved to the local offset, the call is
//! delegated, and the child's cursor is put back before returning.
//!
//! # Read-only views
//!
//! Composites never accept writes. Lists returned by
//! [`slice_bits`](BitStream::slice_bits) are additionally frozen: their
//! collection cannot be modified either.
//!
//! # Example
//!
//! ```
//! use bitweave_core::buffer::BitBuffer;
//! use bitweave_core::list::BitStreamList;
//! use bitweave_core::stream::BitStream;
//!
//! let mut packet = BitStreamList::new().with_name("packet");
//! packet.push(Box::new(BitBuffer::from_bytes(vec![0xCA, 0xFE]).with_name("magic"))).unwrap();
//! packet.push(Box::new(BitBuffer::from_bits(vec![0xA0], 3).unwrap().with_name("flags"))).unwrap();
//!
//! assert_eq!(packet.length_bits().unwrap(), 19);
//! assert_eq!(packet.try_get_position("flags").unwrap(), Some(16));
//! assert_eq!(packet.try_get_name(17).unwrap(), Some("flags"));
//! ```

use crate::error::{BitStreamError, Result};
use crate::stream::BitStream;
use log::trace;
use std::slice;

/// An ordered, exclusively owned collection of bit streams.
#[derive(Debug, Default)]
pub struct BitStreamList {
    /// Child streams in order.
    children: Vec<Box<dyn BitStream>>,
    /// Sum of the children's lengths in bits.
    length: u64,
    /// Logical cursor over the concatenation.
    position: u64,
    /// Symbolic name.
    name: Option<String>,
    /// Frozen lists reject collection changes.
    read_only: bool,
    /// Set by `dispose`.
    disposed: bool,
}

impl BitStreamList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a list from a sequence of streams.
    pub fn from_streams<I>(streams: I) -> Result<Self>
    where
        I: IntoIterator<Item = Box<dyn BitStream>>,
    {
        let mut list = Self::new();
        for stream in streams {
            list.push(stream)?;
        }
        Ok(list)
    }

    /// Frozen list over already sliced parts.
    fn frozen(children: Vec<Box<dyn BitStream>>, length: u64) -> Self {
        Self {
            children,
            length,
            read_only: true,
            ..Self::default()
        }
    }

    /// Builder-style name assignment.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Whether the collection is frozen.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn check_disposed(&self) -> Result<()> {
        if self.disposed {
            return Err(BitStreamError::Disposed);
        }
        Ok(())
    }

    fn check_mutable(&self, operation: &'static str) -> Result<()> {
        self.check_disposed()?;
        if self.read_only {
            return Err(BitStreamError::unsupported(operation));
        }
        Ok(())
    }

    fn check_index(&self, index: usize, limit: usize) -> Result<()> {
        if index >= limit {
            return Err(BitStreamError::invalid_argument(format!(
                "index {index} out of range for list of {} streams",
                self.children.len()
            )));
        }
        Ok(())
    }

    fn grow_length(&mut self, delta: u64) {
        self.length += delta;
    }

    fn shrink_length(&mut self, delta: u64) {
        debug_assert!(self.length >= delta, "list length underflow");
        self.length = self.length.saturating_sub(delta);
    }

    /// Number of direct children.
    pub fn len(&self) -> Result<usize> {
        self.check_disposed()?;
        Ok(self.children.len())
    }

    /// Whether the list has no children.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Append a child.
    pub fn push(&mut self, stream: Box<dyn BitStream>) -> Result<()> {
        self.check_mutable("push")?;
        let len = stream.length_bits()?;
        self.children.push(stream);
        self.grow_length(len);
        Ok(())
    }

    /// Insert a child at `index`.
    pub fn insert(&mut self, index: usize, stream: Box<dyn BitStream>) -> Result<()> {
        self.check_mutable("insert")?;
        self.check_index(index, self.children.len() + 1)?;
        let len = stream.length_bits()?;
        self.children.insert(index, stream);
        self.grow_length(len);
        Ok(())
    }

    /// Remove and return the child at `index`.
    pub fn remove_at(&mut self, index: usize) -> Result<Box<dyn BitStream>> {
        self.check_mutable("remove_at")?;
        self.check_index(index, self.children.len())?;
        let len = self.children[index].length_bits()?;
        let removed = self.children.remove(index);
        self.shrink_length(len);
        Ok(removed)
    }

    /// Replace the child at `index`, returning the previous one.
    pub fn set(&mut self, index: usize, stream: Box<dyn BitStream>) -> Result<Box<dyn BitStream>> {
        self.check_mutable("set")?;
        self.check_index(index, self.children.len())?;
        let old_len = self.children[index].length_bits()?;
        let new_len = stream.length_bits()?;
        let old = std::mem::replace(&mut self.children[index], stream);
        self.shrink_length(old_len);
        self.grow_length(new_len);
        Ok(old)
    }

    /// Remove the first direct child matching `predicate`.
    pub fn remove_where<F>(&mut self, mut predicate: F) -> Result<Option<Box<dyn BitStream>>>
    where
        F: FnMut(&dyn BitStream) -> bool,
    {
        self.check_mutable("remove")?;
        match self.children.iter().position(|c| predicate(c.as_ref())) {
            Some(index) => self.remove_at(index).map(Some),
            None => Ok(None),
        }
    }

    /// Drop every child.
    pub fn clear(&mut self) -> Result<()> {
        self.check_mutable("clear")?;
        self.children.clear();
        self.length = 0;
        Ok(())
    }

    /// Borrow the child at `index`.
    pub fn get(&self, index: usize) -> Result<&dyn BitStream> {
        self.check_disposed()?;
        self.check_index(index, self.children.len())?;
        Ok(self.children[index].as_ref())
    }

    /// Run `f` on the child at `index`, keeping the list length in sync with
    /// whatever the closure does to the child.
    pub fn update<R>(&mut self, index: usize, f: impl FnOnce(&mut dyn BitStream) -> R) -> Result<R> {
        self.check_mutable("update")?;
        self.check_index(index, self.children.len())?;

        let child = self.children[index].as_mut();
        let before = child.length_bits()?;
        let result = f(child);
        // A child disposed in place no longer contributes any bits.
        let after = child.length_bits().unwrap_or(0);

        self.shrink_length(before);
        self.grow_length(after);
        Ok(result)
    }

    /// Iterate over the direct children.
    pub fn iter(&self) -> Result<impl Iterator<Item = &dyn BitStream>> {
        self.check_disposed()?;
        Ok(self.children.iter().map(|c| c.as_ref()))
    }

    /// Depth-first iterator over the leaves of the tree, in stream order.
    pub fn leaves(&self) -> Result<Leaves<'_>> {
        self.check_disposed()?;
        Ok(Leaves {
            stack: vec![self.children.iter()],
        })
    }

    /// Mutable depth-first iterator over the leaves of the tree.
    pub fn leaves_mut(&mut self) -> Result<LeavesMut<'_>> {
        self.check_disposed()?;
        Ok(LeavesMut {
            stack: vec![self.children.iter_mut()],
        })
    }

    /// Bit offset of the first element named `name`, searching nested lists
    /// depth-first.
    pub fn try_get_position(&self, name: &str) -> Result<Option<u64>> {
        self.check_disposed()?;

        let mut offset = 0u64;
        for child in &self.children {
            if child.name() == Some(name) {
                return Ok(Some(offset));
            }
            if let Some(list) = child.as_list() {
                if let Some(inner) = list.try_get_position(name)? {
                    return Ok(Some(offset + inner));
                }
            }
            offset += child.length_bits()?;
        }

        Ok(None)
    }

    /// Name of the element covering the absolute bit `offset_bits`.
    ///
    /// The innermost named element wins; an unnamed leaf falls back to the
    /// closest named list containing it.
    pub fn try_get_name(&self, offset_bits: u64) -> Result<Option<&str>> {
        self.check_disposed()?;

        let mut start = 0u64;
        for child in &self.children {
            let end = start + child.length_bits()?;
            if offset_bits < end {
                if let Some(list) = child.as_list() {
                    if let Some(name) = list.try_get_name(offset_bits - start)? {
                        return Ok(Some(name));
                    }
                }
                return Ok(child.name());
            }
            start = end;
        }

        Ok(None)
    }
}

/// Complete a glue byte from `child`, then read whole bytes into `dest`, then
/// stash any leftover bits in the glue. Returns `(bytes emitted, bits consumed)`.
fn read_child(
    child: &mut dyn BitStream,
    dest: &mut [u8],
    glue: &mut u64,
    bits: &mut usize,
) -> Result<(usize, u64)> {
    let mut emitted = 0usize;
    let mut consumed = 0u64;

    if *bits > 0 {
        let (value, read) = child.read_bits(8 - *bits)?;
        *glue = (*glue << read) | value;
        *bits += read;
        consumed += read as u64;
        if *bits < 8 {
            return Ok((0, consumed));
        }
        dest[0] = *glue as u8;
        emitted = 1;
        *glue = 0;
        *bits = 0;
    }

    if emitted < dest.len() {
        let read = child.read(&mut dest[emitted..])?;
        emitted += read;
        consumed += read as u64 * 8;

        if emitted < dest.len() {
            let (value, read) = child.read_bits(7)?;
            *glue = value;
            *bits = read;
            consumed += read as u64;
        }
    }

    Ok((emitted, consumed))
}

impl BitStream for BitStreamList {
    fn length_bits(&self) -> Result<u64> {
        self.check_disposed()?;
        Ok(self.length)
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

        let mut value = 0u64;
        let mut got = 0usize;
        let mut cursor = self.position;
        let mut offset = 0u64;

        for child in self.children.iter_mut() {
            if got == count {
                break;
            }
            let end = offset + child.length_bits()?;
            if cursor >= end {
                offset = end;
                continue;
            }

            let saved = child.position_bits()?;
            child.set_position_bits(cursor - offset)?;
            let read = child.read_bits(count - got);
            child.set_position_bits(saved)?;
            let (part, read) = read?;

            value = if read == 64 { part } else { (value << read) | part };
            got += read;
            cursor += read as u64;
            offset = end;
        }

        self.position = cursor;
        Ok((value, got))
    }

    fn write_bits(&mut self, _value: u64, _count: usize) -> Result<()> {
        self.check_disposed()?;
        Err(BitStreamError::unsupported("write_bits"))
    }

    fn set_length_bits(&mut self, _length: u64) -> Result<()> {
        self.check_disposed()?;
        Err(BitStreamError::unsupported("set_length_bits"))
    }

    fn slice_bits(&mut self, length: u64) -> Result<Box<dyn BitStream>> {
        self.check_disposed()?;

        let start = self.position;
        let mut skip = start;
        let mut remaining = length;
        let mut parts: Vec<Box<dyn BitStream>> = Vec::new();

        for leaf in self.leaves_mut()? {
            if remaining == 0 {
                break;
            }
            let leaf_len = leaf.length_bits()?;
            if skip >= leaf_len {
                skip -= leaf_len;
                continue;
            }

            let take = (leaf_len - skip).min(remaining);
            let saved = leaf.position_bits()?;
            leaf.set_position_bits(skip)?;
            let part = leaf.slice_bits(take);
            leaf.set_position_bits(saved)?;

            parts.push(part?);
            remaining -= take;
            skip = 0;
        }

        if remaining > 0 {
            return Err(BitStreamError::invalid_length(length, length - remaining));
        }

        trace!(
            "sliced {length} bits at {start} into {} parts",
            parts.len()
        );
        self.position = start + length;
        Ok(Box::new(Self::frozen(parts, length)))
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
        if self.disposed {
            return;
        }
        for child in self.children.iter_mut() {
            child.dispose();
        }
        trace!("disposed list of {} streams", self.children.len());
        self.children.clear();
        self.length = 0;
        self.position = 0;
        self.disposed = true;
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn as_list(&self) -> Option<&BitStreamList> {
        Some(self)
    }

    fn as_list_mut(&mut self) -> Option<&mut BitStreamList> {
        Some(self)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.check_disposed()?;

        let mut cursor = self.position;
        let mut offset = 0u64;
        let mut out = 0usize;
        let mut glue = 0u64;
        let mut bits = 0usize;

        for child in self.children.iter_mut() {
            if out == buf.len() {
                break;
            }
            let end = offset + child.length_bits()?;
            if cursor >= end {
                offset = end;
                continue;
            }

            let saved = child.position_bits()?;
            child.set_position_bits(cursor - offset)?;
            let step = read_child(child.as_mut(), &mut buf[out..], &mut glue, &mut bits);
            child.set_position_bits(saved)?;
            let (emitted, consumed) = step?;

            out += emitted;
            cursor += consumed;
            offset = end;
        }

        // Bits collected for an incomplete byte were not delivered.
        self.position = cursor - bits as u64;
        Ok(out)
    }

    fn write(&mut self, _buf: &[u8]) -> Result<()> {
        self.check_disposed()?;
        Err(BitStreamError::unsupported("write"))
    }
}

/// Depth-first leaf iterator returned by [`BitStreamList::leaves`].
///
/// Each call to `leaves` starts a fresh walk.
#[derive(Debug)]
pub struct Leaves<'a> {
    stack: Vec<slice::Iter<'a, Box<dyn BitStream>>>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = &'a dyn BitStream;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let Some(child) = self.stack.last_mut()?.next() else {
                self.stack.pop();
                continue;
            };
            match child.as_list() {
                Some(list) => self.stack.push(list.children.iter()),
                None => return Some(child.as_ref()),
            }
        }
    }
}

/// Mutable depth-first leaf iterator returned by [`BitStreamList::leaves_mut`].
#[derive(Debug)]
pub struct LeavesMut<'a> {
    stack: Vec<slice::IterMut<'a, Box<dyn BitStream>>>,
}

impl<'a> Iterator for LeavesMut<'a> {
    type Item = &'a mut dyn BitStream;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let Some(child) = self.stack.last_mut()?.next() else {
                self.stack.pop();
                continue;
            };
            if child.as_list().is_some() {
                if let Some(list) = child.as_list_mut() {
                    self.stack.push(list.children.iter_mut());
                }
            } else {
                return Some(child.as_mut());
            }
        }
    }
}
