//! Integration tests for stream trees.
//!
//! These tests build small protocol-like trees out of leaves and nested
//! lists and drive them through the public API only.

use bitweave_core::prelude::*;
use std::io::{Read, Seek, SeekFrom};

/// packet
/// ├── flags   3 bits  101
/// ├── header
/// │   ├── len   13 bits 0000000001101
/// │   └── kind  0x42
/// └── body    "Hello"
fn packet() -> BitStreamList {
    let mut flags = BitBuffer::new().with_name("flags");
    flags.write_bits(0b101, 3).expect("flags");
    flags.set_position_bits(0).expect("rewind");

    let mut len = BitBuffer::new().with_name("len");
    len.write_bits(13, 13).expect("len");
    len.set_position_bits(0).expect("rewind");

    let mut header = BitStreamList::new().with_name("header");
    header.push(Box::new(len)).expect("push");
    header
        .push(Box::new(BitBuffer::from_bytes(vec![0x42]).with_name("kind")))
        .expect("push");

    let mut packet = BitStreamList::new().with_name("packet");
    packet.push(Box::new(flags)).expect("push");
    packet.push(Box::new(header)).expect("push");
    packet
        .push(Box::new(BitBuffer::from_bytes(b"Hello".to_vec()).with_name("body")))
        .expect("push");
    packet
}

const PACKET_BYTES: [u8; 8] = [0b1010_0000, 0b0000_1101, 0x42, b'H', b'e', b'l', b'l', b'o'];

// ============================================================================
// Reading
// ============================================================================

#[test]
fn test_packet_reads_as_flat_bytes() {
    let mut packet = packet();
    assert_eq!(packet.length_bits().unwrap(), 64);
    assert_eq!(packet.length().unwrap(), 8);
    assert_eq!(packet.read_to_vec().unwrap(), PACKET_BYTES);
    assert_eq!(packet.position_bits().unwrap(), 64);
}

#[test]
fn test_packet_through_io_adapter() {
    let mut packet = packet();
    let mut stream = ByteStream::new(&mut packet);

    stream.seek(SeekFrom::Start(3)).unwrap();
    let mut body = String::new();
    stream.read_to_string(&mut body).unwrap();
    assert_eq!(body, "Hello");

    stream.seek(SeekFrom::End(-6)).unwrap();
    let mut kind = [0u8; 1];
    stream.read_exact(&mut kind).unwrap();
    assert_eq!(kind[0], 0x42);
}

#[test]
fn test_bit_cursor_inside_nested_list() {
    let mut packet = packet();
    packet.seek_bits(3, SeekOrigin::Begin).unwrap();
    assert_eq!(packet.read_bits(13).unwrap(), (13, 13));
    assert_eq!(packet.read_bits(8).unwrap(), (0x42, 8));
}

// ============================================================================
// Names and offsets
// ============================================================================

#[test]
fn test_names_round_trip_offsets() {
    let packet = packet();
    for (name, offset) in [("flags", 0), ("header", 3), ("kind", 16), ("body", 24)] {
        assert_eq!(packet.try_get_position(name).unwrap(), Some(offset), "{name}");
    }

    // The innermost named element wins.
    assert_eq!(packet.try_get_name(3).unwrap(), Some("len"));
    assert_eq!(packet.try_get_name(15).unwrap(), Some("len"));
    assert_eq!(packet.try_get_name(16).unwrap(), Some("kind"));
    assert_eq!(packet.try_get_name(63).unwrap(), Some("body"));
    assert_eq!(packet.try_get_position("missing").unwrap(), None);
    assert_eq!(packet.try_get_name(64).unwrap(), None);
}

#[test]
fn test_unnamed_leaf_reports_enclosing_list() {
    let mut inner = BitStreamList::new().with_name("opaque");
    inner
        .push(Box::new(BitBuffer::from_bytes(b"xyz".to_vec())))
        .unwrap();
    let mut outer = BitStreamList::new();
    outer
        .push(Box::new(BitBuffer::from_bytes(vec![0]).with_name("tag")))
        .unwrap();
    outer.push(Box::new(inner)).unwrap();

    assert_eq!(outer.try_get_name(4).unwrap(), Some("tag"));
    assert_eq!(outer.try_get_name(20).unwrap(), Some("opaque"));
}

// ============================================================================
// Slicing
// ============================================================================

#[test]
fn test_slice_spanning_nested_boundaries() {
    let mut packet = packet();
    packet.set_position_bits(3).unwrap();

    let mut slice = packet.slice_bits(29).unwrap();
    assert_eq!(packet.position_bits().unwrap(), 32);
    assert_eq!(slice.length_bits().unwrap(), 29);

    assert_eq!(slice.read_bits(13).unwrap(), (13, 13));
    assert_eq!(slice.read_bits(8).unwrap(), (0x42, 8));
    assert_eq!(slice.read_bits(8).unwrap(), (b'H' as u64, 8));
    assert_eq!(slice.read_bits(8).unwrap(), (0, 0));
}

#[test]
fn test_slice_survives_source_mutation() {
    let mut packet = packet();
    packet.set_position_bits(24).unwrap();
    let mut slice = packet.slice_bits(40).unwrap();

    packet
        .update(2, |body| {
            body.set_position_bits(0).unwrap();
            body.write(b"Jelly").unwrap();
        })
        .unwrap();
    packet.set_position_bits(24).unwrap();
    assert_eq!(packet.read_to_vec().unwrap(), b"Jelly");
    assert_eq!(slice.read_to_vec().unwrap(), b"Hello");
}

#[test]
fn test_slice_is_frozen() {
    let mut packet = packet();
    let mut slice = packet.slice_bits(16).unwrap();
    let frozen = slice.as_list_mut().expect("composite slice");

    assert!(frozen.is_read_only());
    assert!(matches!(
        frozen.push(Box::new(BitBuffer::new())),
        Err(BitStreamError::Unsupported { .. })
    ));
    assert!(matches!(
        frozen.clear(),
        Err(BitStreamError::Unsupported { .. })
    ));
}

// ============================================================================
// Derived algorithms on composites
// ============================================================================

#[test]
fn test_index_of_across_nested_children() {
    let mut packet = packet();
    let mut needle = BitBuffer::from_bytes(vec![0x42, b'H']);
    assert_eq!(packet.index_of(&mut needle, 0).unwrap(), Some(16));

    let mut needle = BitBuffer::from_bytes(b"lo".to_vec());
    assert_eq!(packet.index_of(&mut needle, 0).unwrap(), Some(48));
    assert_eq!(packet.index_of(&mut needle, 49).unwrap(), None);
    assert_eq!(packet.position_bits().unwrap(), 0);
}

#[test]
fn test_copy_composite_into_buffer() {
    let mut packet = packet();
    packet.set_position_bits(3).unwrap();

    let mut out = BitBuffer::new();
    packet.copy_to(&mut out).unwrap();
    assert_eq!(out.length_bits().unwrap(), 61);

    out.set_position_bits(0).unwrap();
    assert_eq!(out.read_bits(13).unwrap(), (13, 13));
}

#[test]
fn test_pad_then_read() {
    let mut list = BitStreamList::new();
    list.push(Box::new(BitBuffer::from_bytes(vec![0xAB]))).unwrap();
    list.push(Box::new(BitBuffer::from_bits(vec![0xE0], 3).unwrap()))
        .unwrap();

    let mut padded = pad_bits(Box::new(list)).unwrap();
    assert_eq!(padded.length_bits().unwrap(), 16);
    assert_eq!(padded.read_to_vec().unwrap(), vec![0xAB, 0xE0]);
}

#[test]
fn test_grow_composite_source() {
    let mut list = BitStreamList::new();
    list.push(Box::new(BitBuffer::from_bytes(b"ab".to_vec()))).unwrap();
    list.push(Box::new(BitBuffer::from_bytes(b"c".to_vec()))).unwrap();
    list.set_position_bits(8).unwrap();

    let mut grown = grow_to(&mut list, 10).unwrap();
    assert_eq!(grown.read_to_vec().unwrap(), b"abcabcabca");
    assert_eq!(list.position_bits().unwrap(), 8);
}

// ============================================================================
// Dispose
// ============================================================================

#[test]
fn test_dispose_tree() {
    let mut packet = packet();
    packet.dispose();
    assert!(packet.is_disposed());
    assert!(matches!(packet.read_to_vec(), Err(BitStreamError::Disposed)));
    assert!(matches!(
        packet.try_get_position("body"),
        Err(BitStreamError::Disposed)
    ));
    assert!(matches!(packet.len(), Err(BitStreamError::Disposed)));
}
