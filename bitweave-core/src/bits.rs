//! MSB-first bit extraction and deposit over plain byte slices.
//!
//! Every leaf node stores its bits in a byte slice with bit 0 of the stream
//! in the most significant bit of the first byte. These helpers do the
//! unaligned arithmetic so the leaves only have to manage lengths and cursors.
//! Callers are responsible for bounds: `bit_offset + count` must lie within
//! `data.len() * 8`.

/// Mask with the low `count` bits set (`count <= 8`).
#[inline]
fn low_mask(count: usize) -> u8 {
    ((1u16 << count) - 1) as u8
}

/// Read `count` (0-64) bits starting at `bit_offset`.
///
/// The first bit read ends up in the most significant position of the
/// returned value.
#[inline]
pub(crate) fn read_bits(data: &[u8], bit_offset: u64, count: usize) -> u64 {
    debug_assert!(count <= 64, "Cannot read more than 64 bits at once");

    let mut value = 0u64;
    let mut remaining = count;
    let mut pos = bit_offset;

    while remaining > 0 {
        let byte = data[(pos / 8) as usize];
        let avail = 8 - (pos % 8) as usize;
        let take = avail.min(remaining);
        let chunk = (byte >> (avail - take)) & low_mask(take);

        value = (value << take) | chunk as u64;
        remaining -= take;
        pos += take as u64;
    }

    value
}

/// Write the low `count` (0-64) bits of `value` starting at `bit_offset`.
#[inline]
pub(crate) fn write_bits(data: &mut [u8], bit_offset: u64, value: u64, count: usize) {
    debug_assert!(count <= 64, "Cannot write more than 64 bits at once");

    let mut remaining = count;
    let mut pos = bit_offset;

    while remaining > 0 {
        let idx = (pos / 8) as usize;
        let avail = 8 - (pos % 8) as usize;
        let take = avail.min(remaining);
        let shift = avail - take;
        let chunk = ((value >> (remaining - take)) as u8) & low_mask(take);
        let mask = low_mask(take) << shift;

        data[idx] = (data[idx] & !mask) | (chunk << shift);
        remaining -= take;
        pos += take as u64;
    }
}

/// Copy `len_bits` bits starting at `bit_offset` into a fresh, left-aligned
/// byte vector. Bits past `len_bits` in the final byte are zero.
pub(crate) fn copy_bits(data: &[u8], bit_offset: u64, len_bits: u64) -> Vec<u8> {
    let out_len = len_bits.div_ceil(8) as usize;

    let mut out = if bit_offset % 8 == 0 {
        let start = (bit_offset / 8) as usize;
        data[start..start + out_len].to_vec()
    } else {
        let mut out = Vec::with_capacity(out_len);
        let whole = len_bits / 8;
        for i in 0..whole {
            out.push(read_bits(data, bit_offset + i * 8, 8) as u8);
        }
        let tail = (len_bits % 8) as usize;
        if tail > 0 {
            let v = read_bits(data, bit_offset + whole * 8, tail) as u8;
            out.push(v << (8 - tail));
        }
        out
    };

    clear_tail(&mut out, len_bits);
    out
}

/// Zero the bits of the last byte that lie beyond `len_bits`.
#[inline]
pub(crate) fn clear_tail(data: &mut [u8], len_bits: u64) {
    let tail = (len_bits % 8) as usize;
    if tail > 0 {
        if let Some(last) = data.get_mut((len_bits / 8) as usize) {
            *last &= !low_mask(8 - tail);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_bits_msb_first() {
        // 0b10110101
        let data = [0xB5];
        assert_eq!(read_bits(&data, 0, 1), 1);
        assert_eq!(read_bits(&data, 1, 1), 0);
        assert_eq!(read_bits(&data, 0, 3), 0b101);
        assert_eq!(read_bits(&data, 3, 5), 0b10101);
    }

    #[test]
    fn test_read_bits_across_bytes() {
        let data = [0xFF, 0x00, 0xAB];
        assert_eq!(read_bits(&data, 4, 8), 0xF0);
        assert_eq!(read_bits(&data, 12, 12), 0x0AB);
        assert_eq!(read_bits(&data, 0, 24), 0xFF00AB);
    }

    #[test]
    fn test_read_write_64_bits() {
        let mut data = [0u8; 9];
        write_bits(&mut data, 3, 0x0123_4567_89AB_CDEF, 64);
        assert_eq!(read_bits(&data, 3, 64), 0x0123_4567_89AB_CDEF);
        assert_eq!(data[0] >> 5, 0);
    }

    #[test]
    fn test_write_bits_preserves_neighbours() {
        let mut data = [0xFF, 0xFF];
        write_bits(&mut data, 5, 0, 6);
        assert_eq!(data, [0xF8, 0x1F]);
    }

    #[test]
    fn test_copy_bits_unaligned() {
        // "He" = 0x48 0x65, skip 4 bits and take 9
        let data = [0x48, 0x65];
        let out = copy_bits(&data, 4, 9);
        assert_eq!(out, vec![0x86, 0x00]);
    }

    #[test]
    fn test_copy_bits_aligned_masks_tail() {
        let data = [0xAB, 0xFF];
        let out = copy_bits(&data, 0, 13);
        assert_eq!(out, vec![0xAB, 0xF8]);
    }
}
