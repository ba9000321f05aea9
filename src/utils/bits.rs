//! Big-endian bit addressing over byte strings: offset 0 is the most significant bit of byte 0.

/// Largest addressable bit offset, keeping strings within 512 megabytes.
pub const MAX_BIT_OFFSET: u64 = 512 * 1024 * 1024 * 8 - 1;

fn locate(offset: usize) -> (usize, u8) {
    (offset / 8, 7 - (offset % 8) as u8)
}

/// Returns the bit at `offset`. Bits past the end of `data` read as 0.
pub fn get_bit(data: &[u8], offset: usize) -> u8 {
    let (byte, shift) = locate(offset);
    data.get(byte).map_or(0, |byte| (byte >> shift) & 1)
}

/// Sets the bit at `offset` to `bit`, zero-extending `data` as needed, and returns the previous
/// bit.
pub fn set_bit(data: &mut Vec<u8>, offset: usize, bit: u8) -> u8 {
    let (byte, shift) = locate(offset);
    if byte >= data.len() {
        data.resize(byte + 1, 0);
    }

    let previous = (data[byte] >> shift) & 1;
    if bit == 0 {
        data[byte] &= !(1 << shift);
    } else {
        data[byte] |= 1 << shift;
    }

    previous
}
