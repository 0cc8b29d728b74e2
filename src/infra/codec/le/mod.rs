//! Little-endian field extraction for bus payloads.
//!
//! Both J1939 and J1587 transmit multi-byte integers least significant
//! byte first, and both use an all-bits-set field to mean "parameter
//! not available". The `available_*` readers fold that sentinel into
//! `None` so decode handlers never store an unknown over a known value.

/// Read a `u16` at `offset`, or `None` when the buffer is too short.
#[inline]
pub fn u16_at(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset + 2)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

/// Read a `u32` at `offset`, or `None` when the buffer is too short.
#[inline]
pub fn u32_at(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Read a `u16` field, treating the all-ones sentinel as unavailable.
#[inline]
pub fn available_u16(data: &[u8], offset: usize) -> Option<u16> {
    match u16_at(data, offset)? {
        u16::MAX => None,
        value => Some(value),
    }
}

/// Read a `u32` field, treating the all-ones sentinel as unavailable.
#[inline]
pub fn available_u32(data: &[u8], offset: usize) -> Option<u32> {
    match u32_at(data, offset)? {
        u32::MAX => None,
        value => Some(value),
    }
}

/// Read the 3-byte PGN field used by transport control frames.
#[inline]
pub fn pgn_at(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 3)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], 0]))
}

/// Write a PGN as the 3-byte little-endian field of a control frame.
///
/// # Panics
/// Panics when `buf` is shorter than `offset + 3`; control frames are
/// always 8 bytes so callers pass fixed buffers.
#[inline]
pub fn put_pgn(buf: &mut [u8], offset: usize, pgn: u32) {
    buf[offset] = (pgn & 0xFF) as u8;
    buf[offset + 1] = ((pgn >> 8) & 0xFF) as u8;
    buf[offset + 2] = ((pgn >> 16) & 0xFF) as u8;
}
