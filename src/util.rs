//! Low-level byte and text helpers shared by all parsers.
//!
//! Readers take a slice and an offset and return zero for out-of-range
//! reads; callers length-check the structure before decoding it.

/// Read one byte.
#[inline]
pub(crate) fn u8_at(b: &[u8], off: usize) -> u8 {
    b.get(off).copied().unwrap_or(0)
}

#[inline]
fn array_at<const N: usize>(b: &[u8], off: usize) -> [u8; N] {
    let mut out = [0u8; N];
    if let Some(src) = off.checked_add(N).and_then(|end| b.get(off..end)) {
        out.copy_from_slice(src);
    }
    out
}

/// Read a little-endian `u16`.
#[inline]
pub(crate) fn le_u16(b: &[u8], off: usize) -> u16 {
    u16::from_le_bytes(array_at(b, off))
}

/// Read a little-endian `u32`.
#[inline]
pub(crate) fn le_u32(b: &[u8], off: usize) -> u32 {
    u32::from_le_bytes(array_at(b, off))
}

/// Read a little-endian `u64`.
#[inline]
pub(crate) fn le_u64(b: &[u8], off: usize) -> u64 {
    u64::from_le_bytes(array_at(b, off))
}

/// Read a big-endian `u16`.
#[inline]
pub(crate) fn be_u16(b: &[u8], off: usize) -> u16 {
    u16::from_be_bytes(array_at(b, off))
}

/// Read a big-endian `u32`.
#[inline]
pub(crate) fn be_u32(b: &[u8], off: usize) -> u32 {
    u32::from_be_bytes(array_at(b, off))
}

/// Read a big-endian `u64`.
#[inline]
pub(crate) fn be_u64(b: &[u8], off: usize) -> u64 {
    u64::from_be_bytes(array_at(b, off))
}

/// Read a `u16` with caller-supplied endianness.
#[inline]
pub(crate) fn end_u16(b: &[u8], off: usize, le: bool) -> u16 {
    if le { le_u16(b, off) } else { be_u16(b, off) }
}

/// Read a `u32` with caller-supplied endianness.
#[inline]
pub(crate) fn end_u32(b: &[u8], off: usize, le: bool) -> u32 {
    if le { le_u32(b, off) } else { be_u32(b, off) }
}

/// Read a `u64` with caller-supplied endianness.
#[inline]
pub(crate) fn end_u64(b: &[u8], off: usize, le: bool) -> u64 {
    if le { le_u64(b, off) } else { be_u64(b, off) }
}

/// Sub-slice `off..off+len`, clamped to the buffer.
#[inline]
pub(crate) fn bytes_at(b: &[u8], off: usize, len: usize) -> &[u8] {
    let start = off.min(b.len());
    let end = off.saturating_add(len).min(b.len());
    &b[start..end]
}

/// Cut a fixed-size field at its first NUL.
#[inline]
pub(crate) fn until_nul(b: &[u8]) -> &[u8] {
    match b.iter().position(|&c| c == 0) {
        Some(end) => &b[..end],
        None => b,
    }
}

/// Decode a NUL-padded Latin-1 field, trimming trailing spaces.
pub(crate) fn latin1(b: &[u8]) -> String {
    let s: String = until_nul(b).iter().map(|&c| c as char).collect();
    s.trim_end().to_string()
}

/// Decode a NUL-padded field as UTF-8, falling back to Latin-1.
pub(crate) fn utf8_or_latin1(b: &[u8]) -> String {
    let b = until_nul(b);
    match std::str::from_utf8(b) {
        Ok(s) => s.trim_end().to_string(),
        Err(_) => latin1(b),
    }
}

/// Decode a NUL-terminated UTF-16LE field.
pub(crate) fn utf16le(b: &[u8]) -> String {
    let units: Vec<u16> = b
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .take_while(|&u| u != 0)
        .collect();
    String::from_utf16_lossy(&units).trim_end().to_string()
}

/// Decode a packed BCD byte. Returns `None` if either nibble is above 9.
#[inline]
pub(crate) fn bcd(b: u8) -> Option<u8> {
    let (hi, lo) = (b >> 4, b & 0x0F);
    if hi > 9 || lo > 9 {
        return None;
    }
    Some(hi * 10 + lo)
}

/// Uppercase ASCII letter or digit.
#[inline]
pub(crate) fn is_upper_alnum(c: u8) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit()
}
