//! Pixel format conversions for internal icons.

use image::{Rgba, RgbaImage};

use crate::{Error, Result};

/// ARGB4444 to RGBA8888.
#[inline]
pub(crate) fn argb4444(px: u16) -> Rgba<u8> {
    let expand = |n: u16| ((n & 0xF) as u8) * 0x11;
    Rgba([expand(px >> 8), expand(px >> 4), expand(px), expand(px >> 12)])
}

/// RGB565 to opaque RGBA8888.
#[inline]
pub(crate) fn rgb565(px: u16) -> Rgba<u8> {
    let r = ((px >> 11) & 0x1F) as u8;
    let g = ((px >> 5) & 0x3F) as u8;
    let b = (px & 0x1F) as u8;
    Rgba([(r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2), 0xFF])
}

/// Linear 4bpp paletted image, high nibble first.
pub(crate) fn decode_ci4(width: u32, height: u32, data: &[u8], palette: &[Rgba<u8>; 16]) -> Result<RgbaImage> {
    let needed = (width * height / 2) as usize;
    Error::check_len(needed, data.len())?;
    Ok(RgbaImage::from_fn(width, height, |x, y| {
        let idx = (y * width + x) as usize;
        let byte = data[idx / 2];
        let nibble = if idx % 2 == 0 { byte >> 4 } else { byte & 0x0F };
        palette[nibble as usize]
    }))
}

/// Linear 1bpp image, most significant bit first; set bits are black.
pub(crate) fn decode_mono(width: u32, height: u32, data: &[u8]) -> Result<RgbaImage> {
    let needed = (width * height / 8) as usize;
    Error::check_len(needed, data.len())?;
    Ok(RgbaImage::from_fn(width, height, |x, y| {
        let idx = (y * width + x) as usize;
        if data[idx / 8] & (0x80 >> (idx % 8)) != 0 {
            Rgba([0, 0, 0, 0xFF])
        } else {
            Rgba([0xFF, 0xFF, 0xFF, 0xFF])
        }
    }))
}

/// 3DS tiled RGB565: 8x8 tiles in row order, pixels within a tile in
/// Morton order.
pub(crate) fn decode_n3ds_tiled_rgb565(width: u32, height: u32, data: &[u8]) -> Result<RgbaImage> {
    let needed = (width * height * 2) as usize;
    Error::check_len(needed, data.len())?;
    let tiles_per_row = width / 8;
    let mut img = RgbaImage::new(width, height);
    for i in 0..(width * height) {
        let tile = i / 64;
        let within = i % 64;
        let (tx, ty) = (tile % tiles_per_row, tile / tiles_per_row);
        let (px, py) = morton_decode(within);
        let off = (i * 2) as usize;
        let value = u16::from_le_bytes([data[off], data[off + 1]]);
        img.put_pixel(tx * 8 + px, ty * 8 + py, rgb565(value));
    }
    Ok(img)
}

/// Split a 6-bit Morton index into x (even bits) and y (odd bits).
fn morton_decode(i: u32) -> (u32, u32) {
    let x = (i & 1) | ((i >> 1) & 2) | ((i >> 2) & 4);
    let y = ((i >> 1) & 1) | ((i >> 2) & 2) | ((i >> 3) & 4);
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_conversions() {
        assert_eq!(argb4444(0xF00F), Rgba([0xFF, 0x00, 0xFF, 0xFF]));
        assert_eq!(argb4444(0x0000), Rgba([0, 0, 0, 0]));
        assert_eq!(rgb565(0xFFFF), Rgba([0xFF, 0xFF, 0xFF, 0xFF]));
        assert_eq!(rgb565(0xF800), Rgba([0xFF, 0, 0, 0xFF]));
    }

    #[test]
    fn test_morton() {
        assert_eq!(morton_decode(0), (0, 0));
        assert_eq!(morton_decode(1), (1, 0));
        assert_eq!(morton_decode(2), (0, 1));
        assert_eq!(morton_decode(3), (1, 1));
        assert_eq!(morton_decode(4), (2, 0));
        assert_eq!(morton_decode(63), (7, 7));
    }

    #[test]
    fn test_ci4_nibble_order() {
        let mut palette = [Rgba([0, 0, 0, 0]); 16];
        palette[1] = Rgba([1, 1, 1, 1]);
        palette[2] = Rgba([2, 2, 2, 2]);
        let img = decode_ci4(2, 1, &[0x12], &palette).unwrap();
        assert_eq!(img.get_pixel(0, 0), &Rgba([1, 1, 1, 1]));
        assert_eq!(img.get_pixel(1, 0), &Rgba([2, 2, 2, 2]));
        assert!(decode_ci4(4, 4, &[0u8; 2], &palette).is_err());
    }

    #[test]
    fn test_mono() {
        let img = decode_mono(8, 1, &[0x80]).unwrap();
        assert_eq!(img.get_pixel(0, 0)[0], 0);
        assert_eq!(img.get_pixel(1, 0)[0], 0xFF);
    }
}
