//! `~d` bitmap emitter: decodes a raw or backslash-hex-escaped raster
//! payload and emits it as a `GS v '0'` raster image.
//!
//! Grounded on `send_bitmap_data()` / `decode_escaped_binary()`. Two
//! surprises worth keeping faithful to the source: the raster is
//! transposed only when `angle == 0` (the non-zero angles rotate the
//! *window*, not the bits), and the escape scheme escapes individual
//! problem bytes (`\`, CR, LF) rather than hex-encoding the whole payload.

use crate::core::{mm_to_dots, LabelGeometry};
use crate::encoder::Encoder;
use crate::errors::{DriverError, Result};

#[derive(Debug, Clone)]
pub struct BitmapParams {
    pub x_mm: f64,
    pub y_mm: f64,
    pub angle: i32,
    pub xmag: i32,
    pub ymag: i32,
    pub width_mm: f64,
    pub height_mm: f64,
    pub mode: String,
}

fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Decode a bitmap payload out of `data`, expecting exactly `expected_len`
/// decoded bytes. Returns `(decoded_bytes, bytes_consumed_from_data)`.
///
/// Raw mode (`data` does not start with `\`): `expected_len` bytes taken
/// verbatim, no escape processing at all.
///
/// Escaped mode (`data` starts with `\`): walked byte by byte — a `\`
/// starts a two-hex-digit escape for one byte, a bare CR/LF is skipped and
/// not counted, anything else is one literal output byte.
pub fn decode_payload(data: &[u8], expected_len: usize) -> Result<(Vec<u8>, usize)> {
    if expected_len == 0 {
        return Ok((Vec::new(), 0));
    }

    if data.first() != Some(&b'\\') {
        if data.len() < expected_len {
            return Err(DriverError::DirectiveMalformed(
                "bitmap payload shorter than declared raster size".to_string(),
            ));
        }
        return Ok((data[..expected_len].to_vec(), expected_len));
    }

    let mut out = Vec::with_capacity(expected_len);
    let mut i = 0usize;
    while out.len() < expected_len {
        if i >= data.len() {
            return Err(DriverError::DirectiveMalformed(
                "escaped bitmap payload ended before raster was complete".to_string(),
            ));
        }
        match data[i] {
            b'\r' | b'\n' => {
                i += 1;
            }
            b'\\' => {
                if i + 2 >= data.len() {
                    return Err(DriverError::DirectiveMalformed(
                        "escaped bitmap payload has a dangling escape".to_string(),
                    ));
                }
                let hi = hex_val(data[i + 1]).ok_or_else(|| {
                    DriverError::DirectiveMalformed("escaped bitmap payload has a non-hex digit".to_string())
                })?;
                let lo = hex_val(data[i + 2]).ok_or_else(|| {
                    DriverError::DirectiveMalformed("escaped bitmap payload has a non-hex digit".to_string())
                })?;
                out.push((hi << 4) | lo);
                i += 3;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    Ok((out, i))
}

/// Transpose a row-major 1bpp raster (`w`x`h`, `bytes_per_row` bytes per
/// row) into column-major layout, swapping width and height.
fn transpose(img: &[u8], w: usize, h: usize, bytes_per_row: usize) -> (Vec<u8>, usize) {
    let t_bytes_per_row = (h + 7) / 8;
    let mut out = vec![0u8; t_bytes_per_row * w];
    for y in 0..h {
        for x in 0..w {
            let src_byte = y * bytes_per_row + x / 8;
            let src_bit = 7 - (x % 8);
            let bit = (img[src_byte] >> src_bit) & 1;
            if bit == 1 {
                let dst_byte = x * t_bytes_per_row + y / 8;
                let dst_bit = 7 - (y % 8);
                out[dst_byte] |= 1 << dst_bit;
            }
        }
    }
    (out, t_bytes_per_row)
}

/// Emit the raster image, returning `(bytes, geometry_warning)`. The
/// warning is set when the requested window had to be clamped to fit the
/// label — the interpreter logs it as a non-fatal `RenderGeometry`
/// diagnostic. `bitmap` must already be the full decoded raster at the
/// pre-transpose `raw_width_dots x raw_height_dots x xmag x ymag` size.
pub fn emit(geo: &LabelGeometry, dots_per_mm: u32, params: &BitmapParams, bitmap: &[u8]) -> (Vec<u8>, bool) {
    if bitmap.iter().all(|b| *b == 0) {
        return (Vec::new(), false);
    }

    let raw_w = mm_to_dots(params.width_mm, dots_per_mm);
    let raw_h = mm_to_dots(params.height_mm, dots_per_mm);
    let mut img_w = raw_w * params.xmag;
    let mut img_h = raw_h * params.ymag;
    let mut bytes_per_row = ((img_w + 7) / 8) as usize;

    let mut img = bitmap.to_vec();

    if params.angle == 0 {
        let (t, t_bpr) = transpose(&img, img_w as usize, img_h as usize, bytes_per_row);
        img = t;
        bytes_per_row = t_bpr;
        std::mem::swap(&mut img_w, &mut img_h);
    }

    let x = mm_to_dots(params.x_mm + geo.x_offset_mm, dots_per_mm);
    let y = mm_to_dots(params.y_mm + geo.y_offset_mm, dots_per_mm);

    let (x0, y0, win_w, win_h) = match params.angle {
        90 => (x, y - (img_w - 1), img_h, img_w),
        180 => (x - (img_w - 1), y - (img_h - 1), img_w, img_h),
        270 => (x - (img_h - 1), y, img_h, img_w),
        _ => (x, y, img_w, img_h),
    };

    let ((cx, cy, cdx, cdy), warned) = geo.clamp_window(x0, y0, win_w, win_h, dots_per_mm);

    let esc_t = match params.angle {
        90 => 1,
        180 => 2,
        270 => 3,
        _ => 0,
    };

    let invert = params.mode.contains('I');
    let emphasize = params.mode.contains('E');
    let underline = params.mode.contains('U');

    let mut enc = Encoder::new();
    enc.set_window(cx, cy, cdx, cdy);
    enc.set_orientation(esc_t);
    enc.set_invert(invert);
    enc.set_emphasize(emphasize);
    enc.set_underline(underline);
    enc.set_position_y(0);

    let magnify = (((params.ymag.clamp(1, 6) - 1) << 4) | (params.xmag.clamp(1, 6) - 1)) as u8;
    enc.raster_image(magnify, bytes_per_row as i32, img_h, &img);

    enc.set_orientation(0);
    enc.set_invert(false);
    enc.set_emphasize(false);
    enc.set_underline(false);

    (enc.into_bytes(), warned)
}
