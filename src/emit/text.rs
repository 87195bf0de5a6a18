//! `~T` / `~V` text emitter: positioned, justified, multi-line text with
//! per-line windows sized to the rotated glyph box.
//!
//! Grounded on `send_text()`: both directives funnel into one layout
//! routine once `~V` has resolved its literal-or-variable field down to the
//! actual string to print. `data_length` only clamps the box used for
//! justification math — the printed text itself is the full post-offset
//! string, split on `\n`, exactly as the source leaves it.

use crate::core::{mm_to_dots, LabelGeometry};
use crate::encoder::Encoder;

#[derive(Debug, Clone)]
pub struct TextParams {
    pub x_mm: f64,
    pub y_mm: f64,
    pub angle: i32,
    pub font: i32,
    pub xmul: f64,
    pub ymul: f64,
    pub text: String,
    pub data_length: i32,
    pub offset: i32,
    pub justify: char,
    pub lines: i32,
    pub line_spacing_mm: f64,
    pub mode: String,
}

fn orientation_code(angle: i32) -> u8 {
    match angle {
        90 => 1,
        180 => 2,
        270 => 3,
        _ => 0,
    }
}

/// Lay out and emit `params.text` per §4.4 Text. Returns the bytes for this
/// directive; the interpreter only forwards them to the printer once the
/// whole directive has parsed and laid out successfully, so a malformed
/// directive never partially writes.
pub fn emit(geo: &LabelGeometry, dots_per_mm: u32, params: &TextParams) -> Vec<u8> {
    if params.lines < 1 || params.text.is_empty() {
        return Vec::new();
    }

    let xmag = (params.xmul.round() as i32).clamp(1, 6) as u8;
    let ymag = (params.ymul.round() as i32).clamp(1, 6) as u8;

    let (base_w, base_h) = if params.font == 1 { (12, 24) } else { (9, 17) };
    let esc_m: u8 = if params.font == 1 { 0 } else { 1 };

    let full_chars: Vec<char> = params.text.chars().collect();
    let offset = params.offset.max(0) as usize;
    if offset >= full_chars.len() {
        return Vec::new();
    }
    let ptext: String = full_chars[offset..].iter().collect();

    let remaining_len = full_chars.len() - offset;
    let width_len = if params.data_length > 0 {
        (params.data_length as usize).min(remaining_len)
    } else {
        remaining_len
    };

    let char_width = base_w * xmag as i32;
    let char_height = base_h * ymag as i32;

    let text_width_dots = char_width * width_len as i32;
    let box_width_dots = if params.data_length > 0 {
        char_width * params.data_length
    } else {
        text_width_dots
    };

    let mut spacing = mm_to_dots(params.line_spacing_mm, dots_per_mm);
    if spacing < char_height {
        spacing = char_height;
    }

    let mut xpos = mm_to_dots(params.x_mm + geo.x_offset_mm, dots_per_mm);
    let ypos = mm_to_dots(params.y_mm + geo.y_offset_mm, dots_per_mm);

    match params.justify {
        'C' => xpos += (box_width_dots - text_width_dots) / 2,
        'R' => xpos += box_width_dots - text_width_dots,
        _ => {}
    }

    let esc_t = orientation_code(params.angle);

    let mut enc = Encoder::new();
    enc.set_orientation(esc_t);
    enc.set_font(esc_m);
    enc.set_magnification(xmag, ymag);
    enc.set_line_spacing(spacing.clamp(0, 255) as u8);

    if params.mode.contains('E') {
        enc.set_emphasize(true);
    }
    if params.mode.contains('U') {
        enc.set_underline(true);
    }
    if params.mode.contains('I') {
        enc.set_invert(true);
    }

    let margin_x = 2 * xmag as i32;
    let margin_y = 2 * ymag as i32;

    for (i, line) in ptext.splitn(params.lines.max(1) as usize, '\n').enumerate() {
        let this_len = line.chars().count() as i32;
        let y_i = ypos + i as i32 * spacing;

        let dx = char_width * this_len + margin_x;

        let (x0, y0, win_dx, win_dy) = match params.angle {
            90 => (xpos, y_i - (dx - 1), spacing * params.lines + margin_y, dx),
            180 => {
                let dy = char_height + margin_y;
                (xpos - (dx - 1), y_i - (dy - 1), dx, spacing * params.lines + margin_y)
            }
            270 => (
                xpos - (spacing * params.lines - 1),
                y_i,
                spacing * params.lines + margin_y,
                dx,
            ),
            _ => (xpos, y_i, dx, spacing * params.lines + margin_y),
        };

        enc.set_window(x0, y0, win_dx, win_dy);
        enc.text(line);
    }

    enc.newline();
    enc.set_emphasize(false);
    enc.set_underline(false);
    enc.set_invert(false);
    enc.set_magnification(1, 1);
    enc.set_line_spacing(32);

    enc.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label() -> LabelGeometry {
        LabelGeometry::new(54.0, 40.0)
    }

    fn base_params() -> TextParams {
        TextParams {
            x_mm: 5.0,
            y_mm: 5.0,
            angle: 0,
            font: 2,
            xmul: 2.0,
            ymul: 2.0,
            text: "400".to_string(),
            data_length: 0,
            offset: 0,
            justify: 'L',
            lines: 1,
            line_spacing_mm: 3.0,
            mode: String::new(),
        }
    }

    #[test]
    fn single_line_text_ends_with_reset_sequence() {
        let bytes = emit(&label(), 8, &base_params());
        assert!(bytes.windows(3).any(|w| w == [0x1D, b'!', 0x11]));
        assert!(bytes.ends_with(&[0x1B, b'3', 32]));
        assert!(bytes.windows(3).any(|w| w == b"400"));
    }

    #[test]
    fn empty_text_emits_nothing() {
        let mut params = base_params();
        params.text = String::new();
        assert!(emit(&label(), 8, &params).is_empty());
    }

    #[test]
    fn multiline_text_emits_one_window_per_line() {
        let mut params = base_params();
        params.text = "ABC\nDEF".to_string();
        params.lines = 2;
        let bytes = emit(&label(), 8, &params);
        let window_opcode_count = bytes.windows(2).filter(|w| *w == [0x1B, b'W']).count();
        assert_eq!(window_opcode_count, 2);
        assert!(bytes.windows(3).any(|w| w == b"ABC"));
        assert!(bytes.windows(3).any(|w| w == b"DEF"));
    }

    #[test]
    fn offset_past_end_of_text_emits_nothing() {
        let mut params = base_params();
        params.offset = 10;
        assert!(emit(&label(), 8, &params).is_empty());
    }
}
