//! `~R` rectangle and `~C` circle emitters.
//!
//! Grounded on `send_rectangle()` / `send_circle()`: both reset to the full
//! label window, force orientation 0, set invert mode once for the life of
//! the directive (never reset back), then hand off to the `FS R` / `FS c`
//! opcodes. Rotation is folded into the coordinates — computed in
//! millimetres, before the dots conversion — rather than the printer's own
//! orientation register.

use crate::core::{mm_to_dots, LabelGeometry};
use crate::encoder::Encoder;

#[derive(Debug, Clone)]
pub struct RectParams {
    pub x_mm: f64,
    pub y_mm: f64,
    pub w_mm: f64,
    pub h_mm: f64,
    pub angle: i32,
    pub thickness_mm: f64,
    pub mode: char,
}

pub fn emit_rectangle(geo: &LabelGeometry, dots_per_mm: u32, params: &RectParams) -> Vec<u8> {
    let x0_mm = params.x_mm + geo.x_offset_mm;
    let y0_mm = params.y_mm + geo.y_offset_mm;

    let (xloc, yloc, dx, dy) = match params.angle {
        90 => (x0_mm, y0_mm - params.w_mm, params.h_mm, params.w_mm),
        180 => (x0_mm - params.w_mm, y0_mm - params.h_mm, params.w_mm, params.h_mm),
        270 => (x0_mm - params.h_mm, y0_mm, params.h_mm, params.w_mm),
        _ => (x0_mm, y0_mm, params.w_mm, params.h_mm),
    };

    let x0 = mm_to_dots(xloc, dots_per_mm);
    let y0 = mm_to_dots(yloc, dots_per_mm);
    let x1 = mm_to_dots(xloc + dx, dots_per_mm) - 1;
    let y1 = mm_to_dots(yloc + dy, dots_per_mm) - 1;
    let lwidth = mm_to_dots(params.thickness_mm, dots_per_mm) as u8;
    let invert = params.mode == 'I';

    let (fw_x, fw_y, fw_dx, fw_dy) = geo.full_window(dots_per_mm);

    let mut enc = Encoder::new();
    enc.set_window(fw_x, fw_y, fw_dx, fw_dy);
    enc.set_orientation(0);
    enc.set_invert(invert);
    enc.draw_rectangle(x0, y0, x1, y1, lwidth);
    enc.into_bytes()
}

#[derive(Debug, Clone)]
pub struct CircleParams {
    pub x_mm: f64,
    pub y_mm: f64,
    pub radius_mm: f64,
    pub thickness_mm: f64,
    pub mode: char,
}

pub fn emit_circle(geo: &LabelGeometry, dots_per_mm: u32, params: &CircleParams) -> Vec<u8> {
    let xloc = mm_to_dots(params.x_mm + geo.x_offset_mm, dots_per_mm);
    let yloc = mm_to_dots(params.y_mm + geo.y_offset_mm, dots_per_mm);
    let radius = mm_to_dots(params.radius_mm, dots_per_mm) as u8;
    let thickness = mm_to_dots(params.thickness_mm, dots_per_mm) as u8;
    let invert = params.mode == 'I';

    let (fw_x, fw_y, fw_dx, fw_dy) = geo.full_window(dots_per_mm);

    let mut enc = Encoder::new();
    enc.set_window(fw_x, fw_y, fw_dx, fw_dy);
    enc.set_orientation(0);
    enc.set_invert(invert);
    enc.draw_circle(xloc, yloc, radius, thickness);
    enc.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label() -> LabelGeometry {
        LabelGeometry::new(54.0, 40.0)
    }

    #[test]
    fn rectangle_contains_fs_r_opcode() {
        let params = RectParams {
            x_mm: 5.0,
            y_mm: 5.0,
            w_mm: 20.0,
            h_mm: 10.0,
            angle: 0,
            thickness_mm: 0.25,
            mode: 'N',
        };
        let bytes = emit_rectangle(&label(), 8, &params);
        assert!(bytes.windows(2).any(|w| w == [0x1C, b'R']));
        assert!(bytes.windows(3).any(|w| w == [0x1D, b'B', 0]));
    }

    #[test]
    fn rectangle_invert_mode_sets_invert_byte() {
        let params = RectParams {
            x_mm: 5.0,
            y_mm: 5.0,
            w_mm: 20.0,
            h_mm: 10.0,
            angle: 0,
            thickness_mm: 0.25,
            mode: 'I',
        };
        let bytes = emit_rectangle(&label(), 8, &params);
        assert!(bytes.windows(3).any(|w| w == [0x1D, b'B', 1]));
    }

    #[test]
    fn rectangle_rotated_90_shifts_origin_up_by_width() {
        let params = RectParams {
            x_mm: 5.0,
            y_mm: 5.0,
            w_mm: 20.0,
            h_mm: 10.0,
            angle: 90,
            thickness_mm: 0.25,
            mode: 'N',
        };
        let bytes = emit_rectangle(&label(), 8, &params);
        assert!(bytes.windows(2).any(|w| w == [0x1C, b'R']));
    }

    #[test]
    fn circle_contains_fs_c_opcode() {
        let params = CircleParams {
            x_mm: 10.0,
            y_mm: 10.0,
            radius_mm: 5.0,
            thickness_mm: 0.25,
            mode: 'N',
        };
        let bytes = emit_circle(&label(), 8, &params);
        assert!(bytes.windows(2).any(|w| w == [0x1C, b'c']));
    }
}
