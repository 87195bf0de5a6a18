//! Command Encoder: typed primitives that emit exact ESC/POS-style byte
//! sequences for the 432-dot label printer.
//!
//! `ESC`=0x1B, `GS`=0x1D, `FS`=0x1C, `LF`=0x0A. All multi-byte integer
//! fields are little-endian 16-bit pairs unless noted otherwise. The
//! encoder only builds bytes — it never touches the serial device; the Job
//! Orchestrator flushes the finished buffer to the printer FD.

const ESC: u8 = 0x1B;
const GS: u8 = 0x1D;
const FS: u8 = 0x1C;
const LF: u8 = 0x0A;
const CAN: u8 = 0x18;

fn le16(v: i32) -> (u8, u8) {
    let v = v.clamp(0, u16::MAX as i32) as u16;
    (v as u8, (v >> 8) as u8)
}

/// Accumulates a byte-exact command stream for one print job.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn push(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    // -- 4.1 Command Encoder primitives ----------------------------------

    /// `ESC @` — reset the printer to its power-on state.
    pub fn reset(&mut self) -> &mut Self {
        self.push(&[ESC, 0x40])
    }

    /// `FS L w_lo w_hi h_lo h_hi`
    pub fn set_label_size(&mut self, w_dots: i32, h_dots: i32) -> &mut Self {
        let (wl, wh) = le16(w_dots);
        let (hl, hh) = le16(h_dots);
        self.push(&[FS, b'L', wl, wh, hl, hh])
    }

    /// `ESC S`
    pub fn enter_page_mode(&mut self) -> &mut Self {
        self.push(&[ESC, b'S'])
    }

    /// `ESC W` + 8 bytes: x, y, dx, dy each little-endian 16-bit.
    pub fn set_window(&mut self, x: i32, y: i32, dx: i32, dy: i32) -> &mut Self {
        let (xl, xh) = le16(x);
        let (yl, yh) = le16(y);
        let (dxl, dxh) = le16(dx);
        let (dyl, dyh) = le16(dy);
        self.push(&[ESC, b'W', xl, xh, yl, yh, dxl, dxh, dyl, dyh])
    }

    /// `ESC T n`, n in {0,1,2,3} for 0/90/180/270 degrees.
    pub fn set_orientation(&mut self, code: u8) -> &mut Self {
        self.push(&[ESC, b'T', code])
    }

    /// `ESC M n`, 0 selects the 12x24 font, 1 selects 9x17.
    pub fn set_font(&mut self, n: u8) -> &mut Self {
        self.push(&[ESC, b'M', n])
    }

    /// `GS ! ((xmag-1)<<4)|(ymag-1)`
    pub fn set_magnification(&mut self, xmag: u8, ymag: u8) -> &mut Self {
        let xmag = xmag.clamp(1, 6);
        let ymag = ymag.clamp(1, 6);
        let code = ((xmag - 1) << 4) | (ymag - 1);
        self.push(&[GS, b'!', code])
    }

    /// `ESC 3 n`
    pub fn set_line_spacing(&mut self, dots: u8) -> &mut Self {
        self.push(&[ESC, b'3', dots])
    }

    /// `GS B n`
    pub fn set_invert(&mut self, on: bool) -> &mut Self {
        self.push(&[GS, b'B', on as u8])
    }

    /// `ESC E n`
    pub fn set_emphasize(&mut self, on: bool) -> &mut Self {
        self.push(&[ESC, b'E', on as u8])
    }

    /// `ESC - n`
    pub fn set_underline(&mut self, on: bool) -> &mut Self {
        self.push(&[ESC, 0x2D, on as u8])
    }

    /// `ESC $` + little-endian 16-bit dots.
    pub fn set_position_x(&mut self, dots: i32) -> &mut Self {
        let (lo, hi) = le16(dots);
        self.push(&[ESC, b'$', lo, hi])
    }

    /// `GS $` + little-endian 16-bit dots.
    pub fn set_position_y(&mut self, dots: i32) -> &mut Self {
        let (lo, hi) = le16(dots);
        self.push(&[GS, b'$', lo, hi])
    }

    /// `ESC { dir` followed by `copies` repetitions of `GS 0x0C`, then `ESC S`.
    pub fn print_and_advance(&mut self, copies: u8, dir: u8) -> &mut Self {
        self.push(&[ESC, b'{', dir]);
        for _ in 0..copies {
            self.push(&[GS, 0x0C]);
        }
        self.push(&[ESC, b'S'])
    }

    /// Raw text bytes, as-is.
    pub fn text(&mut self, s: &str) -> &mut Self {
        self.push(s.as_bytes())
    }

    /// Raw bytes, unconditionally (used by `~c`).
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.push(bytes)
    }

    pub fn newline(&mut self) -> &mut Self {
        self.push(&[LF])
    }

    pub fn cancel(&mut self) -> &mut Self {
        self.push(&[CAN])
    }

    // -- barcode opcodes (§4.4 Barcode) -----------------------------------

    /// `GS w n`
    pub fn set_barcode_module_width(&mut self, dots: u8) -> &mut Self {
        self.push(&[GS, b'w', dots])
    }

    /// `GS h n`
    pub fn set_barcode_height(&mut self, dots: u8) -> &mut Self {
        self.push(&[GS, b'h', dots])
    }

    /// `GS f n`
    pub fn set_barcode_font(&mut self, n: u8) -> &mut Self {
        self.push(&[GS, b'f', n])
    }

    /// `GS H n`, n maps N=0, A=1, B=2, '2'=3.
    pub fn set_hri_position(&mut self, n: u8) -> &mut Self {
        self.push(&[GS, b'H', n])
    }

    /// `GS k 2 <12 digits> 0x00` — EAN-13.
    pub fn emit_ean13(&mut self, digits: &str) -> &mut Self {
        self.push(&[GS, b'k', 2]);
        self.push(digits.as_bytes());
        self.push(&[0x00])
    }

    /// `GS k 73 <len> {<subset><data>` — CODE-128.
    pub fn emit_code128(&mut self, subset: char, data: &str) -> &mut Self {
        let payload_len = (data.len() + 2) as u8;
        self.push(&[GS, b'k', 73, payload_len, b'{', subset as u8]);
        self.push(data.as_bytes())
    }

    /// The three `GS (k` headers plus payload for a QR code.
    pub fn emit_qr(&mut self, data: &str) -> &mut Self {
        self.push(&[GS, b'(', b'k', 3, 0, 49, 69, 49]);
        self.push(&[GS, b'(', b'k', 3, 0, 49, 67, 6]);
        let sl = (data.len() + 3) as i32;
        let (sl_lo, sl_hi) = le16(sl);
        self.push(&[GS, b'(', b'k', sl_lo as u8, sl_hi as u8, 49, 80, 48]);
        self.push(data.as_bytes())
    }

    // -- shape opcodes (§4.4 Rectangle / Circle) --------------------------

    /// `FS R x0_lo x0_hi y0_lo y0_hi x1_lo x1_hi y1_lo y1_hi thickness`
    pub fn draw_rectangle(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, thickness: u8) -> &mut Self {
        let (x0l, x0h) = le16(x0);
        let (y0l, y0h) = le16(y0);
        let (x1l, x1h) = le16(x1);
        let (y1l, y1h) = le16(y1);
        self.push(&[FS, b'R', x0l, x0h, y0l, y0h, x1l, x1h, y1l, y1h, thickness])
    }

    /// `FS c x_lo x_hi y_lo y_hi radius_dots thickness_dots`
    pub fn draw_circle(&mut self, x: i32, y: i32, radius_dots: u8, thickness_dots: u8) -> &mut Self {
        let (xl, xh) = le16(x);
        let (yl, yh) = le16(y);
        self.push(&[FS, b'c', xl, xh, yl, yh, radius_dots, thickness_dots])
    }

    // -- raster opcode (§4.4 Bitmap) ---------------------------------------

    /// `GS v '0' magnify bytes_per_row_lo bytes_per_row_hi h_lo h_hi` followed
    /// by the raster bytes.
    pub fn raster_image(&mut self, magnify: u8, bytes_per_row: i32, h_dots: i32, bitmap: &[u8]) -> &mut Self {
        let (bpl, bph) = le16(bytes_per_row);
        let (hl, hh) = le16(h_dots);
        self.push(&[GS, b'v', b'0', magnify, bpl, bph, hl, hh]);
        self.push(bitmap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magnification_matches_documented_example() {
        let mut e = Encoder::new();
        e.set_magnification(3, 2);
        assert_eq!(e.as_bytes(), &[GS, b'!', 0x21]);
    }

    #[test]
    fn set_label_size_is_little_endian() {
        let mut e = Encoder::new();
        e.set_label_size(432, 320);
        assert_eq!(e.as_bytes(), &[FS, b'L', 0x90, 0x01, 0x40, 0x01]);
    }

    #[test]
    fn print_and_advance_repeats_form_feed() {
        let mut e = Encoder::new();
        e.print_and_advance(2, 1);
        assert_eq!(
            e.as_bytes(),
            &[ESC, b'{', 1, GS, 0x0C, GS, 0x0C, ESC, b'S']
        );
    }

    #[test]
    fn ean13_terminates_with_null() {
        let mut e = Encoder::new();
        e.emit_ean13("000000001234");
        assert_eq!(e.as_bytes().last(), Some(&0x00));
        assert_eq!(&e.as_bytes()[..3], &[GS, b'k', 2]);
    }

    #[test]
    fn window_emits_eight_bytes_after_opcode() {
        let mut e = Encoder::new();
        e.set_window(1, 2, 3, 4);
        assert_eq!(e.len(), 10);
        assert_eq!(&e.as_bytes()[0..2], &[ESC, b'W']);
    }
}
