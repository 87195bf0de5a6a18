//! Control directives that aren't positioned drawables: label setup
//! (`~S`/`~s`), the clear-area directive (`~A`), raw passthrough (`~c`),
//! the sleep/DTR/poll directives (`~Y`/`~I`/`~e`), and print/advance (`~P`).

use std::time::Duration;

use crate::core::{mm_to_dots, LabelGeometry};
use crate::encoder::Encoder;
use crate::errors::{DriverError, Result};
use crate::transport::Port;

/// `~S width_mm,height_mm` — establishes label geometry and resets the
/// window to the full label.
pub fn label_size(width_mm: f64, height_mm: f64, dots_per_mm: u32) -> (LabelGeometry, Vec<u8>) {
    let geo = LabelGeometry::new(width_mm, height_mm);
    let (x, y, dx, dy) = geo.full_window(dots_per_mm);

    let mut enc = Encoder::new();
    enc.set_label_size(geo.width_dots(dots_per_mm), geo.height_dots(dots_per_mm));
    enc.enter_page_mode();
    enc.set_window(x, y, dx, dy);

    (geo, enc.into_bytes())
}

/// `~s spacing_mm` — sets the default inter-line spacing used by `~T`/`~V`
/// when no per-directive spacing is given.
pub fn line_spacing(spacing_mm: f64, dots_per_mm: u32) -> Vec<u8> {
    let dots = mm_to_dots(spacing_mm, dots_per_mm).clamp(0, 255) as u8;
    let mut enc = Encoder::new();
    enc.set_line_spacing(dots);
    enc.into_bytes()
}

/// `~A x_mm,y_mm,w_mm,h_mm` — cancel whatever is buffered for a sub-window,
/// then restore the full-label window so subsequent directives aren't left
/// clipped.
pub fn clear_area(geo: &LabelGeometry, dots_per_mm: u32, x_mm: f64, y_mm: f64, w_mm: f64, h_mm: f64) -> Vec<u8> {
    let x = mm_to_dots(x_mm + geo.x_offset_mm, dots_per_mm);
    let y = mm_to_dots(y_mm + geo.y_offset_mm, dots_per_mm);
    let dx = mm_to_dots(w_mm, dots_per_mm);
    let dy = mm_to_dots(h_mm, dots_per_mm);

    let mut enc = Encoder::new();
    enc.set_window(x, y, dx, dy);
    enc.cancel();
    let (fx, fy, fdx, fdy) = geo.full_window(dots_per_mm);
    enc.set_window(fx, fy, fdx, fdy);
    enc.into_bytes()
}

/// `~c b0,b1,...` — up to 64 comma-separated byte values passed straight to
/// the printer, for escape sequences this interpreter has no opinion about.
pub fn raw_passthrough(fields: &[String]) -> Result<Vec<u8>> {
    if fields.len() > 64 {
        return Err(DriverError::DirectiveMalformed(
            "~c carries at most 64 raw bytes".to_string(),
        ));
    }
    let mut bytes = Vec::with_capacity(fields.len());
    for f in fields {
        let v: u8 = f
            .trim()
            .parse()
            .map_err(|_| DriverError::DirectiveMalformed(format!("~c byte value not numeric: {f}")))?;
        bytes.push(v);
    }
    let mut enc = Encoder::new();
    enc.raw(&bytes);
    Ok(enc.into_bytes())
}

/// `~Y ms` — pause the interpreter, clamped to the device's documented
/// sleep range.
pub async fn sleep(ms: u64) {
    let clamped = ms.clamp(5, 5000);
    tokio::time::sleep(Duration::from_millis(clamped)).await;
}

/// `~I level` — DC2 '~' level, clamped 60-140.
pub fn set_dtr_level(level: i32) -> Vec<u8> {
    let clamped = level.clamp(60, 140) as u8;
    let mut enc = Encoder::new();
    enc.raw(&[0x12, b'~', clamped]);
    enc.into_bytes()
}

/// `~e ms` — poll the printer for a status line within the given timeout.
/// A timeout is advisory, never fatal: the caller logs it and moves on.
pub async fn poll_read(port: &dyn Port, ms: u64) -> Result<Option<String>> {
    let clamped = ms.clamp(5, 5000);
    port.read_line(clamped).await
}

/// `~P copies,dir` — print and advance the label stock.
pub fn print_and_advance(copies: u8, dir: u8) -> Vec<u8> {
    let mut enc = Encoder::new();
    enc.print_and_advance(copies, dir);
    enc.into_bytes()
}
