//! `~B` barcode emitter: resolves the content payload via the Barcode
//! Content Engine, picks a symbology, and emits the bar/QR data plus the
//! optional field labels beneath it.
//!
//! Grounded on `send_barcode()`: clear text mode, reset to the full label
//! window, fold rotation into the x/y coordinates rather than relying on
//! the printer's own orientation register for positioning math, then an
//! optional pair of field labels gated by [`FieldCondition`].

use crate::barcode::build_payload;
use crate::barcode::symbology::{select, Symbology};
use crate::core::{mm_to_dots, JobState, LabelGeometry};
use crate::encoder::Encoder;
use crate::errors::Result;
use crate::storage::BarcodeTemplate;

#[derive(Debug, Clone)]
pub struct BarcodeParams {
    pub x_mm: f64,
    pub y_mm: f64,
    pub angle: i32,
    pub module_width_mm: f64,
    pub height_mm: f64,
    pub data_length: i32,
    pub hri: char,
    pub justify: char,
}

fn hri_code(hri: char) -> u8 {
    match hri {
        'B' => 2,
        'A' => 1,
        '2' => 3,
        _ => 0,
    }
}

/// `L<n>` anchors `n` modules left of the barcode's own (unrotated,
/// unjustified) x position; anything else anchors `n` modules past its
/// right edge.
fn compute_shift(base_x_dots: i32, shift: &Option<String>, module_width_dots: i32, payload_len: usize) -> i32 {
    let Some(s) = shift.as_deref().filter(|s| s.len() >= 2) else {
        return base_x_dots + module_width_dots * payload_len as i32;
    };
    let n: i32 = s[1..].trim().parse().unwrap_or(0);
    if &s[0..1] == "L" {
        base_x_dots - n * module_width_dots
    } else {
        base_x_dots + module_width_dots * (payload_len as i32 + n)
    }
}

/// Build the directive's bytes. `template` is the single barcode-template
/// row resolved once per job and reused for every `~B` in the template body.
pub fn emit(
    geo: &LabelGeometry,
    dots_per_mm: u32,
    job: &JobState,
    template: &BarcodeTemplate,
    params: &BarcodeParams,
) -> Result<Vec<u8>> {
    let mut payload = build_payload(&template.data, job)?;
    if params.data_length > 0 && (params.data_length as usize) < payload.chars().count() {
        payload = payload.chars().take(params.data_length as usize).collect();
    }
    if payload.is_empty() {
        return Ok(Vec::new());
    }

    let symbology = select(&payload, &template.barcode_type);

    let module_width_dots = mm_to_dots(params.module_width_mm, dots_per_mm).clamp(1, 255);
    let barcode_h_dots = mm_to_dots(params.height_mm, dots_per_mm);
    let barcode_width_dots = payload.chars().count() as i32 * module_width_dots;

    let base_x_dots = mm_to_dots(params.x_mm + geo.x_offset_mm, dots_per_mm);
    let mut xpos = base_x_dots;
    let mut ypos = mm_to_dots(params.y_mm + geo.y_offset_mm, dots_per_mm) + barcode_h_dots;

    match params.justify {
        'C' => xpos -= barcode_width_dots / 2,
        'R' => xpos -= barcode_width_dots,
        _ => {}
    }

    let lbl_w = geo.width_dots(dots_per_mm);
    let lbl_h = geo.height_dots(dots_per_mm);

    let esc_t = match params.angle {
        90 => {
            let temp = xpos;
            xpos = ypos;
            ypos = lbl_h - temp - barcode_width_dots;
            1
        }
        180 => {
            xpos = lbl_w - xpos - barcode_width_dots;
            ypos = lbl_h - ypos - barcode_h_dots;
            2
        }
        270 => {
            let temp = xpos;
            xpos = lbl_w - ypos - barcode_h_dots;
            ypos = temp;
            3
        }
        _ => 0,
    };

    let mut enc = Encoder::new();

    enc.set_font(0);
    enc.set_magnification(1, 1);
    enc.set_emphasize(false);
    enc.raw(&[0x1B, b'a', 0]);
    enc.set_line_spacing(24);

    let (fw_x, fw_y, fw_dx, fw_dy) = geo.full_window(dots_per_mm);
    enc.set_window(fw_x, fw_y, fw_dx, fw_dy);

    enc.set_orientation(esc_t);
    enc.set_position_x(xpos);
    enc.set_position_y(ypos);

    enc.set_barcode_module_width(module_width_dots.clamp(0, 255) as u8);
    enc.set_barcode_height(barcode_h_dots.clamp(0, 255) as u8);
    enc.set_barcode_font(1);
    enc.set_hri_position(hri_code(params.hri));

    match &symbology {
        Symbology::Ean13 { digits } => enc.emit_ean13(digits),
        Symbology::Code128 { subset, data } => enc.emit_code128(*subset, data),
        Symbology::Qr { data } => enc.emit_qr(data),
    };

    enc.set_font(0);
    enc.set_magnification(1, 1);
    enc.set_emphasize(false);

    let weight = job.get_float(crate::core::job::dp::WEIGHT_OR_QUANTITY).unwrap_or(0.0);
    let (weight_only, quantity) = match job.uom_type {
        crate::core::UomType::Weigh => (weight, 0.0),
        crate::core::UomType::Pcs => (0.0, weight),
    };

    let mut field_y_mm = params.y_mm + params.height_mm + 2.0;
    for (text, condition, shift) in [
        (&template.fld1, template.fld1_condition, &template.fld1_shift),
        (&template.fld2, template.fld2_condition, &template.fld2_shift),
    ] {
        if condition.permits(weight_only, quantity) && text.as_deref().map(|s| !s.is_empty()).unwrap_or(false) {
            let label = text.as_deref().unwrap_or("");
            let lx = compute_shift(base_x_dots, shift, module_width_dots, payload.len());
            enc.set_position_x(lx);
            enc.set_position_y(mm_to_dots(field_y_mm, dots_per_mm));
            enc.text(label);
        }
        field_y_mm += 2.0;
    }

    Ok(enc.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::JobState;
    use crate::storage::FieldCondition;

    fn label() -> LabelGeometry {
        LabelGeometry::new(54.0, 40.0)
    }

    fn template() -> BarcodeTemplate {
        BarcodeTemplate {
            barcode_number: 1,
            data: "12L".to_string(),
            barcode_type: "CODE128".to_string(),
            name: "PLU barcode".to_string(),
            fld1: None,
            fld1_condition: FieldCondition::No,
            fld1_shift: None,
            fld2: None,
            fld2_condition: FieldCondition::No,
            fld2_shift: None,
        }
    }

    fn params() -> BarcodeParams {
        BarcodeParams {
            x_mm: 5.0,
            y_mm: 5.0,
            angle: 0,
            module_width_mm: 0.25,
            height_mm: 10.0,
            data_length: 0,
            hri: 'N',
            justify: 'L',
        }
    }

    #[test]
    fn emits_ean13_opcode_for_twelve_digit_plu() {
        let mut job = JobState::new(serde_json::json!({}));
        job.set_int(crate::core::job::dp::PLU_ID, 123456789012);
        let bytes = emit(&label(), 8, &job, &template(), &params()).unwrap();
        assert!(bytes.windows(3).any(|w| w == [0x1D, b'k', 2]));
    }

    #[test]
    fn empty_payload_emits_nothing() {
        let job = JobState::new(serde_json::json!({}));
        let mut tmpl = template();
        tmpl.data = "%".to_string();
        let bytes = emit(&label(), 8, &job, &tmpl, &params()).unwrap();
        assert!(bytes.is_empty());
    }

    #[test]
    fn field_label_renders_when_condition_permits() {
        let mut job = JobState::new(serde_json::json!({}));
        job.set_int(crate::core::job::dp::PLU_ID, 123456789012);
        let mut tmpl = template();
        tmpl.fld1 = Some("Rs. 99.00".to_string());
        tmpl.fld1_condition = FieldCondition::Any;
        let bytes = emit(&label(), 8, &job, &tmpl, &params()).unwrap();
        assert!(bytes.windows(9).any(|w| w == b"Rs. 99.00"));
    }
}
