//! Job document loader: the bridge between the external JSON collaborator
//! (out of scope per §1 — "the JSON parser that supplies the per-job data
//! document") and the closed 1..96 datapoint catalog.

use crate::core::{DatapointValue, JobState, LineItem, UomType};
use crate::errors::{DriverError, Result};

/// Canonical field-name -> datapoint-id table. Gaps in the id sequence
/// (e.g. 68) are reserved: the catalog is closed over 1..96 but not every
/// id carries a named field in the source document.
const NAME_TO_ID: &[(&str, i64)] = &[
    ("plu_id", 1),
    ("plu_name", 2),
    ("plu_code", 3),
    ("guom", 4),
    ("unit_price", 5),
    ("spl_up", 6),
    ("quantity", 7),
    ("tare_wt", 8),
    ("fixed_price", 9),
    ("packed_date", 10),
    ("packed_time", 11),
    ("sellby_date", 12),
    ("sellby_time", 13),
    ("useby_date", 14),
    ("useby_time", 15),
    ("plu_minimum", 16),
    ("plu_target", 17),
    ("plu_maximum", 18),
    ("group_no", 19),
    ("group_name", 20),
    ("department_no", 21),
    ("department_name", 22),
    ("tax_no", 23),
    ("tax_name", 24),
    ("tax_type", 25),
    ("tax_rate", 26),
    ("operator_no", 27),
    ("operator_name", 28),
    ("header1", 29),
    ("header2", 30),
    ("header3", 31),
    ("header4", 32),
    ("header5", 33),
    ("footer1", 34),
    ("footer2", 35),
    ("footer3", 36),
    ("footer4", 37),
    ("footer5", 38),
    ("discount_no", 39),
    ("discount_name", 40),
    ("discount_type", 41),
    ("package_type", 42),
    ("discount_first_target", 43),
    ("discount_first_value", 44),
    ("discount_second_target", 45),
    ("discount_second_value", 46),
    ("discount_days", 47),
    ("discount_start", 48),
    ("discount_end", 49),
    ("tare_name", 50),
    ("tare_value", 51),
    ("storage_temp", 52),
    ("barcode_name", 53),
    ("barcode_type", 54),
    ("barcode_data", 55),
    ("bc_field1", 56),
    ("bc_field1_condition", 57),
    ("bc_field1_shift", 58),
    ("bc_field2", 59),
    ("bc_field2_condition", 60),
    ("bc_field2_shift", 61),
    ("ingredient_no", 62),
    ("ingredient_name", 63),
    ("message_no", 64),
    ("ingredients_text", 65),
    ("message_name", 66),
    ("message_text", 67),
    ("current_net_weight", 69),
    ("current_tare_weight", 70),
    ("current_gross_weight", 71),
    ("weight_or_quantity", 72),
    ("actual_unit_price", 73),
    ("image_no", 74),
    ("image_file_name", 75),
    ("label_date_time", 76),
    ("label_design_no", 77),
    ("label_design_file_name", 78),
    ("bill_no", 79),
    ("scale_no", 80),
    ("scale_name", 81),
    ("scale_capacity", 82),
    ("scale_accuracy", 83),
    ("current_datetime", 84),
    ("no_of_items", 85),
    ("total_amount", 86),
    ("total_quantity", 87),
    ("total_weight", 88),
    ("total_qty_or_weight", 89),
    ("total_tax", 90),
    ("total_discount", 91),
    ("today_bill_no", 92),
    ("total_price", 93),
    ("uom_label", 94),
    ("barcode_flag", 95),
    ("bill_text", 96),
];

fn value_for<'a>(raw: &'a serde_json::Value, name: &str) -> Option<&'a serde_json::Value> {
    raw.get(name).or_else(|| raw.get("data").and_then(|d| d.get(name)))
}

fn store_value(job: &mut JobState, id: i64, value: &serde_json::Value) {
    match value {
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                job.set(id, DatapointValue::Int(i));
            } else if let Some(f) = n.as_f64() {
                job.set(id, DatapointValue::Float(f));
            }
        }
        serde_json::Value::String(s) => job.set(id, DatapointValue::Text(s.clone())),
        serde_json::Value::Bool(b) => job.set(id, DatapointValue::Text(b.to_string())),
        _ => {}
    }
}

/// Parse the per-job JSON document into a [`JobState`]: populates the
/// numbered catalog, applies the `spl_up`-over-`unit_price` override, and
/// derives `uom_type` / `lbl_wtgrams`.
pub fn load(raw: serde_json::Value, default_lbl_wtgrams: bool) -> Result<JobState> {
    if !raw.is_object() {
        return Err(DriverError::JobDocumentInvalid(
            "job document must be a JSON object".to_string(),
        ));
    }

    let mut job = JobState::new(raw.clone());

    for (name, id) in NAME_TO_ID {
        if let Some(v) = value_for(&raw, name) {
            store_value(&mut job, *id, v);
        }
    }

    // §9 Open Question resolution: convert_label reassigns the nested
    // data.spl_up field into unit_price before the interpreter runs. We
    // replicate that here, once, rather than in the resolver.
    if let Some(spl_up) = raw.get("data").and_then(|d| d.get("spl_up")).and_then(|v| v.as_f64()) {
        if spl_up > 0.0 {
            job.set_float(5, spl_up);
        }
    }

    let guom = job.get_text(4).unwrap_or_default();
    job.uom_type = if !guom.is_empty() {
        UomType::from_guom(&guom)
    } else {
        UomType::from_guom(&job.get_text(94).unwrap_or_default())
    };

    job.lbl_wtgrams = raw
        .get("lbl_wtgrams")
        .and_then(|v| v.as_bool())
        .unwrap_or(default_lbl_wtgrams);

    job.long_date_flag = raw.get("long_date").and_then(|v| v.as_bool()).unwrap_or(false);
    job.long_time_flag = raw.get("long_time").and_then(|v| v.as_bool()).unwrap_or(false);
    job.tare_no = raw.get("tare_no").and_then(|v| v.as_i64());

    if let Some(items) = raw.get("items").and_then(|v| v.as_array()) {
        for item in items {
            let plu_id = item.get("plu").and_then(|v| v.as_i64()).unwrap_or(0);
            let weight_or_quantity = item.get("weight_or_quantity").and_then(|v| v.as_f64()).unwrap_or(0.0);
            let guom = item
                .get("uom")
                .and_then(|v| v.as_str())
                .unwrap_or("pcs")
                .to_string();
            job.items.push(LineItem { plu_id, weight_or_quantity, guom });
        }
    }

    Ok(job)
}
