//! The Job State: the closed catalog of 1..96 numbered datapoints populated
//! once per print job from the job document, plus the two flags derived
//! from it (`uom_type`, `lbl_wtgrams`).

use std::collections::HashMap;

/// A single datapoint value. The catalog's semantic types (integer,
/// fixed-point currency/weight, short string, date, time) all collapse to
/// one of these three storage shapes; the Variable Resolver applies the
/// per-datapoint formatting rule on read.
#[derive(Debug, Clone, PartialEq)]
pub enum DatapointValue {
    Text(String),
    Int(i64),
    Float(f64),
}

impl DatapointValue {
    pub fn as_text(&self) -> String {
        match self {
            DatapointValue::Text(s) => s.clone(),
            DatapointValue::Int(i) => i.to_string(),
            DatapointValue::Float(f) => f.to_string(),
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            DatapointValue::Float(f) => Some(*f),
            DatapointValue::Int(i) => Some(*i as f64),
            DatapointValue::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            DatapointValue::Int(i) => Some(*i),
            DatapointValue::Float(f) => Some(*f as i64),
            DatapointValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Derived unit-of-measure class. Computed once from datapoints 4 (`guom`)
/// and 94 at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UomType {
    Weigh,
    Pcs,
}

impl UomType {
    pub fn from_guom(guom: &str) -> Self {
        match guom.trim().to_lowercase().as_str() {
            "kg" | "g" => UomType::Weigh,
            "pcs" => UomType::Pcs,
            _ => UomType::Pcs,
        }
    }
}

/// A single per-item line used by the Barcode Content Engine's `*`
/// expansion code. Not part of the closed 1..96 scalar catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub plu_id: i64,
    pub weight_or_quantity: f64,
    pub guom: String,
}

/// One job's worth of resolved state: the numbered datapoint catalog plus
/// the raw job document (kept for `~V`'s by-name fallback lookup) and the
/// derived flags.
#[derive(Debug, Clone)]
pub struct JobState {
    datapoints: HashMap<i64, DatapointValue>,
    pub raw: serde_json::Value,
    pub items: Vec<LineItem>,
    pub uom_type: UomType,
    pub lbl_wtgrams: bool,
    /// Wall-clock time the job started rendering; backs the barcode
    /// Content Engine's "current date/time" and "bill date/time" codes,
    /// which the source reads from the system clock rather than the job
    /// document.
    pub render_time: chrono::DateTime<chrono::Local>,
    /// Packed/sellby/useby date codes render `DDMMYYYY` when set, `DDMMYY`
    /// otherwise.
    pub long_date_flag: bool,
    /// Packed/sellby/useby time codes render `HHMMSS` when set, `HHMM`
    /// otherwise.
    pub long_time_flag: bool,
    /// Scale tare slot number (barcode code `z`); not part of the 1..96
    /// scalar catalog, sourced directly from the job document.
    pub tare_no: Option<i64>,

    // Newly-numbered catalog members (74..96), grounded on the original
    // source's field ordering; held alongside 1..73 in `datapoints` but
    // listed here for reference:
    //   74 image_no, 75 image_file_name, 76 label_date_time,
    //   77 label_design_no, 78 label_design_file_name, 80 scale_no,
    //   81 scale_name, 84 current_datetime, 85 no_of_items,
    //   86 total_amount, 90 total_tax, 91 total_discount, 93 total_price,
    //   95 barcode_flag, 96 bill_text.
}

impl JobState {
    pub fn new(raw: serde_json::Value) -> Self {
        Self {
            datapoints: HashMap::new(),
            raw,
            items: Vec::new(),
            render_time: chrono::Local::now(),
            long_date_flag: false,
            long_time_flag: false,
            tare_no: None,
            uom_type: UomType::Pcs,
            lbl_wtgrams: true,
        }
    }

    pub fn set(&mut self, id: i64, value: DatapointValue) {
        self.datapoints.insert(id, value);
    }

    pub fn set_text(&mut self, id: i64, value: impl Into<String>) {
        self.set(id, DatapointValue::Text(value.into()));
    }

    pub fn set_float(&mut self, id: i64, value: f64) {
        self.set(id, DatapointValue::Float(value));
    }

    pub fn set_int(&mut self, id: i64, value: i64) {
        self.set(id, DatapointValue::Int(value));
    }

    pub fn get(&self, id: i64) -> Option<&DatapointValue> {
        self.datapoints.get(&id)
    }

    pub fn get_text(&self, id: i64) -> Option<String> {
        self.datapoints.get(&id).map(DatapointValue::as_text)
    }

    pub fn get_float(&self, id: i64) -> Option<f64> {
        self.datapoints.get(&id).and_then(DatapointValue::as_float)
    }

    pub fn get_int(&self, id: i64) -> Option<i64> {
        self.datapoints.get(&id).and_then(DatapointValue::as_int)
    }

    /// Look up a value in the raw job document by field name — the fallback
    /// `~V` takes when its literal isn't a resolvable numeric datapoint id.
    pub fn lookup_by_name(&self, name: &str) -> Option<String> {
        self.raw
            .get(name)
            .or_else(|| self.raw.get("data").and_then(|d| d.get(name)))
            .map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string().trim_matches('"').to_string(),
            })
    }
}

/// Numeric datapoint ids used directly by the Barcode Content Engine that
/// fall outside the Variable Resolver's explicitly-formatted subset. Named
/// here so callers don't scatter magic numbers.
pub mod dp {
    pub const PLU_ID: i64 = 1;
    pub const PLU_CODE: i64 = 3;
    pub const GUOM: i64 = 4;
    pub const UNIT_PRICE: i64 = 5;
    pub const SPL_UP: i64 = 6;
    pub const TARE_WT: i64 = 8;
    pub const GROUP_NO: i64 = 19;
    pub const DEPARTMENT_NO: i64 = 21;
    pub const CURRENT_NET_WEIGHT: i64 = 69;
    pub const CURRENT_TARE_WEIGHT: i64 = 70;
    pub const CURRENT_GROSS_WEIGHT: i64 = 71;
    pub const WEIGHT_OR_QUANTITY: i64 = 72;
    pub const ACTUAL_UNIT_PRICE: i64 = 73;
    pub const SCALE_NAME: i64 = 81;
    pub const NO_OF_ITEMS: i64 = 85;
    pub const TOTAL_AMOUNT: i64 = 86;
    pub const TOTAL_QUANTITY: i64 = 87;
    pub const TOTAL_WEIGHT: i64 = 88;
    pub const TOTAL_TAX: i64 = 90;
    pub const TOTAL_DISCOUNT: i64 = 91;
    pub const TOTAL_PRICE: i64 = 93;
    pub const BARCODE_FLAG: i64 = 95;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uom_type_classifies_weigh_and_pcs() {
        assert_eq!(UomType::from_guom("kg"), UomType::Weigh);
        assert_eq!(UomType::from_guom("g"), UomType::Weigh);
        assert_eq!(UomType::from_guom("pcs"), UomType::Pcs);
        assert_eq!(UomType::from_guom("unknown"), UomType::Pcs);
    }

    #[test]
    fn get_text_falls_back_across_representations() {
        let mut job = JobState::new(serde_json::json!({}));
        job.set_float(5, 12.5);
        assert_eq!(job.get_text(5), Some("12.5".to_string()));
        assert_eq!(job.get_int(5), Some(12));
    }

    #[test]
    fn lookup_by_name_checks_nested_data_object() {
        let job = JobState::new(serde_json::json!({"data": {"custom_field": "hello"}}));
        assert_eq!(job.lookup_by_name("custom_field"), Some("hello".to_string()));
        assert_eq!(job.lookup_by_name("missing"), None);
    }
}
