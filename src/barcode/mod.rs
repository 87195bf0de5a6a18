//! Barcode Content Engine: expands a width/code pattern string into the
//! payload bytes for EAN-13 / CODE-128 / QR symbologies.

pub mod symbology;

use crate::core::job::dp;
use crate::core::JobState;
use crate::errors::{DriverError, Result};
use chrono::{Datelike, Timelike};

/// Format a numeric value zero-padded to `width`, but widen instead of
/// truncating digits when the natural representation is longer — the
/// "numeric-overflow rule" in §4.3.
fn fmt_numeric(value: f64, width: usize) -> String {
    let rounded = value.round() as i64;
    let natural = rounded.to_string();
    if natural.len() >= width {
        natural
    } else {
        format!("{:0width$}", rounded, width = width)
    }
}

fn truncate_left_justified(s: &str, width: usize) -> String {
    s.chars().take(width).collect()
}

fn right_justify(s: &str, width: usize) -> String {
    if s.len() >= width {
        s.to_string()
    } else {
        format!("{:>width$}", s, width = width)
    }
}

fn date_code(date: chrono::NaiveDate, long: bool) -> String {
    if long {
        date.format("%d%m%Y").to_string()
    } else {
        date.format("%d%m%y").to_string()
    }
}

fn time_code(time: chrono::NaiveTime, long: bool) -> String {
    if long {
        time.format("%H%M%S").to_string()
    } else {
        time.format("%H%M").to_string()
    }
}

/// Parse a packed-date-string datapoint (`YYYYMMDD`) into a `NaiveDate`,
/// falling back to the epoch date when absent or malformed.
fn parse_packed_date(s: Option<String>) -> chrono::NaiveDate {
    s.and_then(|s| chrono::NaiveDate::parse_from_str(&s, "%Y%m%d").ok())
        .unwrap_or_else(|| chrono::NaiveDate::from_ymd_opt(1970, 1, 1).unwrap())
}

fn parse_packed_time(s: Option<String>) -> chrono::NaiveTime {
    s.and_then(|s| chrono::NaiveTime::parse_from_str(&s, "%H%M%S").ok())
        .unwrap_or_else(|| chrono::NaiveTime::from_hms_opt(0, 0, 0).unwrap())
}

/// Scan `pattern` left to right (spaces ignored) and synthesize the payload
/// string described by the width/code mini-language.
pub fn build_payload(pattern: &str, job: &JobState) -> Result<String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0usize;
    let mut out = String::new();

    while i < chars.len() {
        if chars[i].is_whitespace() {
            i += 1;
            continue;
        }

        let width_start = i;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        let width: usize = if i > width_start {
            chars[width_start..i].iter().collect::<String>().parse().unwrap_or(1)
        } else {
            1
        };

        if i >= chars.len() {
            return Err(DriverError::DirectiveMalformed(
                "barcode pattern ended with a dangling width".to_string(),
            ));
        }
        let code = chars[i];
        i += 1;

        let guom = job.get_text(dp::GUOM).unwrap_or_default();
        let is_kg = guom.eq_ignore_ascii_case("kg");
        let is_pcs = guom.eq_ignore_ascii_case("pcs");

        match code {
            'A' => out.push_str(&fmt_numeric(job.get_float(dp::TOTAL_AMOUNT).unwrap_or(0.0) * 100.0, width)),
            'B' => out.push_str(&fmt_numeric(job.render_time.day() as f64, width)),
            'b' => out.push_str(&fmt_numeric(job.render_time.month() as f64, width)),
            'C' => out.push_str(&truncate_left_justified(&job.get_text(dp::PLU_CODE).unwrap_or_default(), width)),
            'D' => out.push_str(&fmt_numeric(job.get_float(dp::DEPARTMENT_NO).unwrap_or(0.0), width)),
            'E' => out.push_str(&fmt_numeric(job.get_float(dp::TOTAL_WEIGHT).unwrap_or(0.0) * 1000.0, width)),
            'F' => out.push_str(&truncate_left_justified(&job.get_text(dp::BARCODE_FLAG).unwrap_or_default(), width)),
            'G' => out.push_str(&fmt_numeric(job.get_float(dp::GROUP_NO).unwrap_or(0.0), width)),
            'H' => out.push_str(&fmt_numeric(job.get_float(dp::TOTAL_QUANTITY).unwrap_or(0.0), width)),
            'I' => out.push_str(&fmt_numeric(job.get_float(dp::TOTAL_TAX).unwrap_or(0.0) * 100.0, width)),
            'J' => out.push_str(&fmt_numeric(job.get_float(dp::TOTAL_DISCOUNT).unwrap_or(0.0) * 100.0, width)),
            'K' => out.push_str(&date_code(job.render_time.date_naive(), false)),
            'k' => out.push_str(&date_code(job.render_time.date_naive(), false)),
            'L' => out.push_str(&fmt_numeric(job.get_float(dp::PLU_ID).unwrap_or(0.0), width)),
            'M' => out.push_str(&truncate_left_justified(&guom, width)),
            'N' => out.push_str(&fmt_numeric(job.get_float(dp::NO_OF_ITEMS).unwrap_or(0.0), width)),
            'O' => out.push_str(&fmt_numeric(job.get_float(27).unwrap_or(0.0), width)),
            'P' => out.push_str(&fmt_numeric(job.get_float(dp::TOTAL_PRICE).unwrap_or(0.0) * 100.0, width)),
            'Q' => {
                let v = if is_pcs { job.get_float(dp::WEIGHT_OR_QUANTITY).unwrap_or(0.0) } else { 0.0 };
                out.push_str(&fmt_numeric(v, width));
            }
            'S' | 's' => {
                let spl = job.get_float(dp::SPL_UP).unwrap_or(0.0);
                let effective = if spl > 0.0 { spl } else { job.get_float(dp::UNIT_PRICE).unwrap_or(0.0) };
                out.push_str(&fmt_numeric(effective * 100.0, width));
            }
            'U' => out.push_str(&fmt_numeric(job.get_float(dp::UNIT_PRICE).unwrap_or(0.0) * 100.0, width)),
            'V' | 'v' => out.push_str(&fmt_numeric(job.get_float(dp::WEIGHT_OR_QUANTITY).unwrap_or(0.0) * 1000.0, width)),
            'W' => {
                let v = if is_kg { job.get_float(dp::WEIGHT_OR_QUANTITY).unwrap_or(0.0) * 1000.0 } else { 0.0 };
                out.push_str(&fmt_numeric(v, width));
            }
            'w' => out.push_str(&fmt_numeric(job.get_float(dp::TARE_WT).unwrap_or(0.0) * 1000.0, width)),
            'X' => out.push_str(&fmt_numeric(job.get_float(dp::WEIGHT_OR_QUANTITY).unwrap_or(0.0) * 1000.0, width)),
            'x' => out.push_str(&fmt_numeric(job.get_float(dp::CURRENT_GROSS_WEIGHT).unwrap_or(0.0) * 1000.0, width)),
            'Y' => out.push_str(&time_code(job.render_time.time(), false)),
            'y' => out.push_str(&time_code(job.render_time.time(), false)),
            'Z' => out.push_str(&truncate_left_justified(&job.get_text(dp::SCALE_NAME).unwrap_or_default(), width)),
            'z' => out.push_str(&fmt_numeric(job.tare_no.unwrap_or(0) as f64, width)),
            '{' | '/' | '}' => {
                let id = match code {
                    '{' => 10,
                    '/' => 12,
                    _ => 14,
                };
                let date = parse_packed_date(job.get_text(id));
                out.push_str(&date_code(date, job.long_date_flag));
            }
            '[' | '\\' | ']' => {
                let id = match code {
                    '[' => 11,
                    '\\' => 13,
                    _ => 15,
                };
                let time = parse_packed_time(job.get_text(id));
                out.push_str(&time_code(time, job.long_time_flag));
            }
            '%' => {
                // Consume the next literal run: stops at whitespace or a
                // digit, since a digit there starts the following token's
                // width prefix.
                let start = i;
                while i < chars.len() && !chars[i].is_whitespace() && !chars[i].is_ascii_digit() {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                out.push_str(&truncate_left_justified(&literal, width));
            }
            '*' => {
                // Read a second width for the per-item quantity field.
                let w2_start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let w2: usize = if i > w2_start {
                    chars[w2_start..i].iter().collect::<String>().parse().unwrap_or(1)
                } else {
                    1
                };
                for item in &job.items {
                    let qty = if item.guom.eq_ignore_ascii_case("kg") {
                        item.weight_or_quantity * 1000.0
                    } else {
                        item.weight_or_quantity
                    };
                    out.push_str(&format!("{},{}\r\n", item.plu_id, fmt_numeric(qty, w2)));
                }
            }
            other => out.push_str(&right_justify(&other.to_string(), width)),
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::JobState;

    fn job_with(setup: impl FnOnce(&mut JobState)) -> JobState {
        let mut job = JobState::new(serde_json::json!({}));
        setup(&mut job);
        job
    }

    #[test]
    fn plu_id_and_total_price_round_trip() {
        let job = job_with(|j| {
            j.set_int(dp::PLU_ID, 42);
            j.set_float(dp::TOTAL_PRICE, 12.30);
        });
        assert_eq!(build_payload("5L6P", &job).unwrap(), "00042001230");
    }

    #[test]
    fn literal_percent_then_bill_month() {
        let job = job_with(|j| {
            j.set_float(dp::TOTAL_AMOUNT, 9.99);
        });
        let result = build_payload("5A13%foo1Bb", &job).unwrap();
        assert!(result.starts_with("00999foo"));
    }

    #[test]
    fn ean13_pattern_zero_pads_plu_id() {
        let job = job_with(|j| j.set_int(dp::PLU_ID, 1234));
        assert_eq!(build_payload("12L", &job).unwrap(), "000000001234");
    }

    #[test]
    fn qr_literal_passthrough() {
        let job = JobState::new(serde_json::json!({}));
        assert_eq!(build_payload("%hello", &job).unwrap(), "hello");
    }
}
