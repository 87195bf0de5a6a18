//! Variable Resolver: maps a numeric datapoint id (1..96) to its formatted
//! text for the Template Interpreter's `~V` directive and the Barcode
//! Content Engine.

use crate::core::{JobState, UomType};

/// Result of a resolve call. `Miss` corresponds to the `UnknownVariable`
/// error kind — the interpreter logs it and substitutes the empty string,
/// it never aborts the job.
pub enum Resolved {
    Value(String),
    Miss,
}

impl Resolved {
    pub fn into_string(self) -> String {
        match self {
            Resolved::Value(s) => s,
            Resolved::Miss => String::new(),
        }
    }
}

fn zero_pad(n: i64, width: usize) -> String {
    format!("{:0width$}", n, width = width)
}

/// `resolve(data_id) -> string` against the closed datapoint catalog.
/// Datapoint ids outside 1..96, or present but with no storable value,
/// resolve as a miss.
pub fn resolve(job: &JobState, data_id: i64) -> Resolved {
    if !(1..=96).contains(&data_id) {
        return Resolved::Miss;
    }

    match data_id {
        1 => Resolved::Value(zero_pad(job.get_int(1).unwrap_or(0), 4)),
        2 | 3 => match job.get_text(data_id) {
            Some(s) => Resolved::Value(s),
            None => Resolved::Miss,
        },
        4 => {
            let guom = job.get_text(4).unwrap_or_default();
            if guom.eq_ignore_ascii_case("pcs") {
                Resolved::Value("PCS".to_string())
            } else {
                let weight = job.get_float(72).unwrap_or(0.0);
                Resolved::Value(if weight < 1.0 { "g".to_string() } else { "kg".to_string() })
            }
        }
        5 => Resolved::Value(format!("{:.2}", job.get_float(5).unwrap_or(0.0))),
        6 => {
            let spl_up = job.get_float(6).unwrap_or(0.0);
            if spl_up > 0.0 {
                Resolved::Value(format!("{:.2}", spl_up))
            } else {
                resolve(job, 5)
            }
        }
        7 => Resolved::Value(zero_pad(job.get_int(7).unwrap_or(0), 2)),
        8 => Resolved::Value(format!("{:.3}", job.get_float(8).unwrap_or(0.0))),
        9 => Resolved::Value(format!("{:.2}", job.get_float(9).unwrap_or(0.0))),
        10..=15 => match job.get_text(data_id) {
            Some(s) => Resolved::Value(s),
            None => Resolved::Miss,
        },
        16..=18 => Resolved::Value(format!("{:.2}", job.get_float(data_id).unwrap_or(0.0))),
        19 => Resolved::Value(zero_pad(job.get_int(19).unwrap_or(0), 3)),
        21 => Resolved::Value(zero_pad(job.get_int(21).unwrap_or(0), 2)),
        43 | 45 => {
            let guom = job.get_text(4).unwrap_or_default();
            let v = job.get_float(data_id).unwrap_or(0.0);
            if guom.eq_ignore_ascii_case("kg") {
                Resolved::Value(format!("{:.2}", v))
            } else {
                Resolved::Value(format!("{:.0}", v))
            }
        }
        44 | 46 => {
            // Both discount slots share one discount_type field (41); there
            // is no separate type per slot.
            let kind = job.get_text(41).unwrap_or_default();
            let v = job.get_float(data_id).unwrap_or(0.0);
            if kind.eq_ignore_ascii_case("flat") {
                Resolved::Value(format!("Rs. {:.2}", v))
            } else {
                Resolved::Value(format!("{:.2}%", v))
            }
        }
        65 => match job.get_text(65) {
            Some(s) => Resolved::Value(s),
            None => Resolved::Miss,
        },
        69 | 70 | 71 => Resolved::Value(format!("{:.3}", job.get_float(data_id).unwrap_or(0.0))),
        72 => {
            let value = job.get_float(72).unwrap_or(0.0);
            match job.uom_type {
                UomType::Weigh if job.lbl_wtgrams && value <= 1.0 => {
                    Resolved::Value(format!("{}", (value * 1000.0).round() as i64))
                }
                UomType::Weigh => Resolved::Value(format!("{:.3}", value)),
                UomType::Pcs => Resolved::Value(format!("{:.0}", value)),
            }
        }
        73 => Resolved::Value(format!("{:.2}", job.get_float(73).unwrap_or(0.0))),
        79 => Resolved::Value(zero_pad(job.get_int(79).unwrap_or(0), 5)),
        82 => Resolved::Value(format!("{:.0}", job.get_float(82).unwrap_or(0.0))),
        83 => Resolved::Value(format!("{:.3}", job.get_float(83).unwrap_or(0.0))),
        87 => Resolved::Value(format!("{:.0}", job.get_float(87).unwrap_or(0.0))),
        88 => Resolved::Value(format!("{:.3}", job.get_float(88).unwrap_or(0.0))),
        89 => {
            let qty = job.get_float(87).unwrap_or(0.0);
            if qty > 0.0 {
                Resolved::Value(format!("{:.0}", job.get_float(89).unwrap_or(0.0)))
            } else {
                Resolved::Value(format!("{:.3}", job.get_float(89).unwrap_or(0.0)))
            }
        }
        92 => Resolved::Value(zero_pad(job.get_int(92).unwrap_or(0), 5)),
        94 => {
            let guom = job.get_text(4).unwrap_or_default();
            Resolved::Value(if guom.eq_ignore_ascii_case("pcs") {
                "PCS".to_string()
            } else {
                "kg".to_string()
            })
        }
        other => match job.get_text(other) {
            Some(s) => Resolved::Value(s),
            None => Resolved::Miss,
        },
    }
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
    fn datapoint_72_weigh_sub_kilo_emits_integer_grams() {
        let job = job_with(|j| {
            j.uom_type = UomType::Weigh;
            j.lbl_wtgrams = true;
            j.set_float(72, 0.350);
        });
        assert_eq!(resolve(&job, 72).into_string(), "350");
    }

    #[test]
    fn datapoint_72_weigh_over_kilo_emits_three_decimals() {
        let job = job_with(|j| {
            j.uom_type = UomType::Weigh;
            j.lbl_wtgrams = true;
            j.set_float(72, 1.250);
        });
        assert_eq!(resolve(&job, 72).into_string(), "1.250");
    }

    #[test]
    fn datapoint_72_pcs_emits_whole_number() {
        let job = job_with(|j| {
            j.uom_type = UomType::Pcs;
            j.set_float(72, 7.0);
        });
        assert_eq!(resolve(&job, 72).into_string(), "7");
    }

    #[test]
    fn datapoint_6_falls_through_to_5_when_not_positive() {
        let job = job_with(|j| {
            j.set_float(5, 200.0);
            j.set_float(6, 0.0);
        });
        assert_eq!(resolve(&job, 6).into_string(), "200.00");
    }

    #[test]
    fn datapoint_6_uses_special_price_when_positive() {
        let job = job_with(|j| {
            j.set_float(5, 200.0);
            j.set_float(6, 150.0);
        });
        assert_eq!(resolve(&job, 6).into_string(), "150.00");
    }

    #[test]
    fn datapoint_1_is_zero_padded_to_four_digits() {
        let job = job_with(|j| j.set_int(1, 42));
        assert_eq!(resolve(&job, 1).into_string(), "0042");
    }

    #[test]
    fn unknown_id_outside_catalog_is_a_miss() {
        let job = JobState::new(serde_json::json!({}));
        assert!(matches!(resolve(&job, 200), Resolved::Miss));
    }
}
