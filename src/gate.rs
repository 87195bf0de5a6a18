//! Print-Status Gate: a single predicate gating every drawable element on
//! the job's unit-of-measure class and special-price delta.

use crate::core::UomType;

const PRICE_EPSILON: f64 = 0.001;

/// `should_print(status_char) -> bool`. Any status char not in `'0'..='5'`
/// defaults to always-print, matching the source's fallthrough.
pub fn should_print(status_char: char, uom_type: UomType, unit_price: f64, actual_unit_price: f64) -> bool {
    let price_close = (unit_price - actual_unit_price).abs() < PRICE_EPSILON;
    match status_char {
        '0' => false,
        '1' => true,
        '2' => uom_type == UomType::Weigh,
        '3' => uom_type == UomType::Pcs,
        '4' => uom_type == UomType::Weigh && price_close,
        '5' => uom_type == UomType::Pcs && price_close,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_zero_never_prints() {
        assert!(!should_print('0', UomType::Weigh, 1.0, 1.0));
        assert!(!should_print('0', UomType::Pcs, 1.0, 1.0));
    }

    #[test]
    fn status_one_always_prints() {
        assert!(should_print('1', UomType::Weigh, 1.0, 99.0));
    }

    #[test]
    fn status_two_gates_on_weigh() {
        assert!(should_print('2', UomType::Weigh, 0.0, 0.0));
        assert!(!should_print('2', UomType::Pcs, 0.0, 0.0));
    }

    #[test]
    fn status_three_gates_on_pcs() {
        assert!(should_print('3', UomType::Pcs, 0.0, 0.0));
        assert!(!should_print('3', UomType::Weigh, 0.0, 0.0));
    }

    #[test]
    fn status_four_requires_weigh_and_close_price() {
        assert!(should_print('4', UomType::Weigh, 10.0, 10.0005));
        assert!(!should_print('4', UomType::Weigh, 10.0, 10.01));
        assert!(!should_print('4', UomType::Pcs, 10.0, 10.0));
    }

    #[test]
    fn status_five_requires_pcs_and_close_price() {
        assert!(should_print('5', UomType::Pcs, 10.0, 10.0005));
        assert!(!should_print('5', UomType::Pcs, 10.0, 10.01));
    }

    #[test]
    fn unrecognized_status_defaults_to_print() {
        assert!(should_print('9', UomType::Pcs, 0.0, 0.0));
    }
}
