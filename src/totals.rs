//! Derived invoice amounts. Per-line discounts apply to each line first, the
//! general discount applies to the resulting subtotal. Discounts are percents
//! in 0..=100 and the two layers compound multiplicatively.

use crate::models::InvoiceLine;

pub fn line_subtotal(line: &InvoiceLine) -> f64 {
    line.unit_price * (1.0 - line.discount / 100.0) * line.quantity
}

pub fn invoice_subtotal(lines: &[InvoiceLine]) -> f64 {
    lines.iter().map(line_subtotal).sum()
}

pub fn invoice_total(lines: &[InvoiceLine], general_discount: f64) -> f64 {
    invoice_subtotal(lines) * (1.0 - general_discount / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(unit_price: f64, quantity: f64, discount: f64) -> InvoiceLine {
        InvoiceLine {
            product_id: 1,
            product_name: "test".to_string(),
            unit_price,
            quantity,
            discount,
        }
    }

    #[test]
    fn line_discount_applies_before_quantity() {
        // 100 each, 10% off, 3 units -> 270
        assert_eq!(line_subtotal(&line(100.0, 3.0, 10.0)), 270.0);
    }

    #[test]
    fn zero_discounts_are_identity() {
        let lines = vec![line(100.0, 2.0, 0.0), line(50.0, 1.0, 0.0)];

        assert_eq!(invoice_subtotal(&lines), 250.0);
        assert_eq!(invoice_total(&lines, 0.0), 250.0);
    }

    #[test]
    fn general_discount_layers_on_line_discounts() {
        // line 1: 100 * 0.9 * 2 = 180
        // line 2: 50  * 0.8 * 4 = 160
        // subtotal 340, 5% general -> 323
        let lines = vec![line(100.0, 2.0, 10.0), line(50.0, 4.0, 20.0)];

        assert!((invoice_subtotal(&lines) - 340.0).abs() < 1e-9);
        assert!((invoice_total(&lines, 5.0) - 323.0).abs() < 1e-9);
    }

    #[test]
    fn full_general_discount_zeroes_the_total() {
        let lines = vec![line(100.0, 2.0, 10.0)];

        assert!(invoice_total(&lines, 100.0).abs() < 1e-9);
    }

    #[test]
    fn empty_invoice_totals_zero() {
        assert_eq!(invoice_subtotal(&[]), 0.0);
        assert_eq!(invoice_total(&[], 50.0), 0.0);
    }
}
