//! Normalization of the warehouse's textual discount encodings.
//!
//! The sales table stores discounts as text and is inconsistent about the
//! encoding of zero: `"0"`, `"0.00"` and `"0,00"` all appear. Every
//! zero-discount comparison in the pipeline goes through this module so the
//! accepted set lives in exactly one place. The set is closed on purpose;
//! widening it requires confirming the upstream encoding with the data
//! owner first.

/// The textual encodings the warehouse uses for a zero discount.
pub const ZERO_ENCODINGS: [&str; 3] = ["0", "0.00", "0,00"];

/// Returns true if the given discount text is one of the known zero
/// encodings.
pub fn is_textual_zero(discount: &str) -> bool {
    ZERO_ENCODINGS.contains(&discount)
}

/// SQL `IN (...)` list of the zero encodings, for embedding in warehouse
/// query text.
pub fn sql_zero_list() -> String {
    let quoted: Vec<String> = ZERO_ENCODINGS.iter().map(|z| format!("'{z}'")).collect();
    quoted.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_zero_encodings_are_zero() {
        assert!(is_textual_zero("0"));
        assert!(is_textual_zero("0.00"));
        assert!(is_textual_zero("0,00"));
    }

    #[test]
    fn non_zero_values_are_not_zero() {
        assert!(!is_textual_zero("0.01"));
        assert!(!is_textual_zero("1,00"));
        assert!(!is_textual_zero(""));
        // Unobserved encodings are rejected rather than silently accepted.
        assert!(!is_textual_zero("0.000"));
        assert!(!is_textual_zero("00"));
    }

    #[test]
    fn sql_list_quotes_every_encoding() {
        assert_eq!(sql_zero_list(), "'0', '0.00', '0,00'");
    }
}
