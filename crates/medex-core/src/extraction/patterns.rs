//! Common regex patterns and value refiners for medical form extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Phone numbers: (737) 988-0851, 737-988-0851, +1 737 988 0851, 555-1234
    pub static ref PHONE: Regex = Regex::new(
        r"(?:\+\d{1,3}[\s.\-]?)?(?:\(\d{3}\)|\d{3})[\s.\-]?\d{3}[\s.\-]?\d{4}\b|\b\d{3}[\s.\-]\d{4}\b"
    ).unwrap();

    // Leading yes/no answer on a checkbox-style question
    pub static ref YES_NO: Regex = Regex::new(
        r"(?i)^(yes|no)\b"
    ).unwrap();

    // Trailing counter word after a refill count: "2 times", "3x"
    pub static ref REFILL_COUNT: Regex = Regex::new(
        r"(?i)^(.*?\d)\s*(?:times?|x)$"
    ).unwrap();
}

/// Punctuation stripped from both ends of a captured value.
const TRIM_PUNCTUATION: [char; 11] = [':', ';', ',', '.', '-', '_', '|', '*', '=', '~', '•'];

/// Trim whitespace and stray punctuation from both ends of a value.
pub fn trim_value(value: &str) -> &str {
    value.trim_matches(|c: char| c.is_whitespace() || TRIM_PUNCTUATION.contains(&c))
}

/// Value refiner that keeps the capture as is.
pub fn keep(value: &str) -> String {
    value.to_string()
}

/// Narrow a captured phone field to the number itself when one is present.
pub fn refine_phone(value: &str) -> String {
    PHONE
        .find(value)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| value.to_string())
}

/// Normalize a leading yes/no answer; anything else is kept verbatim.
pub fn refine_yes_no(value: &str) -> String {
    match YES_NO.captures(value) {
        Some(caps) if caps[1].eq_ignore_ascii_case("yes") => "Yes".to_string(),
        Some(_) => "No".to_string(),
        None => value.to_string(),
    }
}

/// Drop the counter word from "2 times" style refill counts.
pub fn refine_refill(value: &str) -> String {
    match REFILL_COUNT.captures(value) {
        Some(caps) => trim_value(&caps[1]).to_string(),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_value() {
        assert_eq!(trim_value("  : Jane Doe ;\n"), "Jane Doe");
        assert_eq!(trim_value("(737) 988-0851."), "(737) 988-0851");
        assert_eq!(trim_value(" .-_ "), "");
    }

    #[test]
    fn test_refine_phone() {
        assert_eq!(refine_phone("(737) 988-0851 Weight"), "(737) 988-0851");
        assert_eq!(refine_phone("cell 737-988-0851"), "737-988-0851");
        assert_eq!(refine_phone("555-1234"), "555-1234");
        assert_eq!(refine_phone("ask at desk"), "ask at desk");
    }

    #[test]
    fn test_refine_yes_no() {
        assert_eq!(refine_yes_no("YES, Blue Cross"), "Yes");
        assert_eq!(refine_yes_no("no"), "No");
        assert_eq!(refine_yes_no("Not immune"), "Not immune");
        assert_eq!(refine_yes_no("N/A"), "N/A");
    }

    #[test]
    fn test_refine_refill() {
        assert_eq!(refine_refill("2 times"), "2");
        assert_eq!(refine_refill("3x"), "3");
        assert_eq!(refine_refill("2"), "2");
        assert_eq!(refine_refill("none"), "none");
        assert_eq!(refine_refill("six"), "six");
    }
}
