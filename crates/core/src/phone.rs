//! Brazilian phone number formatting: `(XX) X XXXX-XXXX`

/// Maximum number of digits kept by [`format`]
pub const MAX_DIGITS: usize = 11;

/// Strip everything that is not an ASCII digit
pub fn remove_formatting(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

/// Format a (possibly partial) phone number as the user types it.
///
/// Digits past the eleventh are dropped. Formatting an already formatted
/// value yields the same string.
pub fn format(phone: &str) -> String {
    let digits = remove_formatting(phone);
    let d = &digits[..digits.len().min(MAX_DIGITS)];

    match d.len() {
        0 => String::new(),
        1..=2 => format!("({d}"),
        3 => format!("({}) {}", &d[..2], &d[2..]),
        4..=7 => format!("({}) {} {}", &d[..2], &d[2..3], &d[3..]),
        _ => format!("({}) {} {}-{}", &d[..2], &d[2..3], &d[3..7], &d[7..]),
    }
}

/// A complete mobile number has exactly eleven digits
pub fn is_valid(phone: &str) -> bool {
    remove_formatting(phone).len() == MAX_DIGITS
}

/// Value for display; empty input stays empty
pub fn display(phone: &str) -> String {
    if phone.is_empty() {
        return String::new();
    }
    format(phone)
}

/// Digits only, as the backend stores them
pub fn for_backend(phone: &str) -> String {
    remove_formatting(phone)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_progressively() {
        assert_eq!(format(""), "");
        assert_eq!(format("1"), "(1");
        assert_eq!(format("11"), "(11");
        assert_eq!(format("119"), "(11) 9");
        assert_eq!(format("1198765"), "(11) 9 8765");
        assert_eq!(format("11987654"), "(11) 9 8765-4");
        assert_eq!(format("11987654321"), "(11) 9 8765-4321");
    }

    #[test]
    fn extra_digits_are_dropped() {
        assert_eq!(format("119876543210000"), "(11) 9 8765-4321");
    }

    #[test]
    fn formatting_is_idempotent() {
        for input in ["", "1", "119", "(11) 9 8765", "11 98765-4321", "abc11987654321xyz"] {
            let once = format(&remove_formatting(input));
            let twice = format(&remove_formatting(&once));
            assert_eq!(once, twice, "input {input:?}");
            assert_eq!(format(&once), once);
        }
    }

    #[test]
    fn validity_counts_digits() {
        assert!(is_valid("(11) 9 8765-4321"));
        assert!(!is_valid("(11) 9 8765-432"));
        assert_eq!(for_backend("(11) 9 8765-4321"), "11987654321");
        assert_eq!(display(""), "");
    }
}
