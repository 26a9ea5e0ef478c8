//! Login identifier classification and canonicalization.
//!
//! A credential is whatever the user typed into the "email or phone" box.
//! Classification is pure and deterministic; normalization is idempotent,
//! so re-classifying an already-normalized value yields the same result.

use validator::ValidateEmail;

/// A classified, canonical login identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Trimmed, lower-cased email address.
    Email(String),
    /// Digits-only phone number, 10 to 15 digits.
    Phone(String),
}

impl Credential {
    /// Classify raw input as an email or phone credential.
    ///
    /// Returns `None` for anything that is neither: the caller decides
    /// whether that is a validation error (login) or a silent miss
    /// (reset request).
    pub fn classify(input: &str) -> Option<Credential> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }

        if trimmed.contains('@') {
            let lowered = trimmed.to_lowercase();
            if lowered.validate_email() {
                return Some(Credential::Email(lowered));
            }
            return None;
        }

        let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
        if (10..=15).contains(&digits.len()) {
            return Some(Credential::Phone(digits));
        }

        None
    }

    /// The canonical value, regardless of variant.
    pub fn value(&self) -> &str {
        match self {
            Credential::Email(v) | Credential::Phone(v) => v,
        }
    }

    pub fn is_email(&self) -> bool {
        matches!(self, Credential::Email(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_and_lowercases_email() {
        assert_eq!(
            Credential::classify("  Alice@Example.COM "),
            Some(Credential::Email("alice@example.com".to_string()))
        );
    }

    #[test]
    fn classifies_phone_and_strips_separators() {
        assert_eq!(
            Credential::classify("+33 6 12 34 56 78"),
            Some(Credential::Phone("33612345678".to_string()))
        );
        assert_eq!(
            Credential::classify("0600000000"),
            Some(Credential::Phone("0600000000".to_string()))
        );
    }

    #[test]
    fn rejects_malformed_email() {
        assert_eq!(Credential::classify("not-an-email@"), None);
        assert_eq!(Credential::classify("@example.com"), None);
    }

    #[test]
    fn rejects_phone_outside_digit_bounds() {
        // 9 digits: too short
        assert_eq!(Credential::classify("060000000"), None);
        // 16 digits: too long
        assert_eq!(Credential::classify("0600000000123456"), None);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(Credential::classify(""), None);
        assert_eq!(Credential::classify("   "), None);
        assert_eq!(Credential::classify("hello world"), None);
    }

    #[test]
    fn classification_is_idempotent() {
        for raw in ["  Alice@Example.COM ", "+33 6 12 34 56 78", "0600000000"] {
            let first = Credential::classify(raw).unwrap();
            let second = Credential::classify(first.value()).unwrap();
            assert_eq!(first, second);
        }
    }
}
