//! Vietnamese mobile phone numbers.
//!
//! Two rules live here and they are intentionally not the same function:
//!
//! - [`is_valid_phone`] accepts what a customer types into the chat
//!   (`0912345678`, `84912345678`, `+84 912 345 678`) and checks it against the
//!   domestic mobile prefixes `03|05|07|08|09`.
//! - [`normalize_phone`] canonicalises stored and typed numbers so they can be
//!   compared; it strips formatting and folds the `84` country code of an
//!   11-digit number into a leading `0`.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use glasserp_core::{DomainError, DomainResult};

static MOBILE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(03|05|07|08|09)\d{8}$").expect("mobile pattern is a valid regex")
});

/// Strip everything but digits and fold a leading `84` country code.
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() == 11 && digits.starts_with("84") {
        format!("0{}", &digits[2..])
    } else {
        digits
    }
}

/// Whether `raw` is a Vietnamese mobile number.
pub fn is_valid_phone(raw: &str) -> bool {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return false;
    }

    let local = if let Some(rest) = trimmed.strip_prefix("+84") {
        format!("0{rest}")
    } else if trimmed.len() > 9 && trimmed.starts_with("84") {
        format!("0{}", &trimmed[2..])
    } else {
        trimmed.to_string()
    };

    let digits: String = local.chars().filter(char::is_ascii_digit).collect();
    MOBILE_PATTERN.is_match(&digits)
}

/// A validated, normalized phone number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        if !is_valid_phone(raw) {
            return Err(DomainError::validation(format!("invalid phone number: {raw}")));
        }
        Ok(Self(normalize_phone(raw)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether a stored (possibly unformatted) number refers to this phone.
    pub fn matches(&self, stored: &str) -> bool {
        normalize_phone(stored) == self.0
    }
}

impl core::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}


#[cfg(test)]
mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn every_valid_number_normalizes_to_ten_digits(
            prefix in prop::sample::select(vec!["03", "05", "07", "08", "09"]),
            rest in "[0-9]{8}",
            intl in any::<bool>(),
        ) {
            let local = format!("{prefix}{rest}");
            let typed = if intl { format!("+84{}", &local[1..]) } else { local.clone() };
            prop_assert!(is_valid_phone(&typed));
            prop_assert_eq!(normalize_phone(&typed), local);
        }
    }
}
