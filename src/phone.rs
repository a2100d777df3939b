//! Phone number helpers.
//!
//! Validation, canonical form and display formatting for Bangladeshi mobile
//! numbers. A valid number is a `0`, `880` or `+880` prefix followed by a `1`
//! and nine more digits. Whitespace anywhere in the input is ignored.
//!
//! Accounts are keyed by the E.164 form (`+8801XXXXXXXXX`), so every accepted
//! spelling of a number maps to the same user.
//!
//! @author Shastho
//! @copyright 2025

use phonenumber::{country, Mode};
use thiserror::Error;

/// Number of digits after the leading `1` of the subscriber number.
const SUBSCRIBER_DIGITS: usize = 9;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    #[error("Not a Bangladeshi mobile number: {0}")]
    InvalidFormat(String),
    #[error("Failed to parse phone number: {0}")]
    ParseError(String),
    #[error("Phone number is not assigned to a mobile range: {0}")]
    NotValid(String),
}

/// Removes every whitespace character from the input.
fn strip_whitespace(phone: &str) -> String {
    phone.chars().filter(|c| !c.is_whitespace()).collect()
}

/// The ten-digit national number (`1XXXXXXXXX`) of a structurally valid
/// mobile number.
fn national_number(phone: &str) -> Option<String> {
    let clean = strip_whitespace(phone);

    let rest = if let Some(rest) = clean.strip_prefix("+880") {
        rest
    } else if let Some(rest) = clean.strip_prefix("880") {
        rest
    } else if let Some(rest) = clean.strip_prefix('0') {
        rest
    } else {
        return None;
    };

    let subscriber = rest.strip_prefix('1')?;
    let valid = subscriber.len() == SUBSCRIBER_DIGITS
        && subscriber.chars().all(|c| c.is_ascii_digit());
    valid.then(|| rest.to_string())
}

/// Checks whether `phone` is a Bangladeshi mobile number.
///
/// # Examples
/// ```
/// use shastho_registration::phone::validate_bangladeshi_phone;
///
/// assert!(validate_bangladeshi_phone("01712345678"));
/// assert!(validate_bangladeshi_phone("+880 1712 345678"));
/// assert!(!validate_bangladeshi_phone("02712345678"));
/// ```
pub fn validate_bangladeshi_phone(phone: &str) -> bool {
    national_number(phone).is_some()
}

/// Validates `phone` and returns its E.164 form.
///
/// # Examples
/// ```
/// use shastho_registration::phone::normalize_bangladeshi_phone;
///
/// assert_eq!(normalize_bangladeshi_phone("017 1234 5678").unwrap(), "+8801712345678");
/// assert!(normalize_bangladeshi_phone("+14155551234").is_err());
/// ```
pub fn normalize_bangladeshi_phone(phone: &str) -> Result<String, PhoneError> {
    let national = national_number(phone)
        .ok_or_else(|| PhoneError::InvalidFormat(phone.trim().to_string()))?;

    let number = phonenumber::parse(Some(country::Id::BD), format!("+880{}", national))
        .map_err(|e| PhoneError::ParseError(e.to_string()))?;

    if !phonenumber::is_valid(&number) {
        return Err(PhoneError::NotValid(phone.trim().to_string()));
    }

    Ok(number.format().mode(Mode::E164).to_string())
}

/// Formats a number for display as `+88 01XXXXXXXXX`.
///
/// Numbers that are neither `+88`-prefixed nor local `01` numbers are
/// returned unchanged.
pub fn format_phone_number(phone: &str) -> String {
    if phone.is_empty() {
        return String::new();
    }

    if let Some(rest) = phone.strip_prefix("+88") {
        format!("+88 {}", rest)
    } else if phone.starts_with("01") {
        format!("+88 {}", phone)
    } else {
        phone.to_string()
    }
}

/// Upper-case initials of the first and last word of a display name.
pub fn initials(name: &str) -> String {
    let parts: Vec<&str> = name.split_whitespace().collect();
    let first_char = |s: &str| s.chars().next().map(|c| c.to_uppercase().collect::<String>());

    match parts.as_slice() {
        [] => String::new(),
        [only] => first_char(only).unwrap_or_default(),
        [first, .., last] => {
            let mut out = first_char(first).unwrap_or_default();
            out.push_str(&first_char(last).unwrap_or_default());
            out
        }
    }
}
