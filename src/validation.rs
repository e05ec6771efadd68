//! Input checks run before a PDF is generated.
//!
//! Builders assume validated input: they render whatever they are given and
//! leave missing fields blank. Every form type implements [`Validate`] and
//! lists the fields its document needs to be meaningful.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// One failed check.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Dotted path of the field, e.g. `trips[2].date`
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn empty_field(field: &str, label: &str) -> Self {
        Self::new(field, format!("{} is required", label))
    }

    pub fn invalid_email(field: &str) -> Self {
        Self::new(field, "Email address is not valid").with_suggestion("e.g. jane.doe@example.ie")
    }

    pub fn invalid_iban(field: &str) -> Self {
        Self::new(field, "IBAN checksum does not match")
            .with_suggestion(
                "Check the IBAN on your bank statement, e.g. IE29 AIBK 9311 5212 3456 78",
            )
    }

    pub fn invalid_bic(field: &str) -> Self {
        Self::new(field, "BIC must be 8 or 11 characters").with_suggestion("e.g. AIBKIE2D")
    }

    pub fn invalid_card(field: &str) -> Self {
        Self::new(field, "Card number is not valid")
    }

    pub fn invalid_expiry(field: &str) -> Self {
        Self::new(field, "Expiry date is not valid").with_suggestion("Use MM/YY, e.g. 09/28")
    }

    pub fn invalid_pps(field: &str) -> Self {
        Self::new(field, "PPS number is not valid")
            .with_suggestion("Seven digits followed by one or two letters, e.g. 1234567T")
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.field, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, ". {}", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}. {}", i + 1, error)?;
        }
        Ok(())
    }
}

/// Implemented by every form's data record.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

// ============================================================================
// Field checks
// ============================================================================

pub fn validate_required(value: &str, field: &str, label: &str, errors: &mut ValidationErrors) {
    if value.trim().is_empty() {
        errors.add(ValidationError::empty_field(field, label));
    }
}

pub fn validate_email(value: &str, field: &str, errors: &mut ValidationErrors) {
    if value.trim().is_empty() {
        errors.add(ValidationError::empty_field(field, "Email"));
    } else if !is_valid_email(value) {
        errors.add(ValidationError::invalid_email(field));
    }
}

pub fn validate_iban(value: &str, field: &str, errors: &mut ValidationErrors) {
    if value.trim().is_empty() {
        errors.add(ValidationError::empty_field(field, "IBAN"));
    } else if !is_valid_iban(value) {
        errors.add(ValidationError::invalid_iban(field));
    }
}

/// BIC is optional for SEPA payments inside the EEA; only checked if given.
pub fn validate_bic_optional(value: &str, field: &str, errors: &mut ValidationErrors) {
    if !value.trim().is_empty() && !is_valid_bic(value) {
        errors.add(ValidationError::invalid_bic(field));
    }
}

pub fn validate_card_number(value: &str, field: &str, errors: &mut ValidationErrors) {
    if value.trim().is_empty() {
        errors.add(ValidationError::empty_field(field, "Card number"));
    } else if !is_valid_card_number(value) {
        errors.add(ValidationError::invalid_card(field));
    }
}

pub fn validate_card_expiry(value: &str, field: &str, errors: &mut ValidationErrors) {
    if value.trim().is_empty() {
        errors.add(ValidationError::empty_field(field, "Expiry date"));
    } else if !is_valid_card_expiry(value) {
        errors.add(ValidationError::invalid_expiry(field));
    }
}

pub fn validate_pps(value: &str, field: &str, errors: &mut ValidationErrors) {
    if value.trim().is_empty() {
        errors.add(ValidationError::empty_field(field, "PPS number"));
    } else if !is_valid_pps(value) {
        errors.add(ValidationError::invalid_pps(field));
    }
}

pub fn validate_pps_optional(value: &str, field: &str, errors: &mut ValidationErrors) {
    if !value.trim().is_empty() && !is_valid_pps(value) {
        errors.add(ValidationError::invalid_pps(field));
    }
}

// ============================================================================
// Predicates
// ============================================================================

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
            .expect("static email pattern")
    })
}

pub fn is_valid_email(value: &str) -> bool {
    email_regex().is_match(value.trim())
}

fn compact(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect::<String>()
        .to_ascii_uppercase()
}

/// ISO 13616 check: rotate the first four characters to the end, map
/// letters to 10..=35 and require the number mod 97 to be 1.
pub fn is_valid_iban(value: &str) -> bool {
    let iban = compact(value);
    if !(15..=34).contains(&iban.len()) || !iban.is_ascii() {
        return false;
    }
    let bytes = iban.as_bytes();
    if !bytes[..2].iter().all(u8::is_ascii_uppercase)
        || !bytes[2..4].iter().all(u8::is_ascii_digit)
    {
        return false;
    }
    if !bytes.iter().all(u8::is_ascii_alphanumeric) {
        return false;
    }

    let mut remainder: u32 = 0;
    for &b in bytes[4..].iter().chain(bytes[..4].iter()) {
        let value = if b.is_ascii_digit() {
            (b - b'0') as u32
        } else {
            (b - b'A') as u32 + 10
        };
        remainder = if value >= 10 {
            (remainder * 100 + value) % 97
        } else {
            (remainder * 10 + value) % 97
        };
    }
    remainder == 1
}

/// ISO 9362 shape: bank (4 letters), country (2 letters), location (2
/// alphanumerics), optional branch (3 alphanumerics).
pub fn is_valid_bic(value: &str) -> bool {
    let bic = compact(value);
    let bytes = bic.as_bytes();
    (bytes.len() == 8 || bytes.len() == 11)
        && bytes[..6].iter().all(u8::is_ascii_uppercase)
        && bytes[6..].iter().all(u8::is_ascii_alphanumeric)
}

pub fn luhn_check(digits: &str) -> bool {
    let mut sum = 0;
    for (i, c) in digits.chars().rev().enumerate() {
        let Some(mut d) = c.to_digit(10) else {
            return false;
        };
        if i % 2 == 1 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }
    sum % 10 == 0
}

pub fn is_valid_card_number(value: &str) -> bool {
    let digits = compact(value);
    (12..=19).contains(&digits.len()) && luhn_check(&digits)
}

/// `MM/YY` or `MM/YYYY`.
pub fn is_valid_card_expiry(value: &str) -> bool {
    let Some((month, year)) = value.trim().split_once('/') else {
        return false;
    };
    let month_ok = matches!(month.parse::<u32>(), Ok(1..=12)) && month.len() == 2;
    let year_ok = (year.len() == 2 || year.len() == 4) && year.chars().all(|c| c.is_ascii_digit());
    month_ok && year_ok
}

/// Irish PPS number: seven digits, a check letter, and an optional second
/// letter. Weighted sum of the digits (8..=2), plus 9 × the second letter's
/// alphabet position (`W` counts as 0), mod 23; 0 maps to `W`, otherwise
/// 1 = `A` … 22 = `V`.
pub fn is_valid_pps(value: &str) -> bool {
    let pps = compact(value);
    let bytes = pps.as_bytes();
    if !(bytes.len() == 8 || bytes.len() == 9) || !pps.is_ascii() {
        return false;
    }
    if !bytes[..7].iter().all(u8::is_ascii_digit)
        || !bytes[7..].iter().all(u8::is_ascii_uppercase)
    {
        return false;
    }

    let mut sum: u32 = bytes[..7]
        .iter()
        .enumerate()
        .map(|(i, b)| (b - b'0') as u32 * (8 - i as u32))
        .sum();
    if let Some(&second) = bytes.get(8) {
        if second != b'W' {
            sum += (second - b'A' + 1) as u32 * 9;
        }
    }

    let expected = match sum % 23 {
        0 => b'W',
        r => b'A' + (r as u8) - 1,
    };
    bytes[7] == expected
}
