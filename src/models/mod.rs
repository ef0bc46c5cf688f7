// src/models/mod.rs

pub mod comment;
pub mod post;
pub mod upload;
pub mod user;

use serde::{Deserialize, Deserializer};
use validator::ValidationError;

use crate::error::FieldErrors;

/// Deserializes an optional string, treating `""` (and whitespace) as absent.
///
/// Form clients send empty inputs as empty strings; they must fail `required`
/// rules the same way a missing key does.
pub(crate) fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// [`empty_as_none`] for email addresses: trimmed and lowercased so lookups
/// and uniqueness ignore case.
pub(crate) fn email_address<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(empty_as_none(deserializer)?.map(|s| s.trim().to_lowercase()))
}

/// Records a `confirmed` rule failure: `value` must equal `<field>_confirmation`.
pub(crate) fn check_confirmed(
    errors: &mut FieldErrors,
    field: &str,
    value: &Option<String>,
    confirmation: &Option<String>,
) {
    if let Some(value) = value {
        if confirmation.as_ref() != Some(value) {
            errors
                .entry(field.to_string())
                .or_default()
                .push(format!("The {} field confirmation does not match.", field));
        }
    }
}

/// `filled` rule: a present value must not be blank.
pub(crate) fn filled(value: &str, message: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(rule_error("filled", message))
    } else {
        Ok(())
    }
}

pub(crate) fn rule_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}
