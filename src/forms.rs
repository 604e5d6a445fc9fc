//! Form decoding and validation.
//!
//! A [`Form`] holds the decoded fields of a urlencoded body alongside
//! any validation errors accumulated against them. Checks are additive:
//! running more checks never removes an error, and all per-field
//! messages are kept so a page can show every problem at once.
//!
//! Length checks count Unicode code points, not bytes. All checks other
//! than [`Form::required`] skip empty values, so a blank optional field
//! never trips a format rule.

use std::collections::HashMap;
use std::sync::LazyLock;

use axum::{
    body::to_bytes,
    extract::{FromRequest, Request},
};
use regex::Regex;

use crate::error::AppError;

/// Hard ceiling on form body size. Bodies past this are rejected before
/// any parsing happens.
pub const MAX_FORM_BYTES: usize = 64 * 1024;

/// Sanity check for email addresses, per the WHATWG HTML spec's
/// definition of a valid email address.
pub static EMAIL_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .unwrap()
});

/// Decoded form fields plus accumulated validation errors.
#[derive(Debug, Default)]
pub struct Form {
    values: HashMap<String, Vec<String>>,
    errors: HashMap<String, Vec<String>>,
}

impl Form {
    /// Decode a urlencoded body. Repeated fields keep every value.
    pub fn parse(bytes: &[u8]) -> Self {
        let mut values: HashMap<String, Vec<String>> = HashMap::new();
        for (key, value) in url::form_urlencoded::parse(bytes) {
            values.entry(key.into_owned()).or_default().push(value.into_owned());
        }
        Self {
            values,
            errors: HashMap::new(),
        }
    }

    /// First submitted value for a field, or "" if absent.
    pub fn get(&self, field: &str) -> &str {
        self.values
            .get(field)
            .and_then(|values| values.first())
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Record a validation error against a field.
    pub fn add_error(&mut self, field: &str, message: &str) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }

    /// All errors recorded against a field, in the order they were added.
    pub fn errors(&self, field: &str) -> &[String] {
        self.errors.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of errors across all fields.
    pub fn error_count(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Each listed field must be present and not blank (whitespace-only
    /// counts as blank).
    pub fn required(&mut self, fields: &[&str]) {
        for field in fields {
            if self.get(field).trim().is_empty() {
                self.add_error(field, "This field cannot be blank");
            }
        }
    }

    /// Reject values longer than `limit` code points.
    pub fn max_length(&mut self, field: &str, limit: usize) {
        let too_long = {
            let value = self.get(field);
            !value.is_empty() && value.chars().count() > limit
        };
        if too_long {
            self.add_error(
                field,
                &format!("This field is too long (maximum is {limit} characters)"),
            );
        }
    }

    /// Reject non-empty values shorter than `minimum` code points.
    pub fn min_length(&mut self, field: &str, minimum: usize) {
        let too_short = {
            let value = self.get(field);
            !value.is_empty() && value.chars().count() < minimum
        };
        if too_short {
            self.add_error(
                field,
                &format!("This field is too short (minimum is {minimum} characters)"),
            );
        }
    }

    /// Reject non-empty values outside the allowed set.
    pub fn permitted_values(&mut self, field: &str, permitted: &[&str]) {
        let invalid = {
            let value = self.get(field);
            !value.is_empty() && !permitted.contains(&value)
        };
        if invalid {
            self.add_error(field, "This field is invalid");
        }
    }

    /// Reject non-empty values that do not match the pattern.
    pub fn matches_pattern(&mut self, field: &str, pattern: &Regex) {
        let invalid = {
            let value = self.get(field);
            !value.is_empty() && !pattern.is_match(value)
        };
        if invalid {
            self.add_error(field, "This field is invalid");
        }
    }
}

impl<S> FromRequest<S> for Form
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        let bytes = to_bytes(req.into_body(), MAX_FORM_BYTES)
            .await
            .map_err(|_| AppError::PayloadTooLarge)?;
        Ok(Form::parse(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(body: &str) -> Form {
        Form::parse(body.as_bytes())
    }

    #[test]
    fn test_parse_and_get() {
        let form = form("title=hello+world&content=a%26b");
        assert_eq!(form.get("title"), "hello world");
        assert_eq!(form.get("content"), "a&b");
        assert_eq!(form.get("missing"), "");
    }

    #[test]
    fn test_repeated_field_keeps_first_value() {
        let form = form("expires=7&expires=365");
        assert_eq!(form.get("expires"), "7");
    }

    #[test]
    fn test_required() {
        let mut form = form("title=ok&content=++&other=x");
        form.required(&["title", "content", "missing"]);

        assert!(form.errors("title").is_empty());
        assert_eq!(form.errors("content"), ["This field cannot be blank"]);
        assert_eq!(form.errors("missing"), ["This field cannot be blank"]);
        assert_eq!(form.error_count(), 2);
        assert!(!form.valid());
    }

    #[test]
    fn test_required_on_empty_form_flags_every_field() {
        let mut form = Form::default();
        form.required(&["title", "content", "expires"]);

        assert_eq!(form.error_count(), 3);
        for field in ["title", "content", "expires"] {
            assert_eq!(form.errors(field), ["This field cannot be blank"]);
        }
    }

    #[test]
    fn test_max_length_counts_code_points() {
        // Four characters, twelve bytes
        let mut form = form("title=%E6%97%A5%E6%9C%AC%E8%AA%9E%E5%AD%97");
        assert_eq!(form.get("title").chars().count(), 4);

        form.max_length("title", 4);
        assert!(form.valid());

        form.max_length("title", 3);
        assert_eq!(
            form.errors("title"),
            ["This field is too long (maximum is 3 characters)"]
        );
    }

    #[test]
    fn test_min_length() {
        let mut form = form("password=short");
        form.min_length("password", 8);
        assert_eq!(
            form.errors("password"),
            ["This field is too short (minimum is 8 characters)"]
        );
    }

    #[test]
    fn test_length_checks_skip_empty_values() {
        let mut form = form("title=");
        form.max_length("title", 3);
        form.min_length("title", 8);
        form.matches_pattern("title", &EMAIL_RX);
        form.permitted_values("title", &["1", "7"]);
        assert!(form.valid());
    }

    #[test]
    fn test_permitted_values() {
        let permitted = ["1", "7", "365"];

        for value in permitted {
            let mut form = form(&format!("expires={value}"));
            form.permitted_values("expires", &permitted);
            assert!(form.valid(), "{value} should be permitted");
        }

        for value in ["14", "0", "-1", "week"] {
            let mut form = form(&format!("expires={value}"));
            form.permitted_values("expires", &permitted);
            assert_eq!(form.errors("expires"), ["This field is invalid"]);
        }
    }

    #[test]
    fn test_email_pattern() {
        for email in ["alice@example.com", "a.b+c@sub.example.co.uk"] {
            let mut form = form(&format!("email={}", email.replace('+', "%2B")));
            form.matches_pattern("email", &EMAIL_RX);
            assert!(form.valid(), "{email} should match");
        }

        for email in ["not-an-email", "@example.com", "alice@", "a b@example.com"] {
            let mut form = form(&format!("email={}", email.replace(' ', "+")));
            form.matches_pattern("email", &EMAIL_RX);
            assert!(!form.valid(), "{email} should not match");
        }
    }

    #[test]
    fn test_errors_accumulate_and_never_clear() {
        let mut form = form("title=");
        form.required(&["title"]);
        form.add_error("title", "second problem");

        // A passing check must not remove earlier errors
        form.max_length("title", 100);
        assert_eq!(
            form.errors("title"),
            ["This field cannot be blank", "second problem"]
        );
        assert_eq!(form.error_count(), 2);
    }

    #[test]
    fn test_valid_on_untouched_form() {
        let form = Form::default();
        assert!(form.valid());
        assert_eq!(form.error_count(), 0);
    }
}
