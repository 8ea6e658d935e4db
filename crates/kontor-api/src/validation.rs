//! Request input validation

use once_cell::sync::Lazy;
use regex::Regex;

use kontor_core::{FieldErrors, KontorError, Result};

pub const MAX_NAME_LENGTH: usize = 255;
pub const MAX_EMAIL_LENGTH: usize = 320; // RFC 5321
pub const MAX_DESCRIPTION_LENGTH: usize = 4096;
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Email validation regex (RFC 5322 simplified)
static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());

/// Builder-style input validator accumulating field-keyed messages.
#[derive(Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with an InvalidArgument carrying every accumulated message, or
    /// pass when nothing was recorded.
    pub fn validate(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(KontorError::invalid_fields(self.errors))
        }
    }

    pub fn error(&mut self, field: &str, message: impl Into<String>) -> &mut Self {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
        self
    }

    pub fn required(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.error(field, format!("{} is required", field));
        }
        self
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        if value.is_empty() {
            self.error(field, "email is required");
        } else if value.len() > MAX_EMAIL_LENGTH {
            self.error(field, "email is too long");
        } else if !EMAIL_REGEX.is_match(value) {
            self.error(field, "invalid email format");
        }
        self
    }

    pub fn name(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.error(field, format!("{} is required", field));
        } else if value.len() > MAX_NAME_LENGTH {
            self.error(field, format!("{} is too long", field));
        }
        self
    }

    pub fn password(&mut self, field: &str, value: &str) -> &mut Self {
        if value.len() < MIN_PASSWORD_LENGTH {
            self.error(
                field,
                format!("password must be at least {} characters", MIN_PASSWORD_LENGTH),
            );
        } else if value.len() > MAX_PASSWORD_LENGTH {
            self.error(field, "password is too long");
        }
        self
    }

    pub fn max_length(&mut self, field: &str, value: &str, max: usize) -> &mut Self {
        if value.len() > max {
            self.error(field, format!("must be at most {} characters", max));
        }
        self
    }

    pub fn description(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value {
            self.max_length(field, value, MAX_DESCRIPTION_LENGTH);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        let mut v = Validator::new();
        v.email("email", "test@example.com");
        assert!(v.validate().is_ok());

        let mut v = Validator::new();
        v.email("email", "invalid-email");
        assert!(v.validate().is_err());
    }

    #[test]
    fn test_errors_are_field_keyed_and_accumulated() {
        let mut v = Validator::new();
        v.email("email", "nope").password("password", "short");
        match v.validate().unwrap_err() {
            KontorError::InvalidArgument { fields } => {
                assert!(fields.contains_key("email"));
                assert!(fields.contains_key("password"));
            }
            other => panic!("expected InvalidArgument, got {:?}", other),
        }
    }

    #[test]
    fn test_name_required() {
        let mut v = Validator::new();
        v.name("name", "   ");
        assert!(v.validate().is_err());

        let mut v = Validator::new();
        v.name("name", "Operations");
        assert!(v.validate().is_ok());
    }

    #[test]
    fn test_password_bounds() {
        let mut v = Validator::new();
        v.password("password", "long-enough-secret");
        assert!(v.validate().is_ok());

        let mut v = Validator::new();
        v.password("password", &"x".repeat(200));
        assert!(v.validate().is_err());
    }
}
