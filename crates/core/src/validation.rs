//! Field-level form validation.
//!
//! Validation never touches the network. Every failing field gets one message
//! so forms can be re-rendered with the entered values and per-field errors.

use std::collections::BTreeMap;
use std::fmt;

use crate::types::{Email, Phone};

/// Minimum password length accepted on registration.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Validation messages keyed by form field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    /// Create an empty set of errors.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error for `field`. The first message for a field wins.
    pub fn insert(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    /// Message for `field`, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Whether `field` has an error.
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over `(field, message)` pairs in field-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// `Ok(value)` when no errors were recorded, otherwise `Err(self)`.
    ///
    /// # Errors
    ///
    /// Returns `self` if any field failed.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

/// Check that a trimmed value is present and at least `min` characters long.
///
/// Returns the trimmed value when it passes.
pub fn require_min(
    errors: &mut FieldErrors,
    field: &'static str,
    label: &str,
    value: &str,
    min: usize,
) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.insert(field, format!("{label} is required"));
        return None;
    }
    if trimmed.chars().count() < min {
        errors.insert(field, format!("{label} must be at least {min} characters"));
        return None;
    }
    Some(trimmed.to_owned())
}

/// Parse an email field, recording a message on failure.
pub fn require_email(errors: &mut FieldErrors, field: &'static str, value: &str) -> Option<Email> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.insert(field, "Email is required");
        return None;
    }
    match Email::parse(trimmed) {
        Ok(email) => Some(email),
        Err(_) => {
            errors.insert(field, "Enter a valid email address");
            None
        }
    }
}

/// A validated login form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

/// Validate a login form: both fields are required.
///
/// # Errors
///
/// Returns the per-field messages when a field is missing.
pub fn validate_login(username: &str, password: &str) -> Result<LoginInput, FieldErrors> {
    let mut errors = FieldErrors::new();
    let username = require_min(&mut errors, "username", "Username or email", username, 1);
    if password.is_empty() {
        errors.insert("password", "Password is required");
    }
    let username = username.unwrap_or_default();
    errors.into_result(LoginInput {
        username,
        password: password.to_owned(),
    })
}

/// A validated registration form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationInput {
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub password: String,
}

/// Validate a registration form.
///
/// Names need two characters, the email must parse, the password needs
/// [`MIN_PASSWORD_LENGTH`] characters and the confirmation must match.
///
/// # Errors
///
/// Returns the per-field messages when any rule fails.
pub fn validate_registration(
    first_name: &str,
    last_name: &str,
    email: &str,
    password: &str,
    password_confirm: &str,
) -> Result<RegistrationInput, FieldErrors> {
    let mut errors = FieldErrors::new();
    let first_name = require_min(&mut errors, "first_name", "First name", first_name, 2);
    let last_name = require_min(&mut errors, "last_name", "Last name", last_name, 2);
    let email = require_email(&mut errors, "email", email);

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.insert(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"),
        );
    }
    if password != password_confirm {
        errors.insert("password_confirm", "Passwords do not match");
    }

    match (first_name, last_name, email) {
        (Some(first_name), Some(last_name), Some(email)) if errors.is_empty() => {
            Ok(RegistrationInput {
                first_name,
                last_name,
                email,
                password: password.to_owned(),
            })
        }
        _ => Err(errors),
    }
}

/// A validated contact form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactInput {
    pub name: String,
    pub email: Email,
    pub phone: Option<Phone>,
    pub subject: String,
    pub message: String,
}

/// Validate the contact form. Phone is optional but must parse when given.
///
/// # Errors
///
/// Returns the per-field messages when any rule fails.
pub fn validate_contact(
    name: &str,
    email: &str,
    phone: &str,
    subject: &str,
    message: &str,
) -> Result<ContactInput, FieldErrors> {
    let mut errors = FieldErrors::new();
    let name = require_min(&mut errors, "name", "Name", name, 2);
    let email = require_email(&mut errors, "email", email);
    let phone = if phone.trim().is_empty() {
        None
    } else if let Ok(phone) = Phone::parse(phone) {
        Some(phone)
    } else {
        errors.insert("phone", "Enter a valid phone number");
        None
    };
    let subject = require_min(&mut errors, "subject", "Subject", subject, 3);
    let message = require_min(&mut errors, "message", "Message", message, 10);

    match (name, email, subject, message) {
        (Some(name), Some(email), Some(subject), Some(message)) if errors.is_empty() => {
            Ok(ContactInput {
                name,
                email,
                phone,
                subject,
                message,
            })
        }
        _ => Err(errors),
    }
}
