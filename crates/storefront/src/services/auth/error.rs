//! Authentication error types.

use thiserror::Error;

use crate::commerce::CommerceError;

/// Errors that can occur during sign-in and registration.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong username/email or password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An account with this email already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// The auth API rejected the request for another reason.
    #[error("auth API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// HTTP request to the auth API failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The auth API answered with something unexpected.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Registration through the commerce API failed.
    #[error("commerce error: {0}")]
    Commerce(#[from] CommerceError),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl AuthError {
    /// Message shown above the form.
    #[must_use]
    pub fn customer_message(&self) -> String {
        match self {
            Self::InvalidCredentials => "Incorrect username or password.".to_owned(),
            Self::UserAlreadyExists => {
                "An account with this email already exists. Try signing in.".to_owned()
            }
            Self::Api { status, message } if (400..500).contains(status) && !message.is_empty() => {
                message.clone()
            }
            Self::Commerce(e) => e.customer_message(),
            _ => "We could not sign you in right now. Please try again.".to_owned(),
        }
    }
}
