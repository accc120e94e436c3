//! Authentication service.
//!
//! Sign-in goes through the JWT auth API (`POST {auth}/token`); accounts are
//! created through the commerce API's customer endpoint. The token itself is
//! not kept: a successful exchange only proves the credentials, and the
//! session stores who signed in.

mod error;

pub use error::AuthError;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use autoparts_core::validation::{LoginInput, RegistrationInput};

use crate::commerce::{CommerceClient, CommerceError, NewCustomer};
use crate::http;
use crate::models::session::CurrentCustomer;

/// Error codes the commerce API uses for an email that is already taken.
const EMAIL_EXISTS_CODES: &[&str] = &[
    "registration-error-email-exists",
    "woocommerce_rest_customer_invalid_email",
];

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Successful token response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    pub user_email: String,
    #[serde(default)]
    pub user_nicename: String,
    #[serde(default)]
    pub user_display_name: String,
}

/// Client for the JWT auth API.
#[derive(Clone)]
pub struct AuthClient {
    client: reqwest::Client,
    token_url: Url,
}

impl AuthClient {
    /// Create a client for the auth API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the token endpoint URL cannot be built.
    pub fn new(base_url: &Url, client: reqwest::Client) -> Result<Self, AuthError> {
        Ok(Self {
            client,
            token_url: base_url.join("token")?,
        })
    }

    /// Exchange a username (or email) and password for a token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] when the API rejects the
    /// credentials, or another error if the request fails.
    #[instrument(skip(self, password))]
    pub async fn token(&self, username: &str, password: &str) -> Result<TokenResponse, AuthError> {
        let response = self
            .client
            .post(self.token_url.clone())
            .json(&TokenRequest { username, password })
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::FORBIDDEN || status == StatusCode::UNAUTHORIZED {
            return Err(AuthError::InvalidCredentials);
        }

        if !status.is_success() {
            tracing::warn!(
                status = %status,
                body = %http::truncate_body(&body),
                "Auth API returned non-success status"
            );
            return Err(AuthError::Api {
                status: status.as_u16(),
                message: http::error_message(&body),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// Sign-in and registration, combining the auth and commerce APIs.
pub struct AuthService<'a> {
    auth: &'a AuthClient,
    commerce: &'a CommerceClient,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub const fn new(auth: &'a AuthClient, commerce: &'a CommerceClient) -> Self {
        Self { auth, commerce }
    }

    /// Sign in with validated credentials.
    ///
    /// The commerce customer record is looked up so the account page can list
    /// orders; a failed lookup still signs the customer in.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for wrong credentials, or
    /// another error if the auth API cannot be reached.
    pub async fn login(&self, input: &LoginInput) -> Result<CurrentCustomer, AuthError> {
        let token = self.auth.token(&input.username, &input.password).await?;

        let customer_id = match self.commerce.customer_by_email(&token.user_email).await {
            Ok(customer) => customer.map(|c| c.id),
            Err(e) => {
                tracing::warn!(error = %e, "Customer lookup after sign-in failed");
                None
            }
        };

        let display_name = if token.user_display_name.is_empty() {
            token.user_nicename
        } else {
            token.user_display_name
        };

        tracing::info!("Customer signed in");
        Ok(CurrentCustomer {
            email: token.user_email,
            display_name,
            customer_id,
        })
    }

    /// Create a customer account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UserAlreadyExists`] if the email is taken, or
    /// another error if the commerce API rejects the request.
    pub async fn register(&self, input: &RegistrationInput) -> Result<(), AuthError> {
        let customer = NewCustomer {
            email: input.email.as_str().to_owned(),
            first_name: input.first_name.clone(),
            last_name: input.last_name.clone(),
            password: input.password.clone(),
        };

        match self.commerce.create_customer(&customer).await {
            Ok(_) => Ok(()),
            Err(CommerceError::Api { status: 400, message }) if is_email_taken(&message) => {
                Err(AuthError::UserAlreadyExists)
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn is_email_taken(message: &str) -> bool {
    let lower = message.to_lowercase();
    EMAIL_EXISTS_CODES.iter().any(|code| lower.contains(code)) || lower.contains("already registered")
}
