//! Authentication extractors.
//!
//! Provides extractors for requiring a signed-in customer in route handlers.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::models::{CurrentCustomer, session_keys};

/// Extractor that requires a signed-in customer.
///
/// If nobody is signed in, redirects to the sign-in page.
///
/// # Example
///
/// ```rust,ignore
/// async fn account(RequireAuth(customer): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", customer.greeting_name())
/// }
/// ```
pub struct RequireAuth(pub CurrentCustomer);

/// Rejection when a customer must be signed in.
pub enum AuthRejection {
    /// Redirect to the sign-in page.
    RedirectToLogin,
    /// The session layer is missing.
    MissingSession,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::MissingSession => {
                tracing::error!("Session missing from request extensions");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::MissingSession)?;

        let customer: CurrentCustomer = session
            .get(session_keys::CURRENT_CUSTOMER)
            .await
            .ok()
            .flatten()
            .ok_or(AuthRejection::RedirectToLogin)?;

        Ok(Self(customer))
    }
}

/// Extractor that optionally gets the signed-in customer.
pub struct OptionalAuth(pub Option<CurrentCustomer>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let customer = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentCustomer>(session_keys::CURRENT_CUSTOMER)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(customer))
    }
}

/// Store the signed-in customer in the session.
///
/// The session ID is cycled to prevent fixation.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_customer(
    session: &Session,
    customer: &CurrentCustomer,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session
        .insert(session_keys::CURRENT_CUSTOMER, customer)
        .await?;
    set_sentry_user(&customer.email);
    Ok(())
}

/// Remove the signed-in customer from the session (sign-out).
///
/// The cart stays with the visitor.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_customer(
    session: &Session,
) -> Result<(), tower_sessions::session::Error> {
    session
        .remove_value(session_keys::CURRENT_CUSTOMER)
        .await?;
    session.cycle_id().await?;
    clear_sentry_user();
    Ok(())
}
