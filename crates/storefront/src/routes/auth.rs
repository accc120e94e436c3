//! Authentication route handlers.
//!
//! Sign-in goes through the JWT auth API; registration creates a customer
//! through the commerce API and then asks the customer to sign in.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use autoparts_core::FieldErrors;
use autoparts_core::validation::{validate_login, validate_registration};

use crate::filters;
use crate::middleware::{OptionalAuth, PageContext, clear_current_customer, set_current_customer};
use crate::models::Notice;
use crate::services::{AuthError, AuthService, notice};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Registration form data.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub username: String,
    pub errors: FieldErrors,
    pub error: Option<String>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub errors: FieldErrors,
    pub error: Option<String>,
}

fn auth_failure_status(error: &AuthError) -> StatusCode {
    match error {
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::UserAlreadyExists => StatusCode::CONFLICT,
        _ => StatusCode::BAD_GATEWAY,
    }
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page. Signed-in customers go to their account.
pub async fn login_page(OptionalAuth(customer): OptionalAuth, page: PageContext) -> Response {
    if customer.is_some() {
        return Redirect::to("/account").into_response();
    }
    LoginTemplate {
        page,
        username: String::new(),
        errors: FieldErrors::new(),
        error: None,
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    Form(form): Form<LoginForm>,
) -> Response {
    let input = match validate_login(&form.username, &form.password) {
        Ok(input) => input,
        Err(errors) => {
            let template = LoginTemplate {
                page,
                username: form.username,
                errors,
                error: None,
            };
            return (StatusCode::UNPROCESSABLE_ENTITY, template).into_response();
        }
    };

    let service = AuthService::new(state.auth(), state.commerce());
    match service.login(&input).await {
        Ok(customer) => {
            if let Err(e) = set_current_customer(&session, &customer).await {
                tracing::error!(error = %e, "Failed to store signed-in customer");
                let template = LoginTemplate {
                    page,
                    username: form.username,
                    errors: FieldErrors::new(),
                    error: Some("We could not sign you in. Please try again.".to_owned()),
                };
                return (StatusCode::INTERNAL_SERVER_ERROR, template).into_response();
            }
            notice::flash(
                &session,
                Notice::success(format!("Welcome back, {}.", customer.greeting_name())),
            )
            .await;
            Redirect::to("/account").into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Sign-in failed");
            let template = LoginTemplate {
                page,
                username: form.username,
                errors: FieldErrors::new(),
                error: Some(e.customer_message()),
            };
            (auth_failure_status(&e), template).into_response()
        }
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(OptionalAuth(customer): OptionalAuth, page: PageContext) -> Response {
    if customer.is_some() {
        return Redirect::to("/account").into_response();
    }
    RegisterTemplate {
        page,
        first_name: String::new(),
        last_name: String::new(),
        email: String::new(),
        errors: FieldErrors::new(),
        error: None,
    }
    .into_response()
}

/// Handle registration form submission.
///
/// On success the customer is sent to the login page.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    Form(form): Form<RegisterForm>,
) -> Response {
    let input = match validate_registration(
        &form.first_name,
        &form.last_name,
        &form.email,
        &form.password,
        &form.password_confirm,
    ) {
        Ok(input) => input,
        Err(errors) => {
            let template = RegisterTemplate {
                page,
                first_name: form.first_name,
                last_name: form.last_name,
                email: form.email,
                errors,
                error: None,
            };
            return (StatusCode::UNPROCESSABLE_ENTITY, template).into_response();
        }
    };

    let service = AuthService::new(state.auth(), state.commerce());
    match service.register(&input).await {
        Ok(()) => {
            tracing::info!("Customer registered");
            notice::flash(
                &session,
                Notice::success("Your account was created. Please sign in."),
            )
            .await;
            Redirect::to("/auth/login").into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Registration failed");
            let template = RegisterTemplate {
                page,
                first_name: form.first_name,
                last_name: form.last_name,
                email: form.email,
                errors: FieldErrors::new(),
                error: Some(e.customer_message()),
            };
            (auth_failure_status(&e), template).into_response()
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout. The cart stays with the visitor.
#[instrument(skip_all)]
pub async fn logout(session: Session) -> Response {
    if let Err(e) = clear_current_customer(&session).await {
        tracing::error!(error = %e, "Failed to clear signed-in customer");
    }
    notice::flash(&session, Notice::info("You have been signed out.")).await;
    Redirect::to("/").into_response()
}
