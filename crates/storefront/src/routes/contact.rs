//! Contact form route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use autoparts_core::FieldErrors;
use autoparts_core::validation::validate_contact;

use crate::error::add_breadcrumb;
use crate::filters;
use crate::middleware::{OptionalAuth, PageContext};
use crate::models::Notice;
use crate::services::notice;

/// Contact form data, kept as entered for re-rendering.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub subject: String,
    pub message: String,
}

/// Contact page template.
#[derive(Template, WebTemplate)]
#[template(path = "contact.html")]
pub struct ContactTemplate {
    pub page: PageContext,
    pub form: ContactForm,
    pub errors: FieldErrors,
}

/// Display the contact form.
pub async fn show(OptionalAuth(customer): OptionalAuth, page: PageContext) -> impl IntoResponse {
    let form = ContactForm {
        name: customer
            .as_ref()
            .map(|c| c.greeting_name().to_owned())
            .unwrap_or_default(),
        email: customer.map(|c| c.email).unwrap_or_default(),
        ..ContactForm::default()
    };
    ContactTemplate {
        page,
        form,
        errors: FieldErrors::new(),
    }
}

/// Handle a contact form submission.
///
/// Valid messages are written to the log for the support team.
#[instrument(skip_all)]
pub async fn submit(session: Session, page: PageContext, Form(form): Form<ContactForm>) -> Response {
    match validate_contact(
        &form.name,
        &form.email,
        &form.phone,
        &form.subject,
        &form.message,
    ) {
        Ok(input) => {
            tracing::info!(
                email_domain = %input.email.domain(),
                subject = %input.subject,
                has_phone = input.phone.is_some(),
                message_chars = input.message.chars().count(),
                "Contact message received"
            );
            add_breadcrumb("contact", "Contact message sent", None);
            notice::flash(
                &session,
                Notice::success("Thanks for getting in touch. We will reply by email soon."),
            )
            .await;
            Redirect::to("/contact").into_response()
        }
        Err(errors) => {
            let template = ContactTemplate { page, form, errors };
            (StatusCode::UNPROCESSABLE_ENTITY, template).into_response()
        }
    }
}
