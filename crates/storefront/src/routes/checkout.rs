//! Checkout route handlers.
//!
//! The current [`CheckoutAttempt`] is kept in the session between requests.
//! Posting the form creates the order (once per attempt), the payment page
//! charges it, and the confirmation page shows the result. Remote failures
//! never produce an error page here; they come back as a message on the
//! form or the payment page.
//!
//! Order submission and payment run in spawned tasks that write the session
//! themselves. A browser that disconnects mid-request drops the handler, not
//! the task, so the order or charge is always recorded against the attempt.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::{Instrument, instrument};

use autoparts_core::{
    Cart, CheckoutAttempt, CheckoutForm, CheckoutStage, CustomerId, FieldErrors, PaymentMethod,
    PlacedOrder,
};

use super::cart::CartView;
use crate::error::add_breadcrumb;
use crate::filters;
use crate::middleware::{OptionalAuth, PageContext};
use crate::models::{ConfirmedOrder, CurrentCustomer, Notice, session_keys};
use crate::services::{CheckoutService, PaymentResult, SubmitOutcome, cart, notice};
use crate::state::AppState;

/// Checkout form template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/form.html")]
pub struct CheckoutTemplate {
    pub page: PageContext,
    pub form: CheckoutForm,
    pub errors: FieldErrors,
    pub error: Option<String>,
    pub cart: CartView,
}

impl CheckoutTemplate {
    /// Whether cash on delivery is the selected payment method.
    #[must_use]
    pub fn cash_on_delivery(&self) -> bool {
        self.form.payment_method == PaymentMethod::CashOnDelivery.form_value()
    }
}

/// Payment page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/payment.html")]
pub struct PaymentTemplate {
    pub page: PageContext,
    pub order_id: String,
    pub total: String,
    pub error: Option<String>,
    pub cart: CartView,
}

/// Confirmation page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/confirmation.html")]
pub struct ConfirmationTemplate {
    pub page: PageContext,
    pub order_id: String,
    pub total: String,
    pub payment_method: &'static str,
    pub cash_on_delivery: bool,
    pub reference: Option<String>,
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Load the checkout attempt. A record that no longer parses is dropped.
async fn load_attempt(session: &Session) -> Option<CheckoutAttempt> {
    match session.get::<CheckoutAttempt>(session_keys::CHECKOUT).await {
        Ok(attempt) => attempt,
        Err(e) => {
            tracing::warn!(error = %e, "Discarding unreadable checkout attempt");
            None
        }
    }
}

async fn save_attempt(session: &Session, attempt: &CheckoutAttempt) {
    if let Err(e) = session.insert(session_keys::CHECKOUT, attempt).await {
        tracing::error!(error = %e, checkout_key = %attempt.key(), "Failed to save checkout attempt");
    }
}

/// Write the session to the store now rather than when the response is sent.
async fn persist(session: &Session) {
    if let Err(e) = session.save().await {
        tracing::error!(error = %e, "Failed to save session");
    }
}

/// Shown when the submission task itself died.
const SUBMISSION_INTERRUPTED: &str =
    "Something went wrong while placing your order. Please try again.";

/// Record a confirmed order: empty the cart, drop the attempt and remember
/// the order for the confirmation page.
async fn finish(session: &Session, order: PlacedOrder, reference: Option<String>) {
    let order_id = order.id.to_string();
    // Saving a cart also discards the checkout attempt.
    cart::save(session, &Cart::new()).await;

    let confirmed = ConfirmedOrder { order, reference };
    if let Err(e) = session.insert(session_keys::LAST_ORDER, &confirmed).await {
        tracing::error!(error = %e, %order_id, "Failed to store confirmed order");
    }
    add_breadcrumb("checkout", "Order confirmed", Some(&[("order_id", order_id.as_str())]));
}

/// An empty form, with the signed-in customer's email filled in.
fn prefilled_form(customer: Option<&CurrentCustomer>) -> CheckoutForm {
    CheckoutForm {
        email: customer.map(|c| c.email.clone()).unwrap_or_default(),
        ..CheckoutForm::default()
    }
}

async fn empty_cart_redirect(session: &Session) -> Response {
    notice::flash(session, Notice::info("Your cart is empty.")).await;
    Redirect::to("/cart").into_response()
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the checkout form.
///
/// An empty cart sends the visitor back to the cart. An attempt that already
/// holds an unpaid order resumes on the payment page.
#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(customer): OptionalAuth,
    page: PageContext,
) -> Response {
    let attempt = load_attempt(&session).await;
    if attempt.as_ref().is_some_and(CheckoutAttempt::awaiting_payment) {
        return Redirect::to("/checkout/payment").into_response();
    }

    let cart = cart::load(&session).await;
    if cart.is_empty() {
        return empty_cart_redirect(&session).await;
    }

    let form = attempt
        .as_ref()
        .and_then(CheckoutAttempt::form)
        .cloned()
        .unwrap_or_else(|| prefilled_form(customer.as_ref()));

    CheckoutTemplate {
        page,
        form,
        errors: FieldErrors::new(),
        error: attempt.as_ref().and_then(|a| a.notice().map(str::to_owned)),
        cart: CartView::new(&cart, state.currency()),
    }
    .into_response()
}

/// Validate the form and place the order.
///
/// Invalid input re-renders the form without calling any API. A failed
/// submission re-renders it with the entered data and a message. Once the
/// attempt holds an order, posting again goes straight to payment.
#[instrument(skip_all)]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(customer): OptionalAuth,
    page: PageContext,
    Form(form): Form<CheckoutForm>,
) -> Response {
    let cart = cart::load(&session).await;
    let attempt = load_attempt(&session)
        .await
        .unwrap_or_else(CheckoutAttempt::start);

    if cart.is_empty() && attempt.order().is_none() {
        return empty_cart_redirect(&session).await;
    }

    let customer_id = customer.as_ref().and_then(|c| c.customer_id);
    let task = tokio::spawn(
        run_submission(
            state.clone(),
            session.clone(),
            attempt,
            form.clone(),
            cart.clone(),
            customer_id,
        )
        .in_current_span(),
    );
    let outcome = task.await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Checkout submission task failed");
        SubmitOutcome::Failed(SUBMISSION_INTERRUPTED.to_owned())
    });

    match outcome {
        SubmitOutcome::Invalid(errors) => {
            let template = CheckoutTemplate {
                page,
                form,
                errors,
                error: None,
                cart: CartView::new(&cart, state.currency()),
            };
            (StatusCode::UNPROCESSABLE_ENTITY, template).into_response()
        }
        SubmitOutcome::Placed(order) | SubmitOutcome::AlreadyPlaced(order) => {
            if order.payment_method == PaymentMethod::CashOnDelivery {
                Redirect::to("/checkout/confirmation").into_response()
            } else {
                Redirect::to("/checkout/payment").into_response()
            }
        }
        SubmitOutcome::Failed(message) => CheckoutTemplate {
            page,
            form,
            errors: FieldErrors::new(),
            error: Some(message),
            cart: CartView::new(&cart, state.currency()),
        }
        .into_response(),
    }
}

/// Submit the order and record the result in the session.
///
/// The attempt is saved in `Submitting` before the order is sent, so a
/// resubmission after a lost request reuses its key and looks the order up.
async fn run_submission(
    state: AppState,
    session: Session,
    mut attempt: CheckoutAttempt,
    form: CheckoutForm,
    cart: Cart,
    customer_id: Option<CustomerId>,
) -> SubmitOutcome {
    let validated = match CheckoutService::begin(&mut attempt, form) {
        Ok(validated) => validated,
        Err(outcome) => {
            save_attempt(&session, &attempt).await;
            return outcome;
        }
    };
    save_attempt(&session, &attempt).await;
    persist(&session).await;

    let outcome = state
        .checkout()
        .place(&mut attempt, &validated, &cart, customer_id)
        .await;

    match &outcome {
        SubmitOutcome::Placed(order) if attempt.is_confirmed() => {
            tracing::info!(order_id = %order.id, "Cash on delivery order placed");
            finish(&session, order.clone(), None).await;
        }
        _ => save_attempt(&session, &attempt).await,
    }
    persist(&session).await;
    outcome
}

/// Display the payment page for the attempt's order.
#[instrument(skip_all)]
pub async fn payment(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
) -> Response {
    let Some(attempt) = load_attempt(&session).await else {
        return Redirect::to("/checkout").into_response();
    };
    let Some(order) = attempt.order().filter(|_| attempt.awaiting_payment()) else {
        return Redirect::to("/checkout").into_response();
    };

    let error = match attempt.stage() {
        CheckoutStage::PaymentFailed { message } => Some(message.clone()),
        _ => None,
    };
    let currency = state.currency();
    let cart = cart::load(&session).await;

    PaymentTemplate {
        page,
        order_id: order.id.to_string(),
        total: currency.format(order.total),
        error,
        cart: CartView::new(&cart, currency),
    }
    .into_response()
}

/// Pay for the attempt's order, or retry after a failure.
///
/// A retry sends the same order and amount as the first try.
#[instrument(skip_all)]
pub async fn pay(State(state): State<AppState>, session: Session) -> Response {
    let Some(attempt) = load_attempt(&session).await else {
        return Redirect::to("/checkout").into_response();
    };

    let task = tokio::spawn(run_payment(state, session.clone(), attempt).in_current_span());
    match task.await {
        Ok(PaymentResult::Paid { .. }) => Redirect::to("/checkout/confirmation").into_response(),
        Ok(PaymentResult::Failed(_)) => Redirect::to("/checkout/payment").into_response(),
        Ok(PaymentResult::NotPayable) => Redirect::to("/checkout").into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Payment task failed");
            Redirect::to("/checkout/payment").into_response()
        }
    }
}

/// Charge the order and record the result in the session.
async fn run_payment(
    state: AppState,
    session: Session,
    mut attempt: CheckoutAttempt,
) -> PaymentResult {
    let result = state.checkout().pay(&mut attempt).await;
    match &result {
        PaymentResult::Paid { order, reference } => {
            finish(&session, order.clone(), reference.clone()).await;
        }
        PaymentResult::Failed(_) => save_attempt(&session, &attempt).await,
        PaymentResult::NotPayable => return result,
    }
    persist(&session).await;
    result
}

/// Leave checkout and return to the cart.
///
/// The cart is untouched. An unpaid order stays with the attempt, so coming
/// back to checkout resumes payment for it instead of placing another.
#[instrument(skip_all)]
pub async fn abandon(session: Session) -> Response {
    let has_order = load_attempt(&session)
        .await
        .is_some_and(|a| a.order().is_some());
    let message = if has_order {
        "Your order is saved. Return to checkout whenever you are ready to pay."
    } else {
        "Checkout cancelled."
    };
    notice::flash(&session, Notice::info(message)).await;
    Redirect::to("/cart").into_response()
}

/// Display the confirmation page for the last confirmed order.
#[instrument(skip_all)]
pub async fn confirmation(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
) -> Response {
    let confirmed = session
        .get::<ConfirmedOrder>(session_keys::LAST_ORDER)
        .await
        .ok()
        .flatten();
    let Some(ConfirmedOrder { order, reference }) = confirmed else {
        return Redirect::to("/").into_response();
    };

    ConfirmationTemplate {
        page,
        order_id: order.id.to_string(),
        total: state.currency().format(order.total),
        payment_method: order.payment_method.title(),
        cash_on_delivery: order.payment_method == PaymentMethod::CashOnDelivery,
        reference,
    }
    .into_response()
}
