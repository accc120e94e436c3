//! Checkout form and checkout state machine.
//!
//! A checkout attempt moves through
//! `Review → Details → Submitting → AwaitingPayment → Confirmed`, with
//! `PaymentFailed` as a recoverable side state. The storefront stores the
//! attempt in the visitor's session and feeds it [`CheckoutEvent`]s as forms
//! are posted and remote calls return.
//!
//! Each attempt carries an idempotency key. The key is sent with the order
//! so that a resubmission after a lost response can find the order the first
//! submission created instead of creating a second one.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Email, OrderId, PaymentMethod, Phone};
use crate::validation::{FieldErrors, require_email, require_min};

/// Country used when the form leaves it blank.
pub const DEFAULT_COUNTRY: &str = "IR";

/// Raw checkout form as posted by the browser.
///
/// Values are kept exactly as entered so the form can be re-rendered after a
/// validation or submission failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutForm {
    pub first_name: String,
    pub last_name: String,
    pub address_1: String,
    pub address_2: String,
    pub city: String,
    pub state: String,
    pub postcode: String,
    pub country: String,
    pub email: String,
    pub phone: String,
    pub payment_method: String,
    pub order_notes: String,
}

impl Default for CheckoutForm {
    fn default() -> Self {
        Self {
            first_name: String::new(),
            last_name: String::new(),
            address_1: String::new(),
            address_2: String::new(),
            city: String::new(),
            state: String::new(),
            postcode: String::new(),
            country: DEFAULT_COUNTRY.to_owned(),
            email: String::new(),
            phone: String::new(),
            payment_method: PaymentMethod::default().form_value().to_owned(),
            order_notes: String::new(),
        }
    }
}

/// Contact details from a validated form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutCustomer {
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub phone: Phone,
}

/// Billing and shipping address from a validated form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutAddress {
    pub address_1: String,
    pub address_2: Option<String>,
    pub city: String,
    pub state: String,
    pub postcode: String,
    pub country: String,
}

/// A checkout form that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCheckout {
    pub customer: CheckoutCustomer,
    pub address: CheckoutAddress,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

impl CheckoutForm {
    /// Validate every field.
    ///
    /// Everything except the second address line and the notes is required.
    /// Names need two characters, the first address line and the postal code
    /// five. Email and phone must parse.
    ///
    /// # Errors
    ///
    /// Returns one message per failing field.
    pub fn validate(&self) -> Result<ValidatedCheckout, FieldErrors> {
        let mut errors = FieldErrors::new();

        let first_name = require_min(&mut errors, "first_name", "First name", &self.first_name, 2);
        let last_name = require_min(&mut errors, "last_name", "Last name", &self.last_name, 2);
        let address_1 = require_min(&mut errors, "address_1", "Address", &self.address_1, 5);
        let city = require_min(&mut errors, "city", "City", &self.city, 1);
        let state = require_min(&mut errors, "state", "State", &self.state, 1);
        let postcode = require_min(&mut errors, "postcode", "Postal code", &self.postcode, 5);
        let country = if self.country.trim().is_empty() {
            Some(DEFAULT_COUNTRY.to_owned())
        } else {
            require_min(&mut errors, "country", "Country", &self.country, 2)
                .map(|c| c.to_ascii_uppercase())
        };
        let email = require_email(&mut errors, "email", &self.email);

        let phone = if self.phone.trim().is_empty() {
            errors.insert("phone", "Phone is required");
            None
        } else {
            match Phone::parse(&self.phone) {
                Ok(phone) => Some(phone),
                Err(_) => {
                    errors.insert("phone", "Enter a valid phone number");
                    None
                }
            }
        };

        let payment_method = match self.payment_method.parse::<PaymentMethod>() {
            Ok(method) => Some(method),
            Err(_) => {
                errors.insert("payment_method", "Choose a payment method");
                None
            }
        };

        match (
            first_name,
            last_name,
            address_1,
            city,
            state,
            postcode,
            country,
            email,
            phone,
            payment_method,
        ) {
            (
                Some(first_name),
                Some(last_name),
                Some(address_1),
                Some(city),
                Some(state),
                Some(postcode),
                Some(country),
                Some(email),
                Some(phone),
                Some(payment_method),
            ) if errors.is_empty() => Ok(ValidatedCheckout {
                customer: CheckoutCustomer {
                    first_name,
                    last_name,
                    email,
                    phone,
                },
                address: CheckoutAddress {
                    address_1,
                    address_2: non_empty(&self.address_2),
                    city,
                    state,
                    postcode,
                    country,
                },
                payment_method,
                notes: non_empty(&self.order_notes),
            }),
            _ => Err(errors),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// An order created by the commerce API for this attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub id: OrderId,
    /// Order total as charged; the payment step sends exactly this amount.
    pub total: Decimal,
    pub payment_method: PaymentMethod,
}

/// Where a checkout attempt currently is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum CheckoutStage {
    /// Cart shown, nothing entered yet.
    #[default]
    Review,
    /// Form shown (possibly with errors).
    Details,
    /// Order submission in flight.
    Submitting,
    /// Order exists, waiting for the customer to pay.
    AwaitingPayment,
    /// The last payment attempt failed; retry is allowed.
    PaymentFailed { message: String },
    /// Order paid (or cash on delivery). Terminal.
    Confirmed,
}

impl CheckoutStage {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Review => "review",
            Self::Details => "details",
            Self::Submitting => "submitting",
            Self::AwaitingPayment => "awaiting_payment",
            Self::PaymentFailed { .. } => "payment_failed",
            Self::Confirmed => "confirmed",
        }
    }
}

impl fmt::Display for CheckoutStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Something that happened to a checkout attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutEvent {
    /// The posted form failed validation.
    ValidationFailed(CheckoutForm),
    /// The posted form passed validation and is about to be submitted.
    Validated(CheckoutForm),
    /// The commerce API returned (or we found) the order for this attempt.
    OrderCreated(PlacedOrder),
    /// Order creation failed; the message is shown above the form.
    OrderFailed { message: String },
    PaymentSucceeded,
    PaymentFailed { message: String },
}

impl CheckoutEvent {
    const fn name(&self) -> &'static str {
        match self {
            Self::ValidationFailed(_) => "validation_failed",
            Self::Validated(_) => "validated",
            Self::OrderCreated(_) => "order_created",
            Self::OrderFailed { .. } => "order_failed",
            Self::PaymentSucceeded => "payment_succeeded",
            Self::PaymentFailed { .. } => "payment_failed",
        }
    }
}

/// An event that does not apply in the attempt's current stage.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("cannot apply {event} while {stage}")]
    Invalid {
        stage: &'static str,
        event: &'static str,
    },
    #[error("an order was already placed for this checkout")]
    OrderAlreadyPlaced,
    #[error("checkout is already complete")]
    Finished,
}

/// One pass through checkout, identified by its idempotency key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutAttempt {
    key: Uuid,
    stage: CheckoutStage,
    order: Option<PlacedOrder>,
    form: Option<CheckoutForm>,
    /// Number of times the form was sent to the order API.
    submissions: u32,
    /// Last order-submission error, shown above the form.
    notice: Option<String>,
    /// Every billing email this attempt has submitted with, oldest first.
    /// An order created by an earlier submission is filed under one of these.
    #[serde(default)]
    emails: Vec<String>,
}

impl CheckoutAttempt {
    /// Start an attempt with a fresh random key.
    #[must_use]
    pub fn start() -> Self {
        Self::with_key(Uuid::new_v4())
    }

    /// Start an attempt with a known key.
    #[must_use]
    pub const fn with_key(key: Uuid) -> Self {
        Self {
            key,
            stage: CheckoutStage::Review,
            order: None,
            form: None,
            submissions: 0,
            notice: None,
            emails: Vec::new(),
        }
    }

    /// Idempotency key sent with the order.
    #[must_use]
    pub const fn key(&self) -> Uuid {
        self.key
    }

    #[must_use]
    pub const fn stage(&self) -> &CheckoutStage {
        &self.stage
    }

    /// The order created for this attempt, once there is one.
    #[must_use]
    pub const fn order(&self) -> Option<&PlacedOrder> {
        self.order.as_ref()
    }

    /// The last form posted, for re-rendering.
    #[must_use]
    pub const fn form(&self) -> Option<&CheckoutForm> {
        self.form.as_ref()
    }

    /// The last order-submission error.
    #[must_use]
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Billing emails used by this attempt's submissions, oldest first.
    #[must_use]
    pub fn submitted_emails(&self) -> &[String] {
        &self.emails
    }

    /// Remember the billing email of the submission in progress.
    pub fn record_submitted_email(&mut self, email: &str) {
        if !self.emails.iter().any(|e| e == email) {
            self.emails.push(email.to_owned());
        }
    }

    #[must_use]
    pub const fn submissions(&self) -> u32 {
        self.submissions
    }

    /// Whether an earlier submission may already have created an order that
    /// we never heard back about. When true, look the order up by key before
    /// creating a new one.
    #[must_use]
    pub const fn needs_lookup(&self) -> bool {
        self.order.is_none() && self.submissions > 1
    }

    /// Whether the customer should be on the payment page.
    #[must_use]
    pub const fn awaiting_payment(&self) -> bool {
        matches!(
            self.stage,
            CheckoutStage::AwaitingPayment | CheckoutStage::PaymentFailed { .. }
        )
    }

    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        matches!(self.stage, CheckoutStage::Confirmed)
    }

    const fn accepts_form(&self) -> bool {
        matches!(
            self.stage,
            CheckoutStage::Review | CheckoutStage::Details | CheckoutStage::Submitting
        )
    }

    /// Apply `event`, moving to the next stage.
    ///
    /// # Errors
    ///
    /// Returns a [`TransitionError`] (leaving the attempt unchanged) if the
    /// event does not apply in the current stage.
    pub fn apply(&mut self, event: CheckoutEvent) -> Result<(), TransitionError> {
        use CheckoutEvent as E;
        use CheckoutStage as S;

        if self.is_confirmed() {
            return Err(TransitionError::Finished);
        }

        match event {
            E::Validated(_) | E::ValidationFailed(_) if self.order.is_some() => {
                return Err(TransitionError::OrderAlreadyPlaced);
            }
            E::ValidationFailed(form) if self.accepts_form() => {
                self.form = Some(form);
                self.notice = None;
                self.stage = S::Details;
            }
            E::Validated(form) if self.accepts_form() => {
                self.form = Some(form);
                self.notice = None;
                self.submissions = self.submissions.saturating_add(1);
                self.stage = S::Submitting;
            }
            E::OrderCreated(order) if self.stage == S::Submitting => {
                self.stage = match order.payment_method {
                    PaymentMethod::CashOnDelivery => S::Confirmed,
                    PaymentMethod::Gateway => S::AwaitingPayment,
                };
                self.order = Some(order);
                self.notice = None;
            }
            E::OrderFailed { message } if self.stage == S::Submitting => {
                self.notice = Some(message);
                self.stage = S::Details;
            }
            E::PaymentSucceeded if self.awaiting_payment() => {
                self.stage = S::Confirmed;
            }
            E::PaymentFailed { message } if self.awaiting_payment() => {
                self.stage = S::PaymentFailed { message };
            }
            other => {
                return Err(TransitionError::Invalid {
                    stage: self.stage.name(),
                    event: other.name(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn valid_form() -> CheckoutForm {
        CheckoutForm {
            first_name: "Sara".into(),
            last_name: "Ahmadi".into(),
            address_1: "12 Valiasr Street".into(),
            city: "Tehran".into(),
            state: "Tehran".into(),
            postcode: "1234567890".into(),
            email: "sara@example.com".into(),
            phone: "09123456789".into(),
            ..CheckoutForm::default()
        }
    }

    fn order(method: PaymentMethod) -> PlacedOrder {
        PlacedOrder {
            id: OrderId::new(1042),
            total: Decimal::new(2_500_000, 0),
            payment_method: method,
        }
    }

    #[test]
    fn test_valid_form() {
        let validated = valid_form().validate().unwrap();
        assert_eq!(validated.customer.email.as_str(), "sara@example.com");
        assert_eq!(validated.address.country, "IR");
        assert_eq!(validated.address.address_2, None);
        assert_eq!(validated.payment_method, PaymentMethod::Gateway);
        assert_eq!(validated.notes, None);
    }

    #[test]
    fn test_invalid_email_blocks() {
        let form = CheckoutForm {
            email: "not-an-email".into(),
            ..valid_form()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("email"), Some("Enter a valid email address"));
    }

    #[test]
    fn test_empty_form_reports_required_fields() {
        let errors = CheckoutForm::default().validate().unwrap_err();
        for field in [
            "first_name",
            "last_name",
            "address_1",
            "city",
            "state",
            "postcode",
            "email",
            "phone",
        ] {
            assert!(errors.has(field), "{field}");
        }
        assert!(!errors.has("address_2"));
        assert!(!errors.has("order_notes"));
        assert!(!errors.has("country"));
    }

    #[test]
    fn test_minimum_lengths() {
        let form = CheckoutForm {
            first_name: "S".into(),
            address_1: "Apt".into(),
            postcode: "123".into(),
            ..valid_form()
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.has("first_name"));
        assert!(errors.has("address_1"));
        assert!(errors.has("postcode"));
        assert!(!errors.has("last_name"));
    }

    #[test]
    fn test_bad_phone_and_payment_method() {
        let form = CheckoutForm {
            phone: "call me".into(),
            payment_method: "crypto".into(),
            ..valid_form()
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.has("phone"));
        assert!(errors.has("payment_method"));
    }

    #[test]
    fn test_optional_fields_are_trimmed() {
        let form = CheckoutForm {
            address_2: "  Unit 4 ".into(),
            order_notes: "   ".into(),
            payment_method: "cod".into(),
            ..valid_form()
        };
        let validated = form.validate().unwrap();
        assert_eq!(validated.address.address_2.as_deref(), Some("Unit 4"));
        assert_eq!(validated.notes, None);
        assert_eq!(validated.payment_method, PaymentMethod::CashOnDelivery);
    }

    #[test]
    fn test_happy_path_to_confirmed() {
        let mut attempt = CheckoutAttempt::start();
        attempt.apply(CheckoutEvent::Validated(valid_form())).unwrap();
        assert_eq!(attempt.stage(), &CheckoutStage::Submitting);
        attempt
            .apply(CheckoutEvent::OrderCreated(order(PaymentMethod::Gateway)))
            .unwrap();
        assert!(attempt.awaiting_payment());
        attempt.apply(CheckoutEvent::PaymentSucceeded).unwrap();
        assert!(attempt.is_confirmed());
        assert_eq!(attempt.order().unwrap().id, OrderId::new(1042));
    }

    #[test]
    fn test_validation_failure_keeps_form() {
        let mut attempt = CheckoutAttempt::start();
        let form = CheckoutForm {
            email: "not-an-email".into(),
            ..valid_form()
        };
        attempt
            .apply(CheckoutEvent::ValidationFailed(form.clone()))
            .unwrap();
        assert_eq!(attempt.stage(), &CheckoutStage::Details);
        assert_eq!(attempt.form(), Some(&form));
        assert_eq!(attempt.submissions(), 0);
    }

    #[test]
    fn test_order_failure_returns_to_details_and_flags_lookup() {
        let mut attempt = CheckoutAttempt::start();
        attempt.apply(CheckoutEvent::Validated(valid_form())).unwrap();
        assert!(!attempt.needs_lookup());
        attempt
            .apply(CheckoutEvent::OrderFailed {
                message: "timed out".into(),
            })
            .unwrap();
        assert_eq!(attempt.stage(), &CheckoutStage::Details);
        assert_eq!(attempt.notice(), Some("timed out"));
        assert_eq!(attempt.form(), Some(&valid_form()));

        let key = attempt.key();
        attempt.apply(CheckoutEvent::Validated(valid_form())).unwrap();
        assert!(attempt.needs_lookup());
        assert_eq!(attempt.key(), key);
        assert_eq!(attempt.notice(), None);
    }

    #[test]
    fn test_cash_on_delivery_skips_payment() {
        let mut attempt = CheckoutAttempt::start();
        attempt.apply(CheckoutEvent::Validated(valid_form())).unwrap();
        attempt
            .apply(CheckoutEvent::OrderCreated(order(PaymentMethod::CashOnDelivery)))
            .unwrap();
        assert!(attempt.is_confirmed());
    }

    #[test]
    fn test_payment_failure_then_retry() {
        let mut attempt = CheckoutAttempt::start();
        attempt.apply(CheckoutEvent::Validated(valid_form())).unwrap();
        attempt
            .apply(CheckoutEvent::OrderCreated(order(PaymentMethod::Gateway)))
            .unwrap();
        attempt
            .apply(CheckoutEvent::PaymentFailed {
                message: "card declined".into(),
            })
            .unwrap();
        assert_eq!(
            attempt.stage(),
            &CheckoutStage::PaymentFailed {
                message: "card declined".into()
            }
        );
        assert!(attempt.awaiting_payment());
        attempt.apply(CheckoutEvent::PaymentSucceeded).unwrap();
        assert!(attempt.is_confirmed());
    }

    #[test]
    fn test_resubmitting_after_order_is_rejected() {
        let mut attempt = CheckoutAttempt::start();
        attempt.apply(CheckoutEvent::Validated(valid_form())).unwrap();
        attempt
            .apply(CheckoutEvent::OrderCreated(order(PaymentMethod::Gateway)))
            .unwrap();
        let before = attempt.clone();
        assert_eq!(
            attempt.apply(CheckoutEvent::Validated(valid_form())),
            Err(TransitionError::OrderAlreadyPlaced)
        );
        assert_eq!(attempt, before);
    }

    #[test]
    fn test_confirmed_is_terminal() {
        let mut attempt = CheckoutAttempt::start();
        attempt.apply(CheckoutEvent::Validated(valid_form())).unwrap();
        attempt
            .apply(CheckoutEvent::OrderCreated(order(PaymentMethod::CashOnDelivery)))
            .unwrap();
        assert_eq!(
            attempt.apply(CheckoutEvent::PaymentSucceeded),
            Err(TransitionError::Finished)
        );
    }

    #[test]
    fn test_payment_before_order_is_invalid() {
        let mut attempt = CheckoutAttempt::start();
        assert!(matches!(
            attempt.apply(CheckoutEvent::PaymentSucceeded),
            Err(TransitionError::Invalid { .. })
        ));
        assert_eq!(attempt.stage(), &CheckoutStage::Review);
    }

    #[test]
    fn test_attempt_survives_serialization() {
        let mut attempt = CheckoutAttempt::start();
        attempt.apply(CheckoutEvent::Validated(valid_form())).unwrap();
        attempt
            .apply(CheckoutEvent::OrderCreated(order(PaymentMethod::Gateway)))
            .unwrap();
        attempt
            .apply(CheckoutEvent::PaymentFailed {
                message: "declined".into(),
            })
            .unwrap();
        let json = serde_json::to_string(&attempt).unwrap();
        let restored: CheckoutAttempt = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, attempt);
    }

    #[test]
    fn test_submitted_emails_keep_first_use_order() {
        let mut attempt = CheckoutAttempt::start();
        attempt.record_submitted_email("sara@exmaple.com");
        attempt.record_submitted_email("sara@example.com");
        attempt.record_submitted_email("sara@exmaple.com");
        assert_eq!(
            attempt.submitted_emails(),
            ["sara@exmaple.com".to_owned(), "sara@example.com".to_owned()]
        );
    }

    #[test]
    fn test_attempt_without_emails_still_loads() {
        let mut value = serde_json::to_value(CheckoutAttempt::start()).unwrap();
        value.as_object_mut().unwrap().remove("emails");
        let restored: CheckoutAttempt = serde_json::from_value(value).unwrap();
        assert!(restored.submitted_emails().is_empty());
    }
}
