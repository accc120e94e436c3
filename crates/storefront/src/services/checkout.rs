//! Checkout flow: order submission and payment.
//!
//! Route handlers own the session; this module owns the remote calls. Both
//! remotes sit behind traits ([`OrderApi`], [`PaymentGateway`]) so the flow
//! can be driven without a network.
//!
//! Every remote failure ends as a customer-facing message on the attempt;
//! nothing here returns an error to the handler.

use async_trait::async_trait;
use tracing::instrument;
use uuid::Uuid;

use autoparts_core::{
    Cart, CheckoutAttempt, CheckoutEvent, CheckoutForm, CurrencyCode, CustomerId, FieldErrors,
    OrderId, OrderStatus, PaymentMethod, PlacedOrder, ValidatedCheckout,
};

use crate::commerce::{CommerceClient, CommerceError, NewOrder, Order, OrderUpdate};

use super::payment::{PaymentGateway, PaymentOutcome, PaymentRequest};

/// Shown when we cannot tell whether an earlier submission created an order.
const LOOKUP_FAILED_MESSAGE: &str =
    "We could not confirm whether your order went through. Please try again in a moment.";

/// Shown when the payment provider cannot be reached.
const GATEWAY_UNREACHABLE_MESSAGE: &str =
    "We could not reach the payment provider. Your order is saved, please try again.";

/// The order operations checkout needs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderApi: Send + Sync {
    /// Create an order, sending `key` as its idempotency key.
    async fn create_order(&self, order: &NewOrder, key: Uuid) -> Result<Order, CommerceError>;

    /// Find a recent order for `email` that carries checkout key `key`.
    async fn find_order_by_checkout_key(
        &self,
        email: &str,
        key: Uuid,
    ) -> Result<Option<Order>, CommerceError>;

    /// Current status of an order.
    async fn order_status(&self, id: OrderId) -> Result<OrderStatus, CommerceError>;

    /// Record a successful payment.
    async fn mark_paid(
        &self,
        id: OrderId,
        transaction_id: Option<String>,
    ) -> Result<(), CommerceError>;

    /// Record a failed payment.
    async fn mark_failed(&self, id: OrderId) -> Result<(), CommerceError>;
}

#[async_trait]
impl OrderApi for CommerceClient {
    async fn create_order(&self, order: &NewOrder, key: Uuid) -> Result<Order, CommerceError> {
        Self::create_order(self, order, key).await
    }

    async fn find_order_by_checkout_key(
        &self,
        email: &str,
        key: Uuid,
    ) -> Result<Option<Order>, CommerceError> {
        let key = key.to_string();
        let orders = self.orders_for_email(email).await?;
        Ok(orders
            .into_iter()
            .find(|order| order.checkout_key() == Some(key.as_str())))
    }

    async fn order_status(&self, id: OrderId) -> Result<OrderStatus, CommerceError> {
        self.order(id).await.map(|order| order.status)
    }

    async fn mark_paid(
        &self,
        id: OrderId,
        transaction_id: Option<String>,
    ) -> Result<(), CommerceError> {
        let update = OrderUpdate {
            status: Some(OrderStatus::Processing),
            set_paid: Some(true),
            transaction_id,
        };
        self.update_order(id, &update).await.map(|_| ())
    }

    async fn mark_failed(&self, id: OrderId) -> Result<(), CommerceError> {
        let update = OrderUpdate {
            status: Some(OrderStatus::Failed),
            ..OrderUpdate::default()
        };
        self.update_order(id, &update).await.map(|_| ())
    }
}

/// Result of posting the checkout form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The form has errors; nothing was sent.
    Invalid(FieldErrors),
    /// An order exists for the attempt (created now or found again).
    Placed(PlacedOrder),
    /// The attempt already held an order; nothing was sent.
    AlreadyPlaced(PlacedOrder),
    /// The order could not be created; the message is on the attempt.
    Failed(String),
}

/// Result of a payment attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentResult {
    Paid {
        order: PlacedOrder,
        reference: Option<String>,
    },
    Failed(String),
    /// The attempt is not waiting for payment.
    NotPayable,
}

/// Drives a [`CheckoutAttempt`] through order submission and payment.
pub struct CheckoutService<'a> {
    orders: &'a dyn OrderApi,
    gateway: &'a dyn PaymentGateway,
    currency: CurrencyCode,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(
        orders: &'a dyn OrderApi,
        gateway: &'a dyn PaymentGateway,
        currency: CurrencyCode,
    ) -> Self {
        Self {
            orders,
            gateway,
            currency,
        }
    }

    /// Validate the form and move the attempt to `Submitting`.
    ///
    /// Makes no remote calls. The attempt returned in `Submitting` should be
    /// persisted before [`place`](Self::place) so a lost request still
    /// leaves its key and submission count behind.
    ///
    /// # Errors
    ///
    /// Returns the final outcome when there is nothing to send: the form is
    /// invalid, or the attempt already holds an order.
    pub fn begin(
        attempt: &mut CheckoutAttempt,
        form: CheckoutForm,
    ) -> Result<ValidatedCheckout, SubmitOutcome> {
        if let Some(order) = attempt.order() {
            return Err(SubmitOutcome::AlreadyPlaced(order.clone()));
        }

        let validated = match form.validate() {
            Ok(validated) => validated,
            Err(errors) => {
                if let Err(e) = attempt.apply(CheckoutEvent::ValidationFailed(form)) {
                    tracing::warn!(error = %e, "Unexpected checkout transition");
                }
                return Err(SubmitOutcome::Invalid(errors));
            }
        };

        if let Err(e) = attempt.apply(CheckoutEvent::Validated(form)) {
            tracing::warn!(error = %e, "Unexpected checkout transition");
            return Err(SubmitOutcome::Failed(e.to_string()));
        }
        attempt.record_submitted_email(validated.customer.email.as_str());
        Ok(validated)
    }

    /// Create the order for an attempt in `Submitting`.
    ///
    /// After a failed or interrupted submission the earlier request may still
    /// have created the order, so it is looked up by checkout key under every
    /// email the attempt has used before creating another.
    #[instrument(skip_all, fields(checkout_key = %attempt.key()))]
    pub async fn place(
        &self,
        attempt: &mut CheckoutAttempt,
        validated: &ValidatedCheckout,
        cart: &Cart,
        customer_id: Option<CustomerId>,
    ) -> SubmitOutcome {
        let key = attempt.key();

        if attempt.needs_lookup() {
            match self.find_earlier_order(attempt).await {
                Ok(Some(order)) => {
                    tracing::info!(order_id = %order.id, "Reusing order from an earlier submission");
                    let method = order.payment_method();
                    return Self::record_order(attempt, &order, method, cart);
                }
                Ok(None) => {}
                Err(e) => {
                    // Creating blind could duplicate the order.
                    tracing::error!(error = %e, "Order lookup before resubmission failed");
                    return Self::fail(attempt, LOOKUP_FAILED_MESSAGE.to_owned());
                }
            }
        }

        let new_order = NewOrder::from_checkout(validated, cart, &key.to_string(), customer_id);
        match self.orders.create_order(&new_order, key).await {
            Ok(order) => Self::record_order(attempt, &order, validated.payment_method, cart),
            Err(e) => {
                tracing::error!(error = %e, "Order creation failed");
                Self::fail(attempt, e.customer_message())
            }
        }
    }

    async fn find_earlier_order(
        &self,
        attempt: &CheckoutAttempt,
    ) -> Result<Option<Order>, CommerceError> {
        for email in attempt.submitted_emails() {
            if let Some(order) = self
                .orders
                .find_order_by_checkout_key(email, attempt.key())
                .await?
            {
                return Ok(Some(order));
            }
        }
        Ok(None)
    }

    fn record_order(
        attempt: &mut CheckoutAttempt,
        order: &Order,
        payment_method: PaymentMethod,
        cart: &Cart,
    ) -> SubmitOutcome {
        let placed = PlacedOrder {
            id: order.id,
            total: order.total.unwrap_or_else(|| cart.total_price()),
            payment_method,
        };
        match attempt.apply(CheckoutEvent::OrderCreated(placed.clone())) {
            Ok(()) => SubmitOutcome::Placed(placed),
            Err(e) => {
                tracing::warn!(error = %e, "Unexpected checkout transition");
                SubmitOutcome::Failed(e.to_string())
            }
        }
    }

    fn fail(attempt: &mut CheckoutAttempt, message: String) -> SubmitOutcome {
        if let Err(e) = attempt.apply(CheckoutEvent::OrderFailed {
            message: message.clone(),
        }) {
            tracing::warn!(error = %e, "Unexpected checkout transition");
        }
        SubmitOutcome::Failed(message)
    }

    /// Charge the attempt's order.
    ///
    /// Retries send exactly the same request: same order and amount. An
    /// order the store already reports as paid is confirmed without charging.
    #[instrument(skip_all, fields(checkout_key = %attempt.key()))]
    pub async fn pay(&self, attempt: &mut CheckoutAttempt) -> PaymentResult {
        let Some(order) = attempt.order().cloned() else {
            return PaymentResult::NotPayable;
        };
        if !attempt.awaiting_payment() {
            return PaymentResult::NotPayable;
        }

        match self.orders.order_status(order.id).await {
            Ok(status) if status.is_paid() => {
                tracing::info!(order_id = %order.id, %status, "Order already paid");
                if let Err(e) = attempt.apply(CheckoutEvent::PaymentSucceeded) {
                    tracing::warn!(error = %e, "Unexpected checkout transition");
                }
                return PaymentResult::Paid {
                    order,
                    reference: None,
                };
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, order_id = %order.id, "Could not check order status before charging");
            }
        }

        let request = PaymentRequest {
            order_id: order.id,
            amount: order.total,
            currency: self.currency,
        };

        let (event, result) = match self.gateway.charge(&request).await {
            Ok(PaymentOutcome::Approved { reference }) => {
                tracing::info!(order_id = %order.id, "Payment approved");
                if let Err(e) = self.orders.mark_paid(order.id, reference.clone()).await {
                    // The customer has paid; the merchant reconciles from logs.
                    tracing::error!(error = %e, order_id = %order.id, "Failed to mark order paid");
                }
                (
                    CheckoutEvent::PaymentSucceeded,
                    PaymentResult::Paid { order, reference },
                )
            }
            Ok(PaymentOutcome::Declined { message }) => {
                tracing::warn!(order_id = %order.id, %message, "Payment declined");
                if let Err(e) = self.orders.mark_failed(order.id).await {
                    tracing::warn!(error = %e, "Failed to mark order failed");
                }
                (
                    CheckoutEvent::PaymentFailed {
                        message: message.clone(),
                    },
                    PaymentResult::Failed(message),
                )
            }
            Err(e) => {
                tracing::error!(error = %e, order_id = %order.id, "Payment gateway request failed");
                let message = GATEWAY_UNREACHABLE_MESSAGE.to_owned();
                (
                    CheckoutEvent::PaymentFailed {
                        message: message.clone(),
                    },
                    PaymentResult::Failed(message),
                )
            }
        };

        if let Err(e) = attempt.apply(event) {
            tracing::warn!(error = %e, "Unexpected checkout transition");
        }
        result
    }
}
