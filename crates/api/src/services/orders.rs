//! Order placement, listings, fulfilment and payment reconciliation.
//!
//! # Placement
//!
//! 1. The address must belong to the user.
//! 2. All referenced products are locked and priced in one transaction
//!    (see [`OrderRepository::place`]); a missing or out-of-stock product
//!    rejects the whole order and nothing is written.
//! 3. Online orders then get a Stripe Checkout session built from the frozen
//!    snapshot. If any step of opening the session fails, the order is
//!    soft-cancelled.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use freshcart_core::{
    AddressId, LineItem, OrderId, OrderLineRequest, OrderStatus, PaymentType, ProductId,
    StatusTransitionError, UserId,
};

use crate::db::RepositoryError;
use crate::db::addresses::AddressRepository;
use crate::db::orders::{OrderRepository, PlaceOrderError};
use crate::db::products::ProductRepository;
use crate::models::order::{Order, OrderView};
use crate::stripe::{
    CheckoutLine, CheckoutRequest, OrderRef, PaymentOutcome, StripeClient, StripeError,
};

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error(transparent)]
    Place(#[from] PlaceOrderError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Stripe(#[from] StripeError),

    /// Stripe keys are not configured.
    #[error("online payment is not available")]
    PaymentsDisabled,

    #[error("order not found")]
    NotFound,

    #[error(transparent)]
    Transition(#[from] StatusTransitionError),
}

/// What a payment webhook did to the data store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentAction {
    /// Order marked paid and the owner's cart emptied.
    MarkedPaid(OrderId),
    /// Order was already paid; duplicate delivery.
    AlreadyPaid(OrderId),
    /// Unpaid order soft-cancelled after a failed payment.
    Cancelled(OrderId),
    /// Failed payment for an order that was already paid or closed.
    Unchanged(OrderId),
    /// No order could be correlated with the payment intent.
    Unmatched,
    /// Event type FreshCart doesn't act on.
    Ignored,
}

/// Order operations.
pub struct OrderService<'a> {
    orders: OrderRepository<'a>,
    products: ProductRepository<'a>,
    addresses: AddressRepository<'a>,
    stripe: Option<&'a StripeClient>,
}

impl<'a> OrderService<'a> {
    /// Create a new order service. `stripe` is `None` when online payment
    /// is disabled.
    #[must_use]
    pub const fn new(pool: &'a PgPool, stripe: Option<&'a StripeClient>) -> Self {
        Self {
            orders: OrderRepository::new(pool),
            products: ProductRepository::new(pool),
            addresses: AddressRepository::new(pool),
            stripe,
        }
    }

    /// Place a cash-on-delivery order.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Place` if the address or any line is invalid.
    #[instrument(skip(self, lines), fields(user_id = %user_id, lines = lines.len()))]
    pub async fn place_cod(
        &self,
        user_id: UserId,
        address_id: AddressId,
        lines: &[OrderLineRequest],
    ) -> Result<Order, OrderError> {
        let order = self
            .orders
            .place(user_id, address_id, lines, PaymentType::CashOnDelivery)
            .await?;

        tracing::info!(order_id = %order.id, amount = %order.amount, "COD order placed");
        Ok(order)
    }

    /// Place an online order and open a Stripe Checkout session for it.
    ///
    /// Returns the order and the hosted checkout URL.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::PaymentsDisabled` if Stripe isn't configured,
    /// `OrderError::Place` for invalid input, and `OrderError::Stripe` or
    /// `OrderError::Repository` if the session cannot be opened (the order is
    /// cancelled in that case).
    #[instrument(skip(self, lines, origin), fields(user_id = %user_id, lines = lines.len()))]
    pub async fn place_online(
        &self,
        user_id: UserId,
        address_id: AddressId,
        lines: &[OrderLineRequest],
        origin: &str,
    ) -> Result<(Order, String), OrderError> {
        let stripe = self.stripe.ok_or(OrderError::PaymentsDisabled)?;

        let order = self
            .orders
            .place(user_id, address_id, lines, PaymentType::Online)
            .await?;

        let checkout = self.open_checkout(stripe, &order, user_id, origin);
        let cancel = self.orders.cancel_unpaid(order.id);
        let url = cancel_if_failed(order.id, checkout, cancel).await?;

        tracing::info!(order_id = %order.id, amount = %order.amount, "Online order placed");
        Ok((order, url))
    }

    /// Create the Checkout session for a placed order and return its URL.
    async fn open_checkout(
        &self,
        stripe: &StripeClient,
        order: &Order,
        user_id: UserId,
        origin: &str,
    ) -> Result<String, OrderError> {
        let request = CheckoutRequest {
            order_id: order.id,
            user_id,
            lines: self.checkout_lines(order).await?,
            success_url: format!("{origin}/loader?next=my-orders"),
            cancel_url: format!("{origin}/cart"),
        };

        let session = stripe.create_checkout_session(&request).await?;
        self.orders
            .set_checkout_session(order.id, &session.id)
            .await?;

        session
            .url
            .ok_or_else(|| StripeError::MissingUrl(session.id.clone()).into())
    }

    /// Build checkout lines from an order's frozen snapshot.
    ///
    /// Product names are looked up for display only; prices always come from
    /// the snapshot. The final "Tax" line brings the checkout total to the
    /// order amount.
    async fn checkout_lines(&self, order: &Order) -> Result<Vec<CheckoutLine>, RepositoryError> {
        let ids: Vec<ProductId> = order.product_ids().collect();
        let names: HashMap<ProductId, String> = self
            .products
            .get_many(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();

        Ok(checkout_lines(&order.items, order.amount, &names))
    }

    /// A user's listable orders with products and address populated.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if a query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<OrderView>, OrderError> {
        let orders = self.orders.list_for_user(user_id).await?;
        self.populate(orders).await
    }

    /// Every listable order with products and address populated (seller view).
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if a query fails.
    pub async fn list_all(&self) -> Result<Vec<OrderView>, OrderError> {
        let orders = self.orders.list_all().await?;
        self.populate(orders).await
    }

    async fn populate(&self, orders: Vec<Order>) -> Result<Vec<OrderView>, OrderError> {
        let orders: Vec<Order> = orders.into_iter().filter(Order::is_listable).collect();

        let mut product_ids: Vec<ProductId> = orders.iter().flat_map(Order::product_ids).collect();
        product_ids.sort_unstable();
        product_ids.dedup();
        let mut address_ids: Vec<AddressId> = orders.iter().map(|o| o.address_id).collect();
        address_ids.sort_unstable();
        address_ids.dedup();

        let products: HashMap<_, _> = self
            .products
            .get_many(&product_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let addresses: HashMap<_, _> = self
            .addresses
            .get_many(&address_ids)
            .await?
            .into_iter()
            .map(|a| (a.id, a))
            .collect();

        Ok(orders
            .into_iter()
            .filter_map(|order| {
                let address = addresses.get(&order.address_id).cloned();
                order.populate(&products, address)
            })
            .collect())
    }

    /// Move an order to a new status (seller only).
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` for an unknown order and
    /// `OrderError::Transition` if the change isn't allowed.
    #[instrument(skip(self))]
    pub async fn update_status(&self, id: OrderId, to: OrderStatus) -> Result<Order, OrderError> {
        let order = self.orders.get(id).await?.ok_or(OrderError::NotFound)?;
        let to = order.status.transition_to(to)?;

        let updated = self.orders.update_status(id, order.status, to).await?;
        tracing::info!(order_id = %id, from = %order.status, to = %to, "Order status updated");
        Ok(updated)
    }

    /// Apply a verified payment webhook.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` or `OrderError::Stripe` on failure;
    /// the caller should answer non-2xx so Stripe retries.
    #[instrument(skip(self, outcome))]
    pub async fn apply_payment(&self, outcome: PaymentOutcome) -> Result<PaymentAction, OrderError> {
        let (succeeded, payment_intent, order) = match outcome {
            PaymentOutcome::Succeeded {
                payment_intent,
                order,
            } => (true, payment_intent, order),
            PaymentOutcome::Failed {
                payment_intent,
                order,
            } => (false, payment_intent, order),
            PaymentOutcome::Ignored(kind) => {
                tracing::debug!(event_type = %kind, "Ignoring webhook event");
                return Ok(PaymentAction::Ignored);
            }
        };

        let Some(order) = self.resolve_order(&payment_intent, order).await? else {
            tracing::warn!(payment_intent = %payment_intent, "No order metadata for payment intent");
            return Ok(PaymentAction::Unmatched);
        };

        if succeeded {
            if self.orders.mark_paid(order.order_id, order.user_id).await? {
                tracing::info!(order_id = %order.order_id, "Order paid");
                Ok(PaymentAction::MarkedPaid(order.order_id))
            } else {
                tracing::info!(order_id = %order.order_id, "Duplicate payment notification");
                Ok(PaymentAction::AlreadyPaid(order.order_id))
            }
        } else if self.orders.cancel_unpaid(order.order_id).await? {
            tracing::warn!(order_id = %order.order_id, "Payment failed, order cancelled");
            Ok(PaymentAction::Cancelled(order.order_id))
        } else {
            Ok(PaymentAction::Unchanged(order.order_id))
        }
    }

    /// Use the intent's metadata, falling back to the checkout session.
    async fn resolve_order(
        &self,
        payment_intent: &str,
        order: Option<OrderRef>,
    ) -> Result<Option<OrderRef>, OrderError> {
        if order.is_some() {
            return Ok(order);
        }
        let Some(stripe) = self.stripe else {
            return Ok(None);
        };

        let session = stripe.find_session_by_payment_intent(payment_intent).await?;
        Ok(session.and_then(|s| OrderRef::from_metadata(&s.metadata)))
    }
}

/// Run `checkout`; if it fails, soft-cancel the already committed order.
///
/// `cancel` is only polled on failure. A failed cancel is logged and the
/// original error is returned.
async fn cancel_if_failed<T>(
    order_id: OrderId,
    checkout: impl Future<Output = Result<T, OrderError>>,
    cancel: impl Future<Output = Result<bool, RepositoryError>>,
) -> Result<T, OrderError> {
    match checkout.await {
        Ok(value) => Ok(value),
        Err(err) => {
            match cancel.await {
                Ok(_) => tracing::warn!(
                    order_id = %order_id,
                    error = %err,
                    "Checkout failed, order cancelled"
                ),
                Err(cancel_err) => tracing::error!(
                    order_id = %order_id,
                    error = %cancel_err,
                    "Failed to cancel order after checkout error"
                ),
            }
            Err(err)
        }
    }
}

/// Checkout lines for a snapshot: one per item, plus a tax line equal to
/// `amount - subtotal` when positive.
///
/// When the subtotal is fractional and too small to earn tax, the floor in
/// the order amount makes `amount < subtotal`. Item lines would then
/// overcharge, so the order is sent as one line priced at `amount`.
fn checkout_lines(
    items: &[LineItem],
    amount: Decimal,
    names: &HashMap<ProductId, String>,
) -> Vec<CheckoutLine> {
    let mut lines: Vec<CheckoutLine> = items
        .iter()
        .map(|item| CheckoutLine {
            name: names
                .get(&item.product)
                .cloned()
                .unwrap_or_else(|| format!("Product #{}", item.product)),
            unit_price: item.price,
            quantity: item.quantity,
        })
        .collect();

    let subtotal: Decimal = items.iter().map(LineItem::line_total).sum();
    if amount < subtotal {
        tracing::debug!(%amount, %subtotal, "Amount below subtotal, charging a single line");
        let name = lines
            .iter()
            .map(|line| format!("{} x{}", line.name, line.quantity))
            .collect::<Vec<_>>()
            .join(", ");
        return vec![CheckoutLine {
            name,
            unit_price: amount,
            quantity: 1,
        }];
    }

    let tax = amount - subtotal;
    if tax > Decimal::ZERO {
        lines.push(CheckoutLine {
            name: "Tax".to_owned(),
            unit_price: tax,
            quantity: 1,
        });
    }

    lines
}
