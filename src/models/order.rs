use super::{Item, ShippingAddress};
use chrono::{DateTime, Utc};
use ethers::types::{Address, H256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Success,
    Failure,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Success => "Success",
            OrderStatus::Failure => "Failure",
        };
        f.write_str(s)
    }
}

/// Identifier assigned by the order API when a pending order is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Returns `None` for blank identifiers; an order without an id cannot be reconciled.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            None
        } else {
            Some(Self(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body of `POST /transactions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub seller: Address,
    pub buyer: Address,
    pub item_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub sale_price: Decimal,
    pub purchase_date: DateTime<Utc>,
    pub order_status: OrderStatus,
    pub shipping_address: ShippingAddress,
}

impl NewOrder {
    pub fn pending(item: &Item, buyer: Address, shipping_address: ShippingAddress) -> Self {
        Self {
            seller: item.seller,
            buyer,
            item_id: item.item_id().to_string(),
            sale_price: item.price,
            purchase_date: Utc::now(),
            order_status: OrderStatus::Pending,
            shipping_address,
        }
    }
}

/// Body of `PUT /transactions/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusUpdate {
    pub order_status: OrderStatus,
}

/// Local view of an order record held by the order API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub seller: Address,
    pub buyer: Address,
    pub item_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub sale_price: Decimal,
    pub purchase_date: DateTime<Utc>,
    pub order_status: OrderStatus,
    pub shipping_address: ShippingAddress,
}

impl Order {
    pub fn from_pending(id: OrderId, order: NewOrder) -> Self {
        Self {
            id,
            seller: order.seller,
            buyer: order.buyer,
            item_id: order.item_id,
            sale_price: order.sale_price,
            purchase_date: order.purchase_date,
            order_status: order.order_status,
            shipping_address: order.shipping_address,
        }
    }

    /// Moves a pending order to its terminal status. Terminal orders never change again.
    pub fn settle(&mut self, status: OrderStatus) -> bool {
        if self.order_status != OrderStatus::Pending || status == OrderStatus::Pending {
            return false;
        }
        self.order_status = status;
        true
    }
}

/// Result of one checkout attempt, shown on the payment page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckoutOutcome {
    /// The order API never issued an id, so no funds moved.
    OrderNotCreated { reason: String },
    Paid {
        order: Order,
        tx_hash: H256,
        reconciled: bool,
    },
    PaymentFailed {
        order: Order,
        reason: String,
        reconciled: bool,
    },
}

impl CheckoutOutcome {
    pub fn order(&self) -> Option<&Order> {
        match self {
            CheckoutOutcome::OrderNotCreated { .. } => None,
            CheckoutOutcome::Paid { order, .. } | CheckoutOutcome::PaymentFailed { order, .. } => {
                Some(order)
            }
        }
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, CheckoutOutcome::Paid { .. })
    }
}
