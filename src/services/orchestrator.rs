//! Checkout orchestration: create a pending order, pay, then reconcile.
//!
//! The steps are sequential awaits, never concurrent, and there is no rollback.
//! An order id always exists before a transfer is attempted, and every order
//! that reaches the transfer step gets exactly one terminal status pushed back
//! to the order API. Only one attempt runs at a time.

use crate::{
    error::CheckoutError,
    models::{
        ChainId, CheckoutOutcome, Item, NewOrder, Order, OrderId, OrderStatus, ShippingAddress,
        WalletSession,
    },
    services::{order_api::OrderApiClient, wallet::WalletSessionManager},
};
use ethers::types::{Address, TransactionReceipt};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// The single action offered in the payment panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutAction {
    ConnectWallet,
    SwitchNetwork,
    ConfirmPayment,
    InsufficientFunds,
}

/// Decides what the payment panel offers for the current session.
pub fn admission(session: &WalletSession, target_chain: ChainId, price: Decimal) -> CheckoutAction {
    if !session.is_connected() {
        CheckoutAction::ConnectWallet
    } else if !session.is_on_chain(target_chain) {
        CheckoutAction::SwitchNetwork
    } else if session.balance > price {
        CheckoutAction::ConfirmPayment
    } else {
        CheckoutAction::InsufficientFunds
    }
}

pub const PAYMENT_IN_PROGRESS: &str = "Payment already in progress";

/// Page state driven by checkout attempts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckoutState {
    pub loading: bool,
    pub error: Option<String>,
    pub last_outcome: Option<CheckoutOutcome>,
}

pub struct OrderOrchestrator {
    wallet: Arc<WalletSessionManager>,
    orders: OrderApiClient,
    state: RwLock<CheckoutState>,
    attempt: Mutex<()>,
}

impl OrderOrchestrator {
    pub fn new(wallet: Arc<WalletSessionManager>, orders: OrderApiClient) -> Self {
        Self {
            wallet,
            orders,
            state: RwLock::new(CheckoutState::default()),
            attempt: Mutex::new(()),
        }
    }

    pub fn wallet(&self) -> &Arc<WalletSessionManager> {
        &self.wallet
    }

    pub async fn state(&self) -> CheckoutState {
        self.state.read().await.clone()
    }

    /// Shows `err` inline on the page.
    pub async fn record_error(&self, err: &CheckoutError) {
        self.state.write().await.error = Some(err.user_message());
    }

    /// Phase one: registers a pending order and returns its identifier.
    pub async fn create_order(
        &self,
        item: &Item,
        buyer: Address,
        shipping_address: ShippingAddress,
    ) -> Result<Order, CheckoutError> {
        let pending = NewOrder::pending(item, buyer, shipping_address);
        let id = self.orders.create_order(&pending).await?;
        Ok(Order::from_pending(id, pending))
    }

    /// Phase two: pays the seller, then pushes the matching terminal status.
    ///
    /// Returns the transfer result and whether the order API acknowledged the status.
    pub async fn execute_and_reconcile(
        &self,
        order_id: &OrderId,
        item: &Item,
    ) -> (Result<TransactionReceipt, CheckoutError>, bool) {
        let transfer = self.wallet.send_transfer(item.seller, item.price).await;

        let status = match &transfer {
            Ok(_) => OrderStatus::Success,
            Err(e) => {
                tracing::warn!(order_id = %order_id, "Transfer failed: {}", e);
                OrderStatus::Failure
            }
        };

        let reconciled = match self.orders.reconcile(order_id, status).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(order_id = %order_id, %status, "{}", e);
                false
            }
        };

        (transfer, reconciled)
    }

    /// Runs one full checkout attempt for `item`.
    ///
    /// Fails with [`CheckoutError::NotAdmitted`] while another attempt is in flight.
    pub async fn checkout(
        &self,
        item: &Item,
        shipping_address: ShippingAddress,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        let _attempt = self.attempt.try_lock().map_err(|_| {
            tracing::warn!("Checkout refused: a payment is already in progress");
            CheckoutError::NotAdmitted(PAYMENT_IN_PROGRESS.to_string())
        })?;

        {
            let mut state = self.state.write().await;
            state.loading = true;
            state.error = None;
        }

        let outcome = self.run(item, shipping_address).await;

        let mut state = self.state.write().await;
        state.loading = false;
        state.error = match &outcome {
            CheckoutOutcome::Paid { .. } => None,
            CheckoutOutcome::OrderNotCreated { reason }
            | CheckoutOutcome::PaymentFailed { reason, .. } => Some(reason.clone()),
        };
        state.last_outcome = Some(outcome.clone());
        Ok(outcome)
    }

    async fn run(&self, item: &Item, shipping_address: ShippingAddress) -> CheckoutOutcome {
        let buyer = match self.wallet.session().await.address {
            Some(address) => address,
            None => {
                return CheckoutOutcome::OrderNotCreated {
                    reason: CheckoutError::NotConnected.user_message(),
                }
            }
        };

        let mut order = match self.create_order(item, buyer, shipping_address).await {
            Ok(order) => order,
            Err(e) => {
                tracing::error!("Checkout aborted before payment: {}", e);
                return CheckoutOutcome::OrderNotCreated {
                    reason: e.user_message(),
                };
            }
        };

        let (transfer, reconciled) = self.execute_and_reconcile(&order.id, item).await;

        match transfer {
            Ok(receipt) => {
                order.settle(OrderStatus::Success);
                CheckoutOutcome::Paid {
                    order,
                    tx_hash: receipt.transaction_hash,
                    reconciled,
                }
            }
            Err(e) => {
                order.settle(OrderStatus::Failure);
                CheckoutOutcome::PaymentFailed {
                    order,
                    reason: e.user_message(),
                    reconciled,
                }
            }
        }
    }
}
