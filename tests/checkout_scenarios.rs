//! End-to-end checkout attempts against a mocked order API and an in-memory wallet.

use backdoor::{
    error::CheckoutError,
    models::{ChainId, CheckoutOutcome, Item, OrderStatus, ShippingAddress},
    services::{
        admission, CheckoutAction, MockWalletProvider, OrderApiClient, OrderOrchestrator,
        RetryPolicy, TransferBehavior, WalletProvider, WalletSessionManager, PAYMENT_IN_PROGRESS,
    },
};
use ethers::types::Address;
use mockito::{Matcher, Server};
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_test::{assert_err, assert_ok};

const TARGET: ChainId = ChainId::new(4);

fn orchestrator(order_api: &str, wallet: Option<Arc<MockWalletProvider>>) -> OrderOrchestrator {
    let provider = wallet.map(|w| w as Arc<dyn WalletProvider>);
    let manager = Arc::new(WalletSessionManager::new(provider, TARGET, 1));
    let orders = OrderApiClient::new(
        order_api,
        RetryPolicy {
            max_attempts: 3,
            backoff: Duration::from_millis(1),
        },
    );
    OrderOrchestrator::new(manager, orders)
}

fn funded_wallet(chain: ChainId) -> Arc<MockWalletProvider> {
    Arc::new(MockWalletProvider::new(chain).with_balance_ether(Decimal::new(5, 1)))
}

fn shipping() -> ShippingAddress {
    ShippingAddress {
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        email_address: "ada@example.com".into(),
        country: "Canada".into(),
        street_address: "1 Analytical Way".into(),
        city: "Toronto".into(),
        state: "Ontario".into(),
        postal_code: "M5V 2T6".into(),
    }
}

async fn mock_create(server: &mut Server, id: &str) -> mockito::Mock {
    server
        .mock("POST", "/transactions")
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(json!({
            "seller": "0x78bca437e8d6c961a1f1f7d97c81781044195bcf",
            "itemId": "0xtest",
            "salePrice": 0.1,
            "orderStatus": "Pending",
            "shippingAddress": { "firstName": "Ada", "city": "Toronto" },
        })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(format!("\"{}\"", id))
        .expect(1)
        .create_async()
        .await
}

async fn mock_reconcile(server: &mut Server, id: &str, status: &str, hits: usize) -> mockito::Mock {
    server
        .mock("PUT", format!("/transactions/{}", id).as_str())
        .match_header("idempotency-key", Matcher::Regex("^[0-9a-f-]{36}$".into()))
        .match_body(Matcher::Json(json!({ "orderStatus": status })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(r#"{{"_id":"{}","orderStatus":"{}"}}"#, id, status))
        .expect(hits)
        .create_async()
        .await
}

// ---------------------------------------------------------------------------
// Scenario A: no wallet provider
// ---------------------------------------------------------------------------

#[tokio::test]
async fn no_provider_signals_absent_and_stays_disconnected() {
    let checkout = orchestrator("http://127.0.0.1:9", None);

    let err = assert_err!(checkout.wallet().connect().await);
    assert!(matches!(err, CheckoutError::ProviderAbsent));

    let session = checkout.wallet().session().await;
    assert!(!session.is_connected());
    assert_eq!(
        admission(&session, TARGET, Item::checkout_item().price),
        CheckoutAction::ConnectWallet
    );
}

// ---------------------------------------------------------------------------
// Scenario B: connected on the wrong chain
// ---------------------------------------------------------------------------

#[tokio::test]
async fn chain_mismatch_only_offers_switch() {
    let wallet = funded_wallet(ChainId::new(1));
    let checkout = orchestrator("http://127.0.0.1:9", Some(wallet));

    let session = assert_ok!(checkout.wallet().connect().await);
    assert_eq!(session.balance, Decimal::new(5, 1));
    assert_eq!(
        admission(&session, TARGET, Decimal::new(1, 1)),
        CheckoutAction::SwitchNetwork
    );

    assert_ok!(checkout.wallet().switch_network().await);
    let session = checkout.wallet().session().await;
    assert_eq!(
        admission(&session, TARGET, Decimal::new(1, 1)),
        CheckoutAction::ConfirmPayment
    );
}

#[tokio::test]
async fn low_balance_offers_nothing() {
    let wallet = Arc::new(MockWalletProvider::new(TARGET).with_balance_ether(Decimal::new(4, 2)));
    let checkout = orchestrator("http://127.0.0.1:9", Some(wallet));

    let session = assert_ok!(checkout.wallet().connect().await);
    assert_eq!(session.balance, Decimal::ZERO);
    assert_eq!(
        admission(&session, TARGET, Decimal::new(1, 1)),
        CheckoutAction::InsufficientFunds
    );
}

// ---------------------------------------------------------------------------
// Scenario C: happy path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn successful_transfer_marks_order_success() {
    let mut server = Server::new_async().await;
    let create = mock_create(&mut server, "abc123").await;
    let success = mock_reconcile(&mut server, "abc123", "Success", 1).await;
    let failure = mock_reconcile(&mut server, "abc123", "Failure", 0).await;

    let wallet = funded_wallet(TARGET);
    let checkout = orchestrator(&server.url(), Some(wallet.clone()));
    assert_ok!(checkout.wallet().connect().await);

    let item = Item::checkout_item();
    let outcome = assert_ok!(checkout.checkout(&item, shipping()).await);

    create.assert_async().await;
    success.assert_async().await;
    failure.assert_async().await;

    match &outcome {
        CheckoutOutcome::Paid {
            order, reconciled, ..
        } => {
            assert_eq!(order.id.as_str(), "abc123");
            assert_eq!(order.order_status, OrderStatus::Success);
            assert!(reconciled);
        }
        other => panic!("expected a paid order, got {other:?}"),
    }

    let sent = wallet.sent_transfers();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, item.seller);
    assert_eq!(sent[0].from, wallet.account());

    let state = checkout.state().await;
    assert!(!state.loading);
    assert!(state.error.is_none());
    assert_eq!(state.last_outcome, Some(outcome));
}

// ---------------------------------------------------------------------------
// Scenario D: the user rejects the transfer
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rejected_transfer_marks_order_failure() {
    let mut server = Server::new_async().await;
    let create = mock_create(&mut server, "abc123").await;
    let success = mock_reconcile(&mut server, "abc123", "Success", 0).await;
    let failure = mock_reconcile(&mut server, "abc123", "Failure", 1).await;

    let wallet = Arc::new(
        MockWalletProvider::new(TARGET)
            .with_balance_ether(Decimal::new(5, 1))
            .with_transfer_behavior(TransferBehavior::Reject),
    );
    let checkout = orchestrator(&server.url(), Some(wallet.clone()));
    assert_ok!(checkout.wallet().connect().await);

    let outcome = assert_ok!(checkout.checkout(&Item::checkout_item(), shipping()).await);

    create.assert_async().await;
    success.assert_async().await;
    failure.assert_async().await;

    match outcome {
        CheckoutOutcome::PaymentFailed {
            order, reconciled, ..
        } => {
            assert_eq!(order.order_status, OrderStatus::Failure);
            assert!(reconciled);
        }
        other => panic!("expected a failed payment, got {other:?}"),
    }

    let state = checkout.state().await;
    assert!(!state.loading);
    assert_eq!(state.error.as_deref(), Some("User denied transaction signature."));
    assert!(wallet.sent_transfers().is_empty());
}

#[tokio::test]
async fn reverted_transfer_marks_order_failure() {
    let mut server = Server::new_async().await;
    let _create = mock_create(&mut server, "rev1").await;
    let failure = mock_reconcile(&mut server, "rev1", "Failure", 1).await;

    let wallet = Arc::new(
        MockWalletProvider::new(TARGET)
            .with_balance_ether(Decimal::new(5, 1))
            .with_transfer_behavior(TransferBehavior::Revert),
    );
    let checkout = orchestrator(&server.url(), Some(wallet));
    assert_ok!(checkout.wallet().connect().await);

    let outcome = assert_ok!(checkout.checkout(&Item::checkout_item(), shipping()).await);
    failure.assert_async().await;
    assert!(!outcome.is_paid());
    assert!(checkout.state().await.error.unwrap().contains("reverted"));
}

#[tokio::test]
async fn dropped_transfer_marks_order_failure() {
    let mut server = Server::new_async().await;
    let _create = mock_create(&mut server, "drop1").await;
    let success = mock_reconcile(&mut server, "drop1", "Success", 0).await;
    let failure = mock_reconcile(&mut server, "drop1", "Failure", 1).await;

    let buyer = Address::repeat_byte(0x42);
    let wallet = Arc::new(
        MockWalletProvider::new(TARGET)
            .with_account(buyer)
            .with_balance_ether(Decimal::new(5, 1))
            .with_transfer_behavior(TransferBehavior::Drop),
    );
    let checkout = orchestrator(&server.url(), Some(wallet.clone()));
    assert_ok!(checkout.wallet().connect().await);

    let outcome = assert_ok!(checkout.checkout(&Item::checkout_item(), shipping()).await);

    success.assert_async().await;
    failure.assert_async().await;
    match &outcome {
        CheckoutOutcome::PaymentFailed {
            order, reconciled, ..
        } => {
            assert_eq!(order.buyer, buyer);
            assert_eq!(order.order_status, OrderStatus::Failure);
            assert!(reconciled);
        }
        other => panic!("expected a failed payment, got {other:?}"),
    }

    let sent = wallet.sent_transfers();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].from, buyer);

    let state = checkout.state().await;
    assert!(!state.loading);
    assert_eq!(state.error.as_deref(), Some("Transaction dropped"));
}

// ---------------------------------------------------------------------------
// One attempt at a time
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_confirm_is_refused_while_payment_in_flight() {
    let mut server = Server::new_async().await;
    let create = mock_create(&mut server, "abc123").await;
    let success = mock_reconcile(&mut server, "abc123", "Success", 1).await;

    let gate = Arc::new(Notify::new());
    let wallet = Arc::new(
        MockWalletProvider::new(TARGET)
            .with_balance_ether(Decimal::new(5, 1))
            .with_transfer_gate(gate.clone()),
    );
    let checkout = Arc::new(orchestrator(&server.url(), Some(wallet.clone())));
    assert_ok!(checkout.wallet().connect().await);

    let first = {
        let checkout = checkout.clone();
        tokio::spawn(async move {
            checkout
                .checkout(&Item::checkout_item(), shipping())
                .await
        })
    };
    while !checkout.state().await.loading {
        tokio::task::yield_now().await;
    }

    let err = assert_err!(checkout.checkout(&Item::checkout_item(), shipping()).await);
    assert!(matches!(
        err,
        CheckoutError::NotAdmitted(ref reason) if reason == PAYMENT_IN_PROGRESS
    ));
    assert!(checkout.state().await.loading);
    assert!(wallet.sent_transfers().is_empty());

    gate.notify_one();
    let outcome = assert_ok!(assert_ok!(first.await));
    assert!(outcome.is_paid());

    create.assert_async().await;
    success.assert_async().await;
    assert_eq!(wallet.sent_transfers().len(), 1);
    assert!(!checkout.state().await.loading);
}

// ---------------------------------------------------------------------------
// Scenario E: order creation fails
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_order_creation_moves_no_funds() {
    let mut server = Server::new_async().await;
    let create = server
        .mock("POST", "/transactions")
        .with_status(500)
        .expect(1)
        .create_async()
        .await;
    let any_put = server
        .mock("PUT", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let wallet = funded_wallet(TARGET);
    let checkout = orchestrator(&server.url(), Some(wallet.clone()));
    assert_ok!(checkout.wallet().connect().await);

    let outcome = assert_ok!(checkout.checkout(&Item::checkout_item(), shipping()).await);

    create.assert_async().await;
    any_put.assert_async().await;
    assert!(matches!(outcome, CheckoutOutcome::OrderNotCreated { .. }));
    assert!(wallet.sent_transfers().is_empty());
    assert!(!checkout.state().await.loading);
}

#[tokio::test]
async fn unreachable_order_api_moves_no_funds() {
    let wallet = funded_wallet(TARGET);
    let checkout = orchestrator("http://127.0.0.1:9", Some(wallet.clone()));
    assert_ok!(checkout.wallet().connect().await);

    let outcome = assert_ok!(checkout.checkout(&Item::checkout_item(), shipping()).await);

    assert!(matches!(outcome, CheckoutOutcome::OrderNotCreated { .. }));
    assert!(wallet.sent_transfers().is_empty());
    assert!(checkout.state().await.error.is_some());
}

#[tokio::test]
async fn blank_order_id_is_treated_as_failed_creation() {
    let mut server = Server::new_async().await;
    let _create = server
        .mock("POST", "/transactions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#""""#)
        .create_async()
        .await;

    let wallet = funded_wallet(TARGET);
    let checkout = orchestrator(&server.url(), Some(wallet.clone()));
    assert_ok!(checkout.wallet().connect().await);

    let outcome = assert_ok!(checkout.checkout(&Item::checkout_item(), shipping()).await);
    assert!(matches!(outcome, CheckoutOutcome::OrderNotCreated { .. }));
    assert!(wallet.sent_transfers().is_empty());
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reconciliation_retries_then_gives_up_quietly() {
    let mut server = Server::new_async().await;
    let _create = mock_create(&mut server, "abc123").await;
    let flaky = server
        .mock("PUT", "/transactions/abc123")
        .match_header("idempotency-key", Matcher::Any)
        .with_status(503)
        .expect(3)
        .create_async()
        .await;

    let wallet = funded_wallet(TARGET);
    let checkout = orchestrator(&server.url(), Some(wallet.clone()));
    assert_ok!(checkout.wallet().connect().await);

    let outcome = assert_ok!(checkout.checkout(&Item::checkout_item(), shipping()).await);

    flaky.assert_async().await;
    match outcome {
        CheckoutOutcome::Paid { reconciled, .. } => assert!(!reconciled),
        other => panic!("expected a paid order, got {other:?}"),
    }
    assert_eq!(wallet.sent_transfers().len(), 1);

    let state = checkout.state().await;
    assert!(state.error.is_none());
    assert!(!state.loading);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let mut server = Server::new_async().await;
    let missing = server
        .mock("PUT", "/transactions/gone")
        .with_status(404)
        .expect(1)
        .create_async()
        .await;

    let orders = OrderApiClient::new(server.url(), RetryPolicy::default());
    let id = backdoor::models::OrderId::new("gone").unwrap();

    let err = assert_err!(orders.reconcile(&id, OrderStatus::Success).await);
    assert!(matches!(err, CheckoutError::ReconciliationFailed(_)));
    missing.assert_async().await;
}

#[tokio::test]
async fn wrapped_order_id_is_accepted() {
    let mut server = Server::new_async().await;
    let _create = server
        .mock("POST", "/transactions")
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"_id":"wrapped-1"}"#)
        .create_async()
        .await;

    let wallet = funded_wallet(TARGET);
    let checkout = orchestrator(&server.url(), Some(wallet.clone()));
    let session = assert_ok!(checkout.wallet().connect().await);

    let order = assert_ok!(
        checkout
            .create_order(&Item::checkout_item(), session.address.unwrap(), shipping())
            .await
    );
    assert_eq!(order.id.as_str(), "wrapped-1");
    assert_eq!(order.order_status, OrderStatus::Pending);
    assert!(wallet.sent_transfers().is_empty());
}
