use anyhow::{Context, Result};
use backdoor::{
    client::EthersWallet,
    config::Config,
    context::AppContext,
    models::{CheckoutOutcome, ShippingAddress},
    services::{admission, CheckoutAction, MockWalletProvider, WalletProvider},
};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Runs the checkout flow from a terminal against the configured order API.
///
/// `CHECKOUT_DRY_RUN=1` swaps the wallet for an in-memory one holding 0.5 ETH.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let dry_run = std::env::var("CHECKOUT_DRY_RUN").is_ok_and(|v| v == "1" || v == "true");

    let provider: Option<Arc<dyn WalletProvider>> = if dry_run {
        let mock = MockWalletProvider::new(config.target_chain_id)
            .with_balance_ether(Decimal::new(5, 1));
        Some(Arc::new(mock) as Arc<dyn WalletProvider>)
    } else {
        EthersWallet::from_config(&config)
            .await?
            .map(|wallet| Arc::new(wallet) as Arc<dyn WalletProvider>)
    };

    let ctx = AppContext::new(&config, provider);
    let item = ctx.item.clone();

    println!("Backdoor Checkout Agent");
    println!("=======================");
    println!("Order API: {}", config.order_api_url);
    println!("Item: {} ({} ETH)", item.name, item.price);
    println!();

    println!("Step 1: Connecting wallet...");
    let mut session = match ctx.wallet.connect().await {
        Ok(session) => session,
        Err(e) => {
            println!("[ERROR] {}", e.user_message());
            return Ok(());
        }
    };
    println!("   [OK] Wallet {:?} is connected", session.address.unwrap_or_default());
    println!("   Available ETH Balance: {} ETH", session.balance);
    println!();

    let target = ctx.wallet.target_chain();
    if admission(&session, target, item.price) == CheckoutAction::SwitchNetwork {
        println!("Step 2: Switching to {}...", target.network_name());
        if let Err(e) = ctx.wallet.switch_network().await {
            println!("[FAILED] {}", e.user_message());
            return Ok(());
        }
        session = ctx.wallet.connect().await?;
        println!("   [OK] Now on {}", target);
        println!();
    }

    match admission(&session, target, item.price) {
        CheckoutAction::ConfirmPayment => {}
        CheckoutAction::InsufficientFunds => {
            println!("[ERROR] Insufficient Funds");
            return Ok(());
        }
        other => {
            println!("[ERROR] Payment not available: {:?}", other);
            return Ok(());
        }
    }

    let shipping = match std::env::var("CHECKOUT_SHIPPING") {
        Ok(raw) => serde_json::from_str::<ShippingAddress>(&raw)
            .context("CHECKOUT_SHIPPING must be a shipping address JSON object")?,
        Err(_) => ctx.shipping.read().await.snapshot(),
    };

    println!("Step 3: Creating order and paying seller {:?}...", item.seller);
    let outcome = ctx.checkout.checkout(&item, shipping).await?;

    match &outcome {
        CheckoutOutcome::Paid {
            order,
            tx_hash,
            reconciled,
        } => {
            println!("   [SUCCESS] Order {} paid in {:?}", order.id, tx_hash);
            if !reconciled {
                println!("   [WARN] Order API was not updated; the order still reads Pending");
            }
        }
        CheckoutOutcome::PaymentFailed { order, reason, .. } => {
            println!("   [FAILED] Order {}: {}", order.id, reason);
        }
        CheckoutOutcome::OrderNotCreated { reason } => {
            println!("   [FAILED] Order was not created: {}", reason);
        }
    }
    if let Some(order) = outcome.order() {
        let to = &order.shipping_address;
        println!("   Ship to: {} {}, {}", to.first_name, to.last_name, to.country);
    }
    println!();
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    Ok(())
}
