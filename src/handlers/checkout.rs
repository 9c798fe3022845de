use crate::{
    context::AppContext,
    error::CheckoutError,
    models::{ApiResponse, ChainId, CheckoutOutcome, Item, ShippingAddress, WalletSession},
    services::{admission, CheckoutAction, ShippingField},
};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

/// Everything the checkout page renders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutView {
    pub connect_label: String,
    pub wallet: WalletSession,
    pub target_chain: ChainId,
    pub action: CheckoutAction,
    pub action_label: String,
    pub item: Item,
    pub total_payment: String,
    pub shipping: ShippingAddress,
    pub loading: bool,
    pub error: Option<String>,
}

fn action_label(action: CheckoutAction, target: ChainId) -> String {
    match action {
        CheckoutAction::ConnectWallet => "Wallet not connected".to_string(),
        CheckoutAction::SwitchNetwork => format!("Switch To {}", target.network_name()),
        CheckoutAction::ConfirmPayment => "Confirm Payment".to_string(),
        CheckoutAction::InsufficientFunds => "Insufficient Funds".to_string(),
    }
}

pub async fn render(ctx: &AppContext) -> CheckoutView {
    let wallet = ctx.wallet.session().await;
    let target_chain = ctx.wallet.target_chain();
    let action = admission(&wallet, target_chain, ctx.item.price);
    let state = ctx.checkout.state().await;

    CheckoutView {
        connect_label: wallet.connection_status.label().to_string(),
        wallet,
        target_chain,
        action,
        action_label: action_label(action, target_chain),
        item: ctx.item.as_ref().clone(),
        total_payment: format!("{} ETH", ctx.item.price),
        shipping: ctx.shipping.read().await.snapshot(),
        loading: state.loading,
        error: state.error,
    }
}

pub async fn checkout_view(State(ctx): State<AppContext>) -> Json<CheckoutView> {
    Json(render(&ctx).await)
}

/// Fails with `ProviderAbsent` so the client can prompt for a wallet install.
pub async fn connect_wallet(
    State(ctx): State<AppContext>,
) -> Result<Json<CheckoutView>, CheckoutError> {
    ctx.wallet.connect().await?;
    Ok(Json(render(&ctx).await))
}

/// A rejected switch is shown inline; the session stays usable.
pub async fn switch_network(State(ctx): State<AppContext>) -> Json<CheckoutView> {
    if let Err(e) = ctx.wallet.switch_network().await {
        tracing::warn!("Error changing network: {}", e);
        ctx.checkout.record_error(&e).await;
    }
    Json(render(&ctx).await)
}

#[derive(Debug, Deserialize)]
pub struct FieldUpdate {
    pub field: String,
    pub value: String,
}

pub async fn update_shipping(
    State(ctx): State<AppContext>,
    Json(update): Json<FieldUpdate>,
) -> Result<Json<CheckoutView>, CheckoutError> {
    let field: ShippingField = update.field.parse()?;
    ctx.shipping.write().await.set(field, update.value);
    Ok(Json(render(&ctx).await))
}

pub async fn confirm_payment(
    State(ctx): State<AppContext>,
) -> Result<Json<ApiResponse<CheckoutOutcome>>, CheckoutError> {
    let session = ctx.wallet.session().await;
    let target = ctx.wallet.target_chain();
    let action = admission(&session, target, ctx.item.price);
    if action != CheckoutAction::ConfirmPayment {
        return Err(CheckoutError::NotAdmitted(action_label(action, target)));
    }

    let shipping = ctx.shipping.read().await.submit(ctx.shipping_policy)?;
    let outcome = ctx.checkout.checkout(&ctx.item, shipping).await?;
    Ok(Json(ApiResponse::ok(outcome)))
}

pub async fn payment_result(
    State(ctx): State<AppContext>,
) -> Json<ApiResponse<Option<CheckoutOutcome>>> {
    Json(ApiResponse::ok(ctx.checkout.state().await.last_outcome))
}
