use crate::{
    config::Config,
    models::Item,
    services::{
        FieldPolicy, ListingClient, LoginState, OrderApiClient, OrderOrchestrator, RetryPolicy,
        ShippingForm, WalletProvider, WalletSessionManager,
    },
};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Everything the pages share. Handed to every handler explicitly.
#[derive(Clone)]
pub struct AppContext {
    pub wallet: Arc<WalletSessionManager>,
    pub checkout: Arc<OrderOrchestrator>,
    pub listings: Arc<ListingClient>,
    pub login: Arc<LoginState>,
    pub shipping: Arc<RwLock<ShippingForm>>,
    pub shipping_policy: FieldPolicy,
    pub item: Arc<Item>,
}

impl AppContext {
    pub fn new(config: &Config, provider: Option<Arc<dyn WalletProvider>>) -> Self {
        let wallet = Arc::new(WalletSessionManager::new(
            provider,
            config.target_chain_id,
            config.tx_confirmations,
        ));
        let orders = OrderApiClient::new(
            config.order_api_url.clone(),
            RetryPolicy {
                max_attempts: config.reconcile_max_attempts,
                backoff: config.reconcile_backoff,
            },
        );

        Self {
            checkout: Arc::new(OrderOrchestrator::new(wallet.clone(), orders)),
            wallet,
            listings: Arc::new(ListingClient::new(config.listing_api_url.clone())),
            login: Arc::new(LoginState::new()),
            shipping: Arc::new(RwLock::new(ShippingForm::new())),
            shipping_policy: config.shipping_policy,
            item: Arc::new(Item::checkout_item()),
        }
    }
}
