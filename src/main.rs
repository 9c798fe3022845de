use anyhow::Result;
use backdoor::{
    client::EthersWallet, config::Config, context::AppContext, handlers::router,
    services::WalletProvider,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    tracing::info!("Starting Backdoor storefront v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {:?}", config.environment);

    // Wallet provider
    let provider = EthersWallet::from_config(&config)
        .await?
        .map(|wallet| Arc::new(wallet) as Arc<dyn WalletProvider>);

    let ctx = AppContext::new(&config, provider);

    // Keep the session in sync with the wallet until shutdown
    let subscription = if ctx.wallet.has_provider() {
        Some(ctx.wallet.subscribe()?)
    } else {
        None
    };

    let app = router(ctx);

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Storefront listening on http://{}", addr);
    tracing::info!("Checkout: http://{}/checkout", addr);
    tracing::info!("Order API: {}", config.order_api_url);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(subscription) = subscription {
        subscription.unsubscribe().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for ctrl+c: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down gracefully...");
}
