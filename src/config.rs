use crate::{models::ChainId, services::FieldPolicy};
use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Testnet,
    Production,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub host: String,
    pub port: u16,

    // Marketplace APIs
    pub order_api_url: String,
    pub listing_api_url: String,

    // Wallet (absent key or RPC means no provider is injected)
    pub wallet_rpc_url: Option<String>,
    pub wallet_private_key: Option<String>,
    pub wallet_chain_rpc_urls: HashMap<ChainId, String>,

    // Checkout
    pub target_chain_id: ChainId,
    pub tx_confirmations: usize,
    pub shipping_policy: FieldPolicy,

    // Reconciliation
    pub reconcile_max_attempts: u32,
    pub reconcile_backoff: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let environment = Self::parse_environment()?;

        let config = Self {
            environment,
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("Invalid PORT")?,

            order_api_url: std::env::var("ORDER_API_URL")
                .unwrap_or_else(|_| "http://localhost:4000".to_string()),
            listing_api_url: std::env::var("API_ENDPOINT").context("API_ENDPOINT required")?,

            wallet_rpc_url: std::env::var("WALLET_RPC_URL").ok(),
            wallet_private_key: std::env::var("WALLET_PRIVATE_KEY").ok(),
            wallet_chain_rpc_urls: Self::parse_chain_urls(
                &std::env::var("WALLET_CHAIN_RPC_URLS").unwrap_or_default(),
            )?,

            target_chain_id: std::env::var("TARGET_CHAIN_ID")
                .unwrap_or_else(|_| "0x4".to_string())
                .parse()
                .context("Invalid TARGET_CHAIN_ID")?,
            tx_confirmations: std::env::var("TX_CONFIRMATIONS")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .context("Invalid TX_CONFIRMATIONS")?,
            shipping_policy: if Self::parse_flag("REQUIRE_SHIPPING_FIELDS")? {
                FieldPolicy::Required
            } else {
                FieldPolicy::Optional
            },

            reconcile_max_attempts: std::env::var("RECONCILE_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .context("Invalid RECONCILE_MAX_ATTEMPTS")?,
            reconcile_backoff: Duration::from_millis(
                std::env::var("RECONCILE_BACKOFF_MS")
                    .unwrap_or_else(|_| "250".to_string())
                    .parse()
                    .context("Invalid RECONCILE_BACKOFF_MS")?,
            ),
        };

        config.validate()?;
        Ok(config)
    }

    fn parse_environment() -> Result<Environment> {
        let env = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        match env.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "testnet" | "test" => Ok(Environment::Testnet),
            "production" | "prod" => Ok(Environment::Production),
            _ => bail!("Unknown environment: {}", env),
        }
    }

    fn parse_flag(var: &str) -> Result<bool> {
        match std::env::var(var) {
            Err(_) => Ok(false),
            Ok(value) => match value.to_lowercase().as_str() {
                "1" | "true" | "yes" => Ok(true),
                "0" | "false" | "no" | "" => Ok(false),
                _ => bail!("Invalid boolean for {}: {}", var, value),
            },
        }
    }

    /// Defaults for a local setup talking to the given marketplace APIs, with no wallet.
    pub fn with_endpoints(
        order_api_url: impl Into<String>,
        listing_api_url: impl Into<String>,
    ) -> Self {
        Self {
            environment: Environment::Development,
            host: "127.0.0.1".to_string(),
            port: 3000,
            order_api_url: order_api_url.into(),
            listing_api_url: listing_api_url.into(),
            wallet_rpc_url: None,
            wallet_private_key: None,
            wallet_chain_rpc_urls: HashMap::new(),
            target_chain_id: ChainId::new(4),
            tx_confirmations: 1,
            shipping_policy: FieldPolicy::Optional,
            reconcile_max_attempts: 3,
            reconcile_backoff: Duration::from_millis(250),
        }
    }

    /// Parses `0x4=https://rpc-a,0x1=https://rpc-b`.
    pub fn parse_chain_urls(raw: &str) -> Result<HashMap<ChainId, String>> {
        let mut urls = HashMap::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (chain, url) = entry
                .split_once('=')
                .with_context(|| format!("Expected <chain>=<url>, got {}", entry))?;
            let chain = ChainId::from_str(chain.trim())
                .with_context(|| format!("Invalid chain id in {}", entry))?;
            urls.insert(chain, url.trim().to_string());
        }
        Ok(urls)
    }

    /// A wallet provider is only injected when both the key and an RPC endpoint are set.
    pub fn wallet_configured(&self) -> bool {
        self.wallet_rpc_url.is_some() && self.wallet_private_key.is_some()
    }

    fn validate(&self) -> Result<()> {
        if !self.order_api_url.starts_with("http") {
            bail!("ORDER_API_URL must be HTTP(S) URL");
        }
        if !self.listing_api_url.starts_with("http") {
            bail!("API_ENDPOINT must be HTTP(S) URL");
        }
        if let Some(url) = &self.wallet_rpc_url {
            if !url.starts_with("http") {
                bail!("WALLET_RPC_URL must be HTTP(S) URL");
            }
        }
        if let Some(key) = &self.wallet_private_key {
            if !key.starts_with("0x") {
                bail!("WALLET_PRIVATE_KEY must start with 0x");
            }
        }
        for (chain, url) in &self.wallet_chain_rpc_urls {
            if !url.starts_with("http") {
                bail!("RPC URL for chain {} must be HTTP(S) URL", chain);
            }
        }
        if self.tx_confirmations == 0 {
            bail!("TX_CONFIRMATIONS must be at least 1");
        }
        if self.reconcile_max_attempts == 0 {
            bail!("RECONCILE_MAX_ATTEMPTS must be at least 1");
        }

        if self.environment == Environment::Production {
            let endpoints = [
                ("ORDER_API_URL", Some(&self.order_api_url)),
                ("API_ENDPOINT", Some(&self.listing_api_url)),
                ("WALLET_RPC_URL", self.wallet_rpc_url.as_ref()),
            ];
            for (var, url) in endpoints {
                if let Some(url) = url {
                    if !url.starts_with("https://") {
                        bail!("{} must use HTTPS in production", var);
                    }
                }
            }
        }

        tracing::info!(
            "Configuration validated for {:?} environment",
            self.environment
        );

        Ok(())
    }
}
