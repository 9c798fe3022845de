use crate::{
    config::Config,
    error::CheckoutError,
    models::ChainId,
    services::{ProviderEvent, TransferRequest, WalletProvider},
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use ethers::{
    prelude::*,
    providers::{Http, Provider},
    types::{Address, TransactionReceipt, TransactionRequest, H256, U256},
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;

type WalletClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Wallet provider backed by a local key and JSON-RPC endpoints.
///
/// Stands in for a browser-injected wallet: it reports the chain of the RPC it
/// is attached to and can only switch to chains it has an endpoint for.
pub struct EthersWallet {
    key: LocalWallet,
    signer: RwLock<(ChainId, Arc<WalletClient>)>,
    chain_rpc_urls: HashMap<ChainId, String>,
    events: broadcast::Sender<ProviderEvent>,
}

impl EthersWallet {
    pub async fn new(
        rpc_url: &str,
        private_key: &str,
        chain_rpc_urls: HashMap<ChainId, String>,
    ) -> Result<Self> {
        let key = private_key
            .parse::<LocalWallet>()
            .context("Invalid wallet private key")?;

        let (chain, signer) = Self::attach(&key, rpc_url)
            .await
            .with_context(|| format!("Could not reach wallet RPC {}", rpc_url))?;

        tracing::info!(
            "Wallet {:?} attached to {} ({})",
            key.address(),
            chain.network_name(),
            chain
        );

        let (events, _) = broadcast::channel(16);
        Ok(Self {
            key,
            signer: RwLock::new((chain, signer)),
            chain_rpc_urls,
            events,
        })
    }

    /// Builds the wallet from `WALLET_RPC_URL` / `WALLET_PRIVATE_KEY`, or `None` when unset.
    pub async fn from_config(config: &Config) -> Result<Option<Self>> {
        if !config.wallet_configured() {
            return Ok(None);
        }
        let rpc_url = config.wallet_rpc_url.as_deref().context("WALLET_RPC_URL required")?;
        let key = config
            .wallet_private_key
            .as_deref()
            .context("WALLET_PRIVATE_KEY required")?;
        Self::new(rpc_url, key, config.wallet_chain_rpc_urls.clone())
            .await
            .map(Some)
    }

    async fn attach(
        key: &LocalWallet,
        rpc_url: &str,
    ) -> Result<(ChainId, Arc<WalletClient>), CheckoutError> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| {
                CheckoutError::ConfigError(format!("Invalid RPC URL {}: {}", rpc_url, e))
            })?
            .interval(Duration::from_secs(2));
        let chain = ChainId::from(provider.get_chainid().await?);
        let wallet = key.clone().with_chain_id(chain.as_u64());
        Ok((chain, Arc::new(SignerMiddleware::new(provider, wallet))))
    }

    fn current(&self) -> (ChainId, Arc<WalletClient>) {
        let guard = self.signer.read().unwrap_or_else(|p| p.into_inner());
        (guard.0, Arc::clone(&guard.1))
    }
}

#[async_trait]
impl WalletProvider for EthersWallet {
    async fn chain_id(&self) -> Result<ChainId, CheckoutError> {
        Ok(self.current().0)
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, CheckoutError> {
        Ok(vec![self.key.address()])
    }

    async fn get_balance(&self, address: Address) -> Result<U256, CheckoutError> {
        let (_, signer) = self.current();
        Ok(signer.provider().get_balance(address, None).await?)
    }

    async fn switch_chain(&self, chain_id: ChainId) -> Result<(), CheckoutError> {
        if self.current().0 == chain_id {
            return Ok(());
        }

        let url = self.chain_rpc_urls.get(&chain_id).ok_or_else(|| {
            CheckoutError::NetworkSwitchRejected(format!(
                "Unrecognized chain ID \"{}\". Try adding the chain first.",
                chain_id
            ))
        })?;

        let (reported, signer) = Self::attach(&self.key, url)
            .await
            .map_err(|e| CheckoutError::NetworkSwitchRejected(e.to_string()))?;
        if reported != chain_id {
            return Err(CheckoutError::NetworkSwitchRejected(format!(
                "RPC for {} reports chain {}",
                chain_id, reported
            )));
        }

        *self.signer.write().unwrap_or_else(|p| p.into_inner()) = (chain_id, signer);
        let _ = self.events.send(ProviderEvent::ChainChanged(chain_id));
        Ok(())
    }

    async fn send_transaction(&self, request: TransferRequest) -> Result<H256, CheckoutError> {
        if request.from != self.key.address() {
            return Err(CheckoutError::TransferRejected(format!(
                "Unknown account {:?}",
                request.from
            )));
        }

        let (_, signer) = self.current();
        let tx = TransactionRequest::new()
            .from(request.from)
            .to(request.to)
            .value(request.value);

        let pending = signer
            .send_transaction(tx, None)
            .await
            .map_err(|e| CheckoutError::TransferRejected(e.to_string()))?;

        Ok(pending.tx_hash())
    }

    async fn wait_for_transaction(
        &self,
        tx_hash: H256,
        confirmations: usize,
    ) -> Result<Option<TransactionReceipt>, CheckoutError> {
        let (_, signer) = self.current();
        PendingTransaction::new(tx_hash, signer.provider())
            .confirmations(confirmations)
            .await
            .map_err(|e| CheckoutError::TransferFailed(e.to_string()))
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}
