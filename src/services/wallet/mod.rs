//! Wallet session management.
//!
//! A [`WalletProvider`] is the injected wallet (browser extension, or the
//! ethers-backed signer in [`crate::client::wallet`]). The
//! [`WalletSessionManager`] owns the single [`WalletSession`] register: explicit
//! connects and provider notifications both write it, last write wins.

pub mod mock;

use crate::{
    error::CheckoutError,
    models::{display_balance, ether_to_wei, wei_to_ether, ChainId, ConnectionStatus, WalletSession},
};
use async_trait::async_trait;
use ethers::types::{Address, TransactionReceipt, H256, U256};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;

pub use mock::{MockWalletProvider, TransferBehavior};

/// Notifications a wallet emits when the user acts inside the wallet UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(ChainId),
}

/// A native-currency value transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRequest {
    pub from: Address,
    pub to: Address,
    pub value: U256,
}

#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Chain the wallet currently points at; readable before account access.
    async fn chain_id(&self) -> Result<ChainId, CheckoutError>;

    /// Prompts for account access and returns the exposed accounts.
    async fn request_accounts(&self) -> Result<Vec<Address>, CheckoutError>;

    async fn get_balance(&self, address: Address) -> Result<U256, CheckoutError>;

    /// Fails with [`CheckoutError::NetworkSwitchRejected`].
    async fn switch_chain(&self, chain_id: ChainId) -> Result<(), CheckoutError>;

    /// Signs and broadcasts. Fails with [`CheckoutError::TransferRejected`].
    async fn send_transaction(&self, request: TransferRequest) -> Result<H256, CheckoutError>;

    /// Resolves once the transaction has `confirmations` confirmations.
    /// `None` means the transaction was dropped.
    async fn wait_for_transaction(
        &self,
        tx_hash: H256,
        confirmations: usize,
    ) -> Result<Option<TransactionReceipt>, CheckoutError>;

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}

/// Scoped subscription to provider events. Dropping it stops all session writes.
pub struct SessionSubscription {
    handle: Option<JoinHandle<()>>,
}

impl SessionSubscription {
    /// Stops the listener and waits until it can no longer touch the session.
    pub async fn unsubscribe(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            let _ = handle.await;
        }
        tracing::debug!("Wallet event subscription closed");
    }
}

impl Drop for SessionSubscription {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

pub struct WalletSessionManager {
    provider: Option<Arc<dyn WalletProvider>>,
    session: Arc<RwLock<WalletSession>>,
    target_chain: ChainId,
    confirmations: usize,
}

impl WalletSessionManager {
    pub fn new(
        provider: Option<Arc<dyn WalletProvider>>,
        target_chain: ChainId,
        confirmations: usize,
    ) -> Self {
        if provider.is_none() {
            tracing::warn!("No wallet provider injected; checkout payments are unavailable");
        }
        Self {
            provider,
            session: Arc::new(RwLock::new(WalletSession::default())),
            target_chain,
            confirmations: confirmations.max(1),
        }
    }

    pub fn target_chain(&self) -> ChainId {
        self.target_chain
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Snapshot of the current session.
    pub async fn session(&self) -> WalletSession {
        self.session.read().await.clone()
    }

    fn provider(&self) -> Result<&Arc<dyn WalletProvider>, CheckoutError> {
        self.provider.as_ref().ok_or(CheckoutError::ProviderAbsent)
    }

    /// Connects (or reconnects) to the wallet and refreshes the whole session.
    pub async fn connect(&self) -> Result<WalletSession, CheckoutError> {
        let provider = self.provider()?;

        let chain_id = match provider.chain_id().await {
            Ok(chain) => Some(chain),
            Err(e) => {
                tracing::warn!("Could not read wallet chain id: {}", e);
                None
            }
        };

        let accounts = provider.request_accounts().await?;
        let address = accounts.first().copied().ok_or_else(|| {
            CheckoutError::AccountAccessDenied("wallet exposed no accounts".into())
        })?;

        let balance = display_balance(wei_to_ether(provider.get_balance(address).await?)?);

        let snapshot = {
            let mut session = self.session.write().await;
            session.address = Some(address);
            session.balance = balance;
            if chain_id.is_some() {
                session.chain_id = chain_id;
            }
            session.connection_status = ConnectionStatus::Connected;
            session.clone()
        };

        tracing::info!(
            address = ?address,
            balance = %balance,
            chain = ?snapshot.chain_id,
            "Wallet connected"
        );

        Ok(snapshot)
    }

    /// Asks the wallet to move to the checkout chain.
    pub async fn switch_network(&self) -> Result<(), CheckoutError> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| CheckoutError::NetworkSwitchRejected("No crypto wallet found".into()))?;

        provider
            .switch_chain(self.target_chain)
            .await
            .map_err(|e| match e {
                CheckoutError::NetworkSwitchRejected(_) => e,
                other => CheckoutError::NetworkSwitchRejected(other.to_string()),
            })?;

        self.session.write().await.chain_id = Some(self.target_chain);
        tracing::info!("Wallet switched to {}", self.target_chain.network_name());
        Ok(())
    }

    /// Forwards provider notifications into the session until the returned guard is dropped.
    pub fn subscribe(&self) -> Result<SessionSubscription, CheckoutError> {
        let provider = Arc::clone(self.provider()?);
        let session = Arc::clone(&self.session);
        let mut events = provider.subscribe();

        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => apply_event(provider.as_ref(), &session, event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("Dropped {} wallet events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        tracing::debug!("Wallet event subscription opened");
        Ok(SessionSubscription {
            handle: Some(handle),
        })
    }

    /// Applies one provider notification to the session.
    pub async fn handle_event(&self, event: ProviderEvent) -> Result<(), CheckoutError> {
        let provider = self.provider()?;
        apply_event(provider.as_ref(), &self.session, event).await;
        Ok(())
    }

    /// Sends `amount` ether to `to` and waits for the configured confirmations.
    pub async fn send_transfer(
        &self,
        to: Address,
        amount: Decimal,
    ) -> Result<TransactionReceipt, CheckoutError> {
        let provider = self.provider()?;
        let from = {
            let session = self.session.read().await;
            match (session.connection_status, session.address) {
                (ConnectionStatus::Connected, Some(address)) => address,
                _ => return Err(CheckoutError::NotConnected),
            }
        };

        let value = ether_to_wei(amount)?;
        tracing::info!("Sending {} ETH from {:?} to {:?}", amount, from, to);

        let tx_hash = provider
            .send_transaction(TransferRequest { from, to, value })
            .await?;

        tracing::info!("Transaction sent ({:?}), waiting for confirmation...", tx_hash);

        let receipt = provider
            .wait_for_transaction(tx_hash, self.confirmations)
            .await?
            .ok_or_else(|| CheckoutError::TransferFailed("Transaction dropped".into()))?;

        if receipt.status != Some(1.into()) {
            return Err(CheckoutError::TransferFailed(format!(
                "Transaction {:?} reverted",
                tx_hash
            )));
        }

        tracing::info!("Transfer confirmed: {:?}", receipt.transaction_hash);
        Ok(receipt)
    }
}

async fn apply_event(
    provider: &dyn WalletProvider,
    session: &RwLock<WalletSession>,
    event: ProviderEvent,
) {
    match event {
        ProviderEvent::ChainChanged(chain) => {
            tracing::info!("Network changed to {}", chain);
            session.write().await.chain_id = Some(chain);
        }
        ProviderEvent::AccountsChanged(accounts) => {
            let address = accounts.first().copied();
            tracing::info!(address = ?address, "Wallet account changed");

            let balance = match address {
                Some(addr) => match provider.get_balance(addr).await.and_then(wei_to_ether) {
                    Ok(ether) => Some(display_balance(ether)),
                    Err(e) => {
                        tracing::warn!("Could not refresh balance for {:?}: {}", addr, e);
                        None
                    }
                },
                None => None,
            };

            let mut session = session.write().await;
            session.address = address;
            if let Some(balance) = balance {
                session.balance = balance;
            }
        }
    }
}
