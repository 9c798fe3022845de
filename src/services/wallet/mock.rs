use super::{ProviderEvent, TransferRequest, WalletProvider};
use crate::{
    error::CheckoutError,
    models::{ether_to_wei, ChainId},
};
use async_trait::async_trait;
use ethers::types::{Address, TransactionReceipt, H256, U256, U64};
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, Notify};

/// How the mock wallet answers a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferBehavior {
    Confirm,
    /// The user declines the signature prompt.
    Reject,
    /// Mined with status 0.
    Revert,
    /// Never mined.
    Drop,
}

#[derive(Debug)]
struct MockState {
    chain: ChainId,
    account: Address,
    balance: U256,
    reject_switch: bool,
    transfer: TransferBehavior,
    sent: Vec<TransferRequest>,
    nonce: u64,
    gate: Option<Arc<Notify>>,
}

/// In-memory wallet used by tests and by the checkout agent's dry-run mode.
pub struct MockWalletProvider {
    state: Mutex<MockState>,
    events: broadcast::Sender<ProviderEvent>,
}

impl MockWalletProvider {
    pub fn new(chain: ChainId) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            state: Mutex::new(MockState {
                chain,
                account: Address::repeat_byte(0x11),
                balance: U256::zero(),
                reject_switch: false,
                transfer: TransferBehavior::Confirm,
                sent: Vec::new(),
                nonce: 0,
                gate: None,
            }),
            events,
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn with_balance_ether(self, ether: Decimal) -> Self {
        self.set_balance_ether(ether);
        self
    }

    pub fn with_account(self, account: Address) -> Self {
        self.state().account = account;
        self
    }

    pub fn rejecting_switch(self) -> Self {
        self.state().reject_switch = true;
        self
    }

    pub fn with_transfer_behavior(self, behavior: TransferBehavior) -> Self {
        self.state().transfer = behavior;
        self
    }

    /// Holds every signature prompt until `gate` is notified.
    pub fn with_transfer_gate(self, gate: Arc<Notify>) -> Self {
        self.state().gate = Some(gate);
        self
    }

    pub fn set_balance_ether(&self, ether: Decimal) {
        self.state().balance = ether_to_wei(ether).unwrap_or_default();
    }

    pub fn account(&self) -> Address {
        self.state().account
    }

    pub fn current_chain(&self) -> ChainId {
        self.state().chain
    }

    pub fn sent_transfers(&self) -> Vec<TransferRequest> {
        self.state().sent.clone()
    }

    /// Simulates the user acting in the wallet UI.
    pub fn emit(&self, event: ProviderEvent) {
        {
            let mut state = self.state();
            match &event {
                ProviderEvent::ChainChanged(chain) => state.chain = *chain,
                ProviderEvent::AccountsChanged(accounts) => {
                    if let Some(account) = accounts.first() {
                        state.account = *account;
                    }
                }
            }
        }
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl WalletProvider for MockWalletProvider {
    async fn chain_id(&self) -> Result<ChainId, CheckoutError> {
        Ok(self.state().chain)
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, CheckoutError> {
        Ok(vec![self.state().account])
    }

    async fn get_balance(&self, _address: Address) -> Result<U256, CheckoutError> {
        Ok(self.state().balance)
    }

    async fn switch_chain(&self, chain_id: ChainId) -> Result<(), CheckoutError> {
        {
            let mut state = self.state();
            if state.reject_switch {
                return Err(CheckoutError::NetworkSwitchRejected(
                    "User rejected the request.".into(),
                ));
            }
            if state.chain == chain_id {
                return Ok(());
            }
            state.chain = chain_id;
        }
        let _ = self.events.send(ProviderEvent::ChainChanged(chain_id));
        Ok(())
    }

    async fn send_transaction(&self, request: TransferRequest) -> Result<H256, CheckoutError> {
        let gate = self.state().gate.clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut state = self.state();
        if state.transfer == TransferBehavior::Reject {
            return Err(CheckoutError::TransferRejected(
                "User denied transaction signature.".into(),
            ));
        }
        if request.value > state.balance {
            return Err(CheckoutError::TransferRejected("insufficient funds".into()));
        }
        state.sent.push(request);
        state.nonce += 1;
        Ok(H256::from_low_u64_be(state.nonce))
    }

    async fn wait_for_transaction(
        &self,
        tx_hash: H256,
        _confirmations: usize,
    ) -> Result<Option<TransactionReceipt>, CheckoutError> {
        let mut state = self.state();
        let status = match state.transfer {
            TransferBehavior::Drop => return Ok(None),
            TransferBehavior::Revert => 0u64,
            TransferBehavior::Confirm | TransferBehavior::Reject => {
                let spent = state.sent.last().map(|t| t.value).unwrap_or_default();
                state.balance = state.balance.saturating_sub(spent);
                1u64
            }
        };
        Ok(Some(TransactionReceipt {
            transaction_hash: tx_hash,
            status: Some(U64::from(status)),
            ..Default::default()
        }))
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}
