use crate::error::CheckoutError;
use ethers::types::{Address, U256};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// EIP-155 chain identifier, rendered the way wallets report it (`0x4`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(u64);

impl ChainId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Human readable name for the chains the storefront knows about.
    pub fn network_name(&self) -> String {
        match self.0 {
            1 => "Ethereum Mainnet".to_string(),
            4 => "Rinkeby".to_string(),
            5 => "Goerli".to_string(),
            11155111 => "Sepolia".to_string(),
            other => format!("chain {}", other),
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl FromStr for ChainId {
    type Err = CheckoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parsed = match trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => trimmed.parse(),
        };
        parsed
            .map(ChainId)
            .map_err(|_| CheckoutError::ConversionError(format!("Invalid chain id: {}", s)))
    }
}

impl From<U256> for ChainId {
    fn from(value: U256) -> Self {
        ChainId(value.low_u64())
    }
}

impl Serialize for ChainId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connected,
}

impl ConnectionStatus {
    /// Text of the connect button.
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "Connect Wallet",
            ConnectionStatus::Connected => "Connected",
        }
    }
}

/// Connection state to the wallet provider. Reset only by restarting the app.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSession {
    pub address: Option<Address>,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    pub chain_id: Option<ChainId>,
    pub connection_status: ConnectionStatus,
}

impl WalletSession {
    pub fn is_connected(&self) -> bool {
        self.connection_status == ConnectionStatus::Connected
    }

    pub fn is_on_chain(&self, chain: ChainId) -> bool {
        self.chain_id == Some(chain)
    }
}

/// Converts a wei amount into ether.
pub fn wei_to_ether(wei: U256) -> Result<Decimal, CheckoutError> {
    if wei > U256::from(i128::MAX as u128) {
        return Err(CheckoutError::ConversionError(format!(
            "Balance out of range: {}",
            wei
        )));
    }
    Decimal::try_from_i128_with_scale(wei.as_u128() as i128, 18)
        .map(|d| d.normalize())
        .map_err(|e| CheckoutError::ConversionError(e.to_string()))
}

/// Converts an ether amount into wei.
pub fn ether_to_wei(ether: Decimal) -> Result<U256, CheckoutError> {
    ethers::utils::parse_ether(ether.to_string())
        .map_err(|e| CheckoutError::ConversionError(e.to_string()))
}

/// Balance shown to the user: rounded half away from zero to one decimal place.
pub fn display_balance(ether: Decimal) -> Decimal {
    ether.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_id_parses_hex_and_decimal() {
        assert_eq!("0x4".parse::<ChainId>().unwrap(), ChainId::new(4));
        assert_eq!("0xaa36a7".parse::<ChainId>().unwrap(), ChainId::new(11155111));
        assert_eq!("137".parse::<ChainId>().unwrap(), ChainId::new(137));
        assert!("0xzz".parse::<ChainId>().is_err());
    }

    #[test]
    fn chain_id_displays_as_wallet_hex() {
        assert_eq!(ChainId::new(4).to_string(), "0x4");
        assert_eq!(
            serde_json::to_value(ChainId::new(11155111)).unwrap(),
            serde_json::json!("0xaa36a7")
        );
    }

    #[test]
    fn balance_rounds_to_one_decimal() {
        let wei = U256::from(1_260_000_000_000_000_000u64);
        let ether = wei_to_ether(wei).unwrap();
        assert_eq!(ether, Decimal::new(126, 2));
        assert_eq!(display_balance(ether), Decimal::new(13, 1));
        assert_eq!(display_balance(Decimal::new(5, 2)), Decimal::new(1, 1));
        assert_eq!(display_balance(Decimal::new(449, 3)), Decimal::new(4, 1));
    }

    #[test]
    fn ether_converts_to_wei() {
        let wei = ether_to_wei(Decimal::new(1, 1)).unwrap();
        assert_eq!(wei, U256::from(100_000_000_000_000_000u64));
    }

    #[test]
    fn new_session_is_disconnected() {
        let session = WalletSession::default();
        assert!(!session.is_connected());
        assert_eq!(session.connection_status.label(), "Connect Wallet");
    }
}
