use crate::error::CheckoutError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ethers::types::Address;
use serde::Deserialize;
use std::sync::RwLock;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenClaims {
    wallet_address: Address,
}

/// Reads the seller wallet out of a session token issued by the marketplace API.
///
/// The signature is not checked here; the API that accepts the listing does that.
pub fn wallet_from_token(token: &str) -> Result<Address, CheckoutError> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| CheckoutError::InvalidToken("expected three segments".into()))?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| CheckoutError::InvalidToken(e.to_string()))?;

    let claims: TokenClaims =
        serde_json::from_slice(&bytes).map_err(|e| CheckoutError::InvalidToken(e.to_string()))?;

    Ok(claims.wallet_address)
}

/// Login state shared by the pages. Holding a token means logged in.
#[derive(Debug, Default)]
pub struct LoginState {
    token: RwLock<Option<String>>,
}

impl LoginState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a token after checking it carries a wallet claim.
    pub fn log_in(&self, token: String) -> Result<Address, CheckoutError> {
        let wallet = wallet_from_token(&token)?;
        *self.token.write().unwrap_or_else(|p| p.into_inner()) = Some(token);
        tracing::info!(wallet = ?wallet, "Seller logged in");
        Ok(wallet)
    }

    pub fn log_out(&self) {
        *self.token.write().unwrap_or_else(|p| p.into_inner()) = None;
    }

    pub fn is_logged_in(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .is_some()
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Wallet of the logged in seller.
    pub fn seller(&self) -> Result<Address, CheckoutError> {
        let token = self.token().ok_or(CheckoutError::Unauthorized)?;
        wallet_from_token(&token)
    }
}

#[cfg(test)]
pub(crate) fn token_for(wallet: Address) -> String {
    let payload = serde_json::json!({ "walletAddress": wallet, "iat": 1_650_000_000 });
    format!(
        "{}.{}.sig",
        URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(payload.to_string())
    )
}
