use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Message shown to the user when no wallet provider could be found.
pub const INSTALL_WALLET_PROMPT: &str = "Please install a wallet extension to pay with crypto";

#[derive(Error, Debug)]
pub enum CheckoutError {
    #[error("No wallet provider detected")]
    ProviderAbsent,

    #[error("Account access denied: {0}")]
    AccountAccessDenied(String),

    #[error("Wallet is not connected")]
    NotConnected,

    #[error("Network switch rejected: {0}")]
    NetworkSwitchRejected(String),

    #[error("Transfer rejected: {0}")]
    TransferRejected(String),

    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    #[error("Order creation failed: {0}")]
    OrderCreateFailed(String),

    #[error("Order reconciliation failed: {0}")]
    ReconciliationFailed(String),

    #[error("Listing failed: {0}")]
    ListingFailed(String),

    #[error("Not logged in")]
    Unauthorized,

    #[error("Invalid session token: {0}")]
    InvalidToken(String),

    #[error("Validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("Payment not available: {0}")]
    NotAdmitted(String),

    #[error("RPC error: {0}")]
    RpcError(#[from] ethers::providers::ProviderError),

    #[error("Conversion error: {0}")]
    ConversionError(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl CheckoutError {
    /// Collapses any error into the single string shown inline on the page.
    pub fn user_message(&self) -> String {
        match self {
            CheckoutError::ProviderAbsent => INSTALL_WALLET_PROMPT.to_string(),
            CheckoutError::NetworkSwitchRejected(reason)
            | CheckoutError::TransferRejected(reason)
            | CheckoutError::TransferFailed(reason) => reason.clone(),
            other => other.to_string(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            CheckoutError::ProviderAbsent => "PROVIDER_ABSENT",
            CheckoutError::AccountAccessDenied(_) => "ACCOUNT_ACCESS_DENIED",
            CheckoutError::NotConnected => "NOT_CONNECTED",
            CheckoutError::NetworkSwitchRejected(_) => "NETWORK_SWITCH_REJECTED",
            CheckoutError::TransferRejected(_) => "TRANSFER_REJECTED",
            CheckoutError::TransferFailed(_) => "TRANSFER_FAILED",
            CheckoutError::OrderCreateFailed(_) => "ORDER_CREATE_FAILED",
            CheckoutError::ReconciliationFailed(_) => "RECONCILIATION_FAILED",
            CheckoutError::ListingFailed(_) => "LISTING_FAILED",
            CheckoutError::Unauthorized => "UNAUTHORIZED",
            CheckoutError::InvalidToken(_) => "INVALID_TOKEN",
            CheckoutError::Validation(_) => "VALIDATION_FAILED",
            CheckoutError::NotAdmitted(_) => "PAYMENT_NOT_AVAILABLE",
            CheckoutError::RpcError(_) | CheckoutError::HttpError(_) => "UPSTREAM_ERROR",
            CheckoutError::ConversionError(_) | CheckoutError::ConfigError(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            CheckoutError::ProviderAbsent | CheckoutError::NotConnected => {
                StatusCode::PRECONDITION_FAILED
            }
            CheckoutError::Unauthorized | CheckoutError::InvalidToken(_) => {
                StatusCode::UNAUTHORIZED
            }
            CheckoutError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CheckoutError::NotAdmitted(_) => StatusCode::CONFLICT,
            CheckoutError::AccountAccessDenied(_)
            | CheckoutError::NetworkSwitchRejected(_)
            | CheckoutError::TransferRejected(_) => StatusCode::FORBIDDEN,
            CheckoutError::TransferFailed(_)
            | CheckoutError::OrderCreateFailed(_)
            | CheckoutError::ReconciliationFailed(_)
            | CheckoutError::ListingFailed(_)
            | CheckoutError::RpcError(_)
            | CheckoutError::HttpError(_) => StatusCode::BAD_GATEWAY,
            CheckoutError::ConversionError(_) | CheckoutError::ConfigError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub error_code: String,
    pub timestamp: chrono::DateTime<Utc>,
    pub request_id: String,
}

impl IntoResponse for CheckoutError {
    fn into_response(self) -> Response {
        let request_id = Uuid::new_v4().to_string();
        let status = self.status();
        let error_code = self.error_code();

        let body = ErrorResponse {
            success: false,
            error: self.user_message(),
            error_code: error_code.to_string(),
            timestamp: Utc::now(),
            request_id,
        };

        if status.is_server_error() {
            tracing::error!(error = ?self, error_code = error_code, "Request failed");
        } else {
            tracing::warn!(error = %self, error_code = error_code, "Request rejected");
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_absent_prompts_install() {
        assert_eq!(
            CheckoutError::ProviderAbsent.user_message(),
            INSTALL_WALLET_PROMPT
        );
    }

    #[test]
    fn wallet_errors_surface_provider_reason() {
        let err = CheckoutError::TransferRejected("User denied transaction signature".into());
        assert_eq!(err.user_message(), "User denied transaction signature");
        assert_eq!(err.error_code(), "TRANSFER_REJECTED");
    }

    #[test]
    fn validation_lists_every_field() {
        let err = CheckoutError::Validation(vec!["city".into(), "country".into()]);
        assert_eq!(err.to_string(), "Validation failed: city, country");
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
