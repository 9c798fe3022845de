use crate::{
    error::CheckoutError,
    models::{NewOrder, OrderId, OrderStatus, OrderStatusUpdate},
};
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

/// Header carrying the reconciliation key so the order API can drop repeats.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(250),
        }
    }
}

/// Client for the marketplace order API (`/transactions`).
#[derive(Clone)]
pub struct OrderApiClient {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl OrderApiClient {
    pub fn new(base_url: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry: RetryPolicy {
                max_attempts: retry.max_attempts.max(1),
                ..retry
            },
        }
    }

    /// Posts a pending order and returns the identifier the API assigned.
    pub async fn create_order(&self, order: &NewOrder) -> Result<OrderId, CheckoutError> {
        let url = self
            .transactions_url(None)
            .map_err(CheckoutError::OrderCreateFailed)?;

        let response = self
            .client
            .post(url)
            .json(order)
            .send()
            .await
            .map_err(|e| CheckoutError::OrderCreateFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CheckoutError::OrderCreateFailed(format!(
                "order API returned {}",
                status
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| CheckoutError::OrderCreateFailed(format!("unreadable response: {}", e)))?;

        let id = parse_order_id(&body).ok_or_else(|| {
            CheckoutError::OrderCreateFailed(format!("no order id in response: {}", body))
        })?;

        tracing::info!(order_id = %id, "Pending order created");
        Ok(id)
    }

    /// Records the terminal status of an order, retrying transient failures.
    ///
    /// Every attempt carries the same idempotency key.
    pub async fn reconcile(&self, id: &OrderId, status: OrderStatus) -> Result<(), CheckoutError> {
        let key = Uuid::new_v4();
        let mut last_error = String::new();

        for attempt in 1..=self.retry.max_attempts {
            match self.update_status(id, status, key).await {
                Ok(()) => {
                    tracing::info!(order_id = %id, %status, attempt, "Order reconciled");
                    return Ok(());
                }
                Err(UpdateError::Permanent(reason)) => {
                    last_error = reason;
                    break;
                }
                Err(UpdateError::Transient(reason)) => {
                    tracing::warn!(
                        order_id = %id,
                        attempt,
                        "Order status update failed: {}",
                        reason
                    );
                    last_error = reason;
                    if attempt < self.retry.max_attempts {
                        tokio::time::sleep(self.retry.backoff * attempt).await;
                    }
                }
            }
        }

        Err(CheckoutError::ReconciliationFailed(format!(
            "order {} not marked {}: {}",
            id, status, last_error
        )))
    }

    /// `{base}/transactions[/{id}]`, with the id escaped as a single path segment.
    fn transactions_url(&self, id: Option<&OrderId>) -> Result<Url, String> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| format!("invalid order API URL {}: {}", self.base_url, e))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| format!("order API URL cannot be a base: {}", self.base_url))?;
            segments.pop_if_empty().push("transactions");
            if let Some(id) = id {
                segments.push(id.as_str());
            }
        }
        Ok(url)
    }

    async fn update_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
        key: Uuid,
    ) -> Result<(), UpdateError> {
        let url = self.transactions_url(Some(id)).map_err(UpdateError::Permanent)?;

        let response = self
            .client
            .put(url)
            .header(IDEMPOTENCY_HEADER, key.to_string())
            .json(&OrderStatusUpdate {
                order_status: status,
            })
            .send()
            .await
            .map_err(|e| UpdateError::Transient(e.to_string()))?;

        let code = response.status();
        if code.is_success() {
            if let Ok(record) = response.json::<Value>().await {
                tracing::debug!(order_id = %id, "Order API record: {}", record);
            }
            return Ok(());
        }

        let reason = format!("order API returned {}", code);
        if code.is_server_error() || code == StatusCode::TOO_MANY_REQUESTS {
            Err(UpdateError::Transient(reason))
        } else {
            Err(UpdateError::Permanent(reason))
        }
    }
}

#[derive(Debug)]
enum UpdateError {
    Transient(String),
    Permanent(String),
}

/// The API answers with the bare id; tolerate an `_id`/`id` object as well.
fn parse_order_id(body: &Value) -> Option<OrderId> {
    match body {
        Value::String(s) => OrderId::new(s.as_str()),
        Value::Number(n) => OrderId::new(n.to_string()),
        Value::Object(map) => map
            .get("_id")
            .or_else(|| map.get("id"))
            .and_then(parse_order_id),
        _ => None,
    }
}
