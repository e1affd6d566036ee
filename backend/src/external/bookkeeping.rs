//! Bookkeeping system client
//!
//! Confirmed sales orders are pushed to the accounting system after commit.
//! The push is best effort: callers turn failures into response warnings.

use std::time::Duration;

use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::BookkeepingConfig;
use crate::error::{AppError, AppResult};

/// Client for the bookkeeping notification endpoint
#[derive(Clone)]
pub struct BookkeepingClient {
    api_endpoint: String,
    api_key: Option<String>,
    http_client: Client,
}

/// Payload describing a confirmed sales order
#[derive(Debug, Serialize)]
pub struct SalesOrderConfirmed {
    pub sales_order_id: Uuid,
    pub order_number: String,
    pub customer_id: Uuid,
    pub total: Decimal,
    pub balance: Decimal,
}

/// Acknowledgement returned by the bookkeeping system
#[derive(Debug, Deserialize)]
pub struct SyncAck {
    pub external_id: Option<String>,
}

impl BookkeepingClient {
    /// Create a new bookkeeping client
    pub fn new(api_endpoint: String, api_key: Option<String>, timeout: Duration) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_endpoint,
            api_key,
            http_client,
        })
    }

    /// Create a client from configuration; `None` when no endpoint is configured
    pub fn from_config(config: &BookkeepingConfig) -> AppResult<Option<Self>> {
        match &config.endpoint {
            Some(endpoint) if !endpoint.is_empty() => Ok(Some(Self::new(
                endpoint.clone(),
                config.api_key.clone(),
                Duration::from_secs(config.timeout_secs),
            )?)),
            _ => Ok(None),
        }
    }

    /// Notify that a sales order was confirmed
    pub async fn notify_order_confirmed(&self, event: &SalesOrderConfirmed) -> AppResult<SyncAck> {
        let url = format!("{}/sales-orders", self.api_endpoint.trim_end_matches('/'));

        let mut request = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(event);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalService(format!(
                "Bookkeeping returned {}: {}",
                status, body
            )));
        }

        let ack: SyncAck = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("Failed to parse response: {}", e)))?;

        Ok(ack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(endpoint: Option<&str>) -> BookkeepingConfig {
        BookkeepingConfig {
            endpoint: endpoint.map(str::to_string),
            api_key: None,
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_client_disabled_without_endpoint() {
        assert!(BookkeepingClient::from_config(&config(None)).unwrap().is_none());
        assert!(BookkeepingClient::from_config(&config(Some(""))).unwrap().is_none());
    }

    #[test]
    fn test_client_enabled_with_endpoint() {
        let client = BookkeepingClient::from_config(&config(Some("http://books.local/api/")))
            .unwrap()
            .expect("client");
        assert_eq!(client.api_endpoint, "http://books.local/api/");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_external_error() {
        let client = BookkeepingClient::new(
            "http://127.0.0.1:9".to_string(),
            None,
            Duration::from_millis(200),
        )
        .unwrap();
        let event = SalesOrderConfirmed {
            sales_order_id: Uuid::new_v4(),
            order_number: "SO-2025-00001".to_string(),
            customer_id: Uuid::new_v4(),
            total: Decimal::from(100),
            balance: Decimal::from(100),
        };

        let err = client.notify_order_confirmed(&event).await.unwrap_err();
        assert!(matches!(err, AppError::ExternalService(_)));
    }
}
