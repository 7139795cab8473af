//! HTTP client for the backend capture endpoint
//!
//! Posts accepted capture payloads to `{server_url}/captures` with
//! Bearer auth. The client distinguishes retryable failures (5xx,
//! timeouts, connection errors) from permanent ones so the offline
//! queue knows whether to reschedule or keep the error.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;

use crate::capture::CapturePayload;
use crate::config::DeliveryConfig;
use crate::error::{Error, Result};

/// Response from POST /captures
#[derive(Debug, Deserialize)]
pub struct CaptureResponse {
    /// Server-assigned id of the stored capture
    pub capture_id: String,
    /// Space the server filed the capture under, if any
    #[serde(default)]
    pub space_id: Option<String>,
}

/// HTTP client for the capture backend
pub struct DeliveryClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl DeliveryClient {
    /// Create a new delivery client from configuration
    ///
    /// Returns an error if the configuration is invalid or missing required fields.
    pub fn new(config: &DeliveryConfig) -> Result<Self> {
        config.validate()?;

        let base_url = config
            .server_url
            .clone()
            .ok_or_else(|| Error::Config("delivery.server_url is required".to_string()))?
            .trim_end_matches('/')
            .to_string();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(api_key) = &config.api_key {
            let auth_value = format!("Bearer {}", api_key);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth_value)
                    .map_err(|e| Error::Config(format!("invalid api_key: {}", e)))?,
            );
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    /// Send one capture payload.
    pub async fn send_capture(&self, payload: &CapturePayload) -> Result<CaptureResponse> {
        let url = format!("{}/captures", self.base_url);

        let response = self
            .http_client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| Error::Delivery(format!("HTTP request failed: {}", e)))?;

        let status = response.status();

        if status.is_success() {
            let result: CaptureResponse = response
                .json()
                .await
                .map_err(|e| Error::Delivery(format!("failed to parse response: {}", e)))?;
            tracing::debug!(capture_id = %result.capture_id, "Capture accepted by backend");
            Ok(result)
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            Err(Error::Delivery(format!(
                "API error ({}): {}",
                status, error_text
            )))
        }
    }

    /// Check if the backend is reachable
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/health", self.base_url);

        match self.http_client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}

/// Check if an error is retryable (transient)
pub fn is_retryable_error(error: &Error) -> bool {
    match error {
        Error::Delivery(msg) => {
            // Retry on 5xx errors
            msg.contains("50") && (msg.contains("API error") || msg.contains("HTTP"))
                // Retry on network/timeout errors
                || msg.contains("timeout")
                || msg.contains("connection")
                || msg.contains("request failed")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_requires_valid_config() {
        let config = DeliveryConfig {
            enabled: true,
            ..Default::default()
        };
        assert!(DeliveryClient::new(&config).is_err());
    }

    #[test]
    fn test_client_with_valid_config() {
        let config = DeliveryConfig {
            enabled: true,
            server_url: Some("https://api.example.com/".to_string()),
            api_key: Some("tm_live_test".to_string()),
            ..Default::default()
        };
        let client = DeliveryClient::new(&config).unwrap();
        assert_eq!(client.base_url, "https://api.example.com");
    }

    #[test]
    fn test_is_retryable_error() {
        assert!(is_retryable_error(&Error::Delivery(
            "API error (500): internal error".to_string()
        )));
        assert!(is_retryable_error(&Error::Delivery(
            "HTTP request failed: timeout".to_string()
        )));
        assert!(!is_retryable_error(&Error::Delivery(
            "API error (400): bad request".to_string()
        )));
        assert!(!is_retryable_error(&Error::Delivery(
            "API error (401): unauthorized".to_string()
        )));
    }
}
