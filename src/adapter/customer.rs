//! Customer microservice client
//!
//! Answers "does customer X exist and is it active". A connectivity failure
//! is reported as `ExternalServiceUnavailable` and never conflated with a
//! negative validation result.

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::DomainError;

/// Outcome of a customer validation call.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerValidation {
    pub exists: bool,
    #[serde(rename = "isActive")]
    pub active: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Customer directory lookup.
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    /// Validate a customer by id. `Err` means the directory could not be
    /// consulted, not that the customer is unknown.
    async fn validate(&self, customer_id: i64) -> Result<CustomerValidation, DomainError>;
}

/// HTTP client for the customer microservice.
#[derive(Debug, Clone)]
pub struct HttpCustomerDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCustomerDirectory {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl CustomerDirectory for HttpCustomerDirectory {
    async fn validate(&self, customer_id: i64) -> Result<CustomerValidation, DomainError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), customer_id);

        let response = self.client.get(&url).send().await.map_err(|e| {
            tracing::error!(customer_id, error = %e, "customer service request failed");
            DomainError::ExternalServiceUnavailable(e.to_string())
        })?;

        if !response.status().is_success() {
            tracing::error!(
                customer_id,
                status = %response.status(),
                "customer service returned an error status"
            );
            return Err(DomainError::ExternalServiceUnavailable(format!(
                "Customer service returned status {}.",
                response.status()
            )));
        }

        response.json::<CustomerValidation>().await.map_err(|e| {
            tracing::error!(customer_id, error = %e, "customer service returned an invalid body");
            DomainError::ExternalServiceUnavailable(
                "Customer service returned an error or empty body.".to_string(),
            )
        })
    }
}
