//! Payment processor API client.
//!
//! The storefront core treats the processor as opaque: it creates an intent,
//! asks for confirmation, and only ever sees success/failure plus a reference
//! string. Card data, 3DS, and webhook handling live entirely on the
//! processor's side.

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use mangaba_core::{Money, OrderId};

use crate::config::PaymentConfig;

/// Errors that can occur when interacting with the payment processor.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// The processor refused the capture.
    #[error("Payment declined: {0}")]
    Declined(String),

    /// Failed to parse a response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// A created payment intent, identified by an opaque reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    /// Processor-side reference for this payment.
    pub reference: String,
}

/// Capture-side operations on the payment processor.
pub trait PaymentGateway: Send + Sync {
    /// Create a payment intent for an order total.
    async fn create_intent(
        &self,
        order_id: &OrderId,
        amount: Money,
    ) -> Result<PaymentIntent, PaymentError>;

    /// Confirm a previously created intent. `Ok` means captured.
    async fn confirm(&self, reference: &str) -> Result<(), PaymentError>;
}

#[derive(Debug, Serialize)]
struct CreateIntentRequest<'a> {
    order_id: &'a str,
    amount: Money,
}

#[derive(Debug, Deserialize)]
struct IntentResponse {
    reference: String,
}

#[derive(Debug, Deserialize)]
struct ConfirmResponse {
    status: String,
}

/// Payment processor API client.
#[derive(Clone)]
pub struct HttpPaymentClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPaymentClient {
    /// Create a new payment API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &PaymentConfig) -> Result<Self, PaymentError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.api_key.expose_secret());
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| PaymentError::Parse(format!("Invalid API key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }
}

impl PaymentGateway for HttpPaymentClient {
    async fn create_intent(
        &self,
        order_id: &OrderId,
        amount: Money,
    ) -> Result<PaymentIntent, PaymentError> {
        let url = format!("{}/intents", self.base_url);
        let order_id = order_id.to_string();

        let response = self
            .client
            .post(&url)
            .json(&CreateIntentRequest {
                order_id: &order_id,
                amount,
            })
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: IntentResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::Parse(e.to_string()))?;

        Ok(PaymentIntent {
            reference: body.reference,
        })
    }

    async fn confirm(&self, reference: &str) -> Result<(), PaymentError> {
        let url = format!(
            "{}/intents/{}/confirm",
            self.base_url,
            urlencoding::encode(reference)
        );

        let response = self.client.post(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ConfirmResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::Parse(e.to_string()))?;

        if body.status != "captured" {
            return Err(PaymentError::Declined(body.status));
        }

        Ok(())
    }
}
