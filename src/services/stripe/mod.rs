// async-stripe is compiled with only the `checkout` and `products` resource
// features. Reaching for other resources means updating Cargo.toml.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum StripeServiceError {
    #[error("stripe api error: {0}")]
    Api(String),
    #[error("webhook verification failed: {0}")]
    Webhook(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("serialization error: {0}")]
    Serde(String),
    #[error("other error: {0}")]
    Other(String),
}

impl From<stripe::StripeError> for StripeServiceError {
    fn from(err: stripe::StripeError) -> Self {
        StripeServiceError::Api(err.to_string())
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BillingInterval {
    Month,
    Year,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriceRecurrence {
    pub interval: BillingInterval,
    pub interval_count: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CreatePriceRequest {
    pub product_id: String,
    /// Amount in the currency's minor unit (cents for usd).
    pub unit_amount: i64,
    pub currency: String,
    /// `None` mints a one-time price.
    pub recurring: Option<PriceRecurrence>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutMode {
    Payment,
    Subscription,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckoutLineItem {
    pub price: String,
    pub quantity: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateCheckoutSessionRequest {
    pub success_url: String,
    pub cancel_url: String,
    pub mode: CheckoutMode,
    pub line_items: Vec<CheckoutLineItem>,
    pub client_reference_id: Option<String>,
    pub customer: Option<String>,
    pub metadata: Option<std::collections::BTreeMap<String, String>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
    pub customer: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomerInfo {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    pub r#type: String,
    pub payload: serde_json::Value,
}

#[async_trait]
pub trait StripeService: Send + Sync {
    async fn create_product(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<String, StripeServiceError>;

    async fn create_price(&self, req: CreatePriceRequest) -> Result<String, StripeServiceError>;

    async fn delete_product(&self, product_id: &str) -> Result<(), StripeServiceError>;

    async fn create_customer(
        &self,
        email: &str,
        name: Option<&str>,
    ) -> Result<String, StripeServiceError>;

    /// `Ok(None)` when the provider no longer has the customer or marks it deleted.
    async fn get_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<CustomerInfo>, StripeServiceError>;

    async fn create_checkout_session(
        &self,
        req: CreateCheckoutSessionRequest,
    ) -> Result<CheckoutSession, StripeServiceError>;

    fn verify_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<StripeEvent, StripeServiceError>;
}

/// Parses an already-authenticated webhook body into the event envelope.
pub(crate) fn parse_event(payload: &[u8]) -> Result<StripeEvent, StripeServiceError> {
    let val: serde_json::Value =
        serde_json::from_slice(payload).map_err(|e| StripeServiceError::Serde(e.to_string()))?;
    let id = val
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| StripeServiceError::Serde("event is missing id".into()))?
        .to_string();
    let ty = val
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| StripeServiceError::Serde("event is missing type".into()))?
        .to_string();
    Ok(StripeEvent {
        id,
        r#type: ty,
        payload: val,
    })
}

mod live;
#[cfg(test)]
mod mock;
pub mod signature;

pub use live::LiveStripeService;
#[cfg(test)]
pub use mock::MockStripeService;
