use super::{
    signature, BillingInterval, CheckoutLineItem, CheckoutMode, CheckoutSession,
    CreateCheckoutSessionRequest, CreatePriceRequest, CustomerInfo, StripeEvent, StripeService,
    StripeServiceError,
};
use async_trait::async_trait;

pub struct LiveStripeService {
    client: stripe::Client,
    webhook_secret: String,
}

impl LiveStripeService {
    pub fn new(secret_key: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        let client = stripe::Client::new(secret_key);
        Self {
            client,
            webhook_secret: webhook_secret.into(),
        }
    }

    pub fn from_settings(settings: &crate::config::StripeSettings) -> Self {
        Self::new(settings.secret_key.clone(), settings.webhook_secret.clone())
    }
}

fn map_mode(mode: CheckoutMode) -> stripe::CheckoutSessionMode {
    match mode {
        CheckoutMode::Payment => stripe::CheckoutSessionMode::Payment,
        CheckoutMode::Subscription => stripe::CheckoutSessionMode::Subscription,
    }
}

fn map_interval(interval: BillingInterval) -> stripe::CreatePriceRecurringInterval {
    match interval {
        BillingInterval::Month => stripe::CreatePriceRecurringInterval::Month,
        BillingInterval::Year => stripe::CreatePriceRecurringInterval::Year,
    }
}

fn map_line_items(items: &[CheckoutLineItem]) -> Vec<stripe::CreateCheckoutSessionLineItems> {
    items
        .iter()
        .map(|li| stripe::CreateCheckoutSessionLineItems {
            price: Some(li.price.clone()),
            quantity: Some(li.quantity),
            ..Default::default()
        })
        .collect()
}

fn is_not_found(err: &stripe::StripeError) -> bool {
    matches!(err, stripe::StripeError::Stripe(req) if req.http_status == 404)
}

#[async_trait]
impl StripeService for LiveStripeService {
    async fn create_product(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<String, StripeServiceError> {
        let mut params = stripe::CreateProduct::new(name);
        params.description = description;
        let product = stripe::Product::create(&self.client, params).await?;
        Ok(product.id.to_string())
    }

    async fn create_price(&self, req: CreatePriceRequest) -> Result<String, StripeServiceError> {
        let currency = req
            .currency
            .to_lowercase()
            .parse::<stripe::Currency>()
            .map_err(|e| StripeServiceError::Config(format!("{}: {}", req.currency, e)))?;

        let mut params = stripe::CreatePrice::new(currency);
        params.product = Some(stripe::IdOrCreate::Id(&req.product_id));
        params.unit_amount = Some(req.unit_amount);
        params.recurring = req.recurring.map(|r| stripe::CreatePriceRecurring {
            interval: map_interval(r.interval),
            interval_count: Some(r.interval_count),
            ..Default::default()
        });

        let price = stripe::Price::create(&self.client, params).await?;
        Ok(price.id.to_string())
    }

    async fn delete_product(&self, product_id: &str) -> Result<(), StripeServiceError> {
        let id = product_id
            .parse::<stripe::ProductId>()
            .map_err(|e| StripeServiceError::Other(e.to_string()))?;
        match stripe::Product::delete(&self.client, &id).await {
            Ok(_) => Ok(()),
            Err(err) if is_not_found(&err) => {
                Err(StripeServiceError::NotFound(format!("product {}", product_id)))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn create_customer(
        &self,
        email: &str,
        name: Option<&str>,
    ) -> Result<String, StripeServiceError> {
        let mut params = stripe::CreateCustomer::new();
        params.email = Some(email);
        if let Some(name) = name {
            params.name = Some(name);
        }
        let customer = stripe::Customer::create(&self.client, params).await?;
        Ok(customer.id.to_string())
    }

    async fn get_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<CustomerInfo>, StripeServiceError> {
        let id = match customer_id.parse::<stripe::CustomerId>() {
            Ok(id) => id,
            // a malformed stored id can never resolve; treat it as lost
            Err(_) => return Ok(None),
        };
        match stripe::Customer::retrieve(&self.client, &id, &[]).await {
            Ok(customer) if customer.deleted => Ok(None),
            Ok(customer) => Ok(Some(CustomerInfo {
                id: customer.id.to_string(),
                email: customer.email,
            })),
            Err(err) if is_not_found(&err) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn create_checkout_session(
        &self,
        req: CreateCheckoutSessionRequest,
    ) -> Result<CheckoutSession, StripeServiceError> {
        let mut params = stripe::CreateCheckoutSession::new();
        params.mode = Some(map_mode(req.mode));
        params.success_url = Some(&req.success_url);
        params.cancel_url = Some(&req.cancel_url);
        if let Some(ref id) = req.client_reference_id {
            params.client_reference_id = Some(id);
        }
        if let Some(ref customer) = req.customer {
            let cid = customer
                .parse::<stripe::CustomerId>()
                .map_err(|e| StripeServiceError::Other(e.to_string()))?;
            params.customer = Some(cid);
        }
        if let Some(ref meta) = req.metadata {
            params.metadata = Some(
                meta.iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            );
        }
        if !req.line_items.is_empty() {
            params.line_items = Some(map_line_items(&req.line_items));
        }

        let session = stripe::CheckoutSession::create(&self.client, params).await?;
        Ok(CheckoutSession {
            id: session.id.to_string(),
            url: session.url.clone(),
            customer: session.customer.as_ref().map(|c| c.id().to_string()),
        })
    }

    fn verify_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<StripeEvent, StripeServiceError> {
        signature::verify_signature(
            payload,
            signature_header,
            &self.webhook_secret,
            signature::unix_now(),
            signature::DEFAULT_TOLERANCE_SECS,
        )?;
        super::parse_event(payload)
    }
}
