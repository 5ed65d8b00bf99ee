use super::{
    signature, CheckoutSession, CreateCheckoutSessionRequest, CreatePriceRequest, CustomerInfo,
    StripeEvent, StripeService, StripeServiceError,
};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub const MOCK_WEBHOOK_SECRET: &str = "whsec_mock_secret";

/// In-memory provider. Every call is captured; the `fail_*` switches make the
/// matching call return an API error.
#[derive(Clone, Default)]
pub struct MockStripeService {
    pub products: Arc<Mutex<Vec<(String, String)>>>,
    pub deleted_products: Arc<Mutex<Vec<String>>>,
    pub price_requests: Arc<Mutex<Vec<(String, CreatePriceRequest)>>>,
    pub customers: Arc<Mutex<Vec<(String, String)>>>,
    pub lost_customers: Arc<Mutex<HashSet<String>>>,
    pub checkout_requests: Arc<Mutex<Vec<CreateCheckoutSessionRequest>>>,
    pub fail_create_price: bool,
    pub fail_delete_product: bool,
    pub fail_checkout: bool,
    pub(crate) counter: Arc<AtomicU64>,
}

impl MockStripeService {
    pub fn new() -> Self {
        Self::default()
    }

    fn make_id(&self, prefix: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}_{:06}", prefix, n)
    }

    /// Simulates the provider losing (or deleting) a customer.
    pub fn forget_customer(&self, customer_id: &str) {
        self.lost_customers
            .lock()
            .unwrap()
            .insert(customer_id.to_string());
    }

    pub fn customer_count(&self) -> usize {
        self.customers.lock().unwrap().len()
    }

    pub fn last_price(&self) -> Option<(String, CreatePriceRequest)> {
        self.price_requests.lock().unwrap().last().cloned()
    }

    /// Signs `payload` with the secret this mock verifies against.
    pub fn sign(payload: &[u8]) -> String {
        signature::sign_payload(payload, MOCK_WEBHOOK_SECRET, signature::unix_now())
            .expect("mock secret is valid")
    }
}

#[async_trait]
impl StripeService for MockStripeService {
    async fn create_product(
        &self,
        name: &str,
        _description: Option<&str>,
    ) -> Result<String, StripeServiceError> {
        let id = self.make_id("prod_test");
        self.products
            .lock()
            .unwrap()
            .push((id.clone(), name.to_string()));
        Ok(id)
    }

    async fn create_price(&self, req: CreatePriceRequest) -> Result<String, StripeServiceError> {
        if self.fail_create_price {
            return Err(StripeServiceError::Api("mock price failure".into()));
        }
        let id = self.make_id("price_test");
        self.price_requests.lock().unwrap().push((id.clone(), req));
        Ok(id)
    }

    async fn delete_product(&self, product_id: &str) -> Result<(), StripeServiceError> {
        if self.fail_delete_product {
            return Err(StripeServiceError::Api("mock delete failure".into()));
        }
        self.deleted_products
            .lock()
            .unwrap()
            .push(product_id.to_string());
        Ok(())
    }

    async fn create_customer(
        &self,
        email: &str,
        _name: Option<&str>,
    ) -> Result<String, StripeServiceError> {
        let id = self.make_id("cus_test");
        self.customers
            .lock()
            .unwrap()
            .push((id.clone(), email.to_string()));
        Ok(id)
    }

    async fn get_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<CustomerInfo>, StripeServiceError> {
        if self.lost_customers.lock().unwrap().contains(customer_id) {
            return Ok(None);
        }
        Ok(self
            .customers
            .lock()
            .unwrap()
            .iter()
            .find(|(id, _)| id == customer_id)
            .map(|(id, email)| CustomerInfo {
                id: id.clone(),
                email: Some(email.clone()),
            }))
    }

    async fn create_checkout_session(
        &self,
        req: CreateCheckoutSessionRequest,
    ) -> Result<CheckoutSession, StripeServiceError> {
        self.checkout_requests.lock().unwrap().push(req.clone());
        if self.fail_checkout {
            return Err(StripeServiceError::Api("mock checkout failure".into()));
        }
        let id = self.make_id("cs_test");
        Ok(CheckoutSession {
            url: Some(format!("https://checkout.example.test/{}", id)),
            id,
            customer: req.customer,
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
            MOCK_WEBHOOK_SECRET,
            signature::unix_now(),
            signature::DEFAULT_TOLERANCE_SECS,
        )?;
        super::parse_event(payload)
    }
}
