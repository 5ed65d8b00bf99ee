use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::transitions::{transition, Signal};
use crate::{
    db::{
        plan_repository::PlanRepository, subscription_repository::SubscriptionRepository,
        user_repository::UserRepository,
    },
    errors::AppError,
    models::{
        subscription::{NewInstance, RecurrenceKind, SubscriptionInstance, SubscriptionPlan},
        user::{User, UserRole},
    },
    services::stripe::{
        CheckoutLineItem, CheckoutMode, CreateCheckoutSessionRequest, StripeEvent, StripeService,
        StripeServiceError,
    },
};

/// Metadata key carrying the instance id through the checkout session and
/// back in the confirmation event.
pub const CORRELATION_KEY: &str = "student_subscription_id";

#[derive(Debug, Clone)]
pub struct CheckoutUrls {
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    Applied(SubscriptionInstance),
    Skipped { reason: &'static str },
    Ignored,
}

fn jget<'a>(val: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut cur = val;
    for key in path {
        cur = cur.get(*key)?;
    }
    Some(cur)
}

fn extract_str<'a>(val: &'a Value, path: &[&str]) -> Option<&'a str> {
    jget(val, path)?.as_str()
}

/// Reads an id that may arrive either bare or as an expanded object.
fn extract_id(val: &Value, path: &[&str]) -> Option<String> {
    let v = jget(val, path)?;
    v.as_str()
        .or_else(|| v.get("id").and_then(Value::as_str))
        .map(str::to_string)
}

fn correlation_id(event: &StripeEvent) -> Result<Uuid, AppError> {
    let raw = extract_str(
        &event.payload,
        &["data", "object", "metadata", CORRELATION_KEY],
    )
    .ok_or_else(|| AppError::Validation(format!("event is missing {} metadata", CORRELATION_KEY)))?;
    Uuid::parse_str(raw)
        .map_err(|_| AppError::Validation(format!("{} is not a valid id", CORRELATION_KEY)))
}

fn subscription_ref(event: &StripeEvent, path: &[&str]) -> Result<String, AppError> {
    extract_id(&event.payload, path)
        .ok_or_else(|| AppError::Validation("event does not reference a subscription".into()))
}

enum Target {
    Instance(Uuid),
    ProviderSubscription(String),
}

pub struct SubscriptionLifecycle {
    users: Arc<dyn UserRepository>,
    plans: Arc<dyn PlanRepository>,
    instances: Arc<dyn SubscriptionRepository>,
    stripe: Arc<dyn StripeService>,
    urls: CheckoutUrls,
}

impl SubscriptionLifecycle {
    pub fn new(
        users: Arc<dyn UserRepository>,
        plans: Arc<dyn PlanRepository>,
        instances: Arc<dyn SubscriptionRepository>,
        stripe: Arc<dyn StripeService>,
        urls: CheckoutUrls,
    ) -> Self {
        Self {
            users,
            plans,
            instances,
            stripe,
            urls,
        }
    }

    /// Starts a checkout for `user` on `plan_id` and returns the Pending
    /// instance carrying the checkout link.
    pub async fn subscribe(
        &self,
        user: &User,
        plan_id: Uuid,
    ) -> Result<SubscriptionInstance, AppError> {
        if user.role != UserRole::Student {
            return Err(AppError::Forbidden(
                "Only students can subscribe to a plan".into(),
            ));
        }

        let plan = self
            .plans
            .find_plan_by_id(plan_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Subscription plan not found".into()))?;

        let customer_id = self.ensure_customer(user).await?;

        let instance = self
            .instances
            .insert_instance(NewInstance {
                system_user_id: user.id,
                plan_id: plan.id,
                price_id: plan.price_id.clone(),
            })
            .await?;

        let (session_customer, link) = match self.open_checkout(&plan, &instance, &customer_id).await
        {
            Ok(opened) => opened,
            Err(err) => {
                warn!(instance_id = %instance.id, ?err, "checkout creation failed");
                self.abandon(&instance).await;
                return Err(err.into());
            }
        };

        let updated = self
            .instances
            .attach_checkout(instance.id, &session_customer, &link)
            .await?
            .ok_or_else(|| AppError::NotFound("Subscription not found".into()))?;

        info!(
            instance_id = %updated.id,
            user_id = %user.id,
            plan_id = %plan.id,
            "checkout session opened"
        );
        Ok(updated)
    }

    /// Returns a provider customer id for `user`, minting one when none is
    /// stored or the stored one no longer exists on the provider side.
    async fn ensure_customer(&self, user: &User) -> Result<String, AppError> {
        if let Some(existing) = user.stripe_customer_id.as_deref() {
            if self.stripe.get_customer(existing).await?.is_some() {
                return Ok(existing.to_string());
            }
            warn!(user_id = %user.id, customer_id = %existing, "stored stripe customer is gone; replacing it");
        }

        let customer_id = self
            .stripe
            .create_customer(&user.email, Some(&user.name))
            .await?;
        self.users
            .set_stripe_customer_id(user.id, &customer_id)
            .await?;
        info!(user_id = %user.id, %customer_id, "stripe customer created");
        Ok(customer_id)
    }

    async fn open_checkout(
        &self,
        plan: &SubscriptionPlan,
        instance: &SubscriptionInstance,
        customer_id: &str,
    ) -> Result<(String, String), StripeServiceError> {
        let mode = match plan.recurrence {
            RecurrenceKind::NoRecurring => CheckoutMode::Payment,
            _ => CheckoutMode::Subscription,
        };
        let metadata = BTreeMap::from([(CORRELATION_KEY.to_string(), instance.id.to_string())]);

        let session = self
            .stripe
            .create_checkout_session(CreateCheckoutSessionRequest {
                success_url: self.urls.success_url.clone(),
                cancel_url: self.urls.cancel_url.clone(),
                mode,
                line_items: vec![CheckoutLineItem {
                    price: instance.price_id.clone(),
                    quantity: 1,
                }],
                client_reference_id: Some(instance.id.to_string()),
                customer: Some(customer_id.to_string()),
                metadata: Some(metadata),
            })
            .await?;

        let link = session.url.ok_or_else(|| {
            StripeServiceError::Other(format!("checkout session {} has no url", session.id))
        })?;
        let customer = session.customer.unwrap_or_else(|| customer_id.to_string());
        Ok((customer, link))
    }

    /// Moves an instance whose checkout could not be opened out of Pending.
    async fn abandon(&self, instance: &SubscriptionInstance) {
        let Some(update) = transition(instance.status, instance.payment_status, &Signal::CheckoutFailed)
        else {
            return;
        };
        match self
            .instances
            .apply_transition(instance.id, &[instance.status], &update)
            .await
        {
            Ok(_) => info!(instance_id = %instance.id, "pending subscription cancelled"),
            Err(err) => error!(
                instance_id = %instance.id,
                ?err,
                "failed to cancel pending subscription; it stays pending"
            ),
        }
    }

    /// Applies a verified provider event. Validation errors mean the payload
    /// is unusable; everything else is reported through the outcome.
    pub async fn handle_event(&self, event: &StripeEvent) -> Result<EventOutcome, AppError> {
        let (target, signal) = match event.r#type.as_str() {
            "checkout.session.completed" | "checkout.session.async_payment_succeeded" => {
                let id = correlation_id(event)?;
                let payment_status = extract_str(&event.payload, &["data", "object", "payment_status"]);
                let status = extract_str(&event.payload, &["data", "object", "status"]);
                if payment_status != Some("paid") || status != Some("complete") {
                    info!(
                        event_id = %event.id,
                        instance_id = %id,
                        ?payment_status,
                        ?status,
                        "checkout not paid yet"
                    );
                    return Ok(EventOutcome::Skipped {
                        reason: "payment not confirmed",
                    });
                }
                let stripe_sub_id = extract_id(&event.payload, &["data", "object", "subscription"]);
                (
                    Target::Instance(id),
                    Signal::CheckoutCompleted { stripe_sub_id },
                )
            }
            "checkout.session.async_payment_failed" => {
                (Target::Instance(correlation_id(event)?), Signal::CheckoutFailed)
            }
            "checkout.session.expired" => {
                (Target::Instance(correlation_id(event)?), Signal::CheckoutExpired)
            }
            "invoice.paid" => {
                let reason = extract_str(&event.payload, &["data", "object", "billing_reason"]);
                if reason != Some("subscription_cycle") {
                    return Ok(EventOutcome::Skipped {
                        reason: "not a renewal invoice",
                    });
                }
                let sub = subscription_ref(event, &["data", "object", "subscription"])?;
                (Target::ProviderSubscription(sub), Signal::RenewalPaid)
            }
            "invoice.payment_failed" => {
                let sub = subscription_ref(event, &["data", "object", "subscription"])?;
                (Target::ProviderSubscription(sub), Signal::RenewalFailed)
            }
            "customer.subscription.deleted" => {
                let sub = subscription_ref(event, &["data", "object", "id"])?;
                (Target::ProviderSubscription(sub), Signal::ProviderCancelled)
            }
            other => {
                info!(event_id = %event.id, event_type = %other, "unhandled stripe event");
                return Ok(EventOutcome::Ignored);
            }
        };

        let instance = match &target {
            Target::Instance(id) => self.instances.find_instance_by_id(*id).await?,
            Target::ProviderSubscription(sub) => {
                self.instances.find_instance_by_stripe_sub_id(sub).await?
            }
        };
        let Some(instance) = instance else {
            warn!(event_id = %event.id, event_type = %event.r#type, "event references no known subscription");
            return Ok(EventOutcome::Skipped {
                reason: "unknown subscription",
            });
        };

        self.apply(instance, &signal, &event.id).await
    }

    async fn apply(
        &self,
        instance: SubscriptionInstance,
        signal: &Signal,
        event_id: &str,
    ) -> Result<EventOutcome, AppError> {
        let Some(update) = transition(instance.status, instance.payment_status, signal) else {
            info!(
                %event_id,
                instance_id = %instance.id,
                status = instance.status.as_str(),
                signal = signal.name(),
                "transition does not apply; ignoring"
            );
            return Ok(EventOutcome::Skipped {
                reason: "transition not applicable",
            });
        };

        match self
            .instances
            .apply_transition(instance.id, &[instance.status], &update)
            .await?
        {
            Some(updated) => {
                info!(
                    %event_id,
                    instance_id = %updated.id,
                    from = instance.status.as_str(),
                    to = updated.status.as_str(),
                    payment_status = updated.payment_status.as_str(),
                    "subscription transitioned"
                );
                Ok(EventOutcome::Applied(updated))
            }
            None => {
                info!(%event_id, instance_id = %instance.id, "subscription changed concurrently; ignoring");
                Ok(EventOutcome::Skipped {
                    reason: "concurrent update",
                })
            }
        }
    }
}
