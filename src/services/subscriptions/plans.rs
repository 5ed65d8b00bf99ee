use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    db::plan_repository::PlanRepository,
    errors::AppError,
    models::subscription::{
        CreatePlanRequest, NewPlan, PlanChanges, RecurrenceKind, SubscriptionPlan,
        UpdatePlanRequest,
    },
    services::stripe::{
        BillingInterval, CreatePriceRequest, PriceRecurrence, StripeService, StripeServiceError,
    },
};

/// Maps a plan's recurrence onto a provider billing interval. Quarterly is
/// three monthly intervals since the provider has no quarter unit.
pub fn price_recurrence(kind: RecurrenceKind) -> Option<PriceRecurrence> {
    let (interval, interval_count) = match kind {
        RecurrenceKind::NoRecurring => return None,
        RecurrenceKind::Monthly => (BillingInterval::Month, 1),
        RecurrenceKind::Quarterly => (BillingInterval::Month, 3),
        RecurrenceKind::Yearly => (BillingInterval::Year, 1),
    };
    Some(PriceRecurrence {
        interval,
        interval_count,
    })
}

/// Largest unit amount the provider accepts for a price.
pub const MAX_UNIT_AMOUNT: i64 = 99_999_999;

/// Decimal currency units to minor units, rounded half away from zero.
pub fn to_minor_units(price: f64) -> i64 {
    (price * 100.0).round() as i64
}

fn validate_price(price: f64) -> Result<(), AppError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(AppError::Validation("price must be greater than zero".into()));
    }
    if to_minor_units(price) < 1 {
        return Err(AppError::Validation("price must be at least 0.01".into()));
    }
    if to_minor_units(price) > MAX_UNIT_AMOUNT {
        return Err(AppError::Validation("price must not exceed 999999.99".into()));
    }
    Ok(())
}

fn validate_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

pub struct PlanManager {
    plans: Arc<dyn PlanRepository>,
    stripe: Arc<dyn StripeService>,
    currency: String,
}

impl PlanManager {
    pub fn new(
        plans: Arc<dyn PlanRepository>,
        stripe: Arc<dyn StripeService>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            plans,
            stripe,
            currency: currency.into(),
        }
    }

    async fn mint_price(
        &self,
        product_id: &str,
        price: f64,
        recurrence: RecurrenceKind,
    ) -> Result<String, StripeServiceError> {
        self.stripe
            .create_price(CreatePriceRequest {
                product_id: product_id.to_string(),
                unit_amount: to_minor_units(price),
                currency: self.currency.clone(),
                recurring: price_recurrence(recurrence),
            })
            .await
    }

    /// Best-effort removal of a product whose plan never made it to the store.
    async fn discard_product(&self, product_id: &str) {
        if let Err(err) = self.stripe.delete_product(product_id).await {
            error!(%product_id, ?err, "failed to remove stripe product; it is now orphaned");
        }
    }

    pub async fn create_plan(&self, req: CreatePlanRequest) -> Result<SubscriptionPlan, AppError> {
        validate_text("title", &req.title)?;
        validate_text("description", &req.description)?;
        validate_price(req.price)?;

        let product_id = self
            .stripe
            .create_product(&req.title, Some(&req.description))
            .await?;

        let price_id = match self.mint_price(&product_id, req.price, req.recurrence).await {
            Ok(id) => id,
            Err(err) => {
                warn!(%product_id, ?err, "price creation failed; removing product");
                self.discard_product(&product_id).await;
                return Err(err.into());
            }
        };

        let new_plan = NewPlan {
            title: req.title,
            description: req.description,
            recurrence: req.recurrence,
            price: req.price,
            product_id: product_id.clone(),
            price_id,
        };
        match self.plans.insert_plan(new_plan).await {
            Ok(plan) => {
                info!(
                    plan_id = %plan.id,
                    %product_id,
                    price_id = %plan.price_id,
                    recurrence = plan.recurrence.as_str(),
                    "plan created"
                );
                Ok(plan)
            }
            Err(err) => {
                self.discard_product(&product_id).await;
                Err(err.into())
            }
        }
    }

    pub async fn update_plan(
        &self,
        plan_id: Uuid,
        req: UpdatePlanRequest,
    ) -> Result<SubscriptionPlan, AppError> {
        let current = self
            .plans
            .find_plan_by_id(plan_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Subscription plan not found".into()))?;

        if let Some(title) = &req.title {
            validate_text("title", title)?;
        }
        if let Some(description) = &req.description {
            validate_text("description", description)?;
        }
        if let Some(price) = req.price {
            validate_price(price)?;
        }

        let mut changes = PlanChanges {
            title: req.title,
            description: req.description,
            recurrence: req.recurrence,
            price: req.price,
            price_id: None,
        };

        let price = req.price.unwrap_or(current.price);
        let recurrence = req.recurrence.unwrap_or(current.recurrence);
        if to_minor_units(price) != to_minor_units(current.price) || recurrence != current.recurrence
        {
            let price_id = self
                .mint_price(&current.product_id, price, recurrence)
                .await?;
            info!(
                %plan_id,
                old_price_id = %current.price_id,
                new_price_id = %price_id,
                recurrence = recurrence.as_str(),
                "minted replacement price"
            );
            changes.price_id = Some(price_id);
        }

        if changes.is_empty() {
            return Ok(current);
        }

        self.plans
            .update_plan(plan_id, &changes)
            .await?
            .ok_or_else(|| AppError::NotFound("Subscription plan not found".into()))
    }

    pub async fn delete_plan(&self, plan_id: Uuid) -> Result<(), AppError> {
        let plan = self
            .plans
            .find_plan_by_id(plan_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Subscription plan not found".into()))?;

        match self.stripe.delete_product(&plan.product_id).await {
            Ok(()) => {}
            Err(StripeServiceError::NotFound(_)) => {
                warn!(%plan_id, product_id = %plan.product_id, "stripe product already gone");
            }
            Err(err) => return Err(err.into()),
        }

        if !self.plans.delete_plan(plan_id).await? {
            return Err(AppError::NotFound("Subscription plan not found".into()));
        }
        info!(%plan_id, product_id = %plan.product_id, "plan deleted");
        Ok(())
    }

    pub async fn list_plans(&self) -> Result<Vec<SubscriptionPlan>, AppError> {
        Ok(self.plans.list_plans().await?)
    }

    pub async fn get_plan(&self, plan_id: Uuid) -> Result<SubscriptionPlan, AppError> {
        self.plans
            .find_plan_by_id(plan_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Subscription plan not found".into()))
    }
}
