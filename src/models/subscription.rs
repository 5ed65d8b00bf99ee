use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "recurrence_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceKind {
    NoRecurring,
    Monthly,
    Quarterly,
    Yearly,
}

impl RecurrenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrenceKind::NoRecurring => "no_recurring",
            RecurrenceKind::Monthly => "monthly",
            RecurrenceKind::Quarterly => "quarterly",
            RecurrenceKind::Yearly => "yearly",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Open,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Open => "open",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Pending,
    Subscribed,
    Cancelled,
    Expired,
    InRecurring,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Subscribed => "subscribed",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::InRecurring => "in_recurring",
        }
    }
}

/// A purchasable tier. `price_id` always points at the provider price minted
/// for the current `(price, recurrence)` pair.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionPlan {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub recurrence: RecurrenceKind,
    pub price: f64,
    pub product_id: String,
    pub price_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewPlan {
    pub title: String,
    pub description: String,
    pub recurrence: RecurrenceKind,
    pub price: f64,
    pub product_id: String,
    pub price_id: String,
}

/// Columns touched by a plan update. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub recurrence: Option<RecurrenceKind>,
    pub price: Option<f64>,
    pub price_id: Option<String>,
}

impl PlanChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.recurrence.is_none()
            && self.price.is_none()
            && self.price_id.is_none()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreatePlanRequest {
    pub title: String,
    pub description: String,
    #[serde(alias = "type")]
    pub recurrence: RecurrenceKind,
    pub price: f64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UpdatePlanRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "type")]
    pub recurrence: Option<RecurrenceKind>,
    pub price: Option<f64>,
}

/// One user's subscription to one plan, tracked through payment confirmation.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionInstance {
    pub id: Uuid,
    pub system_user_id: Uuid,
    pub plan_id: Uuid,
    pub customer_id: Option<String>,
    pub price_id: String,
    pub stripe_sub_id: Option<String>,
    pub payment_link: Option<String>,
    pub payment_status: PaymentStatus,
    pub status: SubscriptionStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewInstance {
    pub system_user_id: Uuid,
    pub plan_id: Uuid,
    pub price_id: String,
}

/// Target state written by a guarded transition. A `None` subscription id keeps
/// whatever is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub payment_status: PaymentStatus,
    pub status: SubscriptionStatus,
    pub stripe_sub_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubscribeRequest {
    #[serde(alias = "subscription_id")]
    pub plan_id: Uuid,
}
