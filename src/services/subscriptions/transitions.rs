use crate::models::subscription::{PaymentStatus, StatusUpdate, SubscriptionStatus};

/// Something the payment provider (or our own compensation path) reports
/// about an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Checkout finished and the first payment cleared.
    CheckoutCompleted { stripe_sub_id: Option<String> },
    /// Checkout could not be completed (async payment failure, or the session
    /// could not be opened at all).
    CheckoutFailed,
    CheckoutExpired,
    RenewalPaid,
    RenewalFailed,
    ProviderCancelled,
}

impl Signal {
    pub fn name(&self) -> &'static str {
        match self {
            Signal::CheckoutCompleted { .. } => "checkout_completed",
            Signal::CheckoutFailed => "checkout_failed",
            Signal::CheckoutExpired => "checkout_expired",
            Signal::RenewalPaid => "renewal_paid",
            Signal::RenewalFailed => "renewal_failed",
            Signal::ProviderCancelled => "provider_cancelled",
        }
    }
}

const ACTIVE: [SubscriptionStatus; 2] =
    [SubscriptionStatus::Subscribed, SubscriptionStatus::InRecurring];

/// Computes the state an instance moves to when `signal` arrives while it is
/// in `(status, payment)`. `None` means the signal does not apply and must be
/// ignored, which is what makes replayed events harmless.
pub fn transition(
    status: SubscriptionStatus,
    payment: PaymentStatus,
    signal: &Signal,
) -> Option<StatusUpdate> {
    use SubscriptionStatus::*;

    let update = |payment_status, status| StatusUpdate {
        payment_status,
        status,
        stripe_sub_id: None,
    };

    match signal {
        Signal::CheckoutCompleted { stripe_sub_id } if status == Pending => Some(StatusUpdate {
            payment_status: PaymentStatus::Paid,
            status: Subscribed,
            stripe_sub_id: stripe_sub_id.clone(),
        }),
        Signal::CheckoutFailed if status == Pending => {
            Some(update(PaymentStatus::Failed, Cancelled))
        }
        Signal::CheckoutExpired if status == Pending => Some(update(PaymentStatus::Failed, Expired)),
        Signal::RenewalPaid if ACTIVE.contains(&status) => {
            Some(update(PaymentStatus::Paid, InRecurring))
        }
        Signal::RenewalFailed if ACTIVE.contains(&status) => {
            Some(update(PaymentStatus::Failed, status))
        }
        Signal::ProviderCancelled if ACTIVE.contains(&status) => Some(update(payment, Cancelled)),
        _ => None,
    }
}
