//! Plan management and the per-user subscription state machine.

pub mod lifecycle;
pub mod plans;
pub mod transitions;

pub use lifecycle::{CheckoutUrls, EventOutcome, SubscriptionLifecycle, CORRELATION_KEY};
pub use plans::PlanManager;
pub use transitions::{transition, Signal};
