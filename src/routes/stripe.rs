use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, info, warn};

use crate::{
    errors::AppError,
    services::{stripe::StripeServiceError, subscriptions::EventOutcome},
    state::AppState,
};

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

fn received() -> Response {
    Json(json!({ "received": true })).into_response()
}

/// Stripe webhook. The signature is checked over the raw body before anything
/// is read from it. Once the event is authentic and well formed the reply is
/// always an acknowledgement; processing failures are only logged.
pub async fn webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(sig) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
    else {
        warn!("stripe webhook without signature header");
        return AppError::Authentication("Missing Stripe-Signature".into()).into_response();
    };

    let event = match app_state.stripe.verify_webhook(&body, sig) {
        Ok(event) => event,
        Err(StripeServiceError::Serde(msg)) => {
            warn!(%msg, "stripe webhook payload is malformed");
            return AppError::Validation("Malformed webhook payload".into()).into_response();
        }
        Err(err) => {
            warn!(?err, "stripe webhook verification failed");
            return AppError::Authentication("Invalid webhook signature".into()).into_response();
        }
    };

    match app_state.lifecycle.handle_event(&event).await {
        Ok(EventOutcome::Applied(instance)) => {
            info!(
                event_id = %event.id,
                event_type = %event.r#type,
                instance_id = %instance.id,
                status = instance.status.as_str(),
                "stripe event applied"
            );
            received()
        }
        Ok(EventOutcome::Skipped { reason }) => {
            info!(event_id = %event.id, event_type = %event.r#type, reason, "stripe event skipped");
            received()
        }
        Ok(EventOutcome::Ignored) => received(),
        Err(AppError::Validation(msg)) => {
            warn!(event_id = %event.id, event_type = %event.r#type, %msg, "stripe event rejected");
            AppError::Validation(msg).into_response()
        }
        Err(err) => {
            error!(event_id = %event.id, event_type = %event.r#type, ?err, "stripe event processing failed");
            received()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::SIGNATURE_HEADER;
    use crate::{
        db::mock_db::MockDb,
        models::subscription::{
            NewInstance, PaymentStatus, RecurrenceKind, SubscriptionStatus,
        },
        db::subscription_repository::SubscriptionRepository,
        routes::build_router,
        services::{
            smtp_mailer::MockMailer, stripe::MockStripeService, subscriptions::CORRELATION_KEY,
        },
        test_support::{plan_fixture, test_state, user_fixture},
        models::user::UserRole,
    };

    fn app(db: Arc<MockDb>, dir: &std::path::Path) -> Router {
        build_router(test_state(
            db,
            MockStripeService::new(),
            Arc::new(MockMailer::default()),
            dir,
        ))
    }

    async fn pending_instance(db: &MockDb) -> Uuid {
        let user = user_fixture(UserRole::Student);
        let plan = plan_fixture(RecurrenceKind::Monthly);
        db.seed_user(user.clone());
        db.seed_plan(plan.clone());
        db.insert_instance(NewInstance {
            system_user_id: user.id,
            plan_id: plan.id,
            price_id: plan.price_id,
        })
        .await
        .unwrap()
        .id
    }

    fn completed_body(instance: Uuid) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": { "object": {
                "status": "complete",
                "payment_status": "paid",
                "subscription": "sub_1",
                "metadata": { CORRELATION_KEY: instance.to_string() }
            }}
        }))
        .unwrap()
    }

    fn post(body: Vec<u8>, signature: Option<String>) -> Request<Body> {
        let mut builder = Request::post("/webhook").header("Content-Type", "application/json");
        if let Some(sig) = signature {
            builder = builder.header(SIGNATURE_HEADER, sig);
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[tokio::test]
    async fn signed_completion_marks_instance_subscribed() {
        let db = Arc::new(MockDb::default());
        let dir = tempfile::tempdir().unwrap();
        let id = pending_instance(&db).await;
        let body = completed_body(id);
        let sig = MockStripeService::sign(&body);

        let res = app(db.clone(), dir.path())
            .oneshot(post(body, Some(sig)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["received"], true);

        let stored = db.instance(id).unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Subscribed);
        assert_eq!(stored.payment_status, PaymentStatus::Paid);
        assert_eq!(stored.stripe_sub_id.as_deref(), Some("sub_1"));
    }

    #[tokio::test]
    async fn missing_or_bad_signature_is_unauthorized_and_mutates_nothing() {
        let db = Arc::new(MockDb::default());
        let dir = tempfile::tempdir().unwrap();
        let id = pending_instance(&db).await;
        let app = app(db.clone(), dir.path());
        let before = db.instance(id).unwrap();

        let res = app.clone().oneshot(post(completed_body(id), None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let forged = MockStripeService::sign(b"some other payload");
        let res = app
            .oneshot(post(completed_body(id), Some(forged)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        assert_eq!(db.instance(id).unwrap(), before);
    }

    #[tokio::test]
    async fn missing_correlation_id_is_a_bad_request() {
        let db = Arc::new(MockDb::default());
        let dir = tempfile::tempdir().unwrap();
        let body = serde_json::to_vec(&json!({
            "id": "evt_2",
            "type": "checkout.session.completed",
            "data": { "object": { "status": "complete", "payment_status": "paid" } }
        }))
        .unwrap();
        let sig = MockStripeService::sign(&body);

        let res = app(db, dir.path()).oneshot(post(body, Some(sig))).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn processing_failures_are_still_acknowledged() {
        let db = Arc::new(MockDb {
            should_fail: true,
            ..Default::default()
        });
        let dir = tempfile::tempdir().unwrap();
        let body = completed_body(Uuid::new_v4());
        let sig = MockStripeService::sign(&body);

        let res = app(db, dir.path()).oneshot(post(body, Some(sig))).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unrelated_events_are_acknowledged() {
        let db = Arc::new(MockDb::default());
        let dir = tempfile::tempdir().unwrap();
        let body = serde_json::to_vec(&json!({
            "id": "evt_3",
            "type": "customer.created",
            "data": { "object": {} }
        }))
        .unwrap();
        let sig = MockStripeService::sign(&body);

        let res = app(db, dir.path()).oneshot(post(body, Some(sig))).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
