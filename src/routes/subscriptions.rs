use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use super::auth::session::AuthSession;
use crate::{
    errors::AppError,
    models::{
        subscription::{
            CreatePlanRequest, SubscribeRequest, SubscriptionInstance, SubscriptionPlan,
            UpdatePlanRequest,
        },
        user::User,
    },
    responses::JsonResponse,
    state::AppState,
};

fn require_plan_admin(user: &User) -> Result<(), AppError> {
    if user.role.can_manage_plans() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only superusers and managers can manage subscription plans".into(),
        ))
    }
}

pub async fn create_plan(
    State(app_state): State<AppState>,
    AuthSession(user): AuthSession,
    Json(payload): Json<CreatePlanRequest>,
) -> Result<(StatusCode, Json<SubscriptionPlan>), AppError> {
    require_plan_admin(&user)?;
    let plan = app_state.plan_manager.create_plan(payload).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

pub async fn list_plans(
    State(app_state): State<AppState>,
    AuthSession(_user): AuthSession,
) -> Result<Json<Vec<SubscriptionPlan>>, AppError> {
    Ok(Json(app_state.plan_manager.list_plans().await?))
}

pub async fn get_plan(
    State(app_state): State<AppState>,
    AuthSession(_user): AuthSession,
    Path(plan_id): Path<Uuid>,
) -> Result<Json<SubscriptionPlan>, AppError> {
    Ok(Json(app_state.plan_manager.get_plan(plan_id).await?))
}

pub async fn update_plan(
    State(app_state): State<AppState>,
    AuthSession(user): AuthSession,
    Path(plan_id): Path<Uuid>,
    Json(payload): Json<UpdatePlanRequest>,
) -> Result<Json<SubscriptionPlan>, AppError> {
    require_plan_admin(&user)?;
    Ok(Json(
        app_state.plan_manager.update_plan(plan_id, payload).await?,
    ))
}

pub async fn delete_plan(
    State(app_state): State<AppState>,
    AuthSession(user): AuthSession,
    Path(plan_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_plan_admin(&user)?;
    app_state.plan_manager.delete_plan(plan_id).await?;
    Ok(JsonResponse::success("Subscription plan deleted"))
}

/// Starts a checkout for the calling student. The returned instance carries
/// the checkout link the client should redirect to.
pub async fn subscribe(
    State(app_state): State<AppState>,
    AuthSession(user): AuthSession,
    Json(payload): Json<SubscribeRequest>,
) -> Result<(StatusCode, Json<SubscriptionInstance>), AppError> {
    let instance = app_state.lifecycle.subscribe(&user, payload.plan_id).await?;
    Ok((StatusCode::CREATED, Json(instance)))
}
