use axum::{extract::State, response::IntoResponse};
use tracing::info;

use super::session::AuthSession;
use crate::{errors::AppError, responses::JsonResponse, state::AppState};

pub async fn handle_logout(
    State(app_state): State<AppState>,
    AuthSession(user): AuthSession,
) -> Result<impl IntoResponse, AppError> {
    app_state.users.set_token(user.id, None).await?;
    info!(user_id = %user.id, "user logged out");
    Ok(JsonResponse::success("Logout successful"))
}
