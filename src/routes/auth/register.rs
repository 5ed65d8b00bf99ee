use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    errors::AppError,
    models::user::{NewUser, RegisterPayload, UserRole},
    state::AppState,
    utils::password::hash_password,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub is_superuser: bool,
    pub role: UserRole,
}

/// Creates a superuser account and sends the welcome email.
pub async fn handle_register(
    State(app_state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let name = payload.name.trim();
    let email = payload.email.trim().to_lowercase();
    if name.is_empty() || email.is_empty() || payload.password.is_empty() {
        return Err(AppError::Validation(
            "Name, email and password are required".into(),
        ));
    }

    if app_state.users.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("Email already exists.".into()));
    }

    let password_hash = hash_password(&payload.password).map_err(|e| {
        error!(?e, "password hashing failed");
        AppError::Internal("password hashing failed".into())
    })?;

    let user = app_state
        .users
        .create_user(NewUser {
            name: name.to_string(),
            email,
            password_hash,
            is_superuser: true,
            role: UserRole::SuperUser,
        })
        .await?;
    info!(user_id = %user.id, "superuser registered");

    if let Err(err) = app_state
        .mailer
        .send_welcome_email(&user.email, &user.name)
        .await
    {
        warn!(user_id = %user.id, ?err, "welcome email could not be sent");
    }

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: user.id,
            email: user.email,
            name: user.name,
            is_superuser: user.is_superuser,
            role: user.role,
        }),
    ))
}
