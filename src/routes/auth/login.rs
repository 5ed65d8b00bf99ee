use axum::{
    extract::{FromRequest, Request, State},
    http::header::CONTENT_TYPE,
    Form, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use super::claims::Claims;
use crate::{
    config::AuthSettings,
    errors::AppError,
    models::user::{User, UserRole},
    state::AppState,
    utils::{
        jwt::{create_jwt, decode_jwt},
        password::verify_password,
    },
};

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginPayload {
    #[serde(alias = "Email")]
    pub email: String,
    #[serde(alias = "Password")]
    pub password: String,
}

/// Login credentials read from either a JSON or a urlencoded form body.
pub struct LoginInput(pub LoginPayload);

impl<S> FromRequest<S> for LoginInput
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        let payload = if is_form {
            Form::<LoginPayload>::from_request(req, state)
                .await
                .map(|Form(p)| p)
                .map_err(|_| AppError::Validation("Invalid request".into()))?
        } else {
            Json::<LoginPayload>::from_request(req, state)
                .await
                .map(|Json(p)| p)
                .map_err(|_| AppError::Validation("Invalid request".into()))?
        };
        Ok(LoginInput(payload))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub is_superuser: bool,
    pub role: UserRole,
    pub token: String,
}

pub(crate) fn claims_for(user: &User, auth: &AuthSettings) -> Claims {
    let now = Utc::now();
    let ttl = chrono::Duration::seconds(auth.token_ttl.as_secs() as i64);
    Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        role: user.role,
        iat: now.timestamp() as usize,
        exp: (now + ttl).timestamp() as usize,
        iss: auth.issuer.clone(),
        aud: auth.audience.clone(),
    }
}

/// Returns the stored token while it still verifies, otherwise issues and
/// stores a fresh one.
async fn current_or_new_token(state: &AppState, user: &User) -> Result<String, AppError> {
    let auth = &state.auth;
    if let Some(existing) = user.token.as_deref() {
        if decode_jwt(existing, &auth.keys, &auth.issuer, &auth.audience).is_ok() {
            return Ok(existing.to_string());
        }
    }

    let token = create_jwt(claims_for(user, auth), &auth.keys, &auth.issuer, &auth.audience)
        .map_err(|e| {
            error!(?e, user_id = %user.id, "token generation failed");
            AppError::Internal("token generation failed".into())
        })?;
    state.users.set_token(user.id, Some(&token)).await?;
    Ok(token)
}

pub async fn handle_login(
    State(app_state): State<AppState>,
    LoginInput(payload): LoginInput,
) -> Result<Json<LoginResponse>, AppError> {
    let invalid = || AppError::Validation("Invalid username or password".into());

    let user = app_state
        .users
        .find_user_by_email(payload.email.trim())
        .await?
        .ok_or_else(invalid)?;

    let matches = verify_password(&payload.password, &user.password_hash).map_err(|e| {
        error!(?e, user_id = %user.id, "stored password hash is unreadable");
        invalid()
    })?;
    if !matches {
        return Err(invalid());
    }

    let token = current_or_new_token(&app_state, &user).await?;
    info!(user_id = %user.id, "user logged in");

    Ok(Json(LoginResponse {
        id: user.id,
        email: user.email,
        name: user.name,
        is_superuser: user.is_superuser,
        role: user.role,
        token,
    }))
}
