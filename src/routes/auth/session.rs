use axum::{extract::FromRequestParts, http::request::Parts, RequestPartsExt};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use tracing::debug;
use uuid::Uuid;

use crate::{errors::AppError, models::user::User, state::AppState, utils::jwt::decode_jwt};

/// The authenticated caller. The bearer token must verify and must also be
/// the token currently stored on the user row, so logging out revokes it.
#[derive(Debug, Clone)]
pub struct AuthSession(pub User);

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::Authentication("Authorization header is required".into()))?;
        let token = bearer.token();

        let data = decode_jwt(token, &state.auth.keys, &state.auth.issuer, &state.auth.audience)
            .map_err(|err| {
                debug!(?err, "rejected bearer token");
                AppError::Authentication("Invalid token".into())
            })?;
        let user_id = Uuid::parse_str(&data.claims.sub)
            .map_err(|_| AppError::Authentication("Invalid token".into()))?;

        let user = state
            .users
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid token".into()))?;
        if user.token.as_deref() != Some(token) {
            return Err(AppError::Authentication("Token has been revoked".into()));
        }

        Ok(AuthSession(user))
    }
}
