use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use tracing::{error, info};
use uuid::Uuid;

use super::auth::session::AuthSession;
use crate::{
    errors::AppError,
    models::{
        member::{Member, MemberChanges, MemberKind, MemberRegister, NewMember},
        user::NewUser,
    },
    responses::JsonResponse,
    state::AppState,
    utils::password::hash_password,
};

/// Routes shared by `/students` and `/managers`; `kind` picks the table and
/// the role given to newly registered accounts.
pub fn member_routes(kind: MemberKind) -> Router<AppState> {
    Router::new()
        .route("/", post(register_member).get(list_members))
        .route(
            "/{id}",
            get(get_member)
                .put(replace_member)
                .patch(patch_member)
                .delete(delete_member),
        )
        .layer(Extension(kind))
}

fn not_found(kind: MemberKind) -> AppError {
    AppError::NotFound(format!("{} not found", kind.label()))
}

async fn fetch_member(
    app_state: &AppState,
    kind: MemberKind,
    member_id: Uuid,
) -> Result<Member, AppError> {
    app_state
        .members
        .find_member_by_id(kind, member_id)
        .await?
        .ok_or_else(|| not_found(kind))
}

/// Public sign-up: creates the login account and the profile that hangs off it.
pub async fn register_member(
    State(app_state): State<AppState>,
    Extension(kind): Extension<MemberKind>,
    Json(payload): Json<MemberRegister>,
) -> Result<(StatusCode, Json<Member>), AppError> {
    let first_name = payload.first_name.trim().to_string();
    let last_name = payload.last_name.trim().to_string();
    let email = payload.email.trim().to_lowercase();
    let member_code = payload.member_code.trim().to_string();
    if first_name.is_empty() || email.is_empty() || payload.password.is_empty() {
        return Err(AppError::Validation(
            "first_name, email and password are required".into(),
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
            name: format!("{} {}", first_name, last_name).trim().to_string(),
            email: email.clone(),
            password_hash,
            is_superuser: false,
            role: kind.role(),
        })
        .await?;

    let member = match app_state
        .members
        .insert_member(
            kind,
            NewMember {
                system_user_id: user.id,
                first_name,
                last_name,
                email,
                member_code,
            },
        )
        .await
    {
        Ok(member) => member,
        Err(err) => {
            // Without the profile the account is unusable; drop it.
            if let Err(cleanup) = app_state.users.delete_user(user.id).await {
                error!(user_id = %user.id, ?cleanup, "failed to remove account after profile insert failed");
            }
            return Err(err.into());
        }
    };

    info!(member_id = %member.id, user_id = %user.id, kind = kind.label(), "member registered");
    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn list_members(
    State(app_state): State<AppState>,
    Extension(kind): Extension<MemberKind>,
    AuthSession(_user): AuthSession,
) -> Result<Json<Vec<Member>>, AppError> {
    Ok(Json(app_state.members.list_members(kind).await?))
}

pub async fn get_member(
    State(app_state): State<AppState>,
    Extension(kind): Extension<MemberKind>,
    AuthSession(_user): AuthSession,
    Path(member_id): Path<Uuid>,
) -> Result<Json<Member>, AppError> {
    Ok(Json(fetch_member(&app_state, kind, member_id).await?))
}

/// PUT replaces every profile field, so all of them must be supplied.
pub async fn replace_member(
    State(app_state): State<AppState>,
    Extension(kind): Extension<MemberKind>,
    AuthSession(_user): AuthSession,
    Path(member_id): Path<Uuid>,
    Json(payload): Json<MemberChanges>,
) -> Result<Json<Member>, AppError> {
    let changes = payload.without_blanks();
    if changes.first_name.is_none()
        || changes.last_name.is_none()
        || changes.email.is_none()
        || changes.member_code.is_none()
    {
        return Err(AppError::Validation(
            "first_name, last_name, email and member code are required".into(),
        ));
    }

    app_state
        .members
        .update_member(kind, member_id, &changes)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(kind))
}

pub async fn patch_member(
    State(app_state): State<AppState>,
    Extension(kind): Extension<MemberKind>,
    AuthSession(_user): AuthSession,
    Path(member_id): Path<Uuid>,
    Json(payload): Json<MemberChanges>,
) -> Result<Json<Member>, AppError> {
    let changes = payload.without_blanks();
    if changes == MemberChanges::default() {
        return Ok(Json(fetch_member(&app_state, kind, member_id).await?));
    }

    app_state
        .members
        .update_member(kind, member_id, &changes)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(kind))
}

/// Removes the profile. The login account is left in place.
pub async fn delete_member(
    State(app_state): State<AppState>,
    Extension(kind): Extension<MemberKind>,
    AuthSession(_user): AuthSession,
    Path(member_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if !app_state.members.delete_member(kind, member_id).await? {
        return Err(not_found(kind));
    }
    info!(%member_id, kind = kind.label(), "member deleted");
    Ok(JsonResponse::success(&format!("{} deleted", kind.label())))
}
