use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

/// Envelope used for every message-style reply (errors, acknowledgements).
#[derive(Serialize, Deserialize)]
pub struct JsonResponse {
    pub status: String,
    pub success: bool,
    pub message: String,
    pub code: Option<String>,
}

impl JsonResponse {
    fn build(status: StatusCode, msg: &str) -> (StatusCode, Json<JsonResponse>) {
        let success = status.is_success();
        (
            status,
            Json(JsonResponse {
                status: if success { "success" } else { "error" }.to_string(),
                success,
                message: msg.to_string(),
                code: None,
            }),
        )
    }

    pub fn success(msg: &str) -> impl IntoResponse {
        Self::build(StatusCode::OK, msg)
    }

    pub fn not_found(msg: &str) -> impl IntoResponse {
        Self::build(StatusCode::NOT_FOUND, msg)
    }

    pub fn conflict(msg: &str) -> impl IntoResponse {
        Self::build(StatusCode::CONFLICT, msg)
    }

    pub fn server_error(msg: &str) -> impl IntoResponse {
        Self::build(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    pub fn unauthorized(msg: &str) -> impl IntoResponse {
        Self::build(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn bad_request(msg: &str) -> impl IntoResponse {
        Self::build(StatusCode::BAD_REQUEST, msg)
    }

    pub fn too_many_requests(msg: &str) -> impl IntoResponse {
        Self::build(StatusCode::TOO_MANY_REQUESTS, msg)
    }

    pub fn forbidden(msg: &str) -> impl IntoResponse {
        Self::build(StatusCode::FORBIDDEN, msg)
    }
}
