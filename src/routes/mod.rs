pub mod auth;
pub mod books;
pub mod members;
pub mod stripe;
pub mod subscriptions;

use axum::{
    extract::DefaultBodyLimit,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};

use crate::{
    config::DEFAULT_UPLOAD_MAX_BYTES, models::member::MemberKind, responses::JsonResponse,
    state::AppState,
};

/// Login, logout and superuser registration. Kept separate so the binary can
/// put a rate limiter in front of it.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::handle_register))
        .route("/login", post(auth::handle_login))
        .route("/logout", post(auth::handle_logout))
}

/// Every route of the service, with `user` mounted under `/user`. Book
/// uploads accept bodies up to `upload_max_bytes`.
pub fn app_routes(user: Router<AppState>, upload_max_bytes: usize) -> Router<AppState> {
    let book_routes = Router::new()
        .route("/", post(books::create_book).get(books::list_books))
        .route(
            "/{id}",
            get(books::get_book)
                .put(books::replace_book)
                .patch(books::patch_book)
                .delete(books::delete_book),
        )
        .layer(DefaultBodyLimit::max(upload_max_bytes));

    let subscription_routes = Router::new()
        .route(
            "/",
            post(subscriptions::create_plan).get(subscriptions::list_plans),
        )
        .route(
            "/{id}",
            get(subscriptions::get_plan)
                .put(subscriptions::update_plan)
                .delete(subscriptions::delete_plan),
        )
        .route("/student/subscribe", post(subscriptions::subscribe));

    Router::new()
        .route("/", get(root))
        .route("/webhook", post(stripe::webhook))
        .nest("/user", user)
        .nest("/students", members::member_routes(MemberKind::Student))
        .nest("/managers", members::member_routes(MemberKind::Manager))
        .nest("/books", book_routes)
        .nest("/subscriptions", subscription_routes)
}

/// The full application without transport layers (rate limiting, CORS,
/// tracing, timeouts), which `main` adds.
pub fn build_router(state: AppState) -> Router {
    app_routes(user_routes(), DEFAULT_UPLOAD_MAX_BYTES).with_state(state)
}

/// Health check.
async fn root() -> Response {
    JsonResponse::success("Library API is running").into_response()
}
