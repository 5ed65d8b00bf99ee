use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    response::IntoResponse,
};
use library_backend::{
    config::Config,
    db::{
        postgres_book_repository::PostgresBookRepository,
        postgres_member_repository::PostgresMemberRepository,
        postgres_plan_repository::PostgresPlanRepository,
        postgres_subscription_repository::PostgresSubscriptionRepository,
        postgres_user_repository::PostgresUserRepository,
    },
    responses::JsonResponse,
    routes::{app_routes, user_routes},
    services::{
        file_store::LocalFileStore,
        smtp_mailer::SmtpMailer,
        stripe::LiveStripeService,
        subscriptions::{CheckoutUrls, PlanManager, SubscriptionLifecycle},
    },
    state::AppState,
};
use sqlx::{postgres::PgPoolOptions, PgPool};
#[cfg(not(feature = "tls"))]
use tokio::net::TcpListener;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[cfg(feature = "tls")]
use axum_server::tls_rustls::RustlsConfig;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env().context("invalid configuration")?;

    let pg_pool = establish_connection(&config).await?;
    sqlx::migrate!("./migrations")
        .run(&pg_pool)
        .await
        .context("failed to run database migrations")?;

    let users = Arc::new(PostgresUserRepository {
        pool: pg_pool.clone(),
    });
    let plans = Arc::new(PostgresPlanRepository {
        pool: pg_pool.clone(),
    });
    let instances = Arc::new(PostgresSubscriptionRepository {
        pool: pg_pool.clone(),
    });
    let books = Arc::new(PostgresBookRepository {
        pool: pg_pool.clone(),
    });
    let members = Arc::new(PostgresMemberRepository {
        pool: pg_pool.clone(),
    });

    let stripe = Arc::new(LiveStripeService::from_settings(&config.stripe));
    let mailer =
        Arc::new(SmtpMailer::from_settings(&config.smtp).context("failed to initialize mailer")?);

    let plan_manager = Arc::new(PlanManager::new(
        plans.clone(),
        stripe.clone(),
        config.stripe.currency.clone(),
    ));
    let lifecycle = Arc::new(SubscriptionLifecycle::new(
        users.clone(),
        plans,
        instances,
        stripe.clone(),
        CheckoutUrls {
            success_url: config.stripe.success_url.clone(),
            cancel_url: config.stripe.cancel_url.clone(),
        },
    ));

    let state = AppState {
        users,
        books,
        members,
        mailer,
        stripe,
        file_store: Arc::new(LocalFileStore::new(&config.upload_dir)),
        plan_manager,
        lifecycle,
        auth: Arc::new(config.auth.clone()),
    };

    let auth_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(config.rate_limit.auth_per_second)
            .burst_size(config.rate_limit.auth_burst)
            .use_headers()
            .finish()
            .context("rate limiter settings must be non-zero")?,
    );

    let governor_limiter = auth_governor_conf.limiter().clone();
    std::thread::spawn(move || {
        let interval = std::time::Duration::from_secs(60);
        loop {
            std::thread::sleep(interval);
            governor_limiter.retain_recent();
        }
    });

    let user = user_routes().layer(GovernorLayer::new(auth_governor_conf).error_handler(
        |_err| {
            JsonResponse::too_many_requests(
                "Too many requests. Please wait a moment and try again.",
            )
            .into_response()
        },
    ));

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .frontend_origin
                .parse::<HeaderValue>()
                .context("FRONTEND_ORIGIN is not a valid header value")?,
        )
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    let app = app_routes(user, config.upload_max_bytes)
        .with_state(state)
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    let addr = config.bind_addr;

    #[cfg(feature = "tls")]
    {
        let cert = std::env::var("TLS_CERT_PATH").context("TLS_CERT_PATH must be set")?;
        let key = std::env::var("TLS_KEY_PATH").context("TLS_KEY_PATH must be set")?;
        let tls_config = RustlsConfig::from_pem_file(cert, key)
            .await
            .context("failed to load TLS certificates")?;

        info!(%addr, "listening with TLS");
        axum_server::bind_rustls(addr, tls_config)
            .serve(make_service)
            .await?;
    }

    #[cfg(not(feature = "tls"))]
    {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        info!(%addr, "listening");
        axum::serve(listener, make_service).await?;
    }

    Ok(())
}

/// Opens the pool and verifies the connection.
async fn establish_connection(config: &Config) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .acquire_timeout(config.request_timeout)
        .connect(&config.database_url)
        .await
        .context("failed to connect to the database")?;

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .context("failed to verify database connection")?;

    info!("connected to the database");
    Ok(pool)
}
