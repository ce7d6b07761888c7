//! # Server Configuration
//!
//! This module contains the router, OpenAPI document and serve loop for the user service.

use std::sync::Arc;

use anyhow::Context;
use axum::{Router, middleware, routing::get};
use sea_orm::DatabaseConnection;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::handlers::{self, users};
use crate::repositories::SeaOrmUserStore;
use crate::service::UserService;
use crate::telemetry::trace_context_middleware;
use crate::tenancy::tenant_middleware;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub service: UserService,
}

impl AppState {
    /// Wires the SeaORM-backed store into a [`UserService`] using the configured operation timeout.
    pub fn new(config: Arc<AppConfig>, db: DatabaseConnection) -> Self {
        let store = SeaOrmUserStore::new(Arc::new(db.clone()));
        let service = UserService::new(Arc::new(store), config.operation_timeout());
        Self {
            config,
            db,
            service,
        }
    }
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let user_routes = Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/search", get(users::search_users))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route_layer(middleware::from_fn(tenant_middleware));

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
        .nest("/api/v1", user_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(trace_context_middleware)),
        )
}

/// Starts the server with the given configuration and serves until Ctrl-C or SIGTERM
pub async fn run_server(config: AppConfig, db: DatabaseConnection) -> anyhow::Result<()> {
    let addr = config.bind_addr().context("Invalid server address")?;
    let profile = config.profile.clone();

    let state = AppState::new(Arc::new(config), db);
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(%addr, %profile, "User service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("User service stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!(%error, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::health,
        crate::handlers::ready,
        crate::handlers::users::create_user,
        crate::handlers::users::list_users,
        crate::handlers::users::search_users,
        crate::handlers::users::get_user,
        crate::handlers::users::update_user,
        crate::handlers::users::delete_user,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::handlers::HealthResponse,
            crate::handlers::users::CreateUserRequestDto,
            crate::handlers::users::UpdateUserRequestDto,
            crate::handlers::users::UserResponse,
            crate::handlers::users::UserEnvelope,
            crate::handlers::users::UserListResponse,
            crate::handlers::users::UserListEnvelope,
            crate::handlers::users::MessageResponse,
            crate::error::ApiError,
        )
    ),
    tags(
        (name = "users", description = "Tenant-scoped user management"),
        (name = "health", description = "Liveness and readiness probes"),
    ),
    info(
        title = "User Service API",
        description = "Multi-tenant user identity and membership service",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
