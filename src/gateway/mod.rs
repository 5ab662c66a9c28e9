pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::user_auth::jwt_auth_middleware;
use state::AppState;

/// Build the complete router: public routes, JWT-protected routes and docs
pub fn build_router(state: Arc<AppState>) -> Router {
    // ==========================================================================
    // Public Routes (no auth required)
    // ==========================================================================
    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/register", post(crate::user_auth::handlers::register))
        .route("/login", post(crate::user_auth::handlers::login));

    // ==========================================================================
    // Private Routes - Protected by JWT
    // ==========================================================================
    let private_routes = Router::new()
        .route(
            "/accounts",
            post(handlers::create_account).get(handlers::list_accounts),
        )
        .route("/accounts/{id}", get(handlers::get_account))
        .route("/accounts/{id}/deposit", post(handlers::deposit))
        .route("/accounts/{id}/withdraw", post(handlers::withdraw))
        .route(
            "/accounts/{id}/transactions",
            get(handlers::get_transactions),
        )
        .route("/transfer", post(handlers::create_transfer))
        .route(
            "/cards",
            post(handlers::issue_card).get(handlers::list_cards),
        )
        .route("/rates/key", get(handlers::get_key_rate))
        .layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(private_routes)
        .with_state(state)
        // OpenAPI / Swagger UI (stateless, added after with_state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
}

/// Start HTTP Gateway server; returns on Ctrl-C
pub async fn run_server(host: &str, port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = build_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to bind to {}: {} (port {} may already be in use)",
            addr,
            e,
            port
        )
    })?;

    tracing::info!("Gateway listening on http://{}", addr);
    tracing::info!("API Docs: http://{}/docs", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl-C handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
