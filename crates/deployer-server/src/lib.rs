pub mod error;
pub mod legacy;
pub mod pass;
pub mod reconcile;
pub mod retry;
pub mod routes;
pub mod state;

#[cfg(test)]
mod testing;

use axum::routing::get;
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use pass::PassRunner;
pub use state::AppState;

/// The front door with its middleware stack.
pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(routes::root::get_root))
        .route("/health", get(routes::health::get_health))
        .route(
            "/deployments",
            get(routes::deployments::list_deployments)
                .post(routes::deployments::create_deployment)
                .delete(routes::deployments::delete_deployment),
        )
        .route(
            "/deployments/{id}",
            get(routes::deployments::get_deployment),
        )
        .route("/plan", get(routes::plan::get_plan))
        .layer(CatchPanicLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(app_state: AppState, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve_on(app_state, listener).await
}

/// Serve on a listener the caller already bound, until Ctrl-C.
pub async fn serve_on(
    app_state: AppState,
    listener: tokio::net::TcpListener,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    let app = build_router(app_state);

    tracing::info!("deployer listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("shutting down");
    }
}
