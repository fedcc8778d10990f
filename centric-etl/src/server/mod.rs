// Server module - HTTP control surface setup and routing
pub mod handlers;
pub mod state;

use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::errors::ServiceError;
pub use self::state::AppState;

/// Create the Axum application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health_check))
        .route("/health", get(handlers::health_check))
        .route("/etl/all", post(handlers::etl_all))
        .route("/etl/extract", post(handlers::etl_extract))
        .route("/etl/transform", post(handlers::etl_transform))
        .route("/etl/load", post(handlers::etl_load))
        .route("/jobs", get(handlers::jobs_status))
        .route("/jobs/activate", post(handlers::jobs_activate))
        .route("/jobs/deactivate", post(handlers::jobs_deactivate))
        .layer(create_cors_layer())
        .with_state(state)
}

pub fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// Run the server on the specified address until `shutdown` resolves
pub async fn run_server(
    app: Router,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServiceError> {
    info!("Server listening on {}", addr);
    info!("- Health endpoint: http://{}/health", addr);
    info!("- Run endpoints: http://{}/etl/{{all,extract,transform,load}}", addr);
    info!("- Schedule endpoints: http://{}/jobs", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
