//! mecar-api - Host bridge HTTP surface
//!
//! Exposes the registered vehicle accessories over HTTP so a host can read
//! their characteristics and forward external writes to the set handlers.
//!
//! # Usage
//!
//! ```ignore
//! use mecar_api::{create_router, AppState};
//!
//! let state = AppState::single(vehicle.accessory().clone());
//! let router = create_router(state);
//! axum::serve(listener, router).await?;
//! ```

pub mod error;
pub mod handlers;
pub mod state;

pub use error::HttpError;
pub use state::AppState;

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the bridge router with the given application state
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(|| async { "OK" }))
        // Accessory routes
        .route("/accessories", get(handlers::accessories::list_accessories))
        .route(
            "/accessories/{accessory_id}",
            get(handlers::accessories::get_accessory),
        )
        // Characteristic routes
        .route(
            "/accessories/{accessory_id}/services/{service}/characteristics/{characteristic}",
            get(handlers::characteristics::read_characteristic)
                .put(handlers::characteristics::write_characteristic),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
