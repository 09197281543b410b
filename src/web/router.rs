//! Web application router and middleware setup.

use crate::error::Result;
use crate::web::config::WebConfig;
use crate::web::{handlers, websocket, AppState};
use axum::{routing::get, Router};
use std::path::PathBuf;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::{info, warn};

/// Create the axum application with all routes and middleware.
pub fn create_app(config: &WebConfig, state: AppState) -> Result<Router> {
    let mut app = Router::new()
        .route("/api/latest", get(handlers::get_latest))
        .route("/api/channels", get(handlers::get_channels))
        .route("/api/history/:channel", get(handlers::get_history))
        .route("/api/health", get(handlers::health_check))
        .route("/ws", get(websocket::websocket_handler));

    let custom_index = config
        .static_path
        .as_ref()
        .map(PathBuf::from)
        .filter(|path| {
            let exists = path.join("index.html").exists();
            if !exists {
                warn!("No index.html in {:?}, serving built-in dashboard", path);
            }
            exists
        });

    match custom_index {
        Some(static_path) => {
            info!("Serving dashboard from {:?}", static_path);
            app = app
                .nest_service("/static", ServeDir::new(&static_path))
                .route_service("/", ServeFile::new(static_path.join("index.html")));
        }
        None => {
            app = app.route("/", get(handlers::default_index));
        }
    }

    let mut app = app.with_state(state);

    if config.enable_cors {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    Ok(app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http())))
}
