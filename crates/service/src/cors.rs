use axum::http::Method;
use tower_http::cors::{self, CorsLayer};

use crate::config::settings;

pub fn cors_layer() -> CorsLayer {
    let configured_origins = settings().application.cors.allowed_origins();

    CorsLayer::new()
        .allow_methods(vec![Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_origin(allowed_origins(configured_origins))
}

fn allowed_origins(configured_origins: &[String]) -> cors::AllowOrigin {
    if configured_origins == ["*"] {
        cors::AllowOrigin::any()
    } else {
        cors::AllowOrigin::list(configured_origins.iter().map(|o| o.parse().unwrap()))
    }
}
