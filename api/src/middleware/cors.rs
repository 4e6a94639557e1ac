//! CORS middleware configuration
//!
//! Browser clients carry the refresh token in a credentialed cookie, so
//! origins must be listed explicitly; a wildcard origin cannot be combined
//! with `allow_credentials`.

use actix_cors::Cors;
use actix_web::http::{header, Method};
use tracing::info;

use ch_shared::config::CorsConfig;

/// Create a CORS middleware instance from configuration
pub fn create_cors(config: &CorsConfig) -> Cors {
    info!(origins = ?config.allowed_origins, "configuring CORS");

    let mut cors = Cors::default()
        .allowed_methods(
            config
                .allowed_methods
                .iter()
                .filter_map(|m| m.parse::<Method>().ok())
                .collect::<Vec<_>>(),
        )
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ])
        // Scripts must be able to read the quota headers on a 429.
        .expose_headers(vec![
            header::RETRY_AFTER.as_str(),
            "x-ratelimit-limit",
            "x-ratelimit-remaining",
            "x-ratelimit-reset",
        ])
        .max_age(config.max_age);

    for origin in &config.allowed_origins {
        cors = cors.allowed_origin(origin);
    }

    if config.allow_credentials {
        cors = cors.supports_credentials();
    }

    cors
}
