use crate::handlers;
use crate::state::AppState;
use crate::storage::OptionStore;
use axum::{routing::{get, post}, Router};

pub const REST_NAMESPACE: &str = "es6-wp-rest-demo/v1";
pub const REST_BASE: &str = "increment";

pub const SCRIPT_PATH: &str = "/assets/es6-wp-rest-demo.js";
pub const STYLESHEET_PATH: &str = "/assets/es6-wp-rest-demo.css";

/// Path of the increment route, relative to the server root.
pub fn rest_route() -> String {
    format!("/wp-json/{REST_NAMESPACE}/{REST_BASE}")
}

/// Absolute URL of the increment route under `base`.
pub fn rest_url(base: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), rest_route())
}

pub fn router<S: OptionStore>(state: AppState<S>) -> Router {
    Router::new()
        .route("/", get(handlers::index::<S>))
        .route(SCRIPT_PATH, get(handlers::script))
        .route(STYLESHEET_PATH, get(handlers::stylesheet))
        .route(&rest_route(), post(handlers::increment::<S>))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rest_url_joins_without_double_slash() {
        assert_eq!(
            rest_url("http://127.0.0.1:8080/"),
            "http://127.0.0.1:8080/wp-json/es6-wp-rest-demo/v1/increment"
        );
        assert_eq!(
            rest_url("https://example.test/blog"),
            "https://example.test/blog/wp-json/es6-wp-rest-demo/v1/increment"
        );
    }
}
