//! Request extractors that run before the increment handler: nonce
//! authentication and `sum` parameter validation.

use crate::errors::AppError;
use crate::models::{NONCE_HEADER, REST_NONCE_ACTION, SESSION_COOKIE};
use crate::nonce::{is_session_id, NonceAge};
use crate::state::AppState;
use crate::storage::OptionStore;
use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::{header, request::Parts, HeaderMap},
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::warn;

static NUMERIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[ \t\n\r\x0B\x0C]*[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?[ \t\n\r\x0B\x0C]*$")
        .expect("numeric pattern is valid")
});

/// Who is calling, as far as the nonce header can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthContext {
    Anonymous,
    Nonce(NonceAge),
}

impl AuthContext {
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Nonce(_))
    }
}

#[async_trait]
impl<S: OptionStore> FromRequestParts<AppState<S>> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(NONCE_HEADER) else {
            return Ok(Self::Anonymous);
        };

        let nonce = value.to_str().map_err(|_| AppError::forbidden_nonce())?;
        let session = session_cookie(&parts.headers).unwrap_or_default();
        match state.nonces.verify(nonce, REST_NONCE_ACTION, session) {
            Some(age) => Ok(Self::Nonce(age)),
            None => {
                warn!("rejecting request with invalid nonce");
                Err(AppError::forbidden_nonce())
            }
        }
    }
}

/// Session id from the request's cookies, if it carries a well-formed one.
pub fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
        .filter(|value| is_session_id(value))
}

/// Validated parameters of the increment route.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IncrementParams {
    pub sum: Option<f64>,
}

impl IncrementParams {
    /// Query and body parameters merged, body taking precedence. A `null` sum is absent.
    pub fn from_params(params: &Map<String, Value>) -> Result<Self, AppError> {
        let sum = match params.get("sum") {
            None | Some(Value::Null) => None,
            Some(value) => Some(numeric_value(value).ok_or_else(|| AppError::invalid_param("sum"))?),
        };
        Ok(Self { sum })
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequest<S> for IncrementParams {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut params = Map::new();
        if let Ok(Query(query)) = Query::<HashMap<String, String>>::try_from_uri(req.uri()) {
            params.extend(query.into_iter().map(|(key, value)| (key, Value::String(value))));
        }

        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_ascii_lowercase().starts_with("application/json"))
            .unwrap_or(false);

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|err| AppError::invalid_json(err.body_text()))?;

        if is_json && !body.is_empty() {
            let value: Value = serde_json::from_slice(&body)
                .map_err(|err| AppError::invalid_json(err.to_string()))?;
            if let Value::Object(map) = value {
                params.extend(map);
            }
        }

        Self::from_params(&params)
    }
}

pub fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => parse_numeric(raw),
        _ => None,
    }
}

/// Decimal or float literal with optional sign, exponent and surrounding whitespace.
/// Hex, `inf` and `nan` are not numeric.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    if !NUMERIC.is_match(raw) {
        return None;
    }
    raw.trim_matches([' ', '\t', '\n', '\r', '\x0B', '\x0C'])
        .parse()
        .ok()
}
