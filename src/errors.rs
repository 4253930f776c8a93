use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};

/// Error returned by the REST layer, rendered as `{"code", "message", "data": {"status"}}`.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub param: Option<String>,
}

impl AppError {
    pub fn invalid_param(param: impl Into<String>) -> Self {
        let param = param.into();
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "rest_invalid_param",
            message: format!("Invalid parameter(s): {param}"),
            param: Some(param),
        }
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "rest_invalid_json",
            message: format!("Invalid JSON body passed. {}", message.into()),
            param: None,
        }
    }

    pub fn forbidden_nonce() -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            code: "rest_cookie_invalid_nonce",
            message: "Cookie check failed".to_string(),
            param: None,
        }
    }

    pub fn forbidden() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            code: "rest_forbidden",
            message: "Sorry, you are not allowed to do that.".to_string(),
            param: None,
        }
    }

    pub fn counter_overflow(key: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "es6demo_counter_overflow",
            message: format!("Option {key} cannot be incremented any further."),
            param: None,
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal_error",
            message: err.to_string(),
            param: None,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut data = Map::new();
        data.insert("status".to_string(), json!(self.status.as_u16()));
        if let Some(param) = self.param {
            let mut params = Map::new();
            params.insert(param.clone(), json!(format!("Invalid parameter(s): {param}")));
            data.insert("params".to_string(), Value::Object(params));
        }

        let body = json!({
            "code": self.code,
            "message": self.message,
            "data": data,
        });
        (self.status, Json(body)).into_response()
    }
}
