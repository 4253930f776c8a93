use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Option key holding the counter.
pub const SUM_OPTION: &str = "es6demo_sum";

/// Header carrying the anti-forgery token.
pub const NONCE_HEADER: &str = "X-WP-Nonce";

/// Cookie naming the browsing session a nonce is bound to.
pub const SESSION_COOKIE: &str = "es6demo_session";

/// Nonce action scoped to the REST authentication context.
pub const REST_NONCE_ACTION: &str = "wp_rest";

pub const FAILED_MESSAGE: &str = "something went wrong ...";

/// Everything the option store persists, keyed by option name.
pub type OptionMap = BTreeMap<String, i64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvelopeData {
    Count(i64),
    Message(String),
}

impl fmt::Display for EnvelopeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(value) => write!(f, "{value}"),
            Self::Message(message) => f.write_str(message),
        }
    }
}

/// Body returned by the increment route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncrementResponse {
    pub response: Outcome,
    pub data: EnvelopeData,
}

impl IncrementResponse {
    pub fn success(value: i64) -> Self {
        Self {
            response: Outcome::Success,
            data: EnvelopeData::Count(value),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            response: Outcome::Failed,
            data: EnvelopeData::Message(message.into()),
        }
    }
}

/// Configuration injected into the page for the client script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub nonce: String,
    #[serde(rename = "restURL")]
    pub rest_url: String,
}
