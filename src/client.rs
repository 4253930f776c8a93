//! Client side of the increment exchange.
//!
//! [`CounterWidget`] plays the part of the page script: it binds to the fragment's
//! button and output element, posts `{ "sum": ... }` with the injected nonce, and copies
//! the returned value back into both elements. Failures are logged and otherwise ignored.

use crate::models::{ClientConfig, NONCE_HEADER};
use crate::ui::CONFIG_GLOBAL;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{error, info};

static CONFIG_SCRIPT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?s)const\s+{CONFIG_GLOBAL}\s*=\s*(\{{.*?\}});"))
        .expect("config pattern is valid")
});

static OUTPUT_ELEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<[a-zA-Z]+[^>]*\bid="es6-demo-output"[^>]*>([^<]*)<"#)
        .expect("output pattern is valid")
});

static TRIGGER_ELEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<[a-zA-Z]+[^>]*\bid="es6-demo-input"[^>]*>"#).expect("trigger pattern is valid")
});

static DATA_SUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\bdata-sum="([^"]*)""#).expect("data-sum pattern is valid"));

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("page does not define pluginES6WPREST")]
    MissingConfig,

    #[error("invalid client configuration: {0}")]
    InvalidConfig(#[from] serde_json::Error),
}

/// HTTP client that keeps cookies, so requests carry the session the page's nonce was
/// issued for.
pub fn session_client() -> Result<reqwest::Client, ClientError> {
    Ok(reqwest::Client::builder().cookie_store(true).build()?)
}

impl ClientConfig {
    /// Reads the configuration a page injected for its script.
    pub fn from_page(html: &str) -> Result<Self, ClientError> {
        let captures = CONFIG_SCRIPT
            .captures(html)
            .ok_or(ClientError::MissingConfig)?;
        Ok(serde_json::from_str(&captures[1])?)
    }
}

/// What the page shows: the trigger's `data-sum` and the output element's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetState {
    pub sum: String,
    pub output: String,
}

impl WidgetState {
    /// Locates both elements in `html`. `None` when either one is missing.
    pub fn from_fragment(html: &str) -> Option<Self> {
        let output = OUTPUT_ELEMENT.captures(html)?[1].trim().to_string();
        let trigger = TRIGGER_ELEMENT.find(html)?;
        let sum = DATA_SUM
            .captures(trigger.as_str())
            .map(|captures| captures[1].to_string())
            .unwrap_or_default();
        Some(Self { sum, output })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    /// Server answered `success`; the value now shown.
    Applied(String),
    /// Server answered with anything else.
    Rejected(Value),
    /// Transport or decoding failure.
    Failed(String),
}

pub struct CounterWidget {
    config: ClientConfig,
    http: reqwest::Client,
    state: Arc<Mutex<WidgetState>>,
}

impl CounterWidget {
    pub fn new(config: ClientConfig, http: reqwest::Client, state: WidgetState) -> Self {
        Self {
            config,
            http,
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Binds to a rendered page. `Ok(None)` when the page lacks the button or output.
    pub fn bind(html: &str, http: reqwest::Client) -> Result<Option<Self>, ClientError> {
        let Some(state) = WidgetState::from_fragment(html) else {
            return Ok(None);
        };
        let config = ClientConfig::from_page(html)?;
        Ok(Some(Self::new(config, http, state)))
    }

    /// Fetches `page_url` and binds to it. `http` should keep cookies (see
    /// [`session_client`]) or the server will refuse the page's nonce.
    pub async fn load(http: reqwest::Client, page_url: &str) -> Result<Option<Self>, ClientError> {
        let html = http
            .get(page_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Self::bind(&html, http)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn snapshot(&self) -> WidgetState {
        self.lock().clone()
    }

    /// One press of the button. Overlapping presses each send their own request and
    /// apply their result whenever it arrives.
    pub async fn click(&self) -> ClickOutcome {
        let sum = self.lock().sum.clone();
        match self.send(&sum).await {
            Ok(body) => self.reconcile(body),
            Err(err) => {
                error!(error = %err, "increment request failed");
                ClickOutcome::Failed(err.to_string())
            }
        }
    }

    /// Applies a decoded response body to the widget.
    pub fn reconcile(&self, body: Value) -> ClickOutcome {
        if body.get("response").and_then(Value::as_str) != Some("success") {
            error!(response = %body, "increment not applied");
            return ClickOutcome::Rejected(body);
        }

        let value = match body.get("data") {
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };

        let mut state = self.lock();
        state.sum = value.clone();
        state.output = value.clone();
        info!(response = %body, "counter updated");
        ClickOutcome::Applied(value)
    }

    async fn send(&self, sum: &str) -> Result<Value, ClientError> {
        let response = self
            .http
            .post(&self.config.rest_url)
            .header(NONCE_HEADER, &self.config.nonce)
            .json(&json!({ "sum": sum }))
            .send()
            .await?;
        Ok(response.json().await?)
    }

    fn lock(&self) -> MutexGuard<'_, WidgetState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
