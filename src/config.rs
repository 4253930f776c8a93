use crate::nonce::{NonceIssuer, OsError};
use std::{env, path::PathBuf, time::Duration};
use tracing::warn;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_NONCE_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Server settings read from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_path: PathBuf,
    pub public_url: Option<String>,
    pub nonce_secret: Option<String>,
    pub nonce_lifetime: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = lookup("PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let data_path = lookup("APP_DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data/options.json"));

        let nonce_lifetime = match lookup("APP_NONCE_LIFETIME_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    warn!("ignoring invalid APP_NONCE_LIFETIME_SECS value {raw:?}");
                    DEFAULT_NONCE_LIFETIME
                }
            },
            None => DEFAULT_NONCE_LIFETIME,
        };

        Self {
            port,
            data_path,
            public_url: lookup("APP_PUBLIC_URL").filter(|url| !url.trim().is_empty()),
            nonce_secret: lookup("APP_NONCE_SECRET").filter(|secret| !secret.is_empty()),
            nonce_lifetime,
        }
    }

    /// Issuer keyed by `APP_NONCE_SECRET`, or by a random per-process secret.
    pub fn nonce_issuer(&self) -> Result<NonceIssuer, OsError> {
        match &self.nonce_secret {
            Some(secret) => Ok(NonceIssuer::new(secret, self.nonce_lifetime)),
            None => NonceIssuer::ephemeral(self.nonce_lifetime),
        }
    }

    /// Base URL the client should call; falls back to loopback on the bound port.
    pub fn public_base(&self, bound_port: u16) -> String {
        self.public_url
            .clone()
            .unwrap_or_else(|| format!("http://127.0.0.1:{bound_port}"))
    }
}
