//! Anti-forgery tokens for the REST authentication context.
//!
//! A nonce is bound to an action and a browsing session. It is valid for one tick
//! (half the lifetime) as `Fresh` and for the tick after that as `Aging`.

use chrono::{DateTime, Utc};
use rand::{rngs::OsRng, TryRngCore};
use sha2::{Digest, Sha256};
use std::{sync::Arc, time::Duration};

pub use rand::rand_core::OsError;

const NONCE_LEN: usize = 10;
const SECRET_LEN: usize = 32;
const SESSION_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceAge {
    Fresh,
    Aging,
}

#[derive(Clone)]
pub struct NonceIssuer {
    secret: Arc<[u8]>,
    lifetime: Duration,
}

impl NonceIssuer {
    pub fn new(secret: impl AsRef<[u8]>, lifetime: Duration) -> Self {
        Self {
            secret: Arc::from(secret.as_ref()),
            lifetime,
        }
    }

    /// Issuer keyed by a random secret that only lives as long as this process.
    pub fn ephemeral(lifetime: Duration) -> Result<Self, OsError> {
        let mut secret = [0u8; SECRET_LEN];
        OsRng.try_fill_bytes(&mut secret)?;
        Ok(Self::new(secret, lifetime))
    }

    pub fn create(&self, action: &str, session: &str) -> String {
        self.create_at(action, session, Utc::now())
    }

    pub fn create_at(&self, action: &str, session: &str, now: DateTime<Utc>) -> String {
        self.token(self.tick(now), action, session)
    }

    pub fn verify(&self, nonce: &str, action: &str, session: &str) -> Option<NonceAge> {
        self.verify_at(nonce, action, session, Utc::now())
    }

    pub fn verify_at(
        &self,
        nonce: &str,
        action: &str,
        session: &str,
        now: DateTime<Utc>,
    ) -> Option<NonceAge> {
        if nonce.len() != NONCE_LEN {
            return None;
        }

        let tick = self.tick(now);
        if constant_time_eq(nonce, &self.token(tick, action, session)) {
            Some(NonceAge::Fresh)
        } else if constant_time_eq(nonce, &self.token(tick - 1, action, session)) {
            Some(NonceAge::Aging)
        } else {
            None
        }
    }

    fn tick(&self, now: DateTime<Utc>) -> i64 {
        let half = (self.lifetime.as_secs() / 2).max(1) as i64;
        (now.timestamp() + half - 1).div_euclid(half)
    }

    fn token(&self, tick: i64, action: &str, session: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.secret);
        hasher.update(format!("{tick}|{action}|{session}").as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        digest[..NONCE_LEN].to_string()
    }
}

/// Fresh random session identifier, hex encoded.
pub fn new_session_id() -> Result<String, OsError> {
    let mut bytes = [0u8; SESSION_LEN];
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(bytes.iter().map(|byte| format!("{byte:02x}")).collect())
}

/// Whether `value` looks like an id produced by [`new_session_id`].
pub fn is_session_id(value: &str) -> bool {
    value.len() == SESSION_LEN * 2 && value.bytes().all(|b| b.is_ascii_hexdigit())
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a
            .bytes()
            .zip(b.bytes())
            .fold(0u8, |acc, (x, y)| acc | (x ^ y))
            == 0
}
