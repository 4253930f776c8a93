use crate::nonce::NonceIssuer;
use crate::storage::OptionStore;
use std::sync::Arc;

pub struct AppState<S> {
    pub options: Arc<S>,
    pub nonces: NonceIssuer,
    pub rest_url: String,
}

impl<S: OptionStore> AppState<S> {
    pub fn new(options: S, nonces: NonceIssuer, rest_url: impl Into<String>) -> Self {
        Self {
            options: Arc::new(options),
            nonces,
            rest_url: rest_url.into(),
        }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            options: Arc::clone(&self.options),
            nonces: self.nonces.clone(),
            rest_url: self.rest_url.clone(),
        }
    }
}
