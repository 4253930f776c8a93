pub mod app;
pub mod client;
pub mod config;
pub mod errors;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod nonce;
pub mod state;
pub mod storage;
pub mod ui;

pub use app::{rest_url, router};
pub use client::{ClickOutcome, CounterWidget};
pub use config::Config;
pub use state::AppState;
pub use storage::{FileOptionStore, MemoryOptionStore, OptionStore};
