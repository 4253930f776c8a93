use crate::errors::AppError;
use crate::models::OptionMap;
use std::{
    future::Future,
    path::{Path, PathBuf},
};
use tokio::{fs, sync::Mutex};
use tracing::{debug, error};

/// Named integer options. Reads and writes are separate calls; there is no
/// read-modify-write primitive, so concurrent writers resolve last-write-wins.
pub trait OptionStore: Send + Sync + 'static {
    fn get_option(
        &self,
        key: &str,
        default: i64,
    ) -> impl Future<Output = Result<i64, AppError>> + Send;

    fn update_option(
        &self,
        key: &str,
        value: i64,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Options kept in memory and written through to a JSON file.
pub struct FileOptionStore {
    path: PathBuf,
    options: Mutex<OptionMap>,
}

impl FileOptionStore {
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let options = load_options(&path).await;
        Self {
            path,
            options: Mutex::new(options),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OptionStore for FileOptionStore {
    async fn get_option(&self, key: &str, default: i64) -> Result<i64, AppError> {
        let options = self.options.lock().await;
        Ok(options.get(key).copied().unwrap_or(default))
    }

    async fn update_option(&self, key: &str, value: i64) -> Result<(), AppError> {
        let mut options = self.options.lock().await;
        options.insert(key.to_string(), value);
        persist_options(&self.path, &options).await?;
        debug!(key, value, path = %self.path.display(), "option persisted");
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryOptionStore {
    options: Mutex<OptionMap>,
}

impl MemoryOptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_option(key: impl Into<String>, value: i64) -> Self {
        let mut options = OptionMap::new();
        options.insert(key.into(), value);
        Self {
            options: Mutex::new(options),
        }
    }
}

impl OptionStore for MemoryOptionStore {
    async fn get_option(&self, key: &str, default: i64) -> Result<i64, AppError> {
        Ok(self.options.lock().await.get(key).copied().unwrap_or(default))
    }

    async fn update_option(&self, key: &str, value: i64) -> Result<(), AppError> {
        self.options.lock().await.insert(key.to_string(), value);
        Ok(())
    }
}

pub async fn load_options(path: &Path) -> OptionMap {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(options) => options,
            Err(err) => {
                error!("failed to parse options file: {err}");
                OptionMap::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => OptionMap::default(),
        Err(err) => {
            error!("failed to read options file: {err}");
            OptionMap::default()
        }
    }
}

pub async fn persist_options(path: &Path, options: &OptionMap) -> Result<(), AppError> {
    let payload = serde_json::to_vec_pretty(options).map_err(AppError::internal)?;
    fs::write(path, payload).await.map_err(AppError::internal)?;
    Ok(())
}
