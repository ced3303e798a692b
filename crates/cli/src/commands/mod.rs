pub mod admin;
pub mod content;

use angeli_site::config::StoreConfig;
use angeli_site::store::{KvStore, StoreError};

/// Open the store named by the environment.
///
/// # Errors
///
/// Returns an error if the Upstash client cannot be built.
pub fn open_store() -> Result<KvStore, StoreError> {
    dotenvy::dotenv().ok();

    let config = StoreConfig::from_env();
    if config.is_none() {
        tracing::warn!("KV_REST_API_URL not set, changes will only live in memory");
    }
    KvStore::from_config(config.as_ref())
}
