//! Process-wide `ApiClient`.
//!
//! Hosts that want one shared client call `init` at startup and `client`
//! everywhere else. `reconstruct` rebuilds it after a login or logout so
//! the new token is picked up and the old session cookies are dropped.

use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use tracing::info;

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::token::TokenStore;

struct Installed {
    config: ClientConfig,
    client: Arc<ApiClient>,
}

static GLOBAL: OnceLock<RwLock<Option<Installed>>> = OnceLock::new();

fn slot() -> &'static RwLock<Option<Installed>> {
    GLOBAL.get_or_init(|| RwLock::new(None))
}

/// Construct the shared client. Fails if one is already installed.
pub fn init(config: ClientConfig, store: &dyn TokenStore) -> Result<Arc<ApiClient>, ApiError> {
    let mut slot = slot().write().unwrap_or_else(PoisonError::into_inner);
    if slot.is_some() {
        return Err(ApiError::AlreadyInitialized);
    }
    let client = Arc::new(ApiClient::connect(&config, store));
    *slot = Some(Installed {
        config,
        client: client.clone(),
    });
    Ok(client)
}

pub fn client() -> Result<Arc<ApiClient>, ApiError> {
    slot()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
        .map(|installed| installed.client.clone())
        .ok_or(ApiError::NotInitialized)
}

/// Replace the shared client with a fresh one built from the same
/// configuration and the token currently in `store`. Holders of the old
/// `Arc` keep using it until they call `client` again.
pub fn reconstruct(store: &dyn TokenStore) -> Result<Arc<ApiClient>, ApiError> {
    let mut slot = slot().write().unwrap_or_else(PoisonError::into_inner);
    let installed = slot.as_mut().ok_or(ApiError::NotInitialized)?;
    installed.client = Arc::new(ApiClient::connect(&installed.config, store));
    info!("shared API client rebuilt");
    Ok(installed.client.clone())
}

/// Drop the shared client. Returns whether one was installed.
pub fn shutdown() -> bool {
    slot()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .take()
        .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::MemoryTokenStore;

    // One test drives the whole lifecycle because the slot is process-wide.
    #[test]
    fn lifecycle() {
        shutdown();
        assert_eq!(client().unwrap_err(), ApiError::NotInitialized);
        assert_eq!(
            reconstruct(&MemoryTokenStore::default()).unwrap_err(),
            ApiError::NotInitialized
        );

        let config = ClientConfig::new("http://127.0.0.1:9", true).unwrap();
        let store = MemoryTokenStore::new(None);
        let first = init(config.clone(), &store).unwrap();
        assert!(!first.has_token());
        assert!(Arc::ptr_eq(&first, &client().unwrap()));
        assert_eq!(init(config, &store).unwrap_err(), ApiError::AlreadyInitialized);

        store.set("fresh");
        let rebuilt = reconstruct(&store).unwrap();
        assert!(rebuilt.has_token());
        assert!(!first.has_token());
        assert!(Arc::ptr_eq(&rebuilt, &client().unwrap()));
        assert_eq!(rebuilt.base_url(), "http://127.0.0.1:9");

        assert!(shutdown());
        assert!(!shutdown());
        assert_eq!(client().unwrap_err(), ApiError::NotInitialized);
    }
}
