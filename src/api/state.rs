//! Application state for the Care Billing API.
//!
//! This module defines the shared application state that is available
//! to all request handlers.

use std::sync::Arc;

use crate::config::ConfigLoader;

/// Shared application state.
///
/// Holds the tariff configuration loaded at startup. It is read-only, so
/// handlers share it without locking.
#[derive(Clone)]
pub struct AppState {
    /// The loaded tariff configuration.
    config: Arc<ConfigLoader>,
}

impl AppState {
    /// Creates a new application state with the given configuration loader.
    pub fn new(config: ConfigLoader) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Returns a reference to the configuration loader.
    pub fn config(&self) -> &ConfigLoader {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_shares_configuration() {
        let state = AppState::new(ConfigLoader::load("./config/berlin_lk").unwrap());
        let cloned = state.clone();
        assert!(std::ptr::eq(state.config(), cloned.config()));
        assert_eq!(cloned.config().metadata().code, "BERLIN-LK");
    }
}
