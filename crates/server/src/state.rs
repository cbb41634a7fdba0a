//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::TrackerConfig;
use crate::db::OrderStore;
use crate::services::{TokenSigner, TrackingService};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the order store, the token verifier and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: TrackerConfig,
    tracking: TrackingService,
    tokens: TokenSigner,
}

impl AppState {
    /// Create a new application state over an order store.
    #[must_use]
    pub fn new(config: TrackerConfig, store: Arc<dyn OrderStore>) -> Self {
        let tracking = TrackingService::new(store, config.transition_policy, config.pricing);
        let tokens = TokenSigner::new(config.token_secret.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                tracking,
                tokens,
            }),
        }
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &TrackerConfig {
        &self.inner.config
    }

    /// Get a reference to the tracking service.
    #[must_use]
    pub fn tracking(&self) -> &TrackingService {
        &self.inner.tracking
    }

    /// Get a reference to the access token signer.
    #[must_use]
    pub fn tokens(&self) -> &TokenSigner {
        &self.inner.tokens
    }
}
