// =============================================================================
// Central Application State
// =============================================================================
//
// Shared by every request handler via `Arc<AppState>`.  Nothing in here
// carries per-request data: the credential store opens a connection per
// call, the session map locks only for the duration of a lookup, and the
// market data source is stateless.
// =============================================================================

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::credential_store::CredentialStore;
use crate::market_data::MarketDataSource;
use crate::runtime_config::RuntimeConfig;
use crate::session::SessionStore;

pub struct AppState {
    pub config: RuntimeConfig,
    pub credentials: CredentialStore,
    pub sessions: SessionStore,
    pub market_data: Arc<dyn MarketDataSource>,
    /// Instant when the server was started. Used for uptime reporting.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: RuntimeConfig, market_data: Arc<dyn MarketDataSource>) -> Self {
        let credentials = CredentialStore::new(config.db_path.clone());
        let sessions = SessionStore::new(Duration::from_secs(config.session_ttl_secs));
        Self {
            config,
            credentials,
            sessions,
            market_data,
            start_time: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
