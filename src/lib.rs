pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub token_key: [u8; 32],
    pub token_ttl_hours: u64,
    pub mapbox_token: Option<String>,
    pub aggregation_timeout: Duration,
}
