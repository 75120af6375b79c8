use std::time::Duration;

pub mod http;
pub mod memory;

pub use http::HttpGateway;
pub use memory::{InMemoryGateway, Operation};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl GatewayConfig {
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

pub mod prelude {
    pub use super::{GatewayConfig, HttpGateway, InMemoryGateway, Operation};
    pub use wk_core::{Error, Gateway, Result};
}
