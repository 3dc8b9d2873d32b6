use std::time::Duration;

use super::mistral::MISTRAL_HOST;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct MistralProviderConfig {
    pub host: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl MistralProviderConfig {
    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self {
            host: MISTRAL_HOST.to_string(),
            api_key: api_key.into(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
