//! HTTP transport configuration and the shared client factory.

use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tokio::sync::OnceCell;

/// Default on-disk response cache capacity advertised to the transport, in bytes.
pub const DEFAULT_CACHE_MAX_SIZE: u64 = 10 * 1024 * 1024;

/// Transport configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Read timeout.
    pub read_timeout: Duration,
    /// Write timeout.
    pub write_timeout: Duration,
    /// User agent string.
    pub user_agent: String,
    /// Capacity of the transport-owned response cache.
    pub cache_max_size: u64,
    /// Enable gzip decompression.
    pub gzip: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(10),
            user_agent: format!("fetchling/{}", env!("CARGO_PKG_VERSION")),
            cache_max_size: DEFAULT_CACHE_MAX_SIZE,
            gzip: true,
        }
    }
}

/// Build a configured reqwest client.
///
/// reqwest exposes a single post-connect deadline, so the read and write
/// timeouts are combined into the total request timeout.
pub fn build_client(config: &HttpConfig) -> Result<Client, HttpError> {
    let mut builder = ClientBuilder::new()
        .connect_timeout(config.connect_timeout)
        .timeout(config.read_timeout + config.write_timeout)
        .user_agent(&config.user_agent);

    if config.gzip {
        builder = builder.gzip(true);
    }

    builder.build().map_err(HttpError::ClientBuild)
}

/// HTTP errors.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("no cached data available")]
    NoCachedData,

    #[error("transport failure: {0}")]
    Transport(#[source] reqwest::Error),

    /// Never delivered to listeners; cancellation suppresses delivery.
    /// Exposed so callers composing their own results can name the case.
    #[error("request cancelled")]
    Cancelled,
}

/// Lazily constructs the one shared transport client.
///
/// The first caller of [`TransportFactory::client`] builds the client; every
/// later caller observes the same instance. Pass one factory (usually inside
/// an `Arc`) to every dispatcher that should share connections and cache.
#[derive(Debug)]
pub struct TransportFactory {
    config: HttpConfig,
    client: OnceCell<Client>,
}

impl TransportFactory {
    /// Create a factory with the given config.
    pub fn new(config: HttpConfig) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    /// The config this factory builds with.
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Get the shared client, constructing it on first use.
    pub async fn client(&self) -> Result<&Client, HttpError> {
        self.client
            .get_or_try_init(|| async {
                tracing::debug!(
                    cache_max_size = self.config.cache_max_size,
                    "initializing shared HTTP client"
                );
                build_client(&self.config)
            })
            .await
    }
}

impl Default for TransportFactory {
    fn default() -> Self {
        Self::new(HttpConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_config() {
        let config = HttpConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.read_timeout, Duration::from_secs(10));
        assert_eq!(config.write_timeout, Duration::from_secs(10));
        assert_eq!(config.cache_max_size, 10 * 1024 * 1024);
        assert!(config.user_agent.starts_with("fetchling/"));
        assert!(config.gzip);
    }

    #[test]
    fn test_build_client() {
        let client = build_client(&HttpConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_build_client_custom_config() {
        let config = HttpConfig {
            connect_timeout: Duration::from_secs(1),
            read_timeout: Duration::from_secs(2),
            write_timeout: Duration::from_secs(2),
            user_agent: "test-agent".to_string(),
            cache_max_size: 1024,
            gzip: false,
        };
        assert!(build_client(&config).is_ok());
    }

    #[test]
    fn test_factory_returns_same_client() {
        let factory = TransportFactory::default();
        let first = tokio_test::block_on(factory.client()).expect("first init");
        let second = tokio_test::block_on(factory.client()).expect("second lookup");
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn test_error_display() {
        let err = HttpError::Status {
            status: 500,
            body: "boom".to_string(),
        };
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("boom"));

        assert_eq!(HttpError::NoCachedData.to_string(), "no cached data available");
        assert_eq!(HttpError::Cancelled.to_string(), "request cancelled");
    }
}
