//! NATS connection management.

use serde::Serialize;
use tracing::info;

use crate::codec::encode;
use crate::error::NetError;

/// Default NATS server URL.
pub const DEFAULT_NATS_URL: &str = "nats://localhost:4222";

/// Environment variable that overrides the NATS URL.
pub const NATS_URL_ENV: &str = "NATS_URL";

/// A thin wrapper around an `async-nats` client.
#[derive(Debug, Clone)]
pub struct NatsConnection {
    client: async_nats::Client,
}

impl NatsConnection {
    /// Connect using `NATS_URL`, falling back to [`DEFAULT_NATS_URL`].
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Connect`] if the connection cannot be established.
    pub async fn connect() -> Result<Self, NetError> {
        let url = std::env::var(NATS_URL_ENV).unwrap_or_else(|_| DEFAULT_NATS_URL.to_string());
        Self::connect_to(&url).await
    }

    /// # Errors
    ///
    /// Returns [`NetError::Connect`] if the connection cannot be established.
    pub async fn connect_to(url: &str) -> Result<Self, NetError> {
        info!(url, "connecting to NATS");
        let client = async_nats::connect(url).await?;
        info!("NATS connection established");
        Ok(Self { client })
    }

    /// The underlying NATS client.
    #[must_use]
    pub fn client(&self) -> &async_nats::Client {
        &self.client
    }

    /// Publish a MessagePack-encoded value to `subject`.
    ///
    /// # Errors
    ///
    /// Returns [`NetError`] if encoding or publishing fails.
    pub async fn publish<T: Serialize>(&self, subject: &str, value: &T) -> Result<(), NetError> {
        let payload = encode(value)?;
        self.client
            .publish(subject.to_string(), payload.into())
            .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`NetError::Subscribe`] if the subscription fails.
    pub async fn subscribe(&self, subject: &str) -> Result<async_nats::Subscriber, NetError> {
        Ok(self.client.subscribe(subject.to_string()).await?)
    }
}
