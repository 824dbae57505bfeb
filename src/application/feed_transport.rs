// Transport trait for the live telemetry feed
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },
    #[error("live feed connection failed: {0}")]
    Stream(String),
}

#[async_trait]
pub trait FeedTransport: Send + Sync {
    /// Open one connection to the feed
    async fn open(&self) -> Result<Box<dyn FrameStream>, TransportError>;
}

#[async_trait]
pub trait FrameStream: Send {
    /// Next text frame. `Ok(None)` means the peer closed the connection.
    async fn next_frame(&mut self) -> Result<Option<String>, TransportError>;
}
