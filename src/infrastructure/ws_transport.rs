// WebSocket implementation of the live feed transport
use crate::application::feed_transport::{FeedTransport, FrameStream, TransportError};
use async_trait::async_trait;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    url: String,
}

impl WebSocketTransport {
    pub fn new(url: String) -> Self {
        Self { url }
    }
}

#[async_trait]
impl FeedTransport for WebSocketTransport {
    async fn open(&self) -> Result<Box<dyn FrameStream>, TransportError> {
        tracing::info!(url = %self.url, "connecting to live feed");
        let (ws_stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| TransportError::Connect {
                url: self.url.clone(),
                reason: e.to_string(),
            })?;

        Ok(Box::new(WebSocketFrames { stream: ws_stream }))
    }
}

struct WebSocketFrames {
    stream: WsStream,
}

/// What one WebSocket message means for the feed
#[derive(Debug, PartialEq)]
enum Decoded {
    Frame(String),
    Closed,
    Skip,
}

/// Text frames pass through; binary frames are accepted when they are UTF-8.
fn decode(message: Message) -> Decoded {
    match message {
        Message::Text(text) => Decoded::Frame(text),
        Message::Binary(data) => match String::from_utf8(data) {
            Ok(text) => Decoded::Frame(text),
            Err(_) => {
                tracing::warn!("ignoring non-UTF-8 binary frame");
                Decoded::Skip
            }
        },
        Message::Close(frame) => {
            let reason = frame.map(|f| f.reason.to_string()).unwrap_or_default();
            tracing::info!(reason = %reason, "received close frame");
            Decoded::Closed
        }
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => Decoded::Skip,
    }
}

#[async_trait]
impl FrameStream for WebSocketFrames {
    async fn next_frame(&mut self) -> Result<Option<String>, TransportError> {
        while let Some(message) = self.stream.next().await {
            match decode(message.map_err(|e| TransportError::Stream(e.to_string()))?) {
                Decoded::Frame(text) => return Ok(Some(text)),
                Decoded::Closed => return Ok(None),
                Decoded::Skip => {}
            }
        }
        Ok(None)
    }
}
