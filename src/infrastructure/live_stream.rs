// Server-sent event streaming of live feed payloads
use crate::application::connector::TelemetryConnector;
use crate::domain::payload::LivePayload;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Payloads buffered per client before new ones are dropped for it
const CLIENT_BUFFER: usize = 256;

/// Subscribe a new client to the live feed, one event per raw payload.
pub fn subscribe_client(
    connector: &TelemetryConnector,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + use<>> {
    let events = client_payloads(connector)
        .map(|data| Ok::<_, Infallible>(Event::default().data(data)));
    Sse::new(events).keep_alive(KeepAlive::default())
}

/// Raw payload text for one client. The subscription lives exactly as long as
/// the returned stream, so a disconnecting client unsubscribes itself.
fn client_payloads(connector: &TelemetryConnector) -> impl Stream<Item = String> + use<> {
    let (tx, mut rx) = mpsc::channel::<serde_json::Value>(CLIENT_BUFFER);

    let subscription = connector.subscribe(Arc::new(
        move |payload: &LivePayload| -> anyhow::Result<()> {
            tx.try_send(payload.raw.clone())
                .map_err(|e| anyhow::anyhow!("live client cannot keep up: {}", e))
        },
    ));

    async_stream::stream! {
        let _subscription = subscription;
        while let Some(raw) = rx.recv().await {
            yield raw.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::connector::DEFAULT_RECONNECT_DELAY;
    use crate::application::feed_transport::{FeedTransport, FrameStream, TransportError};
    use crate::application::history_store::HistoryStore;
    use crate::application::ingest::FrameHandler;
    use crate::application::subscribers::SubscriberRegistry;
    use async_trait::async_trait;
    use serde_json::Value;

    /// Never finishes opening, so the feed only moves when a test pushes frames
    struct StalledTransport;

    #[async_trait]
    impl FeedTransport for StalledTransport {
        async fn open(&self) -> Result<Box<dyn FrameStream>, TransportError> {
            std::future::pending().await
        }
    }

    fn connector() -> (TelemetryConnector, FrameHandler) {
        let registry = SubscriberRegistry::new();
        let handler = FrameHandler::new(HistoryStore::default(), registry.clone());
        let connector = TelemetryConnector::new(
            Arc::new(StalledTransport),
            handler.clone(),
            registry,
            DEFAULT_RECONNECT_DELAY,
        );
        (connector, handler)
    }

    #[tokio::test]
    async fn test_client_is_one_subscriber_for_its_lifetime() {
        let (connector, _handler) = connector();

        let sse = subscribe_client(&connector);
        assert_eq!(connector.status().subscribers, 1);

        drop(sse);
        assert_eq!(connector.status().subscribers, 0);
    }

    #[tokio::test]
    async fn test_client_receives_raw_payload() {
        let (connector, handler) = connector();
        let mut payloads = Box::pin(client_payloads(&connector));

        let frame = r#"{"kpi_data":{"spc":900,"tsr":"n/a"},"log_entry":null}"#;
        handler.handle_frame(frame, 1).unwrap();

        let data = payloads.next().await.unwrap();
        let sent: Value = serde_json::from_str(frame).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&data).unwrap(), sent);

        drop(payloads);
        assert_eq!(connector.status().subscribers, 0);
    }

    #[tokio::test]
    async fn test_full_client_buffer_only_fails_that_client() {
        let (connector, handler) = connector();
        let _slow = client_payloads(&connector);
        let _other = connector.subscribe(Arc::new(|_: &LivePayload| -> anyhow::Result<()> { Ok(()) }));

        for t in 0..CLIENT_BUFFER as i64 {
            let outcome = handler.handle_frame(r#"{"kpi_data":{"spc":1}}"#, t).unwrap();
            assert_eq!(outcome.delivery.failed, 0);
        }

        let outcome = handler.handle_frame(r#"{"kpi_data":{"spc":2}}"#, 999).unwrap();
        assert_eq!(outcome.delivery.delivered, 1);
        assert_eq!(outcome.delivery.failed, 1);
        assert_eq!(connector.status().subscribers, 2);
    }
}
