// Telemetry connector - One supervised connection to the live feed
use crate::application::feed_transport::{FeedTransport, FrameStream};
use crate::application::ingest::FrameHandler;
use crate::application::subscribers::{Subscriber, SubscriberRegistry, Subscription};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Reconnecting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub attempts: u64,
    pub subscribers: usize,
    /// Deliveries that errored or panicked since startup
    pub failed_deliveries: u64,
}

struct ConnectorInner {
    transport: Arc<dyn FeedTransport>,
    handler: FrameHandler,
    registry: SubscriberRegistry,
    reconnect_delay: Duration,
    state: Mutex<ConnectionState>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
    attempts: AtomicU64,
    failed_deliveries: AtomicU64,
}

/// Owns the single logical connection to the feed. The connection is run by
/// one supervisor task, which reconnects after a fixed delay forever.
#[derive(Clone)]
pub struct TelemetryConnector {
    inner: Arc<ConnectorInner>,
}

impl TelemetryConnector {
    pub fn new(
        transport: Arc<dyn FeedTransport>,
        handler: FrameHandler,
        registry: SubscriberRegistry,
        reconnect_delay: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(ConnectorInner {
                transport,
                handler,
                registry,
                reconnect_delay,
                state: Mutex::new(ConnectionState::Idle),
                supervisor: Mutex::new(None),
                attempts: AtomicU64::new(0),
                failed_deliveries: AtomicU64::new(0),
            }),
        }
    }

    /// Start the supervisor unless one is already running. Returns true if
    /// this call started it. Must be called within a tokio runtime.
    pub fn connect(&self) -> bool {
        let mut supervisor = lock(&self.inner.supervisor);
        if supervisor.as_ref().is_some_and(|task| !task.is_finished()) {
            return false;
        }

        self.inner.set_state(ConnectionState::Connecting);
        let inner = self.inner.clone();
        *supervisor = Some(tokio::spawn(async move { inner.run().await }));
        true
    }

    /// Register a subscriber, opening the connection first if nobody has yet.
    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber>) -> Subscription {
        let subscription = self.inner.registry.subscribe(subscriber);
        self.connect();
        subscription
    }

    pub fn status(&self) -> ConnectionStatus {
        ConnectionStatus {
            state: *lock(&self.inner.state),
            attempts: self.inner.attempts.load(Ordering::SeqCst),
            subscribers: self.inner.registry.len(),
            failed_deliveries: self.inner.failed_deliveries.load(Ordering::SeqCst),
        }
    }

    /// Stop the supervisor and drop every subscriber.
    pub fn shutdown(&self) {
        if let Some(task) = lock(&self.inner.supervisor).take() {
            task.abort();
        }
        self.inner.registry.clear();
        self.inner.set_state(ConnectionState::Idle);
        tracing::info!("live feed connector shut down");
    }
}

impl ConnectorInner {
    async fn run(self: Arc<Self>) {
        loop {
            self.set_state(ConnectionState::Connecting);
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;

            match self.transport.open().await {
                Ok(stream) => {
                    self.set_state(ConnectionState::Open);
                    tracing::info!(attempt, "live feed connection established");
                    self.pump(stream).await;
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "live feed connection failed");
                }
            }

            self.set_state(ConnectionState::Reconnecting);
            tracing::info!(
                delay_ms = self.reconnect_delay.as_millis() as u64,
                "live feed connection closed, scheduling reconnect"
            );
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    /// Read frames until the connection closes or fails. Each frame is handled
    /// to completion before the next one is read.
    async fn pump(&self, mut stream: Box<dyn FrameStream>) {
        loop {
            match stream.next_frame().await {
                Ok(Some(frame)) => {
                    let received_at_ms = chrono::Utc::now().timestamp_millis();
                    let Some(outcome) = self.handler.handle_frame(&frame, received_at_ms) else {
                        continue;
                    };
                    let failed = outcome.delivery.failed;
                    if failed > 0 {
                        self.failed_deliveries.fetch_add(failed as u64, Ordering::SeqCst);
                        tracing::warn!(
                            failed,
                            delivered = outcome.delivery.delivered,
                            "live frame not delivered to every subscriber"
                        );
                    }
                }
                Ok(None) => {
                    tracing::info!("live feed closed by peer");
                    return;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "live feed connection error");
                    return;
                }
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        *lock(&self.state) = state;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
