// Frame ingest - Parse one frame, fold it into the history store, fan it out
use crate::application::history_store::HistoryStore;
use crate::application::subscribers::{DeliveryReport, SubscriberRegistry};
use crate::domain::payload::LivePayload;
use crate::domain::telemetry::Sample;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameOutcome {
    pub samples_appended: usize,
    pub log_appended: bool,
    pub delivery: DeliveryReport,
}

#[derive(Clone)]
pub struct FrameHandler {
    store: HistoryStore,
    registry: SubscriberRegistry,
    last_timestamp_ms: Arc<AtomicI64>,
}

impl FrameHandler {
    pub fn new(store: HistoryStore, registry: SubscriberRegistry) -> Self {
        Self {
            store,
            registry,
            last_timestamp_ms: Arc::new(AtomicI64::new(i64::MIN)),
        }
    }

    /// Handle one inbound frame. Returns `None` if the frame could not be parsed;
    /// that is logged and otherwise ignored.
    pub fn handle_frame(&self, frame: &str, received_at_ms: i64) -> Option<FrameOutcome> {
        // Receipt stamps never go backwards, even if the wall clock does
        let previous = self.last_timestamp_ms.fetch_max(received_at_ms, Ordering::SeqCst);
        let timestamp_ms = previous.max(received_at_ms);

        let payload = match LivePayload::parse(frame, timestamp_ms) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed live frame");
                return None;
            }
        };

        let mut outcome = FrameOutcome::default();

        if let Some(reading) = &payload.kpi_data {
            for (metric, value) in reading.present() {
                self.store.append_sample(metric, Sample::new(timestamp_ms, value));
                outcome.samples_appended += 1;
            }
        }

        if let Some(entry) = &payload.log_entry {
            outcome.log_appended = self.store.append_log(entry.clone());
        } else if payload.rejected_log_entry {
            tracing::debug!("discarding log entry with missing id, level or message");
        }

        outcome.delivery = self.registry.notify(&payload);
        tracing::debug!(
            samples = outcome.samples_appended,
            log = outcome.log_appended,
            delivered = outcome.delivery.delivered,
            failed = outcome.delivery.failed,
            "live frame processed"
        );
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::history_store::HistoryLimits;
    use crate::domain::telemetry::{LogLevel, Metric};
    use std::sync::Mutex;

    fn handler(series_capacity: usize) -> (FrameHandler, HistoryStore, SubscriberRegistry) {
        let store = HistoryStore::new(HistoryLimits {
            series_capacity,
            log_capacity: 50,
        });
        let registry = SubscriberRegistry::new();
        (FrameHandler::new(store.clone(), registry.clone()), store, registry)
    }

    #[test]
    fn test_end_to_end_frames() {
        let (handler, store, _registry) = handler(300);

        handler.handle_frame(r#"{"kpi_data":{"spc":900}}"#, 1_000).unwrap();
        handler.handle_frame(r#"{"kpi_data":{"spc":905}}"#, 2_000).unwrap();
        handler
            .handle_frame(
                r#"{"log_entry":{"id":"a","level":"Warning","message":"high temp"}}"#,
                3_000,
            )
            .unwrap();

        let snapshot = store.snapshot();
        let values: Vec<f64> = snapshot.series(Metric::Spc).iter().map(|s| s.value).collect();
        assert_eq!(values, vec![900.0, 905.0]);
        let stamps: Vec<i64> = snapshot.series(Metric::Spc).iter().map(|s| s.timestamp_ms).collect();
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(snapshot.logs.len(), 1);
        assert_eq!(snapshot.logs[0].id, "a");
        assert_eq!(snapshot.logs[0].level, LogLevel::Warning);
        assert_eq!(snapshot.logs[0].message, "high temp");
    }

    #[test]
    fn test_non_numeric_field_is_skipped() {
        let (handler, store, _registry) = handler(60);

        let outcome = handler
            .handle_frame(r#"{"kpi_data":{"spc":"not-a-number","tsr":31.0}}"#, 1)
            .unwrap();

        assert_eq!(outcome.samples_appended, 1);
        let snapshot = store.snapshot();
        assert!(snapshot.series(Metric::Spc).is_empty());
        assert_eq!(snapshot.series(Metric::Tsr), &[Sample::new(1, 31.0)]);
    }

    #[test]
    fn test_out_of_range_number_keeps_rest_of_frame() {
        let (handler, store, _registry) = handler(60);

        let outcome = handler
            .handle_frame(
                r#"{"kpi_data":{"spc":1e400},"log_entry":{"id":"a","level":"Alert","message":"overflow"}}"#,
                1,
            )
            .unwrap();

        assert_eq!(outcome.samples_appended, 0);
        assert!(outcome.log_appended);
        let snapshot = store.snapshot();
        assert!(snapshot.series(Metric::Spc).is_empty());
        assert_eq!(snapshot.logs[0].id, "a");
    }

    #[test]
    fn test_one_timestamp_per_bundle() {
        let (handler, store, _registry) = handler(60);
        handler
            .handle_frame(r#"{"kpi_data":{"spc":900,"tsr":30,"clinker_quality":48,"co2":17}}"#, 77)
            .unwrap();

        let snapshot = store.snapshot();
        for metric in Metric::ALL {
            assert_eq!(snapshot.series(metric).len(), 1);
            assert_eq!(snapshot.series(metric)[0].timestamp_ms, 77);
        }
    }

    #[test]
    fn test_malformed_frame_is_dropped_without_notifying() {
        let (handler, store, registry) = handler(60);
        let seen = Arc::new(Mutex::new(0));
        let counter = seen.clone();
        let _subscription = registry.subscribe(Arc::new(move |_: &LivePayload| -> anyhow::Result<()> {
            *counter.lock().unwrap() += 1;
            Ok(())
        }));

        assert!(handler.handle_frame("{{{", 1).is_none());
        assert_eq!(*seen.lock().unwrap(), 0);
        assert!(store.snapshot().series(Metric::Spc).is_empty());

        // The handler keeps working afterwards
        assert!(handler.handle_frame(r#"{"kpi_data":{"spc":1}}"#, 2).is_some());
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[test]
    fn test_invalid_log_entry_is_discarded_but_payload_delivered() {
        let (handler, store, registry) = handler(60);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _subscription = registry.subscribe(Arc::new(move |payload: &LivePayload| -> anyhow::Result<()> {
            sink.lock().unwrap().push(payload.raw.clone());
            Ok(())
        }));

        let outcome = handler
            .handle_frame(r#"{"log_entry":{"id":"x","message":"no level"}}"#, 1)
            .unwrap();

        assert!(!outcome.log_appended);
        assert!(store.snapshot().logs.is_empty());
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_store_is_updated_before_subscribers_run() {
        let (handler, store, registry) = handler(60);
        let observed = Arc::new(Mutex::new(None));
        let sink = observed.clone();
        let reader = store.clone();
        let _subscription = registry.subscribe(Arc::new(move |_: &LivePayload| -> anyhow::Result<()> {
            *sink.lock().unwrap() = reader.snapshot().latest(Metric::Co2);
            Ok(())
        }));

        handler.handle_frame(r#"{"kpi_data":{"co2":18.5}}"#, 5).unwrap();
        assert_eq!(*observed.lock().unwrap(), Some(Sample::new(5, 18.5)));
    }

    #[test]
    fn test_timestamps_never_go_backwards() {
        let (handler, store, _registry) = handler(60);
        handler.handle_frame(r#"{"kpi_data":{"spc":1}}"#, 2_000).unwrap();
        handler.handle_frame(r#"{"kpi_data":{"spc":2}}"#, 1_500).unwrap();

        let stamps: Vec<i64> = store
            .snapshot()
            .series(Metric::Spc)
            .iter()
            .map(|s| s.timestamp_ms)
            .collect();
        assert_eq!(stamps, vec![2_000, 2_000]);
    }
}
