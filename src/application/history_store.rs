// History store - Rolling metric windows, recent logs and UI session state
use crate::application::bounded::{BoundedSeries, LogBuffer};
use crate::domain::session::{ChatMessage, OptimizerState, OptimizerUpdate};
use crate::domain::telemetry::{LogEntry, Metric, Sample};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub const DEFAULT_SERIES_CAPACITY: usize = 60;
pub const DEFAULT_LOG_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryLimits {
    pub series_capacity: usize,
    pub log_capacity: usize,
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self {
            series_capacity: DEFAULT_SERIES_CAPACITY,
            log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

#[derive(Debug)]
struct HistoryState {
    series: BTreeMap<Metric, BoundedSeries<Sample>>,
    logs: LogBuffer,
    chat: Vec<ChatMessage>,
    optimizer: OptimizerState,
}

/// Owned copy of everything the store holds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySnapshot {
    pub series: BTreeMap<Metric, Vec<Sample>>,
    pub logs: Vec<LogEntry>,
    pub chat_messages: Vec<ChatMessage>,
    pub optimizer: OptimizerState,
}

#[cfg(test)]
impl HistorySnapshot {
    pub fn series(&self, metric: Metric) -> &[Sample] {
        self.series.get(&metric).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn latest(&self, metric: Metric) -> Option<Sample> {
        self.series(metric).last().copied()
    }
}

/// Cheap to clone; all clones share one state. Every method takes the lock
/// once, so each mutation is atomic with respect to readers.
#[derive(Clone, Debug)]
pub struct HistoryStore {
    state: Arc<RwLock<HistoryState>>,
    limits: HistoryLimits,
}

impl HistoryStore {
    pub fn new(limits: HistoryLimits) -> Self {
        let series = Metric::ALL
            .into_iter()
            .map(|metric| (metric, BoundedSeries::new(limits.series_capacity)))
            .collect();

        let state = HistoryState {
            series,
            logs: LogBuffer::new(limits.log_capacity),
            chat: vec![ChatMessage::greeting(Utc::now())],
            optimizer: OptimizerState::default(),
        };

        Self {
            state: Arc::new(RwLock::new(state)),
            limits,
        }
    }

    pub fn append_sample(&self, metric: Metric, sample: Sample) {
        let mut state = self.write();
        state
            .series
            .entry(metric)
            .or_insert_with(|| BoundedSeries::new(self.limits.series_capacity))
            .push(sample);
    }

    /// Returns false when the id was already present.
    pub fn append_log(&self, entry: LogEntry) -> bool {
        self.write().logs.insert(entry)
    }

    pub fn snapshot(&self) -> HistorySnapshot {
        let state = self.read();
        HistorySnapshot {
            series: state
                .series
                .iter()
                .map(|(metric, series)| (*metric, series.to_vec()))
                .collect(),
            logs: state.logs.to_vec(),
            chat_messages: state.chat.clone(),
            optimizer: state.optimizer.clone(),
        }
    }

    pub fn set_optimizer_state(&self, update: OptimizerUpdate) -> OptimizerState {
        let mut state = self.write();
        state.optimizer.merge(update);
        state.optimizer.clone()
    }

    pub fn add_chat_message(&self, message: ChatMessage) {
        self.write().chat.push(message);
    }

    pub fn clear_chat(&self) {
        self.write().chat = vec![ChatMessage::greeting(Utc::now())];
    }

    fn read(&self) -> RwLockReadGuard<'_, HistoryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HistoryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(HistoryLimits::default())
    }
}
