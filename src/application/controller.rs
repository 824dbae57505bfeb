// Controller state - Pure reducer over feed and operator actions
use crate::application::bounded::{BoundedSeries, LogBuffer};
use crate::application::subscribers::Subscriber;
use crate::domain::payload::LivePayload;
use crate::domain::telemetry::{KpiReading, LogEntry, Metric, PlantStatus, Sample};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const CHART_HISTORY_CAPACITY: usize = 300;
pub const CONTROLLER_LOG_CAPACITY: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    AddLog(LogEntry),
    AddKpiData { reading: KpiReading, timestamp_ms: i64 },
    SetPlantStatus(PlantStatus),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerState {
    pub logs: LogBuffer,
    pub spc_history: BoundedSeries<Sample>,
    pub tsr_history: BoundedSeries<Sample>,
    pub clinker_quality_history: BoundedSeries<Sample>,
    pub co2_history: BoundedSeries<Sample>,
    pub plant_status: PlantStatus,
}

impl ControllerState {
    pub fn new(chart_capacity: usize, log_capacity: usize) -> Self {
        Self {
            logs: LogBuffer::new(log_capacity),
            spc_history: BoundedSeries::new(chart_capacity),
            tsr_history: BoundedSeries::new(chart_capacity),
            clinker_quality_history: BoundedSeries::new(chart_capacity),
            co2_history: BoundedSeries::new(chart_capacity),
            plant_status: PlantStatus::default(),
        }
    }

    pub fn history(&self, metric: Metric) -> &BoundedSeries<Sample> {
        match metric {
            Metric::Spc => &self.spc_history,
            Metric::Tsr => &self.tsr_history,
            Metric::ClinkerQuality => &self.clinker_quality_history,
            Metric::Co2 => &self.co2_history,
        }
    }

    fn history_mut(&mut self, metric: Metric) -> &mut BoundedSeries<Sample> {
        match metric {
            Metric::Spc => &mut self.spc_history,
            Metric::Tsr => &mut self.tsr_history,
            Metric::ClinkerQuality => &mut self.clinker_quality_history,
            Metric::Co2 => &mut self.co2_history,
        }
    }

    pub fn view(&self) -> ControllerView {
        let series = |metric| self.history(metric).to_vec();
        ControllerView {
            logs: self.logs.to_vec(),
            spc_history: series(Metric::Spc),
            tsr_history: series(Metric::Tsr),
            clinker_quality_history: series(Metric::ClinkerQuality),
            co2_history: series(Metric::Co2),
            plant_status: self.plant_status,
        }
    }
}

impl Default for ControllerState {
    fn default() -> Self {
        Self::new(CHART_HISTORY_CAPACITY, CONTROLLER_LOG_CAPACITY)
    }
}

/// Serialisable copy of [`ControllerState`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerView {
    pub logs: Vec<LogEntry>,
    pub spc_history: Vec<Sample>,
    pub tsr_history: Vec<Sample>,
    pub clinker_quality_history: Vec<Sample>,
    pub co2_history: Vec<Sample>,
    pub plant_status: PlantStatus,
}

/// Next state for `action`. Never touches anything but its return value.
pub fn reduce(state: &ControllerState, action: Action) -> ControllerState {
    let mut next = state.clone();
    match action {
        Action::AddLog(entry) => {
            next.logs.insert(entry);
        }
        Action::AddKpiData {
            reading,
            timestamp_ms,
        } => {
            for (metric, value) in reading.present() {
                next.history_mut(metric).push(Sample::new(timestamp_ms, value));
            }
        }
        Action::SetPlantStatus(status) => {
            next.plant_status = status;
        }
    }
    next
}

/// Actions a feed payload translates to, in the order they are applied
pub fn actions_for(payload: &LivePayload) -> Vec<Action> {
    let mut actions = Vec::with_capacity(2);
    if let Some(reading) = payload.kpi_data.filter(|reading| !reading.is_empty()) {
        actions.push(Action::AddKpiData {
            reading,
            timestamp_ms: payload.received_at_ms,
        });
    }
    if let Some(entry) = &payload.log_entry {
        actions.push(Action::AddLog(entry.clone()));
    }
    actions
}

/// Holds the current controller state and applies dispatched actions to it.
#[derive(Clone, Default)]
pub struct ControllerStore {
    state: Arc<Mutex<ControllerState>>,
}

impl ControllerStore {
    pub fn new(initial: ControllerState) -> Self {
        Self {
            state: Arc::new(Mutex::new(initial)),
        }
    }

    pub fn dispatch(&self, action: Action) {
        let mut state = self.lock();
        *state = reduce(&state, action);
    }

    pub fn state(&self) -> ControllerState {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Subscriber for ControllerStore {
    fn on_payload(&self, payload: &LivePayload) -> anyhow::Result<()> {
        for action in actions_for(payload) {
            self.dispatch(action);
        }
        Ok(())
    }
}
