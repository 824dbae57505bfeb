// Telemetry data domain models
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// One measurement of a metric, stamped at receipt time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    #[serde(rename = "x")]
    pub timestamp_ms: i64,
    #[serde(rename = "y")]
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp_ms: i64, value: f64) -> Self {
        Self {
            timestamp_ms,
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Spc,
    Tsr,
    ClinkerQuality,
    Co2,
}

impl Metric {
    pub const ALL: [Metric; 4] = [Metric::Spc, Metric::Tsr, Metric::ClinkerQuality, Metric::Co2];

    /// Field name used by the live feed
    pub fn key(self) -> &'static str {
        match self {
            Metric::Spc => "spc",
            Metric::Tsr => "tsr",
            Metric::ClinkerQuality => "clinker_quality",
            Metric::Co2 => "co2",
        }
    }
}

/// A `kpi_data` bundle. Each field is present only if the frame carried a number for it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KpiReading {
    pub spc: Option<f64>,
    pub tsr: Option<f64>,
    pub clinker_quality: Option<f64>,
    pub co2: Option<f64>,
}

impl KpiReading {
    pub fn from_json(fields: &Map<String, Value>) -> Self {
        // Out-of-range literals such as 1e400 read as infinite and are skipped
        let number = |metric: Metric| {
            fields
                .get(metric.key())
                .and_then(Value::as_f64)
                .filter(|value| value.is_finite())
        };
        Self {
            spc: number(Metric::Spc),
            tsr: number(Metric::Tsr),
            clinker_quality: number(Metric::ClinkerQuality),
            co2: number(Metric::Co2),
        }
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Spc => self.spc,
            Metric::Tsr => self.tsr,
            Metric::ClinkerQuality => self.clinker_quality,
            Metric::Co2 => self.co2,
        }
    }

    pub fn present(&self) -> impl Iterator<Item = (Metric, f64)> + '_ {
        Metric::ALL
            .into_iter()
            .filter_map(|metric| self.get(metric).map(|value| (metric, value)))
    }

    pub fn is_empty(&self) -> bool {
        self.present().next().is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Info,
    Warning,
    Alert,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Info" => Ok(LogLevel::Info),
            "Warning" => Ok(LogLevel::Warning),
            "Alert" => Ok(LogLevel::Alert),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    pub fn new(id: impl Into<String>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            level,
            message: message.into(),
        }
    }

    /// Build an entry from a feed object. Missing or empty `id`/`message`,
    /// or an unknown `level`, yields `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        let fields = value.as_object()?;
        let text = |name: &str| {
            fields
                .get(name)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
        };

        let id = text("id")?;
        let level = text("level")?.parse().ok()?;
        let message = text("message")?;
        Some(Self::new(id, level, message))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlantStatus {
    #[default]
    Running,
    Stopped,
    Maintenance,
}

impl fmt::Display for PlantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlantStatus::Running => "Running",
            PlantStatus::Stopped => "Stopped",
            PlantStatus::Maintenance => "Maintenance",
        };
        f.write_str(name)
    }
}
