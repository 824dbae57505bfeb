// Live feed payload - one parsed frame of the telemetry stream
use super::telemetry::{KpiReading, LogEntry};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame is not a JSON object")]
    NotAnObject,
}

/// A parsed frame. `raw` is what the feed sent; the typed fields hold only
/// the parts that passed validation.
#[derive(Debug, Clone)]
pub struct LivePayload {
    pub raw: Value,
    pub received_at_ms: i64,
    pub kpi_data: Option<KpiReading>,
    pub log_entry: Option<LogEntry>,
    /// Set when the frame carried a `log_entry` object that failed validation
    pub rejected_log_entry: bool,
}

impl LivePayload {
    pub fn parse(frame: &str, received_at_ms: i64) -> Result<Self, PayloadError> {
        let raw: Value = serde_json::from_str(frame)?;
        Self::from_value(raw, received_at_ms)
    }

    pub fn from_value(raw: Value, received_at_ms: i64) -> Result<Self, PayloadError> {
        let fields = raw.as_object().ok_or(PayloadError::NotAnObject)?;

        let kpi_data = fields
            .get("kpi_data")
            .and_then(Value::as_object)
            .map(KpiReading::from_json);

        // The feed sends `"log_entry": null` on ticks without an event
        let (log_entry, rejected_log_entry) = match fields.get("log_entry") {
            None | Some(Value::Null) => (None, false),
            Some(value) => {
                let entry = LogEntry::from_json(value);
                let rejected = entry.is_none();
                (entry, rejected)
            }
        };

        Ok(Self {
            raw,
            received_at_ms,
            kpi_data,
            log_entry,
            rejected_log_entry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::telemetry::LogLevel;

    #[test]
    fn test_parse_full_frame() {
        let frame = r#"{"kpi_data":{"spc":900,"tsr":31.2,"clinker_quality":48.0,"co2":17.5},
                        "log_entry":{"id":"a","level":"Alert","message":"Critical SPC"}}"#;
        let payload = LivePayload::parse(frame, 10).unwrap();

        let kpi = payload.kpi_data.unwrap();
        assert_eq!(kpi.spc, Some(900.0));
        assert_eq!(kpi.co2, Some(17.5));
        assert_eq!(
            payload.log_entry,
            Some(LogEntry::new("a", LogLevel::Alert, "Critical SPC"))
        );
        assert!(!payload.rejected_log_entry);
        assert_eq!(payload.received_at_ms, 10);
    }

    #[test]
    fn test_null_log_entry_is_absent() {
        let payload = LivePayload::parse(r#"{"kpi_data":{"spc":1.0},"log_entry":null}"#, 0).unwrap();
        assert!(payload.log_entry.is_none());
        assert!(!payload.rejected_log_entry);
    }

    #[test]
    fn test_invalid_log_entry_is_flagged() {
        let payload = LivePayload::parse(r#"{"log_entry":{"id":"x","level":"Info"}}"#, 0).unwrap();
        assert!(payload.log_entry.is_none());
        assert!(payload.rejected_log_entry);
    }

    #[test]
    fn test_unknown_shapes_are_tolerated() {
        let payload = LivePayload::parse(r#"{"error":"Data not available"}"#, 0).unwrap();
        assert!(payload.kpi_data.is_none());
        assert!(payload.log_entry.is_none());

        let payload = LivePayload::parse(r#"{"kpi_data":[1,2,3]}"#, 0).unwrap();
        assert!(payload.kpi_data.is_none());
    }

    #[test]
    fn test_out_of_range_number_only_loses_its_field() {
        let frame = r#"{"kpi_data":{"spc":1e400,"tsr":30.5},
                        "log_entry":{"id":"b","level":"Warning","message":"SPC sensor overflow"}}"#;
        let payload = LivePayload::parse(frame, 0).unwrap();

        let kpi = payload.kpi_data.unwrap();
        assert_eq!(kpi.spc, None);
        assert_eq!(kpi.tsr, Some(30.5));
        assert_eq!(
            payload.log_entry,
            Some(LogEntry::new("b", LogLevel::Warning, "SPC sensor overflow"))
        );
    }

    #[test]
    fn test_malformed_frames_are_errors() {
        assert!(matches!(LivePayload::parse("{not json", 0), Err(PayloadError::Json(_))));
        assert!(matches!(LivePayload::parse("null", 0), Err(PayloadError::NotAnObject)));
        assert!(matches!(LivePayload::parse("[1]", 0), Err(PayloadError::NotAnObject)));
    }
}
