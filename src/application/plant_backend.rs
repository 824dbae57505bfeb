// Backend trait for chat, optimization and report endpoints
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRequest {
    #[serde(rename = "targetSPC")]
    pub target_spc: f64,
    #[serde(rename = "targetQuality")]
    pub target_quality: f64,
    #[serde(rename = "maxTSR")]
    pub max_tsr: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Csv,
    Pdf,
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Csv => "csv",
            ReportFormat::Pdf => "pdf",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ReportFormat::Csv => "text/csv",
            ReportFormat::Pdf => "application/pdf",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportFile {
    pub filename: String,
    pub content_type: String,
    pub body: Bytes,
}

#[async_trait]
pub trait PlantBackend: Send + Sync {
    /// Send one chat message, returning the assistant's reply
    async fn send_chat(&self, message: &str) -> anyhow::Result<String>;

    /// Ask for an optimization recommendation
    async fn request_optimization(&self, request: &OptimizationRequest) -> anyhow::Result<String>;

    async fn download_report(&self, format: ReportFormat) -> anyhow::Result<ReportFile>;
}
