// Report service - Role-gated report downloads
use crate::application::plant_backend::{PlantBackend, ReportFile, ReportFormat};
use crate::domain::identity::Principal;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("reports are available to managers only")]
    Forbidden,
    #[error("report download failed: {0}")]
    Backend(#[from] anyhow::Error),
}

#[derive(Clone)]
pub struct ReportService {
    backend: Arc<dyn PlantBackend>,
}

impl ReportService {
    pub fn new(backend: Arc<dyn PlantBackend>) -> Self {
        Self { backend }
    }

    pub async fn export(
        &self,
        principal: &Principal,
        format: ReportFormat,
    ) -> Result<ReportFile, ReportError> {
        if !principal.can_export_reports() {
            tracing::info!(user = ?principal.username, "report export denied");
            return Err(ReportError::Forbidden);
        }

        let mut report = self.backend.download_report(format).await?;
        report.filename = format!(
            "cement_ai_report_{}.{}",
            Utc::now().format("%Y%m%d"),
            format.extension()
        );
        Ok(report)
    }
}
