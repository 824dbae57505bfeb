// HTTP client for the plant backend API
use crate::application::plant_backend::{OptimizationRequest, PlantBackend, ReportFile, ReportFormat};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct HttpPlantBackend {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    reply: String,
}

#[derive(Debug, Deserialize)]
struct OptimizationResponse {
    recommendation: String,
}

impl HttpPlantBackend {
    pub fn new(base_url: String, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder, path: &str) -> Result<reqwest::Response> {
        let response = self
            .authorize(request)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", path))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{} failed with status {}: {}", path, status, body);
        }

        Ok(response)
    }
}

#[async_trait]
impl PlantBackend for HttpPlantBackend {
    async fn send_chat(&self, message: &str) -> Result<String> {
        let path = "ai/chat";
        let request = self.client.post(self.url(path)).json(&ChatRequest { message });
        let data = self
            .send(request, path)
            .await?
            .json::<ChatResponse>()
            .await
            .context("Failed to parse chat response")?;
        Ok(data.reply)
    }

    async fn request_optimization(&self, request: &OptimizationRequest) -> Result<String> {
        let path = "ai/optimize";
        let request = self.client.post(self.url(path)).json(request);
        let data = self
            .send(request, path)
            .await?
            .json::<OptimizationResponse>()
            .await
            .context("Failed to parse optimization response")?;
        Ok(data.recommendation)
    }

    async fn download_report(&self, format: ReportFormat) -> Result<ReportFile> {
        let path = format!("reports/{}", format.extension());
        let response = self.send(self.client.get(self.url(&path)), &path).await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(format.content_type())
            .to_string();

        // The backend answers 200 with a JSON error body when it has no data
        if content_type.starts_with("application/json") {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{} returned no report: {}", path, body);
        }

        let body = response
            .bytes()
            .await
            .context("Failed to read report body")?;

        Ok(ReportFile {
            filename: format!("report.{}", format.extension()),
            content_type,
            body,
        })
    }
}
