// HTTP request handlers
use crate::application::connector::ConnectionStatus;
use crate::application::controller::{Action, ControllerView};
use crate::application::history_store::HistorySnapshot;
use crate::application::plant_backend::ReportFormat;
use crate::domain::identity::Principal;
use crate::domain::session::{ChatMessage, OptimizerInputs, OptimizerState, OptimizerUpdate};
use crate::domain::telemetry::PlantStatus;
use crate::infrastructure::live_stream::subscribe_client;
use crate::presentation::app_state::AppState;
use crate::presentation::error::ApiError;
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

pub const USER_NAME_HEADER: &str = "x-user-name";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Deserialize)]
pub struct PlantStatusRequest {
    pub status: PlantStatus,
}

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Rolling history, logs and session state
pub async fn get_history(State(state): State<Arc<AppState>>) -> Json<HistorySnapshot> {
    Json(state.history.snapshot())
}

pub async fn get_controller(State(state): State<Arc<AppState>>) -> Json<ControllerView> {
    Json(state.controller.state().view())
}

pub async fn set_plant_status(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PlantStatusRequest>,
) -> Json<ControllerView> {
    tracing::info!(status = %request.status, "plant status changed");
    state
        .controller
        .dispatch(Action::SetPlantStatus(request.status));
    Json(state.controller.state().view())
}

pub async fn connection_status(State(state): State<Arc<AppState>>) -> Json<ConnectionStatus> {
    Json(state.connector.status())
}

/// Live payloads as server-sent events, one subscriber per client
pub async fn live_stream(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    subscribe_client(&state.connector)
}

pub async fn post_chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatMessage>, ApiError> {
    let reply = state.assistant.send_chat(&request.message).await?;
    Ok(Json(reply))
}

pub async fn clear_chat(State(state): State<Arc<AppState>>) -> StatusCode {
    state.assistant.clear_chat();
    StatusCode::NO_CONTENT
}

pub async fn update_optimizer(
    State(state): State<Arc<AppState>>,
    Json(update): Json<OptimizerUpdate>,
) -> Json<OptimizerState> {
    Json(state.assistant.update_optimizer(update))
}

pub async fn run_optimizer(
    State(state): State<Arc<AppState>>,
    Json(inputs): Json<OptimizerInputs>,
) -> Result<Json<OptimizerState>, ApiError> {
    let result = state.assistant.optimize(inputs).await?;
    Ok(Json(result))
}

/// Download a report (managers only)
pub async fn download_report(
    Path(format): Path<ReportFormat>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = principal_from_headers(&headers);
    let report = state.reports.export(&principal, format).await?;

    let disposition = format!("attachment; filename={}", report.filename);
    Ok((
        [
            (header::CONTENT_TYPE, report.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        report.body,
    ))
}

/// Principal forwarded by the authenticating proxy in front of this service
pub fn principal_from_headers(headers: &HeaderMap) -> Principal {
    let value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    Principal::new(
        value(USER_NAME_HEADER).map(str::to_string),
        value(USER_ROLE_HEADER).and_then(|role| role.parse().ok()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::assistant_service::AssistantService;
    use crate::application::assistant_service::tests::FakeBackend;
    use crate::application::connector::{DEFAULT_RECONNECT_DELAY, TelemetryConnector};
    use crate::application::controller::ControllerStore;
    use crate::application::feed_transport::{FeedTransport, FrameStream, TransportError};
    use crate::application::history_store::HistoryStore;
    use crate::application::ingest::FrameHandler;
    use crate::application::report_service::ReportService;
    use crate::application::subscribers::SubscriberRegistry;
    use crate::domain::identity::Role;
    use async_trait::async_trait;
    use axum::http::HeaderValue;

    struct OfflineTransport;

    #[async_trait]
    impl FeedTransport for OfflineTransport {
        async fn open(&self) -> Result<Box<dyn FrameStream>, TransportError> {
            Err(TransportError::Stream("offline".to_string()))
        }
    }

    fn app_state(backend: FakeBackend) -> Arc<AppState> {
        let backend = Arc::new(backend);
        let history = HistoryStore::default();
        let registry = SubscriberRegistry::new();
        let handler = FrameHandler::new(history.clone(), registry.clone());
        let connector = TelemetryConnector::new(
            Arc::new(OfflineTransport),
            handler,
            registry,
            DEFAULT_RECONNECT_DELAY,
        );

        Arc::new(AppState {
            assistant: AssistantService::new(backend.clone(), history.clone()),
            reports: ReportService::new(backend),
            controller: ControllerStore::default(),
            history,
            connector,
        })
    }

    #[test]
    fn test_principal_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_NAME_HEADER, HeaderValue::from_static("asha"));
        headers.insert(USER_ROLE_HEADER, HeaderValue::from_static("Manager"));

        let principal = principal_from_headers(&headers);
        assert_eq!(principal.username.as_deref(), Some("asha"));
        assert_eq!(principal.role, Some(Role::Manager));

        headers.insert(USER_ROLE_HEADER, HeaderValue::from_static("Admin"));
        assert_eq!(principal_from_headers(&headers).role, None);
        assert_eq!(principal_from_headers(&HeaderMap::new()), Principal::default());
    }

    #[tokio::test]
    async fn test_set_plant_status() {
        let state = app_state(FakeBackend::default());
        let Json(view) = set_plant_status(
            State(state.clone()),
            Json(PlantStatusRequest {
                status: PlantStatus::Maintenance,
            }),
        )
        .await;

        assert_eq!(view.plant_status, PlantStatus::Maintenance);
        assert_eq!(state.controller.state().plant_status, PlantStatus::Maintenance);
    }

    #[tokio::test]
    async fn test_chat_then_clear() {
        let state = app_state(FakeBackend {
            chat_reply: Some("All kilns nominal.".to_string()),
            ..Default::default()
        });

        let Json(reply) = post_chat(
            State(state.clone()),
            Json(ChatRequest {
                message: "status".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(reply.content, "All kilns nominal.");

        let Json(history) = get_history(State(state.clone())).await;
        assert_eq!(history.chat_messages.len(), 3);

        assert_eq!(clear_chat(State(state.clone())).await, StatusCode::NO_CONTENT);
        let Json(history) = get_history(State(state)).await;
        assert_eq!(history.chat_messages.len(), 1);
    }

    #[tokio::test]
    async fn test_blank_chat_is_unprocessable() {
        let state = app_state(FakeBackend::default());
        let err = post_chat(
            State(state),
            Json(ChatRequest {
                message: " ".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_report_requires_manager() {
        let state = app_state(FakeBackend::default());
        let mut headers = HeaderMap::new();
        headers.insert(USER_ROLE_HEADER, HeaderValue::from_static("Operator"));

        let result = download_report(Path(ReportFormat::Csv), headers, State(state)).await;
        match result {
            Err(err) => assert_eq!(err.status(), StatusCode::FORBIDDEN),
            Ok(_) => panic!("operator must not download reports"),
        }
    }

    #[tokio::test]
    async fn test_update_optimizer_merges() {
        let state = app_state(FakeBackend::default());
        let Json(merged) = update_optimizer(
            State(state),
            Json(OptimizerUpdate {
                result: Some("keep current settings".to_string()),
                ..Default::default()
            }),
        )
        .await;

        assert_eq!(merged.result, "keep current settings");
        assert_eq!(merged.inputs, OptimizerInputs::default());
    }
}
