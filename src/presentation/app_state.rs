// Application state for HTTP handlers
use crate::application::assistant_service::AssistantService;
use crate::application::connector::TelemetryConnector;
use crate::application::controller::ControllerStore;
use crate::application::history_store::HistoryStore;
use crate::application::report_service::ReportService;

#[derive(Clone)]
pub struct AppState {
    pub history: HistoryStore,
    pub controller: ControllerStore,
    pub connector: TelemetryConnector,
    pub assistant: AssistantService,
    pub reports: ReportService,
}
