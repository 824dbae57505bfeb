use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub feed: FeedSettings,
    pub history: HistorySettings,
    pub controller: ControllerSettings,
    pub backend: BackendSettings,
    pub server: ServerSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedSettings {
    pub url: String,
    pub reconnect_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistorySettings {
    pub series_capacity: usize,
    pub log_capacity: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ControllerSettings {
    pub chart_capacity: usize,
    pub log_capacity: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendSettings {
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub filter: String,
}

fn builder() -> anyhow::Result<config::ConfigBuilder<config::builder::DefaultState>> {
    Ok(config::Config::builder()
        .set_default("feed.url", "ws://127.0.0.1:8000/ws/live_data")?
        .set_default("feed.reconnect_delay_ms", 3000)?
        .set_default("history.series_capacity", 60)?
        .set_default("history.log_capacity", 50)?
        .set_default("controller.chart_capacity", 300)?
        .set_default("controller.log_capacity", 50)?
        .set_default("backend.base_url", "http://127.0.0.1:8000")?
        .set_default("server.bind", "0.0.0.0:8080")?
        .set_default("logging.filter", "info")?)
}

pub fn load_dashboard_config() -> anyhow::Result<DashboardConfig> {
    let settings = builder()?
        .add_source(config::File::with_name("config/dashboard").required(false))
        .build()?;

    Ok(settings.try_deserialize()?)
}
