// Chat transcript and optimizer session models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const GREETING_ID: &str = "1";
pub const GREETING: &str =
    "Hello! I'm your AI Co-Pilot. How can I assist with the plant's operations today?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(id: String, role: ChatRole, content: String, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            role,
            content,
            timestamp,
        }
    }

    /// The assistant message every fresh transcript starts with
    pub fn greeting(timestamp: DateTime<Utc>) -> Self {
        Self::new(
            GREETING_ID.to_string(),
            ChatRole::Assistant,
            GREETING.to_string(),
            timestamp,
        )
    }
}

/// Optimizer inputs as the operator typed them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizerInputs {
    #[serde(rename = "targetSPC")]
    pub target_spc: String,
    #[serde(rename = "targetQuality")]
    pub target_quality: String,
    #[serde(rename = "maxTSR")]
    pub max_tsr: String,
}

impl Default for OptimizerInputs {
    fn default() -> Self {
        Self {
            target_spc: "850".to_string(),
            target_quality: "50".to_string(),
            max_tsr: "35".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizerState {
    pub inputs: OptimizerInputs,
    pub result: String,
    pub is_loading: bool,
}

/// Partial optimizer state; present fields replace the stored ones.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizerUpdate {
    pub inputs: Option<OptimizerInputs>,
    pub result: Option<String>,
    pub is_loading: Option<bool>,
}

impl OptimizerState {
    pub fn merge(&mut self, update: OptimizerUpdate) {
        if let Some(inputs) = update.inputs {
            self.inputs = inputs;
        }
        if let Some(result) = update.result {
            self.result = result;
        }
        if let Some(is_loading) = update.is_loading {
            self.is_loading = is_loading;
        }
    }
}
