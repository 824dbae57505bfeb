// Assistant service - Chat and optimizer round trips against the plant backend
use crate::application::history_store::HistoryStore;
use crate::application::plant_backend::{OptimizationRequest, PlantBackend};
use crate::domain::session::{ChatMessage, ChatRole, OptimizerInputs, OptimizerState, OptimizerUpdate};
use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

pub const CHAT_FALLBACK_REPLY: &str = "I'm experiencing connectivity issues with my neural networks. Please verify the backend services are operational.";
pub const OPTIMIZER_FALLBACK: &str = "Neural network connectivity error. Please verify backend services are operational and retry the optimization request.";

#[derive(Debug, Error, PartialEq)]
pub enum AssistantError {
    #[error("chat message is empty")]
    EmptyMessage,
    #[error("{field} is not a number: {value:?}")]
    InvalidInput { field: &'static str, value: String },
}

#[derive(Clone)]
pub struct AssistantService {
    backend: Arc<dyn PlantBackend>,
    store: HistoryStore,
    next_id: Arc<AtomicU64>,
}

impl AssistantService {
    pub fn new(backend: Arc<dyn PlantBackend>, store: HistoryStore) -> Self {
        Self {
            backend,
            store,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Append the user's message, ask the backend, append the reply (or the
    /// fallback text when the backend fails) and return that reply.
    pub async fn send_chat(&self, content: &str) -> Result<ChatMessage, AssistantError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AssistantError::EmptyMessage);
        }

        self.store
            .add_chat_message(self.message(ChatRole::User, content.to_string()));

        let reply = match self.backend.send_chat(content).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "chat request failed");
                CHAT_FALLBACK_REPLY.to_string()
            }
        };

        let reply = self.message(ChatRole::Assistant, reply);
        self.store.add_chat_message(reply.clone());
        Ok(reply)
    }

    pub fn clear_chat(&self) {
        self.store.clear_chat();
    }

    pub fn update_optimizer(&self, update: OptimizerUpdate) -> OptimizerState {
        self.store.set_optimizer_state(update)
    }

    /// Run one optimization. Inputs are validated before anything is recorded.
    pub async fn optimize(&self, inputs: OptimizerInputs) -> Result<OptimizerState, AssistantError> {
        let request = OptimizationRequest {
            target_spc: parse_input("targetSPC", &inputs.target_spc)?,
            target_quality: parse_input("targetQuality", &inputs.target_quality)?,
            max_tsr: parse_input("maxTSR", &inputs.max_tsr)?,
        };

        self.store.set_optimizer_state(OptimizerUpdate {
            inputs: Some(inputs),
            result: Some(String::new()),
            is_loading: Some(true),
        });

        let result = match self.backend.request_optimization(&request).await {
            Ok(recommendation) => recommendation,
            Err(e) => {
                tracing::warn!(error = %e, "optimization request failed");
                OPTIMIZER_FALLBACK.to_string()
            }
        };

        Ok(self.store.set_optimizer_state(OptimizerUpdate {
            inputs: None,
            result: Some(result),
            is_loading: Some(false),
        }))
    }

    fn message(&self, role: ChatRole, content: String) -> ChatMessage {
        let now = Utc::now();
        let seq = self.next_id.fetch_add(1, Ordering::SeqCst);
        ChatMessage::new(
            format!("{}-{}", now.timestamp_millis(), seq),
            role,
            content,
            now,
        )
    }
}

fn parse_input(field: &'static str, value: &str) -> Result<f64, AssistantError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| AssistantError::InvalidInput {
            field,
            value: value.to_string(),
        })
}
