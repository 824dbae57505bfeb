// Domain layer - Plant telemetry, session and identity models
pub mod identity;
pub mod payload;
pub mod session;
pub mod telemetry;
