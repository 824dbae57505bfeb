// Application layer - Telemetry core and session use cases
pub mod assistant_service;
pub mod bounded;
pub mod connector;
pub mod controller;
pub mod feed_transport;
pub mod history_store;
pub mod ingest;
pub mod plant_backend;
pub mod report_service;
pub mod subscribers;
