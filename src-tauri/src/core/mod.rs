pub mod analytics;
pub mod error;
pub mod launcher;
pub mod notify;
pub mod orchestrator;
pub mod remote;
pub mod settings_store;
pub mod storage;
