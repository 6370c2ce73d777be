pub mod bundle;
pub mod config;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod placeholders;
pub mod providers;
pub mod retry;
pub mod server;
pub mod staging;
pub mod validator;
