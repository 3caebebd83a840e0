//! Process-side wiring for the debate pipeline: endpoint configuration from
//! the environment and an HTTP execution client for the model gateway.

pub mod config;
pub mod http_backend;

pub use config::{AgentsConfig, Endpoint};
pub use http_backend::HttpBackend;
