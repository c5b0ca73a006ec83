//! Task management HTTP API built on a small handler-chain routing engine.

pub mod app;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod tasks;

pub use app::{build_router, AppContext};
pub use config::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
