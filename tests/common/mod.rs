//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use tempfile::TempDir;
use tokio::net::TcpListener;

use task_api::config::ServerConfig;
use task_api::{build_router, AppContext, HttpServer, Shutdown};

/// A running server on an ephemeral port with its own data file.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub data_dir: TempDir,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the server task to exit.
    pub async fn stop(self) {
        self.shutdown.trigger();
        let _ = tokio::time::timeout(Duration::from_secs(5), self.handle).await;
    }
}

pub async fn start_server() -> TestServer {
    start_server_with(ServerConfig::default()).await
}

pub async fn start_server_with(mut config: ServerConfig) -> TestServer {
    let data_dir = TempDir::new().unwrap();
    config.storage.data_file = data_dir.path().join("tasks.json");

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let ctx = AppContext::from_config(config).await.unwrap();
    let router = build_router(&ctx).unwrap();
    let server = HttpServer::new(&ctx.config, router);

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let handle = tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestServer {
        addr,
        shutdown,
        data_dir,
        handle,
    }
}

/// Build a `multipart/form-data` body with one file part.
#[allow(dead_code)]
pub fn multipart_file(boundary: &str, field: &str, filename: &str, content: &str) -> String {
    format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
         Content-Type: text/csv\r\n\
         \r\n\
         {content}\r\n\
         --{boundary}--\r\n"
    )
}
