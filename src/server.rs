// ═══════════════════════════════════════════════════════════════
// API SERVER - A TcpListener and some string formatting
// ═══════════════════════════════════════════════════════════════
//
// No framework. Five routes, JSON out, one connection per request.
// Every handler reads a snapshot and walks away, so a slow client can
// never hold up the crawl.
//
//   GET  /api/articles   the current collection
//   GET  /api/status     the JobStatus record
//   GET  /health         {status, articles, scraping}
//   GET  /metrics        process-lifetime counters
//   POST /api/scrape     202 started / 409 already running

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::controller::{JobController, StartOutcome};

const MAX_REQUEST_HEAD_BYTES: usize = 8 * 1024;
const READ_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    fn json<T: Serialize + ?Sized>(status: u16, value: &T) -> Self {
        let body = serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string());
        Self { status, body }
    }

    fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            202 => "Accepted",
            400 => "Bad Request",
            404 => "Not Found",
            409 => "Conflict",
            _ => "Unknown",
        }
    }

    fn to_http(&self) -> String {
        format!(
            "HTTP/1.1 {} {}\r\nContent-Type: application/json; charset=utf-8\r\nAccess-Control-Allow-Origin: *\r\nConnection: close\r\nContent-Length: {}\r\n\r\n{}",
            self.status,
            self.reason(),
            self.body.len(),
            self.body,
        )
    }
}

/// Dispatch one request. Query strings are ignored.
pub fn route(controller: &Arc<JobController>, method: &str, target: &str) -> ApiResponse {
    let path = target.split('?').next().unwrap_or(target);

    match (method, path) {
        ("GET", "/api/articles") => ApiResponse::json(200, controller.articles().as_slice()),
        ("GET", "/api/status") => ApiResponse::json(200, &controller.status()),
        ("GET", "/health") => ApiResponse::json(200, &controller.health()),
        ("GET", "/metrics") => ApiResponse::json(200, &controller.metrics().snapshot()),
        ("POST", "/api/scrape") => match controller.start() {
            StartOutcome::Started(run_id) => {
                ApiResponse::json(202, &json!({ "result": "started", "run_id": run_id }))
            }
            StartOutcome::AlreadyRunning => {
                ApiResponse::json(409, &json!({ "result": "already_running" }))
            }
        },
        _ => ApiResponse::json(404, &json!({ "error": "not found", "path": path })),
    }
}

/// Bind `0.0.0.0:port` and serve until shutdown flips.
pub async fn run_api_server(
    port: u16,
    controller: Arc<JobController>,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port))).await?;
    info!("🌐 API server listening on http://0.0.0.0:{}", port);
    serve(listener, controller, shutdown).await;
    Ok(())
}

/// Accept loop over an already bound listener.
pub async fn serve(
    listener: TcpListener,
    controller: Arc<JobController>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, addr)) => {
                        let controller = Arc::clone(&controller);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, &controller).await {
                                debug!(peer = %addr, error = %e, "Connection dropped");
                            }
                        });
                    }
                    Err(e) => {
                        error!("API server accept error: {}", e);
                    }
                }
            }
            _ = shutdown.changed() => {
                info!("API server: shutting down");
                break;
            }
        }
    }
}

async fn handle_connection(mut stream: TcpStream, controller: &Arc<JobController>) -> std::io::Result<()> {
    let head = match tokio::time::timeout(READ_TIMEOUT, read_request_head(&mut stream)).await {
        Ok(head) => head?,
        Err(_) => {
            warn!("Client went quiet before finishing its request");
            return Ok(());
        }
    };

    let response = match parse_request_line(&head) {
        Some((method, target)) => {
            debug!(method = method, target = target, "API request");
            route(controller, method, target)
        }
        None => ApiResponse::json(400, &json!({ "error": "bad request" })),
    };

    stream.write_all(response.to_http().as_bytes()).await?;
    stream.shutdown().await
}

async fn read_request_head(stream: &mut TcpStream) -> std::io::Result<String> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") || buf.len() >= MAX_REQUEST_HEAD_BYTES {
            break;
        }
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn parse_request_line(head: &str) -> Option<(&str, &str)> {
    let mut parts = head.lines().next()?.split_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;
    Some((method, target))
}
