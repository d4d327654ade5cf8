//! Shared utilities for integration and load testing.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use booking_resilience::booking::BookingService;
use booking_resilience::clock::{ManualClock, SharedClock};
use booking_resilience::config::ServiceConfig;
use booking_resilience::store::MemoryStore;

/// Start a programmable scraper-service stand-in on an ephemeral port.
///
/// `f` receives the request path and returns status and JSON body.
#[allow(dead_code)]
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let (read, mut write) = socket.into_split();
                let mut reader = BufReader::new(read);

                let mut request_line = String::new();
                if reader.read_line(&mut request_line).await.is_err() {
                    return;
                }
                let path = request_line
                    .split_whitespace()
                    .nth(1)
                    .unwrap_or("/")
                    .to_string();

                // Drain headers up to the blank line
                loop {
                    let mut line = String::new();
                    match reader.read_line(&mut line).await {
                        Ok(0) | Err(_) => break,
                        Ok(_) if line == "\r\n" => break,
                        Ok(_) => {}
                    }
                }

                let (status, body) = f(path).await;
                let status_text = match status {
                    200 => "200 OK",
                    404 => "404 Not Found",
                    500 => "500 Internal Server Error",
                    502 => "502 Bad Gateway",
                    503 => "503 Service Unavailable",
                    _ => "200 OK",
                };

                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_text,
                    body.len(),
                    body
                );
                let _ = write.write_all(response.as_bytes()).await;
                let _ = write.shutdown().await;
            });
        }
    });

    addr
}

/// JSON array of `n` catalog items.
#[allow(dead_code)]
pub fn catalog_json(n: usize) -> String {
    let items: Vec<_> = (0..n)
        .map(|i| {
            serde_json::json!({
                "id": format!("service-{i}"),
                "name": format!("Service {i}"),
                "price": "R$ 50,00",
                "duration_minutes": 30
            })
        })
        .collect();
    serde_json::Value::Array(items).to_string()
}

/// Defaults with a short retry schedule pointed at `base_url`.
#[allow(dead_code)]
pub fn test_config(base_url: &str) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.upstream.base_url = base_url.to_string();
    config.upstream.fetch_timeout_secs = 5;
    config.retries.max_attempts = 2;
    config.retries.timeout_schedule_ms = vec![1000, 1500];
    config
}

/// Booking service over an in-memory store on a manual clock.
#[allow(dead_code)]
pub fn http_service(config: &ServiceConfig) -> (BookingService, Arc<MemoryStore>, ManualClock) {
    let clock = ManualClock::new(1_700_000_000_000);
    let shared: SharedClock = Arc::new(clock.clone());
    let store = Arc::new(MemoryStore::with_clock(shared.clone(), None));
    let service = BookingService::with_http(config, store.clone(), shared).unwrap();
    (service, store, clock)
}
