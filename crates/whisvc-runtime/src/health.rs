//! Post-start health wait.

use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{debug, info};
use whisvc_core::settings::{BIND_ADDRESS, HEALTH_ROUTE};

const POLL_INTERVAL: Duration = Duration::from_millis(500);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Default time the service gets to load its model and answer.
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(30);

pub fn health_url(port: u16) -> String {
    format!("http://{BIND_ADDRESS}:{port}{HEALTH_ROUTE}")
}

/// Poll the service's health route until it answers 2xx or `timeout` passes.
///
/// A zero timeout skips the check and reports healthy.
pub async fn wait_for_health(port: u16, timeout: Duration) -> Result<(), String> {
    if timeout.is_zero() {
        return Ok(());
    }

    let url = health_url(port);
    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| e.to_string())?;

    let deadline = Instant::now() + timeout;
    let mut last_error = String::from("no response");
    while Instant::now() < deadline {
        match client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!(%url, "Service reported healthy");
                return Ok(());
            }
            Ok(resp) => last_error = format!("HTTP {}", resp.status()),
            Err(e) => last_error = e.to_string(),
        }
        debug!(%url, %last_error, "Service not healthy yet");
        sleep(POLL_INTERVAL).await;
    }

    Err(format!(
        "{url} did not report healthy within {}s ({last_error})",
        timeout.as_secs()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn zero_timeout_skips_check() {
        assert!(wait_for_health(1, Duration::ZERO).await.is_ok());
    }

    #[tokio::test]
    async fn healthy_listener_is_detected() {
        let listener = TcpListener::bind((BIND_ADDRESS, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok")
                    .await;
            }
        });

        wait_for_health(port, Duration::from_secs(5)).await.unwrap();
    }

    #[tokio::test]
    async fn closed_port_times_out() {
        let listener = TcpListener::bind((BIND_ADDRESS, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = wait_for_health(port, Duration::from_millis(600)).await.unwrap_err();
        assert!(err.contains(HEALTH_ROUTE));
    }
}
