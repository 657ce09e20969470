//! Common test utilities for integration tests.
//!
//! Provides `TestRelay`, which runs the real relay on an ephemeral port, and
//! `TestSession`, a websocket client speaking the producer protocol.
//!
//! # Example
//!
//! ```rust,ignore
//! #[tokio::test]
//! async fn test_health() {
//!     let relay = TestRelay::builder().start().await.unwrap();
//!
//!     let resp = relay.get("/health").await.unwrap();
//!     assert_eq!(resp.status(), 200);
//! }
//! ```

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use grabwire::config::{Config, LimitSettings, StoreSettings};

// ============================================================================
// TestRelay
// ============================================================================

/// A relay instance bound to an ephemeral port for the duration of a test.
///
/// The server task is shut down when the relay is dropped; call
/// [`TestRelay::shutdown`] instead to wait for a clean stop.
pub struct TestRelay {
    addr: SocketAddr,
    server_handle: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    client: reqwest::Client,
}

/// Builder for [`TestRelay`] with store and limit overrides.
pub struct TestRelayBuilder {
    store: StoreSettings,
    limits: LimitSettings,
}

impl Default for TestRelayBuilder {
    fn default() -> Self {
        Self {
            store: StoreSettings {
                capacity: 50,
                ttl_ms: 60_000,
                sweep_interval_ms: 60_000,
            },
            limits: LimitSettings::default(),
        }
    }
}

impl TestRelayBuilder {
    #[allow(dead_code)]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.store.capacity = capacity;
        self
    }

    #[allow(dead_code)]
    pub fn with_ttl_ms(mut self, ttl_ms: i64) -> Self {
        self.store.ttl_ms = ttl_ms;
        self
    }

    #[allow(dead_code)]
    pub fn with_sweep_interval_ms(mut self, sweep_interval_ms: u64) -> Self {
        self.store.sweep_interval_ms = sweep_interval_ms;
        self
    }

    #[allow(dead_code)]
    pub fn with_max_body_len(mut self, max_body_len: usize) -> Self {
        self.limits.max_body_len = max_body_len;
        self
    }

    /// Binds an ephemeral port, starts the relay on it, and waits for the
    /// health endpoint to come up.
    pub async fn start(self) -> anyhow::Result<TestRelay> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind ephemeral port")?;
        let addr = listener.local_addr()?;

        let config = Config {
            store: self.store,
            limits: self.limits,
            ..Config::default()
        };

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server_handle = tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            if let Err(err) = grabwire::http::serve_on(listener, config, shutdown).await {
                eprintln!("test relay exited with error: {err}");
            }
        });

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;

        // Poll the health endpoint until the server accepts requests.
        let health_url = format!("http://{addr}/health");
        let mut ready = false;
        for _ in 0..50 {
            if server_handle.is_finished() {
                anyhow::bail!("relay task exited during startup");
            }
            match client.get(&health_url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    ready = true;
                    break;
                }
                _ => tokio::time::sleep(Duration::from_millis(100)).await,
            }
        }
        if !ready {
            server_handle.abort();
            anyhow::bail!("relay did not become healthy within five seconds");
        }

        Ok(TestRelay {
            addr,
            server_handle,
            shutdown_tx: Some(shutdown_tx),
            client,
        })
    }
}

impl TestRelay {
    pub fn builder() -> TestRelayBuilder {
        TestRelayBuilder::default()
    }

    #[allow(dead_code)]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Full HTTP URL for a path on this relay.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Websocket URL for the producer endpoint.
    #[allow(dead_code)]
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    #[allow(dead_code)]
    pub async fn get(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.client.get(self.url(path)).send().await
    }

    #[allow(dead_code)]
    pub async fn post_json(&self, path: &str, body: &Value) -> reqwest::Result<reqwest::Response> {
        self.client.post(self.url(path)).json(body).send().await
    }

    /// Invokes a tool through the tool-call endpoint and returns the decoded
    /// response body along with the HTTP status.
    #[allow(dead_code)]
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> anyhow::Result<(reqwest::StatusCode, Value)> {
        let resp = self
            .post_json(
                "/api/tools/call",
                &json!({ "name": name, "arguments": arguments }),
            )
            .await?;
        let status = resp.status();
        let body = resp.json::<Value>().await?;
        Ok((status, body))
    }

    /// Opens a websocket producer session against this relay.
    ///
    /// The capabilities greeting is left unread so tests can assert on it.
    #[allow(dead_code)]
    pub async fn connect_session(&self) -> anyhow::Result<TestSession> {
        let (stream, _) = connect_async(self.ws_url())
            .await
            .context("websocket connect failed")?;
        Ok(TestSession { stream })
    }

    /// Stops the relay and waits for the server task to finish.
    #[allow(dead_code)]
    pub async fn shutdown(mut self) -> anyhow::Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        tokio::time::timeout(Duration::from_secs(5), &mut self.server_handle)
            .await
            .context("relay did not stop within five seconds")??;
        Ok(())
    }
}

impl Drop for TestRelay {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.server_handle.abort();
    }
}

// ============================================================================
// TestSession
// ============================================================================

/// A websocket client connected to the relay's producer endpoint.
#[allow(dead_code)]
pub struct TestSession {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[allow(dead_code)]
impl TestSession {
    /// Sends one JSON frame.
    pub async fn send(&mut self, frame: &Value) -> anyhow::Result<()> {
        self.stream
            .send(Message::Text(frame.to_string().into()))
            .await
            .context("websocket send failed")?;
        Ok(())
    }

    /// Sends a binary frame, which the relay rejects with an error reply.
    pub async fn send_binary(&mut self, bytes: Vec<u8>) -> anyhow::Result<()> {
        self.stream
            .send(Message::Binary(bytes.into()))
            .await
            .context("websocket send failed")?;
        Ok(())
    }

    /// Receives the next text frame as JSON, skipping control frames.
    ///
    /// Fails if nothing arrives within two seconds.
    pub async fn recv(&mut self) -> anyhow::Result<Value> {
        let deadline = Duration::from_secs(2);
        loop {
            let frame = tokio::time::timeout(deadline, self.stream.next())
                .await
                .context("timed out waiting for a frame")?;
            match frame {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str(text.as_str()).context("non-JSON text frame");
                }
                Some(Ok(Message::Close(_))) | None => {
                    anyhow::bail!("connection closed while waiting for a frame")
                }
                Some(Ok(_)) => continue,
                Some(Err(err)) => return Err(err).context("websocket receive failed"),
            }
        }
    }

    /// Receives the next frame and asserts its `kind` tag.
    pub async fn expect_kind(&mut self, kind: &str) -> anyhow::Result<Value> {
        let frame = self.recv().await?;
        anyhow::ensure!(
            frame["kind"] == kind,
            "expected a {kind:?} frame, got: {frame}"
        );
        Ok(frame)
    }

    /// Asserts that no text frame arrives within the given window.
    pub async fn assert_silent(&mut self, window: Duration) {
        let deadline = tokio::time::Instant::now() + window;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return;
            }
            match tokio::time::timeout(remaining, self.stream.next()).await {
                Err(_) => return,
                Ok(Some(Ok(Message::Text(text)))) => {
                    panic!("expected no frames, got: {}", text.as_str());
                }
                Ok(Some(Ok(_))) => continue,
                Ok(Some(Err(err))) => panic!("websocket error while waiting: {err}"),
                Ok(None) => return,
            }
        }
    }

    /// Closes the session cleanly.
    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// A minimal valid record payload for `submit-record` frames.
#[allow(dead_code)]
pub fn raw_record(id: &str) -> Value {
    json!({
        "id": id,
        "capturedAt": 1_700_000_000_000_i64,
        "sourceRef": "https://example.test/page",
        "label": format!("label-{id}"),
        "body": format!("body text for {id}"),
        "excerpt": format!("excerpt for {id}"),
    })
}

/// A `submit-record` frame wrapping [`raw_record`].
#[allow(dead_code)]
pub fn submit_frame(id: &str) -> Value {
    json!({ "kind": "submit-record", "record": raw_record(id) })
}
