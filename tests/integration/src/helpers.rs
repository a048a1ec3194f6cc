//! Test helpers for integration tests
//!
//! Provides a gateway server bound to an ephemeral port and a JSON WebSocket
//! client for talking to it.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use futures_util::{SinkExt, StreamExt};
use relay_common::AppConfig;
use relay_gateway::{create_app, run_server, GatewayState};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// How long a client waits for an expected frame
pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// How long a client waits to conclude nothing more is coming
pub const QUIET_PERIOD: Duration = Duration::from_millis(200);

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub state: GatewayState,
    pub http: reqwest::Client,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a server with default configuration
    pub async fn start() -> Result<Self> {
        Self::start_with_config(crate::test_config()).await
    }

    /// Start a server with custom config
    pub async fn start_with_config(config: AppConfig) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let state = GatewayState::new(config);
        let app = create_app(state.clone());

        let (shutdown, signal) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let shutdown = async move {
                let _ = signal.await;
            };
            run_server(listener, app, shutdown).await.ok();
        });

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            addr,
            state,
            http,
            shutdown: Some(shutdown),
            handle,
        })
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the WebSocket URL of the relay endpoint
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws/game", self.addr)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.http.get(&url).send().await?)
    }

    /// Connect a client and consume its greeting
    pub async fn join(&self) -> Result<TestClient> {
        let mut client = TestClient::connect(&self.ws_url()).await?;
        client.read_greeting().await?;
        Ok(client)
    }

    /// Wait until the store holds exactly `count` sessions
    pub async fn wait_for_sessions(&self, count: usize) -> Result<()> {
        let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
        while self.state.store().len() != count {
            if tokio::time::Instant::now() >= deadline {
                bail!(
                    "expected {count} sessions, found {}",
                    self.state.store().len()
                );
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        Ok(())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        self.handle.abort();
    }
}

/// A participant speaking JSON over a real WebSocket
pub struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    /// Id assigned by the server, known once the greeting was read
    pub id: Option<String>,
}

impl TestClient {
    /// Open a WebSocket without reading anything
    pub async fn connect(url: &str) -> Result<Self> {
        let (ws, _response) = connect_async(url)
            .await
            .with_context(|| format!("connecting to {url}"))?;
        Ok(Self { ws, id: None })
    }

    /// The server-assigned id
    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }

    /// Read `player_id` and `world_state`, returning the world's `players`
    pub async fn read_greeting(&mut self) -> Result<Value> {
        let hello = self.expect_type("player_id").await?;
        let id = hello["playerId"]
            .as_str()
            .context("player_id without playerId")?
            .to_string();

        let world = self.expect_type("world_state").await?;
        if world["playerId"] != id.as_str() {
            bail!("world_state for {} after player_id {id}", world["playerId"]);
        }

        self.id = Some(id);
        Ok(world["players"].clone())
    }

    /// Send a JSON value as a text frame
    pub async fn send_json(&mut self, value: &Value) -> Result<()> {
        self.send_text(&value.to_string()).await
    }

    /// Send a raw text frame
    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.ws.send(Message::Text(text.to_string())).await?;
        Ok(())
    }

    /// Send a raw binary frame
    pub async fn send_binary(&mut self, data: Vec<u8>) -> Result<()> {
        self.ws.send(Message::Binary(data)).await?;
        Ok(())
    }

    /// Next JSON text frame, waiting at most `timeout`; `None` on timeout
    async fn next_json(&mut self, timeout: Duration) -> Result<Option<Value>> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let frame = match tokio::time::timeout_at(deadline, self.ws.next()).await {
                Err(_) => return Ok(None),
                Ok(None) => bail!("connection closed"),
                Ok(Some(frame)) => frame?,
            };
            match frame {
                Message::Text(text) => return Ok(Some(serde_json::from_str(&text)?)),
                Message::Close(_) => bail!("server closed the connection"),
                _ => {}
            }
        }
    }

    /// Receive the next JSON message
    pub async fn recv_json(&mut self) -> Result<Value> {
        self.next_json(RECV_TIMEOUT)
            .await?
            .context("timed out waiting for a message")
    }

    /// Receive the next message and check its `type`
    pub async fn expect_type(&mut self, kind: &str) -> Result<Value> {
        let msg = self.recv_json().await?;
        if msg["type"] != kind {
            bail!("expected {kind}, got {msg}");
        }
        Ok(msg)
    }

    /// Skip messages until one of type `kind` arrives
    pub async fn wait_for_type(&mut self, kind: &str) -> Result<Value> {
        loop {
            let msg = self.recv_json().await?;
            if msg["type"] == kind {
                return Ok(msg);
            }
        }
    }

    /// Fail if any message arrives within the quiet period
    pub async fn assert_silent(&mut self) -> Result<()> {
        if let Some(msg) = self.next_json(QUIET_PERIOD).await? {
            bail!("expected no message, got {msg}");
        }
        Ok(())
    }

    /// Close the connection politely
    pub async fn close(mut self) -> Result<()> {
        self.ws.close(None).await?;
        Ok(())
    }
}
