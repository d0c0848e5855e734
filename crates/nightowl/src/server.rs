//! `NightowlServer` builder and accept loop.
//!
//! This is the entry point for running a Nightowl server. It ties
//! together all the layers: transport → protocol → session → match, with
//! the core dispatcher in the middle.

use std::sync::Arc;
use std::time::Duration;

use nightowl_clock::{AccessWindowGate, Clock, SystemClock, TickConfig};
use nightowl_protocol::{Codec, JsonCodec};
use nightowl_transport::{Incoming, Transport, WebSocketTransport};

use crate::NightowlError;
use crate::coordinator::Core;
use crate::dispatcher::{CoreHandle, spawn_core};
use crate::handler::handle_connection;

/// Default bound of the dispatcher's command queue.
pub const DEFAULT_COMMAND_BUFFER: usize = 1024;

/// Default time a new socket gets to complete the WebSocket upgrade.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Builder for configuring and starting a Nightowl server.
///
/// # Example
///
/// ```rust,ignore
/// use nightowl::prelude::*;
///
/// let server = NightowlServer::builder()
///     .bind("0.0.0.0:3000")
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct NightowlServerBuilder {
    bind_addr: String,
    tick: TickConfig,
    command_buffer: usize,
    handshake_timeout: Duration,
    gate: AccessWindowGate,
}

impl NightowlServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            tick: TickConfig::default(),
            command_buffer: DEFAULT_COMMAND_BUFFER,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            gate: AccessWindowGate::new(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the presence broadcast period. Zero disables it.
    pub fn presence_period(mut self, period: Duration) -> Self {
        self.tick.period = period;
        self
    }

    /// Adds a random delay of up to `jitter` before the first presence tick.
    pub fn presence_jitter(mut self, jitter: Duration) -> Self {
        self.tick.initial_jitter = jitter;
        self
    }

    pub fn command_buffer(mut self, size: usize) -> Self {
        self.command_buffer = size;
        self
    }

    /// Sets how long a new socket may take to finish the WebSocket
    /// upgrade before it is dropped.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Replaces the access window gate, e.g. to evaluate it in another zone.
    pub fn gate(mut self, gate: AccessWindowGate) -> Self {
        self.gate = gate;
        self
    }

    /// Binds the listener and starts the core on the system clock.
    pub async fn build(self) -> Result<NightowlServer<JsonCodec>, NightowlError> {
        self.build_with_clock(SystemClock).await
    }

    /// Binds the listener and starts the core on the given clock.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn build_with_clock(
        self,
        clock: impl Clock,
    ) -> Result<NightowlServer<JsonCodec>, NightowlError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let core = spawn_core(Core::new(self.gate), clock, self.tick, self.command_buffer);

        Ok(NightowlServer {
            transport,
            core,
            codec: Arc::new(JsonCodec),
            handshake_timeout: self.handshake_timeout,
        })
    }
}

impl Default for NightowlServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Nightowl server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct NightowlServer<C: Codec> {
    transport: WebSocketTransport,
    core: CoreHandle,
    codec: Arc<C>,
    handshake_timeout: Duration,
}

impl NightowlServer<JsonCodec> {
    pub fn builder() -> NightowlServerBuilder {
        NightowlServerBuilder::new()
    }
}

impl<C: Codec> NightowlServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// A handle to the core, for stats or shutdown.
    pub fn handle(&self) -> CoreHandle {
        self.core.clone()
    }

    /// Runs the accept loop, spawning a handler task per connection.
    ///
    /// The WebSocket upgrade runs on the spawned task under the handshake
    /// timeout, so a peer that stalls mid-handshake only costs its own task.
    ///
    /// # Errors
    /// Returns [`NightowlError::CoreUnavailable`] once the core has shut
    /// down and the next connection arrives.
    pub async fn run(mut self) -> Result<(), NightowlError> {
        match self.local_addr() {
            Ok(addr) => tracing::info!(%addr, "Nightowl server running"),
            Err(_) => tracing::info!("Nightowl server running"),
        }

        loop {
            match self.transport.accept().await {
                Ok(incoming) => {
                    let core = self.core.clone();
                    let codec = Arc::clone(&self.codec);
                    let handshake_timeout = self.handshake_timeout;
                    tokio::spawn(async move {
                        let addr = incoming.peer_addr();
                        let upgrade = tokio::time::timeout(handshake_timeout, incoming.upgrade());
                        let conn = match upgrade.await {
                            Ok(Ok(conn)) => conn,
                            Ok(Err(e)) => {
                                tracing::debug!(%addr, error = %e, "handshake failed");
                                return;
                            }
                            Err(_) => {
                                tracing::debug!(%addr, "handshake timed out");
                                return;
                            }
                        };
                        if let Err(e) = handle_connection(conn, core, codec).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }

            if self.core.is_closed() {
                return Err(NightowlError::CoreUnavailable);
            }
        }
    }
}
