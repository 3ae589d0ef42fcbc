//! TCP accept loop.

use crate::context::ConnContext;
use crate::error::ServerError;
use crate::server::{run_connection, Server};
use crimp_protocol::{ProtocolOptions, Transport};
use crimp_transport::Channel;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

/// TCP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Message delimiting for accepted connections.
    pub transport: Transport,
    /// Parsing bounds for accepted connections.
    pub options: ProtocolOptions,
    /// Maximum concurrent connections.
    pub max_connections: usize,
}

impl ServerConfig {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            transport: Transport::Framed,
            options: ProtocolOptions::new(),
            max_connections: 1024,
        }
    }

    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_options(mut self, options: ProtocolOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("127.0.0.1:9090".parse().unwrap())
    }
}

/// Server statistics.
#[derive(Debug, Default)]
pub struct ServerStats {
    pub connections_total: AtomicU64,
    pub connections_active: AtomicU64,
    pub errors_total: AtomicU64,
}

/// Runs a [`Server`] over TCP: one task per accepted connection.
pub struct TcpServer {
    config: ServerConfig,
    server: Arc<Server>,
    stats: Arc<ServerStats>,
    shutdown: broadcast::Sender<()>,
}

impl TcpServer {
    pub fn new(config: ServerConfig, server: Server) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            server: Arc::new(server),
            stats: Arc::new(ServerStats::default()),
            shutdown: shutdown_tx,
        }
    }

    pub fn stats(&self) -> Arc<ServerStats> {
        self.stats.clone()
    }

    /// Signals the accept loop and every connection task to stop.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(());
    }

    /// Binds the configured address and accepts connections until
    /// shutdown.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Accepts connections from an already-bound listener.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        tracing::info!("server listening on {}", listener.local_addr()?);
        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            if self.stats.connections_active.load(Ordering::Relaxed)
                                >= self.config.max_connections as u64
                            {
                                tracing::warn!("connection limit reached, rejecting {}", addr);
                                continue;
                            }
                            self.stats.connections_total.fetch_add(1, Ordering::Relaxed);
                            self.stats.connections_active.fetch_add(1, Ordering::Relaxed);
                            stream.set_nodelay(true).ok();

                            let server = self.server.clone();
                            let stats = self.stats.clone();
                            let transport = self.config.transport;
                            let options = self.config.options.clone();
                            let mut conn_shutdown = self.shutdown.subscribe();

                            tokio::spawn(async move {
                                let ctx = ConnContext::new(Some(addr));
                                tracing::info!(conn = %ctx.id(), "client connected: {}", addr);

                                let (reader, writer) = stream.into_split();
                                let mut channel =
                                    Channel::new(reader, writer, transport, options);
                                let result = tokio::select! {
                                    result = run_connection(&ctx, &server, &mut channel) => result,
                                    _ = conn_shutdown.recv() => Ok(()),
                                };
                                if let Err(e) = result {
                                    stats.errors_total.fetch_add(1, Ordering::Relaxed);
                                    tracing::debug!(conn = %ctx.id(), "connection error: {}", e);
                                }
                                stats.connections_active.fetch_sub(1, Ordering::Relaxed);
                                tracing::info!(conn = %ctx.id(), "client disconnected: {}", addr);
                            });
                        }
                        Err(e) => {
                            tracing::error!("accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("server shutting down");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use crimp_client::{Client, ClientConfig, TCall};
    use crimp_protocol::Value;

    fn echo_server() -> Server {
        Server::builder()
            .handler("echo", |_ctx, msg| Ok(msg.payload.clone()))
            .build()
    }

    #[tokio::test]
    async fn test_tcp_roundtrip_and_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let tcp = Arc::new(TcpServer::new(ServerConfig::new(addr), echo_server()));
        let stats = tcp.stats();

        let running = tcp.clone();
        let handle = tokio::spawn(async move { running.serve(listener).await });

        let mut client = Client::connect(addr, ClientConfig::new()).await.unwrap();
        let payload = Value::struct_from([(1, Value::text("over tcp"))]);
        let reply = client
            .call(TCall::new("echo", payload.clone()))
            .await
            .unwrap();
        assert_eq!(reply, payload);
        client.close().await.unwrap();

        tcp.shutdown();
        handle.await.unwrap().unwrap();
        assert_eq!(stats.connections_total.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_handler_failure_counted_once_not_fatal() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Server::builder()
            .handler("fail", |_ctx, _msg| -> Result<Value, HandlerError> {
                Err(HandlerError::new("nope"))
            })
            .build();
        let tcp = Arc::new(TcpServer::new(ServerConfig::new(addr), server));

        let running = tcp.clone();
        let handle = tokio::spawn(async move { running.serve(listener).await });

        let mut client = Client::connect(addr, ClientConfig::new()).await.unwrap();
        // Two failing calls on one connection: still answered, still open.
        for _ in 0..2 {
            assert!(client
                .call(TCall::new("fail", Value::struct_from([])))
                .await
                .is_err());
        }
        client.close().await.unwrap();

        tcp.shutdown();
        handle.await.unwrap().unwrap();
        // Handler failures are replies, not connection errors.
        assert_eq!(tcp.stats().errors_total.load(Ordering::Relaxed), 0);
    }
}
