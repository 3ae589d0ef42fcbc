//! Method dispatch and the connection loop.

use crate::context::ConnContext;
use crate::error::{HandlerError, ServerError};
use crimp_pinch::{ApplicationException, ExceptionKind, Pinchable};
use crimp_protocol::{Message, MessageType, ProtocolError, Transport, Value};
use crimp_transport::{Channel, TransportError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};

/// A method handler: a function from connection context and call message
/// to a reply payload. Handlers are synchronous; only channel I/O
/// suspends.
pub type Handler =
    Arc<dyn Fn(&ConnContext, &Message) -> Result<Value, HandlerError> + Send + Sync>;

/// An immutable method-name to handler table, freely shareable across
/// connections.
#[derive(Clone, Default)]
pub struct Server {
    handlers: HashMap<String, Handler>,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    /// Looks up the handler for a method name.
    pub fn handler(&self, name: &str) -> Option<&Handler> {
        self.handlers.get(name)
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered method names, in no particular order.
    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

/// Builds a [`Server`] one method at a time.
#[derive(Default)]
pub struct ServerBuilder {
    handlers: HashMap<String, Handler>,
}

impl ServerBuilder {
    /// Registers a handler for a method name. A later registration under
    /// the same name replaces the earlier one.
    pub fn handler<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&ConnContext, &Message) -> Result<Value, HandlerError> + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Arc::new(handler));
        self
    }

    pub fn build(self) -> Server {
        Server {
            handlers: self.handlers,
        }
    }
}

// Frame-length corruption desynchronizes the stream; unlike a bad message
// body, it cannot be skipped.
fn frame_level(e: &ProtocolError) -> bool {
    matches!(
        e,
        ProtocolError::NegativeSize { field: "frame" }
            | ProtocolError::LimitExceeded { field: "frame", .. }
    )
}

/// Serves one connection: read a message, dispatch, reply, repeat.
///
/// Requests are processed sequentially in arrival order and replies mirror
/// that order. The loop ends `Ok(())` on a clean EOF from the peer.
/// Handler failures and unknown methods become `Exception` replies and the
/// connection stays open; transport failures are fatal.
pub async fn run_connection<R, W>(
    ctx: &ConnContext,
    server: &Server,
    channel: &mut Channel<R, W>,
) -> Result<(), ServerError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        let message = match channel.recv().await {
            Ok(Some(message)) => message,
            Ok(None) => {
                tracing::debug!(conn = %ctx.id(), "peer closed connection");
                return Ok(());
            }
            Err(TransportError::Protocol(e))
                if channel.transport() == Transport::Framed && !frame_level(&e) =>
            {
                // The malformed message's frame is already consumed, so
                // the stream is still in sync; answer and keep serving.
                // The seqid of the bad request is unknowable here.
                tracing::warn!(conn = %ctx.id(), "undecodable request: {e}");
                let exc = ApplicationException::new(ExceptionKind::ProtocolError, e.to_string());
                channel
                    .send(&Message::exception("", 0, exc.pinch()))
                    .await?;
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        ctx.note_request();
        match message.ty {
            MessageType::Call => {
                let reply = dispatch(ctx, server, &message);
                channel.send(&reply).await?;
            }
            MessageType::Oneway => match server.handler(&message.name) {
                Some(handler) => {
                    if let Err(e) = handler(ctx, &message) {
                        tracing::warn!(
                            conn = %ctx.id(),
                            method = %message.name,
                            "oneway handler failed: {e}"
                        );
                    }
                }
                None => {
                    tracing::warn!(
                        conn = %ctx.id(),
                        method = %message.name,
                        "oneway to unknown method"
                    );
                }
            },
            other => {
                tracing::warn!(conn = %ctx.id(), "peer sent a {other} message");
                let exc = ApplicationException::new(
                    ExceptionKind::InvalidMessageType,
                    format!("unexpected {other} message"),
                );
                channel
                    .send(&Message::exception(message.name, message.seqid, exc.pinch()))
                    .await?;
            }
        }
    }
}

fn dispatch(ctx: &ConnContext, server: &Server, message: &Message) -> Message {
    let Some(handler) = server.handler(&message.name) else {
        tracing::warn!(conn = %ctx.id(), method = %message.name, "unknown method");
        let exc = ApplicationException::unknown_method(&message.name);
        return Message::exception(message.name.clone(), message.seqid, exc.pinch());
    };
    match handler(ctx, message) {
        Ok(payload) => Message::reply(message.name.clone(), message.seqid, payload),
        Err(e) => {
            tracing::warn!(conn = %ctx.id(), method = %message.name, "handler failed: {e}");
            let exc = ApplicationException::new(ExceptionKind::InternalError, e.to_string());
            Message::exception(message.name.clone(), message.seqid, exc.pinch())
        }
    }
}
