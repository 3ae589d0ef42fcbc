//! RPC client.

use crate::error::ClientError;
use crimp_pinch::{ApplicationException, Pinchable};
use crimp_protocol::{Message, MessageType, ProtocolOptions, Value};
use crimp_transport::{Channel, Transport, TransportError};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// An outgoing call: method name plus argument struct.
#[derive(Debug, Clone, PartialEq)]
pub struct TCall {
    pub name: String,
    pub payload: Value,
}

impl TCall {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Connect timeout for [`Client::connect`].
    pub connect_timeout: Duration,
    /// Disable Nagle's algorithm on the TCP stream.
    pub nodelay: bool,
    /// Message delimiting on the channel.
    pub transport: Transport,
    /// Parsing bounds for the channel.
    pub options: ProtocolOptions,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            nodelay: true,
            transport: Transport::Framed,
            options: ProtocolOptions::new(),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_options(mut self, options: ProtocolOptions) -> Self {
        self.options = options;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// An RPC client over a message channel.
///
/// Calls are strictly sequential: `call` takes `&mut self` and awaits the
/// reply before returning. Sharing a client across tasks requires an
/// external mutex; per-call timeouts are the caller's
/// (`tokio::time::timeout` around `call`).
pub struct Client<R, W> {
    channel: Channel<R, W>,
    next_seqid: i32,
}

impl Client<OwnedReadHalf, OwnedWriteHalf> {
    /// Connects over TCP.
    pub async fn connect(addr: SocketAddr, config: ClientConfig) -> Result<Self, ClientError> {
        tracing::debug!("connecting to {}", addr);
        let stream = tokio::time::timeout(config.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ClientError::ConnectTimeout)??;
        if config.nodelay {
            stream.set_nodelay(true).ok();
        }
        tracing::debug!("connected to {}", addr);
        let (reader, writer) = stream.into_split();
        Ok(Self::new(Channel::new(
            reader,
            writer,
            config.transport,
            config.options,
        )))
    }
}

impl<R, W> Client<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Wraps an existing channel.
    pub fn new(channel: Channel<R, W>) -> Self {
        Self {
            channel,
            next_seqid: 0,
        }
    }

    fn next_seqid(&mut self) -> i32 {
        self.next_seqid = self.next_seqid.wrapping_add(1);
        self.next_seqid
    }

    /// Sends a call and awaits its correlated reply, returning the reply
    /// payload.
    pub async fn call(&mut self, call: TCall) -> Result<Value, ClientError> {
        let seqid = self.next_seqid();
        tracing::debug!(method = %call.name, seqid, "sending call");
        self.channel
            .send(&Message::call(call.name, seqid, call.payload))
            .await?;

        let reply = match self.channel.recv().await {
            Ok(Some(reply)) => reply,
            Ok(None) => return Err(ClientError::Closed),
            Err(TransportError::Closed) => return Err(ClientError::Closed),
            Err(e) => return Err(e.into()),
        };

        // Exceptions are checked before the seqid: a server that failed to
        // decode the request cannot know the seqid it is answering.
        if reply.ty == MessageType::Exception {
            let exc = ApplicationException::unpinch(&reply.payload)?;
            tracing::debug!(seqid, "remote exception: {}", exc);
            return Err(ClientError::Remote(exc));
        }
        if reply.seqid != seqid {
            return Err(ClientError::SeqIdMismatch {
                expected: seqid,
                got: reply.seqid,
            });
        }
        match reply.ty {
            MessageType::Reply => Ok(reply.payload),
            other => Err(ClientError::UnexpectedReply(other)),
        }
    }

    /// Sends a oneway call; no reply is awaited.
    pub async fn oneway(&mut self, call: TCall) -> Result<(), ClientError> {
        let seqid = self.next_seqid();
        tracing::debug!(method = %call.name, seqid, "sending oneway");
        self.channel
            .send(&Message::oneway(call.name, seqid, call.payload))
            .await?;
        Ok(())
    }

    /// Shuts down the write half, letting the server observe a clean EOF.
    pub async fn close(&mut self) -> Result<(), ClientError> {
        self.channel.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crimp_pinch::{ExceptionKind, Pinchable};
    use tokio::io::{duplex, split, AsyncReadExt, DuplexStream, ReadHalf, WriteHalf};

    type TestChannel = Channel<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>;

    fn pair() -> (TestChannel, TestChannel) {
        let (a, b) = duplex(4096);
        let (ar, aw) = split(a);
        let (br, bw) = split(b);
        (
            Channel::new(ar, aw, Transport::Framed, ProtocolOptions::new()),
            Channel::new(br, bw, Transport::Framed, ProtocolOptions::new()),
        )
    }

    fn args() -> Value {
        Value::struct_from([(1, Value::Int32(5))])
    }

    #[tokio::test]
    async fn test_call_returns_reply_payload() {
        let (left, mut right) = pair();
        let mut client = Client::new(left);

        let peer = tokio::spawn(async move {
            let call = right.recv().await.unwrap().unwrap();
            assert_eq!(call.ty, MessageType::Call);
            let payload = Value::struct_from([(0, Value::Int32(99))]);
            right
                .send(&Message::reply(call.name, call.seqid, payload))
                .await
                .unwrap();
        });

        let reply = client.call(TCall::new("get", args())).await.unwrap();
        assert_eq!(reply, Value::struct_from([(0, Value::Int32(99))]));
        peer.await.unwrap();
    }

    #[tokio::test]
    async fn test_seqid_mismatch_detected() {
        let (left, mut right) = pair();
        let mut client = Client::new(left);

        let peer = tokio::spawn(async move {
            let call = right.recv().await.unwrap().unwrap();
            right
                .send(&Message::reply(call.name, call.seqid + 7, args()))
                .await
                .unwrap();
        });

        match client.call(TCall::new("get", args())).await {
            Err(ClientError::SeqIdMismatch { expected, got }) => {
                assert_eq!(got, expected + 7);
            }
            other => panic!("expected seqid mismatch, got {other:?}"),
        }
        peer.await.unwrap();
    }

    #[tokio::test]
    async fn test_remote_exception_surfaced() {
        let (left, mut right) = pair();
        let mut client = Client::new(left);

        let peer = tokio::spawn(async move {
            let call = right.recv().await.unwrap().unwrap();
            let exc = ApplicationException::new(ExceptionKind::InternalError, "kaboom");
            right
                .send(&Message::exception(call.name, call.seqid, exc.pinch()))
                .await
                .unwrap();
        });

        match client.call(TCall::new("get", args())).await {
            Err(ClientError::Remote(exc)) => {
                assert_eq!(exc.kind, ExceptionKind::InternalError);
                assert_eq!(exc.message.as_deref(), Some("kaboom"));
            }
            other => panic!("expected remote exception, got {other:?}"),
        }
        peer.await.unwrap();
    }

    #[tokio::test]
    async fn test_unexpected_reply_type() {
        let (left, mut right) = pair();
        let mut client = Client::new(left);

        let peer = tokio::spawn(async move {
            let call = right.recv().await.unwrap().unwrap();
            right
                .send(&Message::call(call.name, call.seqid, args()))
                .await
                .unwrap();
        });

        assert!(matches!(
            client.call(TCall::new("get", args())).await,
            Err(ClientError::UnexpectedReply(MessageType::Call))
        ));
        peer.await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_before_reply() {
        let (left, mut right) = pair();
        let mut client = Client::new(left);

        let peer = tokio::spawn(async move {
            let _ = right.recv().await.unwrap().unwrap();
            // Dropping the peer channel ends the stream without a reply.
        });

        assert!(matches!(
            client.call(TCall::new("get", args())).await,
            Err(ClientError::Closed)
        ));
        peer.await.unwrap();
    }

    #[tokio::test]
    async fn test_oneway_sends_without_reply() {
        let (left, mut right) = pair();
        let mut client = Client::new(left);

        client.oneway(TCall::new("notify", args())).await.unwrap();
        let got = right.recv().await.unwrap().unwrap();
        assert_eq!(got.ty, MessageType::Oneway);
        assert_eq!(got.name, "notify");
    }

    #[tokio::test]
    async fn test_seqids_increment_per_call() {
        let (left, mut right) = pair();
        let mut client = Client::new(left);

        let peer = tokio::spawn(async move {
            for expected in 1..=2 {
                let call = right.recv().await.unwrap().unwrap();
                assert_eq!(call.seqid, expected);
                right
                    .send(&Message::reply(call.name, call.seqid, args()))
                    .await
                    .unwrap();
            }
        });

        client.call(TCall::new("a", args())).await.unwrap();
        client.call(TCall::new("b", args())).await.unwrap();
        peer.await.unwrap();
    }

    #[tokio::test]
    async fn test_raw_bytes_use_strict_framing() {
        // The client's first call over a framed channel starts with the
        // frame length and the strict version word.
        let (a, b) = duplex(4096);
        let (ar, aw) = split(a);
        let mut client = Client::new(Channel::new(
            ar,
            aw,
            Transport::Framed,
            ProtocolOptions::new(),
        ));
        let (mut br, bw) = split(b);
        // No peer write half: the client sees EOF after sending.
        drop(bw);

        let peer = tokio::spawn(async move {
            let mut head = [0u8; 8];
            br.read_exact(&mut head).await.unwrap();
            assert_eq!(&head[4..8], &[0x80, 0x01, 0x00, 0x01]);
        });

        assert!(matches!(
            client.call(TCall::new("x", args())).await,
            Err(ClientError::Closed)
        ));
        peer.await.unwrap();
    }
}
