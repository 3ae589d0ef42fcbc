//! One-message-at-a-time byte channel.

use crate::error::TransportError;
use crimp_protocol::frame::{frame_message, MessageDecoder, Transport};
use crimp_protocol::{Message, ProtocolOptions};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Socket read chunk size (8 KiB).
pub const READ_BUFFER_SIZE: usize = 8 * 1024;

/// A protocol channel over a byte source and a byte sink.
///
/// The channel owns its buffers; the peer halves of a connection never
/// share state. Reads and writes are the only suspension points.
pub struct Channel<R, W> {
    reader: R,
    writer: W,
    transport: Transport,
    options: ProtocolOptions,
    decoder: MessageDecoder,
    read_buf: Vec<u8>,
}

impl<R, W> Channel<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W, transport: Transport, options: ProtocolOptions) -> Self {
        Self {
            reader,
            writer,
            transport,
            decoder: MessageDecoder::new(transport, options.clone()),
            options,
            read_buf: vec![0u8; READ_BUFFER_SIZE],
        }
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn options(&self) -> &ProtocolOptions {
        &self.options
    }

    /// Receives the next message.
    ///
    /// Returns `Ok(None)` on a clean end of stream. End of stream with a
    /// partial message buffered is [`TransportError::TruncatedFrame`].
    pub async fn recv(&mut self) -> Result<Option<Message>, TransportError> {
        loop {
            if let Some(message) = self.decoder.decode_message()? {
                tracing::debug!(
                    name = %message.name,
                    ty = %message.ty,
                    seqid = message.seqid,
                    "received message"
                );
                return Ok(Some(message));
            }
            let n = self.reader.read(&mut self.read_buf).await?;
            if n == 0 {
                let buffered = self.decoder.buffered();
                if buffered == 0 {
                    tracing::debug!("peer closed the channel");
                    return Ok(None);
                }
                return Err(TransportError::TruncatedFrame { buffered });
            }
            self.decoder.extend(&self.read_buf[..n]);
        }
    }

    /// Sends one message as a single logical write, then flushes.
    pub async fn send(&mut self, message: &Message) -> Result<(), TransportError> {
        let bytes = frame_message(message, self.transport, &self.options)?;
        self.writer.write_all(&bytes).await?;
        self.writer.flush().await?;
        tracing::debug!(
            name = %message.name,
            ty = %message.ty,
            seqid = message.seqid,
            len = bytes.len(),
            "sent message"
        );
        Ok(())
    }

    /// Shuts down the write half, signalling end of stream to the peer.
    pub async fn shutdown(&mut self) -> Result<(), TransportError> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crimp_protocol::Value;
    use tokio::io::duplex;

    fn sample_message(seqid: i32) -> Message {
        Message::call(
            "echo",
            seqid,
            Value::struct_from([(1, Value::text("payload"))]),
        )
    }

    async fn roundtrip_over(transport: Transport) {
        let (a, b) = duplex(1024);
        let (ar, aw) = tokio::io::split(a);
        let (br, bw) = tokio::io::split(b);
        let mut left = Channel::new(ar, aw, transport, ProtocolOptions::new());
        let mut right = Channel::new(br, bw, transport, ProtocolOptions::new());

        let msg = sample_message(3);
        left.send(&msg).await.unwrap();
        assert_eq!(right.recv().await.unwrap(), Some(msg));

        left.shutdown().await.unwrap();
        assert!(right.recv().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_framed_roundtrip_and_clean_eof() {
        roundtrip_over(Transport::Framed).await;
    }

    #[tokio::test]
    async fn test_unframed_roundtrip_and_clean_eof() {
        roundtrip_over(Transport::Unframed).await;
    }

    #[tokio::test]
    async fn test_truncated_frame_on_partial_eof() {
        let (a, b) = duplex(1024);
        let (_ar, mut aw) = tokio::io::split(a);
        let (br, bw) = tokio::io::split(b);
        let mut right = Channel::new(br, bw, Transport::Framed, ProtocolOptions::new());

        let bytes = frame_message(
            &sample_message(1),
            Transport::Framed,
            &ProtocolOptions::new(),
        )
        .unwrap();
        aw.write_all(&bytes[..bytes.len() - 2]).await.unwrap();
        aw.shutdown().await.unwrap();

        match right.recv().await {
            Err(TransportError::TruncatedFrame { buffered }) => {
                assert_eq!(buffered, bytes.len() - 2)
            }
            other => panic!("expected truncated frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_sequential_messages() {
        let (a, b) = duplex(1024);
        let (ar, aw) = tokio::io::split(a);
        let (br, bw) = tokio::io::split(b);
        let mut left = Channel::new(ar, aw, Transport::Framed, ProtocolOptions::new());
        let mut right = Channel::new(br, bw, Transport::Framed, ProtocolOptions::new());

        for seqid in 1..=3 {
            left.send(&sample_message(seqid)).await.unwrap();
        }
        for seqid in 1..=3 {
            let got = right.recv().await.unwrap().unwrap();
            assert_eq!(got.seqid, seqid);
        }
    }
}
