//! Frame transport.
//!
//! The driver talks to the adapter through a pair of frame channels. Any
//! byte stream can back them via [`spawn_stream_transport`], which runs the
//! UNPI codec in a background task.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};
use zstack_unpi::{Frame, FrameCodec};

/// Capacity of each direction of a transport.
pub const TRANSPORT_CHANNEL_CAPACITY: usize = 256;

/// Outbound and inbound frame channels connected to an adapter.
#[derive(Debug)]
pub struct FrameTransport {
    pub outbound: mpsc::Sender<Frame>,
    pub inbound: mpsc::Receiver<Frame>,
}

impl FrameTransport {
    pub fn new(outbound: mpsc::Sender<Frame>, inbound: mpsc::Receiver<Frame>) -> Self {
        FrameTransport { outbound, inbound }
    }
}

/// The far end of a [`FrameTransport`]: what the adapter side sees.
#[derive(Debug)]
pub struct AdapterEnd {
    /// Frames written by the driver.
    pub from_host: mpsc::Receiver<Frame>,
    /// Frames delivered to the driver.
    pub to_host: mpsc::Sender<Frame>,
}

/// Create a connected transport and adapter end backed by in-memory channels.
pub fn channel_transport(capacity: usize) -> (FrameTransport, AdapterEnd) {
    let (outbound, from_host) = mpsc::channel(capacity);
    let (to_host, inbound) = mpsc::channel(capacity);
    (
        FrameTransport::new(outbound, inbound),
        AdapterEnd { from_host, to_host },
    )
}

/// Run the UNPI codec over a byte stream.
///
/// The returned task ends when the stream reaches EOF, a read or write fails,
/// or both channel ends are dropped.
pub fn spawn_stream_transport<S>(stream: S) -> (FrameTransport, JoinHandle<std::io::Result<()>>)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (transport, adapter) = channel_transport(TRANSPORT_CHANNEL_CAPACITY);
    let handle = tokio::spawn(run_stream(stream, adapter));
    (transport, handle)
}

async fn run_stream<S>(stream: S, adapter: AdapterEnd) -> std::io::Result<()>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let AdapterEnd {
        mut from_host,
        to_host,
    } = adapter;
    let (mut reader, mut writer) = tokio::io::split(stream);
    let mut codec = FrameCodec::new();
    let mut read_buf = [0u8; 1024];

    loop {
        tokio::select! {
            result = reader.read(&mut read_buf) => {
                let n = result?;
                if n == 0 {
                    debug!("stream closed by adapter");
                    return Ok(());
                }
                trace!(bytes = %hex::encode(&read_buf[..n]), "received");
                codec.push(&read_buf[..n]);

                loop {
                    match codec.decode() {
                        Ok(Some(frame)) => {
                            if to_host.send(frame).await.is_err() {
                                return Ok(());
                            }
                        }
                        Ok(None) => break,
                        Err(e) => warn!(error = %e, "dropping malformed frame"),
                    }
                }
            }

            frame = from_host.recv() => {
                let Some(frame) = frame else {
                    return Ok(());
                };
                match FrameCodec::encode(&frame) {
                    Ok(bytes) => {
                        trace!(bytes = %hex::encode(&bytes), "sending");
                        writer.write_all(&bytes).await?;
                        writer.flush().await?;
                    }
                    Err(e) => warn!(error = %e, "refusing to send frame"),
                }
            }
        }
    }
}
