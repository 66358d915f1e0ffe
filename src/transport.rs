use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::settings::{TransportKind, TransportSettings};

/// Character link to the operator, as seen by the control loop.
pub trait Transport {
    fn is_connected(&self) -> bool;
    fn has_data(&mut self) -> bool;
    fn read_char(&mut self) -> Option<char>;
    fn write_line(&mut self, line: &str);
}

/// Control-loop end of a channel pair. Never blocks.
#[derive(Debug)]
pub struct ChannelTransport {
    connected: Arc<AtomicBool>,
    input: mpsc::UnboundedReceiver<char>,
    output: mpsc::UnboundedSender<String>,
    pending: Option<char>,
}

/// I/O end of a channel pair, driven by [`serve_tcp`] or [`serve_stdio`].
#[derive(Debug)]
pub struct TransportLink {
    connected: Arc<AtomicBool>,
    input: mpsc::UnboundedSender<char>,
    output: mpsc::UnboundedReceiver<String>,
}

pub fn channel() -> (ChannelTransport, TransportLink) {
    let connected = Arc::new(AtomicBool::new(false));
    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let (output_tx, output_rx) = mpsc::unbounded_channel();
    (
        ChannelTransport {
            connected: Arc::clone(&connected),
            input: input_rx,
            output: output_tx,
            pending: None,
        },
        TransportLink {
            connected,
            input: input_tx,
            output: output_rx,
        },
    )
}

impl Transport for ChannelTransport {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn has_data(&mut self) -> bool {
        if self.pending.is_none() {
            self.pending = self.input.try_recv().ok();
        }
        self.pending.is_some()
    }

    fn read_char(&mut self) -> Option<char> {
        self.pending.take().or_else(|| self.input.try_recv().ok())
    }

    fn write_line(&mut self, line: &str) {
        // The I/O side is gone only during shutdown.
        let _ = self.output.send(line.to_string());
    }
}

impl TransportLink {
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }

    #[cfg(test)]
    pub(crate) fn inject(&self, text: &str) {
        for c in text.chars() {
            let _ = self.input.send(c);
        }
    }

    #[cfg(test)]
    pub(crate) fn drain_output(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = self.output.try_recv() {
            lines.push(line);
        }
        lines
    }

    /// Drops replies queued for a client that is no longer there.
    fn discard_output(&mut self) {
        while self.output.try_recv().is_ok() {}
    }
}

pub async fn serve(settings: TransportSettings, link: TransportLink) -> anyhow::Result<()> {
    match settings.kind {
        TransportKind::Tcp => {
            let addr = settings.bind_addr()?;
            let listener = TcpListener::bind(addr)
                .await
                .with_context(|| format!("binding {addr}"))?;
            serve_tcp(listener, link).await
        }
        TransportKind::Stdio => serve_stdio(link).await,
    }
}

/// Accepts one client at a time. A new client is only accepted after the
/// previous one has gone away.
pub async fn serve_tcp(listener: TcpListener, mut link: TransportLink) -> anyhow::Result<()> {
    info!(addr = ?listener.local_addr()?, "Waiting for client...");
    loop {
        let (stream, peer) = listener.accept().await?;
        info!(%peer, "Client acquired");
        link.discard_output();
        link.set_connected(true);

        let (reader, writer) = stream.into_split();
        if let Err(e) = pump(reader, writer, &mut link).await {
            warn!(%peer, "Client error: {:#}", e);
        }

        link.set_connected(false);
        info!(%peer, "Connection terminated");
    }
}

/// Serial link analogue: the operator types into stdin. End of input counts
/// as losing the connection.
pub async fn serve_stdio(mut link: TransportLink) -> anyhow::Result<()> {
    info!("Reading commands from stdin");
    link.set_connected(true);
    let result = pump(tokio::io::stdin(), tokio::io::stdout(), &mut link).await;
    link.set_connected(false);
    info!("Connection terminated");
    result
}

/// Moves bytes in both directions until the reader reaches end of stream.
async fn pump<R, W>(mut reader: R, mut writer: W, link: &mut TransportLink) -> anyhow::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = [0u8; 64];
    loop {
        tokio::select! {
            read = reader.read(&mut buf) => {
                let n = read?;
                if n == 0 {
                    return Ok(());
                }
                for &byte in &buf[..n] {
                    link.input
                        .send(char::from(byte))
                        .context("control loop stopped")?;
                }
            }
            Some(line) = link.output.recv() => {
                writer.write_all(line.as_bytes()).await?;
                writer.write_all(b"\r\n").await?;
                writer.flush().await?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::AsyncBufReadExt;
    use tokio::net::TcpStream;

    #[test]
    fn test_channel_starts_disconnected() {
        let (transport, link) = channel();
        assert!(!transport.is_connected());
        link.set_connected(true);
        assert!(transport.is_connected());
    }

    #[test]
    fn test_has_data_does_not_consume() {
        let (mut transport, link) = channel();
        assert!(!transport.has_data());
        link.input.send('w').unwrap();
        link.input.send('q').unwrap();
        assert!(transport.has_data());
        assert!(transport.has_data());
        assert_eq!(transport.read_char(), Some('w'));
        assert_eq!(transport.read_char(), Some('q'));
        assert_eq!(transport.read_char(), None);
    }

    #[test]
    fn test_write_line_reaches_link() {
        let (mut transport, mut link) = channel();
        transport.write_line("Full stop");
        assert_eq!(link.output.try_recv().unwrap(), "Full stop");
        transport.write_line("stale");
        link.discard_output();
        assert!(link.output.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_tcp_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (mut transport, link) = channel();
        tokio::spawn(serve_tcp(listener, link));

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"w").await.unwrap();

        let mut received = None;
        for _ in 0..200 {
            if let Some(c) = transport.read_char() {
                received = Some(c);
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(received, Some('w'));
        assert!(transport.is_connected());

        transport.write_line("Accelerating forward.");
        let mut reply = String::new();
        tokio::io::BufReader::new(&mut client)
            .read_line(&mut reply)
            .await
            .unwrap();
        assert_eq!(reply, "Accelerating forward.\r\n");

        drop(client);
        for _ in 0..200 {
            if !transport.is_connected() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(!transport.is_connected());
    }
}
