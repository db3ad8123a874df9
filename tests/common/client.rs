//! Packet-level test client.
//!
//! Speaks the wire protocol over TCP using the shared schema registry,
//! with helpers for the handshake and for waiting on specific packets.

use futures_util::{SinkExt, StreamExt};
use palaver_proto::{Direction, FieldValue, FrameCodec, Packet, SchemaRegistry};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;

/// A test client connection.
pub struct TestClient {
    framed: Framed<TcpStream, FrameCodec>,
    registry: Arc<SchemaRegistry>,
}

impl TestClient {
    /// Connect to a test server.
    pub async fn connect(address: &str) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(address).await?;
        let registry = Arc::new(SchemaRegistry::builtin()?);
        let framed = Framed::new(
            stream,
            FrameCodec::new(Arc::clone(&registry), Direction::Clientbound),
        );
        Ok(Self { framed, registry })
    }

    /// Build a serverbound packet by name.
    pub fn packet(&self, name: &str, values: Vec<FieldValue>) -> anyhow::Result<Packet> {
        let desc = self
            .registry
            .by_name(Direction::Serverbound, name)
            .ok_or_else(|| anyhow::anyhow!("unknown serverbound packet {name:?}"))?;
        Ok(Packet::with_fields(Arc::clone(desc), values)?)
    }

    /// Send a serverbound packet by name.
    pub async fn send(&mut self, name: &str, values: Vec<FieldValue>) -> anyhow::Result<()> {
        let packet = self.packet(name, values)?;
        self.framed.send(packet).await?;
        Ok(())
    }

    /// Receive a single packet, with a default timeout.
    pub async fn recv(&mut self) -> anyhow::Result<Packet> {
        self.recv_timeout(Duration::from_secs(5)).await
    }

    /// Receive a single packet with a timeout.
    pub async fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<Packet> {
        match timeout(dur, self.framed.next()).await? {
            Some(packet) => Ok(packet?),
            None => anyhow::bail!("connection closed"),
        }
    }

    /// Receive packets until one matches the given name, returning it.
    /// Other packets (join announcements and the like) are discarded.
    pub async fn recv_named(&mut self, name: &str) -> anyhow::Result<Packet> {
        loop {
            let packet = self.recv().await?;
            if packet.descriptor().name == name {
                return Ok(packet);
            }
        }
    }

    /// Receive the next `response` packet and return (status, message).
    pub async fn recv_response(&mut self) -> anyhow::Result<(u8, String)> {
        let packet = self.recv_named("response").await?;
        let status = packet
            .uint_field("value")
            .ok_or_else(|| anyhow::anyhow!("response without status"))? as u8;
        let message = packet.str_field("message").unwrap_or_default().to_string();
        Ok((status, message))
    }

    /// Assert that nothing arrives within the given window.
    pub async fn expect_silence(&mut self, dur: Duration) -> anyhow::Result<()> {
        match timeout(dur, self.framed.next()).await {
            Err(_) => Ok(()),
            Ok(Some(Ok(packet))) => {
                anyhow::bail!("unexpected packet: {}", packet.descriptor().name)
            }
            Ok(Some(Err(err))) => anyhow::bail!("unexpected protocol error: {err}"),
            Ok(None) => anyhow::bail!("unexpected connection close"),
        }
    }

    /// Complete the connect handshake as `nick`.
    pub async fn handshake(&mut self, nick: &str) -> anyhow::Result<()> {
        self.send("connect", vec![nick.into()]).await?;
        let (status, message) = self.recv_response().await?;
        if status != 0 {
            anyhow::bail!("handshake rejected ({status}): {message}");
        }
        Ok(())
    }

    /// Send a slash command and return the (status, message) response.
    pub async fn command(&mut self, keyword: &str, args: &str) -> anyhow::Result<(u8, String)> {
        self.send("command", vec![keyword.into(), args.into()])
            .await?;
        self.recv_response().await
    }
}
