//! TCP gateway: accept loop and session spawning.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::hub::Hub;
use crate::session;

/// Listens for connections and spawns one session task per socket.
pub struct Gateway {
    hub: Arc<Hub>,
    listener: TcpListener,
    next_id: AtomicU64,
}

impl Gateway {
    /// Bind the listener.
    pub async fn bind(hub: Arc<Hub>, addr: SocketAddr) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "Gateway listening");
        Ok(Self {
            hub,
            listener,
            next_id: AtomicU64::new(1),
        })
    }

    /// The bound address, useful when binding port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections forever.
    pub async fn run(self) -> std::io::Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let hub = Arc::clone(&self.hub);
                    tokio::spawn(session::run(hub, id, stream, addr));
                }
                Err(err) => {
                    // Transient accept failures (fd exhaustion and the like)
                    // should not take the listener down.
                    warn!(error = %err, "Accept failed");
                }
            }
        }
    }
}
