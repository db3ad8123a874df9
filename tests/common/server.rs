//! Test server management.
//!
//! Spawns and manages palaverd instances for integration testing.

use std::path::PathBuf;
use std::process::{Child, Command};
use std::time::Duration;
use tokio::time::sleep;

/// A test server instance.
pub struct TestServer {
    child: Child,
    port: u16,
    data_dir: PathBuf,
}

impl TestServer {
    /// Spawn a test server on the given port with default settings.
    pub async fn spawn(port: u16) -> anyhow::Result<Self> {
        Self::spawn_with_idle(port, 300).await
    }

    /// Spawn a test server with a custom idle timeout.
    pub async fn spawn_with_idle(port: u16, idle_secs: u64) -> anyhow::Result<Self> {
        let data_dir = std::env::temp_dir().join(format!("palaverd-test-{}", port));
        std::fs::create_dir_all(&data_dir)?;

        let config_path = data_dir.join("config.toml");
        let config_content = format!(
            r#"
[server]
name = "testnet"
listen = "127.0.0.1:{port}"

[limits]
max_message_len = 512
max_frame_len = 16384

[timeouts]
idle_secs = {idle_secs}

[database]
path = "{}/test.db"
"#,
            data_dir.display()
        );
        std::fs::write(&config_path, config_content)?;

        // Binary lives in the workspace target dir.
        let binary_path =
            PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("target/debug/palaverd");

        let child = Command::new(&binary_path)
            .arg(config_path.to_str().unwrap())
            .spawn()?;

        let server = Self {
            child,
            port,
            data_dir,
        };
        server.wait_until_ready().await?;
        Ok(server)
    }

    /// Wait until the server is accepting connections.
    async fn wait_until_ready(&self) -> anyhow::Result<()> {
        for _ in 0..30 {
            if tokio::net::TcpStream::connect(("127.0.0.1", self.port))
                .await
                .is_ok()
            {
                return Ok(());
            }
            sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("Server failed to start within 3 seconds")
    }

    /// The server address.
    pub fn address(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    /// Connect a test client and complete the handshake as `nick`.
    pub async fn connect(&self, nick: &str) -> anyhow::Result<super::client::TestClient> {
        let mut client = super::client::TestClient::connect(&self.address()).await?;
        client.handshake(nick).await?;
        Ok(client)
    }

    /// Connect a raw test client without handshaking.
    pub async fn connect_raw(&self) -> anyhow::Result<super::client::TestClient> {
        super::client::TestClient::connect(&self.address()).await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = std::fs::remove_dir_all(&self.data_dir);
    }
}
