//! Shared helpers for integration tests.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use tempfile::TempDir;
use template_server::config::ServerConfig;
use template_server::lifecycle::startup::{serve_with_shutdown, Site};
use template_server::Shutdown;
use tokio::net::TcpListener;

/// The greeting document used across scenarios.
pub const GREET: &str = "<% who = \"World\" %><h1>Hello <%= who %></h1>";

pub const ROUTES_XML: &str = r#"<routes>
  <route path="/greet" file="greet.html">
    <methods>GET</methods>
  </route>
</routes>"#;

/// Write `files` under a fresh `root_http` directory and return the temp dir.
pub fn write_site(files: &[(&str, &str)]) -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("root_http");
    for (name, content) in files {
        let path = root.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    fs::write(temp.path().join("routes.xml"), ROUTES_XML).unwrap();
    temp
}

/// Configuration pointing at a site written by [`write_site`].
pub fn site_config(dir: &Path) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.site.root = dir.join("root_http").display().to_string();
    config.site.routes_file = dir.join("routes.xml").display().to_string();
    config
}

/// A server running on an ephemeral port.
pub struct RunningServer {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl RunningServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn stop(&self) {
        self.shutdown.trigger();
    }
}

/// Serve `site` with `config` on 127.0.0.1 and an ephemeral port.
pub async fn start(mut config: ServerConfig, site: Site) -> RunningServer {
    // Reserve a port, then hand its address to the server.
    let reserved = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = reserved.local_addr().unwrap();
    drop(reserved);

    config.listener.bind_address = addr.to_string();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = serve_with_shutdown(config, site, rx).await;
    });

    for _ in 0..50 {
        if tokio::net::TcpStream::connect(addr).await.is_ok() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    RunningServer { addr, shutdown }
}
