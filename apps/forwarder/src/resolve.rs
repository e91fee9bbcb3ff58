//! # Server Resolution
//!
//! ```text
//! 1. DNS   inventario.local ──────────┐
//! 2. file  server.txt (IPv4) ─────────┼──► write server_cache.txt ──► Ok(ip)
//! 3. file  server_cache.txt (IPv4) ───┼──────────────────────────────► Ok(ip)
//! 4. probe 192.168.1.1-254 /health ───┘
//!                                           nothing ──► Err(NoServer)
//! ```
//!
//! Each step's failure is logged at debug level and falls through to the
//! next one. Failing to write the cache is only a warning.

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::error::{ForwarderError, ForwarderResult};

pub const DEFAULT_HOSTNAME: &str = "inventario.local";
pub const SERVER_FILE: &str = "server.txt";
pub const SERVER_CACHE: &str = "server_cache.txt";
pub const DEFAULT_HTTP_PORT: u16 = 5000;

/// Per-host timeout of the LAN probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_millis(250);

/// Hosts probed at once.
const PROBE_CONCURRENCY: usize = 32;

/// Where and how to look for the server.
#[derive(Debug, Clone)]
pub struct ServerResolver {
    /// `None` skips the DNS step.
    pub hostname: Option<String>,
    pub server_file: PathBuf,
    pub cache_file: PathBuf,
    /// First three octets of the probed /24; `None` skips the probe.
    pub probe_subnet: Option<[u8; 3]>,
    pub http_port: u16,
}

impl Default for ServerResolver {
    fn default() -> Self {
        ServerResolver {
            hostname: Some(DEFAULT_HOSTNAME.to_string()),
            server_file: PathBuf::from(SERVER_FILE),
            cache_file: PathBuf::from(SERVER_CACHE),
            probe_subnet: Some([192, 168, 1]),
            http_port: DEFAULT_HTTP_PORT,
        }
    }
}

impl ServerResolver {
    /// Runs the lookup chain.
    ///
    /// ## Returns
    /// * `Ok(ip)` - First address found
    /// * `Err(NoServer)` - Every step failed
    pub async fn resolve(&self) -> ForwarderResult<Ipv4Addr> {
        if let Some(ip) = self.from_hostname().await {
            info!(ip = %ip, "Server resolved by hostname");
            self.save_cache(ip).await;
            return Ok(ip);
        }

        if let Some(ip) = read_ip_file(&self.server_file).await {
            info!(ip = %ip, file = %self.server_file.display(), "Server read from file");
            self.save_cache(ip).await;
            return Ok(ip);
        }

        if let Some(ip) = read_ip_file(&self.cache_file).await {
            info!(ip = %ip, "Using cached server address");
            return Ok(ip);
        }

        if let Some(ip) = self.probe_lan().await {
            info!(ip = %ip, "Server found by LAN probe");
            self.save_cache(ip).await;
            return Ok(ip);
        }

        Err(ForwarderError::NoServer)
    }

    async fn from_hostname(&self) -> Option<Ipv4Addr> {
        let hostname = self.hostname.as_deref()?;
        match tokio::net::lookup_host((hostname, self.http_port)).await {
            Ok(addrs) => addrs
                .filter_map(|addr| match addr.ip() {
                    IpAddr::V4(ip) => Some(ip),
                    IpAddr::V6(_) => None,
                })
                .next(),
            Err(e) => {
                debug!(hostname = %hostname, error = %e, "Hostname lookup failed");
                None
            }
        }
    }

    async fn probe_lan(&self) -> Option<Ipv4Addr> {
        let [a, b, c] = self.probe_subnet?;
        let client = match reqwest::Client::builder().timeout(PROBE_TIMEOUT).build() {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "HTTP client unavailable, skipping LAN probe");
                return None;
            }
        };

        info!(subnet = %format!("{}.{}.{}.0/24", a, b, c), "Probing LAN for the server");
        let mut probes = stream::iter(1..=254u8)
            .map(|host| {
                let ip = Ipv4Addr::new(a, b, c, host);
                let client = &client;
                async move { probe(client, ip, self.http_port).await.then_some(ip) }
            })
            .buffer_unordered(PROBE_CONCURRENCY);

        while let Some(found) = probes.next().await {
            if found.is_some() {
                return found;
            }
        }
        None
    }

    async fn save_cache(&self, ip: Ipv4Addr) {
        if let Err(e) = tokio::fs::write(&self.cache_file, ip.to_string()).await {
            warn!(file = %self.cache_file.display(), error = %e, "Could not write server cache");
        }
    }
}

/// `GET http://ip:port/health` answered 200.
pub async fn probe(client: &reqwest::Client, ip: Ipv4Addr, port: u16) -> bool {
    let url = format!("http://{}:{}/health", ip, port);
    match client.get(&url).send().await {
        Ok(response) => response.status() == reqwest::StatusCode::OK,
        Err(_) => false,
    }
}

/// Reads a file holding one dotted IPv4 address.
async fn read_ip_file(path: &Path) -> Option<Ipv4Addr> {
    let text = tokio::fs::read_to_string(path).await.ok()?;
    match text.trim().parse() {
        Ok(ip) => Some(ip),
        Err(_) => {
            debug!(file = %path.display(), "Ignoring file without a valid IPv4 address");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn offline(dir: &TempDir) -> ServerResolver {
        ServerResolver {
            hostname: None,
            server_file: dir.path().join(SERVER_FILE),
            cache_file: dir.path().join(SERVER_CACHE),
            probe_subnet: None,
            http_port: DEFAULT_HTTP_PORT,
        }
    }

    #[tokio::test]
    async fn test_server_file_is_cached() {
        let dir = TempDir::new().unwrap();
        let resolver = offline(&dir);
        std::fs::write(&resolver.server_file, "192.168.1.20\n").unwrap();

        let ip = resolver.resolve().await.unwrap();
        assert_eq!(ip, Ipv4Addr::new(192, 168, 1, 20));
        assert_eq!(std::fs::read_to_string(&resolver.cache_file).unwrap(), "192.168.1.20");
    }

    #[tokio::test]
    async fn test_invalid_server_file_falls_back_to_cache() {
        let dir = TempDir::new().unwrap();
        let resolver = offline(&dir);
        std::fs::write(&resolver.server_file, "servidor-caja").unwrap();
        std::fs::write(&resolver.cache_file, "10.0.0.7").unwrap();

        assert_eq!(resolver.resolve().await.unwrap(), Ipv4Addr::new(10, 0, 0, 7));
    }

    #[tokio::test]
    async fn test_nothing_found() {
        let dir = TempDir::new().unwrap();
        let resolver = offline(&dir);
        assert!(matches!(resolver.resolve().await, Err(ForwarderError::NoServer)));
    }

    #[tokio::test]
    async fn test_probe_reads_health_status() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n\r\nOK")
                .await
                .unwrap();
        });

        let client = reqwest::Client::builder().timeout(Duration::from_secs(2)).build().unwrap();
        assert!(probe(&client, Ipv4Addr::LOCALHOST, port).await);
    }

    #[tokio::test]
    async fn test_probe_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = reqwest::Client::builder().timeout(PROBE_TIMEOUT).build().unwrap();
        assert!(!probe(&client, Ipv4Addr::LOCALHOST, port).await);
    }
}
