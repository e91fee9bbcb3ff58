//! Delivery of scanned codes to `POST /push_scan`.

use std::time::Duration;

use serde_json::json;
use tracing::debug;

use crate::error::ForwarderResult;

pub const PUSH_TIMEOUT: Duration = Duration::from_secs(3);

/// HTTP client bound to one server's push endpoint.
#[derive(Debug, Clone)]
pub struct Pusher {
    client: reqwest::Client,
    url: String,
}

impl Pusher {
    /// `host` is an IP or hostname without scheme.
    pub fn new(host: &str, port: u16) -> ForwarderResult<Self> {
        let client = reqwest::Client::builder().timeout(PUSH_TIMEOUT).build()?;
        Ok(Pusher {
            client,
            url: format!("http://{}:{}/push_scan", host, port),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Sends one code; any non-2xx reply is an error.
    pub async fn push(&self, code: &str) -> ForwarderResult<()> {
        self.client
            .post(&self.url)
            .json(&json!({ "code": code }))
            .send()
            .await?
            .error_for_status()?;
        debug!(code = %code, "Pushed");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_server {
    //! A one-shot HTTP responder that hands back the request body.

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    /// Serves `requests` requests with `status`, sending each body on the channel.
    pub async fn spawn(status: u16, requests: usize) -> (u16, mpsc::UnboundedReceiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            for _ in 0..requests {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut data = Vec::new();
                let mut buf = [0u8; 1024];
                let body = loop {
                    let n = socket.read(&mut buf).await.unwrap();
                    if n == 0 {
                        break String::new();
                    }
                    data.extend_from_slice(&buf[..n]);
                    let text = String::from_utf8_lossy(&data).to_string();
                    if let Some(end) = text.find("\r\n\r\n") {
                        let length = text[..end]
                            .lines()
                            .find_map(|line| {
                                let (name, value) = line.split_once(':')?;
                                name.eq_ignore_ascii_case("content-length")
                                    .then(|| value.trim().parse::<usize>().ok())
                                    .flatten()
                            })
                            .unwrap_or(0);
                        if data.len() >= end + 4 + length {
                            break text[end + 4..end + 4 + length].to_string();
                        }
                    }
                };
                let _ = tx.send(body);
                let reply = format!(
                    "HTTP/1.1 {} X\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                    status
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
            }
        });

        (port, rx)
    }
}
