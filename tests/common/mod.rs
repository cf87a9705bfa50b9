//! Shared helpers for integration tests

#![allow(dead_code)]

use std::net::TcpListener as StdTcpListener;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Maps a request path to the raw HTTP response written back
type Responder = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Minimal HTTP/1.1 responder for loopback tests
pub struct TestHttpServer {
    pub port: u16,
    handle: JoinHandle<()>,
}

impl TestHttpServer {
    /// Serve one fixed HTML body on every path, IPv4 loopback
    pub async fn start(body: &str) -> Self {
        let response = html_response(body);
        Self::routed(move |_| response.clone()).await
    }

    /// Serve one fixed HTML body on the IPv6 loopback only, if it is available
    pub async fn start_ipv6(body: &str) -> Option<Self> {
        let response = html_response(body);
        Self::bind("[::1]:0", Arc::new(move |_: &str| response.clone())).await.ok()
    }

    /// Answer each request with whatever `respond` returns for its path
    pub async fn routed(respond: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self::bind("127.0.0.1:0", Arc::new(respond)).await.unwrap()
    }

    async fn bind(addr: &str, respond: Responder) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let port = listener.local_addr()?.port();

        let handle = tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                let respond = respond.clone();
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut buf = [0u8; 1024];
                    loop {
                        match stream.read(&mut buf).await {
                            // Reachability probes connect and hang up without a request
                            Ok(0) | Err(_) => return,
                            Ok(n) => {
                                request.extend_from_slice(&buf[..n]);
                                if request.windows(4).any(|w| w == b"\r\n\r\n") {
                                    break;
                                }
                            }
                        }
                    }

                    let request = String::from_utf8_lossy(&request);
                    let path = request.split_whitespace().nth(1).unwrap_or("/");
                    let response = respond(path);
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        Ok(Self { port, handle })
    }
}

impl Drop for TestHttpServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// `200 OK` carrying an HTML body
pub fn html_response(body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    )
}

/// `302 Found` pointing at `location`, with an empty body
pub fn redirect_response(location: &str) -> String {
    format!(
        "HTTP/1.1 302 Found\r\nLocation: {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        location
    )
}

/// A loopback port with nothing listening on it
pub fn closed_port() -> u16 {
    let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}
