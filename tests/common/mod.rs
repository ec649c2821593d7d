//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use path_proxy::config::{load_config, Cli};
use path_proxy::{Proxy, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// A proxy serving on an ephemeral local port.
pub struct RunningProxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub task: JoinHandle<Result<i32, path_proxy::lifecycle::StartupError>>,
}

impl RunningProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the exit code.
    pub async fn stop(self) -> i32 {
        self.shutdown.trigger();
        self.wait().await
    }

    /// Wait for the proxy to stop on its own.
    pub async fn wait(self) -> i32 {
        tokio::time::timeout(Duration::from_secs(15), self.task)
            .await
            .expect("proxy stopped in time")
            .expect("proxy task did not panic")
            .expect("proxy ran cleanly")
    }
}

/// Start a proxy from command-line style arguments (routes, then `--` and a command).
pub async fn start_proxy(args: &[&str]) -> RunningProxy {
    let mut argv = vec!["path-proxy", "--addr", "127.0.0.1:0"];
    argv.extend_from_slice(args);

    let config = load_config(Cli::try_parse_from(argv).unwrap()).unwrap();
    let proxy = Proxy::bind(config).await.unwrap();
    let addr = proxy.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let task = tokio::spawn(proxy.run_until(shutdown.clone()));

    RunningProxy {
        addr,
        shutdown,
        task,
    }
}

/// HTTP client that talks to the proxy directly and never follows redirects.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// Write `request` verbatim to `addr` and read the whole reply.
///
/// Used where an HTTP client would normalise the request target.
pub async fn raw_request(addr: SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut reply = Vec::new();
    tokio::time::timeout(Duration::from_secs(10), stream.read_to_end(&mut reply))
        .await
        .expect("reply within deadline")
        .unwrap();
    String::from_utf8_lossy(&reply).into_owned()
}

/// Start a backend that answers every request with its raw request bytes as the body.
pub async fn start_echo_backend() -> SocketAddr {
    start_backend(Duration::ZERO, |request| (200, Vec::new(), request)).await
}

/// Start a backend that waits `delay` before echoing.
pub async fn start_slow_backend(delay: Duration) -> SocketAddr {
    start_backend(delay, |request| (200, Vec::new(), request)).await
}

/// Start a backend with a fixed status, extra headers and body.
pub async fn start_fixed_backend(
    status: u16,
    headers: &'static [(&'static str, &'static str)],
    body: &'static str,
) -> SocketAddr {
    start_backend(Duration::ZERO, move |_| {
        (status, headers.to_vec(), body.as_bytes().to_vec())
    })
    .await
}

type Reply = (u16, Vec<(&'static str, &'static str)>, Vec<u8>);

async fn start_backend<F>(delay: Duration, reply: F) -> SocketAddr
where
    F: Fn(Vec<u8>) -> Reply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let reply = std::sync::Arc::new(reply);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let reply = reply.clone();
            tokio::spawn(async move {
                let request = read_request(&mut socket).await;
                tokio::time::sleep(delay).await;

                let (status, headers, body) = reply(request);
                let mut head = format!("HTTP/1.1 {status} Status\r\n");
                for (name, value) in headers {
                    head.push_str(&format!("{name}: {value}\r\n"));
                }
                head.push_str(&format!(
                    "Content-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                ));

                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&body).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Read one request: the head, then a body framed by content-length or chunked encoding.
async fn read_request(socket: &mut TcpStream) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        if let Some(head_end) = find(&buf, b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..head_end]).to_ascii_lowercase();
            let body = &buf[head_end + 4..];
            let complete = if let Some(length) = content_length(&head) {
                body.len() >= length
            } else if head.contains("transfer-encoding: chunked") {
                find(body, b"0\r\n\r\n").is_some()
            } else {
                true
            };
            if complete {
                return buf;
            }
        }

        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return buf,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
}

fn content_length(head: &str) -> Option<usize> {
    head.lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse().ok())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
