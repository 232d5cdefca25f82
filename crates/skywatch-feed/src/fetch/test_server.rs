// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Minimal in-process HTTP responder for exercising the fetch paths.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use super::HttpFetcher;

/// What the responder does with every accepted connection.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Respond { status: u16, body: String },
    /// Accept and read the request, then never answer.
    Hang,
}

impl Reply {
    pub(crate) fn json(body: &str) -> Self {
        Self::Respond {
            status: 200,
            body: body.to_string(),
        }
    }

    pub(crate) fn status(status: u16) -> Self {
        Self::Respond {
            status,
            body: String::new(),
        }
    }
}

/// A running responder: base URL plus a count of requests it has seen.
#[derive(Debug, Clone)]
pub(crate) struct TestServer {
    pub(crate) base_url: String,
    pub(crate) hits: Arc<AtomicUsize>,
    pub(crate) last_request: Arc<std::sync::Mutex<String>>,
}

impl TestServer {
    pub(crate) fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub(crate) fn last_request(&self) -> String {
        self.last_request.lock().unwrap().clone()
    }
}

/// Start a responder and return its base URL.
pub(crate) async fn spawn(reply: Reply) -> String {
    start(reply).await.base_url
}

/// Start a responder that records hits and the last request line.
pub(crate) async fn start(reply: Reply) -> TestServer {
    start_sequence(vec![reply]).await
}

/// Start a responder that answers the n-th request with `replies[n]`,
/// repeating the last reply once the list is exhausted.
pub(crate) async fn start_sequence(replies: Vec<Reply>) -> TestServer {
    assert!(!replies.is_empty());
    let replies = Arc::new(replies);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let last_request = Arc::new(std::sync::Mutex::new(String::new()));

    let server = TestServer {
        base_url: format!("http://{addr}"),
        hits: Arc::clone(&hits),
        last_request: Arc::clone(&last_request),
    };

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let replies = Arc::clone(&replies);
            let hits = Arc::clone(&hits);
            let last_request = Arc::clone(&last_request);

            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]);
                let request_line = request.lines().next().unwrap_or_default().to_string();
                *last_request.lock().unwrap() = request_line;
                let seen = hits.fetch_add(1, Ordering::SeqCst);

                match replies[seen.min(replies.len() - 1)].clone() {
                    Reply::Respond { status, body } => {
                        let response = format!(
                            "HTTP/1.1 {status} Test\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                            body.len()
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    }
                    Reply::Hang => {
                        tokio::time::sleep(Duration::from_secs(3600)).await;
                    }
                }
            });
        }
    });

    server
}

/// Fetcher that bypasses any system proxy so requests reach the local responder.
pub(crate) fn fetcher(timeout: Duration) -> HttpFetcher {
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    HttpFetcher::with_client(client, timeout)
}
