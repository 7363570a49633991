// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use thetagang_relay::feed::{TradeFeed, TrendFeed};
use thetagang_relay::{FetchError, RelayError};

/// Feed that replays one scripted response per call. `None` is an HTTP 503.
/// When the script runs out the last response repeats.
pub struct ScriptedFeed<T> {
    script: Mutex<VecDeque<Option<T>>>,
    last: Mutex<Option<Option<T>>>,
}

impl<T: Clone> ScriptedFeed<T> {
    pub fn new(script: Vec<Option<T>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
        }
    }

    fn next(&self) -> Result<T, RelayError> {
        let step = self.script.lock().unwrap().pop_front();
        let step = match step {
            Some(s) => {
                *self.last.lock().unwrap() = Some(s.clone());
                s
            }
            None => self.last.lock().unwrap().clone().flatten(),
        };
        step.ok_or_else(|| {
            FetchError::Status {
                url: "https://api.thetagang.test".into(),
                status: 503,
            }
            .into()
        })
    }
}

#[async_trait]
impl TradeFeed for ScriptedFeed<Vec<Value>> {
    async fn fetch_trades(&self, _ticker: Option<&str>) -> Result<Vec<Value>, RelayError> {
        self.next()
    }
}

#[async_trait]
impl TrendFeed for ScriptedFeed<Vec<String>> {
    async fn fetch_trends(&self) -> Result<Vec<String>, RelayError> {
        self.next()
    }
}

/// Minimal open patron option trade.
pub fn trade(guid: &str, symbol: &str, kind: &str) -> Value {
    json!({
        "guid": guid,
        "symbol": symbol,
        "type": kind,
        "User": {"username": "patron1", "role": "patron"},
        "price_filled": 1.1,
        "quantity": 1,
        "short_put": 100,
        "short_call": null,
        "long_put": null,
        "long_call": null,
        "expiry_date": "2099-01-15T00:00:00.000Z",
        "close_date": null,
        "note": "test"
    })
}

pub fn closed(mut t: Value) -> Value {
    t["close_date"] = json!("2026-02-01T16:00:00.000Z");
    t["price_closed"] = json!(0.2);
    t
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Local HTTP/1.1 server answering each request with the next scripted
/// `(status, body)`; the last answer repeats. Every request line is recorded.
pub struct StubServer {
    pub base: String,
    pub requests: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    pub async fn start(answers: Vec<(u16, &'static str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);

        tokio::spawn(async move {
            loop {
                let Ok((mut sock, _)) = listener.accept().await else {
                    return;
                };
                let Some(line) = read_request(&mut sock).await else {
                    continue;
                };
                let n = {
                    let mut seen = seen.lock().unwrap();
                    seen.push(line);
                    seen.len()
                };
                let (status, body) = answers[(n - 1).min(answers.len() - 1)];
                let reply = format!(
                    "HTTP/1.1 {status} STUB\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = sock.write_all(reply.as_bytes()).await;
                let _ = sock.shutdown().await;
            }
        });

        Self { base, requests }
    }

    pub fn hits(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn request_lines(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Reads headers and a `Content-Length` body; returns the request line.
async fn read_request(sock: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = sock.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = sock.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    head.lines().next().map(str::to_string)
}
