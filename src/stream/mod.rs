// src/stream/mod.rs
//! Push-style status delivery.
//!
//! The transport only splits the byte stream into JSON documents and hands
//! each status to a [`StatusHandler`]; all business logic lives in the handler.

pub mod filter;
pub mod oauth;

use async_trait::async_trait;
use serde_json::Value;

/// Receives one raw status payload at a time.
#[async_trait]
pub trait StatusHandler: Send {
    async fn on_status(&mut self, raw: Value);
}

/// Accumulates chunks and yields complete `\r\n`/`\n` terminated lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let rest = self.buf.split_off(pos + 1);
            let line = std::mem::replace(&mut self.buf, rest);
            let text = String::from_utf8_lossy(&line);
            lines.push(text.trim_end_matches(['\r', '\n']).to_string());
        }
        lines
    }

    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

/// What a single stream line turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    KeepAlive,
    Status,
    /// Control messages (`delete`, `limit`, `warning`, ...).
    Control,
    Malformed,
}

/// Route one line to the handler if it carries a status.
pub async fn dispatch_line<H: StatusHandler + ?Sized>(line: &str, handler: &mut H) -> LineKind {
    let line = line.trim();
    if line.is_empty() {
        return LineKind::KeepAlive;
    }
    let value: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, line, "malformed stream line");
            return LineKind::Malformed;
        }
    };
    if value.get("text").is_none() && value.get("full_text").is_none() {
        tracing::debug!(message = %value, "stream control message");
        return LineKind::Control;
    }
    handler.on_status(value).await;
    LineKind::Status
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Collect(Vec<Value>);

    #[async_trait]
    impl StatusHandler for Collect {
        async fn on_status(&mut self, raw: Value) {
            self.0.push(raw);
        }
    }

    #[test]
    fn lines_split_across_chunks() {
        let mut lb = LineBuffer::new();
        assert!(lb.push(b"{\"text\":\"a").is_empty());
        let out = lb.push(b"b\"}\r\n\r\n{\"te");
        assert_eq!(out, vec!["{\"text\":\"ab\"}".to_string(), String::new()]);
        assert_eq!(lb.pending(), 4);
    }

    #[tokio::test]
    async fn only_statuses_reach_handler() {
        let mut h = Collect::default();
        assert_eq!(dispatch_line("", &mut h).await, LineKind::KeepAlive);
        assert_eq!(
            dispatch_line(r#"{"limit":{"track":3}}"#, &mut h).await,
            LineKind::Control
        );
        assert_eq!(dispatch_line("{oops", &mut h).await, LineKind::Malformed);
        assert_eq!(
            dispatch_line(r#"{"id_str":"1","text":"hi"}"#, &mut h).await,
            LineKind::Status
        );
        assert_eq!(h.0.len(), 1);
        assert_eq!(h.0[0]["id_str"], "1");
    }
}
