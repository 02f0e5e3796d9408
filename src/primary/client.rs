//! RPC stub for a single worker
//!
//! Thin synchronous request/response wrappers over the worker's HTTP API,
//! plus the streaming consumer for `/stream-entries`. Any non-success status
//! becomes a transport error carrying the response body text.

use bytes::BytesMut;
use futures_util::StreamExt;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Deserialize;
use tokio::sync::{mpsc, oneshot};

use crate::common::streamer::{self, MAX_LINE_BYTES};
use crate::common::{Entry, EntryOperation, Error, NodeStats, Result};

/// Percent-encoding set for keys embedded in a URL path segment.
const KEY_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'/')
    .add(b'%')
    .add(b'?')
    .add(b'#');

pub struct WorkerClient {
    base_url: String,
    http: reqwest::Client,
}

impl WorkerClient {
    pub fn new(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into(),
            http,
        }
    }

    pub async fn health(&self) -> Result<()> {
        let res = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        expect_ok(res, "health check").await?;
        Ok(())
    }

    pub async fn set_key(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let res = self.http.post(self.key_url(key)).body(value).send().await?;
        expect_ok(res, "set key").await?;
        Ok(())
    }

    pub async fn get_key(&self, key: &str) -> Result<Vec<u8>> {
        let res = self.http.get(self.key_url(key)).send().await?;
        let res = expect_ok(res, "get key").await?;
        Ok(res.bytes().await?.to_vec())
    }

    pub async fn delete_key(&self, key: &str) -> Result<()> {
        let res = self.http.delete(self.key_url(key)).send().await?;
        expect_ok(res, "delete key").await?;
        Ok(())
    }

    pub async fn get_stats(&self) -> Result<NodeStats> {
        #[derive(Deserialize)]
        struct StatsResponse {
            stats: NodeStats,
        }

        let res = self
            .http
            .get(format!("{}/stats", self.base_url))
            .send()
            .await?;
        let res = expect_ok(res, "get stats").await?;
        let body: StatsResponse = res
            .json()
            .await
            .map_err(|e| Error::Decode(format!("invalid stats payload: {}", e)))?;
        Ok(body.stats)
    }

    pub async fn queue_operations(&self, operations: &[EntryOperation]) -> Result<()> {
        let res = self
            .http
            .post(format!("{}/queue-operations", self.base_url))
            .json(operations)
            .send()
            .await?;
        expect_ok(res, "queue operations").await?;
        Ok(())
    }

    pub async fn apply_operations(&self) -> Result<()> {
        let res = self
            .http
            .post(format!("{}/apply-operations", self.base_url))
            .send()
            .await?;
        expect_ok(res, "apply operations").await?;
        Ok(())
    }

    /// Consumes the worker's `/stream-entries` body line by line. Returns a
    /// bounded channel of decoded entries plus a terminal result; the caller
    /// drains the entry channel to exhaustion, then awaits the result to
    /// learn whether the stream completed cleanly.
    pub fn stream_entries(&self) -> (mpsc::Receiver<Entry>, oneshot::Receiver<Result<()>>) {
        let (entry_tx, entry_rx) = mpsc::channel(1);
        let (done_tx, done_rx) = oneshot::channel();
        let http = self.http.clone();
        let url = format!("{}/stream-entries", self.base_url);

        tokio::spawn(async move {
            let outcome = stream_lines(http, url, entry_tx).await;
            let _ = done_tx.send(outcome);
        });

        (entry_rx, done_rx)
    }

    fn key_url(&self, key: &str) -> String {
        format!(
            "{}/keys/{}",
            self.base_url,
            utf8_percent_encode(key, KEY_SEGMENT)
        )
    }
}

async fn expect_ok(res: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    if res.status().is_success() {
        return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    Err(Error::Transport(format!("{} request failed: {}", what, body)))
}

/// Splits the chunked response body into lines with a bounded buffer. A line
/// longer than `MAX_LINE_BYTES` aborts the stream with a decode error.
async fn stream_lines(
    http: reqwest::Client,
    url: String,
    entries: mpsc::Sender<Entry>,
) -> Result<()> {
    let res = http.get(&url).send().await?;
    if !res.status().is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(Error::Transport(format!(
            "stream entries request failed: {}",
            body
        )));
    }

    let mut body = res.bytes_stream();
    let mut buf = BytesMut::new();

    while let Some(chunk) = body.next().await {
        buf.extend_from_slice(&chunk?);
        while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
            let line = buf.split_to(pos + 1);
            let raw = &line[..pos];
            if raw.is_empty() {
                continue;
            }
            let entry = decode_line(raw)?;
            if entries.send(entry).await.is_err() {
                return Ok(()); // consumer stopped draining
            }
        }
        if buf.len() > MAX_LINE_BYTES {
            return Err(Error::Decode(format!(
                "stream line exceeds {} byte buffer",
                MAX_LINE_BYTES
            )));
        }
    }

    // a final line without trailing newline is still one entry
    if !buf.is_empty() {
        let entry = decode_line(&buf)?;
        let _ = entries.send(entry).await;
    }

    Ok(())
}

fn decode_line(raw: &[u8]) -> Result<Entry> {
    let line = std::str::from_utf8(raw)
        .map_err(|e| Error::Decode(format!("stream line is not utf-8: {}", e)))?;
    streamer::decode_entry(line.trim_end_matches('\r'))
}
