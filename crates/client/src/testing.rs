//! Scripted network for worker tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use egecache_core::Error;
use reqwest::{StatusCode, header};
use tokio::sync::Notify;

use crate::fetch::{FetchRequest, FetchResponse, Network, ResponseSource};

/// Format a timestamp as an HTTP `Date` value.
pub(crate) fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[derive(Clone)]
enum Reply {
    Respond { status: u16, headers: Vec<(String, String)>, body: Bytes },
    Fail,
}

#[derive(Clone)]
struct Script {
    reply: Reply,
    gate: Option<Arc<Notify>>,
}

/// In-process network answering from a per-URL script.
///
/// URLs without a script fail like an unreachable host.
#[derive(Default)]
pub(crate) struct ScriptedNetwork {
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedNetwork {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn respond(&self, url: &str, status: u16, body: &str) {
        self.respond_with(url, status, Vec::new(), body);
    }

    pub(crate) fn respond_with(&self, url: &str, status: u16, headers: Vec<(&str, String)>, body: &str) {
        let headers = headers.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        let reply = Reply::Respond { status, headers, body: Bytes::copy_from_slice(body.as_bytes()) };
        self.scripts.lock().unwrap().insert(url.to_string(), Script { reply, gate: None });
    }

    /// Answer with a `Date` header.
    pub(crate) fn respond_dated(&self, url: &str, body: &str, date: DateTime<Utc>) {
        self.respond_with(url, 200, vec![("date", http_date(date))], body);
    }

    pub(crate) fn fail(&self, url: &str) {
        self.scripts.lock().unwrap().insert(url.to_string(), Script { reply: Reply::Fail, gate: None });
    }

    /// Hold the reply for `url` until the returned gate is notified.
    pub(crate) fn gate(&self, url: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        if let Some(script) = self.scripts.lock().unwrap().get_mut(url) {
            script.gate = Some(gate.clone());
        }
        gate
    }

    pub(crate) fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        let url = request.url.to_string();
        *self.calls.lock().unwrap().entry(url.clone()).or_default() += 1;

        let script = self.scripts.lock().unwrap().get(&url).cloned();
        let Some(script) = script else {
            return Err(Error::HttpError(format!("network error: no route to {url}")));
        };

        if let Some(gate) = script.gate {
            gate.notified().await;
        }

        match script.reply {
            Reply::Fail => Err(Error::HttpError(format!("network error: connection refused for {url}"))),
            Reply::Respond { status, headers, body } => {
                let status = StatusCode::from_u16(status).unwrap();
                let mut map = header::HeaderMap::new();
                for (name, value) in headers {
                    map.append(header::HeaderName::from_bytes(name.as_bytes()).unwrap(), value.parse().unwrap());
                }
                Ok(FetchResponse {
                    url: request.url.clone(),
                    status,
                    status_text: status.canonical_reason().unwrap_or("").to_string(),
                    headers: map,
                    bytes: body,
                    source: ResponseSource::Network,
                    fetch_ms: 1,
                })
            }
        }
    }
}
