//! Fixtures shared by the tool tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use egecache_client::{FetchRequest, FetchResponse, Network, ResponseSource, Worker, WorkerSettings};
use egecache_core::{AppConfig, CacheDb, Error};
use reqwest::{StatusCode, header::HeaderMap};
use rmcp::model::CallToolResult;

pub(crate) const OFFLINE_BODY: &str = "<h1>Çevrimdışı</h1>";

pub(crate) fn site(path: &str) -> String {
    format!("https://egepenakcayapi.com.tr{path}")
}

/// Answers from a fixed URL table; anything else is unreachable.
pub(crate) struct StubNetwork {
    pages: Mutex<HashMap<String, (u16, &'static str)>>,
}

impl StubNetwork {
    /// A network serving the default precache manifest.
    pub(crate) fn site() -> Arc<Self> {
        let network = Self { pages: Mutex::new(HashMap::new()) };
        network.serve(&site("/"), 200, "<h1>Anasayfa</h1>");
        network.serve(&site("/offline.html"), 200, OFFLINE_BODY);
        network.serve(&site("/manifest.json"), 200, "{}");
        Arc::new(network)
    }

    pub(crate) fn serve(&self, url: &str, status: u16, body: &'static str) {
        self.pages.lock().unwrap().insert(url.to_string(), (status, body));
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        let page = self.pages.lock().unwrap().get(request.url.as_str()).copied();
        let Some((status, body)) = page else {
            return Err(Error::HttpError(format!("network error: {} unreachable", request.url)));
        };

        let status = StatusCode::from_u16(status).unwrap();
        let mut response = FetchResponse::synthetic(
            request.url.clone(),
            status,
            status.canonical_reason().unwrap_or(""),
            HeaderMap::new(),
            Bytes::from_static(body.as_bytes()),
        );
        response.source = ResponseSource::Network;
        Ok(response)
    }
}

pub(crate) async fn active_worker(cache: &CacheDb, network: &Arc<StubNetwork>) -> Worker {
    let settings = WorkerSettings::from_config(&AppConfig::default()).unwrap();
    let mut worker = Worker::new(cache.clone(), network.clone(), settings).unwrap();
    worker.start().await.unwrap();
    worker
}

pub(crate) fn output_json(result: &CallToolResult) -> serde_json::Value {
    let content = serde_json::to_value(&result.content[0]).unwrap();
    let text = content.get("text").and_then(|v| v.as_str()).expect("expected text content");
    serde_json::from_str(text).unwrap()
}
