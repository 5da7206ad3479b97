//! Fetch strategy engine.
//!
//! Each strategy attempts the network at most once per request. Network
//! failures never reach the caller: they turn into a cached response or
//! the offline fallback.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use chrono::Utc;
use egecache_core::{CachedEntry, EntryAge, PartitionKind};
use reqwest::{StatusCode, header};
use tokio::task::JoinSet;
use url::Url;

use super::classify::{Route, Strategy};
use super::store::StoreManager;
use crate::fetch::{FetchRequest, FetchResponse, Network, ResponseSource};

/// Served for HTML requests when the offline document itself is missing.
pub const INLINE_OFFLINE_HTML: &str = "<!DOCTYPE html>\
<html lang=\"tr\"><head><meta charset=\"utf-8\"><title>Çevrimdışı</title></head>\
<body><h1>Çevrimdışısınız</h1><p>İnternet bağlantınızı kontrol edip tekrar deneyin.</p></body></html>";

pub const OFFLINE_STATUS_TEXT: &str = "Offline";

/// Whether a cached entry is young enough to serve without the network.
///
/// Entries without a `Date` never expire; an unparseable `Date` counts as
/// expired.
pub fn is_fresh(age: EntryAge, max_age: chrono::Duration) -> bool {
    match age {
        EntryAge::Undated => true,
        EntryAge::Unreadable => false,
        EntryAge::Elapsed(elapsed) => elapsed < max_age,
    }
}

fn hit(entry: &CachedEntry) -> Option<FetchResponse> {
    match FetchResponse::from_entry(entry) {
        Ok(response) => Some(response),
        Err(e) => {
            tracing::warn!(url = %entry.url, error = %e, "ignoring undecodable cache entry");
            None
        }
    }
}

pub struct Engine {
    store: StoreManager,
    network: Arc<dyn Network>,
    offline_url: Url,
    background: Mutex<JoinSet<()>>,
}

impl Engine {
    pub fn new(store: StoreManager, network: Arc<dyn Network>, offline_url: Url) -> Self {
        Self { store, network, offline_url, background: Mutex::new(JoinSet::new()) }
    }

    pub async fn execute(&self, route: &Route, request: FetchRequest) -> FetchResponse {
        tracing::debug!(url = %request.url, strategy = route.strategy.name(), partition = %route.partition, "dispatch");
        match route.strategy {
            Strategy::CacheFirst => self.cache_first(route.partition, request).await,
            Strategy::CacheFirstWithExpiry { max_age } => {
                self.cache_first_with_expiry(route.partition, request, max_age).await
            }
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(route.partition, request).await,
            Strategy::NetworkFirst => self.network_first(route.partition, request).await,
        }
    }

    /// Serve from cache when present; otherwise fetch and store.
    pub async fn cache_first(&self, kind: PartitionKind, request: FetchRequest) -> FetchResponse {
        if let Some(response) = self.store.get(kind, &request).await.as_ref().and_then(hit) {
            return response;
        }

        match self.network.fetch(&request).await {
            Ok(response) => {
                self.store.put(kind, &request, &response).await;
                response
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "network failed with no cached entry");
                self.offline_fallback(&request).await
            }
        }
    }

    /// Serve from cache while younger than `max_age`; refresh otherwise,
    /// serving the stale entry if the refresh cannot reach the network.
    pub async fn cache_first_with_expiry(
        &self, kind: PartitionKind, request: FetchRequest, max_age: chrono::Duration,
    ) -> FetchResponse {
        let cached = self.store.get(kind, &request).await;

        if let Some(entry) = &cached
            && is_fresh(entry.age_at(Utc::now()), max_age)
            && let Some(response) = hit(entry)
        {
            return response;
        }

        match self.network.fetch(&request).await {
            Ok(response) => {
                self.store.put(kind, &request, &response).await;
                response
            }
            Err(e) => match cached.as_ref().and_then(hit) {
                Some(stale) => {
                    tracing::debug!(url = %request.url, error = %e, "network failed; serving stale entry");
                    stale
                }
                None => self.offline_fallback(&request).await,
            },
        }
    }

    /// Serve the cached entry immediately and refresh it in the background.
    /// Without a cached entry, wait for the network.
    pub async fn stale_while_revalidate(&self, kind: PartitionKind, request: FetchRequest) -> FetchResponse {
        if let Some(response) = self.store.get(kind, &request).await.as_ref().and_then(hit) {
            self.spawn_refresh(kind, request);
            return response;
        }

        match self.network.fetch(&request).await {
            Ok(response) => {
                self.store.put(kind, &request, &response).await;
                response
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "network failed with no cached entry");
                self.offline_fallback(&request).await
            }
        }
    }

    /// Prefer the network; fall back to the cached entry, then offline.
    pub async fn network_first(&self, kind: PartitionKind, request: FetchRequest) -> FetchResponse {
        match self.network.fetch(&request).await {
            Ok(response) => {
                self.store.put(kind, &request, &response).await;
                response
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "network failed; trying cache");
                match self.store.get(kind, &request).await.as_ref().and_then(hit) {
                    Some(response) => response,
                    None => self.offline_fallback(&request).await,
                }
            }
        }
    }

    /// Terminal response when neither network nor cache can answer.
    pub async fn offline_fallback(&self, request: &FetchRequest) -> FetchResponse {
        if request.accepts_html() {
            let offline = FetchRequest::get(self.offline_url.clone());
            if let Some(mut document) = self.store.get(PartitionKind::Page, &offline).await.as_ref().and_then(hit) {
                document.source = ResponseSource::Offline;
                return document;
            }

            tracing::warn!(offline_url = %self.offline_url, "offline document missing from cache");
            let mut headers = header::HeaderMap::new();
            headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("text/html; charset=utf-8"));
            return FetchResponse::synthetic(
                request.url.clone(),
                StatusCode::SERVICE_UNAVAILABLE,
                OFFLINE_STATUS_TEXT,
                headers,
                Bytes::from_static(INLINE_OFFLINE_HTML.as_bytes()),
            );
        }

        FetchResponse::synthetic(
            request.url.clone(),
            StatusCode::SERVICE_UNAVAILABLE,
            OFFLINE_STATUS_TEXT,
            header::HeaderMap::new(),
            Bytes::new(),
        )
    }

    fn spawn_refresh(&self, kind: PartitionKind, request: FetchRequest) {
        let store = self.store.clone();
        let network = Arc::clone(&self.network);

        let mut background = self.background.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        while background.try_join_next().is_some() {}

        background.spawn(async move {
            match network.fetch(&request).await {
                Ok(response) => {
                    store.put(kind, &request, &response).await;
                }
                Err(e) => {
                    tracing::debug!(url = %request.url, error = %e, "background refresh failed");
                }
            }
        });
    }

    /// Wait for every outstanding background refresh.
    pub async fn wait_until_idle(&self) {
        let mut pending = {
            let mut background = self.background.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            std::mem::take(&mut *background)
        };

        while let Some(result) = pending.join_next().await {
            if let Err(e) = result {
                tracing::warn!(error = %e, "background refresh task failed");
            }
        }
    }
}
