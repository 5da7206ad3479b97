//! The offline caching worker.
//!
//! A worker moves through an explicit lifecycle:
//!
//! ```text
//! Idle -> Installing -> Installed -> Activating -> Active
//!              \
//!               -> Redundant (precache failed)
//! ```
//!
//! Install precaches the manifest and must finish before activation may
//! start. Activation garbage-collects partitions from other versions and
//! must finish before fetch events are answered. Until then every request
//! is passed through.

pub mod classify;
pub mod store;
pub mod strategy;

use std::sync::Arc;

use egecache_core::{AppConfig, CacheDb, Error, PartitionKind};
use url::Url;

pub use classify::{Classifier, ResourceClass, Route, Strategy};
pub use store::StoreManager;
pub use strategy::Engine;

use crate::fetch::{FetchRequest, FetchResponse, Network, Scope};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Installing,
    Installed,
    Activating,
    Active,
    Redundant,
}

/// Everything a worker needs to know about the site it serves.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub origin: Url,
    pub version: String,
    pub precache: Vec<String>,
    pub precache_static: Vec<String>,
    pub offline_path: String,
    pub scope: Scope,
    pub classifier: Classifier,
}

impl WorkerSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.origin)))?;
        let image_max_age = config.image_max_age().map_err(|e| Error::InvalidInput(e.to_string()))?;
        Ok(Self {
            origin,
            version: config.cache_version.clone(),
            precache: config.precache.clone(),
            precache_static: config.precache_static.clone(),
            offline_path: config.offline_path.clone(),
            scope: Scope::new(&config.site_domains, config.allow_local_hosts),
            classifier: Classifier::new(config.network_first_prefixes.clone(), image_max_age),
        })
    }

    /// Resolve a site path against the origin.
    pub fn resolve(&self, path: &str) -> Result<Url, Error> {
        self.origin.join(path).map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))
    }

    pub fn offline_url(&self) -> Result<Url, Error> {
        self.resolve(&self.offline_path)
    }

    fn precache_targets(&self) -> Result<Vec<(PartitionKind, Url)>, Error> {
        let pages = self.precache.iter().map(|p| (PartitionKind::Page, p));
        let statics = self.precache_static.iter().map(|p| (PartitionKind::Static, p));
        pages.chain(statics).map(|(kind, path)| Ok((kind, self.resolve(path)?))).collect()
    }
}

pub struct Worker {
    settings: WorkerSettings,
    store: StoreManager,
    network: Arc<dyn Network>,
    engine: Engine,
    phase: Phase,
}

impl Worker {
    pub fn new(cache: CacheDb, network: Arc<dyn Network>, settings: WorkerSettings) -> Result<Self, Error> {
        let store = StoreManager::new(cache, settings.version.clone());
        let engine = Engine::new(store.clone(), Arc::clone(&network), settings.offline_url()?);
        Ok(Self { settings, store, network, engine, phase: Phase::Idle })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    pub fn store(&self) -> &StoreManager {
        &self.store
    }

    /// Precache the manifest. Returns the number of stored entries.
    ///
    /// A failed install leaves the worker `Redundant`; partitions of the
    /// previously active version are untouched.
    pub async fn install(&mut self) -> Result<usize, Error> {
        if self.phase != Phase::Idle {
            return Err(Error::Lifecycle(format!("install requested while {:?}", self.phase)));
        }
        self.phase = Phase::Installing;
        tracing::info!(version = %self.settings.version, "installing");

        let result = match self.settings.precache_targets() {
            Ok(targets) => self.store.ensure_precached(self.network.as_ref(), &targets).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(count) => {
                self.phase = Phase::Installed;
                tracing::info!(version = %self.settings.version, precached = count, "installed");
                Ok(count)
            }
            Err(e) => {
                self.phase = Phase::Redundant;
                tracing::error!(version = %self.settings.version, error = %e, "install failed");
                Err(e)
            }
        }
    }

    /// Delete partitions from other versions and start answering fetches.
    ///
    /// Returns the deleted partition names. On failure the worker stays
    /// `Installed` and activation may be retried.
    pub async fn activate(&mut self) -> Result<Vec<String>, Error> {
        if self.phase != Phase::Installed {
            return Err(Error::Lifecycle(format!("activate requested while {:?}", self.phase)));
        }
        self.phase = Phase::Activating;

        match self.store.collect_garbage().await {
            Ok(deleted) => {
                self.phase = Phase::Active;
                tracing::info!(version = %self.settings.version, deleted = deleted.len(), "activated; claiming clients");
                Ok(deleted)
            }
            Err(e) => {
                self.phase = Phase::Installed;
                tracing::error!(version = %self.settings.version, error = %e, "activation failed");
                Err(e)
            }
        }
    }

    /// Install then activate without waiting.
    pub async fn start(&mut self) -> Result<(), Error> {
        self.install().await?;
        self.activate().await?;
        Ok(())
    }

    /// Route for an eligible request, or None if it must pass through.
    pub fn route(&self, request: &FetchRequest) -> Option<Route> {
        if !self.settings.scope.intercepts(&request.method, &request.url) {
            return None;
        }
        Some(self.settings.classifier.route(&request.url))
    }

    /// Handle a fetch event.
    ///
    /// Returns None when the request is passed through to default handling:
    /// the worker is not active, or the request is not eligible. The
    /// fragment never reaches the network, so it is not part of the cache
    /// identity.
    pub async fn handle_fetch(&self, mut request: FetchRequest) -> Option<FetchResponse> {
        request.url.set_fragment(None);

        if self.phase != Phase::Active {
            tracing::debug!(url = %request.url, phase = ?self.phase, "no active worker; passing through");
            return None;
        }

        let Some(route) = self.route(&request) else {
            tracing::debug!(method = %request.method, url = %request.url, "not intercepted");
            return None;
        };

        Some(self.engine.execute(&route, request).await)
    }

    /// Wait for outstanding background refreshes.
    pub async fn wait_until_idle(&self) {
        self.engine.wait_until_idle().await;
    }
}
