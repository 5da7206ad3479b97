//! Cache store manager.
//!
//! Owns the partition lifecycle for one version tag: install-time
//! precaching, activation-time garbage collection, and the read/write
//! primitives the strategies use. Reads and writes made on behalf of a
//! fetch never fail the fetch: a storage error is logged and treated as a
//! miss or a skipped write.

use egecache_core::{CacheDb, CachedEntry, Error, PartitionId, PartitionKind};
use url::Url;

use crate::fetch::{FetchRequest, FetchResponse, Network};

#[derive(Clone, Debug)]
pub struct StoreManager {
    cache: CacheDb,
    version: String,
}

impl StoreManager {
    pub fn new(cache: CacheDb, version: impl Into<String>) -> Self {
        Self { cache, version: version.into() }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn cache(&self) -> &CacheDb {
        &self.cache
    }

    /// The partition for `kind` under the active version.
    pub fn partition(&self, kind: PartitionKind) -> PartitionId {
        PartitionId::new(kind, self.version.clone())
    }

    /// Fetch every target and store it in its partition.
    ///
    /// All targets are fetched before anything is written, so a failed
    /// install leaves the partitions untouched. Any status other than 200
    /// fails the install.
    pub async fn ensure_precached(&self, network: &dyn Network, targets: &[(PartitionKind, Url)]) -> Result<usize, Error> {
        let mut fetched = Vec::with_capacity(targets.len());

        for (kind, url) in targets {
            let request = FetchRequest::get(url.clone());
            let response = network
                .fetch(&request)
                .await
                .map_err(|e| Error::PrecacheFailed(format!("{url}: {e}")))?;

            if !response.is_cacheable() {
                return Err(Error::PrecacheFailed(format!("{url}: status {}", response.status.as_u16())));
            }
            fetched.push((*kind, request, response));
        }

        for (kind, request, response) in &fetched {
            let partition = self.partition(*kind);
            self.cache.open_partition(&partition).await?;
            self.cache.put_entry(&partition, &response.to_entry(request)).await?;
            tracing::debug!(partition = %partition, url = %request.url, "precached");
        }

        Ok(fetched.len())
    }

    /// Delete every partition whose version differs from the active one.
    ///
    /// Returns the deleted partition names. Running it again deletes nothing.
    pub async fn collect_garbage(&self) -> Result<Vec<String>, Error> {
        let mut deleted = Vec::new();

        for record in self.cache.list_partitions().await? {
            if record.version == self.version {
                continue;
            }
            if self.cache.delete_partition(&record.name).await? {
                tracing::info!(
                    partition = %record.name,
                    entries = record.entry_count,
                    "deleted stale partition"
                );
                deleted.push(record.name);
            }
        }

        Ok(deleted)
    }

    /// Look up a request; storage failures read as a miss.
    pub async fn get(&self, kind: PartitionKind, request: &FetchRequest) -> Option<CachedEntry> {
        let partition = self.partition(kind);
        match self
            .cache
            .match_entry(&partition, request.method.as_str(), request.url.as_str())
            .await
        {
            Ok(entry) => {
                tracing::debug!(partition = %partition, url = %request.url, hit = entry.is_some(), "cache lookup");
                entry
            }
            Err(e) => {
                tracing::warn!(partition = %partition, url = %request.url, error = %e, "cache read failed; treating as miss");
                None
            }
        }
    }

    /// Store a response if its status is exactly 200.
    ///
    /// Returns whether the entry was written. Storage failures are logged
    /// and reported as not written.
    pub async fn put(&self, kind: PartitionKind, request: &FetchRequest, response: &FetchResponse) -> bool {
        if !response.is_cacheable() {
            tracing::debug!(url = %request.url, status = response.status.as_u16(), "not storing non-200 response");
            return false;
        }

        let partition = self.partition(kind);
        match self.cache.put_entry(&partition, &response.to_entry(request)).await {
            Ok(()) => {
                tracing::debug!(partition = %partition, url = %request.url, "stored");
                true
            }
            Err(e) => {
                tracing::warn!(partition = %partition, url = %request.url, error = %e, "cache write failed; response not stored");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedNetwork;

    const ROOT: &str = "https://egepenakcayapi.com.tr/";
    const OFFLINE: &str = "https://egepenakcayapi.com.tr/offline.html";
    const MANIFEST: &str = "https://egepenakcayapi.com.tr/manifest.json";

    fn targets() -> Vec<(PartitionKind, Url)> {
        [ROOT, OFFLINE, MANIFEST]
            .iter()
            .map(|u| (PartitionKind::Page, Url::parse(u).unwrap()))
            .collect()
    }

    fn request(url: &str) -> FetchRequest {
        FetchRequest::get(Url::parse(url).unwrap())
    }

    #[tokio::test]
    async fn test_precache_stores_exactly_the_manifest() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = StoreManager::new(db.clone(), "v3");
        let network = ScriptedNetwork::new();
        network.respond(ROOT, 200, "<h1>Ana Sayfa</h1>");
        network.respond(OFFLINE, 200, "<h1>Çevrimdışı</h1>");
        network.respond(MANIFEST, 200, "{}");

        let stored = store.ensure_precached(network.as_ref(), &targets()).await.unwrap();
        assert_eq!(stored, 3);

        let page = store.partition(PartitionKind::Page);
        let mut expected = vec![ROOT, OFFLINE, MANIFEST];
        expected.sort();
        assert_eq!(db.entry_urls(&page).await.unwrap(), expected);

        for url in [ROOT, OFFLINE, MANIFEST] {
            let entry = store.get(PartitionKind::Page, &request(url)).await.unwrap();
            assert_eq!(entry.status, 200);
        }
    }

    #[tokio::test]
    async fn test_precache_is_all_or_nothing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = StoreManager::new(db.clone(), "v3");
        let network = ScriptedNetwork::new();
        network.respond(ROOT, 200, "<h1>Ana Sayfa</h1>");
        network.respond(OFFLINE, 404, "yok");
        network.respond(MANIFEST, 200, "{}");

        let result = store.ensure_precached(network.as_ref(), &targets()).await;
        assert!(matches!(result, Err(Error::PrecacheFailed(_))));
        assert_eq!(db.entry_count(&store.partition(PartitionKind::Page)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_precache_network_failure() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = StoreManager::new(db, "v3");
        let network = ScriptedNetwork::new();

        let result = store.ensure_precached(network.as_ref(), &targets()).await;
        assert!(matches!(result, Err(Error::PrecacheFailed(_))));
    }

    #[tokio::test]
    async fn test_collect_garbage_removes_other_versions_only() {
        let db = CacheDb::open_in_memory().await.unwrap();
        for version in ["v2", "v3"] {
            for kind in PartitionKind::ALL {
                db.open_partition(&PartitionId::new(kind, version)).await.unwrap();
            }
        }
        db.open_partition(&PartitionId::new(PartitionKind::Page, "v3-beta")).await.unwrap();

        let store = StoreManager::new(db.clone(), "v3");
        let mut deleted = store.collect_garbage().await.unwrap();
        deleted.sort();
        assert_eq!(deleted, vec!["image-cache-v2", "page-cache-v2", "page-cache-v3-beta", "static-cache-v2"]);

        for name in &deleted {
            assert!(!db.has_partition(name).await.unwrap());
        }
        assert_eq!(db.partition_names().await.unwrap(), vec!["image-cache-v3", "page-cache-v3", "static-cache-v3"]);

        assert!(store.collect_garbage().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_put_gates_on_status_200() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = StoreManager::new(db.clone(), "v3");
        let network = ScriptedNetwork::new();
        let missing = "https://egepenakcayapi.com.tr/eski-sayfa";
        network.respond(missing, 404, "bulunamadı");

        let req = request(missing);
        let response = network.fetch(&req).await.unwrap();
        assert!(!store.put(PartitionKind::Page, &req, &response).await);
        assert!(store.get(PartitionKind::Page, &req).await.is_none());
    }

    #[tokio::test]
    async fn test_storage_failure_degrades() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = StoreManager::new(db.clone(), "v3");
        let network = ScriptedNetwork::new();
        network.respond(ROOT, 200, "ok");
        let req = request(ROOT);
        let response = network.fetch(&req).await.unwrap();

        db.close().await.unwrap();

        assert!(!store.put(PartitionKind::Page, &req, &response).await);
        assert!(store.get(PartitionKind::Page, &req).await.is_none());
    }
}
