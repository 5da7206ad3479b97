//! Resource classification.
//!
//! Pure decision logic mapping a request path to a partition and a
//! retrieval strategy. First match wins: image extensions, then static
//! asset extensions, then network-first prefixes, then everything else is
//! a page.

use egecache_core::PartitionKind;
use url::Url;

/// Image extensions, matched case-insensitively.
pub const IMAGE_EXTENSIONS: &[&str] = &[".webp", ".jpg", ".jpeg", ".png", ".svg", ".ico", ".avif"];

/// Static asset extensions, matched case-sensitively.
pub const STATIC_EXTENSIONS: &[&str] = &[".js", ".css", ".woff", ".woff2", ".ttf", ".eot"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceClass {
    Image,
    Static,
    /// Paths under a configured network-first prefix.
    Dynamic,
    Page,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    CacheFirst,
    CacheFirstWithExpiry { max_age: chrono::Duration },
    StaleWhileRevalidate,
    NetworkFirst,
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::CacheFirst => "cache-first",
            Strategy::CacheFirstWithExpiry { .. } => "cache-first-with-expiry",
            Strategy::StaleWhileRevalidate => "stale-while-revalidate",
            Strategy::NetworkFirst => "network-first",
        }
    }
}

/// Partition and strategy chosen for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub class: ResourceClass,
    pub partition: PartitionKind,
    pub strategy: Strategy,
}

#[derive(Debug, Clone)]
pub struct Classifier {
    network_first_prefixes: Vec<String>,
    image_max_age: chrono::Duration,
}

impl Default for Classifier {
    fn default() -> Self {
        Self { network_first_prefixes: Vec::new(), image_max_age: chrono::Duration::days(30) }
    }
}

impl Classifier {
    pub fn new(network_first_prefixes: Vec<String>, image_max_age: chrono::Duration) -> Self {
        Self { network_first_prefixes, image_max_age }
    }

    pub fn classify_path(&self, path: &str) -> ResourceClass {
        let lowered = path.to_ascii_lowercase();
        if IMAGE_EXTENSIONS.iter().any(|ext| lowered.ends_with(ext)) {
            ResourceClass::Image
        } else if STATIC_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
            ResourceClass::Static
        } else if self.network_first_prefixes.iter().any(|prefix| path.starts_with(prefix.as_str())) {
            ResourceClass::Dynamic
        } else {
            ResourceClass::Page
        }
    }

    pub fn route_for(&self, class: ResourceClass) -> Route {
        let (partition, strategy) = match class {
            ResourceClass::Image => {
                (PartitionKind::Image, Strategy::CacheFirstWithExpiry { max_age: self.image_max_age })
            }
            ResourceClass::Static => (PartitionKind::Static, Strategy::CacheFirst),
            ResourceClass::Dynamic => (PartitionKind::Page, Strategy::NetworkFirst),
            ResourceClass::Page => (PartitionKind::Page, Strategy::StaleWhileRevalidate),
        };
        Route { class, partition, strategy }
    }

    /// Classify by URL path; the query string never affects the class.
    pub fn route(&self, url: &Url) -> Route {
        self.route_for(self.classify_path(url.path()))
    }
}
