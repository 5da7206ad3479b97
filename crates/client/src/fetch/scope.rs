//! Interception scope.
//!
//! Decides which requests the worker may touch at all: only GET over
//! http(s) to the site's own hosts or to a local development host.
//! Everything else (third-party analytics, CDN fonts, foreign APIs) is
//! passed through untouched.
use std::net::IpAddr;

use reqwest::Method;
use url::{Host, Url};

/// Whether a host is a local development host.
///
/// This covers:
/// - `localhost` and any `*.localhost` name
/// - Loopback addresses (127.0.0.0/8, ::1)
/// - The unspecified address some dev servers bind (0.0.0.0, ::)
pub fn is_local_host(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(name) => {
            let name = name.trim_end_matches('.');
            name.eq_ignore_ascii_case("localhost") || name.to_ascii_lowercase().ends_with(".localhost")
        }
        Host::Ipv4(v4) => is_loopback_or_unspecified(IpAddr::V4(*v4)),
        Host::Ipv6(v6) => is_loopback_or_unspecified(IpAddr::V6(*v6)),
    }
}

fn is_loopback_or_unspecified(ip: IpAddr) -> bool {
    ip.is_loopback() || ip.is_unspecified()
}

/// Hosts the worker intercepts.
#[derive(Debug, Clone)]
pub struct Scope {
    domains: Vec<String>,
    allow_local: bool,
}

impl Scope {
    pub fn new(domains: &[String], allow_local: bool) -> Self {
        let domains = domains
            .iter()
            .map(|d| d.trim().trim_end_matches('.').to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        Self { domains, allow_local }
    }

    /// Whether the host is the site itself (or one of its subdomains).
    pub fn is_site_host(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        self.domains
            .iter()
            .any(|d| host == *d || host.strip_suffix(d.as_str()).is_some_and(|rest| rest.ends_with('.')))
    }

    /// Whether a request is eligible for interception.
    pub fn intercepts(&self, method: &Method, url: &Url) -> bool {
        if *method != Method::GET {
            return false;
        }
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }
        match url.host() {
            Some(Host::Domain(name)) if self.is_site_host(name) => true,
            Some(host) => self.allow_local && is_local_host(&host),
            None => false,
        }
    }
}
