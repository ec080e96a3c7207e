//! Origin validation for WebSocket upgrade requests
//!
//! Browsers always send an Origin header on WebSocket handshakes. Unless the
//! policy is configured to allow everything, a request is accepted when its
//! origin is on the configured allow-list or points at a loopback or
//! RFC 1918 private-network host.

use std::collections::HashSet;

use url::{Host, Url};

use crate::config::OriginConfig;

/// Origin-validation policy applied before the protocol upgrade
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allow_all: bool,
    allowed: HashSet<String>,
}

impl OriginPolicy {
    pub fn new(config: &OriginConfig) -> Self {
        Self {
            allow_all: config.allow_all,
            allowed: config
                .allowed_origins
                .iter()
                .map(|o| o.to_lowercase())
                .collect(),
        }
    }

    /// Permissive policy used when origin checking is explicitly disabled
    pub fn allow_all() -> Self {
        Self {
            allow_all: true,
            allowed: HashSet::new(),
        }
    }

    /// Whether a request carrying the given Origin header may upgrade.
    ///
    /// A missing or empty Origin header is rejected unless the policy allows
    /// everything.
    pub fn allows(&self, origin: Option<&str>) -> bool {
        if self.allow_all {
            return true;
        }

        let origin = match origin {
            Some(o) if !o.is_empty() => o.to_lowercase(),
            _ => return false,
        };

        self.allowed.contains(&origin) || is_local_origin(&origin)
    }
}

/// Accept http(s) origins pointing at localhost, loopback, or private
/// network addresses
fn is_local_origin(origin: &str) -> bool {
    let url = match Url::parse(origin) {
        Ok(u) => u,
        Err(_) => return false,
    };

    if url.scheme() != "http" && url.scheme() != "https" {
        return false;
    }

    match url.host() {
        Some(Host::Domain(domain)) => domain == "localhost",
        Some(Host::Ipv4(ip)) => ip.is_loopback() || ip.is_private(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}
