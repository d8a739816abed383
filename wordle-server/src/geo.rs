use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

use wordle_core::GeoTimezone;

/// Successful lookups are reused for a day.
pub const GEO_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Resolves a client address to the timezone it is registered in.
#[async_trait]
pub trait GeoLocator: Send + Sync {
    /// `None` means no signal: lookup failed or the address is unknown.
    async fn locate(&self, ip: IpAddr) -> Option<GeoTimezone>;
}

struct CachedGeo {
    geo: GeoTimezone,
    fetched_at: Instant,
}

pub struct GeoCache {
    entries: Mutex<HashMap<IpAddr, CachedGeo>>,
    ttl: Duration,
}

impl GeoCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub async fn get(&self, ip: &IpAddr) -> Option<GeoTimezone> {
        let mut entries = self.entries.lock().await;
        match entries.get(ip) {
            Some(entry) if entry.fetched_at.elapsed() < self.ttl => Some(entry.geo.clone()),
            Some(_) => {
                entries.remove(ip);
                None
            }
            None => None,
        }
    }

    /// Stores a lookup and drops every expired entry.
    pub async fn insert(&self, ip: IpAddr, geo: GeoTimezone) {
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| entry.fetched_at.elapsed() < self.ttl);
        entries.insert(
            ip,
            CachedGeo {
                geo,
                fetched_at: Instant::now(),
            },
        );
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    #[serde(default)]
    timezone: String,
    #[serde(default)]
    offset: i32,
}

/// ip-api.com client with a per-IP cache.
pub struct IpApiLocator {
    client: Client,
    base_url: String,
    cache: GeoCache,
}

impl IpApiLocator {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
            tracing::warn!("Failed to build geolocation HTTP client, using defaults: {:?}", e);
            Client::new()
        });

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache: GeoCache::new(GEO_CACHE_TTL),
        }
    }

    async fn fetch(&self, ip: IpAddr) -> Option<GeoTimezone> {
        let url = format!("{}/{}?fields=status,timezone,offset", self.base_url, ip);
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(%ip, "Geolocation lookup failed: {:?}", e);
                return None;
            }
        };

        let body: IpApiResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(%ip, "Unreadable geolocation response: {:?}", e);
                return None;
            }
        };

        if body.status != "success" || body.timezone.is_empty() {
            return None;
        }

        Some(GeoTimezone {
            timezone: body.timezone,
            utc_offset_seconds: body.offset,
        })
    }
}

#[async_trait]
impl GeoLocator for IpApiLocator {
    async fn locate(&self, ip: IpAddr) -> Option<GeoTimezone> {
        if let Some(geo) = self.cache.get(&ip).await {
            return Some(geo);
        }

        let geo = self.fetch(ip).await?;
        self.cache.insert(ip, geo.clone()).await;
        Some(geo)
    }
}
