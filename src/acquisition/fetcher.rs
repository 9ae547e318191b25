//! Upstream acquisition: cache in front of a rate-governed HTTP fetch, with
//! normalization applied before anything is stored or returned.

use crate::acquisition::error::AcquisitionError;
use crate::cache::BoundedCache;
use crate::governor::RateGovernor;
use crate::normalize::stations::station_items;
use crate::normalize::{normalize_historical, normalize_stations};
use crate::types::historical::HistoricalPayload;
use crate::types::station::Station;
use log::{info, warn};
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Production upstream origin. Builders override this for tests.
pub const DEFAULT_BASE_URL: &str = "https://sfc.windbornesystems.com";

const ROSTER_CACHE_KEY: &str = "stations";
/// Retry hints handed out on denial; the roster refreshes rarely, per-station
/// history churns fast.
const ROSTER_RETRY_AFTER: Duration = Duration::from_secs(60);
const HISTORICAL_RETRY_AFTER: Duration = Duration::from_secs(5);

/// Fetches and normalizes upstream data, serving repeats from bounded caches.
///
/// Every operation follows the same template: serve from cache if fresh
/// (cache hits are exempt from rate limiting), otherwise ask the governor for
/// an admission, fetch, normalize, store, return. Failures are returned
/// without writing to the cache, so the next call retries the upstream.
///
/// Concurrent misses on the same key may each fetch and each store; the last
/// write wins and both callers get well-formed data.
pub struct UpstreamFetcher {
    base_url: String,
    http: Client,
    governor: Mutex<RateGovernor>,
    roster_cache: Mutex<BoundedCache<Arc<Vec<Station>>>>,
    historical_cache: Mutex<BoundedCache<Arc<HistoricalPayload>>>,
}

impl UpstreamFetcher {
    pub fn new(
        base_url: String,
        governor: RateGovernor,
        roster_cache: BoundedCache<Arc<Vec<Station>>>,
        historical_cache: BoundedCache<Arc<HistoricalPayload>>,
    ) -> Self {
        Self {
            base_url,
            http: Client::new(),
            governor: Mutex::new(governor),
            roster_cache: Mutex::new(roster_cache),
            historical_cache: Mutex::new(historical_cache),
        }
    }

    /// Returns the normalized station roster.
    pub async fn roster(&self) -> Result<Arc<Vec<Station>>, AcquisitionError> {
        {
            let mut cache = self.roster_cache.lock().await;
            if let Some(cached) = cache.get(ROSTER_CACHE_KEY) {
                info!("Roster served from cache ({} stations)", cached.len());
                return Ok(cached);
            }
        }

        self.admit(ROSTER_RETRY_AFTER).await?;

        let url = format!("{}/stations", self.base_url);
        let raw = self.fetch_json(self.http.get(&url), &url).await?;
        let stations = normalize_stations(&raw);
        let received = station_items(&raw).map_or(0, Vec::len);
        if received > stations.len() {
            warn!(
                "Dropped {} malformed station records out of {}",
                received - stations.len(),
                received
            );
        }
        info!("Normalized roster of {} stations", stations.len());

        let payload = Arc::new(stations);
        let mut cache = self.roster_cache.lock().await;
        cache.set(ROSTER_CACHE_KEY.to_string(), Arc::clone(&payload));
        Ok(payload)
    }

    /// Returns the normalized historical observations for one station.
    pub async fn historical(
        &self,
        station_id: &str,
    ) -> Result<Arc<HistoricalPayload>, AcquisitionError> {
        // Rejected before cache, governor or network are involved.
        if station_id.is_empty() {
            return Err(AcquisitionError::EmptyStationId);
        }

        let key = format!("hist:{station_id}");
        {
            let mut cache = self.historical_cache.lock().await;
            if let Some(cached) = cache.get(&key) {
                info!("Historical data for {} served from cache", station_id);
                return Ok(cached);
            }
        }

        self.admit(HISTORICAL_RETRY_AFTER).await?;

        let url = format!("{}/historical_weather", self.base_url);
        let request = self.http.get(&url).query(&[("station", station_id)]);
        let raw = self.fetch_json(request, &url).await?;
        let payload = Arc::new(normalize_historical(&raw));
        for warning in &payload.warnings {
            warn!("Station {}: {}", station_id, warning);
        }
        info!(
            "Normalized {} historical records for {}",
            payload.data.len(),
            station_id
        );

        let mut cache = self.historical_cache.lock().await;
        cache.set(key, Arc::clone(&payload));
        Ok(payload)
    }

    async fn admit(&self, retry_after: Duration) -> Result<(), AcquisitionError> {
        let mut governor = self.governor.lock().await;
        if governor.allow() {
            Ok(())
        } else {
            warn!("Upstream call denied by rate governor");
            Err(AcquisitionError::RateLimited { retry_after })
        }
    }

    /// Sends the request and parses the body as JSON, mapping HTTP statuses
    /// and transport failures to their own error variants.
    async fn fetch_json(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<Value, AcquisitionError> {
        info!("Fetching {}", url);
        let response = request
            .send()
            .await
            .map_err(|e| AcquisitionError::NetworkRequest(url.to_string(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", url, e);
                return Err(if let Some(status) = e.status() {
                    AcquisitionError::HttpStatus {
                        url: url.to_string(),
                        status,
                        source: e,
                    }
                } else {
                    AcquisitionError::NetworkRequest(url.to_string(), e)
                });
            }
        };

        response
            .json::<Value>()
            .await
            .map_err(|e| AcquisitionError::NetworkRequest(url.to_string(), e))
    }
}
