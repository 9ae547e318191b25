//! This module provides the main entry point for the station map client.
//! It exposes the normalized station roster, per-station historical weather,
//! and zoom-aware cluster queries over the roster, all behind shared caches
//! and a single outbound rate budget.

use crate::acquisition::fetcher::{UpstreamFetcher, DEFAULT_BASE_URL};
use crate::cache::BoundedCache;
use crate::cluster::engine::{ClusterConfig, ClusterIndex, ClusterNode};
use crate::error::StationMapError;
use crate::governor::RateGovernor;
use crate::types::geo::Bbox;
use crate::types::historical::HistoricalPayload;
use crate::types::station::Station;
use bon::bon;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// A cluster index pinned to the roster snapshot it was built from.
///
/// As long as the roster cache keeps handing out the same snapshot, the
/// index is reused; a refreshed roster invalidates it.
struct IndexSnapshot {
    roster: Arc<Vec<Station>>,
    index: Arc<ClusterIndex>,
}

/// The main client for fetching and serving weather station data.
///
/// This struct fetches the station roster and per-station historical
/// observations from the upstream API, normalizes the loosely shaped
/// responses into typed records, and answers map viewport queries with
/// zoom-dependent clusters. Fetched data is cached with bounded capacity
/// and a TTL, and all outbound calls share one sliding-window rate budget.
///
/// Construction is cheap and performs no I/O; the first data call does.
///
/// # Examples
///
/// ```rust
/// use stationmap::StationMap;
///
/// // Default configuration, talking to the production upstream.
/// let client = StationMap::builder().build();
/// # let _ = client;
/// ```
pub struct StationMap {
    fetcher: UpstreamFetcher,
    cluster_config: ClusterConfig,
    index_slot: Mutex<Option<IndexSnapshot>>,
}

#[bon]
impl StationMap {
    /// Creates a new `StationMap` client.
    ///
    /// This method uses a builder pattern; every knob is optional.
    ///
    /// # Arguments
    ///
    /// * `.base_url(String)`: Optional. Upstream origin to fetch from. Defaults to the production API.
    /// * `.roster_cache_size(usize)`: Optional. Roster cache capacity. Defaults to `5`.
    /// * `.roster_cache_ttl(Duration)`: Optional. Roster freshness window. Defaults to 10 minutes.
    /// * `.historical_cache_size(usize)`: Optional. Historical cache capacity. Defaults to `500`.
    /// * `.historical_cache_ttl(Duration)`: Optional. Historical freshness window. Defaults to 5 minutes.
    /// * `.rate_window(Duration)`: Optional. Sliding window for the outbound call budget. Defaults to 60 seconds.
    /// * `.rate_ceiling(usize)`: Optional. Maximum upstream calls per window. Defaults to `20`.
    /// * `.cluster_radius(f64)`: Optional. Cluster merge radius in pixels. Defaults to `60.0`.
    /// * `.min_zoom(u8)`: Optional. Lowest zoom level clusters are built for. Defaults to `0`.
    /// * `.max_zoom(u8)`: Optional. Highest zoom level that still clusters. Defaults to `16`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use stationmap::StationMap;
    /// use std::time::Duration;
    ///
    /// let client = StationMap::builder()
    ///     .rate_ceiling(10)
    ///     .rate_window(Duration::from_secs(30))
    ///     .cluster_radius(40.0)
    ///     .build();
    /// # let _ = client;
    /// ```
    #[builder]
    pub fn new(
        base_url: Option<String>,
        roster_cache_size: Option<usize>,
        roster_cache_ttl: Option<Duration>,
        historical_cache_size: Option<usize>,
        historical_cache_ttl: Option<Duration>,
        rate_window: Option<Duration>,
        rate_ceiling: Option<usize>,
        cluster_radius: Option<f64>,
        min_zoom: Option<u8>,
        max_zoom: Option<u8>,
    ) -> Self {
        // Defaults below are applied if the corresponding builder method
        // was not called.
        let governor = RateGovernor::new(
            rate_window.unwrap_or(Duration::from_secs(60)),
            rate_ceiling.unwrap_or(20),
        );
        let roster_cache = BoundedCache::new(
            roster_cache_size.unwrap_or(5),
            roster_cache_ttl.unwrap_or(Duration::from_secs(600)),
        );
        let historical_cache = BoundedCache::new(
            historical_cache_size.unwrap_or(500),
            historical_cache_ttl.unwrap_or(Duration::from_secs(300)),
        );
        let defaults = ClusterConfig::default();
        let cluster_config = ClusterConfig {
            radius: cluster_radius.unwrap_or(defaults.radius),
            min_zoom: min_zoom.unwrap_or(defaults.min_zoom),
            max_zoom: max_zoom.unwrap_or(defaults.max_zoom),
        };

        Self {
            fetcher: UpstreamFetcher::new(
                base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                governor,
                roster_cache,
                historical_cache,
            ),
            cluster_config,
            index_slot: Mutex::new(None),
        }
    }

    /// Returns the full normalized station roster.
    ///
    /// Served from cache while fresh; otherwise one upstream call is made,
    /// the response is normalized (malformed records are dropped), and the
    /// result is cached. Cache hits do not consume rate budget.
    ///
    /// # Errors
    ///
    /// Returns [`StationMapError`] when the rate budget is exhausted, the
    /// upstream answers with an error status, or the response is unusable.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use stationmap::{StationMap, StationMapError};
    /// # async fn run() -> Result<(), StationMapError> {
    /// let client = StationMap::builder().build();
    /// let stations = client.roster().await?;
    /// println!("{} stations", stations.len());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn roster(&self) -> Result<Arc<Vec<Station>>, StationMapError> {
        Ok(self.fetcher.roster().await?)
    }

    /// Returns normalized historical observations for one station.
    ///
    /// The returned payload carries the surviving records plus warnings for
    /// whatever had to be dropped or was missing upstream. Responses are
    /// cached per station id.
    ///
    /// # Arguments
    ///
    /// * `station_id` - The station identifier, e.g. `"KJFK"`. Must not be empty.
    ///
    /// # Errors
    ///
    /// Returns [`StationMapError`] with kind `bad_request` for an empty id,
    /// `rate_limited` when the budget is exhausted, and `upstream_error` or
    /// `fetch_failed` for upstream trouble.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use stationmap::{StationMap, StationMapError};
    /// # async fn run() -> Result<(), StationMapError> {
    /// let client = StationMap::builder().build();
    /// let payload = client.historical("KJFK").await?;
    /// for warning in &payload.warnings {
    ///     eprintln!("{warning}");
    /// }
    /// println!("{} records", payload.data.len());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn historical(
        &self,
        station_id: &str,
    ) -> Result<Arc<HistoricalPayload>, StationMapError> {
        Ok(self.fetcher.historical(station_id).await?)
    }

    /// Returns the cluster index for the current roster snapshot.
    ///
    /// The index is rebuilt only when the roster snapshot changes; repeated
    /// calls against the same snapshot return the same `Arc`.
    ///
    /// # Errors
    ///
    /// Returns [`StationMapError`] when the roster cannot be fetched.
    pub async fn cluster_index(&self) -> Result<Arc<ClusterIndex>, StationMapError> {
        let roster = self.fetcher.roster().await?;

        let mut slot = self.index_slot.lock().await;
        if let Some(snapshot) = slot.as_ref() {
            if Arc::ptr_eq(&snapshot.roster, &roster) {
                return Ok(Arc::clone(&snapshot.index));
            }
        }

        let index = Arc::new(ClusterIndex::new(Arc::clone(&roster), self.cluster_config));
        *slot = Some(IndexSnapshot {
            roster,
            index: Arc::clone(&index),
        });
        Ok(index)
    }

    /// Returns the clusters and single stations visible in a viewport.
    ///
    /// The bounding box may cross the antimeridian (west > east) and may be
    /// wider than the world; zoom is clamped to the configured range.
    ///
    /// # Arguments
    ///
    /// * `bbox` - The viewport in degrees ([`Bbox`]).
    /// * `zoom` - The map zoom level to cluster for.
    ///
    /// # Errors
    ///
    /// Returns [`StationMapError`] when the roster cannot be fetched.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use stationmap::{Bbox, ClusterNode, StationMap, StationMapError};
    /// # async fn run() -> Result<(), StationMapError> {
    /// let client = StationMap::builder().build();
    /// let nodes = client.clusters(Bbox::new(-125.0, 24.0, -66.0, 49.0), 4).await?;
    /// for node in &nodes {
    ///     match node {
    ///         ClusterNode::Single(station) => println!("station {}", station.id),
    ///         ClusterNode::Cluster(info) => println!("{} stations", info.point_count),
    ///     }
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn clusters(
        &self,
        bbox: Bbox,
        zoom: u8,
    ) -> Result<Vec<ClusterNode>, StationMapError> {
        let index = self.cluster_index().await?;
        Ok(index.clusters(bbox, zoom))
    }

    /// Returns the zoom level at which a cluster breaks apart.
    ///
    /// Useful for zoom-on-click: pass the id of a cluster returned by
    /// [`clusters`](Self::clusters) and jump the map to the answer.
    ///
    /// # Errors
    ///
    /// Returns [`StationMapError`] with kind `bad_request` when the id does
    /// not belong to any cluster in the current index.
    pub async fn expansion_zoom(&self, cluster_id: u64) -> Result<u8, StationMapError> {
        let index = self.cluster_index().await?;
        Ok(index.expansion_zoom(cluster_id)?)
    }

    /// Looks up one station in the roster by id, case-insensitively.
    ///
    /// Returns `None` when no station matches.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use stationmap::{StationMap, StationMapError};
    /// # async fn run() -> Result<(), StationMapError> {
    /// let client = StationMap::builder().build();
    /// if let Some(station) = client.find_station("kjfk").await? {
    ///     println!("{} at {}, {}", station.id, station.latitude, station.longitude);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn find_station(
        &self,
        station_id: &str,
    ) -> Result<Option<Station>, StationMapError> {
        let roster = self.fetcher.roster().await?;
        Ok(roster
            .iter()
            .find(|s| s.id.eq_ignore_ascii_case(station_id))
            .cloned())
    }
}
