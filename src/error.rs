use crate::acquisition::error::AcquisitionError;
use crate::cluster::error::ClusterError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Top-level error for every fallible [`StationMap`](crate::StationMap)
/// operation.
#[derive(Debug, Error)]
pub enum StationMapError {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error(transparent)]
    Cluster(#[from] ClusterError),
}

/// Coarse classification of a [`StationMapError`], stable across the exact
/// failure variants. Useful for mapping errors onto HTTP responses or
/// retry policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller passed something invalid (empty station id, unknown
    /// cluster id).
    BadRequest,
    /// The outbound call budget is exhausted; retry later.
    RateLimited,
    /// The upstream answered with a non-success HTTP status.
    UpstreamError,
    /// The upstream could not be reached or returned an unusable body.
    FetchFailed,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::UpstreamError => "upstream_error",
            ErrorKind::FetchFailed => "fetch_failed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StationMapError {
    /// Classifies this error into a coarse [`ErrorKind`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            StationMapError::Acquisition(e) => match e {
                AcquisitionError::EmptyStationId => ErrorKind::BadRequest,
                AcquisitionError::RateLimited { .. } => ErrorKind::RateLimited,
                AcquisitionError::HttpStatus { .. } => ErrorKind::UpstreamError,
                AcquisitionError::NetworkRequest(..) => ErrorKind::FetchFailed,
            },
            StationMapError::Cluster(ClusterError::UnknownCluster(_)) => ErrorKind::BadRequest,
        }
    }

    /// For rate-limit denials, how long the caller should wait before
    /// retrying. `None` for every other error.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            StationMapError::Acquisition(AcquisitionError::RateLimited { retry_after }) => {
                Some(*retry_after)
            }
            _ => None,
        }
    }
}
