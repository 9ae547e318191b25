use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("Station id must not be empty")]
    EmptyStationId,

    #[error("Upstream call budget exhausted, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),
}
