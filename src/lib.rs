mod acquisition;
mod cache;
mod cluster;
mod error;
mod governor;
mod normalize;
mod stationmap;
mod types;

pub use error::{ErrorKind, StationMapError};
pub use stationmap::*;

pub use cluster::engine::*;

pub use types::geo::*;
pub use types::historical::*;
pub use types::station::*;

pub use normalize::{normalize_historical, normalize_stations};

pub use acquisition::error::AcquisitionError;
pub use cluster::error::ClusterError;
