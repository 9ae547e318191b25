use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClusterError {
    #[error("No cluster with id {0}")]
    UnknownCluster(u64),
}
