//! Error types for the route store.

use std::path::PathBuf;

use super::time::TimeError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store file exists but could not be opened or read
    #[error("cannot read route file {}", path.display())]
    FileNotReadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The store file could not be written
    #[error("cannot write route file {}", path.display())]
    FileNotWritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The store file is not a JSON array of route objects
    #[error("route file {} is not a JSON array of routes", path.display())]
    MalformedStore {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A supplied or stored time is not in HH:MM format
    #[error("time {value:?} is not in HH:MM format")]
    InvalidTimeFormat {
        value: String,
        #[source]
        source: TimeError,
    },
}

impl StoreError {
    pub fn invalid_time(value: &str, source: TimeError) -> Self {
        StoreError::InvalidTimeFormat {
            value: value.to_string(),
            source,
        }
    }
}
