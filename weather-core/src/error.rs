use std::path::PathBuf;

/// Failure reported by a weather fetcher. The reason is shown to the user
/// verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct FetchFailure {
    pub reason: String,
}

impl FetchFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

/// Everything the coordinator can surface through `UiState::error`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoordinatorError {
    #[error("Location permission denied. Grant permission to use your current location.")]
    PermissionDenied,
    #[error("Location services are disabled. Enable positioning and try again.")]
    PositioningDisabled,
    #[error("Couldn't retrieve location. Make sure to grant permission and enable GPS.")]
    LocationUnavailable,
    #[error(
        "Invalid coordinate ({latitude}, {longitude}): \
         latitude must be within -90..90 and longitude within -180..180"
    )]
    InvalidCoordinate { latitude: f64, longitude: f64 },
    #[error("No saved location yet. Use your current location or pick a point on the map.")]
    NoSavedLocation,
    #[error("Couldn't save location: {0}")]
    PersistenceFailed(String),
    #[error(transparent)]
    Fetch(#[from] FetchFailure),
}

/// Coordinate store I/O errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to access coordinate file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse coordinate file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to serialize coordinate: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_failure_message_is_verbatim() {
        let err = CoordinatorError::from(FetchFailure::new("timeout"));
        assert_eq!(err.to_string(), "timeout");
    }

    #[test]
    fn invalid_coordinate_mentions_values() {
        let err = CoordinatorError::InvalidCoordinate { latitude: 91.0, longitude: 0.0 };
        assert!(err.to_string().contains("91"));
    }
}
