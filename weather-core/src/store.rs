//! Durable storage of the last used coordinate.
//!
//! The on-disk layout is a small TOML table with two float entries,
//! `LATITUDE` and `LONGITUDE`. Both are written together; a file holding only
//! one of them reads back as "no saved location".

use std::{
    fmt::Debug,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{error::StoreError, model::Coordinate};

#[async_trait]
pub trait CoordinateStore: Send + Sync + Debug {
    async fn read(&self) -> Result<Option<Coordinate>, StoreError>;
    async fn write(&self, coordinate: Coordinate) -> Result<(), StoreError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedCoordinate {
    #[serde(rename = "LATITUDE", default, skip_serializing_if = "Option::is_none")]
    latitude: Option<f64>,
    #[serde(rename = "LONGITUDE", default, skip_serializing_if = "Option::is_none")]
    longitude: Option<f64>,
}

impl PersistedCoordinate {
    fn into_coordinate(self) -> Option<Coordinate> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinate { latitude, longitude }),
            _ => None,
        }
    }
}

/// TOML-file backed store. Clones share one write lock.
#[derive(Debug, Clone)]
pub struct FileCoordinateStore {
    path: PathBuf,
    write_lock: Arc<tokio::sync::Mutex<()>>,
}

impl FileCoordinateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Arc::new(tokio::sync::Mutex::new(())) }
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io { path: self.path.clone(), source }
    }
}

#[async_trait]
impl CoordinateStore for FileCoordinateStore {
    async fn read(&self) -> Result<Option<Coordinate>, StoreError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        let persisted: PersistedCoordinate = toml::from_str(&contents)
            .map_err(|source| StoreError::Parse { path: self.path.clone(), source })?;

        Ok(persisted.into_coordinate())
    }

    async fn write(&self, coordinate: Coordinate) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| self.io_error(e))?;
        }

        let body = toml::to_string(&PersistedCoordinate {
            latitude: Some(coordinate.latitude),
            longitude: Some(coordinate.longitude),
        })?;

        // Write-then-rename so a reader never sees half a pair. Overlapping
        // writers share the temp file, so they go one at a time.
        let _guard = self.write_lock.lock().await;
        let tmp = self.path.with_extension("toml.tmp");
        tokio::fs::write(&tmp, body).await.map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| self.io_error(e))?;

        tracing::debug!(path = %self.path.display(), %coordinate, "saved coordinate");
        Ok(())
    }
}

/// In-process store, used for ephemeral sessions and tests.
#[derive(Debug, Default)]
pub struct MemoryCoordinateStore {
    slot: Mutex<Option<Coordinate>>,
}

impl MemoryCoordinateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_coordinate(coordinate: Coordinate) -> Self {
        Self { slot: Mutex::new(Some(coordinate)) }
    }
}

#[async_trait]
impl CoordinateStore for MemoryCoordinateStore {
    async fn read(&self) -> Result<Option<Coordinate>, StoreError> {
        Ok(*self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner()))
    }

    async fn write(&self, coordinate: Coordinate) -> Result<(), StoreError> {
        *self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(coordinate);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_reads_as_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileCoordinateStore::new(dir.path().join("location.toml"));
        assert_eq!(store.read().await.expect("read"), None);
    }

    #[tokio::test]
    async fn write_then_read_returns_same_coordinate() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileCoordinateStore::new(dir.path().join("nested/dir/location.toml"));

        store.write(Coordinate::new(37.7749, -122.4194)).await.expect("write");

        let read = store.read().await.expect("read");
        assert_eq!(read, Some(Coordinate::new(37.7749, -122.4194)));
    }

    #[tokio::test]
    async fn file_uses_upper_case_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("location.toml");
        let store = FileCoordinateStore::new(&path);

        store.write(Coordinate::new(1.5, 2.5)).await.expect("write");

        let raw = std::fs::read_to_string(&path).expect("raw file");
        assert!(raw.contains("LATITUDE = 1.5"));
        assert!(raw.contains("LONGITUDE = 2.5"));
    }

    #[tokio::test]
    async fn half_written_pair_reads_as_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("location.toml");
        std::fs::write(&path, "LATITUDE = 10.0\n").expect("seed file");

        let store = FileCoordinateStore::new(&path);
        assert_eq!(store.read().await.expect("read"), None);
    }

    #[tokio::test]
    async fn zero_zero_is_a_real_location() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileCoordinateStore::new(dir.path().join("location.toml"));

        store.write(Coordinate::new(0.0, 0.0)).await.expect("write");
        assert_eq!(store.read().await.expect("read"), Some(Coordinate::new(0.0, 0.0)));
    }

    #[tokio::test]
    async fn garbage_file_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("location.toml");
        std::fs::write(&path, "not = [valid").expect("seed file");

        let err = FileCoordinateStore::new(&path).read().await.unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn overlapping_writes_all_succeed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileCoordinateStore::new(dir.path().join("location.toml"));

        let writers: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.write(Coordinate::new(i as f64, i as f64)).await })
            })
            .collect();

        for writer in writers {
            writer.await.expect("task").expect("write should succeed");
        }

        let saved = store.read().await.expect("read").expect("a coordinate");
        assert_eq!(saved.latitude, saved.longitude);
        assert!(!dir.path().join("location.toml.tmp").exists());
    }

    #[tokio::test]
    async fn memory_store_overwrites() {
        let store = MemoryCoordinateStore::with_coordinate(Coordinate::new(1.0, 1.0));
        store.write(Coordinate::new(2.0, 2.0)).await.expect("write");
        assert_eq!(store.read().await.expect("read"), Some(Coordinate::new(2.0, 2.0)));
    }
}
