//! Orchestrates "resolve coordinate → persist → fetch → publish".
//!
//! The coordinator owns the only writable handle to the [`UiState`]. Every
//! transition replaces the whole value inside a `watch` channel; surfaces get a
//! read-only [`watch::Receiver`].
//!
//! Each load takes a generation ticket when it starts. A publication carrying
//! a ticket older than the newest one is dropped, so the most recently
//! started load always owns the final visible state.

use std::{
    future::Future,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::sync::watch;

use crate::{
    error::{CoordinatorError, FetchFailure},
    location::LocationSource,
    model::{Coordinate, Phase, UiState, WeatherSnapshot},
    provider::WeatherFetcher,
    store::CoordinateStore,
};

const DEFAULT_LOCATION_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// What a finished load did with its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The load's terminal state was published.
    Published(Phase),
    /// A newer load started meanwhile; this result was dropped.
    Superseded,
}

/// Action the UI should offer next to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemedialAction {
    RequestPermission,
    OpenLocationSettings,
    Retry,
}

impl RemedialAction {
    pub fn label(&self) -> &'static str {
        match self {
            RemedialAction::RequestPermission => "Grant location permission",
            RemedialAction::OpenLocationSettings => "Turn on location",
            RemedialAction::Retry => "Retry",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Command {
    Explicit(Coordinate),
    DeviceLocation,
    Restore,
}

struct Inner {
    location: Arc<dyn LocationSource>,
    store: Arc<dyn CoordinateStore>,
    fetcher: Arc<dyn WeatherFetcher>,
    state: watch::Sender<UiState>,
    generation: AtomicU64,
    last_command: Mutex<Option<Command>>,
    location_timeout: Duration,
    fetch_timeout: Duration,
}

/// Presentation-state holder for the weather screens.
///
/// Cloning is cheap; clones share state, so overlapping loads can run on
/// separate tasks.
#[derive(Clone)]
pub struct WeatherCoordinator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for WeatherCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherCoordinator")
            .field("location", &self.inner.location)
            .field("store", &self.inner.store)
            .field("fetcher", &self.inner.fetcher)
            .field("generation", &self.inner.generation.load(Ordering::SeqCst))
            .finish()
    }
}

impl WeatherCoordinator {
    pub fn new(
        location: Arc<dyn LocationSource>,
        store: Arc<dyn CoordinateStore>,
        fetcher: Arc<dyn WeatherFetcher>,
    ) -> Self {
        Self::with_timeouts(
            location,
            store,
            fetcher,
            DEFAULT_LOCATION_TIMEOUT,
            DEFAULT_FETCH_TIMEOUT,
        )
    }

    pub fn with_timeouts(
        location: Arc<dyn LocationSource>,
        store: Arc<dyn CoordinateStore>,
        fetcher: Arc<dyn WeatherFetcher>,
        location_timeout: Duration,
        fetch_timeout: Duration,
    ) -> Self {
        let (state, _) = watch::channel(UiState::default());
        Self {
            inner: Arc::new(Inner {
                location,
                store,
                fetcher,
                state,
                generation: AtomicU64::new(0),
                last_command: Mutex::new(None),
                location_timeout,
                fetch_timeout,
            }),
        }
    }

    /// Read-only handle that observes every published state.
    pub fn subscribe(&self) -> watch::Receiver<UiState> {
        self.inner.state.subscribe()
    }

    pub fn state(&self) -> UiState {
        self.inner.state.borrow().clone()
    }

    /// Resolve a coordinate, persist it and load weather for it.
    ///
    /// With `explicit` set (a map tap) the location source is skipped. An
    /// out-of-range explicit coordinate is returned as
    /// [`CoordinatorError::InvalidCoordinate`] and changes nothing; every other
    /// failure is published through the state.
    pub async fn resolve_and_load(
        &self,
        explicit: Option<Coordinate>,
    ) -> Result<LoadOutcome, CoordinatorError> {
        if let Some(coordinate) = explicit {
            coordinate.validate()?;
        }
        Ok(self.load(explicit).await)
    }

    async fn load(&self, explicit: Option<Coordinate>) -> LoadOutcome {
        self.remember(match explicit {
            Some(coordinate) => Command::Explicit(coordinate),
            None => Command::DeviceLocation,
        });

        let ticket = self.begin();

        let coordinate = match explicit {
            Some(coordinate) => coordinate,
            None => match self.resolve_device_location().await {
                Ok(coordinate) => coordinate,
                Err(err) => return self.fail(ticket, err),
            },
        };

        if self.is_superseded(ticket) {
            tracing::debug!(ticket, %coordinate, "load superseded before persisting");
            return LoadOutcome::Superseded;
        }

        // Persist before fetching; a failed write only leaves a warning.
        let warning = match self.inner.store.write(coordinate).await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(%coordinate, "failed to persist coordinate: {}", e);
                Some(CoordinatorError::PersistenceFailed(e.to_string()).to_string())
            }
        };

        self.fetch_and_publish(ticket, coordinate, warning).await
    }

    /// Load weather for the saved coordinate without writing it back.
    pub async fn restore_from_persisted_coordinate(&self) -> LoadOutcome {
        self.remember(Command::Restore);
        let ticket = self.begin();

        let saved = match self.inner.store.read().await {
            Ok(saved) => saved,
            Err(e) => {
                tracing::warn!("failed to read saved coordinate: {}", e);
                None
            }
        };

        match saved {
            Some(coordinate) if coordinate.is_valid() => {
                self.fetch_and_publish(ticket, coordinate, None).await
            }
            Some(coordinate) => self.fail(
                ticket,
                CoordinatorError::InvalidCoordinate {
                    latitude: coordinate.latitude,
                    longitude: coordinate.longitude,
                },
            ),
            None => self.fail(ticket, CoordinatorError::NoSavedLocation),
        }
    }

    /// Repeat the previous command; restores the saved coordinate when there
    /// is none.
    pub async fn retry(&self) -> LoadOutcome {
        let last = *self.inner.last_command.lock().unwrap_or_else(|p| p.into_inner());

        match last {
            Some(Command::Explicit(coordinate)) => self.load(Some(coordinate)).await,
            Some(Command::DeviceLocation) => self.load(None).await,
            Some(Command::Restore) | None => self.restore_from_persisted_coordinate().await,
        }
    }

    /// The remedial action for the current preconditions, queried now rather
    /// than taken from when the error was raised.
    pub async fn remedy(&self) -> RemedialAction {
        if !self.inner.location.permission_granted().await {
            RemedialAction::RequestPermission
        } else if !self.inner.location.positioning_enabled().await {
            RemedialAction::OpenLocationSettings
        } else {
            RemedialAction::Retry
        }
    }

    async fn resolve_device_location(&self) -> Result<Coordinate, CoordinatorError> {
        let location = &self.inner.location;

        if !location.permission_granted().await {
            return Err(CoordinatorError::PermissionDenied);
        }
        if !location.positioning_enabled().await {
            return Err(CoordinatorError::PositioningDisabled);
        }

        if let Some(coordinate) = self.bounded_location(location.last_known()).await {
            return Ok(coordinate);
        }

        tracing::debug!("no cached position, requesting a single fix");
        self.bounded_location(location.request_single_fix())
            .await
            .ok_or(CoordinatorError::LocationUnavailable)
    }

    async fn bounded_location(
        &self,
        request: impl Future<Output = Option<Coordinate>>,
    ) -> Option<Coordinate> {
        match tokio::time::timeout(self.inner.location_timeout, request).await {
            Ok(Some(coordinate)) if coordinate.is_valid() => Some(coordinate),
            Ok(Some(coordinate)) => {
                tracing::warn!(%coordinate, "location source returned an out-of-range position");
                None
            }
            Ok(None) => None,
            Err(_) => {
                tracing::warn!(
                    timeout = ?self.inner.location_timeout,
                    "location request timed out"
                );
                None
            }
        }
    }

    async fn fetch_and_publish(
        &self,
        ticket: u64,
        coordinate: Coordinate,
        warning: Option<String>,
    ) -> LoadOutcome {
        self.publish(ticket, |prev| UiState {
            is_loading: true,
            error: None,
            coordinate: Some(coordinate),
            phase: Phase::Fetching,
            warning: warning.clone(),
            ..prev.clone()
        });

        let result = match tokio::time::timeout(
            self.inner.fetch_timeout,
            self.inner.fetcher.fetch(coordinate),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(FetchFailure::new("timeout")),
        };

        let next = match result {
            Ok(snapshot) => {
                tracing::info!(%coordinate, days = snapshot.by_day.len(), "weather loaded");
                ready_state(snapshot, coordinate, warning)
            }
            Err(failure) => {
                tracing::warn!(%coordinate, "weather fetch failed: {}", failure);
                UiState {
                    weather: None,
                    is_loading: false,
                    error: Some(CoordinatorError::Fetch(failure).to_string()),
                    coordinate: Some(coordinate),
                    phase: Phase::Failed,
                    warning,
                }
            }
        };

        let phase = next.phase;
        if self.publish(ticket, |_| next) {
            LoadOutcome::Published(phase)
        } else {
            LoadOutcome::Superseded
        }
    }

    fn fail(&self, ticket: u64, err: CoordinatorError) -> LoadOutcome {
        tracing::info!("load failed: {}", err);
        let published = self.publish(ticket, |prev| UiState {
            is_loading: false,
            error: Some(err.to_string()),
            phase: Phase::Failed,
            ..prev.clone()
        });

        if published {
            LoadOutcome::Published(Phase::Failed)
        } else {
            LoadOutcome::Superseded
        }
    }

    fn is_superseded(&self, ticket: u64) -> bool {
        self.inner.generation.load(Ordering::SeqCst) != ticket
    }

    /// Takes a new ticket and publishes the loading state for it.
    fn begin(&self) -> u64 {
        let ticket = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.publish(ticket, |prev| UiState {
            is_loading: true,
            error: None,
            warning: None,
            phase: Phase::ResolvingCoordinate,
            ..prev.clone()
        });
        ticket
    }

    /// Replaces the state if `ticket` is still the newest; returns whether it
    /// did.
    fn publish(&self, ticket: u64, next: impl FnOnce(&UiState) -> UiState) -> bool {
        let generation = &self.inner.generation;
        self.inner.state.send_if_modified(|state| {
            if generation.load(Ordering::SeqCst) != ticket {
                tracing::debug!(ticket, "dropping superseded state");
                return false;
            }
            *state = next(state);
            true
        })
    }

    fn remember(&self, command: Command) {
        *self.inner.last_command.lock().unwrap_or_else(|p| p.into_inner()) = Some(command);
    }
}

fn ready_state(
    snapshot: WeatherSnapshot,
    coordinate: Coordinate,
    warning: Option<String>,
) -> UiState {
    UiState {
        weather: Some(snapshot),
        is_loading: false,
        error: None,
        coordinate: Some(coordinate),
        phase: Phase::Ready,
        warning,
    }
}
