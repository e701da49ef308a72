//! User position lookup with a timeout and a short-lived cache

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::config::GeolocationConfig;
use crate::gazetteer::Coordinates;

/// Why no position is available
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GeoError {
    #[error("Location permission denied. Please enable location access.")]
    PermissionDenied,

    #[error("Location information unavailable.")]
    PositionUnavailable,

    #[error("Location request timed out.")]
    Timeout,
}

/// Where positions come from
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// Ask the platform for a fresh high-accuracy fix
    ///
    /// # Errors
    ///
    /// Returns error if the position cannot be determined
    async fn current_position(&self) -> Result<Coordinates, GeoError>;
}

/// A position fixed in configuration
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub Coordinates);

#[async_trait]
impl PositionSource for FixedPosition {
    async fn current_position(&self) -> Result<Coordinates, GeoError> {
        Ok(self.0)
    }
}

/// No positioning on this system
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPosition;

#[async_trait]
impl PositionSource for NoPosition {
    async fn current_position(&self) -> Result<Coordinates, GeoError> {
        Err(GeoError::PositionUnavailable)
    }
}

/// What the controller asks for a position
#[async_trait]
pub trait Geolocator: Send + Sync {
    /// Current user position
    ///
    /// # Errors
    ///
    /// Returns error if no position could be obtained in time
    async fn locate(&self) -> Result<Coordinates, GeoError>;
}

/// Bounds every lookup by a timeout and reuses fixes younger than `max_age`
pub struct CachedGeolocator {
    source: Box<dyn PositionSource>,
    timeout: Duration,
    max_age: Duration,
    cache: tokio::sync::Mutex<Option<(Coordinates, Instant)>>,
}

impl CachedGeolocator {
    #[must_use]
    pub fn new(source: Box<dyn PositionSource>, timeout: Duration, max_age: Duration) -> Self {
        Self {
            source,
            timeout,
            max_age,
            cache: tokio::sync::Mutex::new(None),
        }
    }

    /// Build from configuration: a fixed position if one is set, otherwise none
    #[must_use]
    pub fn from_config(config: &GeolocationConfig) -> Self {
        let source: Box<dyn PositionSource> = match config.fixed {
            Some(coordinates) => Box::new(FixedPosition(coordinates)),
            None => Box::new(NoPosition),
        };
        Self::new(source, config.timeout, config.max_age)
    }
}

#[async_trait]
impl Geolocator for CachedGeolocator {
    async fn locate(&self) -> Result<Coordinates, GeoError> {
        let mut cache = self.cache.lock().await;

        if let Some((coordinates, at)) = *cache {
            if at.elapsed() <= self.max_age {
                tracing::trace!(%coordinates, "using cached position");
                return Ok(coordinates);
            }
        }

        let coordinates = tokio::time::timeout(self.timeout, self.source.current_position())
            .await
            .map_err(|_| GeoError::Timeout)??;

        tracing::debug!(%coordinates, "position acquired");
        *cache = Some((coordinates, Instant::now()));
        Ok(coordinates)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct CountingSource {
        calls: Arc<AtomicUsize>,
        delay: Duration,
        result: Result<Coordinates, GeoError>,
    }

    #[async_trait]
    impl PositionSource for CountingSource {
        async fn current_position(&self) -> Result<Coordinates, GeoError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.result
        }
    }

    fn locator(delay: Duration, result: Result<Coordinates, GeoError>) -> (CachedGeolocator, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = CountingSource {
            calls: Arc::clone(&calls),
            delay,
            result,
        };
        (
            CachedGeolocator::new(Box::new(source), Duration::from_secs(10), Duration::from_secs(60)),
            calls,
        )
    }

    const HERE: Coordinates = Coordinates::new(12.5, 75.0);

    #[tokio::test(start_paused = true)]
    async fn test_cache_within_max_age() {
        let (locator, calls) = locator(Duration::ZERO, Ok(HERE));

        assert_eq!(locator.locate().await, Ok(HERE));
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(locator.locate().await, Ok(HERE));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(locator.locate().await, Ok(HERE));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let (locator, _) = locator(Duration::from_secs(30), Ok(HERE));
        assert_eq!(locator.locate().await, Err(GeoError::Timeout));
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_are_not_cached() {
        let (locator, calls) = locator(Duration::ZERO, Err(GeoError::PermissionDenied));
        assert_eq!(locator.locate().await, Err(GeoError::PermissionDenied));
        assert_eq!(locator.locate().await, Err(GeoError::PermissionDenied));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_from_config() {
        let mut config = GeolocationConfig::default();
        let locator = CachedGeolocator::from_config(&config);
        assert_eq!(locator.locate().await, Err(GeoError::PositionUnavailable));

        config.fixed = Some(HERE);
        let locator = CachedGeolocator::from_config(&config);
        assert_eq!(locator.locate().await, Ok(HERE));
    }

    #[test]
    fn test_messages() {
        assert_eq!(GeoError::Timeout.to_string(), "Location request timed out.");
    }
}
