//! Geodesic primitives used to reason about an offer's route:
//! pruning it around a rider, simplifying it, and resolving the
//! closest reachable point on it.

use chrono::TimeDelta;

/// Mean earth radius in meters, as used by [`geo::Haversine`].
pub const MEAN_EARTH_RADIUS: f64 = 6371008.8;

/// Fixed pedestrian speed, in meters per second.
pub const DEFAULT_WALKING_SPEED_MPS: f64 = 1.4;

#[doc(hidden)]
pub mod closest;
#[doc(hidden)]
pub mod coordinate;
#[doc(hidden)]
pub mod error;
#[doc(hidden)]
pub mod prune;
#[doc(hidden)]
pub mod simplify;


#[doc(inline)]
pub use closest::ClosestPointResolver;
#[doc(inline)]
pub use coordinate::{Coordinate, CoordinateKey, LineString};
#[doc(inline)]
pub use error::GeoError;
#[doc(inline)]
pub use prune::{NoOpPruner, RTreePruner, RoutePruner};
#[doc(inline)]
pub use simplify::{NoOpSimplifier, PerpendicularDistance, RouteSimplifier, TimeThreshold};

/// Converts a distance along the earth's surface into the
/// equivalent arc, in degrees.
#[inline]
pub fn meters_to_degrees(meters: f64) -> f64 {
    meters * 180.0 / (MEAN_EARTH_RADIUS * std::f64::consts::PI)
}

/// Distance covered on foot within `duration`.
#[inline]
pub fn walking_meters(duration: TimeDelta, speed_mps: f64) -> f64 {
    seconds(duration).max(0.0) * speed_mps
}

#[inline]
pub(crate) fn seconds(duration: TimeDelta) -> f64 {
    duration.num_milliseconds() as f64 / 1_000.0
}

/// The duration of `seconds`, rounded to the millisecond. Fails for
/// values which are not finite or lie beyond what a `TimeDelta` holds.
pub(crate) fn try_from_seconds(seconds: f64) -> Result<TimeDelta, GeoError> {
    let invalid = GeoError::InvalidParameter {
        name: "duration",
        value: seconds,
    };

    // `as` saturates, so out of range values are caught beforehand.
    let millis = (seconds * 1_000.0).round();
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return Err(invalid);
    }

    TimeDelta::try_milliseconds(millis as i64).ok_or(invalid)
}
