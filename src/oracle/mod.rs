//! The routing engine boundary.
//!
//! The matching core consumes a [`RoutingOracle`] for every driving,
//! walking and snapping question it asks. Each call receives the run's
//! [`Cancellation`] and fails with an [`OracleError`] on transport or
//! upstream failure, which is never interpreted as infeasibility.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::cancel::Cancellation;
use crate::geo::{Coordinate, LineString};

#[doc(hidden)]
pub mod error;
#[doc(hidden)]
pub mod straight;

#[cfg(feature = "osrm")]
pub mod osrm;

#[cfg(test)]
pub(crate) mod testing;

#[doc(inline)]
pub use error::OracleError;
#[doc(inline)]
pub use straight::StraightLineOracle;

/// Per-leg durations of a multi-waypoint trip.
pub type Legs = SmallVec<[TimeDelta; 4]>;

/// The travel mode a query is answered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum Profile {
    #[strum(serialize = "driving")]
    Auto,
    #[strum(serialize = "foot")]
    Pedestrian,
}

/// A planned driving route through a list of waypoints.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// The road geometry of the route, in travel order.
    pub polyline: LineString,
    /// Duration of each leg between consecutive waypoints.
    pub legs: Legs,
    /// Road distance, in meters.
    pub distance: f64,
}

impl Route {
    pub fn duration(&self) -> TimeDelta {
        self.legs.iter().fold(TimeDelta::zero(), |total, leg| total + *leg)
    }
}

/// The parameters of a one-to-many or many-to-many travel time query.
#[derive(Debug, Clone)]
pub struct MatrixParams {
    pub sources: Vec<Coordinate>,
    pub targets: Vec<Coordinate>,
    pub profile: Profile,
    pub departure: Option<DateTime<Utc>>,
}

impl MatrixParams {
    pub fn new(sources: Vec<Coordinate>, targets: Vec<Coordinate>, profile: Profile) -> Self {
        MatrixParams {
            sources,
            targets,
            profile,
            departure: None,
        }
    }

    pub fn with_departure(mut self, departure: DateTime<Utc>) -> Self {
        self.departure = Some(departure);
        self
    }
}

/// A `sources x targets` grid of travel times and distances.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Matrix {
    times: Vec<Vec<TimeDelta>>,
    distances: Vec<Vec<f64>>,
}

impl Matrix {
    pub fn new(times: Vec<Vec<TimeDelta>>, distances: Vec<Vec<f64>>) -> Self {
        Matrix { times, distances }
    }

    pub fn times(&self) -> &[Vec<TimeDelta>] {
        &self.times
    }

    pub fn distances(&self) -> &[Vec<f64>] {
        &self.distances
    }
}

/// A routing engine, queried by every stage of the matching pipeline.
///
/// Implementations must be `Send + Sync`: a single oracle is shared by
/// all evaluation workers of a run.
pub trait RoutingOracle: Send + Sync {
    /// Plans a driving route visiting `waypoints` in order.
    fn plan_driving_route(
        &self,
        ctx: &Cancellation,
        waypoints: &[Coordinate],
        departure: DateTime<Utc>,
    ) -> Result<Route, OracleError>;

    /// Driving duration of each leg, `waypoints.len() - 1` entries.
    fn compute_driving_time(
        &self,
        ctx: &Cancellation,
        waypoints: &[Coordinate],
        departure: DateTime<Utc>,
    ) -> Result<Legs, OracleError>;

    fn compute_walking_time(
        &self,
        ctx: &Cancellation,
        from: &Coordinate,
        to: &Coordinate,
    ) -> Result<TimeDelta, OracleError>;

    fn compute_distance_time_matrix(
        &self,
        ctx: &Cancellation,
        params: &MatrixParams,
    ) -> Result<Matrix, OracleError>;

    /// The closest point on the road network to `point`.
    fn snap_point_to_road(&self, ctx: &Cancellation, point: &Coordinate) -> Result<Coordinate, OracleError>;
}

/// Checks the waypoint count of a multi-leg query.
pub(crate) fn require_legs(waypoints: &[Coordinate]) -> Result<(), OracleError> {
    if waypoints.len() < 2 {
        return Err(OracleError::InvalidRequest(format!(
            "at least two waypoints are required, given {}",
            waypoints.len()
        )));
    }

    Ok(())
}
