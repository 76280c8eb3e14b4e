use chrono::{DateTime, TimeDelta, Utc};
use geo::{Distance, Haversine, InterpolatePoint};
use itertools::Itertools;

use crate::cancel::Cancellation;
use crate::geo::{try_from_seconds, Coordinate, LineString, DEFAULT_WALKING_SPEED_MPS};
use crate::oracle::{require_legs, Legs, Matrix, MatrixParams, OracleError, Profile, Route, RoutingOracle};

pub const DEFAULT_DRIVING_SPEED_MPS: f64 = 10.0;
pub const DEFAULT_STEP_METERS: f64 = 25.0;

/// A deterministic, network-free oracle.
///
/// Every trip is the great-circle path between its waypoints, travelled at
/// a constant speed per profile. Route polylines are densified so that no
/// two consecutive coordinates lie more than `step_meters` apart, which
/// gives the spatial pruner something realistic to index. Snapping is the
/// identity.
#[derive(Debug, Clone, Copy)]
pub struct StraightLineOracle {
    pub driving_speed: f64,
    pub walking_speed: f64,
    pub step_meters: f64,
}

impl Default for StraightLineOracle {
    fn default() -> Self {
        StraightLineOracle {
            driving_speed: DEFAULT_DRIVING_SPEED_MPS,
            walking_speed: DEFAULT_WALKING_SPEED_MPS,
            step_meters: DEFAULT_STEP_METERS,
        }
    }
}

impl StraightLineOracle {
    pub fn new(driving_speed: f64, walking_speed: f64, step_meters: f64) -> Self {
        StraightLineOracle {
            driving_speed,
            walking_speed,
            step_meters,
        }
    }

    fn speed(&self, profile: Profile) -> f64 {
        match profile {
            Profile::Auto => self.driving_speed,
            Profile::Pedestrian => self.walking_speed,
        }
    }

    fn travel(&self, from: &Coordinate, to: &Coordinate, profile: Profile) -> Result<(TimeDelta, f64), OracleError> {
        let meters = Haversine.distance(from.point(), to.point());
        let duration = try_from_seconds(meters / self.speed(profile))
            .map_err(|err| OracleError::InvalidRequest(format!("{} speed: {}", profile, err)))?;

        Ok((duration, meters))
    }

    /// Intermediate coordinates of `from -> to`, `from` included and `to` excluded.
    fn densify(&self, from: &Coordinate, to: &Coordinate) -> impl Iterator<Item = Coordinate> {
        let (start, end) = (from.point(), to.point());
        let meters = Haversine.distance(start, end);
        let steps = (meters / self.step_meters.max(1.0)).ceil().max(1.0) as usize;

        (0..steps).filter_map(move |step| {
            let point = Haversine.point_at_ratio_between(start, end, step as f64 / steps as f64);
            Coordinate::try_from(point).ok()
        })
    }
}

impl RoutingOracle for StraightLineOracle {
    fn plan_driving_route(
        &self,
        ctx: &Cancellation,
        waypoints: &[Coordinate],
        _departure: DateTime<Utc>,
    ) -> Result<Route, OracleError> {
        ctx.check()?;
        require_legs(waypoints)?;

        let mut polyline = waypoints
            .iter()
            .tuple_windows()
            .flat_map(|(from, to)| self.densify(from, to))
            .collect::<Vec<_>>();
        polyline.extend(waypoints.last().copied());

        let (legs, distance) = waypoints.iter().tuple_windows().try_fold(
            (Legs::new(), 0.0),
            |(mut legs, distance), (from, to)| {
                let (duration, meters) = self.travel(from, to, Profile::Auto)?;
                legs.push(duration);
                Ok::<_, OracleError>((legs, distance + meters))
            },
        )?;

        Ok(Route {
            polyline: LineString::new(polyline),
            legs,
            distance,
        })
    }

    fn compute_driving_time(
        &self,
        ctx: &Cancellation,
        waypoints: &[Coordinate],
        _departure: DateTime<Utc>,
    ) -> Result<Legs, OracleError> {
        ctx.check()?;
        require_legs(waypoints)?;

        waypoints
            .iter()
            .tuple_windows()
            .map(|(from, to)| self.travel(from, to, Profile::Auto).map(|(duration, _)| duration))
            .collect()
    }

    fn compute_walking_time(
        &self,
        ctx: &Cancellation,
        from: &Coordinate,
        to: &Coordinate,
    ) -> Result<TimeDelta, OracleError> {
        ctx.check()?;
        self.travel(from, to, Profile::Pedestrian).map(|(duration, _)| duration)
    }

    fn compute_distance_time_matrix(
        &self,
        ctx: &Cancellation,
        params: &MatrixParams,
    ) -> Result<Matrix, OracleError> {
        ctx.check()?;

        let (times, distances) = params
            .sources
            .iter()
            .map(|source| {
                params
                    .targets
                    .iter()
                    .map(|target| self.travel(source, target, params.profile))
                    .collect::<Result<Vec<_>, _>>()
                    .map(|row| row.into_iter().unzip::<_, _, Vec<_>, Vec<_>>())
            })
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .unzip();

        Ok(Matrix::new(times, distances))
    }

    fn snap_point_to_road(&self, ctx: &Cancellation, point: &Coordinate) -> Result<Coordinate, OracleError> {
        ctx.check()?;
        Ok(*point)
    }
}
