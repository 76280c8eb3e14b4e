//! Instrumented oracles for tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, TimeDelta, Utc};

use crate::cancel::Cancellation;
use crate::geo::Coordinate;
use crate::oracle::{Legs, Matrix, MatrixParams, OracleError, Profile, Route, RoutingOracle, StraightLineOracle};

type FailWhen = Box<dyn Fn(&[Coordinate]) -> bool + Send + Sync>;

/// Wraps an oracle, counting calls per operation.
///
/// A failure predicate may be installed, in which case any
/// `compute_driving_time` call whose waypoints satisfy it fails with
/// a transport error instead of reaching the inner oracle.
pub struct CountingOracle<O = StraightLineOracle> {
    inner: O,
    fail_when: Option<FailWhen>,

    pub plan: AtomicUsize,
    pub driving: AtomicUsize,
    pub walking: AtomicUsize,
    pub matrix: AtomicUsize,
    pub snap: AtomicUsize,
    pub failures: AtomicUsize,
}

impl Default for CountingOracle {
    fn default() -> Self {
        Self::new(StraightLineOracle::default())
    }
}

impl<O: RoutingOracle> CountingOracle<O> {
    pub fn new(inner: O) -> Self {
        CountingOracle {
            inner,
            fail_when: None,
            plan: AtomicUsize::new(0),
            driving: AtomicUsize::new(0),
            walking: AtomicUsize::new(0),
            matrix: AtomicUsize::new(0),
            snap: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
        }
    }

    pub fn failing_when(mut self, predicate: impl Fn(&[Coordinate]) -> bool + Send + Sync + 'static) -> Self {
        self.fail_when = Some(Box::new(predicate));
        self
    }

    pub fn total(&self) -> usize {
        [&self.plan, &self.driving, &self.walking, &self.matrix, &self.snap]
            .into_iter()
            .map(|counter| counter.load(Ordering::SeqCst))
            .sum()
    }
}

/// Reads one of a [`CountingOracle`]'s counters.
pub fn count(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

impl<O: RoutingOracle> RoutingOracle for CountingOracle<O> {
    fn plan_driving_route(
        &self,
        ctx: &Cancellation,
        waypoints: &[Coordinate],
        departure: DateTime<Utc>,
    ) -> Result<Route, OracleError> {
        self.plan.fetch_add(1, Ordering::SeqCst);
        self.inner.plan_driving_route(ctx, waypoints, departure)
    }

    fn compute_driving_time(
        &self,
        ctx: &Cancellation,
        waypoints: &[Coordinate],
        departure: DateTime<Utc>,
    ) -> Result<Legs, OracleError> {
        self.driving.fetch_add(1, Ordering::SeqCst);

        if self.fail_when.as_ref().is_some_and(|fail| fail(waypoints)) {
            self.failures.fetch_add(1, Ordering::SeqCst);
            return Err(OracleError::Transport("connection reset by peer".to_string()));
        }

        self.inner.compute_driving_time(ctx, waypoints, departure)
    }

    fn compute_walking_time(
        &self,
        ctx: &Cancellation,
        from: &Coordinate,
        to: &Coordinate,
    ) -> Result<TimeDelta, OracleError> {
        self.walking.fetch_add(1, Ordering::SeqCst);
        self.inner.compute_walking_time(ctx, from, to)
    }

    fn compute_distance_time_matrix(
        &self,
        ctx: &Cancellation,
        params: &MatrixParams,
    ) -> Result<Matrix, OracleError> {
        self.matrix.fetch_add(1, Ordering::SeqCst);
        self.inner.compute_distance_time_matrix(ctx, params)
    }

    fn snap_point_to_road(&self, ctx: &Cancellation, point: &Coordinate) -> Result<Coordinate, OracleError> {
        self.snap.fetch_add(1, Ordering::SeqCst);
        self.inner.snap_point_to_road(ctx, point)
    }
}

/// Drives along the coordinate grid at a fixed pace, to the whole second.
///
/// A leg takes `pace` seconds per degree of latitude and longitude
/// travelled, so stops on a shared parallel give exact, predictable
/// durations. Walking, routes and snapping are answered by a
/// [`StraightLineOracle`].
pub struct FixedPaceOracle {
    pace: f64,
    inner: StraightLineOracle,
}

impl FixedPaceOracle {
    pub fn new(pace: f64) -> Self {
        FixedPaceOracle {
            pace,
            inner: StraightLineOracle::default(),
        }
    }

    fn leg(&self, from: &Coordinate, to: &Coordinate) -> TimeDelta {
        let degrees = (from.lat() - to.lat()).abs() + (from.lng() - to.lng()).abs();
        TimeDelta::seconds((degrees * self.pace).round() as i64)
    }
}

impl RoutingOracle for FixedPaceOracle {
    fn plan_driving_route(
        &self,
        ctx: &Cancellation,
        waypoints: &[Coordinate],
        departure: DateTime<Utc>,
    ) -> Result<Route, OracleError> {
        let mut route = self.inner.plan_driving_route(ctx, waypoints, departure)?;
        route.legs = waypoints.windows(2).map(|leg| self.leg(&leg[0], &leg[1])).collect();
        Ok(route)
    }

    fn compute_driving_time(
        &self,
        ctx: &Cancellation,
        waypoints: &[Coordinate],
        _departure: DateTime<Utc>,
    ) -> Result<Legs, OracleError> {
        ctx.check()?;
        crate::oracle::require_legs(waypoints)?;
        Ok(waypoints.windows(2).map(|leg| self.leg(&leg[0], &leg[1])).collect())
    }

    fn compute_walking_time(
        &self,
        ctx: &Cancellation,
        from: &Coordinate,
        to: &Coordinate,
    ) -> Result<TimeDelta, OracleError> {
        self.inner.compute_walking_time(ctx, from, to)
    }

    fn compute_distance_time_matrix(
        &self,
        ctx: &Cancellation,
        params: &MatrixParams,
    ) -> Result<Matrix, OracleError> {
        let matrix = self.inner.compute_distance_time_matrix(ctx, params)?;
        if params.profile == Profile::Pedestrian {
            return Ok(matrix);
        }

        let times = params
            .sources
            .iter()
            .map(|source| params.targets.iter().map(|target| self.leg(source, target)).collect())
            .collect();

        Ok(Matrix::new(times, matrix.distances().to_vec()))
    }

    fn snap_point_to_road(&self, ctx: &Cancellation, point: &Coordinate) -> Result<Coordinate, OracleError> {
        self.inner.snap_point_to_road(ctx, point)
    }
}
