use chrono::TimeDelta;
use geo::{Distance, Haversine, InterpolatableLine, Line, LineLocatePoint};
use itertools::Itertools;
use log::debug;

use crate::geo::{seconds, Coordinate, GeoError, LineString, DEFAULT_WALKING_SPEED_MPS};

pub const DEFAULT_EPSILON: f64 = 10.0; // 10m
pub const DEFAULT_INTERVAL: TimeDelta = TimeDelta::seconds(10);

/// Reduces a coordinate sequence to a smaller, representative
/// subsequence. Implementations must keep both endpoints.
pub trait RouteSimplifier: Send + Sync {
    fn down_sample(&self, route: &LineString) -> Result<LineString, GeoError>;
}

/// Returns the input unchanged, used when simplification is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpSimplifier;

impl RouteSimplifier for NoOpSimplifier {
    fn down_sample(&self, route: &LineString) -> Result<LineString, GeoError> {
        Ok(route.clone())
    }
}

/// Perpendicular-distance (Ramer–Douglas–Peucker) simplification
/// over geodesic distances.
///
/// Within each sub-sequence bounded by `start` and `end`, the point
/// furthest from the chord `start - end` becomes an anchor if it lies more
/// than `epsilon` meters away, splitting the sub-sequence in two.
/// Otherwise the sub-sequence collapses to its endpoints.
#[derive(Debug, Clone, Copy)]
pub struct PerpendicularDistance {
    pub epsilon: f64,
}

impl Default for PerpendicularDistance {
    fn default() -> Self {
        PerpendicularDistance {
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl PerpendicularDistance {
    pub fn new(epsilon: f64) -> Result<Self, GeoError> {
        if epsilon.is_nan() || epsilon < 0.0 {
            return Err(GeoError::InvalidParameter {
                name: "epsilon",
                value: epsilon,
            });
        }

        Ok(PerpendicularDistance { epsilon })
    }

    /// The index and distance (meters) of the point within `(start, end)`
    /// furthest from the chord between them.
    fn furthest(route: &[Coordinate], start: usize, end: usize) -> Option<(usize, f64)> {
        let chord = Line::new(route[start].point(), route[end].point());

        (start + 1..end)
            .map(|index| (index, chord_distance(&chord, &route[index])))
            .fold(None, |furthest, (index, distance)| match furthest {
                Some((_, max)) if max >= distance => furthest,
                _ => Some((index, distance)),
            })
    }
}

/// Geodesic distance from `point` to its projection upon `chord`.
pub(crate) fn chord_distance(chord: &Line, point: &Coordinate) -> f64 {
    let point = point.point();

    // We locate the point upon the chord, and then project
    // that fraction upon the chord to obtain the closest point.
    chord
        .line_locate_point(&point)
        .filter(|fraction| fraction.is_finite())
        .map(|fraction| chord.point_at_ratio_from_start(&Haversine, fraction))
        .map_or_else(
            || Haversine.distance(chord.start_point(), point),
            |projected| Haversine.distance(projected, point),
        )
}

impl RouteSimplifier for PerpendicularDistance {
    fn down_sample(&self, route: &LineString) -> Result<LineString, GeoError> {
        let size = route.len();
        if size < 3 {
            return Ok(route.clone());
        }

        let mut keep = vec![false; size];
        keep[0] = true;
        keep[size - 1] = true;

        let mut pending = vec![(0usize, size - 1)];
        while let Some((start, end)) = pending.pop() {
            let Some((index, distance)) = Self::furthest(route, start, end) else {
                continue;
            };

            if distance > self.epsilon {
                keep[index] = true;
                pending.push((start, index));
                pending.push((index, end));
            }
        }

        let simplified = route
            .iter()
            .zip(keep)
            .filter_map(|(coordinate, keep)| keep.then_some(*coordinate))
            .collect::<LineString>();

        debug!(
            "Simplified {} coordinates to {} (epsilon={}m)",
            size,
            simplified.len(),
            self.epsilon
        );

        Ok(simplified)
    }
}

/// Cumulative walking-time simplification.
///
/// Walks the sequence, accumulating the walking time between consecutive
/// points, and emits a point each time the accumulated time reaches the
/// interval. The interval is then subtracted from the accumulator, so the
/// remainder carries over to the next point. The first and last points are
/// always emitted.
#[derive(Debug, Clone, Copy)]
pub struct TimeThreshold {
    pub interval: TimeDelta,
    pub walking_speed: f64,
}

impl Default for TimeThreshold {
    fn default() -> Self {
        TimeThreshold {
            interval: DEFAULT_INTERVAL,
            walking_speed: DEFAULT_WALKING_SPEED_MPS,
        }
    }
}

impl TimeThreshold {
    pub fn new(interval: TimeDelta, walking_speed: f64) -> Result<Self, GeoError> {
        if interval <= TimeDelta::zero() {
            return Err(GeoError::InvalidParameter {
                name: "interval",
                value: seconds(interval),
            });
        }

        if walking_speed.is_nan() || walking_speed <= 0.0 {
            return Err(GeoError::InvalidParameter {
                name: "walking_speed",
                value: walking_speed,
            });
        }

        Ok(TimeThreshold {
            interval,
            walking_speed,
        })
    }
}

impl RouteSimplifier for TimeThreshold {
    fn down_sample(&self, route: &LineString) -> Result<LineString, GeoError> {
        let (first, last) = match (route.first(), route.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Err(GeoError::EmptyRoute),
        };

        if route.len() == 1 {
            return Ok(route.clone());
        }

        let interval = seconds(self.interval);
        let mut accumulated = 0.0;
        let mut emitted = vec![first];
        let mut last_emitted = 0;

        for (index, (previous, current)) in route.iter().tuple_windows().enumerate() {
            accumulated += Haversine.distance(previous.point(), current.point()) / self.walking_speed;

            if accumulated >= interval {
                emitted.push(*current);
                last_emitted = index + 1;
                accumulated -= interval;
            }
        }

        if last_emitted != route.len() - 1 {
            emitted.push(last);
        }

        Ok(LineString::new(emitted))
    }
}
