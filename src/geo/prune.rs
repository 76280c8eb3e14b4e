use chrono::TimeDelta;
use log::debug;
use rstar::{RTree, RTreeObject, AABB};
use rustc_hash::FxHashMap;
#[cfg(feature = "tracing")]
use tracing::Level;

use crate::geo::{meters_to_degrees, walking_meters, Coordinate, CoordinateKey, GeoError, LineString};

/// Minimum search radius of a prune, regardless of the walking budget.
pub const DEFAULT_MIN_PRUNE_RADIUS: f64 = 50.0; // 50m

/// Reduces a route to the coordinates a rider could walk to.
pub trait RoutePruner: Send + Sync {
    /// Returns, in travel order, every distinct route coordinate within
    /// walking reach of `origin` given the walking `budget`.
    fn prune(&self, origin: &Coordinate, budget: TimeDelta) -> Result<LineString, GeoError>;
}

/// Returns the full route, used when pruning is disabled.
#[derive(Debug, Clone)]
pub struct NoOpPruner {
    route: LineString,
}

impl NoOpPruner {
    pub fn new(route: LineString) -> Self {
        NoOpPruner { route }
    }
}

impl RoutePruner for NoOpPruner {
    fn prune(&self, _origin: &Coordinate, _budget: TimeDelta) -> Result<LineString, GeoError> {
        Ok(self.route.clone())
    }
}

/// A pair of consecutive route coordinates, stored within the R-Tree,
/// along with their indices in the route.
///
/// A single-point route is stored as one degenerate segment.
#[derive(Debug, Clone, Copy)]
pub struct Segment {
    pub a: (usize, Coordinate),
    pub b: (usize, Coordinate),
}

impl RTreeObject for Segment {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        let (_, a) = self.a;
        let (_, b) = self.b;
        AABB::from_corners([a.lng(), a.lat()], [b.lng(), b.lat()])
    }
}

/// Prunes a route through an R-Tree of its segments.
///
/// The walking budget is converted to a radius at a fixed walking speed,
/// and the radius to degrees. Segments whose bounding box intersects the
/// square envelope of that radius around the origin are candidates, of
/// which only the endpoints within the (planar, squared) radius are kept.
/// The planar approximation holds at walking-distance scales.
pub struct RTreePruner {
    index: RTree<Segment>,
    walking_speed: f64,
    min_radius: f64,
}

impl RTreePruner {
    /// Indexes every segment of `route`. The route must not be empty.
    pub fn new(route: &LineString, walking_speed: f64, min_radius: f64) -> Result<Self, GeoError> {
        if route.is_empty() {
            return Err(GeoError::EmptyRoute);
        }

        if walking_speed.is_nan() || walking_speed <= 0.0 {
            return Err(GeoError::InvalidParameter {
                name: "walking_speed",
                value: walking_speed,
            });
        }

        let segments = match route.len() {
            1 => vec![Segment {
                a: (0, route[0]),
                b: (0, route[0]),
            }],
            _ => route
                .windows(2)
                .enumerate()
                .map(|(start, pair)| Segment {
                    a: (start, pair[0]),
                    b: (start + 1, pair[1]),
                })
                .collect(),
        };

        Ok(RTreePruner {
            index: RTree::bulk_load(segments),
            walking_speed,
            min_radius,
        })
    }

    pub fn size(&self) -> usize {
        self.index.size()
    }

    /// The search radius of a budget, in degrees.
    pub fn radius(&self, budget: TimeDelta) -> f64 {
        meters_to_degrees(walking_meters(budget, self.walking_speed).max(self.min_radius))
    }
}

impl RoutePruner for RTreePruner {
    #[cfg_attr(feature = "tracing", tracing::instrument(level = Level::DEBUG, skip(self)))]
    fn prune(&self, origin: &Coordinate, budget: TimeDelta) -> Result<LineString, GeoError> {
        let radius = self.radius(budget);
        let radius_squared = radius * radius;

        let envelope = AABB::from_corners(
            [origin.lng() - radius, origin.lat() - radius],
            [origin.lng() + radius, origin.lat() + radius],
        );

        // Keep the first route index of every distinct coordinate in reach.
        let mut collected: FxHashMap<CoordinateKey, (usize, Coordinate)> = FxHashMap::default();
        for segment in self.index.locate_in_envelope_intersecting(&envelope) {
            for (index, point) in [segment.a, segment.b] {
                if squared_distance(origin, &point) > radius_squared {
                    continue;
                }

                collected
                    .entry(point.key())
                    .and_modify(|entry| entry.0 = entry.0.min(index))
                    .or_insert((index, point));
            }
        }

        let mut within = collected.into_values().collect::<Vec<_>>();
        within.sort_unstable_by_key(|(index, _)| *index);

        debug!(
            "Pruned {} segments to {} coordinates within {:.1}m",
            self.index.size(),
            within.len(),
            radius / meters_to_degrees(1.0)
        );

        Ok(within.into_iter().map(|(_, point)| point).collect())
    }
}

/// Planar squared distance, in degrees.
#[inline]
pub(crate) fn squared_distance(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat = a.lat() - b.lat();
    let lng = a.lng() - b.lng();
    lat * lat + lng * lng
}
