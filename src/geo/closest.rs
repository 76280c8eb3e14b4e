use std::sync::Arc;

use chrono::TimeDelta;
use log::trace;
#[cfg(feature = "tracing")]
use tracing::Level;

use crate::cancel::Cancellation;
use crate::error::{Context, Error, Result};
use crate::geo::{Coordinate, RoutePruner, RouteSimplifier};
use crate::oracle::{MatrixParams, Profile, RoutingOracle};

/// Resolves the point of a single route a rider can reach soonest on foot.
///
/// The route is pruned around the rider, the pruned subset simplified,
/// and the walking time to every remaining point asked of the oracle in a
/// single one-to-many matrix query.
pub struct ClosestPointResolver {
    pruner: Box<dyn RoutePruner>,
    simplifier: Arc<dyn RouteSimplifier>,
    oracle: Arc<dyn RoutingOracle>,
}

impl ClosestPointResolver {
    pub fn new(
        pruner: Box<dyn RoutePruner>,
        simplifier: Arc<dyn RouteSimplifier>,
        oracle: Arc<dyn RoutingOracle>,
    ) -> Self {
        ClosestPointResolver {
            pruner,
            simplifier,
            oracle,
        }
    }

    /// Returns the route point with the shortest walking time from `point`,
    /// and that walking time. Ties resolve to the earliest point in travel
    /// order.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = Level::DEBUG, skip(self, ctx)))]
    pub fn compute_closest_route_point(
        &self,
        ctx: &Cancellation,
        point: &Coordinate,
        walking_budget: TimeDelta,
    ) -> Result<(Coordinate, TimeDelta)> {
        let pruned = self
            .pruner
            .prune(point, walking_budget)
            .context("pruning route")?;

        if pruned.is_empty() {
            return Err(Error::OutOfReach(*point));
        }

        let targets = self
            .simplifier
            .down_sample(&pruned)
            .context("simplifying route")?;

        let params = MatrixParams::new(vec![*point], targets.to_vec(), Profile::Pedestrian);
        let matrix = self
            .oracle
            .compute_distance_time_matrix(ctx, &params)
            .context("computing walking matrix")?;

        let row = matrix
            .times()
            .first()
            .ok_or_else(|| Error::InvalidInput("walking matrix has no rows".to_string()))?;

        let mut closest: Option<(usize, TimeDelta)> = None;
        for (index, duration) in row.iter().enumerate().take(targets.len()) {
            match closest {
                Some((_, best)) if best <= *duration => {}
                _ => closest = Some((index, *duration)),
            }
        }

        let (index, duration) =
            closest.ok_or_else(|| Error::InvalidInput("walking matrix row is empty".to_string()))?;

        trace!(
            "Closest of {} candidates to {} is #{} at {}s",
            targets.len(),
            point,
            index,
            duration.num_seconds()
        );

        Ok((targets[index], duration))
    }
}
