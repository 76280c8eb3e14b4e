//! Pickup and dropoff selection.
//!
//! For a given offer, the rider boards at the point of the offer's route
//! they can walk to soonest, and leaves at the point from which their
//! destination is soonest reached on foot. Selections are memoised per
//! `(offer, request)` for the duration of a run.

use std::sync::Arc;

use chrono::TimeDelta;
use log::debug;
use scc::hash_map::Entry;
use scc::HashMap;
#[cfg(feature = "tracing")]
use tracing::Level;

use crate::cancel::Cancellation;
use crate::config::MatcherConfig;
use crate::error::{Context, Error, Result};
use crate::geo::{ClosestPointResolver, Coordinate, NoOpPruner, RTreePruner, RoutePruner, RouteSimplifier};
use crate::model::{Offer, OfferId, PathPoint, PickupDropoffResult, Request, RequestId};
use crate::oracle::RoutingOracle;

#[cfg(test)]
mod test;

/// Memoised pickup/dropoff selections, keyed by `(offer, request)`.
///
/// Safe for concurrent use. Two workers missing the same key both compute
/// it, and the last write wins; selections are deterministic so either is
/// correct.
#[derive(Default)]
pub struct PickupDropoffCache {
    results: HashMap<(OfferId, RequestId), PickupDropoffResult>,
}

impl PickupDropoffCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, offer: &Offer, request: &Request) -> Option<PickupDropoffResult> {
        self.results
            .get(&(offer.id.clone(), request.id.clone()))
            .map(|entry| entry.get().clone())
    }

    pub fn put(&self, offer: &Offer, request: &Request, result: PickupDropoffResult) {
        match self.results.entry((offer.id.clone(), request.id.clone())) {
            Entry::Occupied(mut entry) => *entry.get_mut() = result,
            Entry::Vacant(entry) => {
                entry.insert_entry(result);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Selects where a request boards and leaves an offer.
///
/// Holds one [`ClosestPointResolver`] per offer, built lazily over the
/// driving route through the offer's stops.
pub struct PickupDropoffSelector {
    oracle: Arc<dyn RoutingOracle>,
    cache: Arc<PickupDropoffCache>,
    resolvers: HashMap<OfferId, Arc<ClosestPointResolver>>,
    simplifier: Arc<dyn RouteSimplifier>,

    enable_pruning: bool,
    walking_speed: f64,
    min_prune_radius: f64,
}

impl PickupDropoffSelector {
    pub fn new(
        oracle: Arc<dyn RoutingOracle>,
        cache: Arc<PickupDropoffCache>,
        config: &MatcherConfig,
    ) -> Result<Self> {
        Ok(PickupDropoffSelector {
            oracle,
            cache,
            resolvers: HashMap::new(),
            simplifier: config.simplifier().context("configuring simplifier")?,
            enable_pruning: config.enable_pruning,
            walking_speed: config.walking_speed_mps,
            min_prune_radius: config.min_prune_radius_meters,
        })
    }

    pub fn cache(&self) -> &Arc<PickupDropoffCache> {
        &self.cache
    }

    /// The pickup and dropoff of `request` along `offer`, computed on
    /// first use and served from the cache afterwards.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = Level::DEBUG, skip_all, fields(offer = %offer.id, request = %request.id)))]
    pub fn select(&self, ctx: &Cancellation, offer: &Offer, request: &Arc<Request>) -> Result<PickupDropoffResult> {
        if let Some(result) = self.cache.get(offer, request) {
            return Ok(result);
        }

        let resolver = self.resolver(ctx, offer)?;

        let (pickup, pickup_walking) = self.reach(ctx, &resolver, &request.source, request.max_walking)?;
        let pickup_walking = match pickup_walking {
            Some(walking) => walking,
            None => self
                .oracle
                .compute_walking_time(ctx, &request.source, &pickup)
                .context("computing pickup walking time")?,
        };

        let (dropoff, dropoff_walking) = self.reach(ctx, &resolver, &request.destination, request.max_walking)?;
        let dropoff_walking = match dropoff_walking {
            Some(walking) => walking,
            None => self
                .oracle
                .compute_walking_time(ctx, &dropoff, &request.destination)
                .context("computing dropoff walking time")?,
        };

        let result = PickupDropoffResult {
            pickup: PathPoint::pickup(pickup, pickup_walking, request.clone()),
            dropoff: PathPoint::dropoff(dropoff, dropoff_walking, request.clone()),
        };

        self.cache.put(offer, request, result.clone());
        Ok(result)
    }

    /// The route point closest to `point`. If none lies within the walking
    /// budget, the point itself is snapped to the road instead and the
    /// walking time is known to be zero.
    fn reach(
        &self,
        ctx: &Cancellation,
        resolver: &ClosestPointResolver,
        point: &Coordinate,
        budget: TimeDelta,
    ) -> Result<(Coordinate, Option<TimeDelta>)> {
        match resolver.compute_closest_route_point(ctx, point, budget) {
            Ok((closest, duration)) if duration <= budget => return Ok((closest, None)),
            Ok((_, duration)) => {
                debug!("Closest route point to {} is {}s away, snapping to road", point, duration.num_seconds())
            }
            Err(Error::OutOfReach(_)) => debug!("No route point near {}, snapping to road", point),
            Err(err) => return Err(err).context("resolving closest route point"),
        }

        let snapped = self
            .oracle
            .snap_point_to_road(ctx, point)
            .context("snapping point to road")?;

        Ok((snapped, Some(TimeDelta::zero())))
    }

    fn resolver(&self, ctx: &Cancellation, offer: &Offer) -> Result<Arc<ClosestPointResolver>> {
        if let Some(resolver) = self.resolvers.get(&offer.id) {
            return Ok(resolver.get().clone());
        }

        let route = self
            .oracle
            .plan_driving_route(ctx, &offer.stops(), offer.departure)
            .context("planning offer route")?;

        let pruner: Box<dyn RoutePruner> = if self.enable_pruning {
            Box::new(
                RTreePruner::new(&route.polyline, self.walking_speed, self.min_prune_radius)
                    .context("indexing offer route")?,
            )
        } else {
            Box::new(NoOpPruner::new(route.polyline))
        };

        let resolver = Arc::new(ClosestPointResolver::new(pruner, self.simplifier.clone(), self.oracle.clone()));

        match self.resolvers.entry(offer.id.clone()) {
            Entry::Occupied(mut entry) => *entry.get_mut() = resolver.clone(),
            Entry::Vacant(entry) => {
                entry.insert_entry(resolver.clone());
            }
        }

        Ok(resolver)
    }
}
