//! Insertion of a request's stops into an offer's path.
//!
//! The planner is the authoritative feasibility test for a match: a pair
//! which passed every check may still have no insertion that keeps all
//! riders' windows and the driver's seats intact.

use std::sync::Arc;

use chrono::TimeDelta;
use log::{debug, trace};
#[cfg(feature = "tracing")]
use tracing::Level;

use crate::cancel::Cancellation;
use crate::error::{Context, Error, Result};
use crate::model::{Offer, PathPoint, PointType, Request};
use crate::oracle::RoutingOracle;
use crate::pickup::PickupDropoffSelector;

#[doc(hidden)]
pub mod matrix;

#[cfg(test)]
mod test;

#[doc(inline)]
pub use matrix::{StopMatrix, TimeMatrixCache};

pub struct PathInsertionPlanner {
    oracle: Arc<dyn RoutingOracle>,
    selector: Arc<PickupDropoffSelector>,
    matrices: Arc<TimeMatrixCache>,
    default_detour: TimeDelta,
}

impl PathInsertionPlanner {
    pub fn new(
        oracle: Arc<dyn RoutingOracle>,
        selector: Arc<PickupDropoffSelector>,
        matrices: Arc<TimeMatrixCache>,
        default_detour: TimeDelta,
    ) -> Self {
        PathInsertionPlanner {
            oracle,
            selector,
            matrices,
            default_detour,
        }
    }

    /// Returns the first path, in increasing order of pickup and then
    /// dropoff position, which serves `request` alongside every rider
    /// already on `offer`. Expected arrival times of the returned path
    /// are rewritten. `None` if no insertion is feasible.
    ///
    /// Every leg is read from the offer's [`StopMatrix`], so a call makes
    /// at most one oracle query. The offer itself is never modified.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = Level::DEBUG, skip_all, fields(offer = %offer.id, request = %request.id)))]
    pub fn find_first_feasible_path(
        &self,
        ctx: &Cancellation,
        offer: &Offer,
        request: &Arc<Request>,
    ) -> Result<Option<Vec<PathPoint>>> {
        let selection = self.selector.select(ctx, offer, request)?;

        let matrix = self
            .matrices
            .matrix(
                ctx,
                self.oracle.as_ref(),
                offer,
                &[selection.pickup.coordinate, selection.dropoff.coordinate],
            )
            .context("computing stop matrix")?;
        let direct = matrix.legs(&[offer.source, offer.destination]).context("computing direct trip")?[0];

        let stops = offer.path.len();
        for pickup in 1..stops {
            for dropoff in pickup..stops {
                let mut trial = Vec::with_capacity(stops + 2);
                trial.extend_from_slice(&offer.path[..pickup]);
                trial.push(selection.pickup.clone());
                trial.extend_from_slice(&offer.path[pickup..dropoff]);
                trial.push(selection.dropoff.clone());
                trial.extend_from_slice(&offer.path[dropoff..]);

                if self.validate(&matrix, offer, &mut trial, direct)? {
                    debug!(
                        "Inserted {} into {} at positions ({}, {})",
                        request.id,
                        offer.id,
                        pickup,
                        dropoff + 1
                    );
                    return Ok(Some(trial));
                }
            }
        }

        trace!("No feasible insertion of {} into {}", request.id, offer.id);
        Ok(None)
    }

    /// Checks the detour, seat and timing constraints of a full path,
    /// writing the expected arrival of every stop as it goes.
    fn validate(&self, matrix: &StopMatrix, offer: &Offer, path: &mut [PathPoint], direct: TimeDelta) -> Result<bool> {
        let coordinates = path.iter().map(|point| point.coordinate).collect::<Vec<_>>();
        let legs = matrix.legs(&coordinates).context("computing path legs")?;

        let total = legs.iter().fold(TimeDelta::zero(), |total, leg| total + *leg);
        let budget = offer.detour_budget_or(self.default_detour);
        let detour = total - direct;
        if detour > budget {
            return Ok(false);
        }

        // Whatever the detour leaves of the budget may be spent waiting for riders.
        let mut allowance = budget - detour;
        let mut arrival = offer.departure;
        let mut occupancy = 0u32;

        for (index, point) in path.iter_mut().enumerate() {
            if index > 0 {
                arrival += legs[index - 1];
            }

            match (point.point_type, point.owner.as_ref()) {
                (PointType::Pickup, Some(rider)) => {
                    occupancy += rider.riders;
                    if occupancy > offer.capacity {
                        return Ok(false);
                    }

                    let ready = rider.earliest_departure + point.walking;
                    if arrival < ready {
                        let wait = ready - arrival;
                        if wait > allowance {
                            return Ok(false);
                        }

                        allowance -= wait;
                        arrival = ready;
                    }
                }
                (PointType::Dropoff, Some(rider)) => {
                    if arrival > rider.latest_arrival - point.walking {
                        return Ok(false);
                    }

                    occupancy = occupancy.saturating_sub(rider.riders);
                }
                (PointType::Endpoint, _) => {}
                (point_type, None) => {
                    return Err(Error::InvalidInput(format!(
                        "{} stop of offer {} has no owning request",
                        point_type, offer.id
                    )))
                }
            }

            point.expected_arrival = arrival;
        }

        Ok(true)
    }
}
