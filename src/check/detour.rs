use std::sync::Arc;

use log::trace;

use crate::cancel::Cancellation;
use crate::check::Checker;
use crate::error::{Context, Result};
use crate::model::{Offer, Request};
use crate::oracle::{OracleError, RoutingOracle};
use crate::pickup::PickupDropoffSelector;

/// Whether the driver can fit the rider into an otherwise direct trip.
///
/// Routes `source -> pickup -> dropoff -> destination` and rejects the pair
/// if the rider would reach their destination late, counting the walk
/// from the dropoff, or if the whole trip overruns the offer's window.
/// Other riders already aboard are not considered; the path planner
/// settles that before a match is committed.
pub struct DetourChecker {
    selector: Arc<PickupDropoffSelector>,
    oracle: Arc<dyn RoutingOracle>,
}

impl DetourChecker {
    pub fn new(selector: Arc<PickupDropoffSelector>, oracle: Arc<dyn RoutingOracle>) -> Self {
        DetourChecker { selector, oracle }
    }
}

impl Checker for DetourChecker {
    fn name(&self) -> &'static str {
        "detour"
    }

    fn check(&self, ctx: &Cancellation, offer: &Offer, request: &Arc<Request>) -> Result<bool> {
        let selection = self.selector.select(ctx, offer, request)?;

        let waypoints = [
            offer.source,
            selection.pickup.coordinate,
            selection.dropoff.coordinate,
            offer.destination,
        ];

        let legs = self
            .oracle
            .compute_driving_time(ctx, &waypoints, offer.departure)
            .context("computing detour legs")?;

        let [to_pickup, to_dropoff, to_destination] = legs[..] else {
            return Err(OracleError::Malformed(format!("expected 3 legs, received {}", legs.len())))
                .context("computing detour legs");
        };

        let dropoff_arrival = offer.departure + to_pickup + to_dropoff;
        if dropoff_arrival > request.latest_arrival - selection.dropoff_walking() {
            trace!("{} would reach the dropoff at {}, too late", request.id, dropoff_arrival);
            return Ok(false);
        }

        let trip = to_pickup + to_dropoff + to_destination;
        Ok(trip <= offer.trip_budget())
    }
}
