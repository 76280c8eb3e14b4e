use std::sync::Arc;

use chrono::TimeDelta;
use geo::{Distance, Haversine};
use log::trace;

use crate::cancel::Cancellation;
use crate::check::Checker;
use crate::error::Result;
use crate::geo::{seconds, try_from_seconds, Coordinate, GeoError};
use crate::model::{Offer, Request};

pub const DEFAULT_FIXED_SPEED_KMH: f64 = 27.0;

/// A network-free estimate of the detour check.
///
/// Distances are great-circle, travelled at a fixed speed. The driver
/// heads straight for the rider's source and on to their destination,
/// which must be reached by the rider's latest arrival. The detour is the
/// distance of `source -> rider source -> rider destination -> destination`
/// beyond the direct trip, bounded by what the offer's detour budget covers
/// at the fixed speed. Walking is not accounted for.
pub struct HaversineDistanceChecker {
    /// Meters per second.
    speed: f64,
    default_detour: TimeDelta,
}

impl HaversineDistanceChecker {
    pub fn new(speed_kmh: f64, default_detour: TimeDelta) -> std::result::Result<Self, GeoError> {
        if !speed_kmh.is_finite() || speed_kmh <= 0.0 {
            return Err(GeoError::InvalidParameter {
                name: "fixed_speed_kmh",
                value: speed_kmh,
            });
        }

        Ok(HaversineDistanceChecker {
            speed: speed_kmh / 3.6,
            default_detour,
        })
    }

    fn distance(from: &Coordinate, to: &Coordinate) -> f64 {
        Haversine.distance(from.point(), to.point())
    }
}

impl Checker for HaversineDistanceChecker {
    fn name(&self) -> &'static str {
        "haversine"
    }

    fn check(&self, _ctx: &Cancellation, offer: &Offer, request: &Arc<Request>) -> Result<bool> {
        let to_pickup = Self::distance(&offer.source, &request.source);
        let riding = Self::distance(&request.source, &request.destination);

        let arrival = offer.departure + try_from_seconds((to_pickup + riding) / self.speed)?;
        if arrival > request.latest_arrival {
            trace!("{} would arrive at {} at the earliest", request.id, arrival);
            return Ok(false);
        }

        let budget = seconds(offer.detour_budget_or(self.default_detour)) * self.speed;
        let direct = Self::distance(&offer.source, &offer.destination);
        let total = to_pickup + riding + Self::distance(&request.destination, &offer.destination);

        Ok(total <= direct + budget)
    }
}
