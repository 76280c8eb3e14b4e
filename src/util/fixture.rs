//! Shared scenario builders for tests.
//!
//! Offers drive due east along latitude 52.5 from 13.40 to 13.50, about
//! 6.8km. Through a [`StraightLineOracle`] at 10m/s that is roughly eleven
//! minutes of driving.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use crate::config::MatcherConfig;
use crate::geo::Coordinate;
use crate::model::{Gender, Offer, PathPoint, PickupDropoffResult, Preference, Request};
use crate::oracle::{RoutingOracle, StraightLineOracle};
use crate::pickup::{PickupDropoffCache, PickupDropoffSelector};

pub const LAT: f64 = 52.5;
pub const SOURCE_LNG: f64 = 13.40;
pub const DESTINATION_LNG: f64 = 13.50;

pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, hour, minute, 0).unwrap()
}

pub fn point(lat: f64, lng: f64) -> Coordinate {
    Coordinate::new(lat, lng).unwrap()
}

pub fn oracle() -> StraightLineOracle {
    StraightLineOracle::new(10.0, 1.4, 25.0)
}

/// Exact closest-point resolution, without pruning or downsampling.
pub fn exact_config() -> MatcherConfig {
    MatcherConfig {
        enable_pruning: false,
        enable_downsampling: false,
        ..MatcherConfig::default()
    }
}

/// An offer leaving at 08:00, due by 09:00, with a 20 minute detour budget.
pub fn offer(id: &str, capacity: u32) -> Offer {
    Offer::new(
        id,
        format!("driver-{id}").as_str(),
        point(LAT, SOURCE_LNG),
        point(LAT, DESTINATION_LNG),
        at(8, 0),
        at(9, 0),
        capacity,
        Preference::new(Gender::Male, false),
    )
    .unwrap()
    .with_detour_budget(TimeDelta::minutes(20))
}

/// A request starting and ending about 55m north of the offer's route.
pub fn request(id: &str, from_lng: f64, to_lng: f64, riders: u32) -> Request {
    request_within(id, from_lng, to_lng, riders, at(7, 55), at(9, 0))
}

pub fn request_within(
    id: &str,
    from_lng: f64,
    to_lng: f64,
    riders: u32,
    earliest: DateTime<Utc>,
    latest: DateTime<Utc>,
) -> Request {
    Request::new(
        id,
        format!("rider-{id}").as_str(),
        point(LAT + 0.0005, from_lng),
        point(LAT + 0.0005, to_lng),
        earliest,
        latest,
        TimeDelta::minutes(5),
        riders,
        Preference::new(Gender::Female, false),
    )
    .unwrap()
}

pub fn shared(request: Request) -> Arc<Request> {
    Arc::new(request)
}

/// A selector already holding `request`'s stops along `offer`, each given
/// as a coordinate and the walk between it and the rider.
pub fn preselected(
    oracle: Arc<dyn RoutingOracle>,
    offer: &Offer,
    request: &Arc<Request>,
    pickup: (Coordinate, TimeDelta),
    dropoff: (Coordinate, TimeDelta),
) -> Arc<PickupDropoffSelector> {
    let cache = Arc::new(PickupDropoffCache::new());
    cache.put(
        offer,
        request,
        PickupDropoffResult {
            pickup: PathPoint::pickup(pickup.0, pickup.1, request.clone()),
            dropoff: PathPoint::dropoff(dropoff.0, dropoff.1, request.clone()),
        },
    );

    Arc::new(PickupDropoffSelector::new(oracle, cache, &exact_config()).unwrap())
}
