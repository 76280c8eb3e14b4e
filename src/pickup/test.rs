use std::sync::Arc;

use chrono::TimeDelta;

use crate::cancel::Cancellation;
use crate::config::MatcherConfig;
use crate::model::PointType;
use crate::oracle::testing::{count, CountingOracle};
use crate::pickup::{PickupDropoffCache, PickupDropoffSelector};
use crate::util::fixture::*;

fn selector(oracle: Arc<CountingOracle>, config: &MatcherConfig) -> PickupDropoffSelector {
    PickupDropoffSelector::new(oracle, Arc::new(PickupDropoffCache::new()), config).expect("selector")
}

#[test_log::test]
fn selects_nearby_route_points() {
    let oracle = Arc::new(CountingOracle::new(oracle()));
    let selector = selector(oracle.clone(), &exact_config());

    let offer = offer("o1", 2);
    let request = shared(request("r1", 13.42, 13.48, 1));

    let result = selector
        .select(&Cancellation::new(), &offer, &request)
        .expect("selection");

    assert_eq!(result.pickup.point_type, PointType::Pickup);
    assert_eq!(result.dropoff.point_type, PointType::Dropoff);
    assert_eq!(result.pickup.owner_id(), Some(&request.id));

    // The route runs 55m south of the rider, densified every 25m.
    assert!((result.pickup.coordinate.lng() - 13.42).abs() < 0.0003);
    assert!((result.dropoff.coordinate.lng() - 13.48).abs() < 0.0003);
    assert!(result.pickup_walking() > TimeDelta::seconds(35));
    assert!(result.pickup_walking() < TimeDelta::seconds(45));
    assert!(result.dropoff_walking() < TimeDelta::seconds(45));
}

#[test]
fn selections_are_cached() {
    let oracle = Arc::new(CountingOracle::new(oracle()));
    let selector = selector(oracle.clone(), &MatcherConfig::default());
    let ctx = Cancellation::new();

    let offer = offer("o1", 2);
    let request = shared(request("r1", 13.42, 13.48, 1));

    let first = selector.select(&ctx, &offer, &request).expect("selection");
    let calls = oracle.total();
    let second = selector.select(&ctx, &offer, &request).expect("selection");

    assert_eq!(first, second);
    assert_eq!(oracle.total(), calls);
    assert_eq!(selector.cache().len(), 1);
}

#[test]
fn route_is_planned_once_per_offer() {
    let oracle = Arc::new(CountingOracle::new(oracle()));
    let selector = selector(oracle.clone(), &MatcherConfig::default());
    let ctx = Cancellation::new();
    let offer = offer("o1", 2);

    for (id, from, to) in [("r1", 13.42, 13.48), ("r2", 13.41, 13.45), ("r3", 13.43, 13.46)] {
        selector
            .select(&ctx, &offer, &shared(request(id, from, to, 1)))
            .expect("selection");
    }

    assert_eq!(count(&oracle.plan), 1);
    assert_eq!(count(&oracle.matrix), 6);
}

#[test]
fn distant_riders_are_snapped() {
    let oracle = Arc::new(CountingOracle::new(oracle()));
    let selector = selector(oracle.clone(), &MatcherConfig::default());

    let offer = offer("o1", 2);
    let mut far = request("far", 13.42, 13.48, 1);
    far.source = point(52.52, 13.42);
    let far = shared(far);

    let result = selector
        .select(&Cancellation::new(), &offer, &far)
        .expect("selection");

    assert_eq!(result.pickup.coordinate, far.source);
    assert_eq!(result.pickup_walking(), TimeDelta::zero());
    assert_eq!(count(&oracle.snap), 1);
}

#[test]
fn cache_is_last_write_wins() {
    let cache = PickupDropoffCache::new();
    let offer = offer("o1", 2);
    let request = shared(request("r1", 13.42, 13.48, 1));

    let selection = |lng: f64| crate::model::PickupDropoffResult {
        pickup: crate::model::PathPoint::pickup(point(LAT, lng), TimeDelta::zero(), request.clone()),
        dropoff: crate::model::PathPoint::dropoff(point(LAT, 13.48), TimeDelta::zero(), request.clone()),
    };

    assert!(cache.get(&offer, &request).is_none());
    cache.put(&offer, &request, selection(13.41));
    cache.put(&offer, &request, selection(13.42));

    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get(&offer, &request), Some(selection(13.42)));
}
