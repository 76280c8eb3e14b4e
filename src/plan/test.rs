use std::sync::Arc;

use chrono::TimeDelta;

use crate::cancel::Cancellation;
use crate::geo::Coordinate;
use crate::model::{Offer, PathPoint, PointType, Request};
use crate::oracle::testing::{count, CountingOracle, FixedPaceOracle};
use crate::oracle::RoutingOracle;
use crate::pickup::{PickupDropoffCache, PickupDropoffSelector};
use crate::plan::{PathInsertionPlanner, TimeMatrixCache};
use crate::util::fixture::*;

fn stack() -> (Arc<CountingOracle>, Arc<PickupDropoffSelector>, PathInsertionPlanner) {
    let oracle = Arc::new(CountingOracle::new(oracle()));
    let selector = Arc::new(
        PickupDropoffSelector::new(oracle.clone(), Arc::new(PickupDropoffCache::new()), &exact_config())
            .expect("selector"),
    );

    let planner = PathInsertionPlanner::new(
        oracle.clone(),
        selector.clone(),
        Arc::new(TimeMatrixCache::default()),
        TimeDelta::minutes(15),
    );
    (oracle, selector, planner)
}

fn planner() -> PathInsertionPlanner {
    stack().2
}

/// Plans `request` with its stops fixed, where legs take a minute per
/// 0.01 degrees travelled. The direct trip is ten minutes.
fn plan_at_fixed_pace(
    offer: &Offer,
    request: Request,
    pickup: (Coordinate, TimeDelta),
    dropoff: (Coordinate, TimeDelta),
) -> Option<Vec<PathPoint>> {
    let oracle: Arc<dyn RoutingOracle> = Arc::new(FixedPaceOracle::new(6_000.0));
    let request = shared(request);
    let selector = preselected(oracle.clone(), offer, &request, pickup, dropoff);

    PathInsertionPlanner::new(oracle, selector, Arc::new(TimeMatrixCache::default()), TimeDelta::minutes(15))
        .find_first_feasible_path(&Cancellation::new(), offer, &request)
        .expect("planning")
}

fn commit(offer: &Offer, request: &Arc<Request>, path: Vec<PathPoint>) -> Offer {
    let mut committed = offer.clone();
    committed.path = path;
    committed.current_number_of_requests += request.riders;
    committed.matched_requests.push(request.clone());
    committed
}

fn layout(path: &[PathPoint]) -> Vec<String> {
    path.iter()
        .map(|point| match point.owner_id() {
            Some(id) => format!("{}:{}", point.point_type, id),
            None => point.point_type.to_string(),
        })
        .collect()
}

#[test_log::test]
fn inserts_into_an_empty_path() {
    let offer = offer("o1", 2);
    let request = shared(request("r1", 13.42, 13.48, 1));

    let path = planner()
        .find_first_feasible_path(&Cancellation::new(), &offer, &request)
        .expect("planning")
        .expect("feasible");

    assert_eq!(layout(&path), vec!["endpoint", "pickup:r1", "dropoff:r1", "endpoint"]);
    assert_eq!(path[0].expected_arrival, offer.departure);
    assert!(path.windows(2).all(|pair| pair[0].expected_arrival <= pair[1].expected_arrival));
    assert!(path[2].expected_arrival <= request.latest_arrival - path[2].walking);
}

#[test]
fn never_modifies_the_offer() {
    let offer = offer("o1", 2);
    let before = offer.clone();

    planner()
        .find_first_feasible_path(&Cancellation::new(), &offer, &shared(request("r1", 13.42, 13.48, 1)))
        .expect("planning");

    assert_eq!(offer, before);
}

#[test]
fn driver_waits_for_a_late_rider() {
    let offer = offer("o1", 2);
    let request = shared(request_within("r1", 13.42, 13.48, 1, at(8, 10), at(9, 0)));

    let path = planner()
        .find_first_feasible_path(&Cancellation::new(), &offer, &request)
        .expect("planning")
        .expect("feasible");

    // The driver reaches the pickup around 08:02 and waits.
    assert_eq!(path[1].expected_arrival, at(8, 10) + path[1].walking);
    assert!(path[2].expected_arrival > path[1].expected_arrival);
}

#[test]
fn waiting_is_bounded_by_the_detour_budget() {
    let offer = offer("o1", 2);
    let request = shared(request_within("r1", 13.42, 13.48, 1, at(8, 30), at(9, 0)));

    let path = planner()
        .find_first_feasible_path(&Cancellation::new(), &offer, &request)
        .expect("planning");

    assert!(path.is_none());
}

#[test]
fn first_feasible_insertion_wins() {
    let planner = planner();
    let ctx = Cancellation::new();
    let offer = offer("o1", 2);

    let first = shared(request("r1", 13.42, 13.48, 1));
    let path = planner
        .find_first_feasible_path(&ctx, &offer, &first)
        .expect("planning")
        .expect("feasible");
    let offer = commit(&offer, &first, path);

    // Serving r2 entirely before r1 backtracks about 2km, within budget.
    let second = shared(request("r2", 13.41, 13.45, 1));
    let path = planner
        .find_first_feasible_path(&ctx, &offer, &second)
        .expect("planning")
        .expect("feasible");

    assert_eq!(
        layout(&path),
        vec!["endpoint", "pickup:r2", "dropoff:r2", "pickup:r1", "dropoff:r1", "endpoint"]
    );
}

#[test]
fn riders_aboard_keep_their_windows() {
    let planner = planner();
    let ctx = Cancellation::new();
    let offer = offer("o1", 2);

    // r1 has barely enough time for a direct ride to its dropoff.
    let first = shared(request_within("r1", 13.42, 13.48, 1, at(7, 55), at(8, 10)));
    let path = planner
        .find_first_feasible_path(&ctx, &offer, &first)
        .expect("planning")
        .expect("feasible");
    let offer = commit(&offer, &first, path);

    let second = shared(request("r2", 13.41, 13.45, 1));
    let path = planner
        .find_first_feasible_path(&ctx, &offer, &second)
        .expect("planning")
        .expect("feasible");

    assert_eq!(
        layout(&path),
        vec!["endpoint", "pickup:r2", "pickup:r1", "dropoff:r2", "dropoff:r1", "endpoint"]
    );
}

#[test]
fn occupancy_is_bounded_by_capacity() {
    let offer = offer("o1", 1);
    let group = shared(request("group", 13.42, 13.48, 2));

    let path = planner()
        .find_first_feasible_path(&Cancellation::new(), &offer, &group)
        .expect("planning");

    assert!(path.is_none());
}

#[test]
fn detours_beyond_budget_are_infeasible() {
    let offer = offer("o1", 2).with_detour_budget(TimeDelta::minutes(1));

    let mut far = request("far", 13.45, 13.48, 1);
    far.source = point(52.52, 13.45);

    let path = planner()
        .find_first_feasible_path(&Cancellation::new(), &offer, &shared(far))
        .expect("planning");

    assert!(path.is_none());
}

#[test]
fn stops_carry_their_point_types() {
    let offer = offer("o1", 2);
    let path = planner()
        .find_first_feasible_path(&Cancellation::new(), &offer, &shared(request("r1", 13.42, 13.48, 1)))
        .expect("planning")
        .expect("feasible");

    assert_eq!(path.first().map(|p| p.point_type), Some(PointType::Endpoint));
    assert_eq!(path.last().map(|p| p.point_type), Some(PointType::Endpoint));
}

#[test]
fn legs_come_from_one_matrix_per_offer() {
    let (oracle, selector, planner) = stack();
    let ctx = Cancellation::new();
    let offer = offer("o1", 2);

    let first = shared(request("r1", 13.42, 13.48, 1));
    let path = planner
        .find_first_feasible_path(&ctx, &offer, &first)
        .expect("planning")
        .expect("feasible");
    let offer = commit(&offer, &first, path);

    let second = shared(request("r2", 13.41, 13.45, 1));
    selector.select(&ctx, &offer, &second).expect("selection");
    let before = count(&oracle.matrix);

    // Up to six insertions into the four stop path share one query.
    planner
        .find_first_feasible_path(&ctx, &offer, &second)
        .expect("planning")
        .expect("feasible");
    assert_eq!(count(&oracle.matrix), before + 1);

    let calls = oracle.total();
    planner
        .find_first_feasible_path(&ctx, &offer, &second)
        .expect("planning")
        .expect("feasible");
    assert_eq!(oracle.total(), calls);
    assert_eq!(count(&oracle.driving), 0);
}

#[test]
fn oversized_matrices_are_not_kept() {
    let oracle = CountingOracle::new(oracle());
    let ctx = Cancellation::new();
    let offer = offer("o1", 2);
    let extra = [point(LAT, 13.42), point(LAT, 13.48)];

    let bounded = TimeMatrixCache::new(3);
    let matrix = bounded.matrix(&ctx, &oracle, &offer, &extra).expect("matrix");
    assert_eq!(matrix.stops().len(), 4);
    assert!(bounded.is_empty());

    let direct = oracle
        .compute_driving_time(&ctx, &[offer.source, offer.destination], offer.departure)
        .expect("driving");
    assert_eq!(matrix.time(&offer.source, &offer.destination), Some(direct[0]));

    let cache = TimeMatrixCache::default();
    cache.matrix(&ctx, &oracle, &offer, &extra).expect("matrix");
    let calls = count(&oracle.matrix);
    cache.matrix(&ctx, &oracle, &offer, &extra[..1]).expect("matrix");

    assert_eq!(cache.len(), 1);
    assert_eq!(count(&oracle.matrix), calls);
}

#[test]
fn detour_budget_is_inclusive() {
    // Boarding 0.01 degrees north of the route costs two extra minutes.
    let pickup = (point(LAT + 0.01, 13.42), TimeDelta::zero());
    let dropoff = (point(LAT, 13.48), TimeDelta::zero());

    let exact = offer("o1", 2).with_detour_budget(TimeDelta::minutes(2));
    let short = offer("o1", 2).with_detour_budget(TimeDelta::minutes(2) - TimeDelta::seconds(1));

    assert!(plan_at_fixed_pace(&exact, request("r1", 13.42, 13.48, 1), pickup, dropoff).is_some());
    assert!(plan_at_fixed_pace(&short, request("r1", 13.42, 13.48, 1), pickup, dropoff).is_none());
}

#[test]
fn waiting_allowance_is_inclusive() {
    let offer = offer("o1", 2).with_detour_budget(TimeDelta::minutes(5));
    let pickup = (point(LAT, 13.42), TimeDelta::zero());
    let dropoff = (point(LAT, 13.48), TimeDelta::zero());

    // The driver reaches the pickup at 08:02, without any detour.
    let exact = request_within("exact", 13.42, 13.48, 1, at(8, 7), at(9, 0));
    let late = request_within("late", 13.42, 13.48, 1, at(8, 7) + TimeDelta::seconds(1), at(9, 0));

    let path = plan_at_fixed_pace(&offer, exact, pickup, dropoff).expect("feasible");
    assert_eq!(path[1].expected_arrival, at(8, 7));
    assert!(plan_at_fixed_pace(&offer, late, pickup, dropoff).is_none());
}

#[test]
fn planned_dropoff_deadline_is_inclusive() {
    let offer = offer("o1", 2);
    let pickup = (point(LAT, 13.42), TimeDelta::zero());
    let dropoff = (point(LAT, 13.48), TimeDelta::minutes(2));

    // The dropoff is reached at 08:08, two minutes' walk from the destination.
    let exact = request_within("exact", 13.42, 13.48, 1, at(7, 55), at(8, 10));
    let short = request_within("short", 13.42, 13.48, 1, at(7, 55), at(8, 10) - TimeDelta::seconds(1));

    let path = plan_at_fixed_pace(&offer, exact, pickup, dropoff).expect("feasible");
    assert_eq!(path[2].expected_arrival, at(8, 8));
    assert!(plan_at_fixed_pace(&offer, short, pickup, dropoff).is_none());
}
