use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::geo::Coordinate;
use crate::model::{seconds, Request, RequestId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PointType {
    Pickup,
    Dropoff,
    /// The offer's own source or destination.
    Endpoint,
}

/// A stop along an offer's path.
///
/// Pickups and dropoffs refer back to the request they serve. The
/// reference does not own the request's lifecycle; it is the same
/// shared request the offer lists among its matched requests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathPoint {
    pub coordinate: Coordinate,
    pub point_type: PointType,
    pub expected_arrival: DateTime<Utc>,
    /// Walking time between the stop and the rider's true source or destination.
    #[serde(with = "seconds")]
    pub walking: TimeDelta,
    #[serde(serialize_with = "owner_id")]
    pub owner: Option<Arc<Request>>,
}

fn owner_id<S: Serializer>(owner: &Option<Arc<Request>>, ser: S) -> Result<S::Ok, S::Error> {
    match owner {
        Some(request) => ser.serialize_some(&request.id),
        None => ser.serialize_none(),
    }
}

/// A [`PathPoint`] as it is read from a snapshot, owner unresolved.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PathPointRecord {
    pub coordinate: Coordinate,
    pub point_type: PointType,
    pub expected_arrival: DateTime<Utc>,
    #[serde(with = "seconds", default)]
    pub walking: TimeDelta,
    #[serde(default)]
    pub owner: Option<RequestId>,
}

impl PathPoint {
    pub fn endpoint(coordinate: Coordinate, expected_arrival: DateTime<Utc>) -> Self {
        PathPoint {
            coordinate,
            point_type: PointType::Endpoint,
            expected_arrival,
            walking: TimeDelta::zero(),
            owner: None,
        }
    }

    pub fn pickup(coordinate: Coordinate, walking: TimeDelta, owner: Arc<Request>) -> Self {
        let expected_arrival = owner.earliest_departure;
        Self::stop(PointType::Pickup, coordinate, expected_arrival, walking, owner)
    }

    pub fn dropoff(coordinate: Coordinate, walking: TimeDelta, owner: Arc<Request>) -> Self {
        let expected_arrival = owner.latest_arrival;
        Self::stop(PointType::Dropoff, coordinate, expected_arrival, walking, owner)
    }

    /// `expected_arrival` is a placeholder bound from the rider's window,
    /// rewritten by the planner once the stop is placed.
    fn stop(
        point_type: PointType,
        coordinate: Coordinate,
        expected_arrival: DateTime<Utc>,
        walking: TimeDelta,
        owner: Arc<Request>,
    ) -> Self {
        PathPoint {
            coordinate,
            point_type,
            expected_arrival,
            walking,
            owner: Some(owner),
        }
    }

    pub fn owner_id(&self) -> Option<&RequestId> {
        self.owner.as_ref().map(|request| &request.id)
    }
}
