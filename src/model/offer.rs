use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;
use crate::model::path::PathPointRecord;
use crate::model::{seconds, ModelError, OfferId, PathPoint, PointType, Preference, Request, UserId};

/// A driver's ride, its spare seats, and the stops already planned along it.
///
/// The path always begins at `source` and ends at `destination`, with the
/// pickups and dropoffs of every matched request between them, in visiting
/// order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "OfferRecord")]
pub struct Offer {
    pub id: OfferId,
    pub user_id: UserId,
    pub source: Coordinate,
    pub destination: Coordinate,
    pub departure: DateTime<Utc>,
    pub max_estimated_arrival: DateTime<Utc>,
    pub capacity: u32,
    pub current_number_of_requests: u32,
    /// Extra driving time tolerated beyond the direct route. When absent
    /// the matcher's configured default applies.
    #[serde(with = "seconds::option")]
    pub detour_budget: Option<TimeDelta>,
    pub preference: Preference,
    pub path: Vec<PathPoint>,
    pub matched_requests: Vec<Arc<Request>>,
}

#[derive(Deserialize)]
struct OfferRecord {
    id: OfferId,
    user_id: UserId,
    source: Coordinate,
    destination: Coordinate,
    departure: DateTime<Utc>,
    max_estimated_arrival: DateTime<Utc>,
    capacity: u32,
    #[serde(default)]
    current_number_of_requests: u32,
    #[serde(with = "seconds::option", default)]
    detour_budget: Option<TimeDelta>,
    preference: Preference,
    #[serde(default)]
    path: Vec<PathPointRecord>,
    #[serde(default)]
    matched_requests: Vec<Request>,
}

impl TryFrom<OfferRecord> for Offer {
    type Error = ModelError;

    fn try_from(record: OfferRecord) -> Result<Self, Self::Error> {
        let matched_requests = record.matched_requests.into_iter().map(Arc::new).collect::<Vec<_>>();

        let path = record
            .path
            .into_iter()
            .map(|point| {
                let owner = point
                    .owner
                    .map(|id| {
                        matched_requests
                            .iter()
                            .find(|request| request.id == id)
                            .cloned()
                            .ok_or_else(|| ModelError::UnknownOwner {
                                offer: record.id.clone(),
                                request: id,
                            })
                    })
                    .transpose()?;

                Ok(PathPoint {
                    coordinate: point.coordinate,
                    point_type: point.point_type,
                    expected_arrival: point.expected_arrival,
                    walking: point.walking,
                    owner,
                })
            })
            .collect::<Result<Vec<_>, ModelError>>()?;

        let mut offer = Offer {
            id: record.id,
            user_id: record.user_id,
            source: record.source,
            destination: record.destination,
            departure: record.departure,
            max_estimated_arrival: record.max_estimated_arrival,
            capacity: record.capacity,
            current_number_of_requests: record.current_number_of_requests,
            detour_budget: record.detour_budget,
            preference: record.preference,
            path,
            matched_requests,
        };

        offer.validate()?;
        Ok(offer)
    }
}

impl Offer {
    /// An offer with no matched requests, whose path is its two endpoints.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<OfferId>,
        user_id: impl Into<UserId>,
        source: Coordinate,
        destination: Coordinate,
        departure: DateTime<Utc>,
        max_estimated_arrival: DateTime<Utc>,
        capacity: u32,
        preference: Preference,
    ) -> Result<Self, ModelError> {
        let mut offer = Offer {
            id: id.into(),
            user_id: user_id.into(),
            source,
            destination,
            departure,
            max_estimated_arrival,
            capacity,
            current_number_of_requests: 0,
            detour_budget: None,
            preference,
            path: vec![],
            matched_requests: vec![],
        };

        offer.validate()?;
        Ok(offer)
    }

    pub fn with_detour_budget(mut self, budget: TimeDelta) -> Self {
        self.detour_budget = Some(budget);
        self
    }

    /// Checks the offer's invariants, filling in the endpoint-only
    /// path if none was given.
    pub fn validate(&mut self) -> Result<(), ModelError> {
        if self.departure >= self.max_estimated_arrival {
            return Err(ModelError::InvertedOfferWindow(self.id.clone()));
        }

        if self.current_number_of_requests > self.capacity {
            return Err(ModelError::OverCapacity {
                id: self.id.clone(),
                current: self.current_number_of_requests,
                capacity: self.capacity,
            });
        }

        if self.detour_budget.is_some_and(|budget| budget < TimeDelta::zero()) {
            return Err(ModelError::NegativeDuration { field: "detour_budget" });
        }

        if self.path.is_empty() {
            self.path = vec![
                PathPoint::endpoint(self.source, self.departure),
                PathPoint::endpoint(self.destination, self.max_estimated_arrival),
            ];
        }

        let bounded = |point: Option<&PathPoint>| point.is_some_and(|p| p.point_type == PointType::Endpoint);
        if self.path.len() < 2 || !bounded(self.path.first()) || !bounded(self.path.last()) {
            return Err(ModelError::MalformedPath(self.id.clone()));
        }

        Ok(())
    }

    /// Seats still available to new riders.
    pub fn residual(&self) -> u32 {
        self.capacity.saturating_sub(self.current_number_of_requests)
    }

    /// The trip window the driver committed to.
    pub fn trip_budget(&self) -> TimeDelta {
        self.max_estimated_arrival - self.departure
    }

    pub fn detour_budget_or(&self, default: TimeDelta) -> TimeDelta {
        self.detour_budget.unwrap_or(default)
    }

    /// Coordinates of every stop, in visiting order.
    pub fn stops(&self) -> Vec<Coordinate> {
        self.path.iter().map(|point| point.coordinate).collect()
    }
}
