use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;
use crate::model::{seconds, ModelError, Preference, RequestId, UserId};

/// A rider's trip, and the window within which it must happen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RequestRecord")]
pub struct Request {
    pub id: RequestId,
    pub user_id: UserId,
    pub source: Coordinate,
    pub destination: Coordinate,
    pub earliest_departure: DateTime<Utc>,
    pub latest_arrival: DateTime<Utc>,
    #[serde(with = "seconds")]
    pub max_walking: TimeDelta,
    pub riders: u32,
    pub preference: Preference,
}

#[derive(Deserialize)]
struct RequestRecord {
    id: RequestId,
    user_id: UserId,
    source: Coordinate,
    destination: Coordinate,
    earliest_departure: DateTime<Utc>,
    latest_arrival: DateTime<Utc>,
    #[serde(with = "seconds")]
    max_walking: TimeDelta,
    riders: u32,
    preference: Preference,
}

impl TryFrom<RequestRecord> for Request {
    type Error = ModelError;

    fn try_from(record: RequestRecord) -> Result<Self, Self::Error> {
        let request = Request {
            id: record.id,
            user_id: record.user_id,
            source: record.source,
            destination: record.destination,
            earliest_departure: record.earliest_departure,
            latest_arrival: record.latest_arrival,
            max_walking: record.max_walking,
            riders: record.riders,
            preference: record.preference,
        };

        request.validate()?;
        Ok(request)
    }
}

impl Request {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<RequestId>,
        user_id: impl Into<UserId>,
        source: Coordinate,
        destination: Coordinate,
        earliest_departure: DateTime<Utc>,
        latest_arrival: DateTime<Utc>,
        max_walking: TimeDelta,
        riders: u32,
        preference: Preference,
    ) -> Result<Self, ModelError> {
        let request = Request {
            id: id.into(),
            user_id: user_id.into(),
            source,
            destination,
            earliest_departure,
            latest_arrival,
            max_walking,
            riders,
            preference,
        };

        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.earliest_departure >= self.latest_arrival {
            return Err(ModelError::InvertedRequestWindow(self.id.clone()));
        }

        if self.riders == 0 {
            return Err(ModelError::NoRiders(self.id.clone()));
        }

        if self.max_walking < TimeDelta::zero() {
            return Err(ModelError::NegativeDuration { field: "max_walking" });
        }

        Ok(())
    }
}
