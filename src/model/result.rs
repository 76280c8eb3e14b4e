use std::sync::Arc;

use chrono::TimeDelta;
use serde::Serialize;

use crate::model::{Offer, PathPoint, Request};

/// An offer and request which passed every feasibility check.
#[derive(Debug, Clone)]
pub struct MatchCandidate {
    pub offer: Arc<Offer>,
    pub request: Arc<Request>,
}

impl MatchCandidate {
    pub fn new(offer: Arc<Offer>, request: Arc<Request>) -> Self {
        MatchCandidate { offer, request }
    }
}

/// Where the rider of a request would board and leave a given offer.
#[derive(Debug, Clone, PartialEq)]
pub struct PickupDropoffResult {
    pub pickup: PathPoint,
    pub dropoff: PathPoint,
}

impl PickupDropoffResult {
    pub fn pickup_walking(&self) -> TimeDelta {
        self.pickup.walking
    }

    pub fn dropoff_walking(&self) -> TimeDelta {
        self.dropoff.walking
    }
}

/// An offer after a run, carrying the requests newly assigned to it.
///
/// `offer` reflects the committed state: its path includes the new stops,
/// and its rider count and matched requests include the new riders.
#[derive(Debug, Clone, Serialize)]
pub struct MatchingResult {
    pub offer: Offer,
    pub assigned: Vec<Arc<Request>>,
}

impl MatchingResult {
    pub fn riders(&self) -> u32 {
        self.assigned.iter().map(|request| request.riders).sum()
    }
}
