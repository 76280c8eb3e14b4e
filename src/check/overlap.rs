use std::sync::Arc;

use crate::cancel::Cancellation;
use crate::check::Checker;
use crate::error::Result;
use crate::model::{Offer, Request};

/// The request's window must intersect the offer's trip window.
/// Windows touching at a single instant intersect.
#[derive(Debug, Default, Clone, Copy)]
pub struct OverlapChecker;

impl Checker for OverlapChecker {
    fn name(&self) -> &'static str {
        "overlap"
    }

    fn check(&self, _ctx: &Cancellation, offer: &Offer, request: &Arc<Request>) -> Result<bool> {
        let disjoint = request.earliest_departure > offer.max_estimated_arrival
            || request.latest_arrival < offer.departure;

        Ok(!disjoint)
    }
}
