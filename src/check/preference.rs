use std::sync::Arc;

use crate::cancel::Cancellation;
use crate::check::Checker;
use crate::error::Result;
use crate::model::{Offer, Request};

/// The request must be compatible with the driver and with every rider
/// already aboard.
#[derive(Debug, Default, Clone, Copy)]
pub struct PreferenceChecker;

impl PreferenceChecker {
    pub fn compatible(offer: &Offer, request: &Request) -> bool {
        offer.preference.compatible(&request.preference)
            && offer
                .matched_requests
                .iter()
                .all(|rider| rider.preference.compatible(&request.preference))
    }
}

impl Checker for PreferenceChecker {
    fn name(&self) -> &'static str {
        "preference"
    }

    fn check(&self, _ctx: &Cancellation, offer: &Offer, request: &Arc<Request>) -> Result<bool> {
        Ok(Self::compatible(offer, request))
    }
}
