use std::sync::Arc;

use crate::cancel::Cancellation;
use crate::check::Checker;
use crate::error::Result;
use crate::model::{Offer, Request};

/// The offer must seat every rider of the request.
#[derive(Debug, Default, Clone, Copy)]
pub struct CapacityChecker;

impl Checker for CapacityChecker {
    fn name(&self) -> &'static str {
        "capacity"
    }

    fn check(&self, _ctx: &Cancellation, offer: &Offer, request: &Arc<Request>) -> Result<bool> {
        Ok(offer.capacity >= request.riders)
    }
}
