//! The feasibility checks an `(offer, request)` pair must pass to become a
//! match candidate.
//!
//! A check answers `Ok(false)` for a pair which cannot be matched and
//! `Err(_)` only when it could not reach an answer. The two are never
//! conflated: a routing failure is reported, not treated as a rejection.

use std::sync::Arc;

use log::trace;
#[cfg(feature = "tracing")]
use tracing::Level;

use crate::cancel::Cancellation;
use crate::config::MatcherConfig;
use crate::error::{Context, Result};
use crate::model::{Offer, Request};
use crate::oracle::RoutingOracle;
use crate::pickup::PickupDropoffSelector;

#[doc(hidden)]
pub mod capacity;
#[doc(hidden)]
pub mod detour;
#[doc(hidden)]
pub mod haversine;
#[doc(hidden)]
pub mod overlap;
#[doc(hidden)]
pub mod preference;


#[doc(inline)]
pub use capacity::CapacityChecker;
#[doc(inline)]
pub use detour::DetourChecker;
#[doc(inline)]
pub use haversine::HaversineDistanceChecker;
#[doc(inline)]
pub use overlap::OverlapChecker;
#[doc(inline)]
pub use preference::PreferenceChecker;

/// A single feasibility check.
pub trait Checker: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, ctx: &Cancellation, offer: &Offer, request: &Arc<Request>) -> Result<bool>;
}

/// Runs checks in a fixed order, stopping at the first that rejects
/// the pair or fails.
pub struct ConstraintPipeline {
    checkers: Vec<Box<dyn Checker>>,
}

impl ConstraintPipeline {
    /// The standard chain: capacity, overlap, preference, then detour,
    /// cheapest first. The haversine estimate runs just before the detour
    /// check when enabled.
    pub fn new(
        selector: Arc<PickupDropoffSelector>,
        oracle: Arc<dyn RoutingOracle>,
        config: &MatcherConfig,
    ) -> Result<Self> {
        let mut checkers: Vec<Box<dyn Checker>> =
            vec![Box::new(CapacityChecker), Box::new(OverlapChecker), Box::new(PreferenceChecker)];

        if config.enable_haversine_checker {
            let haversine = HaversineDistanceChecker::new(config.fixed_speed_kmh, config.default_detour_budget)
                .context("configuring haversine checker")?;
            checkers.push(Box::new(haversine));
        }

        checkers.push(Box::new(DetourChecker::new(selector, oracle)));
        Ok(Self::from_checkers(checkers))
    }

    pub fn from_checkers(checkers: Vec<Box<dyn Checker>>) -> Self {
        ConstraintPipeline { checkers }
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(level = Level::DEBUG, skip_all, fields(offer = %offer.id, request = %request.id)))]
    pub fn check(&self, ctx: &Cancellation, offer: &Offer, request: &Arc<Request>) -> Result<bool> {
        for checker in &self.checkers {
            let passed = checker
                .check(ctx, offer, request)
                .map_err(|err| err.for_pair(&offer.id, &request.id))?;

            if !passed {
                trace!("{} rejected by {} check for {}", request.id, checker.name(), offer.id);
                return Ok(false);
            }
        }

        Ok(true)
    }
}
