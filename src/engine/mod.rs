//! Composition of a single matching run.
//!
//! Every piece of per-run state (the pickup/dropoff cache, the resolvers
//! behind it, the matching graph) is created by [`MatchingEngine::run`] and
//! dropped when it returns. Only the configuration and the routing oracle
//! outlive a run.

use std::sync::Arc;

use log::{info, warn};
use measure_time::info_time;
use rayon::ThreadPoolBuilder;
use rustc_hash::FxHashSet;
#[cfg(feature = "tracing")]
use tracing::Level;

use crate::cancel::Cancellation;
use crate::candidate::evaluate;
use crate::check::ConstraintPipeline;
use crate::config::MatcherConfig;
use crate::error::{Context, Error, Result};
use crate::matching::CapacitatedMatcher;
use crate::model::{MatchingResult, Offer, Request};
use crate::oracle::RoutingOracle;
use crate::pickup::{PickupDropoffCache, PickupDropoffSelector};
use crate::plan::{PathInsertionPlanner, TimeMatrixCache};

#[doc(hidden)]
pub mod boundary;


#[doc(inline)]
pub use boundary::{JsonFileReader, LogPublisher, MemoryReader, Publisher, Reader, Snapshot};

/// What a run produced, and what went wrong along the way without
/// stopping it.
#[derive(Debug, Default)]
pub struct RunReport {
    /// One result per offer which received requests, in offer order.
    pub results: Vec<MatchingResult>,
    /// Per-pair failures, from candidate evaluation and then from matching.
    pub failures: Vec<Error>,
    pub pairs: usize,
    pub candidates: usize,
    pub rounds: usize,
    /// Set if the results were matched but could not be published.
    pub publish_failure: Option<Error>,
}

impl RunReport {
    pub fn assigned(&self) -> usize {
        self.results.iter().map(|result| result.assigned.len()).sum()
    }
}

pub struct MatchingEngine {
    config: MatcherConfig,
    oracle: Arc<dyn RoutingOracle>,
}

impl MatchingEngine {
    pub fn new(config: MatcherConfig, oracle: Arc<dyn RoutingOracle>) -> Self {
        MatchingEngine { config, oracle }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Matches `requests` onto `offers`.
    ///
    /// Fails if any input is invalid, or if a systemic failure (such as
    /// cancellation) stops the run. A run which fails commits nothing.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = Level::INFO, skip_all, fields(offers = offers.len(), requests = requests.len())))]
    pub fn run(&self, ctx: &Cancellation, offers: Vec<Offer>, requests: Vec<Request>) -> Result<RunReport> {
        info_time!("Matching run over {} offers and {} requests", offers.len(), requests.len());

        let (offers, requests) = Self::admit(offers, requests)?;
        if offers.is_empty() || requests.is_empty() {
            info!("Nothing to match");
            return Ok(RunReport::default());
        }

        let cache = Arc::new(PickupDropoffCache::new());
        let selector = Arc::new(PickupDropoffSelector::new(self.oracle.clone(), cache, &self.config)?);
        let pipeline = ConstraintPipeline::new(selector.clone(), self.oracle.clone(), &self.config)?;
        let matrices = Arc::new(TimeMatrixCache::new(self.config.matrix_caching_bound));
        let planner = PathInsertionPlanner::new(
            self.oracle.clone(),
            selector,
            matrices,
            self.config.default_detour_budget,
        );
        let matcher = CapacitatedMatcher::new(Arc::new(planner));

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.config.worker_threads)
            .thread_name(|index| format!("ridematch-eval-{index}"))
            .build()
            .map_err(|err| Error::InvalidInput(format!("cannot build evaluation pool: {err}")))?;

        let evaluation = pool.install(|| evaluate(ctx, &pipeline, &offers, &requests))?;
        let candidates = evaluation.candidates.len();
        let assignment = matcher.assign(ctx, &offers, &evaluation.candidates)?;

        let mut failures = evaluation.failures;
        failures.extend(assignment.failures);

        let report = RunReport {
            results: assignment.results,
            failures,
            pairs: offers.len() * requests.len(),
            candidates,
            rounds: assignment.rounds,
            publish_failure: None,
        };

        info!(
            "Assigned {} of {} requests from {} candidates ({} failures)",
            report.assigned(),
            requests.len(),
            report.candidates,
            report.failures.len()
        );

        Ok(report)
    }

    /// Reads a snapshot, matches it and publishes the results.
    ///
    /// An absent snapshot yields an empty report. A publishing failure is
    /// recorded on the report rather than returned, as the match itself
    /// stands.
    pub fn execute(&self, ctx: &Cancellation, reader: &dyn Reader, publisher: &dyn Publisher) -> Result<RunReport> {
        let Some(snapshot) = reader.read()? else {
            info!("No snapshot to match");
            return Ok(RunReport::default());
        };

        let mut report = self.run(ctx, snapshot.offers, snapshot.requests)?;
        if let Err(err) = publisher.publish(&report.results) {
            warn!("Matched {} offers but failed to publish: {}", report.results.len(), err);
            report.publish_failure = Some(err);
        }

        Ok(report)
    }

    /// Validates the inputs and freezes them for sharing across workers.
    fn admit(offers: Vec<Offer>, requests: Vec<Request>) -> Result<(Vec<Arc<Offer>>, Vec<Arc<Request>>)> {
        let mut seen = FxHashSet::default();
        let offers = offers
            .into_iter()
            .map(|mut offer| {
                offer.validate()?;
                if !seen.insert(offer.id.to_string()) {
                    return Err(Error::InvalidInput(format!("duplicate offer {}", offer.id)));
                }
                Ok(Arc::new(offer))
            })
            .collect::<Result<Vec<_>>>()
            .context("validating offers")?;

        seen.clear();
        let requests = requests
            .into_iter()
            .map(|request| {
                request.validate()?;
                if !seen.insert(request.id.to_string()) {
                    return Err(Error::InvalidInput(format!("duplicate request {}", request.id)));
                }
                Ok(Arc::new(request))
            })
            .collect::<Result<Vec<_>>>()
            .context("validating requests")?;

        Ok((offers, requests))
    }
}
