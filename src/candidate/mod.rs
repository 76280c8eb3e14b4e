//! Enumeration of match candidates over the offer x request cross product.
//!
//! Offers form the outer loop and requests the inner one. The order is
//! part of the contract: it decides which candidates the matcher sees
//! first, so it is kept by both the lazy and the parallel evaluation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, warn};
use measure_time::debug_time;
use rayon::prelude::*;

use crate::cancel::Cancellation;
use crate::check::ConstraintPipeline;
use crate::error::{Error, Result};
use crate::model::{MatchCandidate, Offer, Request};


/// Lazily checks each pair, yielding those which pass and, inline, the
/// failures of those which could not be checked.
///
/// Nothing is buffered: each call to `next` evaluates pairs until one
/// yields an item. A consumer stops early by dropping the iterator.
pub struct CandidateIterator<'a> {
    ctx: &'a Cancellation,
    pipeline: &'a ConstraintPipeline,
    offers: &'a [Arc<Offer>],
    requests: &'a [Arc<Request>],
    cursor: usize,
}

impl<'a> CandidateIterator<'a> {
    pub fn new(
        ctx: &'a Cancellation,
        pipeline: &'a ConstraintPipeline,
        offers: &'a [Arc<Offer>],
        requests: &'a [Arc<Request>],
    ) -> Self {
        CandidateIterator {
            ctx,
            pipeline,
            offers,
            requests,
            cursor: 0,
        }
    }

    fn pairs(&self) -> usize {
        self.offers.len() * self.requests.len()
    }
}

impl Iterator for CandidateIterator<'_> {
    type Item = Result<MatchCandidate>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.cursor < self.pairs() {
            let (offer, request) = pair_at(self.offers, self.requests, self.cursor);
            self.cursor += 1;

            match self.pipeline.check(self.ctx, offer, request) {
                Ok(true) => return Some(Ok(MatchCandidate::new(offer.clone(), request.clone()))),
                Ok(false) => continue,
                Err(err) => return Some(Err(err)),
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.pairs() - self.cursor))
    }
}

#[inline]
fn pair_at<'a>(offers: &'a [Arc<Offer>], requests: &'a [Arc<Request>], index: usize) -> (&'a Arc<Offer>, &'a Arc<Request>) {
    (&offers[index / requests.len()], &requests[index % requests.len()])
}

/// The outcome of checking every pair.
#[derive(Debug, Default)]
pub struct Evaluation {
    /// Passing pairs, in enumeration order.
    pub candidates: Vec<MatchCandidate>,
    /// One error per pair that could not be checked.
    pub failures: Vec<Error>,
}

/// Checks every pair on the current rayon pool.
///
/// Pair failures are collected and the rest of the pairs still checked,
/// unless a failure is systemic: then the pairs not yet started are
/// skipped and the failure is returned.
pub fn evaluate(
    ctx: &Cancellation,
    pipeline: &ConstraintPipeline,
    offers: &[Arc<Offer>],
    requests: &[Arc<Request>],
) -> Result<Evaluation> {
    let total = offers.len() * requests.len();
    debug_time!("Evaluated {} pairs", total);

    let aborted = AtomicBool::new(false);
    let outcomes = (0..total)
        .into_par_iter()
        .map(|index| {
            if aborted.load(Ordering::Relaxed) {
                return None;
            }

            let (offer, request) = pair_at(offers, requests, index);
            match pipeline.check(ctx, offer, request) {
                Ok(true) => Some(Ok(MatchCandidate::new(offer.clone(), request.clone()))),
                Ok(false) => None,
                Err(err) => {
                    if err.is_systemic() {
                        aborted.store(true, Ordering::Relaxed);
                    }
                    Some(Err(err))
                }
            }
        })
        .collect::<Vec<_>>();

    let mut evaluation = Evaluation::default();
    for outcome in outcomes.into_iter().flatten() {
        match outcome {
            Ok(candidate) => evaluation.candidates.push(candidate),
            Err(err) if err.is_systemic() => return Err(err),
            Err(err) => {
                warn!("Skipping pair: {}", err);
                evaluation.failures.push(err);
            }
        }
    }

    debug!(
        "{} candidates and {} failures among {} pairs",
        evaluation.candidates.len(),
        evaluation.failures.len(),
        total
    );

    Ok(evaluation)
}
