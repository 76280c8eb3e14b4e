//! Driving time matrices over an offer's stops.
//!
//! The planner reads every leg it tries from one square matrix per offer,
//! covering the offer's path and the pickups and dropoffs planned into it
//! so far. A request whose stops are missing grows the matrix with a
//! single oracle call.

use std::sync::Arc;

use chrono::TimeDelta;
use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};
use scc::hash_map::Entry;
use scc::HashMap;

use crate::cancel::Cancellation;
use crate::geo::{Coordinate, CoordinateKey};
use crate::model::{Offer, OfferId};
use crate::oracle::{MatrixParams, OracleError, Profile, RoutingOracle};

/// Stops held by one cached matrix. Larger matrices are computed for a
/// single planning call and not kept.
pub const DEFAULT_CACHING_BOUND: usize = 40;

/// A driving time matrix addressed by stop coordinate.
#[derive(Debug, Clone)]
pub struct StopMatrix {
    stops: Vec<Coordinate>,
    index: FxHashMap<CoordinateKey, usize>,
    times: Vec<Vec<TimeDelta>>,
}

impl StopMatrix {
    fn new(stops: Vec<Coordinate>, times: Vec<Vec<TimeDelta>>) -> Result<Self, OracleError> {
        let square = times.len() == stops.len() && times.iter().all(|row| row.len() == stops.len());
        if !square || times.iter().flatten().any(|time| *time < TimeDelta::zero()) {
            return Err(OracleError::Malformed(format!(
                "expected a {0}x{0} matrix of non-negative times",
                stops.len()
            )));
        }

        let index = stops
            .iter()
            .enumerate()
            .map(|(position, stop)| (stop.key(), position))
            .collect();

        Ok(StopMatrix { stops, index, times })
    }

    pub fn stops(&self) -> &[Coordinate] {
        &self.stops
    }

    pub fn contains(&self, stop: &Coordinate) -> bool {
        self.index.contains_key(&stop.key())
    }

    /// Driving time from `from` to `to`, if both are stops of the matrix.
    pub fn time(&self, from: &Coordinate, to: &Coordinate) -> Option<TimeDelta> {
        let row = *self.index.get(&from.key())?;
        let column = *self.index.get(&to.key())?;
        Some(self.times[row][column])
    }

    /// Per-leg driving times of a path through `stops`, in order.
    pub fn legs(&self, stops: &[Coordinate]) -> Result<Vec<TimeDelta>, OracleError> {
        stops
            .windows(2)
            .map(|leg| {
                self.time(&leg[0], &leg[1])
                    .ok_or_else(|| OracleError::Malformed(format!("no travel time from {} to {}", leg[0], leg[1])))
            })
            .collect()
    }
}

/// Run-scoped [`StopMatrix`] per offer.
///
/// Safe for concurrent use. Two workers growing the same offer's matrix
/// both query the oracle, and the last write wins.
pub struct TimeMatrixCache {
    matrices: HashMap<OfferId, Arc<StopMatrix>>,
    bound: usize,
}

impl Default for TimeMatrixCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHING_BOUND)
    }
}

impl TimeMatrixCache {
    pub fn new(bound: usize) -> Self {
        TimeMatrixCache {
            matrices: HashMap::new(),
            bound,
        }
    }

    pub fn len(&self) -> usize {
        self.matrices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }

    /// A matrix covering the offer's endpoints, its path, and `extra`.
    ///
    /// Served from the cache when the offer's matrix already covers them,
    /// otherwise computed with one matrix query over the union of the
    /// cached stops and the missing ones.
    pub fn matrix(
        &self,
        ctx: &Cancellation,
        oracle: &dyn RoutingOracle,
        offer: &Offer,
        extra: &[Coordinate],
    ) -> Result<Arc<StopMatrix>, OracleError> {
        let wanted = [offer.source, offer.destination]
            .into_iter()
            .chain(offer.path.iter().map(|point| point.coordinate))
            .chain(extra.iter().copied())
            .collect::<Vec<_>>();

        let cached = self.matrices.get(&offer.id).map(|entry| entry.get().clone());
        if let Some(matrix) = &cached {
            if wanted.iter().all(|stop| matrix.contains(stop)) {
                return Ok(matrix.clone());
            }
        }

        let mut stops = Vec::with_capacity(wanted.len());
        let mut seen = FxHashSet::default();
        let known = cached.as_ref().map(|matrix| matrix.stops()).unwrap_or_default();
        for stop in known.iter().chain(&wanted) {
            if seen.insert(stop.key()) {
                stops.push(*stop);
            }
        }

        if stops.len() > self.bound {
            // Over the bound, the stops cached so far are dropped.
            seen.clear();
            stops.clear();
            for stop in &wanted {
                if seen.insert(stop.key()) {
                    stops.push(*stop);
                }
            }
        }

        let keep = stops.len() <= self.bound;
        let params = MatrixParams::new(stops.clone(), stops.clone(), Profile::Auto).with_departure(offer.departure);
        let matrix = oracle.compute_distance_time_matrix(ctx, &params)?;
        let matrix = Arc::new(StopMatrix::new(stops, matrix.times().to_vec())?);

        if keep {
            debug!("Cached a {0}x{0} time matrix for {1}", matrix.stops().len(), offer.id);
            match self.matrices.entry(offer.id.clone()) {
                Entry::Occupied(mut entry) => *entry.get_mut() = matrix.clone(),
                Entry::Vacant(entry) => {
                    entry.insert_entry(matrix.clone());
                }
            }
        }

        Ok(matrix)
    }
}
