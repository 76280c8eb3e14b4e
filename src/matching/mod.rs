//! Capacitated assignment of requests to offers.
//!
//! Each offer is split into as many unit slots as it has seats left, and a
//! maximum matching of slots to requests is found with Hopcroft-Karp. The
//! matched pairs are then committed one by one, in offer order, each one
//! confirmed against the offer's live path by the insertion planner. A pair
//! the planner (or the co-rider preference check) rejects is removed from
//! the graph for the rest of the run. Rounds repeat over the remaining
//! graph until one neither commits nor removes anything.

use std::hash::BuildHasherDefault;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use log::{debug, info, warn};
use measure_time::debug_time;
use petgraph::prelude::UnGraphMap;
use rustc_hash::FxHasher;
#[cfg(feature = "tracing")]
use tracing::Level;

use crate::cancel::Cancellation;
use crate::check::PreferenceChecker;
use crate::error::{Error, Result};
use crate::model::{MatchCandidate, MatchingResult, Offer, OfferId, Request};
use crate::plan::PathInsertionPlanner;

#[doc(hidden)]
pub mod hopcroft_karp;


#[doc(inline)]
pub use hopcroft_karp::HopcroftKarp;

/// A vertex of the candidate graph, by position in the run's offer and
/// request lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Vertex {
    Offer(usize),
    Request(usize),
}

/// Edges are weighted by the candidate's enumeration index, which orders
/// every adjacency list.
type CandidateGraph = UnGraphMap<Vertex, usize, BuildHasherDefault<FxHasher>>;

/// The outcome of a matching run.
#[derive(Debug, Default)]
pub struct Assignment {
    /// One result per offer which received at least one request, in
    /// offer order.
    pub results: Vec<MatchingResult>,
    /// Pairs whose insertion could not be planned because of a failure.
    pub failures: Vec<Error>,
    pub rounds: usize,
}

impl Assignment {
    pub fn assigned(&self) -> usize {
        self.results.iter().map(|result| result.assigned.len()).sum()
    }
}

pub struct CapacitatedMatcher {
    planner: Arc<PathInsertionPlanner>,
}

struct Run {
    offers: IndexMap<OfferId, Offer>,
    requests: Vec<Arc<Request>>,
    assigned: Vec<Vec<Arc<Request>>>,
    taken: Vec<bool>,
    graph: CandidateGraph,
}

impl CapacitatedMatcher {
    pub fn new(planner: Arc<PathInsertionPlanner>) -> Self {
        CapacitatedMatcher { planner }
    }

    /// Assigns requests to `offers` along the `candidates` edges.
    ///
    /// Candidates naming an offer absent from `offers` are ignored. The
    /// input offers are not modified; the results carry updated copies.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = Level::INFO, skip_all))]
    pub fn assign(&self, ctx: &Cancellation, offers: &[Arc<Offer>], candidates: &[MatchCandidate]) -> Result<Assignment> {
        debug_time!("Matched {} candidates", candidates.len());

        let mut run = Run::new(offers, candidates);
        let mut assignment = Assignment::default();

        loop {
            ctx.check()?;
            assignment.rounds += 1;

            let (slots, requests, adjacency) = run.slots();
            let matching = HopcroftKarp::new(&adjacency, requests.len()).solve();
            debug!(
                "Round {}: {} slots, {} requests, {} matched",
                assignment.rounds,
                slots.len(),
                requests.len(),
                matching.iter().flatten().count()
            );

            let mut changed = false;
            for (slot, partner) in matching.iter().enumerate() {
                let Some(partner) = partner else { continue };
                let (offer, request) = (slots[slot], requests[*partner]);

                match self.commit(ctx, &mut run, offer, request) {
                    Ok(committed) => {
                        if !committed {
                            run.graph.remove_edge(Vertex::Offer(offer), Vertex::Request(request));
                        }
                        changed = true;
                    }
                    Err(err) if err.is_systemic() => return Err(err),
                    Err(err) => {
                        warn!("Dropping pair after planning failure: {}", err);
                        run.graph.remove_edge(Vertex::Offer(offer), Vertex::Request(request));
                        assignment.failures.push(err);
                        changed = true;
                    }
                }
            }

            if !changed {
                break;
            }
        }

        assignment.results = run.results();
        info!(
            "Assigned {} requests across {} offers in {} rounds",
            assignment.assigned(),
            assignment.results.len(),
            assignment.rounds
        );

        Ok(assignment)
    }

    /// Commits `request` to `offer` if it still fits. `Ok(false)` means the
    /// pair can never be committed this run.
    fn commit(&self, ctx: &Cancellation, run: &mut Run, offer: usize, request: usize) -> Result<bool> {
        if run.taken[request] {
            return Ok(true);
        }

        let rider = run.requests[request].clone();
        let Some((_, live)) = run.offers.get_index_mut(offer) else {
            return Ok(false);
        };

        if rider.riders > live.residual() || !PreferenceChecker::compatible(live, &rider) {
            return Ok(false);
        }

        let Some(path) = self
            .planner
            .find_first_feasible_path(ctx, live, &rider)
            .map_err(|err| err.for_pair(&live.id, &rider.id))?
        else {
            debug!("Planner rejected {} for {}", rider.id, live.id);
            return Ok(false);
        };

        live.path = path;
        live.current_number_of_requests += rider.riders;
        live.matched_requests.push(rider.clone());

        run.assigned[offer].push(rider);
        run.taken[request] = true;
        run.graph.remove_node(Vertex::Request(request));

        Ok(true)
    }
}

impl Run {
    fn new(offers: &[Arc<Offer>], candidates: &[MatchCandidate]) -> Self {
        let offers = offers
            .iter()
            .map(|offer| (offer.id.clone(), offer.as_ref().clone()))
            .collect::<IndexMap<_, _>>();

        let mut requests: IndexMap<_, Arc<Request>> = IndexMap::new();
        let mut graph = CandidateGraph::default();

        for (order, candidate) in candidates.iter().enumerate() {
            let Some(offer) = offers.get_index_of(&candidate.offer.id) else {
                continue;
            };

            let (request, _) = requests.insert_full(candidate.request.id.clone(), candidate.request.clone());
            graph.add_edge(Vertex::Offer(offer), Vertex::Request(request), order);
        }

        Run {
            assigned: vec![vec![]; offers.len()],
            taken: vec![false; requests.len()],
            requests: requests.into_values().collect(),
            offers,
            graph,
        }
    }

    /// Splits every offer into unit slots and lists each slot's requests.
    /// Returns the offer of each slot, the request of each right vertex,
    /// and the slot adjacency.
    fn slots(&self) -> (Vec<usize>, Vec<usize>, Vec<Vec<usize>>) {
        let mut slots = vec![];
        let mut adjacency = vec![];
        let mut requests: IndexSet<usize> = IndexSet::new();

        for (index, offer) in self.offers.values().enumerate() {
            let vertex = Vertex::Offer(index);
            if !self.graph.contains_node(vertex) {
                continue;
            }

            let mut edges = self
                .graph
                .edges(vertex)
                .filter_map(|(_, other, order)| match other {
                    Vertex::Request(request) if !self.taken[request] => Some((*order, request)),
                    _ => None,
                })
                .collect::<Vec<_>>();
            edges.sort_unstable();

            let neighbours = edges
                .into_iter()
                .map(|(_, request)| requests.insert_full(request).0)
                .collect::<Vec<_>>();

            let count = (offer.residual() as usize).min(neighbours.len());
            for _ in 0..count {
                slots.push(index);
                adjacency.push(neighbours.clone());
            }
        }

        (slots, requests.into_iter().collect(), adjacency)
    }

    fn results(self) -> Vec<MatchingResult> {
        self.offers
            .into_values()
            .zip(self.assigned)
            .filter(|(_, assigned)| !assigned.is_empty())
            .map(|(offer, assigned)| MatchingResult { offer, assigned })
            .collect()
    }
}
