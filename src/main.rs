use std::sync::Arc;

use log::{error, info};

use ridematch::engine::{JsonFileReader, LogPublisher};
use ridematch::oracle::{RoutingOracle, StraightLineOracle};
use ridematch::{Cancellation, MatcherConfig, MatchingEngine};

fn oracle() -> Result<Arc<dyn RoutingOracle>, Box<dyn std::error::Error>> {
    #[cfg(feature = "osrm")]
    if let Ok(endpoint) = std::env::var("OSRM_ENDPOINT") {
        info!("Routing through OSRM at {}", endpoint);
        return Ok(Arc::new(ridematch::oracle::osrm::OsrmOracle::new(&endpoint)?));
    }

    info!("Routing along straight lines");
    Ok(Arc::new(StraightLineOracle::default()))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // `.env` may carry `RUST_LOG`, so it is loaded before the logger.
    let _ = dotenv::dotenv();

    #[cfg(feature = "tracing")]
    ridematch::util::trace::initialize_tracer();
    #[cfg(not(feature = "tracing"))]
    env_logger::init();

    let config = MatcherConfig::from_env();

    let path = std::env::args_os()
        .nth(1)
        .ok_or("usage: ridematch <snapshot.json>")?;

    let engine = MatchingEngine::new(config, oracle()?);
    let report = engine.execute(&Cancellation::new(), &JsonFileReader::new(path), &LogPublisher)?;

    for failure in &report.failures {
        error!("{}", failure);
    }

    info!(
        "Assigned {} requests across {} offers ({} pairs, {} candidates, {} rounds)",
        report.assigned(),
        report.results.len(),
        report.pairs,
        report.candidates,
        report.rounds
    );

    match report.publish_failure {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}
