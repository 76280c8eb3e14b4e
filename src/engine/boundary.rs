//! The edges of a run: where its input comes from and where its
//! results go.

use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{MatchingResult, Offer, Request};

/// The offers and requests of one run, as read at its start.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub offers: Vec<Offer>,
    #[serde(default)]
    pub requests: Vec<Request>,
}

/// Supplies the input of a run. `Ok(None)` means there is nothing to match.
pub trait Reader: Send + Sync {
    fn read(&self) -> Result<Option<Snapshot>>;
}

/// Receives the results of a completed run.
pub trait Publisher: Send + Sync {
    fn publish(&self, results: &[MatchingResult]) -> Result<()>;
}

/// A reader over a snapshot already in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryReader {
    snapshot: Option<Snapshot>,
}

impl MemoryReader {
    pub fn new(offers: Vec<Offer>, requests: Vec<Request>) -> Self {
        MemoryReader {
            snapshot: Some(Snapshot { offers, requests }),
        }
    }

    pub fn empty() -> Self {
        MemoryReader::default()
    }
}

impl Reader for MemoryReader {
    fn read(&self) -> Result<Option<Snapshot>> {
        Ok(self.snapshot.clone())
    }
}

/// Reads a JSON [`Snapshot`] from a file. A missing file is an absent
/// snapshot, not a failure.
#[derive(Debug, Clone)]
pub struct JsonFileReader {
    path: PathBuf,
}

impl JsonFileReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        JsonFileReader {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl Reader for JsonFileReader {
    fn read(&self) -> Result<Option<Snapshot>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == IoErrorKind::NotFound => {
                debug!("No snapshot at {}", self.path.display());
                return Ok(None);
            }
            Err(err) => return Err(Error::Read(format!("{}: {}", self.path.display(), err))),
        };

        let snapshot: Snapshot = serde_json::from_str(&contents)
            .map_err(|err| Error::Read(format!("{}: {}", self.path.display(), err)))?;

        debug!(
            "Read {} offers and {} requests from {}",
            snapshot.offers.len(),
            snapshot.requests.len(),
            self.path.display()
        );

        Ok(Some(snapshot))
    }
}

/// Writes every result to the log, as JSON at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPublisher;

impl Publisher for LogPublisher {
    fn publish(&self, results: &[MatchingResult]) -> Result<()> {
        for result in results {
            let assigned = result.assigned.iter().map(|request| request.id.to_string()).collect::<Vec<_>>();
            info!(
                "Offer {} takes {:?} ({}/{} seats)",
                result.offer.id,
                assigned,
                result.offer.current_number_of_requests,
                result.offer.capacity
            );

            let encoded = serde_json::to_string(result).map_err(|err| Error::Publish(err.to_string()))?;
            debug!("{}", encoded);
        }

        Ok(())
    }
}
