use thiserror::Error;

use crate::geo::{Coordinate, GeoError};
use crate::impl_err;
use crate::model::{ModelError, OfferId, RequestId};
use crate::oracle::OracleError;

pub type Result<T> = std::result::Result<T, Error>;

/// The crate-level error.
///
/// Infeasibility is never represented here: a checker answers `Ok(false)`
/// and the planner answers `Ok(None)` for a pair which simply cannot be
/// matched. Every value of this type is an operational failure.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no route coordinate lies within reach of {0}")]
    OutOfReach(Coordinate),

    #[error(transparent)]
    Model(ModelError),

    #[error(transparent)]
    Geo(GeoError),

    #[error(transparent)]
    Oracle(OracleError),

    #[error("{operation}: {source}")]
    Context {
        operation: &'static str,
        #[source]
        source: Box<Error>,
    },

    #[error("evaluating offer {offer} against request {request}: {source}")]
    Pair {
        offer: OfferId,
        request: RequestId,
        #[source]
        source: Box<Error>,
    },

    #[error("failed to read matching snapshot: {0}")]
    Read(String),

    #[error("failed to publish matching results: {0}")]
    Publish(String),
}

impl_err!(ModelError, Model);
impl_err!(GeoError, Geo);
impl_err!(OracleError, Oracle);

/// The taxonomy every [`Error`] falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ErrorKind {
    /// Malformed arguments. A caller error, never retried.
    InvalidInput,
    /// The routing oracle failed in transport or returned a non-success status.
    ExternalService,
    /// The run was cancelled or its deadline elapsed.
    Cancelled,
    /// The snapshot reader or the result publisher failed.
    Boundary,
}

impl Error {
    /// Classifies the error, looking through any context wrapping.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_) | Error::OutOfReach(_) | Error::Model(_) | Error::Geo(_) => ErrorKind::InvalidInput,
            Error::Oracle(err) if err.is_cancellation() => ErrorKind::Cancelled,
            Error::Oracle(_) => ErrorKind::ExternalService,
            Error::Context { source, .. } | Error::Pair { source, .. } => source.kind(),
            Error::Read(_) | Error::Publish(_) => ErrorKind::Boundary,
        }
    }

    /// Whether the failure affects every pair of the run rather than a
    /// single one. A systemic failure aborts the run.
    pub fn is_systemic(&self) -> bool {
        match self {
            Error::Oracle(err) => err.is_systemic(),
            Error::Context { source, .. } | Error::Pair { source, .. } => source.is_systemic(),
            _ => false,
        }
    }

    pub(crate) fn for_pair(self, offer: &OfferId, request: &RequestId) -> Self {
        Error::Pair {
            offer: offer.clone(),
            request: request.clone(),
            source: Box::new(self),
        }
    }
}

/// Attaches the name of the failing operation to an error
/// as it travels upward through the pipeline.
pub trait Context<T> {
    fn context(self, operation: &'static str) -> Result<T>;
}

impl<T, E> Context<T> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn context(self, operation: &'static str) -> Result<T> {
        self.map_err(|err| Error::Context {
            operation,
            source: Box::new(err.into()),
        })
    }
}
