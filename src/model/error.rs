use thiserror::Error;

use crate::model::{OfferId, RequestId};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("request {0}: earliest departure must precede latest arrival")]
    InvertedRequestWindow(RequestId),

    #[error("offer {0}: departure must precede max estimated arrival")]
    InvertedOfferWindow(OfferId),

    #[error("offer {id}: {current} riders exceed a capacity of {capacity}")]
    OverCapacity { id: OfferId, current: u32, capacity: u32 },

    #[error("request {0}: number of riders must be positive")]
    NoRiders(RequestId),

    #[error("{field} must not be negative")]
    NegativeDuration { field: &'static str },

    #[error("offer {0}: path must begin and end at the offer's endpoints")]
    MalformedPath(OfferId),

    #[error("offer {offer}: path references unmatched request {request}")]
    UnknownOwner { offer: OfferId, request: RequestId },
}
