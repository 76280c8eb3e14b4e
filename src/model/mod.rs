//! The matching domain: offers, requests and the stops along an offer's path.
//!
//! Offers and requests are immutable snapshots for the duration of a run.
//! Shared ownership (`Arc`) lets evaluation workers hold them concurrently;
//! only the matcher's commit phase produces updated offers.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

#[doc(hidden)]
pub mod error;
#[doc(hidden)]
pub mod offer;
#[doc(hidden)]
pub mod path;
#[doc(hidden)]
pub mod request;
#[doc(hidden)]
pub mod result;


#[doc(inline)]
pub use error::ModelError;
#[doc(inline)]
pub use offer::Offer;
#[doc(inline)]
pub use path::{PathPoint, PointType};
#[doc(inline)]
pub use request::Request;
#[doc(inline)]
pub use result::{MatchCandidate, MatchingResult, PickupDropoffResult};

macro_rules! identifier {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                $name(value.to_string())
            }
        }
    };
}

identifier!(OfferId);
identifier!(RequestId);
identifier!(UserId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

/// A participant's gender, and whether they only ride with the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Preference {
    pub gender: Gender,
    pub same_gender: bool,
}

impl Preference {
    pub fn new(gender: Gender, same_gender: bool) -> Self {
        Preference { gender, same_gender }
    }

    /// Two participants may share a ride unless their genders differ
    /// and either of them insists on the same gender.
    pub fn compatible(&self, other: &Preference) -> bool {
        self.gender == other.gender || !(self.same_gender || other.same_gender)
    }
}

/// Serializes a `TimeDelta` as fractional seconds.
pub(crate) mod seconds {
    use chrono::TimeDelta;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::geo::{seconds, try_from_seconds};

    pub fn serialize<S: Serializer>(value: &TimeDelta, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_f64(seconds(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<TimeDelta, D::Error> {
        try_from_seconds(f64::deserialize(de)?).map_err(D::Error::custom)
    }

    pub mod option {
        use chrono::TimeDelta;
        use serde::de::Error;
        use serde::{Deserialize, Deserializer, Serializer};

        use crate::geo::{seconds, try_from_seconds};

        pub fn serialize<S: Serializer>(value: &Option<TimeDelta>, ser: S) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => ser.serialize_some(&seconds(*value)),
                None => ser.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Option<TimeDelta>, D::Error> {
            Option::<f64>::deserialize(de)?
                .map(try_from_seconds)
                .transpose()
                .map_err(D::Error::custom)
        }
    }
}
