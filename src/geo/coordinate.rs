use std::fmt::{Debug, Display, Formatter};
use std::ops::Deref;

use geo::Point;
use serde::{Deserialize, Serialize};

use crate::geo::error::GeoError;

pub type Degree = f64;

/// `Coordinate`
/// The latitude, longitude pair structure, geotags an item with a location.
///
/// Always lies within `[-90, 90] x [-180, 180]`, which is checked on
/// construction and on deserialization.
///
/// ```rust
/// use ridematch::geo::Coordinate;
/// let coordinate = Coordinate::new(52.52, 13.40).unwrap();
/// println!("Position: {}", coordinate);
/// ```
#[derive(Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    lat: Degree,
    lng: Degree,
}

#[derive(Deserialize)]
struct RawCoordinate {
    lat: Degree,
    lng: Degree,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = GeoError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(raw.lat, raw.lng)
    }
}

/// Bit-exact identity of a [`Coordinate`], usable as a hash key.
pub type CoordinateKey = (u64, u64);

impl Coordinate {
    pub fn new(lat: Degree, lng: Degree) -> Result<Self, GeoError> {
        if !(-90f64..=90f64).contains(&lat) {
            return Err(GeoError::InvalidCoordinate(format!(
                "Latitude must lie within [-90, 90]. Given: {}",
                lat
            )));
        }

        if !(-180f64..=180f64).contains(&lng) {
            return Err(GeoError::InvalidCoordinate(format!(
                "Longitude must lie within [-180, 180]. Given: {}",
                lng
            )));
        }

        Ok(Self::new_unchecked(lat, lng))
    }

    pub(crate) fn new_unchecked(lat: Degree, lng: Degree) -> Self {
        Coordinate { lat, lng }
    }

    pub fn lat(&self) -> Degree {
        self.lat
    }

    pub fn lng(&self) -> Degree {
        self.lng
    }

    pub fn key(&self) -> CoordinateKey {
        (self.lat.to_bits(), self.lng.to_bits())
    }

    /// The coordinate as a `geo` point, where `x` is longitude.
    pub fn point(&self) -> Point {
        Point::new(self.lng, self.lat)
    }
}

impl TryFrom<Point> for Coordinate {
    type Error = GeoError;

    fn try_from(point: Point) -> Result<Self, Self::Error> {
        Coordinate::new(point.y(), point.x())
    }
}

impl From<Coordinate> for Point {
    fn from(value: Coordinate) -> Self {
        value.point()
    }
}

impl Debug for Coordinate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Coordinate({}, {})", self.lat, self.lng)
    }
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6},{:.6}", self.lat, self.lng)
    }
}

/// An ordered route polyline. Order is travel order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineString(Vec<Coordinate>);

impl LineString {
    pub fn new(coordinates: Vec<Coordinate>) -> Self {
        LineString(coordinates)
    }

    pub fn into_inner(self) -> Vec<Coordinate> {
        self.0
    }

    pub fn to_geo(&self) -> geo::LineString {
        self.0.iter().map(|c| geo::coord! { x: c.lng, y: c.lat }).collect()
    }
}

impl Deref for LineString {
    type Target = [Coordinate];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<Coordinate>> for LineString {
    fn from(value: Vec<Coordinate>) -> Self {
        LineString(value)
    }
}

impl FromIterator<Coordinate> for LineString {
    fn from_iter<T: IntoIterator<Item = Coordinate>>(iter: T) -> Self {
        LineString(iter.into_iter().collect())
    }
}

impl IntoIterator for LineString {
    type Item = Coordinate;
    type IntoIter = std::vec::IntoIter<Coordinate>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a LineString {
    type Item = &'a Coordinate;
    type IntoIter = std::slice::Iter<'a, Coordinate>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
