// Great-circle geometry on a spherical earth, kilometres throughout
use serde::{Deserialize, Serialize};
use crate::{Error, Result};

/// Mean earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    #[inline]
    #[must_use]
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Build a coordinate, rejecting non-finite or out-of-range values
    pub fn checked(lat: f64, lng: f64) -> Result<Self> {
        if !lat.is_finite() || !lng.is_finite() {
            return Err(Error::InvalidArgument(format!(
                "coordinates must be finite, got ({}, {})",
                lat, lng
            )));
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(Error::InvalidArgument(format!("latitude out of range: {}", lat)));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(Error::InvalidArgument(format!("longitude out of range: {}", lng)));
        }
        Ok(Self { lat, lng })
    }

    #[inline]
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        haversine_distance(self.lat, self.lng, other.lat, other.lng)
    }

    /// Position on the unit sphere as `[x, y, z]`.
    ///
    /// Straight-line (chord) length between two such points grows
    /// monotonically with the great-circle distance, which lets an
    /// euclidean R-tree answer haversine nearest-neighbour queries.
    #[inline]
    pub fn to_unit_vector(&self) -> [f64; 3] {
        let lat = self.lat.to_radians();
        let lng = self.lng.to_radians();
        [lat.cos() * lng.cos(), lat.cos() * lng.sin(), lat.sin()]
    }
}

/// Haversine distance between two points, in kilometres
#[inline]
pub fn haversine_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Rectangle given by its north-east and south-west corners
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub ne: Coordinate,
    pub sw: Coordinate,
}

impl BoundingBox {
    pub fn new(ne_lat: f64, ne_lng: f64, sw_lat: f64, sw_lng: f64) -> Result<Self> {
        let ne = Coordinate::checked(ne_lat, ne_lng)?;
        let sw = Coordinate::checked(sw_lat, sw_lng)?;
        if sw.lat > ne.lat {
            return Err(Error::InvalidArgument(format!(
                "south-west latitude {} is north of north-east latitude {}",
                sw.lat, ne.lat
            )));
        }
        Ok(Self { ne, sw })
    }

    /// Strict containment: points on an edge are outside.
    #[inline]
    pub fn contains(&self, point: &Coordinate) -> bool {
        point.lat < self.ne.lat
            && point.lat > self.sw.lat
            && point.lng < self.ne.lng
            && point.lng > self.sw.lng
    }
}
