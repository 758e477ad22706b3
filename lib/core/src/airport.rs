use serde::{Deserialize, Serialize};
use crate::geo::Coordinate;

pub type AirportId = u64;
pub type AirlineId = u64;

/// An airport - a node of the route graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Airport {
    pub id: AirportId,
    pub name: String,
    pub city: String,
    pub country: String,
    /// IATA code, or FAA code for US airports without one
    pub iata_faa: Option<String>,
    pub icao: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    /// Altitude in feet
    #[serde(default)]
    pub altitude: Option<f64>,
    /// Hours offset from UTC
    #[serde(default)]
    pub timezone: Option<f64>,
    #[serde(default)]
    pub dst: Option<char>,
    #[serde(default)]
    pub tz_database_time_zone: Option<String>,
}

impl Airport {
    #[inline]
    #[must_use]
    pub fn new(id: AirportId, name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id,
            name: name.into(),
            city: String::new(),
            country: String::new(),
            iata_faa: None,
            icao: None,
            latitude,
            longitude,
            altitude: None,
            timezone: None,
            dst: None,
            tz_database_time_zone: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_location(mut self, city: impl Into<String>, country: impl Into<String>) -> Self {
        self.city = city.into();
        self.country = country.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_codes(mut self, iata_faa: Option<String>, icao: Option<String>) -> Self {
        self.iata_faa = iata_faa;
        self.icao = icao;
        self
    }

    #[inline]
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// An airline operating routes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Airline {
    pub id: AirlineId,
    pub name: String,
    pub alias: String,
    pub iata: String,
    pub icao: String,
    pub callsign: String,
    pub country: String,
    pub active: bool,
}

impl Airline {
    #[inline]
    #[must_use]
    pub fn new(id: AirlineId, name: impl Into<String>, iata: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            alias: String::new(),
            iata: iata.into(),
            icao: String::new(),
            callsign: String::new(),
            country: String::new(),
            active: false,
        }
    }
}
