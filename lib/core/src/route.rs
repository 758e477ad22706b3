use serde::{Deserialize, Serialize};
use crate::airport::{AirlineId, AirportId};

/// A directed flight leg between two airports.
///
/// Several routes may connect the same pair of airports, one per airline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub source: AirportId,
    pub destination: AirportId,
    pub airline: Option<AirlineId>,
    /// Great-circle length in km, derived from the endpoint coordinates
    pub distance: f64,
    #[serde(default)]
    pub codeshare: bool,
    #[serde(default)]
    pub equipment: String,
}

impl Route {
    #[inline]
    #[must_use]
    pub fn new(source: AirportId, destination: AirportId, distance: f64) -> Self {
        Self {
            source,
            destination,
            airline: None,
            distance,
            codeshare: false,
            equipment: String::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_airline(mut self, airline: AirlineId) -> Self {
        self.airline = Some(airline);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_codeshare(mut self, codeshare: bool) -> Self {
        self.codeshare = codeshare;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_equipment(mut self, equipment: impl Into<String>) -> Self {
        self.equipment = equipment.into();
        self
    }
}
