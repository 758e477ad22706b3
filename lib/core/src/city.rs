use serde::{Deserialize, Serialize};
use crate::geo::Coordinate;

pub type CityId = u64;

/// A localized name of a city
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityName {
    pub name: String,
    /// Language or script tag, e.g. "latin"
    pub lang: String,
    pub city_id: CityId,
}

impl CityName {
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, lang: impl Into<String>, city_id: CityId) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
            city_id,
        }
    }

    pub fn serialize(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "city_id": self.city_id,
        })
    }
}

/// A populated place, searched by proximity and by name but never routed through
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub id: CityId,
    pub latitude: f64,
    pub longitude: f64,
    pub population: Option<u64>,
    pub country_code: String,
    pub subdivision_code: String,
    #[serde(default)]
    pub gns_fd: String,
    #[serde(default)]
    pub gns_ufi: i64,
    #[serde(default)]
    pub language_code: String,
    pub names: Vec<CityName>,
}

impl City {
    #[inline]
    #[must_use]
    pub fn new(id: CityId, latitude: f64, longitude: f64) -> Self {
        Self {
            id,
            latitude,
            longitude,
            population: None,
            country_code: String::new(),
            subdivision_code: String::new(),
            gns_fd: String::new(),
            gns_ufi: 0,
            language_code: String::new(),
            names: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_population(mut self, population: u64) -> Self {
        self.population = Some(population);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_country(mut self, country_code: impl Into<String>) -> Self {
        self.country_code = country_code.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>, lang: impl Into<String>) -> Self {
        let id = self.id;
        self.names.push(CityName::new(name, lang, id));
        self
    }

    #[inline]
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    /// First imported name, used as the display value
    #[inline]
    pub fn primary_name(&self) -> &str {
        self.names.first().map(|n| n.name.as_str()).unwrap_or("")
    }

    pub fn serialize(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "gns_ufi": self.gns_ufi,
            "latitude": self.latitude,
            "longitude": self.longitude,
            "country_code": self.country_code,
            "subdivision_code": self.subdivision_code,
            "gns_fd": self.gns_fd,
            "language_code": self.language_code,
            "population": self.population.unwrap_or(0),
            "city_names": self.names.iter().map(|n| n.name.as_str()).collect::<Vec<_>>(),
        })
    }
}

/// Bit-exact (latitude, longitude) key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocationKey(u64, u64);

impl LocationKey {
    #[inline]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        // -0.0 and 0.0 name the same place
        Self((latitude + 0.0).to_bits(), (longitude + 0.0).to_bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_city_serialize() {
        let city = City::new(1, 33.175678, 68.730449)
            .with_country("AF")
            .with_name("شرن", "arabic")
            .with_name("Sharan", "latin");

        let value = city.serialize();
        assert_eq!(value["id"], 1);
        assert_eq!(value["population"], 0);
        assert_eq!(value["city_names"], serde_json::json!(["شرن", "Sharan"]));
        assert_eq!(city.primary_name(), "شرن");
        assert_eq!(city.names[1].serialize(), serde_json::json!({"name": "Sharan", "city_id": 1}));
    }

    #[test]
    fn test_location_key_zero_sign() {
        assert_eq!(LocationKey::new(0.0, 10.0), LocationKey::new(-0.0, 10.0));
        assert_ne!(LocationKey::new(1.0, 10.0), LocationKey::new(10.0, 1.0));
    }
}
