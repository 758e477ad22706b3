// City search: proximity, bounding box and name autocomplete
use std::cmp::{Ordering, Reverse};
use ahash::AHashMap;
use ordered_float::OrderedFloat;
use strsim::jaro_winkler;
use crate::aggregate::{AutocompleteEntry, CityHit};
use crate::city::{City, CityId, LocationKey};
use crate::geo::{BoundingBox, Coordinate};
use crate::geo_index::GeoIndex;

pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.85;

/// Builder that keeps cities unique by location
#[derive(Debug, Default)]
pub struct CityRegistry {
    cities: Vec<City>,
    by_location: AHashMap<LocationKey, usize>,
}

impl CityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get-or-create the city at `(latitude, longitude)`.
    ///
    /// `make` receives the id to use and is only called on creation.
    /// Returns the city id and whether it was created by this call.
    pub fn upsert<F>(&mut self, latitude: f64, longitude: f64, make: F) -> (CityId, bool)
    where
        F: FnOnce(CityId) -> City,
    {
        let key = LocationKey::new(latitude, longitude);
        if let Some(&idx) = self.by_location.get(&key) {
            return (self.cities[idx].id, false);
        }
        let id = self.cities.len() as CityId + 1;
        let mut city = make(id);
        city.id = id;
        city.latitude = latitude;
        city.longitude = longitude;
        self.by_location.insert(key, self.cities.len());
        self.cities.push(city);
        (id, true)
    }

    pub fn get_mut(&mut self, latitude: f64, longitude: f64) -> Option<&mut City> {
        let idx = *self.by_location.get(&LocationKey::new(latitude, longitude))?;
        self.cities.get_mut(idx)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn into_cities(self) -> Vec<City> {
        self.cities
    }
}

/// Read-only city search structure
pub struct PlaceIndex {
    cities: Vec<City>,
    by_id: AHashMap<CityId, usize>,
    geo: GeoIndex,
    /// (lowercased name, city position, name position), sorted by name
    names: Vec<(String, usize, usize)>,
    fuzzy_threshold: f64,
}

impl PlaceIndex {
    pub fn new(mut cities: Vec<City>) -> Self {
        cities.sort_by_key(|c| c.id);
        let by_id = cities.iter().enumerate().map(|(i, c)| (c.id, i)).collect();
        let geo = GeoIndex::from_points(cities.iter().map(|c| (c.id, c.coordinate())));

        let mut names = Vec::new();
        for (ci, city) in cities.iter().enumerate() {
            for (ni, name) in city.names.iter().enumerate() {
                names.push((name.name.to_lowercase(), ci, ni));
            }
        }
        names.sort();

        Self {
            cities,
            by_id,
            geo,
            names,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }

    #[must_use]
    pub fn with_fuzzy_threshold(mut self, threshold: f64) -> Self {
        self.fuzzy_threshold = threshold;
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    #[inline]
    pub fn get(&self, id: CityId) -> Option<&City> {
        self.by_id.get(&id).map(|&i| &self.cities[i])
    }

    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    /// Nearest cities, each with its primary name and distance.
    ///
    /// Second value is the degraded-mode flag of the proximity query.
    pub fn closest(&self, origin: Coordinate, limit: usize, offset: usize) -> (Vec<CityHit>, bool) {
        let proximity = self.geo.closest(origin, limit, offset);
        let hits = proximity
            .items
            .iter()
            .filter_map(|n| self.get(n.id).map(|city| CityHit::new(city, n.distance)))
            .collect();
        (hits, proximity.degraded)
    }

    /// Cities strictly inside `bbox`, most populous first (unknown population last)
    pub fn within(&self, bbox: &BoundingBox, limit: usize) -> Vec<&City> {
        let mut inside: Vec<&City> = self
            .cities
            .iter()
            .filter(|c| bbox.contains(&c.coordinate()))
            .collect();
        inside.sort_by(|a, b| by_population(a, b).then(a.id.cmp(&b.id)));
        inside.truncate(limit);
        inside
    }

    /// Prefix search over every localized name, topped up with fuzzy matches
    pub fn autocomplete(&self, query: &str, limit: usize) -> Vec<AutocompleteEntry> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut prefixed: Vec<&(String, usize, usize)> = self.names_starting_with(&needle).iter().collect();
        prefixed.sort_by(|a, b| {
            by_population(&self.cities[a.1], &self.cities[b.1])
                .then_with(|| a.0.cmp(&b.0))
                .then(self.cities[a.1].id.cmp(&self.cities[b.1].id))
        });

        let mut entries: Vec<AutocompleteEntry> = prefixed
            .iter()
            .take(limit)
            .map(|&&(_, ci, ni)| self.entry(ci, ni))
            .collect();

        if entries.len() < limit {
            // Only names sharing the first letter are scored
            let lead = needle.chars().next().map_or(0, char::len_utf8);
            let mut fuzzy: Vec<(f64, &(String, usize, usize))> = self
                .names_starting_with(&needle[..lead])
                .iter()
                .filter(|(name, _, _)| !name.starts_with(&needle))
                .map(|item| (jaro_winkler(&needle, &item.0), item))
                .filter(|(score, _)| *score >= self.fuzzy_threshold)
                .collect();
            fuzzy.sort_by(|a, b| {
                OrderedFloat(b.0)
                    .cmp(&OrderedFloat(a.0))
                    .then_with(|| a.1 .0.cmp(&b.1 .0))
                    .then(self.cities[a.1 .1].id.cmp(&self.cities[b.1 .1].id))
            });
            let missing = limit - entries.len();
            entries.extend(
                fuzzy
                    .into_iter()
                    .take(missing)
                    .map(|(_, &(_, ci, ni))| self.entry(ci, ni)),
            );
        }

        entries
    }

    /// Contiguous run of the sorted names table beginning with `prefix`
    fn names_starting_with(&self, prefix: &str) -> &[(String, usize, usize)] {
        let start = self.names.partition_point(|(name, _, _)| name.as_str() < prefix);
        let len = self.names[start..].partition_point(|(name, _, _)| name.starts_with(prefix));
        &self.names[start..start + len]
    }

    fn entry(&self, city_idx: usize, name_idx: usize) -> AutocompleteEntry {
        let city = &self.cities[city_idx];
        AutocompleteEntry::new(&city.names[name_idx].name, city)
    }
}

fn by_population(a: &City, b: &City) -> Ordering {
    match (a.population, b.population) {
        (Some(x), Some(y)) => Reverse(x).cmp(&Reverse(y)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> PlaceIndex {
        PlaceIndex::new(vec![
            City::new(1, 50.4501, 30.5234).with_population(2_950_000).with_country("UA").with_name("Kyiv", "latin").with_name("Kiev", "latin"),
            City::new(2, 49.8397, 24.0297).with_population(720_000).with_country("UA").with_name("Lviv", "latin"),
            City::new(3, 50.2547, 28.6587).with_country("UA").with_name("Zhytomyr", "latin"),
            City::new(4, 50.6199, 26.2516).with_population(245_000).with_country("UA").with_name("Rivne", "latin"),
            City::new(5, 50.5, 30.45).with_population(40_000).with_country("UA").with_name("Kyivska Oblast", "latin"),
        ])
    }

    #[test]
    fn test_within_orders_by_population() {
        let index = index();
        let bbox = BoundingBox::new(51.0, 31.0, 49.0, 23.0).unwrap();
        let ids: Vec<u64> = index.within(&bbox, 10).iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 4, 5, 3]);

        let ids: Vec<u64> = index.within(&bbox, 2).iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_within_excludes_edges() {
        let index = index();
        let bbox = BoundingBox::new(50.4501, 31.0, 49.0, 23.0).unwrap();
        assert!(index.within(&bbox, 10).iter().all(|c| c.id != 1));
    }

    #[test]
    fn test_autocomplete_prefix() {
        let index = index();
        let values: Vec<String> = index.autocomplete("ky", 10).into_iter().map(|e| e.value).collect();
        assert_eq!(values, vec!["Kyiv".to_string(), "Kyivska Oblast".to_string()]);

        let first = &index.autocomplete("KIEV", 1)[0];
        assert_eq!(first.value, "Kiev");
        assert_eq!(first.data.id, 1);
        assert_eq!(first.data.country_code, "UA");
        assert!(index.autocomplete("   ", 10).is_empty());
    }

    #[test]
    fn test_autocomplete_fuzzy_fill() {
        let index = index();
        assert!(jaro_winkler("lvov", "lviv") >= DEFAULT_FUZZY_THRESHOLD);
        let values: Vec<String> = index.autocomplete("lvov", 5).into_iter().map(|e| e.value).collect();
        assert_eq!(values, vec!["Lviv".to_string()]);

        let values: Vec<String> = index.autocomplete("rivnr", 5).into_iter().map(|e| e.value).collect();
        assert_eq!(values.first().map(String::as_str), Some("Rivne"));
    }

    #[test]
    fn test_fuzzy_fill_needs_same_first_letter() {
        let index = index();
        assert!(jaro_winkler("zrivne", "rivne") >= DEFAULT_FUZZY_THRESHOLD);
        assert!(index.autocomplete("zrivne", 5).is_empty());

        let values: Vec<String> = index.autocomplete("zhytomir", 5).into_iter().map(|e| e.value).collect();
        assert_eq!(values, vec!["Zhytomyr".to_string()]);
    }

    #[test]
    fn test_closest_city() {
        let index = index();
        let (hits, degraded) = index.closest(Coordinate::new(49.9, 24.1), 1, 0);
        assert!(!degraded);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].value, "Lviv");
        assert_eq!(hits[0].population, 720_000);
    }

    #[test]
    fn test_registry_upsert() {
        let mut registry = CityRegistry::new();
        let (id, created) = registry.upsert(1.0, 2.0, |id| City::new(id, 0.0, 0.0).with_name("One", "latin"));
        assert!(created);
        let (again, created) = registry.upsert(1.0, 2.0, |id| City::new(id, 0.0, 0.0));
        assert!(!created);
        assert_eq!(id, again);

        registry.get_mut(1.0, 2.0).unwrap().population = Some(10);
        let cities = registry.into_cities();
        assert_eq!(cities.len(), 1);
        assert_eq!(cities[0].latitude, 1.0);
        assert_eq!(cities[0].population, Some(10));
    }
}
