// Caller-facing result shapes built from raw path and proximity output
use std::collections::BTreeMap;
use serde::Serialize;
use tracing::warn;
use crate::airport::{Airport, AirportId};
use crate::city::City;
use crate::geo_index::Proximity;
use crate::graph::RouteGraph;
use crate::path::PathGroups;

/// Display attributes of one airport on a path
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeView {
    pub id: AirportId,
    pub airport_name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl From<&Airport> for NodeView {
    fn from(airport: &Airport) -> Self {
        Self {
            id: airport.id,
            airport_name: airport.name.clone(),
            latitude: airport.latitude,
            longitude: airport.longitude,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathView {
    pub nodes: Vec<NodeView>,
    pub total_distance: f64,
}

/// `{"routes": {"0": [...], "1": [...]}}`, keyed by intermediate stop count
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RoutesResponse {
    pub routes: BTreeMap<String, Vec<PathView>>,
}

/// An airport together with its distance from the query point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AirportHit {
    #[serde(flatten)]
    pub airport: Airport,
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// A city near the query point, with its display name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityHit {
    pub id: u64,
    pub country_code: String,
    pub data: LatLng,
    pub population: u64,
    pub value: String,
    pub distance: f64,
}

impl CityHit {
    pub fn new(city: &City, distance: f64) -> Self {
        Self {
            id: city.id,
            country_code: city.country_code.clone(),
            data: LatLng {
                lat: city.latitude,
                lng: city.longitude,
            },
            population: city.population.unwrap_or(0),
            value: city.primary_name().to_string(),
            distance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AirportsResponse {
    List {
        json_list: Vec<AirportHit>,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        degraded: bool,
    },
    WithCity {
        airports: Vec<AirportHit>,
        closest_city: Option<CityHit>,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        degraded: bool,
    },
}

/// Autocomplete entry: `{"value": name, "data": {id, lat, lng, country_code}}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutocompleteEntry {
    pub value: String,
    pub data: AutocompleteData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutocompleteData {
    pub id: u64,
    pub lat: f64,
    pub lng: f64,
    pub country_code: String,
}

impl AutocompleteEntry {
    pub fn new(name: &str, city: &City) -> Self {
        Self {
            value: name.to_string(),
            data: AutocompleteData {
                id: city.id,
                lat: city.latitude,
                lng: city.longitude,
                country_code: city.country_code.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Suggestions {
    pub suggestions: Vec<AutocompleteEntry>,
}

/// `{"json_list": [city.serialize(), ...]}`
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CityList {
    pub json_list: Vec<serde_json::Value>,
}

/// Pure transformation from raw results into response shapes.
///
/// Only looks airports up in the graph; never traverses it.
pub struct ResultAggregator<'g, G: RouteGraph> {
    graph: &'g G,
}

impl<'g, G: RouteGraph> ResultAggregator<'g, G> {
    #[inline]
    pub fn new(graph: &'g G) -> Self {
        Self { graph }
    }

    pub fn routes(&self, groups: &PathGroups) -> RoutesResponse {
        let mut routes = BTreeMap::new();
        for (stops, paths) in groups {
            let views: Vec<PathView> = paths
                .iter()
                .filter_map(|path| {
                    let nodes: Option<Vec<NodeView>> = path
                        .nodes
                        .iter()
                        .map(|id| self.graph.get_node(*id).map(NodeView::from))
                        .collect();
                    match nodes {
                        Some(nodes) => Some(PathView {
                            nodes,
                            total_distance: path.total_distance,
                        }),
                        None => {
                            warn!("Dropping path {:?}: airport missing from graph", path.nodes);
                            None
                        }
                    }
                })
                .collect();
            if !views.is_empty() {
                routes.insert(stops.to_string(), views);
            }
        }
        RoutesResponse { routes }
    }

    /// Attach airport records to proximity hits, dropping ids the graph no longer knows
    pub fn airports(&self, proximity: &Proximity) -> Vec<AirportHit> {
        proximity
            .items
            .iter()
            .filter_map(|hit| {
                self.graph.get_node(hit.id).map(|airport| AirportHit {
                    airport: airport.clone(),
                    distance: hit.distance,
                })
            })
            .collect()
    }

    pub fn airport_list(&self, proximity: &Proximity) -> AirportsResponse {
        AirportsResponse::List {
            json_list: self.airports(proximity),
            degraded: proximity.degraded,
        }
    }

    pub fn airports_with_city(
        &self,
        proximity: &Proximity,
        closest_city: Option<CityHit>,
        city_degraded: bool,
    ) -> AirportsResponse {
        AirportsResponse::WithCity {
            airports: self.airports(proximity),
            closest_city,
            degraded: proximity.degraded || city_degraded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_index::Neighbor;
    use crate::path::find_paths;
    use crate::{GraphStore, Route};

    fn graph() -> GraphStore {
        GraphStore::from_parts(
            vec![
                Airport::new(1, "Alpha", 10.0, 20.0),
                Airport::new(2, "Bravo", 11.0, 21.0),
                Airport::new(3, "Charlie", 12.0, 22.0),
            ],
            vec![],
            vec![Route::new(1, 2, 500.0), Route::new(2, 3, 300.0), Route::new(1, 3, 900.0)],
        )
    }

    #[test]
    fn test_routes_shape() {
        let graph = graph();
        let groups = find_paths(&graph, 1, 3, 2, 10);
        let response = ResultAggregator::new(&graph).routes(&groups);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["routes"]["0"][0]["total_distance"], 900.0);
        assert_eq!(json["routes"]["0"][0]["nodes"][1]["airport_name"], "Charlie");
        assert_eq!(json["routes"]["1"][0]["total_distance"], 800.0);
        assert_eq!(json["routes"]["1"][0]["nodes"][1]["latitude"], 11.0);
        assert_eq!(json["routes"]["1"][0]["nodes"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_empty_groups_serialize_empty() {
        let graph = graph();
        let response = ResultAggregator::new(&graph).routes(&PathGroups::new());
        assert_eq!(serde_json::to_value(&response).unwrap(), serde_json::json!({"routes": {}}));
    }

    #[test]
    fn test_airport_list_drops_unknown_ids() {
        let graph = graph();
        let proximity = Proximity {
            items: vec![
                Neighbor { id: 2, distance: 1.5 },
                Neighbor { id: 77, distance: 2.0 },
            ],
            degraded: false,
        };
        let json = serde_json::to_value(ResultAggregator::new(&graph).airport_list(&proximity)).unwrap();
        let list = json["json_list"].as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["name"], "Bravo");
        assert_eq!(list[0]["distance"], 1.5);
        assert!(json.get("degraded").is_none());
    }

    #[test]
    fn test_with_city_shape() {
        let graph = graph();
        let city = City::new(5, 10.5, 20.5).with_country("XX").with_name("Middle", "latin");
        let proximity = Proximity { items: vec![], degraded: true };
        let response = ResultAggregator::new(&graph).airports_with_city(
            &proximity,
            Some(CityHit::new(&city, 3.25)),
            false,
        );
        let json = serde_json::to_value(response).unwrap();
        assert_eq!(json["closest_city"]["value"], "Middle");
        assert_eq!(json["closest_city"]["data"]["lng"], 20.5);
        assert_eq!(json["degraded"], true);
        assert_eq!(json["airports"], serde_json::json!([]));
    }
}
