use serde::Serialize;
use tracing::info;
use airroute_core::places::DEFAULT_FUZZY_THRESHOLD;
use airroute_core::{City, GeoIndex, GraphStore, PlaceIndex, RouteGraph};
use crate::snapshot::SnapshotData;

/// Read-only query state: route graph, airport proximity index and city search
pub struct Dataset {
    pub graph: GraphStore,
    pub airport_index: GeoIndex,
    pub places: PlaceIndex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DatasetStats {
    pub airports: usize,
    pub airlines: usize,
    pub routes: usize,
    pub cities: usize,
}

impl Dataset {
    pub fn new(graph: GraphStore, cities: Vec<City>) -> Self {
        Self::with_fuzzy_threshold(graph, cities, DEFAULT_FUZZY_THRESHOLD)
    }

    pub fn with_fuzzy_threshold(graph: GraphStore, cities: Vec<City>, fuzzy_threshold: f64) -> Self {
        let airport_index = GeoIndex::from_points(graph.airports().map(|a| (a.id, a.coordinate())));
        let places = PlaceIndex::new(cities).with_fuzzy_threshold(fuzzy_threshold);
        let dataset = Self {
            graph,
            airport_index,
            places,
        };
        let stats = dataset.stats();
        info!(
            "Dataset ready: {} airports, {} airlines, {} routes, {} cities",
            stats.airports, stats.airlines, stats.routes, stats.cities
        );
        dataset
    }

    pub fn empty() -> Self {
        Self {
            graph: GraphStore::new(),
            airport_index: GeoIndex::new(Vec::new()),
            places: PlaceIndex::new(Vec::new()),
        }
    }

    pub fn from_snapshot(data: SnapshotData, fuzzy_threshold: f64) -> Self {
        let graph = GraphStore::from_parts(data.airports, data.airlines, data.routes);
        Self::with_fuzzy_threshold(graph, data.cities, fuzzy_threshold)
    }

    pub fn to_snapshot(&self) -> SnapshotData {
        let mut routes: Vec<_> = self.graph.airports().flat_map(|a| self.graph.get_outgoing_edges(a.id)).cloned().collect();
        // Routes whose source is unknown are not reachable through airports()
        if routes.len() < self.graph.route_count() {
            let known: ahash::AHashSet<_> = self.graph.airports().map(|a| a.id).collect();
            let mut orphans: Vec<_> = self.graph.routes().filter(|r| !known.contains(&r.source)).cloned().collect();
            orphans.sort_by_key(|r| (r.source, r.destination));
            routes.extend(orphans);
        }

        SnapshotData {
            airports: self.graph.airports().cloned().collect(),
            airlines: self.graph.airlines().into_iter().cloned().collect(),
            routes,
            cities: self.places.cities().to_vec(),
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn stats(&self) -> DatasetStats {
        DatasetStats {
            airports: self.graph.airport_count(),
            airlines: self.graph.airline_count(),
            routes: self.graph.route_count(),
            cities: self.places.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.graph.airport_count() == 0 && self.places.is_empty()
    }
}
