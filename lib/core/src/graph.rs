// Route graph: airports as nodes, airline routes as directed weighted edges
use ahash::AHashMap;
use tracing::{debug, warn};
use crate::airport::{Airline, AirlineId, Airport, AirportId};
use crate::geo::{haversine_distance, Coordinate};
use crate::route::Route;
use crate::{Error, Result};

/// Tolerance used when checking a stored route distance against its endpoints
pub const DISTANCE_TOLERANCE_KM: f64 = 1e-6;

/// Read access the path finder and aggregator need from a graph
pub trait RouteGraph {
    fn get_node(&self, id: AirportId) -> Option<&Airport>;

    /// Outgoing routes of `id`; empty for unknown airports
    fn get_outgoing_edges(&self, id: AirportId) -> &[Route];

    fn get_node_coordinates(&self, id: AirportId) -> Option<Coordinate> {
        self.get_node(id).map(Airport::coordinate)
    }
}

/// In-memory adjacency-list graph store.
///
/// Populated once by a bulk import and read-only afterwards.
#[derive(Debug, Default, Clone)]
pub struct GraphStore {
    airports: AHashMap<AirportId, Airport>,
    airport_order: Vec<AirportId>,
    airlines: AHashMap<AirlineId, Airline>,
    airlines_by_iata: AHashMap<String, AirlineId>,
    outgoing: AHashMap<AirportId, Vec<Route>>,
    route_count: usize,
    next_airline_id: AirlineId,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk load from already-imported parts.
    ///
    /// Routes are accepted as given; one whose endpoint is missing stays in
    /// the adjacency list and is skipped at query time.
    pub fn from_parts(airports: Vec<Airport>, airlines: Vec<Airline>, routes: Vec<Route>) -> Self {
        let mut store = Self::new();
        for airport in airports {
            if let Err(e) = store.insert_airport(airport) {
                warn!("Skipping airport during bulk load: {}", e);
            }
        }
        for airline in airlines {
            store.insert_airline(airline);
        }

        let mut dangling = 0usize;
        for route in routes {
            if !store.airports.contains_key(&route.source)
                || !store.airports.contains_key(&route.destination)
            {
                dangling += 1;
            }
            store.push_route(route);
        }
        if dangling > 0 {
            warn!("Loaded {} routes referencing missing airports", dangling);
        }

        store.finish();
        store
    }

    pub fn insert_airport(&mut self, airport: Airport) -> Result<()> {
        if self.airports.contains_key(&airport.id) {
            return Err(Error::AirportExists(airport.id));
        }
        self.airport_order.push(airport.id);
        self.airports.insert(airport.id, airport);
        Ok(())
    }

    /// Insert or replace an airline
    pub fn insert_airline(&mut self, airline: Airline) {
        if !airline.iata.is_empty() {
            self.airlines_by_iata
                .entry(airline.iata.clone())
                .or_insert(airline.id);
        }
        self.next_airline_id = self.next_airline_id.max(airline.id + 1);
        self.airlines.insert(airline.id, airline);
    }

    /// Get-or-create an airline keyed by IATA code.
    ///
    /// Returns the airline id and whether it was created by this call.
    pub fn upsert_airline<F>(&mut self, iata: &str, make: F) -> (AirlineId, bool)
    where
        F: FnOnce(AirlineId) -> Airline,
    {
        if let Some(&id) = self.airlines_by_iata.get(iata) {
            return (id, false);
        }
        let id = self.next_airline_id();
        let mut airline = make(id);
        airline.id = id;
        airline.iata = iata.to_string();
        self.insert_airline(airline);
        (id, true)
    }

    /// Smallest unused airline id, starting at 1
    #[inline]
    pub fn next_airline_id(&self) -> AirlineId {
        self.next_airline_id.max(1)
    }

    /// Add a route, enforcing the edge invariants
    pub fn add_route(&mut self, route: Route) -> Result<()> {
        let (source, destination) = match (
            self.airports.get(&route.source),
            self.airports.get(&route.destination),
        ) {
            (Some(s), Some(d)) => (s, d),
            _ => {
                return Err(Error::DanglingRoute {
                    source_id: route.source,
                    destination: route.destination,
                })
            }
        };
        if !route.distance.is_finite() || route.distance < 0.0 {
            return Err(Error::InvalidDistance {
                source_id: route.source,
                destination: route.destination,
                distance: route.distance,
            });
        }

        let expected = source.coordinate().distance_to(&destination.coordinate());
        if (expected - route.distance).abs() > DISTANCE_TOLERANCE_KM {
            debug!(
                "Route {} -> {} distance {} differs from haversine {}",
                route.source, route.destination, route.distance, expected
            );
        }

        self.push_route(route);
        Ok(())
    }

    /// Add a route with its distance computed from the endpoint coordinates
    pub fn connect(&mut self, source: AirportId, destination: AirportId) -> Result<&Route> {
        let distance = self
            .expected_distance(source, destination)
            .ok_or(Error::DanglingRoute {
                source_id: source,
                destination,
            })?;
        self.add_route(Route::new(source, destination, distance))?;
        self.finish_node(source);
        self.outgoing
            .get(&source)
            .and_then(|edges| edges.iter().find(|r| r.destination == destination))
            .ok_or(Error::AirportNotFound(source))
    }

    fn push_route(&mut self, route: Route) {
        self.route_count += 1;
        self.outgoing.entry(route.source).or_default().push(route);
    }

    fn finish_node(&mut self, id: AirportId) {
        if let Some(edges) = self.outgoing.get_mut(&id) {
            sort_edges(edges);
        }
    }

    /// Put adjacency lists and airport iteration into a stable order.
    ///
    /// Call after incremental `add_route` calls; `from_parts` does it itself.
    pub fn finish(&mut self) {
        self.airport_order.sort_unstable();
        for edges in self.outgoing.values_mut() {
            sort_edges(edges);
        }
    }

    /// Haversine distance between two stored airports
    pub fn expected_distance(&self, source: AirportId, destination: AirportId) -> Option<f64> {
        let s = self.airports.get(&source)?;
        let d = self.airports.get(&destination)?;
        Some(haversine_distance(s.latitude, s.longitude, d.latitude, d.longitude))
    }

    /// Routes whose stored distance disagrees with the endpoint coordinates
    pub fn inconsistent_routes(&self, tolerance_km: f64) -> Vec<&Route> {
        let mut bad: Vec<&Route> = self
            .routes()
            .filter(|route| match self.expected_distance(route.source, route.destination) {
                Some(expected) => (expected - route.distance).abs() > tolerance_km,
                None => true,
            })
            .collect();
        bad.sort_by_key(|r| (r.source, r.destination));
        bad
    }

    #[inline]
    pub fn airport_count(&self) -> usize {
        self.airports.len()
    }

    #[inline]
    pub fn route_count(&self) -> usize {
        self.route_count
    }

    #[inline]
    pub fn airline_count(&self) -> usize {
        self.airlines.len()
    }

    /// Airports in id order
    pub fn airports(&self) -> impl Iterator<Item = &Airport> + '_ {
        self.airport_order.iter().filter_map(|id| self.airports.get(id))
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route> + '_ {
        self.outgoing.values().flatten()
    }

    #[inline]
    pub fn airline(&self, id: AirlineId) -> Option<&Airline> {
        self.airlines.get(&id)
    }

    #[inline]
    pub fn airline_by_iata(&self, iata: &str) -> Option<&Airline> {
        self.airlines_by_iata.get(iata).and_then(|id| self.airlines.get(id))
    }

    /// Airlines in id order
    pub fn airlines(&self) -> Vec<&Airline> {
        let mut airlines: Vec<&Airline> = self.airlines.values().collect();
        airlines.sort_by_key(|a| a.id);
        airlines
    }

    /// Decompose into owned parts, airports and airlines in id order
    pub fn into_parts(self) -> (Vec<Airport>, Vec<Airline>, Vec<Route>) {
        let mut airports = self.airports;
        let airport_list = self
            .airport_order
            .iter()
            .filter_map(|id| airports.remove(id))
            .collect();

        let mut airlines: Vec<Airline> = self.airlines.into_values().collect();
        airlines.sort_by_key(|a| a.id);

        let mut sources: Vec<(AirportId, Vec<Route>)> = self.outgoing.into_iter().collect();
        sources.sort_by_key(|(id, _)| *id);
        let routes = sources.into_iter().flat_map(|(_, edges)| edges).collect();

        (airport_list, airlines, routes)
    }
}

fn sort_edges(edges: &mut [Route]) {
    edges.sort_by(|a, b| {
        a.destination
            .cmp(&b.destination)
            .then(a.distance.total_cmp(&b.distance))
            .then(a.airline.cmp(&b.airline))
    });
}

impl RouteGraph for GraphStore {
    #[inline]
    fn get_node(&self, id: AirportId) -> Option<&Airport> {
        self.airports.get(&id)
    }

    #[inline]
    fn get_outgoing_edges(&self, id: AirportId) -> &[Route] {
        self.outgoing.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> GraphStore {
        let mut store = GraphStore::new();
        store.insert_airport(Airport::new(1, "Boryspil", 50.345, 30.894722)).unwrap();
        store.insert_airport(Airport::new(2, "Chopin", 52.165833, 20.967222)).unwrap();
        store
    }

    #[test]
    fn test_add_route_rejects_dangling_endpoint() {
        let mut store = store();
        let err = store.add_route(Route::new(1, 99, 10.0)).unwrap_err();
        assert!(matches!(err, Error::DanglingRoute { destination: 99, .. }));
        assert_eq!(store.route_count(), 0);
    }

    #[test]
    fn test_add_route_rejects_negative_distance() {
        let mut store = store();
        assert!(matches!(
            store.add_route(Route::new(1, 2, -1.0)),
            Err(Error::InvalidDistance { .. })
        ));
        assert!(store.add_route(Route::new(1, 2, f64::NAN)).is_err());
    }

    #[test]
    fn test_connect_computes_haversine() {
        let mut store = store();
        let distance = store.connect(1, 2).unwrap().distance;
        assert!((distance - store.expected_distance(1, 2).unwrap()).abs() < 1e-12);
        assert_eq!(store.get_outgoing_edges(1).len(), 1);
        assert_eq!(store.get_node_coordinates(2), Some(Coordinate::new(52.165833, 20.967222)));
        assert_eq!(store.get_node_coordinates(7), None);
        assert!(store.get_outgoing_edges(2).is_empty());
        assert!(store.inconsistent_routes(DISTANCE_TOLERANCE_KM).is_empty());
    }

    #[test]
    fn test_duplicate_airport() {
        let mut store = store();
        assert!(matches!(
            store.insert_airport(Airport::new(1, "Again", 0.0, 0.0)),
            Err(Error::AirportExists(1))
        ));
    }

    #[test]
    fn test_upsert_airline_is_idempotent() {
        let mut store = store();
        let (first, created) = store.upsert_airline("PS", |id| Airline::new(id, "Ukraine International", ""));
        assert!(created);
        let (second, created) = store.upsert_airline("PS", |id| Airline::new(id, "Other", ""));
        assert!(!created);
        assert_eq!(first, second);
        assert_eq!(store.airline_by_iata("PS").unwrap().name, "Ukraine International");
    }

    #[test]
    fn test_from_parts_keeps_dangling_routes() {
        let store = GraphStore::from_parts(
            vec![Airport::new(2, "B", 1.0, 1.0), Airport::new(1, "A", 0.0, 0.0)],
            vec![],
            vec![Route::new(1, 2, 157.0), Route::new(1, 3, 10.0)],
        );
        assert_eq!(store.route_count(), 2);
        assert_eq!(store.airports().map(|a| a.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(store.inconsistent_routes(1.0).len(), 1);

        let (airports, _, routes) = store.into_parts();
        assert_eq!(airports.len(), 2);
        assert_eq!(routes.len(), 2);
    }
}
