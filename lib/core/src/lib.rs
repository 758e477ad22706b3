//! # airroute Core
//!
//! Core library for the airroute flight-route service.
//!
//! This crate provides the in-memory data structures and query algorithms:
//!
//! - [`GraphStore`] - Airports and directed airline routes
//! - [`GeoIndex`] - Nearest-neighbour search by haversine distance
//! - [`PathFinder`] - Bounded multi-hop route enumeration
//! - [`ResultAggregator`] - Response shapes for paths and proximity hits
//! - [`PlaceIndex`] - City proximity, bounding-box and name search
//!
//! ## Example
//!
//! ```rust
//! use airroute_core::{Airport, GraphStore, PathQuery, PathFinder};
//!
//! let mut graph = GraphStore::new();
//! graph.insert_airport(Airport::new(1, "Boryspil", 50.345, 30.894722)).unwrap();
//! graph.insert_airport(Airport::new(2, "Chopin", 52.165833, 20.967222)).unwrap();
//! graph.connect(1, 2).unwrap();
//!
//! let groups = PathFinder::new(&graph).find(&PathQuery::new(1, 2));
//! assert_eq!(groups[&0].len(), 1);
//! ```

pub mod error;
pub mod geo;
pub mod airport;
pub mod route;
pub mod city;
pub mod graph;
pub mod geo_index;
pub mod path;
pub mod aggregate;
pub mod places;
pub mod cache;
pub mod config;

pub use error::{Error, Result};
pub use geo::{haversine_distance, BoundingBox, Coordinate, EARTH_RADIUS_KM};
pub use airport::{Airline, AirlineId, Airport, AirportId};
pub use route::Route;
pub use city::{City, CityId, CityName, LocationKey};
pub use graph::{GraphStore, RouteGraph};
pub use geo_index::{normalize_limit, GeoEntry, GeoIndex, LinearScan, Neighbor, Proximity, ProximitySource, SphereIndex};
pub use path::{find_paths, group_by_stops, FoundPath, PathFinder, PathGroups, PathQuery};
pub use aggregate::{
    AirportHit, AirportsResponse, AutocompleteEntry, CityHit, CityList, ResultAggregator, RoutesResponse,
    Suggestions,
};
pub use places::{CityRegistry, PlaceIndex};
pub use cache::{cache_key, read_through, MemoryCache, NoCache, QueryCache};
pub use config::QueryConfig;
