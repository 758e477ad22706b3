//! # airroute
//!
//! Closest-airport lookup and bounded multi-hop flight route search.
//!
//! airroute keeps an airline route network in memory and answers three
//! kinds of questions: which airports (and city) are nearest to a point,
//! which itineraries connect two airports within a hop limit, and which
//! cities match a name prefix or lie inside a map viewport.
//!
//! ## Quick Start
//!
//! ### As a Server
//!
//! ```bash
//! airroute import --airports airports.csv --airlines airlines.csv \
//!     --routes routes.csv --cities worldcities.csv
//! airroute serve --http-port 5000
//! ```
//!
//! ### As a Library
//!
//! ```rust
//! use airroute::prelude::*;
//!
//! let graph = GraphStore::from_parts(
//!     vec![
//!         Airport::new(1, "Boryspil", 50.345, 30.894722),
//!         Airport::new(2, "Chopin", 52.165833, 20.967222),
//!         Airport::new(3, "Lviv", 49.8125, 23.956111),
//!     ],
//!     vec![],
//!     vec![Route::new(1, 3, 467.0), Route::new(3, 2, 320.0), Route::new(1, 2, 690.0)],
//! );
//!
//! let groups = PathFinder::new(&graph).find(&PathQuery::new(1, 2));
//! let response = ResultAggregator::new(&graph).routes(&groups);
//! assert_eq!(response.routes["0"][0].total_distance, 690.0);
//! assert_eq!(response.routes["1"][0].total_distance, 787.0);
//! ```
//!
//! ## Crate Structure
//!
//! - `airroute-core` - Graph store, geo-index, path finder, result aggregator, city search
//! - `airroute-storage` - CSV import and compressed snapshots
//! - `airroute-api` - REST endpoints

// Re-export core types
pub use airroute_core::{
    Airline, Airport, City, Coordinate, GeoIndex, GraphStore, PathFinder, PathQuery, PlaceIndex, QueryConfig,
    ResultAggregator, Route, RouteGraph,
    Error, Result,
};

// Re-export storage
pub use airroute_storage::{Dataset, ImportSources, StorageManager};

// Re-export API
pub use airroute_api::{AppState, RestApi};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Airline, Airport, City, Coordinate, GeoIndex, GraphStore, PathFinder, PathQuery, PlaceIndex, QueryConfig,
        ResultAggregator, Route, RouteGraph,
        Error, Result,
        Dataset, StorageManager,
        RestApi, AppState,
    };
}
