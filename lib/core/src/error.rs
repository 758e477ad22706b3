use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Airport not found: {0}")]
    AirportNotFound(u64),

    #[error("Airline not found: {0}")]
    AirlineNotFound(u64),

    #[error("Airport already exists: {0}")]
    AirportExists(u64),

    #[error("Route {source_id} -> {destination} references a missing airport")]
    DanglingRoute { source_id: u64, destination: u64 },

    #[error("Invalid route distance {distance} for {source_id} -> {destination}")]
    InvalidDistance { source_id: u64, destination: u64, distance: f64 },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Proximity backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
