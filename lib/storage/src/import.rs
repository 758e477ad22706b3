// Bulk CSV import of airports, airlines, routes and cities
use ahash::AHashMap;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use airroute_core::{
    haversine_distance, Airline, AirlineId, Airport, AirportId, City, CityName, CityRegistry, GraphStore, LocationKey,
    Route,
};

/// Cities and population records closer than this in both axes are the same place
const POPULATION_MATCH_DEGREES: f64 = 0.03;

/// Input files for a full import
#[derive(Debug, Clone)]
pub struct ImportSources {
    pub airports: PathBuf,
    pub airlines: PathBuf,
    pub routes: PathBuf,
    pub cities: PathBuf,
    pub populations: Option<PathBuf>,
    /// Read at most this many data rows from each limited file
    pub rows: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ImportReport {
    pub airports: usize,
    pub airlines: usize,
    pub routes: usize,
    pub routes_skipped: usize,
    pub cities: usize,
    pub city_names: usize,
    pub cities_with_population: usize,
    /// Rows that failed to parse
    pub rows_rejected: usize,
}

#[derive(Debug, Deserialize)]
struct AirportRow {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "City", default)]
    city: String,
    #[serde(rename = "Country", default)]
    country: String,
    #[serde(rename = "IATA/FAA", default)]
    iata_faa: String,
    #[serde(rename = "ICAO", default)]
    icao: String,
    #[serde(rename = "Latitude")]
    latitude: f64,
    #[serde(rename = "Longitude")]
    longitude: f64,
    #[serde(rename = "Altitude", default, deserialize_with = "csv::invalid_option")]
    altitude: Option<f64>,
    #[serde(rename = "Timezone", default, deserialize_with = "csv::invalid_option")]
    timezone: Option<f64>,
    #[serde(rename = "DST", default)]
    dst: String,
    #[serde(rename = "Tz database time zone", default)]
    tz_database_time_zone: String,
}

#[derive(Debug, Deserialize)]
struct AirlineRow {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Alias", default)]
    alias: String,
    #[serde(rename = "IATA", default)]
    iata: String,
    #[serde(rename = "ICAO", default)]
    icao: String,
    #[serde(rename = "Callsign", default)]
    callsign: String,
    #[serde(rename = "Country", default)]
    country: String,
    #[serde(rename = "Active", default)]
    active: String,
}

#[derive(Debug, Deserialize)]
struct RouteRow {
    #[serde(rename = "Airline", default)]
    airline: String,
    #[serde(rename = "Source airport", default)]
    source: String,
    #[serde(rename = "Destination airport", default)]
    destination: String,
    #[serde(rename = "Codeshare", default)]
    codeshare: String,
    #[serde(rename = "Equipment", default)]
    equipment: String,
}

#[derive(Debug, Deserialize)]
struct CityRow {
    #[serde(rename = " latitude")]
    latitude: f64,
    #[serde(rename = " longitude")]
    longitude: f64,
    #[serde(rename = " name")]
    name: String,
    #[serde(rename = "ISO 3166-1 country code", default)]
    country_code: String,
    #[serde(rename = " FIPS 5-2 subdivision code", default)]
    subdivision_code: String,
    #[serde(rename = " GNS FD", default)]
    gns_fd: String,
    #[serde(rename = " GNS UFI", default, deserialize_with = "csv::invalid_option")]
    gns_ufi: Option<i64>,
    #[serde(rename = " ISO 639-1 language code", default)]
    language_code: String,
    #[serde(rename = " language script", default)]
    language_script: String,
}

#[derive(Debug, Deserialize)]
struct PopulationRow {
    #[serde(rename = "City")]
    city: String,
    #[serde(rename = "Latitude")]
    latitude: f64,
    #[serde(rename = "Longitude")]
    longitude: f64,
    #[serde(rename = "Country", default)]
    country: String,
    #[serde(rename = "Population", default, deserialize_with = "csv::invalid_option")]
    population: Option<u64>,
}

/// OpenFlights writes `\N` for missing values
fn present(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value == "\\N" {
        None
    } else {
        Some(value.to_string())
    }
}

/// Deserialize up to `rows` records, logging and counting the ones that fail
fn read_rows<T, R>(reader: R, rows: Option<usize>, what: &str, rejected: &mut usize) -> Vec<T>
where
    T: for<'de> Deserialize<'de>,
    R: Read,
{
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut out = Vec::new();
    for (idx, record) in csv_reader.deserialize::<T>().take(rows.unwrap_or(usize::MAX)).enumerate() {
        match record {
            Ok(row) => out.push(row),
            Err(e) => {
                warn!("Rejected {} row {}: {}", what, idx + 1, e);
                *rejected += 1;
            }
        }
    }
    out
}

fn open(path: &Path) -> Result<File> {
    File::open(path).with_context(|| format!("opening {}", path.display()))
}

/// Airports get sequential ids in file order. Returns the number imported.
pub fn import_airports<R: Read>(reader: R, rows: Option<usize>, graph: &mut GraphStore, report: &mut ImportReport) -> usize {
    let mut next_id: AirportId = graph.airports().map(|a| a.id).max().unwrap_or(0) + 1;
    let mut imported = 0;
    for row in read_rows::<AirportRow, _>(reader, rows, "airport", &mut report.rows_rejected) {
        let mut airport = Airport::new(next_id, row.name, row.latitude, row.longitude)
            .with_location(row.city, row.country)
            .with_codes(present(&row.iata_faa), present(&row.icao));
        airport.altitude = row.altitude;
        airport.timezone = row.timezone;
        airport.dst = row.dst.trim().chars().next();
        airport.tz_database_time_zone = present(&row.tz_database_time_zone);

        if let Err(e) = graph.insert_airport(airport) {
            warn!("Skipping airport: {}", e);
            continue;
        }
        next_id += 1;
        imported += 1;
    }
    report.airports += imported;
    imported
}

/// Airlines are get-or-create by IATA code; rows without one always create.
pub fn import_airlines<R: Read>(reader: R, rows: Option<usize>, graph: &mut GraphStore, report: &mut ImportReport) -> usize {
    let mut imported = 0;
    for row in read_rows::<AirlineRow, _>(reader, rows, "airline", &mut report.rows_rejected) {
        let make = |id: AirlineId| Airline {
            id,
            name: row.name.clone(),
            alias: present(&row.alias).unwrap_or_default(),
            iata: String::new(),
            icao: present(&row.icao).unwrap_or_default(),
            callsign: present(&row.callsign).unwrap_or_default(),
            country: present(&row.country).unwrap_or_default(),
            active: row.active.trim() == "Y",
        };

        match present(&row.iata) {
            Some(iata) => {
                let (id, created) = graph.upsert_airline(&iata, make);
                if created {
                    imported += 1;
                } else {
                    debug!("Airline {} already imported as {}", iata, id);
                }
            }
            None => {
                graph.insert_airline(make(graph.next_airline_id()));
                imported += 1;
            }
        }
    }
    report.airlines += imported;
    imported
}

/// Routes are resolved by airline IATA and airport IATA/FAA codes.
///
/// Rows with a missing or unknown code are counted and skipped. Distance is
/// the haversine distance between the resolved airports.
pub fn import_routes<R: Read>(reader: R, rows: Option<usize>, graph: &mut GraphStore, report: &mut ImportReport) -> usize {
    let mut by_code: AHashMap<String, AirportId> = AHashMap::new();
    for airport in graph.airports() {
        if let Some(code) = &airport.iata_faa {
            by_code.entry(code.clone()).or_insert(airport.id);
        }
    }

    let mut imported = 0;
    for row in read_rows::<RouteRow, _>(reader, rows, "route", &mut report.rows_rejected) {
        let (airline, source, destination) = match (present(&row.airline), present(&row.source), present(&row.destination)) {
            (Some(a), Some(s), Some(d)) => (a, s, d),
            _ => {
                debug!("Incomplete route row: {:?}", row);
                report.routes_skipped += 1;
                continue;
            }
        };

        let Some(airline_id) = graph.airline_by_iata(&airline).map(|a| a.id) else {
            debug!("No airline {}", airline);
            report.routes_skipped += 1;
            continue;
        };
        let (Some(&source_id), Some(&destination_id)) = (by_code.get(&source), by_code.get(&destination)) else {
            debug!("No airport for route {} -> {}", source, destination);
            report.routes_skipped += 1;
            continue;
        };
        let Some(distance) = graph.expected_distance(source_id, destination_id) else {
            report.routes_skipped += 1;
            continue;
        };

        let route = Route::new(source_id, destination_id, distance)
            .with_airline(airline_id)
            .with_codeshare(row.codeshare.trim() == "Y")
            .with_equipment(row.equipment.trim());
        match graph.add_route(route) {
            Ok(()) => imported += 1,
            Err(e) => {
                warn!("Skipping route: {}", e);
                report.routes_skipped += 1;
            }
        }
    }
    graph.finish();

    if report.routes_skipped > 0 {
        info!("Skipped {} routes with unknown airline or airport", report.routes_skipped);
    }
    report.routes += imported;
    imported
}

struct PopulationRecord {
    order: usize,
    latitude: f64,
    longitude: f64,
    country_code: String,
    population: u64,
}

/// Population records keyed by the lowercase names of the city they matched
#[derive(Default)]
struct PopulationTable {
    by_name: AHashMap<String, Vec<PopulationRecord>>,
}

impl PopulationTable {
    /// Attach each population row to every name of a city with the same
    /// name within the match distance
    fn build(rows: Vec<PopulationRow>, names_at: &AHashMap<LocationKey, (f64, f64, Vec<String>)>) -> Self {
        let mut locations_by_name: AHashMap<&str, Vec<&(f64, f64, Vec<String>)>> = AHashMap::new();
        for entry in names_at.values() {
            for name in &entry.2 {
                locations_by_name.entry(name.as_str()).or_default().push(entry);
            }
        }

        let mut table = Self::default();
        for (order, row) in rows.into_iter().enumerate() {
            let Some(population) = row.population else { continue };
            let Some(candidates) = locations_by_name.get(row.city.to_lowercase().as_str()) else {
                continue;
            };
            for (lat, lng, names) in candidates.iter().map(|e| (e.0, e.1, &e.2)) {
                if (lat - row.latitude).abs() < POPULATION_MATCH_DEGREES
                    && (lng - row.longitude).abs() < POPULATION_MATCH_DEGREES
                {
                    for name in names {
                        table.by_name.entry(name.clone()).or_default().push(PopulationRecord {
                            order,
                            latitude: row.latitude,
                            longitude: row.longitude,
                            country_code: row.country.to_uppercase(),
                            population,
                        });
                    }
                }
            }
        }
        table
    }

    /// Earliest matching record for a city name, country and location
    fn lookup(&self, name: &str, country_code: &str, latitude: f64, longitude: f64) -> Option<u64> {
        let country_code = country_code.to_uppercase();
        self.by_name
            .get(&name.to_lowercase())?
            .iter()
            .filter(|p| {
                p.country_code == country_code
                    && (p.latitude - latitude).abs() < POPULATION_MATCH_DEGREES
                    && (p.longitude - longitude).abs() < POPULATION_MATCH_DEGREES
            })
            .min_by_key(|p| p.order)
            .map(|p| p.population)
    }
}

/// Cities are unique by location; every row adds a localized name.
///
/// Returns the city list with ids assigned in file order.
pub fn import_cities<R: Read, P: Read>(
    cities: R,
    populations: Option<P>,
    rows: Option<usize>,
    report: &mut ImportReport,
) -> Vec<City> {
    let city_rows = read_rows::<CityRow, _>(cities, rows, "city", &mut report.rows_rejected);

    let mut names_at: AHashMap<LocationKey, (f64, f64, Vec<String>)> = AHashMap::new();
    for row in &city_rows {
        names_at
            .entry(LocationKey::new(row.latitude, row.longitude))
            .or_insert_with(|| (row.latitude, row.longitude, Vec::new()))
            .2
            .push(row.name.to_lowercase());
    }

    let table = match populations {
        Some(reader) => {
            let rows = read_rows::<PopulationRow, _>(reader, rows, "population", &mut report.rows_rejected);
            PopulationTable::build(rows, &names_at)
        }
        None => PopulationTable::default(),
    };

    let mut registry = CityRegistry::new();
    for row in city_rows {
        let (id, created) = registry.upsert(row.latitude, row.longitude, |id| {
            let mut city = City::new(id, row.latitude, row.longitude);
            city.country_code = row.country_code.trim().to_string();
            city.subdivision_code = row.subdivision_code.trim().to_string();
            city.gns_fd = row.gns_fd.trim().to_string();
            city.gns_ufi = row.gns_ufi.unwrap_or(0);
            city.language_code = row.language_code.trim().to_string();
            city.population = table.lookup(&row.name, &row.country_code, row.latitude, row.longitude);
            city
        });
        if let Some(city) = registry.get_mut(row.latitude, row.longitude) {
            if created && city.population.is_some() {
                report.cities_with_population += 1;
            }
            city.names.push(CityName::new(row.name.trim(), row.language_script.trim(), id));
            report.city_names += 1;
        }
    }

    report.cities += registry.len();
    registry.into_cities()
}

/// Run a full import from files into a fresh graph and city list
pub fn import_all(sources: &ImportSources) -> Result<(GraphStore, Vec<City>, ImportReport)> {
    let mut report = ImportReport::default();
    let mut graph = GraphStore::new();

    let n = import_airports(open(&sources.airports)?, None, &mut graph, &mut report);
    info!("Imported {} airports from {}", n, sources.airports.display());
    let n = import_airlines(open(&sources.airlines)?, sources.rows, &mut graph, &mut report);
    info!("Imported {} airlines from {}", n, sources.airlines.display());
    let n = import_routes(open(&sources.routes)?, None, &mut graph, &mut report);
    info!("Imported {} routes from {}", n, sources.routes.display());

    let populations = sources.populations.as_deref().map(open).transpose()?;
    let cities = import_cities(open(&sources.cities)?, populations, sources.rows, &mut report);
    info!(
        "Imported {} cities ({} names) from {}",
        cities.len(),
        report.city_names,
        sources.cities.display()
    );

    Ok((graph, cities, report))
}

/// Distance a route between two coordinates would get on import
#[inline]
pub fn route_distance(source: &Airport, destination: &Airport) -> f64 {
    haversine_distance(source.latitude, source.longitude, destination.latitude, destination.longitude)
}
