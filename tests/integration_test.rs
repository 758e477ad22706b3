// Integration tests for airroute
use airroute_core::{
    find_paths, haversine_distance, Airport, Coordinate, GeoIndex, GraphStore, PathFinder, PathQuery,
    ResultAggregator, Route, RouteGraph,
};
use airroute_storage::{ImportSources, StorageManager};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const AIRPORTS: &str = "\
Name,City,Country,IATA/FAA,ICAO,Latitude,Longitude,Altitude,Timezone,DST,Tz database time zone
Boryspil Intl,Kiev,Ukraine,KBP,UKBB,50.345,30.894722,427,2,E,Europe/Kiev
Chopin,Warsaw,Poland,WAW,EPWA,52.165833,20.967222,362,1,E,Europe/Warsaw
Lviv,Lviv,Ukraine,LWO,UKLL,49.8125,23.956111,1071,2,E,Europe/Kiev
Schiphol,Amsterdam,Netherlands,AMS,EHAM,52.308613,4.763889,-11,1,E,Europe/Amsterdam
";

const AIRLINES: &str = "\
Name,Alias,IATA,ICAO,Callsign,Country,Active
Ukraine International Airlines,\\N,PS,AUI,UKRAINE INTERNATIONAL,Ukraine,Y
LOT Polish Airlines,\\N,LO,LOT,POLLOT,Poland,Y
KLM Royal Dutch Airlines,\\N,KL,KLM,KLM,Netherlands,Y
";

const ROUTES: &str = "\
Airline,Airline ID,Source airport,Source airport ID,Destination airport,Destination airport ID,Codeshare,Stops,Equipment
PS,1,KBP,1,WAW,2,,0,738
PS,1,KBP,1,LWO,3,,0,E90
LO,2,LWO,3,WAW,2,,0,E70
LO,2,WAW,2,AMS,4,,0,E75
KL,3,KBP,1,AMS,4,Y,0,73H
ZZ,9,KBP,1,AMS,4,,0,73H
";

const CITIES: &str = "\
ISO 3166-1 country code, FIPS 5-2 subdivision code, GNS FD, GNS UFI, ISO 639-1 language code, language script, name, latitude, longitude
UA,12,PPLC,-1044367,uk,latin,Kyiv,50.45466,30.5238
UA,12,PPLC,-1044367,en,latin,Kiev,50.45466,30.5238
PL,78,PPLC,-534433,pl,latin,Warszawa,52.22977,21.01178
NL,07,PPLC,-2754061,nl,latin,Amsterdam,52.37403,4.88969
";

const POPULATIONS: &str = "\
City,Latitude,Longitude,Country,Population
kiev,50.4333,30.5167,ua,2514227
warszawa,52.25,21.0,pl,1702139
";

fn write_sources(dir: &Path) -> ImportSources {
    let write = |name: &str, body: &str| {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    };
    ImportSources {
        airports: write("airports.csv", AIRPORTS),
        airlines: write("airlines.csv", AIRLINES),
        routes: write("routes.csv", ROUTES),
        cities: write("worldcities.csv", CITIES),
        populations: Some(write("cities-populations.csv", POPULATIONS)),
        rows: None,
    }
}

#[test]
fn test_haversine_reference_distance() {
    let distance = haversine_distance(50.433333, 30.516667, 52.25, 21.0);
    assert!((distance - 690.616317346638).abs() < 1e-9);
    assert_eq!(haversine_distance(10.0, 20.0, 10.0, 20.0), 0.0);
}

#[test]
fn test_triangle_paths() {
    let graph = GraphStore::from_parts(
        vec![
            Airport::new(1, "A", 0.0, 0.0),
            Airport::new(2, "B", 0.0, 1.0),
            Airport::new(3, "C", 0.0, 2.0),
        ],
        vec![],
        vec![Route::new(1, 2, 500.0), Route::new(2, 3, 300.0), Route::new(1, 3, 900.0)],
    );
    let groups = find_paths(&graph, 1, 3, 2, 10);
    assert_eq!(groups[&0][0].total_distance, 900.0);
    assert_eq!(groups[&1][0].total_distance, 800.0);
    assert_eq!(groups[&1][0].nodes.as_slice(), &[1, 2, 3]);

    assert!(find_paths(&graph, 1, 1, 3, 10).is_empty());
    assert!(find_paths(&graph, 1, 3, 0, 10).is_empty());
    assert!(find_paths(&graph, 1, 42, 3, 10).is_empty());
}

#[test]
fn test_paths_are_simple_and_sum_legs() {
    let mut graph = GraphStore::new();
    for i in 1..=6u64 {
        graph.insert_airport(Airport::new(i, format!("Airport {}", i), i as f64, (i * 2) as f64)).unwrap();
    }
    for a in 1..=6u64 {
        for b in 1..=6u64 {
            if a != b {
                graph.connect(a, b).unwrap();
            }
        }
    }
    graph.finish();

    let query = PathQuery::new(1, 6).max_hops(3).limit(1000);
    let paths = PathFinder::new(&graph).ranked(&query);
    // 1 direct + 4 one-stop + 4*3 two-stop
    assert_eq!(paths.len(), 17);
    for path in &paths {
        let unique: HashSet<_> = path.nodes.iter().collect();
        assert_eq!(unique.len(), path.nodes.len());
        assert!(path.hops() <= 3);
        let sum: f64 = path
            .nodes
            .windows(2)
            .map(|w| graph.expected_distance(w[0], w[1]).unwrap())
            .sum();
        assert!((sum - path.total_distance).abs() < 1e-6);
    }
    assert!(paths.windows(2).all(|w| w[0].total_distance <= w[1].total_distance));
    assert_eq!(PathFinder::new(&graph).ranked(&query), paths);
}

#[test]
fn test_closest_is_bounded_and_ordered() {
    let index = GeoIndex::from_points((0..50u64).map(|i| (i, Coordinate::new(i as f64 - 25.0, i as f64 * 3.0 - 70.0))));
    let origin = Coordinate::new(1.0, 2.0);
    let result = index.closest(origin, 7, 0);
    assert_eq!(result.items.len(), 7);
    assert!(result.items.windows(2).all(|w| w[0].distance <= w[1].distance));

    let page = index.closest(origin, 7, 7);
    assert!(page.items[0].distance >= result.items[6].distance);
}

#[test]
fn test_import_and_query() {
    let dir = TempDir::new().unwrap();
    let sources = write_sources(dir.path());
    let storage = StorageManager::new(dir.path().join("data")).unwrap();

    let (report, snapshot) = storage.import(&sources).unwrap();
    assert_eq!(report.airports, 4);
    assert_eq!(report.airlines, 3);
    assert_eq!(report.routes, 5);
    assert_eq!(report.routes_skipped, 1);
    assert_eq!(report.cities, 3);
    assert!(snapshot.checksum.is_some());

    let dataset = storage.dataset();
    let kbp = dataset.graph.get_node(1).unwrap();
    let waw = dataset.graph.get_node(2).unwrap();
    let direct = &dataset.graph.get_outgoing_edges(1)[0];
    assert_eq!(direct.destination, 2);
    assert!((direct.distance - kbp.coordinate().distance_to(&waw.coordinate())).abs() < 1e-9);

    let groups = PathFinder::new(&dataset.graph).find(&PathQuery::new(1, 4));
    let response = ResultAggregator::new(&dataset.graph).routes(&groups);
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["routes"]["0"][0]["nodes"][1]["airport_name"], "Schiphol");
    assert_eq!(json["routes"]["1"][0]["nodes"][1]["airport_name"], "Chopin");
    assert_eq!(json["routes"]["2"][0]["nodes"][2]["airport_name"], "Chopin");

    let nearest = dataset.airport_index.closest(Coordinate::new(52.2, 21.0), 1, 0);
    assert_eq!(nearest.items[0].id, 2);

    let (cities, _) = dataset.places.closest(Coordinate::new(50.4, 30.5), 1, 0);
    assert_eq!(cities[0].value, "Kyiv");
    assert_eq!(cities[0].population, 2_514_227);
    let suggestions = dataset.places.autocomplete("war", 10);
    assert_eq!(suggestions[0].value, "Warszawa");
}

#[test]
fn test_snapshot_restores_same_answers() {
    let dir = TempDir::new().unwrap();
    let sources = write_sources(dir.path());
    let data_dir = dir.path().join("data");

    let before = {
        let storage = StorageManager::new(&data_dir).unwrap();
        storage.import(&sources).unwrap();
        let dataset = storage.dataset();
        let groups = PathFinder::new(&dataset.graph).find(&PathQuery::new(1, 4));
        serde_json::to_value(ResultAggregator::new(&dataset.graph).routes(&groups)).unwrap()
    };

    let reopened = StorageManager::new(&data_dir).unwrap();
    let dataset = reopened.dataset();
    assert_eq!(dataset.stats().routes, 5);
    let groups = PathFinder::new(&dataset.graph).find(&PathQuery::new(1, 4));
    let after = serde_json::to_value(ResultAggregator::new(&dataset.graph).routes(&groups)).unwrap();
    assert_eq!(before, after);
}
