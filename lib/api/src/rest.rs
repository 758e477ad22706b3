use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer, Result as ActixResult};
use airroute_core::{
    cache_key, normalize_limit, read_through, BoundingBox, CityList, Coordinate, Error, NoCache, PathFinder,
    PathQuery, QueryCache, QueryConfig, ResultAggregator, Suggestions,
};
use airroute_storage::{Dataset, StorageManager};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

type Params = web::Query<HashMap<String, String>>;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<StorageManager>,
    pub config: QueryConfig,
    pub cache: Arc<dyn QueryCache>,
    cached_generation: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(storage: Arc<StorageManager>, config: QueryConfig) -> Self {
        let generation = storage.generation();
        Self {
            storage,
            config,
            cache: Arc::new(NoCache),
            cached_generation: Arc::new(AtomicU64::new(generation)),
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn QueryCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Live dataset and its generation.
    ///
    /// Drops cached responses the first time a new generation is seen.
    /// Cache keys carry the generation, so entries written by requests
    /// still running against an older dataset are never served.
    fn current(&self) -> (u64, Arc<Dataset>) {
        let (generation, dataset) = self.storage.current();
        if self.cached_generation.swap(generation, Ordering::AcqRel) != generation {
            debug!("Dataset generation {} is live, clearing cache", generation);
            if let Err(e) = self.cache.clear() {
                warn!("Cache clear failed: {}", e);
            }
        }
        (generation, dataset)
    }
}

pub struct RestApi;

impl RestApi {
    pub async fn start(state: AppState, port: u16) -> std::io::Result<()> {
        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            App::new()
                .wrap(cors)
                .app_data(web::Data::new(state.clone()))
                .configure(Self::configure)
        })
        .bind(("0.0.0.0", port))?
        .run()
        .await
    }

    pub fn configure(cfg: &mut web::ServiceConfig) {
        cfg.route("/health", web::get().to(health))
            .route("/ajax/airports", web::get().to(airports))
            .route("/ajax/routes", web::get().to(routes))
            .route("/ajax/get-cities", web::get().to(get_cities))
            .route("/ajax/autocomplete/cities", web::get().to(autocomplete_cities));
    }
}

fn bad_request(e: Error) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({
        "error": e.to_string()
    }))
}

/// Response for a failure while answering an already validated query
fn query_failed(e: Error) -> HttpResponse {
    match e {
        Error::InvalidArgument(_) | Error::AirportNotFound(_) => bad_request(e),
        _ => {
            warn!("Query failed: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": e.to_string()
            }))
        }
    }
}

fn json_body(body: String) -> HttpResponse {
    HttpResponse::Ok().content_type("application/json").body(body)
}

fn to_json<T: Serialize>(value: &T) -> airroute_core::Result<String> {
    serde_json::to_string(value).map_err(|e| Error::Serialization(e.to_string()))
}

fn required<'a>(params: &'a HashMap<String, String>, name: &str) -> airroute_core::Result<&'a str> {
    params
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::InvalidArgument(format!("missing parameter '{}'", name)))
}

fn parse_f64(params: &HashMap<String, String>, name: &str) -> airroute_core::Result<f64> {
    let raw = required(params, name)?;
    raw.parse::<f64>()
        .map_err(|_| Error::InvalidArgument(format!("'{}' is not a number: {}", name, raw)))
}

fn parse_id(params: &HashMap<String, String>, name: &str) -> airroute_core::Result<u64> {
    let raw = required(params, name)?;
    raw.parse::<u64>()
        .map_err(|_| Error::InvalidArgument(format!("'{}' is not an airport id: {}", name, raw)))
}

fn optional_i64(params: &HashMap<String, String>, name: &str) -> airroute_core::Result<Option<i64>> {
    match params.get(name).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<i64>()
            .map(Some)
            .map_err(|_| Error::InvalidArgument(format!("'{}' is not an integer: {}", name, raw))),
    }
}

fn flag(params: &HashMap<String, String>, name: &str) -> bool {
    matches!(
        params.get(name).map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("true" | "1" | "yes")
    )
}

async fn health(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let stats = state.storage.dataset().stats();
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "airports": stats.airports,
        "airlines": stats.airlines,
        "routes": stats.routes,
        "cities": stats.cities,
    })))
}

async fn airports(state: web::Data<AppState>, params: Params) -> ActixResult<HttpResponse> {
    let parsed = (|| {
        let origin = Coordinate::checked(parse_f64(&params, "lat")?, parse_f64(&params, "lng")?)?;
        let limit = normalize_limit(optional_i64(&params, "limit")?.unwrap_or(1));
        Ok::<_, Error>((origin, limit))
    })();
    let (origin, limit) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => return Ok(bad_request(e)),
    };
    let with_city = flag(&params, "find_closest_city");
    let (generation, dataset) = state.current();

    let mut key_args = vec![
        generation.to_string(),
        origin.lat.to_string(),
        origin.lng.to_string(),
        limit.to_string(),
    ];
    if with_city {
        key_args.push("find_closest_city".to_string());
    }
    let key = cache_key("airports", &key_args);

    let result = read_through(state.cache.as_ref(), &key, || {
        let proximity = dataset.airport_index.closest(origin, limit, 0);
        let aggregator = ResultAggregator::new(&dataset.graph);
        let response = if with_city {
            let (mut cities, city_degraded) = dataset.places.closest(origin, 1, 0);
            let closest = if cities.is_empty() { None } else { Some(cities.swap_remove(0)) };
            aggregator.airports_with_city(&proximity, closest, city_degraded)
        } else {
            aggregator.airport_list(&proximity)
        };
        if proximity.degraded {
            warn!("Airport proximity answered by fallback for {}", key);
        }
        to_json(&response)
    });

    match result {
        Ok(body) => Ok(json_body(body)),
        Err(e) => Ok(query_failed(e)),
    }
}

async fn routes(state: web::Data<AppState>, params: Params) -> ActixResult<HttpResponse> {
    let parsed = (|| {
        let source = parse_id(&params, "from_airport")?;
        let destination = parse_id(&params, "to_airport")?;
        let max_hops = match optional_i64(&params, "max_hops")? {
            // Callers may only narrow the configured bound
            Some(hops) => usize::try_from(hops.max(0)).unwrap_or(0).min(state.config.max_hops),
            None => state.config.max_hops,
        };
        let limit = match optional_i64(&params, "limit")? {
            Some(limit) => normalize_limit(limit),
            None => state.config.path_limit,
        };
        let query = PathQuery::new(source, destination).max_hops(max_hops).limit(limit);
        query.validate()?;
        Ok::<_, Error>(query)
    })();
    let query = match parsed {
        Ok(query) => query,
        Err(e) => return Ok(bad_request(e)),
    };

    let (generation, dataset) = state.current();
    let key = cache_key(
        "routes",
        &[
            generation.to_string(),
            query.source.to_string(),
            query.destination.to_string(),
            query.max_hops.to_string(),
            query.limit.to_string(),
        ],
    );

    let result = read_through(state.cache.as_ref(), &key, || {
        let groups = PathFinder::new(&dataset.graph).find(&query);
        debug!(
            "{} -> {}: {} stop groups",
            query.source,
            query.destination,
            groups.len()
        );
        to_json(&ResultAggregator::new(&dataset.graph).routes(&groups))
    });

    match result {
        Ok(body) => Ok(json_body(body)),
        Err(e) => Ok(query_failed(e)),
    }
}

async fn get_cities(state: web::Data<AppState>, params: Params) -> ActixResult<HttpResponse> {
    let parsed = (|| {
        BoundingBox::new(
            parse_f64(&params, "ne_lat")?,
            parse_f64(&params, "ne_lng")?,
            parse_f64(&params, "sw_lat")?,
            parse_f64(&params, "sw_lng")?,
        )
    })();
    let bbox = match parsed {
        Ok(bbox) => bbox,
        Err(e) => return Ok(bad_request(e)),
    };

    let (generation, dataset) = state.current();
    let key = cache_key(
        "cities",
        &[
            generation.to_string(),
            bbox.ne.lng.to_string(),
            bbox.ne.lat.to_string(),
            bbox.sw.lng.to_string(),
            bbox.sw.lat.to_string(),
        ],
    );

    let result = read_through(state.cache.as_ref(), &key, || {
        let json_list = dataset
            .places
            .within(&bbox, state.config.bbox_limit)
            .into_iter()
            .map(|city| city.serialize())
            .collect();
        to_json(&CityList { json_list })
    });

    match result {
        Ok(body) => Ok(json_body(body)),
        Err(e) => Ok(query_failed(e)),
    }
}

async fn autocomplete_cities(state: web::Data<AppState>, params: Params) -> ActixResult<HttpResponse> {
    let query = params.get("query").map(|q| q.trim().to_string()).unwrap_or_default();
    if query.is_empty() {
        return Ok(HttpResponse::Ok().json(Suggestions::default()));
    }

    let (generation, dataset) = state.current();
    let key = cache_key("autocomplete_cities", &[generation.to_string(), query.clone()]);
    let result = read_through(state.cache.as_ref(), &key, || {
        let suggestions = dataset.places.autocomplete(&query, state.config.autocomplete_limit);
        to_json(&Suggestions { suggestions })
    });

    match result {
        Ok(body) => Ok(json_body(body)),
        Err(e) => Ok(query_failed(e)),
    }
}
