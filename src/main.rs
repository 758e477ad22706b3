use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use airroute_api::{AppState, RestApi};
use airroute_core::{MemoryCache, NoCache, QueryCache, QueryConfig};
use airroute_storage::{ImportSources, StorageManager};

/// Flight route lookup service
#[derive(Parser, Debug)]
#[command(name = "airroute")]
#[command(about = "Closest airports and multi-hop flight routes", long_about = None)]
struct Args {
    /// Log level
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API from the latest snapshot
    Serve(ServeArgs),
    /// Import CSV data and write a snapshot
    Import(ImportArgs),
    /// List snapshots in the data directory
    Snapshot(SnapshotArgs),
}

#[derive(ClapArgs, Debug)]
struct ServeArgs {
    /// Path to the data directory
    #[arg(short, long, default_value = "./data", env = "AIRROUTE_DATA_DIR")]
    data_dir: PathBuf,

    /// HTTP API port
    #[arg(long, default_value_t = 5000, env = "AIRROUTE_HTTP_PORT")]
    http_port: u16,

    /// Longest itinerary, in flight legs
    #[arg(long, default_value_t = 3, env = "AIRROUTE_MAX_HOPS")]
    max_hops: usize,

    /// Paths returned per route query
    #[arg(long, default_value_t = 10, env = "AIRROUTE_PATH_LIMIT")]
    path_limit: usize,

    /// Cached responses kept in memory; 0 disables the cache
    #[arg(long, default_value_t = 10_000, env = "AIRROUTE_CACHE_CAPACITY")]
    cache_capacity: usize,
}

#[derive(ClapArgs, Debug)]
struct ImportArgs {
    /// Path to the data directory
    #[arg(short, long, default_value = "./data", env = "AIRROUTE_DATA_DIR")]
    data_dir: PathBuf,

    #[arg(long, default_value = "csv_data/airports.csv")]
    airports: PathBuf,

    #[arg(long, default_value = "csv_data/airlines.csv")]
    airlines: PathBuf,

    #[arg(long, default_value = "csv_data/routes.csv")]
    routes: PathBuf,

    #[arg(long, default_value = "csv_data/worldcities.csv")]
    cities: PathBuf,

    /// City populations, matched to cities by name and location
    #[arg(long)]
    populations: Option<PathBuf>,

    /// Read at most this many rows from the airline, city and population files
    #[arg(long)]
    rows: Option<usize>,
}

#[derive(ClapArgs, Debug)]
struct SnapshotArgs {
    /// Path to the data directory
    #[arg(short, long, default_value = "./data", env = "AIRROUTE_DATA_DIR")]
    data_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting airroute v{}", env!("CARGO_PKG_VERSION"));

    match args.command {
        Command::Serve(serve) => run_server(serve).await,
        Command::Import(import) => run_import(import),
        Command::Snapshot(snapshot) => list_snapshots(snapshot),
    }
}

async fn run_server(args: ServeArgs) -> anyhow::Result<()> {
    let config = QueryConfig {
        max_hops: args.max_hops,
        path_limit: args.path_limit,
        ..QueryConfig::default()
    };
    config.validate()?;

    info!("Data directory: {:?}", args.data_dir);
    info!("HTTP API port: {}", args.http_port);

    let storage = Arc::new(StorageManager::with_config(&args.data_dir, &config)?);
    let stats = storage.dataset().stats();
    info!(
        "Storage initialized: {} airports, {} routes, {} cities",
        stats.airports, stats.routes, stats.cities
    );

    let cache: Arc<dyn QueryCache> = if args.cache_capacity > 0 {
        Arc::new(MemoryCache::new(args.cache_capacity))
    } else {
        Arc::new(NoCache)
    };
    let state = AppState::new(storage, config).with_cache(cache);

    let http_port = args.http_port;
    let http_handle = std::thread::spawn(move || {
        info!("Starting HTTP server on port {}", http_port);
        let sys = actix_web::rt::System::new();
        sys.block_on(async {
            if let Err(e) = RestApi::start(state, http_port).await {
                tracing::error!("HTTP server error: {}", e);
            }
        })
    });

    info!("HTTP API: http://localhost:{}/", http_port);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        _ = tokio::task::spawn_blocking(move || {
            http_handle.join().ok();
        }) => {
            info!("HTTP server stopped");
        }
    }

    info!("Shutting down...");
    Ok(())
}

fn run_import(args: ImportArgs) -> anyhow::Result<()> {
    let storage = StorageManager::new(&args.data_dir)?;
    let sources = ImportSources {
        airports: args.airports,
        airlines: args.airlines,
        routes: args.routes,
        cities: args.cities,
        populations: args.populations,
        rows: args.rows,
    };

    let (report, snapshot) = storage.import(&sources)?;
    info!(
        "Imported {} airports, {} airlines, {} routes ({} skipped), {} cities; {} rows rejected",
        report.airports,
        report.airlines,
        report.routes,
        report.routes_skipped,
        report.cities,
        report.rows_rejected
    );
    info!("Snapshot written: {} ({} bytes)", snapshot.name, snapshot.size);
    Ok(())
}

fn list_snapshots(args: SnapshotArgs) -> anyhow::Result<()> {
    let storage = StorageManager::new(&args.data_dir)?;
    for snapshot in storage.list_snapshots()? {
        println!(
            "{}\t{}\t{}\t{}",
            snapshot.name,
            snapshot.creation_time.as_deref().unwrap_or("-"),
            snapshot.size,
            snapshot.checksum.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
