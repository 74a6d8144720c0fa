use clap::Parser;
use fieldfuse::resources::build_resources;
use fieldfuse::settings::Settings;
use fieldfuse_api::{AppState, CallbackSink, MemorySink, RestApi, ResultSink, WorkerContext, WorkerPool};
use fieldfuse_storage::TaskStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Automatic schema matching service
#[derive(Parser, Debug)]
#[command(name = "fieldfuse")]
#[command(about = "Matches fields across heterogeneous tables", long_about = None)]
struct Args {
    /// Path to the TOML settings file
    #[arg(short, long, default_value = "fieldfuse.toml")]
    config: PathBuf,

    /// Path to the data directory
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// HTTP API port
    #[arg(long)]
    http_port: Option<u16>,

    /// Number of match worker threads
    #[arg(long)]
    workers: Option<usize>,

    /// Log level, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn apply(&self, settings: &mut Settings) {
        if let Some(dir) = &self.data_dir {
            settings.server.data_dir = dir.clone();
        }
        if let Some(port) = self.http_port {
            settings.server.http_port = port;
        }
        if let Some(workers) = self.workers {
            settings.server.workers = workers;
        }
    }
}

/// RUST_LOG wins over `level`. An unparsable level falls back to info.
fn log_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

// Blocking HTTP clients must not be created or dropped inside the async
// runtime, so resources are built before it starts.
fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt().with_env_filter(log_filter(&args.log_level)).init();

    let mut settings = Settings::load(&args.config)?;
    args.apply(&mut settings);
    settings.validate()?;

    info!("Starting fieldfuse v{}", env!("CARGO_PKG_VERSION"));
    info!("Data directory: {:?}", settings.server.data_dir);
    info!("HTTP API port: {}", settings.server.http_port);

    let resources = build_resources(&settings)?;
    let store = TaskStore::open(settings.server.data_dir.join("tasks"))?;
    info!("Task store initialized");

    let sink: Arc<dyn ResultSink> = match &settings.sink.result_url {
        Some(url) => Arc::new(CallbackSink::new(url.as_str())?),
        None => {
            warn!("No result_url configured, results are kept in memory");
            Arc::new(MemorySink::new())
        }
    };

    let pool = Arc::new(WorkerPool::start(
        settings.server.workers,
        WorkerContext {
            resources,
            config: settings.matcher.clone(),
            value_limit: settings.catalog.value_limit,
            cache_tables: settings.catalog.cache_tables,
            sink,
            store: store.clone(),
            page_size: settings.sink.page_size,
            archive_dir: settings.sink.archive_dir.clone(),
        },
    )?);
    let state = AppState {
        pool: pool.clone(),
        store,
    };

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(serve(state, settings.server.http_port, settings.server.http_workers));
    runtime.shutdown_background();

    info!("Shutting down...");
    pool.shutdown();
    info!(
        "{} of {} submitted jobs completed",
        pool.jobs_completed(),
        pool.jobs_submitted()
    );
    Ok(())
}

async fn serve(state: AppState, port: u16, http_workers: usize) {
    let http_handle = std::thread::spawn(move || {
        info!("Starting HTTP server on port {}", port);
        let sys = actix_web::rt::System::new();
        sys.block_on(async {
            if let Err(e) = RestApi::start(state, port, http_workers).await {
                error!("HTTP server error: {}", e);
            }
        })
    });

    info!("fieldfuse started successfully");
    info!("HTTP API: http://localhost:{}/", port);

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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_fallback() {
        std::env::remove_var("RUST_LOG");
        assert_eq!(log_filter("warn").to_string(), EnvFilter::new("warn").to_string());
        assert_eq!(log_filter("fieldfuse=loud").to_string(), EnvFilter::new("info").to_string());
    }

    #[test]
    fn test_args_override_settings() {
        let args = Args::parse_from(["fieldfuse", "--http-port", "9100", "--workers", "3"]);
        let mut settings = Settings::default();
        args.apply(&mut settings);
        assert_eq!(settings.server.http_port, 9100);
        assert_eq!(settings.server.workers, 3);
        assert_eq!(args.config, PathBuf::from("fieldfuse.toml"));
    }
}
