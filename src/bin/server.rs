use anyhow::{bail, Context, Result};
use clap::Parser;
use grid_access::server::{create_router, AppState};
use grid_access::{DataPaths, IndexHandle, ServiceConfig};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "grid-access-server",
    author,
    version,
    about = "Serve grid accessibility lookups over HTTP",
    long_about = "Loads the analysis grid, nearest-stop lists, stop catalog and slope scores \
                  from a data directory and serves nearest-stop, grid, bus-stop and hotspot \
                  endpoints.\n\n\
                  On Unix, SIGHUP reloads the datasets; a failed reload keeps the current data."
)]
struct Args {
    /// Directory holding the four dataset files
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Address to bind to [default: 0.0.0.0]
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on [default: 8000]
    #[arg(short, long)]
    port: Option<u16>,

    /// Walking speed in metres per second
    #[arg(long, default_value_t = grid_access::geo_utils::DEFAULT_WALKING_SPEED_MPS)]
    walking_speed: f64,

    /// Accept out-of-range coordinates instead of answering 400
    #[arg(long)]
    no_validate: bool,

    /// Verbose output (show debug messages)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if args.verbose { "debug" } else { "info" }),
    )
    .init();

    if !(args.walking_speed.is_finite() && args.walking_speed > 0.0) {
        bail!("Walking speed must be positive, got {}", args.walking_speed);
    }
    if !args.data_dir.is_dir() {
        bail!("Data directory does not exist: {}", args.data_dir.display());
    }

    log::info!("Data directory: {}", args.data_dir.display());
    let index = IndexHandle::open(DataPaths::in_dir(&args.data_dir)).context("Failed to load datasets")?;

    let defaults = ServiceConfig::default();
    let config = ServiceConfig {
        host: args.host.unwrap_or(defaults.host.clone()),
        port: args.port.unwrap_or(defaults.port),
        walking_speed_mps: args.walking_speed,
        validate_coordinates: !args.no_validate,
        ..defaults
    };
    let addr = config.bind_address();
    let state = AppState::new(index, config);

    #[cfg(unix)]
    spawn_reload_on_hangup(Arc::clone(&state.index))?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    log::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("Shutting down");
        })
        .await
        .context("Server error")?;

    Ok(())
}

#[cfg(unix)]
fn spawn_reload_on_hangup(index: Arc<IndexHandle>) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangups = signal(SignalKind::hangup()).context("Failed to install SIGHUP handler")?;
    tokio::spawn(async move {
        while hangups.recv().await.is_some() {
            log::info!("SIGHUP received, reloading datasets");
            let index = Arc::clone(&index);
            match tokio::task::spawn_blocking(move || index.reload()).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => log::error!("Reload failed, keeping current data: {e}"),
                Err(e) => log::error!("Reload task failed: {e}"),
            }
        }
    });
    Ok(())
}
