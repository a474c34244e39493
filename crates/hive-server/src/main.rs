//! HiVE Server
//!
//! Assignment provisioning API and readiness watcher.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;

use hive_core::Config;
use hive_provisioning::readiness::PollerConfig;
use hive_provisioning::{Database, HttpProbe, Orchestrator, ProvisionerClient, ReadinessPoller};
use hive_server::AppState;
use hive_server::watch::{self, AssignmentFeed};

#[derive(Parser, Debug)]
#[command(name = "hive-server")]
#[command(version, about = "HiVE assignment provisioning server")]
struct Args {
    /// Directory holding `.hive/settings.json`. Defaults to the working directory.
    #[arg(long, global = true)]
    project_dir: Option<PathBuf>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API.
    Serve {
        /// Address to listen on.
        #[arg(long)]
        addr: Option<SocketAddr>,

        /// Path to SQLite database file.
        #[arg(long)]
        db_path: Option<PathBuf>,

        /// Environment provisioner endpoint.
        #[arg(long)]
        provisioner_url: Option<String>,

        /// Provisioner call timeout in seconds.
        #[arg(long)]
        provisioner_timeout: Option<u64>,
    },

    /// Watch a course's environments until they become reachable.
    Watch {
        /// Course code, e.g. `CPSC490`.
        #[arg(long)]
        course: String,

        /// Base URL of a running API server.
        #[arg(long, env = "HIVE_API_URL", default_value = "http://localhost:3000")]
        api: String,

        /// Seconds between probes of one environment.
        #[arg(long)]
        interval: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let project_dir = match args.project_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("cannot determine working directory")?,
    };
    let mut config = hive_core::config::load_config(Some(&project_dir))?;

    let level = &config.server.log_level;
    hive_core::tracing_init::init_tracing(
        &format!("hive_server={level},hive_provisioning={level}"),
        args.log_json,
    );

    match args.command {
        Command::Serve {
            addr,
            db_path,
            provisioner_url,
            provisioner_timeout,
        } => {
            if let Some(addr) = addr {
                config.server.listen_addr = addr;
            }
            if db_path.is_some() {
                config.server.database_path = db_path;
            }
            if let Some(url) = provisioner_url {
                config.provisioner.endpoint = url;
            }
            if let Some(secs) = provisioner_timeout {
                config.provisioner.timeout_secs = secs;
            }
            serve(&config).await
        }
        Command::Watch {
            course,
            api,
            interval,
        } => {
            if let Some(secs) = interval {
                config.readiness.interval_secs = secs;
            }
            watch_course(&config, &course, &api).await
        }
    }
}

async fn serve(config: &Config) -> anyhow::Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.server.listen_addr,
        provisioner = %config.provisioner.endpoint,
        "Starting hive-server"
    );

    let db_path = match &config.server.database_path {
        Some(path) => path.clone(),
        None => hive_core::config::database_path()
            .context("cannot determine default database path")?,
    };
    info!(path = %db_path.display(), "Opening course database");
    let db = Database::open(&db_path).await?;

    let provisioner = ProvisionerClient::new(&config.provisioner.endpoint)?;
    let service = Orchestrator::new(db, provisioner, config.provisioner.timeout());

    let listener = tokio::net::TcpListener::bind(config.server.listen_addr).await?;
    hive_server::serve_on(AppState::new(service), listener, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received shutdown signal");
    })
    .await?;

    info!("Server stopped");
    Ok(())
}

async fn watch_course(config: &Config, course: &str, api: &str) -> anyhow::Result<()> {
    let poller_config = PollerConfig::from(&config.readiness);
    info!(
        %course,
        %api,
        interval_secs = poller_config.interval.as_secs(),
        "Watching course environments"
    );

    let probe = HttpProbe::new(poller_config.probe_timeout)?;
    let poller = Arc::new(ReadinessPoller::new(Arc::new(probe), poller_config));
    let feed = AssignmentFeed::new(api, course)?;

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received shutdown signal");
        signal.cancel();
    });

    let refresh = poller_config.interval.max(Duration::from_secs(1));
    watch::run(feed, poller, refresh, shutdown).await;

    info!("Watcher stopped");
    Ok(())
}
