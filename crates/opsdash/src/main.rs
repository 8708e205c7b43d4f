use clap::Parser;
use opsdash::list::{ControllerOptions, MemoryHistory};
use opsdash::{run_with, ApiClient, Dashboard, DashboardFlags, ProgramOptions, Screen};
use std::error::Error;
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Terminal dashboard for orders, users, facilities, tubes and insurance.
#[derive(Debug, Parser)]
#[command(name = "opsdash", version, about)]
struct Cli {
    /// Base URL of the REST API.
    #[arg(long, default_value = "http://localhost:8080/api/")]
    base_url: String,

    /// Screen to open first.
    #[arg(long, value_enum, default_value_t = Screen::Orders)]
    screen: Screen,

    /// Initial address query, e.g. `status=Active&page=2`.
    #[arg(long, default_value = "")]
    query: String,

    /// Quiet period after an edit before fetching, in milliseconds.
    #[arg(long, default_value_t = 300)]
    debounce_ms: u64,

    /// Page size used when the address has none.
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
    page_size: u32,

    /// Request timeout in seconds.
    #[arg(long, default_value_t = 15)]
    timeout_secs: u64,

    /// Directory exports are written to.
    #[arg(long, default_value = ".")]
    export_dir: PathBuf,

    /// Write logs to this file. Without it logs are discarded, since the
    /// terminal belongs to the UI.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Disable status toggles and deletes.
    #[arg(long)]
    read_only: bool,
}

fn init_logging(log_file: Option<&PathBuf>) -> io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::sink)
                .try_init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_ref())?;

    let api = ApiClient::new(&cli.base_url, Duration::from_secs(cli.timeout_secs))?;
    tracing::info!(base = %api.base(), screen = ?cli.screen, "starting");

    let mut options = ControllerOptions {
        debounce: Duration::from_millis(cli.debounce_ms),
        ..ControllerOptions::default()
    };
    if !options.page_sizes.contains(&cli.page_size) {
        options.page_sizes.push(cli.page_size);
        options.page_sizes.sort_unstable();
    }
    options.default_page_size = cli.page_size;

    let flags = DashboardFlags {
        api,
        history: MemoryHistory::new(cli.screen.path(), cli.query),
        options,
        export_dir: cli.export_dir,
        read_only: cli.read_only,
    };
    let program_options = ProgramOptions {
        title: Some(format!("opsdash: {}", cli.screen.title())),
        ..ProgramOptions::default()
    };
    run_with::<Dashboard>(flags, program_options).await?;
    tracing::info!("exited");
    Ok(())
}
