/// discmatch - match album folders against Discogs releases
use clap::Parser;
use discmatch::config::Config;
use discmatch::discogs::DiscogsClient;
use discmatch::matcher::MatchService;
use discmatch::ui::{console, AppController};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "discmatch")]
#[command(about = "Match album folders to Discogs releases, then rename and export them", long_about = None)]
struct Cli {
    /// Directory whose subfolders are albums; scanned on startup
    root: Option<PathBuf>,

    /// Discogs personal access token
    #[arg(long, env = "DISCMATCH_DISCOGS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Pause between catalog searches, in milliseconds
    #[arg(long, env = "DISCMATCH_REQUEST_DELAY_MS")]
    delay_ms: Option<u64>,

    /// How long a selection prompt waits before it is cancelled
    #[arg(long, env = "DISCMATCH_SELECTION_TIMEOUT_SECS")]
    selection_timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Logs go to stderr so they don't interleave with console output on stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "discmatch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = Config::load()?;
    let cli = Cli::parse();

    if let Some(token) = cli.token.filter(|t| !t.trim().is_empty()) {
        config.discogs_token = Some(token);
    }
    if let Some(ms) = cli.delay_ms {
        config.request_delay = Duration::from_millis(ms);
    }
    if let Some(secs) = cli.selection_timeout_secs {
        config.selection_timeout = Duration::from_secs(secs);
    }

    let client = DiscogsClient::new(config.require_token()?, &config)?;
    match client.validate_token().await {
        Ok(true) => info!("Discogs token accepted"),
        Ok(false) => warn!("Discogs rejected the token; searches will come back empty"),
        Err(e) => warn!("Could not validate Discogs token: {}", e),
    }

    let (handle, events) = MatchService::start(
        &tokio::runtime::Handle::current(),
        Arc::new(client),
        &config,
    );
    let mut controller = AppController::new(handle, config);

    if let Some(root) = cli.root {
        let count = controller.scan(&root)?;
        println!("Found {} folder(s) in {}", count, root.display());
    }

    console::run(controller, events).await?;
    Ok(())
}
