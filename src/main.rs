//! squeue - incremental release and playlist curation
//!
//! Authorizes against the Spotify accounts service, then scans followed
//! artists and/or configured source playlists for tracks newer than the
//! last run and appends them to the configured destination playlists.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use bridge_desktop::ReqwestHttpClient;
use bridge_traits::time::SystemClock;
use bridge_traits::HttpClient;
use clap::Parser;
use core_auth::{await_authorization_code, OAuthConfig, OAuthFlowManager};
use core_runtime::{init_logging, AppConfig, LoggingConfig};
use core_sync::{RunOptions, SyncCoordinator};
use provider_spotify::SpotifyConnector;
use tracing::info;

/// Command-line arguments for squeue
#[derive(Parser, Debug)]
#[command(name = "squeue")]
#[command(about = "Queue new releases and playlist finds into Spotify playlists")]
#[command(version)]
struct Args {
    /// Path to the JSON configuration file
    config: PathBuf,

    /// Scan followed artists for new releases
    #[arg(short, long)]
    artists: bool,

    /// Scan the configured source playlists
    #[arg(short, long)]
    playlists: bool,

    /// Print the playlists you follow and exit
    #[arg(short = 'f', long)]
    followed_playlists: bool,

    /// Override the watermark of every enabled scan (YYYY-MM-DD)
    #[arg(short, long, value_name = "DATE")]
    date: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = AppConfig::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    init_logging(
        LoggingConfig::default()
            .with_level(config.log_level)
            .with_format(config.log_format),
    )
    .context("Failed to initialize logging")?;

    let mut options = RunOptions::new(args.artists, args.playlists);
    if let Some(date) = args.date {
        options = options.with_watermark_override(date);
    }
    options.validate().context("Invalid --date")?;

    let http: Arc<dyn HttpClient> =
        Arc::new(ReqwestHttpClient::new().context("Failed to build HTTP client")?);

    let access_token = authorize(&config, http.clone()).await?;
    let catalog = Arc::new(SpotifyConnector::new(http, access_token, config.market.clone()));
    let coordinator = SyncCoordinator::new(config, catalog, Arc::new(SystemClock));

    if args.followed_playlists {
        let playlists = coordinator
            .followed_playlists()
            .await
            .context("Failed to list followed playlists")?;
        for playlist in playlists {
            println!("{}  {}  {}", playlist.id, playlist.name, playlist.owner);
        }
        return Ok(());
    }

    let summary = coordinator.run(options).await.context("Curation run failed")?;
    info!(
        run_id = %summary.run_id,
        listen_later = summary.listen_later,
        sets = summary.sets,
        compilations = summary.compilations,
        unplayable = summary.unplayable,
        report = ?summary.report_path,
        "Done"
    );
    Ok(())
}

/// Run the authorization-code flow and return an access token.
async fn authorize(config: &AppConfig, http: Arc<dyn HttpClient>) -> Result<String> {
    let flow = OAuthFlowManager::new(
        OAuthConfig::spotify(
            config.client_id.clone(),
            Some(config.client_secret.clone()),
            config.redirect_uri.clone(),
        ),
        http,
    );

    let (auth_url, verifier) = flow
        .build_auth_url()
        .context("Failed to build authorization URL")?;
    eprintln!("Open this URL to authorize squeue:\n\n  {}\n", auth_url);

    let callback = await_authorization_code(&config.redirect_uri)
        .await
        .context("Authorization callback failed")?;
    let tokens = flow
        .exchange_code(&callback.code, &callback.state, &verifier)
        .await
        .context("Failed to exchange authorization code")?;

    info!("Authorized");
    Ok(tokens.access_token)
}
