use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use frontend::geo::BasemapCache;
use frontend::registry::EntityRegistry;
use frontend::visualizer::to_svg;
use std::path::PathBuf;
use std::time::Duration;
use warroom_feed::config::{load_basemap, load_config_or_default};
use warroom_feed::render::{RenderRequest, load_payload, render_once};
use warroom_feed::watch::{WatchOptions, run_watch};
use warroom_feed::ws_server::{self, FeedServerOptions, ReportLibrary};

#[derive(Parser)]
#[command(name = "warroom-feed")]
#[command(about = "Feed server and headless dashboard for the War Room live map")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the feed server daemon serving /ws/{subject}
    Serve {
        #[arg(long, default_value = "8000")]
        port: u16,

        /// Directory of <subject>.json envelopes served instead of synthesized reports
        #[arg(long)]
        fixtures: Option<PathBuf>,

        #[arg(long, default_value = "2000")]
        analysis_delay_ms: u64,

        #[arg(long, default_value = "60")]
        interval_secs: u64,
    },
    /// Mount the dashboard against a live feed and follow it
    Watch {
        #[arg(long, short)]
        subject: String,

        #[arg(long, short)]
        config: Option<PathBuf>,

        #[arg(long)]
        snapshot_dir: Option<PathBuf>,
    },
    /// Render one map snapshot to SVG
    Render {
        #[arg(long, short)]
        subject: String,

        #[arg(long, short)]
        payload: Option<PathBuf>,

        #[arg(long, short)]
        out: PathBuf,

        #[arg(long)]
        zoom: Option<f64>,

        #[arg(long, short)]
        config: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli.command).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(2);
    }
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Serve {
            port,
            fixtures,
            analysis_delay_ms,
            interval_secs,
        } => {
            let mut library = ReportLibrary::new(EntityRegistry::builtin());
            if let Some(dir) = fixtures {
                library.load_fixtures(&dir)?;
            }
            let options = FeedServerOptions {
                analysis_delay: Duration::from_millis(analysis_delay_ms),
                update_interval: Duration::from_secs(interval_secs),
            };
            ws_server::run_server_daemon(port, library, options).await
        }
        Commands::Watch {
            subject,
            config,
            snapshot_dir,
        } => {
            let config = load_config_or_default(config.as_deref())?;
            let basemap = load_basemap(&config, &BasemapCache::new())?;
            run_watch(WatchOptions {
                subject,
                config,
                basemap,
                snapshot_dir,
            })
            .await
        }
        Commands::Render {
            subject,
            payload,
            out,
            zoom,
            config,
        } => {
            let config = load_config_or_default(config.as_deref())?;
            let basemap = load_basemap(&config, &BasemapCache::new())?;
            let payload = payload.as_deref().map(load_payload).transpose()?;

            let scene = render_once(
                &config,
                &EntityRegistry::builtin(),
                &basemap,
                &RenderRequest {
                    subject: &subject,
                    payload: payload.as_ref(),
                    zoom,
                },
            );
            std::fs::write(&out, to_svg(&scene))
                .with_context(|| format!("Failed to write {}", out.display()))?;
            log::info!("Rendered '{}' to {}", subject, out.display());
            Ok(())
        }
    }
}
