//! Headless dashboard
//!
//! Mounts the full dashboard against a live feed, prints every status change,
//! and writes an SVG snapshot whenever a new report lands. Lines on stdin
//! drive the map the way the toolbar would.

use anyhow::{Context, Result};
use frontend::Dashboard;
use frontend::connection::{SyncDiagnostic, SyncSnapshot, WebSocketTransport};
use frontend::geo::Basemap;
use frontend::registry::{EntityRegistry, normalize_subject};
use frontend::visualizer::{MapEvent, MapLayer, MapViewState, Scene, write_svg};
use futures_util::StreamExt;
use shared::DashboardConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, Clone, PartialEq)]
pub enum WatchCommand {
    Refresh,
    ZoomIn,
    ZoomOut,
    ResetView,
    ResetLinks,
    Toggle(MapLayer),
    Snapshot,
    Quit,
    Subject(String),
}

/// Slash commands control the map; any other text is a new subject.
pub fn parse_command(line: &str) -> Option<WatchCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let command = match line {
        "/refresh" => WatchCommand::Refresh,
        "/zoom-in" | "+" => WatchCommand::ZoomIn,
        "/zoom-out" | "-" => WatchCommand::ZoomOut,
        "/reset" => WatchCommand::ResetView,
        "/reset-links" => WatchCommand::ResetLinks,
        "/links" => WatchCommand::Toggle(MapLayer::Links),
        "/thermal" => WatchCommand::Toggle(MapLayer::Thermal),
        "/aircraft" => WatchCommand::Toggle(MapLayer::Aircraft),
        "/vessels" => WatchCommand::Toggle(MapLayer::Vessels),
        "/snapshot" => WatchCommand::Snapshot,
        "/quit" => WatchCommand::Quit,
        other if other.starts_with('/') => return None,
        subject => WatchCommand::Subject(subject.to_string()),
    };
    Some(command)
}

pub fn format_status(snapshot: &SyncSnapshot) -> String {
    let mut line = format!("[{}] {}", snapshot.status, snapshot.subject);
    if let Some(report) = &snapshot.payload {
        if let Some(score) = report.escalation_score {
            line.push_str(&format!(" | escalation {:.1}", score));
        }
        if let Some(level) = &report.threat_level {
            line.push_str(&format!(" ({})", level));
        }
    }
    if let Some(updated) = snapshot.last_updated {
        line.push_str(&format!(
            " | updated {}",
            updated.with_timezone(&chrono::Local).format("%H:%M:%S")
        ));
    }
    if let Some(error) = &snapshot.last_error {
        line.push_str(&format!(" | last error: {}", error));
    }
    line
}

/// Numbered SVG files in one directory.
pub struct SnapshotWriter {
    dir: PathBuf,
    written: usize,
}

impl SnapshotWriter {
    pub fn create(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create snapshot directory: {}", dir.display()))?;
        Ok(Self { dir, written: 0 })
    }

    pub fn write(&mut self, scene: &Scene, subject: &str) -> Result<PathBuf> {
        let mut svg = String::new();
        write_svg(scene, &mut svg).context("Failed to serialize scene")?;

        let slug = normalize_subject(subject);
        let name = if slug.is_empty() { "map".to_string() } else { slug };
        let path = self.dir.join(format!("{:04}-{}.svg", self.written, name));
        std::fs::write(&path, svg)
            .with_context(|| format!("Failed to write snapshot: {}", path.display()))?;
        self.written += 1;
        Ok(path)
    }
}

pub struct WatchOptions {
    pub subject: String,
    pub config: DashboardConfig,
    pub basemap: Arc<Basemap>,
    pub snapshot_dir: Option<PathBuf>,
}

pub async fn run_watch(options: WatchOptions) -> Result<()> {
    let mut snapshots = options.snapshot_dir.map(SnapshotWriter::create).transpose()?;
    let (dashboard, mut diagnostics) = Dashboard::mount(
        &options.config,
        Arc::new(WebSocketTransport),
        options.subject,
        Arc::new(EntityRegistry::builtin()),
        options.basemap,
    );

    let mut sync = dashboard.client().signal();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut last_report = None;
    println!("{}", format_status(&sync.borrow_and_update()));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted");
                break;
            }
            changed = sync.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = sync.borrow_and_update().clone();
                println!("{}", format_status(&snapshot));
                if snapshot.last_updated.is_some() && snapshot.last_updated != last_report {
                    last_report = snapshot.last_updated;
                    if let Some(writer) = snapshots.as_mut() {
                        let path = writer.write(&dashboard.render(), &snapshot.subject)?;
                        log::info!("Snapshot written to {}", path.display());
                    }
                }
            }
            Some(diagnostic) = diagnostics.next() => {
                let SyncDiagnostic::MalformedMessage { subject, error, .. } = diagnostic;
                eprintln!("Discarded malformed message for '{}': {}", subject, error);
            }
            line = lines.next_line(), if stdin_open => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    stdin_open = false;
                    continue;
                };
                match parse_command(&line) {
                    Some(WatchCommand::Quit) => break,
                    Some(WatchCommand::Snapshot) => match snapshots.as_mut() {
                        Some(writer) => {
                            let path = writer.write(&dashboard.render(), &dashboard.client().subject())?;
                            println!("Snapshot written to {}", path.display());
                        }
                        None => eprintln!("No --snapshot-dir configured"),
                    },
                    Some(command) => apply_command(&dashboard, command),
                    None => eprintln!("Unknown command: {}", line.trim()),
                }
            }
        }
    }

    dashboard.unmount();
    Ok(())
}

/// Why clearing hidden links would do nothing right now, if it would.
pub fn reset_links_refusal(view: &MapViewState) -> Option<&'static str> {
    if view.can_reset_hidden_links() {
        None
    } else if !view.layers.links {
        Some("links are turned off (/links to show them)")
    } else {
        Some("no links are hidden")
    }
}

fn apply_command(dashboard: &Dashboard, command: WatchCommand) {
    let map = dashboard.map();
    match command {
        WatchCommand::Refresh => dashboard.refresh(),
        WatchCommand::ZoomIn => map.send(MapEvent::ZoomInPressed),
        WatchCommand::ZoomOut => map.send(MapEvent::ZoomOutPressed),
        WatchCommand::ResetView => map.send(MapEvent::ResetViewPressed),
        WatchCommand::ResetLinks => match reset_links_refusal(&map.snapshot()) {
            Some(reason) => eprintln!("Ignoring /reset-links: {}", reason),
            None => map.send(MapEvent::ResetHiddenLinksPressed),
        },
        WatchCommand::Toggle(layer) => map.send(MapEvent::LayerToggled(layer)),
        WatchCommand::Subject(subject) => dashboard.select_subject(subject),
        WatchCommand::Snapshot | WatchCommand::Quit => {}
    }
}
