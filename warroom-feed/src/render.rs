use anyhow::{Context, Result, bail};
use frontend::animation_clock::AnimationPhase;
use frontend::geo::{Basemap, ProjectionConfig};
use frontend::registry::EntityRegistry;
use frontend::visualizer::{LayerVisibility, MapViewState, Scene, SceneInput, Viewport, render_scene};
use shared::{ConflictReport, DashboardConfig, FeedMsg};
use std::path::Path;

pub struct RenderRequest<'a> {
    pub subject: &'a str,
    pub payload: Option<&'a ConflictReport>,
    pub zoom: Option<f64>,
}

/// One scene for `subject` without starting any actors: the map is placed the
/// way a freshly mounted dashboard would place it.
pub fn render_once(
    config: &DashboardConfig,
    registry: &EntityRegistry,
    basemap: &Basemap,
    request: &RenderRequest<'_>,
) -> Scene {
    let base = ProjectionConfig::from(&config.map);
    let mut view = MapViewState::new(
        Viewport::from(&config.map),
        LayerVisibility::from(&config.layers),
    );
    view.navigate_to_subject(registry, request.subject);
    if let Some(zoom) = request.zoom {
        view.viewport = view.viewport.with_zoom(zoom);
    }

    render_scene(&SceneInput {
        registry,
        basemap,
        base: &base,
        view: &view,
        phase: AnimationPhase::default(),
        payload: request.payload,
    })
}

/// A saved payload: either a full `ok` envelope or a bare report.
pub fn load_payload(path: &Path) -> Result<ConflictReport> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read payload file: {}", path.display()))?;

    if let Ok(message) = FeedMsg::parse(&content) {
        return match message {
            FeedMsg::Report(report) => Ok(report),
            FeedMsg::Analyzing { .. } => bail!("Payload file {} holds an analyzing envelope", path.display()),
            FeedMsg::Error { message } => {
                bail!("Payload file {} holds an error envelope: {}", path.display(), message)
            }
        };
    }
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse payload file: {}", path.display()))
}
