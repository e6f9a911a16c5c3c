//! Composition root
//!
//! [`Dashboard`] mounts the animation clock, the streaming sync client and the
//! map view for one subject, routes pointer input through the last rendered
//! scene, and tears everything down on [`Dashboard::unmount`].

use crate::animation_clock::AnimationClock;
use crate::connection::{FeedTransport, StreamingSyncClient, SyncDiagnostic, SyncOptions, SyncSnapshot};
use crate::geo::{Basemap, Point, ProjectionConfig};
use crate::registry::{EntityRegistry, ZoneId};
use crate::visualizer::{
    EntityKind, LayerVisibility, MapEvent, MapView, MapViewState, Scene, SceneInput, Viewport,
    render_scene,
};
use futures::channel::mpsc::UnboundedReceiver;
use shared::DashboardConfig;
use std::sync::Arc;
use std::time::Duration;

pub struct Dashboard {
    registry: Arc<EntityRegistry>,
    basemap: Arc<Basemap>,
    base: ProjectionConfig,
    clock: AnimationClock,
    client: StreamingSyncClient,
    map: MapView,
}

impl Dashboard {
    /// Start every component for `subject`. The map flies to the subject's
    /// region when the registry recognizes it.
    pub fn mount(
        config: &DashboardConfig,
        transport: Arc<dyn FeedTransport>,
        subject: impl Into<String>,
        registry: Arc<EntityRegistry>,
        basemap: Arc<Basemap>,
    ) -> (Self, UnboundedReceiver<SyncDiagnostic>) {
        let subject = subject.into();
        let base = ProjectionConfig::from(&config.map);

        let clock = AnimationClock::start(Duration::from_millis(config.animation.tick_ms));
        let (client, diagnostics) =
            StreamingSyncClient::new(subject.clone(), SyncOptions::from(&config.feed), transport);
        let map = MapView::new(
            registry.clone(),
            base,
            Viewport::from(&config.map),
            LayerVisibility::from(&config.layers),
        );
        map.send(MapEvent::SubjectChanged(subject.clone()));
        log::info!("Dashboard mounted for subject '{}'", subject);

        (
            Self {
                registry,
                basemap,
                base,
                clock,
                client,
                map,
            },
            diagnostics,
        )
    }

    pub fn clock(&self) -> &AnimationClock {
        &self.clock
    }

    pub fn client(&self) -> &StreamingSyncClient {
        &self.client
    }

    pub fn map(&self) -> &MapView {
        &self.map
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Switch the feed connection and auto-navigate the map.
    pub fn select_subject(&self, subject: impl Into<String>) {
        let subject = subject.into();
        self.client.on_subject_change(subject.clone());
        self.map.send(MapEvent::SubjectChanged(subject));
    }

    pub fn refresh(&self) {
        self.client.refresh();
    }

    pub fn sync_snapshot(&self) -> SyncSnapshot {
        self.client.snapshot()
    }

    pub fn view_snapshot(&self) -> MapViewState {
        self.map.snapshot()
    }

    /// One render pass over the current state of every component.
    pub fn render(&self) -> Scene {
        let view = self.map.snapshot();
        let payload = self.client.current_payload();
        render_scene(&SceneInput {
            registry: &self.registry,
            basemap: &self.basemap,
            base: &self.base,
            view: &view,
            phase: self.clock.phase(),
            payload: payload.as_deref(),
        })
    }

    /// Update the hover slot from a pointer position in screen space.
    pub fn pointer_moved(&self, screen: Point) {
        let scene = self.render();
        match scene.hit_test(screen) {
            Some(entity) => self.map.send(MapEvent::EntityHovered(entity.clone())),
            None => self.map.send(MapEvent::HoverCleared),
        }
    }

    /// Links toggle their hidden state, zones become the selected zone.
    pub fn click(&self, screen: Point) {
        let scene = self.render();
        let Some(entity) = scene.hit_test(screen) else {
            return;
        };
        match entity.kind {
            EntityKind::Link => self.map.send(MapEvent::LinkClicked(entity.id.clone())),
            EntityKind::Zone => {
                if let Some(zone) = ZoneId::parse(&entity.id) {
                    self.map.send(MapEvent::ZoneClicked(zone));
                }
            }
            EntityKind::ThermalAnomaly | EntityKind::Aircraft | EntityKind::Vessel => {}
        }
    }

    /// Stop the clock, close the connection (cancelling any pending
    /// reconnect) and stop the map view.
    pub fn unmount(&self) {
        self.clock.stop();
        self.client.stop();
        self.map.stop();
        log::info!("Dashboard unmounted");
    }
}
