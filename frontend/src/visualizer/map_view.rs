//! Map view state and the actor that owns it
//!
//! [`MapViewState`] holds everything the viewer controls: viewport, hover
//! slot, hidden links, layer switches and the selected zone. Its methods are
//! the only mutation paths; [`MapView`] serializes gestures onto them.

use super::hover::{EntityRef, HoverSelection};
use super::viewport::Viewport;
use crate::dataflow::{Actor, Relay, relay};
use crate::geo::ProjectionConfig;
use crate::registry::{EntityRegistry, ZoneId};
use futures::StreamExt;
use indexmap::IndexSet;
use shared::LayersSection;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapLayer {
    Links,
    Thermal,
    Aircraft,
    Vessels,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerVisibility {
    pub links: bool,
    pub thermal: bool,
    pub aircraft: bool,
    pub vessels: bool,
}

impl Default for LayerVisibility {
    fn default() -> Self {
        Self::from(&LayersSection::default())
    }
}

impl From<&LayersSection> for LayerVisibility {
    fn from(layers: &LayersSection) -> Self {
        Self {
            links: layers.links,
            thermal: layers.thermal,
            aircraft: layers.aircraft,
            vessels: layers.vessels,
        }
    }
}

impl LayerVisibility {
    pub fn is_visible(&self, layer: MapLayer) -> bool {
        match layer {
            MapLayer::Links => self.links,
            MapLayer::Thermal => self.thermal,
            MapLayer::Aircraft => self.aircraft,
            MapLayer::Vessels => self.vessels,
        }
    }

    fn flag_mut(&mut self, layer: MapLayer) -> &mut bool {
        match layer {
            MapLayer::Links => &mut self.links,
            MapLayer::Thermal => &mut self.thermal,
            MapLayer::Aircraft => &mut self.aircraft,
            MapLayer::Vessels => &mut self.vessels,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapViewState {
    pub viewport: Viewport,
    pub default_viewport: Viewport,
    pub hover: HoverSelection,
    /// Link ids the viewer suppressed, in the order they were hidden.
    pub hidden_links: IndexSet<String>,
    pub layers: LayerVisibility,
    pub selected_zone: Option<ZoneId>,
}

impl MapViewState {
    pub fn new(default_viewport: Viewport, layers: LayerVisibility) -> Self {
        Self {
            viewport: default_viewport,
            default_viewport,
            hover: HoverSelection::None,
            hidden_links: IndexSet::new(),
            layers,
            selected_zone: None,
        }
    }

    pub fn toggle_link(&mut self, link_id: &str) {
        if !self.hidden_links.shift_remove(link_id) {
            self.hidden_links.insert(link_id.to_string());
        }
    }

    pub fn is_link_hidden(&self, link_id: &str) -> bool {
        self.hidden_links.contains(link_id)
    }

    pub fn is_link_drawn(&self, link_id: &str) -> bool {
        self.layers.links && !self.is_link_hidden(link_id)
    }

    /// Whether "reset hidden links" would do anything right now.
    pub fn can_reset_hidden_links(&self) -> bool {
        self.layers.links && !self.hidden_links.is_empty()
    }

    /// Clears the hidden set, but only while links are globally visible.
    pub fn reset_hidden_links(&mut self) -> bool {
        if !self.can_reset_hidden_links() {
            return false;
        }
        self.hidden_links.clear();
        true
    }

    /// Flip a layer switch. Turning links off keeps the hidden set intact.
    pub fn toggle_layer(&mut self, layer: MapLayer) {
        let flag = self.layers.flag_mut(layer);
        *flag = !*flag;
    }

    pub fn reset_viewport(&mut self) {
        self.viewport = self.default_viewport;
    }

    /// Snap the viewport to the preset of the zone `subject` names. Returns
    /// the zone when the view moved.
    pub fn navigate_to_subject(&mut self, registry: &EntityRegistry, subject: &str) -> Option<ZoneId> {
        let Some(zone) = registry.resolve_subject_name(subject) else {
            log::debug!("No zone matches subject '{}', viewport unchanged", subject);
            return None;
        };
        let Some(preset) = registry.preset_for(zone) else {
            log::debug!("Zone {} has no region preset, viewport unchanged", zone);
            return None;
        };
        self.viewport = self.viewport.fly_to(preset);
        Some(zone)
    }
}

/// Every viewer gesture the map reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    ZoomInPressed,
    ZoomOutPressed,
    ResetViewPressed,
    MapDragged { dx: f64, dy: f64 },
    MapScrolled { delta_y: f64 },
    LinkClicked(String),
    ZoneClicked(ZoneId),
    EntityHovered(EntityRef),
    EntityLeft(EntityRef),
    /// Pointer is over empty map: drop whatever is hovered.
    HoverCleared,
    LayerToggled(MapLayer),
    ResetHiddenLinksPressed,
    SubjectChanged(String),
}

impl MapViewState {
    /// Apply one gesture. Returns whether anything observable changed.
    pub fn apply(
        &mut self,
        event: MapEvent,
        registry: &EntityRegistry,
        base: &ProjectionConfig,
    ) -> bool {
        match event {
            MapEvent::ZoomInPressed => self.set_viewport(self.viewport.zoom_in()),
            MapEvent::ZoomOutPressed => self.set_viewport(self.viewport.zoom_out()),
            MapEvent::ResetViewPressed => {
                let before = self.viewport;
                self.reset_viewport();
                before != self.viewport
            }
            MapEvent::MapDragged { dx, dy } => self.set_viewport(self.viewport.pan_by(dx, dy, base)),
            MapEvent::MapScrolled { delta_y } => {
                self.set_viewport(self.viewport.zoom_by_wheel(delta_y))
            }
            MapEvent::LinkClicked(link_id) => {
                if registry.link(&link_id).is_none() {
                    log::debug!("Ignoring click on unknown link {}", link_id);
                    return false;
                }
                self.toggle_link(&link_id);
                true
            }
            MapEvent::ZoneClicked(zone) => {
                let changed = self.selected_zone != Some(zone);
                self.selected_zone = Some(zone);
                changed
            }
            MapEvent::EntityHovered(entity) => {
                if self.hover.is_hovered(&entity) {
                    return false;
                }
                self.hover.hover(entity);
                true
            }
            MapEvent::EntityLeft(entity) => {
                let was_hovered = self.hover.is_hovered(&entity);
                self.hover.leave(&entity);
                was_hovered
            }
            MapEvent::HoverCleared => {
                let was_hovered = self.hover.current().is_some();
                self.hover.clear();
                was_hovered
            }
            MapEvent::LayerToggled(layer) => {
                self.toggle_layer(layer);
                true
            }
            MapEvent::ResetHiddenLinksPressed => self.reset_hidden_links(),
            MapEvent::SubjectChanged(subject) => {
                self.navigate_to_subject(registry, &subject).is_some()
            }
        }
    }

    fn set_viewport(&mut self, viewport: Viewport) -> bool {
        let changed = self.viewport != viewport;
        self.viewport = viewport;
        changed
    }
}

/// Actor-owned map view. Gestures arrive on one relay and are applied in
/// the order they were sent.
#[derive(Clone, Debug)]
pub struct MapView {
    state: Actor<MapViewState>,
    pub map_gesture_relay: Relay<MapEvent>,
}

impl MapView {
    pub fn new(
        registry: Arc<EntityRegistry>,
        base: ProjectionConfig,
        default_viewport: Viewport,
        layers: LayerVisibility,
    ) -> Self {
        let (map_gesture_relay, mut map_gesture_stream) = relay::<MapEvent>();

        let state = Actor::new(
            MapViewState::new(default_viewport, layers),
            async move |state| {
                while let Some(event) = map_gesture_stream.next().await {
                    state.send_if_modified(|view| view.apply(event, &registry, &base));
                }
            },
        );

        Self {
            state,
            map_gesture_relay,
        }
    }

    /// Gestures sent after [`stop`](MapView::stop) are dropped.
    pub fn send(&self, event: MapEvent) {
        if self.map_gesture_relay.try_send(event).is_err() {
            log::debug!("Map view stopped, gesture dropped");
        }
    }

    pub fn snapshot(&self) -> MapViewState {
        self.state.snapshot()
    }

    pub fn signal(&self) -> watch::Receiver<MapViewState> {
        self.state.signal()
    }

    pub fn viewport(&self) -> Viewport {
        self.state.with(|view| view.viewport)
    }

    pub fn can_reset_hidden_links(&self) -> bool {
        self.state.with(MapViewState::can_reset_hidden_links)
    }

    pub fn stop(&self) {
        self.state.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::LonLat;
    use crate::visualizer::hover::EntityKind;

    fn state() -> MapViewState {
        MapViewState::new(
            Viewport::new(LonLat::new(30.0, 20.0), 1.0),
            LayerVisibility::default(),
        )
    }

    #[test]
    fn toggling_a_link_twice_restores_the_set() {
        let mut view = state();
        view.toggle_link("link-2");
        let before = view.hidden_links.clone();

        view.toggle_link("link-5");
        view.toggle_link("link-5");
        assert_eq!(view.hidden_links, before);

        view.toggle_link("link-2");
        assert!(view.hidden_links.is_empty());
    }

    #[test]
    fn links_off_keeps_hidden_set_and_blocks_reset() {
        let mut view = state();
        view.toggle_link("link-1");
        view.toggle_layer(MapLayer::Links);

        assert!(!view.is_link_drawn("link-3"));
        assert!(!view.can_reset_hidden_links());
        assert!(!view.reset_hidden_links());
        assert!(view.is_link_hidden("link-1"));

        view.toggle_layer(MapLayer::Links);
        assert!(view.is_link_drawn("link-3"));
        assert!(!view.is_link_drawn("link-1"));
        assert!(view.can_reset_hidden_links());
        assert!(view.reset_hidden_links());
        assert!(view.hidden_links.is_empty());
        assert!(!view.can_reset_hidden_links());
    }

    #[test]
    fn navigation_snaps_to_preset_or_stays_put() {
        let registry = EntityRegistry::builtin();
        let mut view = state();

        assert_eq!(view.navigate_to_subject(&registry, "Atlantis"), None);
        assert_eq!(view.viewport, view.default_viewport);

        assert_eq!(
            view.navigate_to_subject(&registry, "US-Iran"),
            Some(ZoneId::UsIran)
        );
        let preset = registry.preset_for(ZoneId::UsIran).unwrap();
        assert_eq!(view.viewport.center, preset.center);
        assert_eq!(view.viewport.zoom, preset.zoom);

        view.reset_viewport();
        assert_eq!(view.viewport, view.default_viewport);
    }

    #[tokio::test]
    async fn actor_serializes_gestures() {
        let map = MapView::new(
            Arc::new(EntityRegistry::builtin()),
            ProjectionConfig::default(),
            Viewport::new(LonLat::new(30.0, 20.0), 1.0),
            LayerVisibility::default(),
        );

        map.send(MapEvent::ZoomInPressed);
        map.send(MapEvent::ZoomInPressed);
        map.send(MapEvent::LinkClicked("link-7".to_string()));
        map.send(MapEvent::LinkClicked("link-404".to_string()));
        map.send(MapEvent::ZoneClicked(ZoneId::Sudan));

        let view = map
            .signal()
            .wait_for(|view| {
                view.selected_zone == Some(ZoneId::Sudan)
                    && view.hidden_links.len() == 1
                    && view.viewport.zoom > 2.0
            })
            .await
            .unwrap()
            .clone();
        assert!((view.viewport.zoom - 2.25).abs() < 1e-12);
        assert_eq!(view.hidden_links.len(), 1);
        assert!(view.is_link_hidden("link-7"));
    }

    #[tokio::test]
    async fn hover_slot_holds_only_the_latest_entity() {
        let map = MapView::new(
            Arc::new(EntityRegistry::builtin()),
            ProjectionConfig::default(),
            Viewport::new(LonLat::new(30.0, 20.0), 1.0),
            LayerVisibility::default(),
        );
        let zone = EntityRef::new(EntityKind::Zone, "syria");
        let vessel = EntityRef::new(EntityKind::Vessel, "2");

        map.send(MapEvent::EntityHovered(zone.clone()));
        map.send(MapEvent::EntityHovered(vessel.clone()));
        map.send(MapEvent::EntityLeft(zone));

        map.signal()
            .wait_for(|view| view.hover.is_hovered(&vessel))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(map.snapshot().hover.current(), Some(&vessel));
    }

    #[tokio::test]
    async fn gestures_apply_in_send_order() {
        let registry = Arc::new(EntityRegistry::builtin());
        let syria = EntityRef::new(EntityKind::Zone, "syria");

        for _ in 0..50 {
            let map = MapView::new(
                registry.clone(),
                ProjectionConfig::default(),
                Viewport::new(LonLat::new(30.0, 20.0), 1.0),
                LayerVisibility::default(),
            );
            map.send(MapEvent::EntityHovered(syria.clone()));
            map.send(MapEvent::EntityLeft(syria.clone()));
            map.send(MapEvent::ResetViewPressed);
            map.send(MapEvent::ZoomInPressed);
            map.send(MapEvent::ZoneClicked(ZoneId::Syria));

            let view = map
                .signal()
                .wait_for(|view| view.selected_zone == Some(ZoneId::Syria))
                .await
                .unwrap()
                .clone();
            assert_eq!(view.hover.current(), None);
            assert!((view.viewport.zoom - 1.5).abs() < 1e-12);
        }
    }

    #[test]
    fn hover_cleared_drops_any_entity() {
        let registry = EntityRegistry::builtin();
        let base = ProjectionConfig::default();
        let mut view = state();

        assert!(!view.apply(MapEvent::HoverCleared, &registry, &base));
        assert!(view.apply(
            MapEvent::EntityHovered(EntityRef::new(EntityKind::Aircraft, "4")),
            &registry,
            &base,
        ));
        assert!(view.apply(MapEvent::HoverCleared, &registry, &base));
        assert_eq!(view.hover.current(), None);
    }
}
