// Visualizer Module - Map view state and scene rendering
//
// Gesture handling lives in the map view actor; a render pass turns its state
// plus the latest payload into a Scene that can be hit-tested or written out as SVG.

// Pan/zoom value type
pub mod viewport;

// Hovered entity tracking
pub mod hover;

// Map view actor and its relays
pub mod map_view;

// Display list and hit testing
pub mod scene;

// Render pass: basemap, links, zones, legend
pub mod render;

// Thermal, aircraft and vessel layers
pub mod overlay;

// SVG output
pub mod svg;

pub use hover::{EntityKind, EntityRef, HoverSelection};
pub use map_view::{LayerVisibility, MapEvent, MapLayer, MapView, MapViewState};
pub use render::{SceneInput, render_scene};
pub use scene::{Layer, Scene};
pub use svg::{to_svg, write_svg};
pub use viewport::Viewport;
