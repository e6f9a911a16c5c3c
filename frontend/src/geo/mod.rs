//! Geographic primitives: projection math and world basemap geometry.

pub mod basemap;
pub mod projection;

pub use basemap::{Basemap, BasemapCache, BasemapError, graticule};
pub use projection::{
    LonLat, Point, ProjectionConfig, ZoomTransform, great_circle, inverse_zoom_size, project,
    unproject,
};
