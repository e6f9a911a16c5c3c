//! World boundary geometry
//!
//! The basemap is an opaque GeoJSON dataset read once per path and shared
//! through [`BasemapCache`]. Only line work is kept: polygon rings and line
//! strings become plain coordinate runs. Without a dataset the map falls
//! back to a graticule.

use super::projection::LonLat;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const GRATICULE_SAMPLES: usize = 36;

#[derive(Debug, thiserror::Error)]
pub enum BasemapError {
    #[error("failed to read basemap '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("basemap is not valid GeoJSON: {0}")]
    Parse(#[from] serde_json::Error),
}

type Position = Vec<f64>;

#[derive(Deserialize)]
#[serde(untagged)]
enum GeoJsonRoot {
    Document(Document),
    Geometry(Geometry),
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum Document {
    FeatureCollection { features: Vec<Feature> },
    Feature { geometry: Option<Geometry> },
}

#[derive(Deserialize)]
struct Feature {
    geometry: Option<Geometry>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Point {},
    MultiPoint {},
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    GeometryCollection { geometries: Vec<Geometry> },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Basemap {
    rings: Vec<Vec<LonLat>>,
}

impl Basemap {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_rings(rings: Vec<Vec<LonLat>>) -> Self {
        Self { rings }
    }

    pub fn from_geojson(text: &str) -> Result<Self, BasemapError> {
        let root: GeoJsonRoot = serde_json::from_str(text)?;
        let mut rings = Vec::new();
        match root {
            GeoJsonRoot::Document(Document::FeatureCollection { features }) => {
                for geometry in features.into_iter().filter_map(|feature| feature.geometry) {
                    collect_rings(geometry, &mut rings);
                }
            }
            GeoJsonRoot::Document(Document::Feature { geometry }) => {
                if let Some(geometry) = geometry {
                    collect_rings(geometry, &mut rings);
                }
            }
            GeoJsonRoot::Geometry(geometry) => collect_rings(geometry, &mut rings),
        }
        Ok(Self { rings })
    }

    pub fn load(path: &Path) -> Result<Self, BasemapError> {
        let text = std::fs::read_to_string(path).map_err(|source| BasemapError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_geojson(&text)
    }

    pub fn rings(&self) -> &[Vec<LonLat>] {
        &self.rings
    }

    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }
}

fn collect_rings(geometry: Geometry, rings: &mut Vec<Vec<LonLat>>) {
    match geometry {
        Geometry::Point {} | Geometry::MultiPoint {} => {}
        Geometry::LineString { coordinates } => push_ring(coordinates, rings),
        Geometry::MultiLineString { coordinates } | Geometry::Polygon { coordinates } => {
            for ring in coordinates {
                push_ring(ring, rings);
            }
        }
        Geometry::MultiPolygon { coordinates } => {
            for ring in coordinates.into_iter().flatten() {
                push_ring(ring, rings);
            }
        }
        Geometry::GeometryCollection { geometries } => {
            for geometry in geometries {
                collect_rings(geometry, rings);
            }
        }
    }
}

fn push_ring(positions: Vec<Position>, rings: &mut Vec<Vec<LonLat>>) {
    let ring: Vec<LonLat> = positions
        .iter()
        .filter_map(|position| match position.as_slice() {
            [lon, lat, ..] => Some(LonLat::new(*lon, *lat)),
            _ => None,
        })
        .collect();
    if ring.len() >= 2 {
        rings.push(ring);
    }
}

/// Meridians and parallels every `step_degrees`, as open polylines.
pub fn graticule(step_degrees: f64) -> Vec<Vec<LonLat>> {
    let step = step_degrees.max(1.0);
    let mut lines = Vec::new();

    let mut lon = -180.0;
    while lon <= 180.0 {
        lines.push(
            (0..=GRATICULE_SAMPLES)
                .map(|i| LonLat::new(lon, -80.0 + 160.0 * i as f64 / GRATICULE_SAMPLES as f64))
                .collect(),
        );
        lon += step;
    }

    let mut lat = -80.0;
    while lat <= 80.0 {
        lines.push(
            (0..=GRATICULE_SAMPLES * 2)
                .map(|i| {
                    LonLat::new(-180.0 + 360.0 * i as f64 / (GRATICULE_SAMPLES * 2) as f64, lat)
                })
                .collect(),
        );
        lat += step;
    }

    lines
}

/// Loads each basemap file at most once per process.
#[derive(Debug, Default)]
pub struct BasemapCache {
    loaded: Mutex<HashMap<PathBuf, Arc<Basemap>>>,
}

impl BasemapCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load(&self, path: &Path) -> Result<Arc<Basemap>, BasemapError> {
        let mut loaded = self
            .loaded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(basemap) = loaded.get(path) {
            return Ok(basemap.clone());
        }
        let basemap = Arc::new(Basemap::load(path)?);
        log::info!(
            "Loaded basemap {} ({} rings)",
            path.display(),
            basemap.rings().len()
        );
        loaded.insert(path.to_path_buf(), basemap.clone());
        Ok(basemap)
    }
}
