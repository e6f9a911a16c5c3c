use anyhow::{Context, Result};
use frontend::geo::{Basemap, BasemapCache};
use shared::DashboardConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub fn load_config(path: &Path) -> Result<DashboardConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: DashboardConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    Ok(config)
}

/// Config from `--config`, or the built-in defaults.
pub fn load_config_or_default(path: Option<&Path>) -> Result<DashboardConfig> {
    match path {
        Some(path) => load_config(path),
        None => Ok(DashboardConfig::default()),
    }
}

/// The configured basemap, or an empty one (graticule only).
pub fn load_basemap(config: &DashboardConfig, cache: &BasemapCache) -> Result<Arc<Basemap>> {
    let Some(path) = config.map.basemap_path.as_deref() else {
        return Ok(Arc::new(Basemap::empty()));
    };
    let path = PathBuf::from(path);
    cache
        .get_or_load(&path)
        .with_context(|| format!("Failed to load basemap: {}", path.display()))
}
