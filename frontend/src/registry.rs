//! Conflict zones, their relationship graph and region presets
//!
//! Everything here is immutable after construction. The registry is shared
//! by reference between the map view and the subject resolver.

use crate::geo::LonLat;
use std::fmt;

// ===== ZONES =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ZoneId {
    UsIran,
    Ukraine,
    Sudan,
    Myanmar,
    TaiwanStrait,
    Sahel,
    Ethiopia,
    Syria,
    Yemen,
    Drc,
    Korea,
    IsraelPalestine,
}

impl ZoneId {
    pub const ALL: [ZoneId; 12] = [
        ZoneId::UsIran,
        ZoneId::Ukraine,
        ZoneId::Sudan,
        ZoneId::Myanmar,
        ZoneId::TaiwanStrait,
        ZoneId::Sahel,
        ZoneId::Ethiopia,
        ZoneId::Syria,
        ZoneId::Yemen,
        ZoneId::Drc,
        ZoneId::Korea,
        ZoneId::IsraelPalestine,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ZoneId::UsIran => "us-iran",
            ZoneId::Ukraine => "ukraine",
            ZoneId::Sudan => "sudan",
            ZoneId::Myanmar => "myanmar",
            ZoneId::TaiwanStrait => "taiwan-strait",
            ZoneId::Sahel => "sahel",
            ZoneId::Ethiopia => "ethiopia",
            ZoneId::Syria => "syria",
            ZoneId::Yemen => "yemen",
            ZoneId::Drc => "drc",
            ZoneId::Korea => "korea",
            ZoneId::IsraelPalestine => "israel-palestine",
        }
    }

    pub fn parse(id: &str) -> Option<ZoneId> {
        Self::ALL.into_iter().find(|zone| zone.as_str() == id)
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::High, Severity::Medium, Severity::Low];

    /// Fill colour as `(r, g, b, alpha)`.
    pub fn color(self) -> (u8, u8, u8, f32) {
        match self {
            Severity::High => (239, 68, 68, 1.0),
            Severity::Medium => (245, 158, 11, 1.0),
            Severity::Low => (34, 211, 238, 1.0),
        }
    }

    pub fn legend_label(self) -> &'static str {
        match self {
            Severity::High => "HIGH",
            Severity::Medium => "MED",
            Severity::Low => "LOW",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub id: ZoneId,
    pub label: &'static str,
    pub coordinates: LonLat,
    pub severity: Severity,
}

/// Relationship between two zones. Endpoints are raw ids so that bundled
/// data may reference zones this build does not know.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub id: &'static str,
    pub from: &'static str,
    pub to: &'static str,
    pub label: &'static str,
}

/// A link whose endpoints both resolved.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedLink<'a> {
    pub link: &'a Link,
    pub from: &'a Zone,
    pub to: &'a Zone,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionPreset {
    pub zone: ZoneId,
    pub center: LonLat,
    pub zoom: f64,
}

// ===== BUNDLED DATA =====

const fn zone(id: ZoneId, label: &'static str, lon: f64, lat: f64, severity: Severity) -> Zone {
    Zone {
        id,
        label,
        coordinates: LonLat::new(lon, lat),
        severity,
    }
}

const fn link(id: &'static str, from: &'static str, to: &'static str, label: &'static str) -> Link {
    Link {
        id,
        from,
        to,
        label,
    }
}

const fn preset(zone: ZoneId, lon: f64, lat: f64, zoom: f64) -> RegionPreset {
    RegionPreset {
        zone,
        center: LonLat::new(lon, lat),
        zoom,
    }
}

pub const BUILTIN_ZONES: [Zone; 12] = [
    zone(ZoneId::UsIran, "US–Iran", 53.0, 32.0, Severity::High),
    zone(ZoneId::Ukraine, "Ukraine", 31.0, 49.0, Severity::High),
    zone(ZoneId::Sudan, "Sudan", 30.0, 15.0, Severity::High),
    zone(ZoneId::Myanmar, "Myanmar", 96.0, 20.0, Severity::Medium),
    zone(ZoneId::TaiwanStrait, "Taiwan Strait", 120.0, 24.0, Severity::Medium),
    zone(ZoneId::Sahel, "Sahel Region", 2.0, 15.0, Severity::Medium),
    zone(ZoneId::Ethiopia, "Ethiopia", 40.0, 9.0, Severity::Low),
    zone(ZoneId::Syria, "Syria", 38.0, 35.0, Severity::Medium),
    zone(ZoneId::Yemen, "Yemen", 48.0, 15.0, Severity::High),
    zone(ZoneId::Drc, "DRC", 24.0, -3.0, Severity::Low),
    zone(ZoneId::Korea, "Korean Peninsula", 127.0, 38.0, Severity::Low),
    zone(ZoneId::IsraelPalestine, "Israel–Palestine", 35.0, 31.5, Severity::High),
];

pub const BUILTIN_LINKS: [Link; 10] = [
    link("link-1", "us-iran", "israel-palestine", "Proxy conflict"),
    link("link-2", "israel-palestine", "syria", "Border tensions"),
    link("link-3", "syria", "us-iran", "Iranian influence"),
    link("link-4", "us-iran", "yemen", "Houthi support"),
    link("link-5", "yemen", "israel-palestine", "Houthi strikes"),
    link("link-6", "sudan", "ethiopia", "Border dispute"),
    link("link-7", "ethiopia", "drc", "Regional instability"),
    link("link-8", "sahel", "sudan", "Arms flow"),
    link("link-9", "taiwan-strait", "korea", "US alliance"),
    link("link-10", "myanmar", "taiwan-strait", "Regional pressure"),
];

pub const BUILTIN_PRESETS: [RegionPreset; 12] = [
    preset(ZoneId::UsIran, 50.0, 30.0, 4.0),
    preset(ZoneId::Ukraine, 32.0, 49.0, 5.0),
    preset(ZoneId::Sudan, 30.0, 15.0, 4.0),
    preset(ZoneId::Myanmar, 96.0, 20.0, 5.0),
    preset(ZoneId::TaiwanStrait, 120.0, 24.0, 6.0),
    preset(ZoneId::Sahel, 2.0, 15.0, 3.0),
    preset(ZoneId::Ethiopia, 40.0, 9.0, 5.0),
    preset(ZoneId::Syria, 38.0, 35.0, 6.0),
    preset(ZoneId::Yemen, 48.0, 15.0, 5.0),
    preset(ZoneId::Drc, 24.0, -3.0, 4.0),
    preset(ZoneId::Korea, 127.0, 38.0, 6.0),
    preset(ZoneId::IsraelPalestine, 35.0, 31.5, 7.0),
];

// ===== REGISTRY =====

#[derive(Debug, Clone)]
pub struct EntityRegistry {
    zones: Vec<Zone>,
    links: Vec<Link>,
    presets: Vec<RegionPreset>,
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl EntityRegistry {
    pub fn new(zones: Vec<Zone>, links: Vec<Link>, presets: Vec<RegionPreset>) -> Self {
        Self {
            zones,
            links,
            presets,
        }
    }

    pub fn builtin() -> Self {
        Self::new(
            BUILTIN_ZONES.to_vec(),
            BUILTIN_LINKS.to_vec(),
            BUILTIN_PRESETS.to_vec(),
        )
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn zone(&self, id: &str) -> Option<&Zone> {
        self.zones.iter().find(|zone| zone.id.as_str() == id)
    }

    pub fn link(&self, id: &str) -> Option<&Link> {
        self.links.iter().find(|link| link.id == id)
    }

    /// Links whose endpoints both exist, in registry order.
    pub fn resolved_links(&self) -> Vec<ResolvedLink<'_>> {
        self.links
            .iter()
            .filter_map(|link| match (self.zone(link.from), self.zone(link.to)) {
                (Some(from), Some(to)) => Some(ResolvedLink { link, from, to }),
                _ => {
                    log::debug!(
                        "Dropping link {} ({} -> {}): unknown endpoint",
                        link.id,
                        link.from,
                        link.to
                    );
                    None
                }
            })
            .collect()
    }

    /// Map free text such as `"US-Iran"` or `"Israel Palestine conflict"` to
    /// a zone. The first zone in registry order that matches wins.
    pub fn resolve_subject_name(&self, free_text: &str) -> Option<ZoneId> {
        let normalized = normalize_subject(free_text);
        if normalized.is_empty() {
            return None;
        }
        self.zones
            .iter()
            .map(|zone| zone.id)
            .find(|id| subject_matches(&normalized, id.as_str()))
    }

    pub fn preset_for(&self, zone: ZoneId) -> Option<&RegionPreset> {
        self.presets.iter().find(|preset| preset.zone == zone)
    }
}

/// Lowercase, whitespace to hyphens, everything outside `[a-z0-9-]` removed.
pub fn normalize_subject(free_text: &str) -> String {
    free_text
        .trim()
        .chars()
        .flat_map(char::to_lowercase)
        .filter_map(|c| match c {
            c if c.is_whitespace() => Some('-'),
            'a'..='z' | '0'..='9' | '-' => Some(c),
            _ => None,
        })
        .collect()
}

fn subject_matches(normalized: &str, zone_id: &str) -> bool {
    normalized.contains(zone_id)
        || zone_id
            .split('-')
            .filter(|token| !token.is_empty())
            .all(|token| normalized.contains(token))
}
