use serde::{Deserialize, Serialize};

// ===== FEED MESSAGE TYPES =====

/// Envelope pushed by the intelligence producer over `/ws/{subject}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FeedMsg {
    Analyzing {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        conflict: Option<String>,
    },
    #[serde(rename = "ok")]
    Report(ConflictReport),
    Error {
        #[serde(default)]
        message: String,
    },
}

impl FeedMsg {
    /// Parse a text frame. Anything that is not one of the three known
    /// envelopes is an error and must be discarded by the caller.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn status_tag(&self) -> &'static str {
        match self {
            FeedMsg::Analyzing { .. } => "analyzing",
            FeedMsg::Report(_) => "ok",
            FeedMsg::Error { .. } => "error",
        }
    }
}

// ===== PAYLOAD TYPES =====

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ConflictReport {
    #[serde(default)]
    pub conflict: String,
    #[serde(default)]
    pub escalation_score: Option<f64>,
    #[serde(default)]
    pub threat_level: Option<String>,
    #[serde(default)]
    pub key_findings: Vec<String>,
    #[serde(default)]
    pub scenarios: Vec<Scenario>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finint: Option<FinintReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geoint: Option<GeointReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sigint: Option<SigintReport>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Scenario {
    pub description: String,
    pub probability: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct FinintReport {
    #[serde(default)]
    pub brent: Option<PriceSnapshot>,
    #[serde(default)]
    pub wti: Option<PriceSnapshot>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PriceSnapshot {
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub change_pct: Option<String>,
    #[serde(default)]
    pub as_of: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct GeointReport {
    #[serde(default)]
    pub anomalies: Vec<ThermalAnomaly>,
    #[serde(default)]
    pub geoint_score: f64,
}

// The producer substitutes `{"error": "..."}` for readings it could not fetch,
// so every field is optional and coordinate-less entries are skipped when drawn.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ThermalAnomaly {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    /// Fire radiative power in megawatts.
    #[serde(default)]
    pub frp: f64,
    #[serde(default)]
    pub confidence: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub acquired: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SigintReport {
    #[serde(default)]
    pub aircraft: Vec<Aircraft>,
    #[serde(default)]
    pub ships: Vec<Vessel>,
    #[serde(default)]
    pub sigint_score: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Aircraft {
    #[serde(default)]
    pub callsign: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub altitude: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Vessel {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

// ===== CONFIG TYPES =====

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    pub feed: FeedSection,
    pub map: MapSection,
    pub animation: AnimationSection,
    pub layers: LayersSection,
}

impl DashboardConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FeedSection {
    /// Endpoint prefix; the encoded subject is appended as the last path segment.
    pub base_url: String,
    pub reconnect_delay_ms: u64,
}

impl Default for FeedSection {
    fn default() -> Self {
        Self {
            base_url: "ws://localhost:8000/ws".to_string(),
            reconnect_delay_ms: 5_000,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MapSection {
    pub width: f64,
    pub height: f64,
    pub scale: f64,
    pub rotation: f64,
    /// `[longitude, latitude]`
    pub default_center: [f64; 2],
    pub default_zoom: f64,
    pub basemap_path: Option<String>,
}

impl Default for MapSection {
    fn default() -> Self {
        Self {
            width: 1000.0,
            height: 500.0,
            scale: 180.0,
            rotation: 0.0,
            default_center: [30.0, 20.0],
            default_zoom: 1.0,
            basemap_path: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AnimationSection {
    pub tick_ms: u64,
}

impl Default for AnimationSection {
    fn default() -> Self {
        Self { tick_ms: 50 }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LayersSection {
    pub links: bool,
    pub thermal: bool,
    pub aircraft: bool,
    pub vessels: bool,
}

impl Default for LayersSection {
    fn default() -> Self {
        Self {
            links: true,
            thermal: true,
            aircraft: true,
            vessels: true,
        }
    }
}

// ===== UTILITY FUNCTIONS =====

/// Percent-encode a subject for use as one URL path segment, leaving the same
/// characters unescaped as a browser's `encodeURIComponent`.
pub fn encode_subject(subject: &str) -> String {
    let mut encoded = String::with_capacity(subject.len());
    for byte in subject.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => encoded.push(byte as char),
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

/// Inverse of [`encode_subject`]. Returns `None` for broken escapes or non-UTF-8 output.
pub fn decode_subject(segment: &str) -> Option<String> {
    let bytes = segment.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        if bytes[index] == b'%' {
            let hex = segment.get(index + 1..index + 3)?;
            if !hex.bytes().all(|byte| byte.is_ascii_hexdigit()) {
                return None;
            }
            decoded.push(u8::from_str_radix(hex, 16).ok()?);
            index += 3;
        } else {
            decoded.push(bytes[index]);
            index += 1;
        }
    }
    String::from_utf8(decoded).ok()
}

pub fn feed_url(base_url: &str, subject: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), encode_subject(subject))
}
