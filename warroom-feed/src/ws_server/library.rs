//! Reports served per subject
//!
//! A fixture file wins when one exists for the subject; everything else gets a
//! synthesized report that is deterministic for a given subject and cycle.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use frontend::registry::{EntityRegistry, Severity, normalize_subject};
use shared::{
    Aircraft, ConflictReport, FeedMsg, FinintReport, GeointReport, PriceSnapshot, Scenario,
    SigintReport, ThermalAnomaly, Vessel,
};
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

pub struct ReportLibrary {
    registry: EntityRegistry,
    fixtures: HashMap<String, FeedMsg>,
}

impl ReportLibrary {
    pub fn new(registry: EntityRegistry) -> Self {
        Self {
            registry,
            fixtures: HashMap::new(),
        }
    }

    /// Serve `message` for `subject` on every cycle. Only `ok` and `error`
    /// envelopes make sense as fixtures.
    pub fn insert_fixture(&mut self, subject: &str, message: FeedMsg) -> Result<()> {
        if let FeedMsg::Analyzing { .. } = message {
            bail!("Fixture for '{}' must be an ok or error envelope", subject);
        }
        self.fixtures.insert(normalize_subject(subject), message);
        Ok(())
    }

    /// Load every `<subject>.json` file in `dir` as a fixture.
    pub fn load_fixtures(&mut self, dir: &Path) -> Result<usize> {
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read fixture directory: {}", dir.display()))?;

        let mut loaded = 0;
        for entry in entries {
            let path = entry
                .with_context(|| format!("Failed to read fixture directory: {}", dir.display()))?
                .path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(subject) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };

            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read fixture: {}", path.display()))?;
            let message = FeedMsg::parse(&content)
                .with_context(|| format!("Failed to parse fixture: {}", path.display()))?;
            self.insert_fixture(subject, message)
                .with_context(|| format!("Invalid fixture: {}", path.display()))?;
            loaded += 1;
        }

        log::info!("Loaded {} fixture(s) from {}", loaded, dir.display());
        Ok(loaded)
    }

    pub fn fixture_count(&self) -> usize {
        self.fixtures.len()
    }

    /// The envelope that ends analysis cycle `cycle` for `subject`.
    pub fn report_for(&self, subject: &str, cycle: u64) -> FeedMsg {
        match self.fixtures.get(&normalize_subject(subject)) {
            Some(FeedMsg::Report(report)) if report.conflict.is_empty() => FeedMsg::Report(ConflictReport {
                conflict: subject.to_string(),
                ..report.clone()
            }),
            Some(message) => message.clone(),
            None => FeedMsg::Report(synthesize_report(&self.registry, subject, cycle, Utc::now())),
        }
    }
}

// ===== SYNTHESIS =====

/// Deterministic stream of samples in `[0, 1)` keyed by subject and cycle.
struct Noise {
    seed: u64,
    counter: u64,
}

impl Noise {
    fn new(subject: &str, cycle: u64) -> Self {
        let mut hasher = DefaultHasher::new();
        normalize_subject(subject).hash(&mut hasher);
        cycle.hash(&mut hasher);
        Self {
            seed: hasher.finish(),
            counter: 0,
        }
    }

    fn next(&mut self) -> f64 {
        let mut hasher = DefaultHasher::new();
        self.seed.hash(&mut hasher);
        self.counter.hash(&mut hasher);
        self.counter += 1;
        (hasher.finish() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn range(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next()
    }

    fn count(&mut self, low: usize, high: usize) -> usize {
        low + (self.next() * (high - low + 1) as f64) as usize
    }

    fn pick<'a>(&mut self, options: &[&'a str]) -> &'a str {
        options[(self.next() * options.len() as f64) as usize % options.len()]
    }
}

const CALLSIGN_PREFIXES: &[&str] = &["RCH", "FORTE", "NATO", "JAKE", "HOMER", "UAE", "QTR"];
const VESSEL_NAMES: &[&str] = &[
    "FRONT ALTAIR",
    "ADVANTAGE SWEET",
    "STENA IMPERO",
    "MSC ARIES",
    "GALAXY LEADER",
    "SEA FALCON",
];
const CONFIDENCE: &[&str] = &["high", "nominal", "low"];

pub fn threat_level(escalation_score: f64) -> &'static str {
    match escalation_score {
        score if score >= 80.0 => "CRITICAL",
        score if score >= 60.0 => "HIGH",
        score if score >= 40.0 => "ELEVATED",
        score if score >= 20.0 => "LOW",
        _ => "MINIMAL",
    }
}

/// Build a plausible report for `subject`. Theatre-specific overlays are only
/// placed when the registry recognizes the subject.
pub fn synthesize_report(
    registry: &EntityRegistry,
    subject: &str,
    cycle: u64,
    now: DateTime<Utc>,
) -> ConflictReport {
    let mut noise = Noise::new(subject, cycle);
    let zone = registry
        .resolve_subject_name(subject)
        .and_then(|id| registry.zone(id.as_str()));

    let baseline = match zone.map(|zone| zone.severity) {
        Some(Severity::High) => 65.0,
        Some(Severity::Medium) => 40.0,
        Some(Severity::Low) => 20.0,
        None => 5.0,
    };
    let escalation_score = ((baseline + noise.range(0.0, 25.0)) * 10.0).round() / 10.0;
    let level = threat_level(escalation_score);

    let brent_change = noise.range(-3.0, 4.5);
    let wti_change = brent_change + noise.range(-0.5, 0.5);
    let finint = FinintReport {
        brent: Some(price(noise.range(70.0, 95.0), brent_change, now)),
        wti: Some(price(noise.range(65.0, 90.0), wti_change, now)),
    };

    let (geoint, sigint, mut key_findings) = match zone {
        Some(zone) => {
            let center = zone.coordinates;
            let anomalies: Vec<ThermalAnomaly> = (0..noise.count(2, 6))
                .map(|_| ThermalAnomaly {
                    lat: Some(center.lat + noise.range(-1.5, 1.5)),
                    lon: Some(center.lon + noise.range(-1.5, 1.5)),
                    frp: (noise.range(10.0, 1200.0) * 10.0).round() / 10.0,
                    confidence: Some(noise.pick(CONFIDENCE).to_string()),
                    kind: Some("thermal".to_string()),
                    acquired: Some(now.format("%Y-%m-%d %H:%M UTC").to_string()),
                    error: None,
                })
                .collect();
            let aircraft: Vec<Aircraft> = (0..noise.count(1, 4))
                .map(|_| {
                    let military = noise.next() < 0.4;
                    Aircraft {
                        callsign: Some(format!(
                            "{}{:03}",
                            noise.pick(CALLSIGN_PREFIXES),
                            noise.count(1, 999)
                        )),
                        kind: Some(if military { "C17" } else { "A320" }.to_string()),
                        lat: Some(center.lat + noise.range(-3.0, 3.0)),
                        lon: Some(center.lon + noise.range(-3.0, 3.0)),
                        altitude: Some((noise.range(8_000.0, 38_000.0) / 100.0).round() * 100.0),
                        category: Some(if military { "military" } else { "civil" }.to_string()),
                    }
                })
                .collect();
            let ships: Vec<Vessel> = (0..noise.count(0, 3))
                .map(|_| Vessel {
                    name: Some(noise.pick(VESSEL_NAMES).to_string()),
                    kind: Some("tanker".to_string()),
                    lat: Some(center.lat + noise.range(-2.0, 2.0)),
                    lon: Some(center.lon + noise.range(-2.0, 2.0)),
                })
                .collect();

            let hottest = anomalies.iter().map(|anomaly| anomaly.frp).fold(0.0, f64::max);
            let findings = vec![
                format!("{} thermal anomalies near {} (peak {:.1} MW)", anomalies.len(), zone.label, hottest),
                format!("{} aircraft and {} vessels tracked in theatre", aircraft.len(), ships.len()),
            ];
            let geoint = GeointReport {
                geoint_score: (hottest / 120.0).min(10.0),
                anomalies,
            };
            let sigint = SigintReport {
                sigint_score: (aircraft.len() + ships.len()) as f64,
                aircraft,
                ships,
            };
            (Some(geoint), Some(sigint), findings)
        }
        None => (
            None,
            None,
            vec![format!("No registered theatre matches '{}'", subject.trim())],
        ),
    };
    key_findings.push(format!("Brent moved {:+.2}% over the session", brent_change));

    let escalation_probability = (escalation_score / 100.0 * 0.8).clamp(0.05, 0.8);
    let scenarios = vec![
        Scenario {
            description: "Localized escalation within the theatre".to_string(),
            probability: (escalation_probability * 100.0).round() / 100.0,
        },
        Scenario {
            description: "Negotiated de-escalation".to_string(),
            probability: ((1.0 - escalation_probability) * 100.0).round() / 100.0,
        },
    ];

    ConflictReport {
        conflict: subject.to_string(),
        escalation_score: Some(escalation_score),
        threat_level: Some(level.to_string()),
        key_findings,
        scenarios,
        summary: Some(format!(
            "Composite escalation score {:.1} ({}) for {}.",
            escalation_score,
            level,
            subject.trim()
        )),
        finint: Some(finint),
        geoint,
        sigint,
    }
}

fn price(value: f64, change_pct: f64, now: DateTime<Utc>) -> PriceSnapshot {
    PriceSnapshot {
        price: Some(format!("{:.2}", value)),
        change_pct: Some(format!("{:+.2}", change_pct)),
        as_of: Some(now.format("%Y-%m-%d").to_string()),
    }
}
