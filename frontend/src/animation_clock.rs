//! Shared animation phase
//!
//! A single counter drives every pulse and dash animation on the map. It is
//! advanced by one timer task per view and never by network events, so
//! animation keeps running while the feed is down.

use crate::dataflow::Actor;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};

pub const TICK_INTERVAL: Duration = Duration::from_millis(50);
pub const PHASE_PERIOD: u32 = 60;

const PULSE_AMPLITUDE: f64 = 0.4;
const PULSE_FREQUENCY: f64 = 0.15;
const DASH_SPEED: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnimationPhase(u32);

impl AnimationPhase {
    pub const fn new(value: u32) -> Self {
        Self(value % PHASE_PERIOD)
    }

    pub fn value(self) -> u32 {
        self.0
    }

    pub fn next(self) -> Self {
        Self((self.0 + 1) % PHASE_PERIOD)
    }
}

/// Stable per-entity phase offset: the base-36 value of the id's leading
/// alphanumeric run, reduced modulo [`PHASE_PERIOD`].
///
/// `"us-iran"` reads as `"us"`, `"link-4"` as `"link"`.
pub fn entity_offset(id: &str) -> u32 {
    id.chars()
        .map_while(|c| c.to_digit(36))
        .fold(0, |acc, digit| (acc * 36 + digit) % PHASE_PERIOD)
}

/// Radius multiplier for pulsing glyphs, in `[0.6, 1.4]`.
pub fn pulse_scale(phase: AnimationPhase, offset: u32) -> f64 {
    1.0 + PULSE_AMPLITUDE * ((phase.0 + offset) as f64 * PULSE_FREQUENCY).sin()
}

/// Stroke dash offset for link marching ants.
pub fn dash_offset(phase: AnimationPhase) -> f64 {
    -DASH_SPEED * phase.0 as f64
}

/// Periodic phase source. Dropping every clone (or calling [`stop`]) cancels
/// the timer.
///
/// [`stop`]: AnimationClock::stop
#[derive(Clone, Debug)]
pub struct AnimationClock {
    phase: Actor<AnimationPhase>,
}

impl AnimationClock {
    pub fn start(tick_interval: Duration) -> Self {
        let tick_interval = tick_interval.max(Duration::from_millis(1));
        let phase = Actor::new(AnimationPhase::default(), async move |state| {
            let mut ticker = tokio::time::interval_at(Instant::now() + tick_interval, tick_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                state.send_modify(|phase| *phase = phase.next());
            }
        });
        Self { phase }
    }

    pub fn phase(&self) -> AnimationPhase {
        self.phase.snapshot()
    }

    pub fn phase_signal(&self) -> tokio::sync::watch::Receiver<AnimationPhase> {
        self.phase.signal()
    }

    pub fn is_running(&self) -> bool {
        self.phase.is_running()
    }

    pub fn stop(&self) {
        self.phase.stop();
    }
}
