//! Pure metric math: deltas, time decay, derived mood, levels and alerts.
//!
//! Nothing in here touches storage or the clock; callers pass `now` and the
//! elapsed time explicitly so the rules are easy to test.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::pet::{MetricDelta, PetMetrics, PetStage, PetState, METRIC_MAX, METRIC_MIN};

/// Hunger at or above which a pet is considered hungry.
pub const HUNGRY_THRESHOLD: f64 = 80.0;
/// Happiness at or below which a pet triggers a sadness alert.
pub const SAD_THRESHOLD: f64 = 20.0;
/// Health at or below which a pet triggers a sickness alert.
pub const SICK_THRESHOLD: f64 = 30.0;

pub const XP_PER_LEVEL: u64 = 100;

fn clamp(value: f64) -> f64 {
    value.clamp(METRIC_MIN, METRIC_MAX)
}

/// Starting metrics for a new pet.
pub fn initial_metrics(currency: i64, now: DateTime<Utc>) -> PetMetrics {
    PetMetrics {
        happiness: 50.0,
        hunger: 50.0,
        health: 100.0,
        energy: 50.0,
        currency,
        total_currency_earned: currency,
        total_currency_spent: 0,
        happiness_modifier: 1.0,
        health_modifier: 1.0,
        energy_modifier: 1.0,
        last_decay_at: now,
    }
}

/// Apply `delta` to `metrics`, clamping every bounded metric.
///
/// Positive happiness, health and energy changes are scaled by the matching
/// modifier. Returns what was actually applied after clamping.
pub fn apply_delta(metrics: &mut PetMetrics, delta: &MetricDelta) -> MetricDelta {
    fn step(current: &mut f64, change: Option<f64>, modifier: f64) -> Option<f64> {
        let change = change?;
        let scaled = if change > 0.0 { change * modifier } else { change };
        let before = *current;
        *current = clamp(before + scaled);
        Some(*current - before)
    }

    MetricDelta {
        happiness: step(&mut metrics.happiness, delta.happiness, metrics.happiness_modifier),
        hunger: step(&mut metrics.hunger, delta.hunger, 1.0),
        health: step(&mut metrics.health, delta.health, metrics.health_modifier),
        energy: step(&mut metrics.energy, delta.energy, metrics.energy_modifier),
    }
}

/// Apply `hours` of time decay at `rate` points per hour.
///
/// Health drops while the pet is neglected (hungry or miserable) and slowly
/// recovers while it is well fed. Returns the applied change.
pub fn decay(metrics: &mut PetMetrics, hours: f64, rate: f64, sleeping: bool) -> MetricDelta {
    if hours <= 0.0 || !hours.is_finite() {
        return MetricDelta::default();
    }
    let amount = rate * hours;
    let before = metrics.clone();

    metrics.hunger = clamp(metrics.hunger + amount);
    metrics.happiness = clamp(metrics.happiness - amount);
    metrics.energy = if sleeping {
        clamp(metrics.energy + 2.0 * amount)
    } else {
        clamp(metrics.energy - amount)
    };

    let neglected =
        before.hunger >= HUNGRY_THRESHOLD || before.happiness <= SAD_THRESHOLD;
    if neglected {
        metrics.health = clamp(metrics.health - amount);
    } else if before.hunger < 50.0 {
        metrics.health = clamp(metrics.health + amount / 2.0);
    }

    MetricDelta {
        happiness: Some(metrics.happiness - before.happiness),
        hunger: Some(metrics.hunger - before.hunger),
        health: Some(metrics.health - before.health),
        energy: Some(metrics.energy - before.energy),
    }
}

/// Mood shown to co-owners, checked in priority order.
pub fn derive_state(metrics: &PetMetrics, sleeping: bool) -> PetState {
    if sleeping {
        PetState::Sleeping
    } else if metrics.health < 30.0 {
        PetState::Sick
    } else if metrics.hunger >= HUNGRY_THRESHOLD {
        PetState::Hungry
    } else if metrics.energy < 20.0 {
        PetState::Tired
    } else if metrics.happiness < 30.0 {
        PetState::Sad
    } else if metrics.happiness >= 80.0 && metrics.energy >= 60.0 {
        PetState::Playful
    } else if metrics.happiness >= 70.0 {
        PetState::Happy
    } else {
        PetState::Neutral
    }
}

pub fn level_for_experience(xp: u64) -> u32 {
    let level = 1 + xp / XP_PER_LEVEL;
    u32::try_from(level).unwrap_or(u32::MAX)
}

pub fn stage_for_level(level: u32) -> PetStage {
    match level {
        0..=4 => PetStage::Kitten,
        5..=9 => PetStage::Young,
        10..=19 => PetStage::Adult,
        _ => PetStage::Senior,
    }
}

/// Care alert raised when a metric crosses its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alert {
    Hungry,
    Sad,
    Sick,
}

impl Alert {
    pub fn message(&self, pet_name: &str) -> String {
        match self {
            Self::Hungry => format!("{pet_name} is hungry!"),
            Self::Sad => format!("{pet_name} is feeling sad."),
            Self::Sick => format!("{pet_name} is sick and needs care!"),
        }
    }
}

/// Alerts currently active for `metrics`.
pub fn alerts(metrics: &PetMetrics) -> Vec<Alert> {
    let mut out = Vec::new();
    if metrics.hunger >= HUNGRY_THRESHOLD {
        out.push(Alert::Hungry);
    }
    if metrics.happiness <= SAD_THRESHOLD {
        out.push(Alert::Sad);
    }
    if metrics.health <= SICK_THRESHOLD {
        out.push(Alert::Sick);
    }
    out
}

/// Alerts active in `after` that were not active in `before`.
pub fn crossed_alerts(before: &PetMetrics, after: &PetMetrics) -> Vec<Alert> {
    let previous = alerts(before);
    alerts(after)
        .into_iter()
        .filter(|a| !previous.contains(a))
        .collect()
}
