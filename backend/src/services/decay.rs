//! Time-based metric decay across all pets.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::engine::{Committed, EngineResult, PetEngine};
use crate::models::pet::PetRecord;
use crate::models::social::{NotificationKind, Priority};
use crate::services::metrics::{self, Alert};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DecayReport {
    pub pets_processed: usize,
    pub pets_updated: usize,
    pub alerts_sent: usize,
    pub achievements_unlocked: usize,
    pub failures: usize,
}

fn alert_notification(alert: Alert) -> (NotificationKind, Priority, &'static str) {
    match alert {
        Alert::Hungry => (NotificationKind::PetHungry, Priority::High, "Pet is hungry"),
        Alert::Sad => (NotificationKind::PetSad, Priority::High, "Pet is sad"),
        Alert::Sick => (NotificationKind::PetSick, Priority::Critical, "Pet is sick"),
    }
}

/// Decay one record in place for the time elapsed up to `now`.
pub(crate) fn decay_record(pet: &mut PetRecord, now: DateTime<Utc>, rate: f64) {
    let elapsed = now - pet.metrics.last_decay_at;
    let hours = elapsed.num_milliseconds() as f64 / 3_600_000.0;
    if hours <= 0.0 {
        return;
    }
    metrics::decay(&mut pet.metrics, hours, rate, pet.is_sleeping);
    pet.metrics.last_decay_at = now;
}

impl PetEngine {
    /// Apply decay to every pet for the time since its last decay.
    pub async fn run_decay(&self, now: DateTime<Utc>) -> EngineResult<DecayReport> {
        let rate = self.config.metric_decay_rate;
        let mut report = DecayReport::default();

        for pet_id in self.repo.list_pet_ids().await? {
            report.pets_processed += 1;
            let committed = match self
                .mutate_pet_as_system(pet_id, |pet| {
                    decay_record(pet, now, rate);
                    Ok(())
                })
                .await
            {
                Ok(committed) => committed,
                Err(e) => {
                    warn!(pet_id = %pet_id, error = %e, "Decay failed");
                    report.failures += 1;
                    continue;
                }
            };
            if committed.changed() {
                report.pets_updated += 1;
                report.alerts_sent += self.announce_decay(&committed).await;
            }
            // Age-based achievements progress with the clock alone.
            for member in committed.pet.member_ids() {
                report.achievements_unlocked +=
                    self.evaluate_achievements_at(member, pet_id, now).await.len();
            }
        }

        if report.pets_updated > 0 || report.achievements_unlocked > 0 {
            info!(
                processed = report.pets_processed,
                updated = report.pets_updated,
                alerts = report.alerts_sent,
                achievements = report.achievements_unlocked,
                "Decay pass finished"
            );
        }
        Ok(report)
    }

    /// Record, publish and alert on one decayed pet. Returns the number of
    /// notifications sent.
    async fn announce_decay(&self, committed: &Committed<()>) -> usize {
        let pet = &committed.pet;
        self.record_snapshot(pet, "decay", None).await;
        self.publish(committed);

        let mut sent = 0;
        for alert in metrics::crossed_alerts(&committed.before.metrics, &pet.metrics) {
            let (kind, priority, title) = alert_notification(alert);
            debug!(pet_id = %pet.id, ?alert, "Alert threshold crossed");
            for owner in pet.member_ids() {
                self.notify(
                    owner,
                    kind,
                    title.to_string(),
                    alert.message(&pet.name),
                    priority,
                    Some(pet.id),
                )
                .await;
                sent += 1;
            }
        }
        sent
    }
}
