//! Background maintenance: decay, task expiry and stale connection sweeps,
//! plus the process-wide shutdown signal.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::decay::DecayReport;
use super::engine::PetEngine;

/// Broadcast shutdown notification shared by the server and background tasks.
#[derive(Clone)]
pub struct ShutdownSignal {
    sender: broadcast::Sender<()>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }

    pub fn shutdown(&self) {
        let _ = self.sender.send(());
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Install Ctrl-C / SIGTERM handlers that trigger the returned signal.
pub fn listen_for_shutdown() -> ShutdownSignal {
    let shutdown = ShutdownSignal::new();
    let trigger = shutdown.clone();

    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    error!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
            _ = terminate => info!("Received SIGTERM, shutting down"),
        }
        trigger.shutdown();
    });

    shutdown
}

#[derive(Debug, Clone, Default)]
pub struct MaintenanceReport {
    pub decay: DecayReport,
    pub tasks_expired: usize,
    pub clients_swept: usize,
}

impl PetEngine {
    /// One maintenance pass at `now`.
    pub async fn run_maintenance(&self, now: DateTime<Utc>) -> MaintenanceReport {
        let mut report = MaintenanceReport::default();
        match self.run_decay(now).await {
            Ok(decay) => report.decay = decay,
            Err(e) => warn!(error = %e, "Decay pass failed"),
        }
        match self.expire_tasks(now).await {
            Ok(n) => report.tasks_expired = n,
            Err(e) => warn!(error = %e, "Task expiry pass failed"),
        }
        report.clients_swept = self.hub.sweep_stale(now).len();
        debug!(
            updated = report.decay.pets_updated,
            expired = report.tasks_expired,
            swept = report.clients_swept,
            "Maintenance pass finished"
        );
        report
    }
}

/// Run maintenance every `every` until `shutdown` fires.
pub fn spawn_maintenance(engine: PetEngine, every: Duration, shutdown: ShutdownSignal) -> JoinHandle<()> {
    let mut stop = shutdown.subscribe();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        interval.tick().await;
        info!(interval_secs = every.as_secs(), "Maintenance task started");
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    engine.run_maintenance(Utc::now()).await;
                }
                _ = stop.recv() => {
                    info!("Maintenance task stopped");
                    break;
                }
            }
        }
    })
}
