use crate::config::PlayerdataConfig;
use crate::lifecycle::{PersistentData, SweepReport};
use std::sync::Weak;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

/// Periodically saves every active entity's working copy
///
/// Holds only a weak handle so a dropped coordinator ends the loop.
pub struct AutoSaveManager {
    data: Weak<PersistentData>,
    period: Option<Duration>,
}

impl AutoSaveManager {
    pub fn new(data: Weak<PersistentData>, config: &PlayerdataConfig) -> Self {
        Self {
            data,
            period: config.auto_save_period(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.period.is_some()
    }

    /// Run the autosave loop
    ///
    /// The first save happens one full period after start. Runs until the
    /// task is aborted, shutdown begins, or the coordinator is dropped.
    pub async fn run_autosave_loop(&self) {
        let Some(period) = self.period else {
            info!("Autosave disabled, exiting loop");
            return;
        };

        info!(period_ms = period.as_millis() as u64, "Starting autosave");

        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            timer.tick().await;

            if self.save_once().await.is_none() {
                info!("Autosave loop stopped");
                return;
            }
        }
    }

    /// One sweep on the blocking pool; `None` once the coordinator is gone
    /// or shutting down
    async fn save_once(&self) -> Option<SweepReport> {
        let data = self.data.upgrade()?;
        if data.is_shutting_down() {
            return None;
        }

        let report = match tokio::task::spawn_blocking(move || data.save_active()).await {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "Autosave sweep panicked");
                SweepReport::default()
            }
        };

        if report.failed > 0 {
            error!(
                saved = report.saved,
                failed = report.failed,
                "Autosave finished with failures"
            );
        } else {
            debug!(saved = report.saved, skipped = report.skipped, "Autosave complete");
        }
        Some(report)
    }
}
