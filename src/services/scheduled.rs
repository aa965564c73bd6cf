//! Background scraping sweeps.
//!
//! Unlike [`super::ScrapeService`], nothing here returns an error for a
//! single trip: failures are logged and folded into the outcome so one
//! broken trip never aborts a sweep.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{AlertService, ScrapeService, ServiceError};
use crate::models::CabinClass;
use crate::repository::TripRepository;

/// Result of one background trip scrape.
#[derive(Debug)]
pub enum BackgroundOutcome {
    Completed { snapshots: usize, alerts: usize },
    Failed { reason: String },
}

/// Totals for one sweep over all active trips.
#[derive(Debug, Default)]
pub struct SweepSummary {
    pub trips: usize,
    pub completed: usize,
    pub failed: usize,
    pub snapshots: usize,
    pub alerts: usize,
}

#[derive(Clone)]
pub struct ScheduledScrapeService {
    trips: TripRepository,
    scrape: ScrapeService,
    alerts: AlertService,
}

impl ScheduledScrapeService {
    pub fn new(trips: TripRepository, scrape: ScrapeService, alerts: AlertService) -> Self {
        Self {
            trips,
            scrape,
            alerts,
        }
    }

    /// (trip_id, user_id) pairs for trips that have not yet departed.
    pub async fn active_trips(&self) -> Result<Vec<(Uuid, Uuid)>, ServiceError> {
        Ok(self.trips.active_refs(Utc::now().date_naive()).await?)
    }

    /// Scrape one trip and run alert evaluation. Never fails: scrape
    /// errors become a Failed outcome and alert-check errors only lose
    /// the alert count, not the snapshots.
    pub async fn scrape_trip_background(
        &self,
        trip_id: Uuid,
        user_id: Uuid,
        provider: &str,
    ) -> BackgroundOutcome {
        let snapshots = match self
            .scrape
            .scrape_trip(trip_id, user_id, provider, CabinClass::Economy)
            .await
        {
            Ok(snapshots) => snapshots,
            Err(err) => {
                error!(trip_id = %trip_id, provider, error = %err, "background scrape failed");
                return BackgroundOutcome::Failed {
                    reason: err.to_string(),
                };
            }
        };

        let mut alert_count = 0;
        if !snapshots.is_empty() {
            match self.alerts.check_and_alert(trip_id, user_id, &snapshots).await {
                Ok(alerts) => alert_count = alerts.len(),
                Err(err) => {
                    error!(trip_id = %trip_id, error = %err, "alert check failed");
                }
            }
        }

        info!(
            trip_id = %trip_id,
            snapshots = snapshots.len(),
            alerts = alert_count,
            "background scrape complete"
        );
        BackgroundOutcome::Completed {
            snapshots: snapshots.len(),
            alerts: alert_count,
        }
    }

    /// Scrape every active trip with bounded concurrency.
    pub async fn run_sweep(&self, provider: &str, concurrency: usize) -> SweepSummary {
        let refs = match self.active_trips().await {
            Ok(refs) => refs,
            Err(err) => {
                error!(error = %err, "failed to list active trips");
                return SweepSummary::default();
            }
        };

        if refs.is_empty() {
            info!("no active trips to scrape");
            return SweepSummary::default();
        }

        let summary = Mutex::new(SweepSummary {
            trips: refs.len(),
            ..Default::default()
        });

        stream::iter(refs)
            .for_each_concurrent(concurrency.max(1), |(trip_id, user_id)| {
                let summary = &summary;
                async move {
                    let outcome = self.scrape_trip_background(trip_id, user_id, provider).await;
                    let mut summary = summary.lock().await;
                    match outcome {
                        BackgroundOutcome::Completed { snapshots, alerts } => {
                            summary.completed += 1;
                            summary.snapshots += snapshots;
                            summary.alerts += alerts;
                        }
                        BackgroundOutcome::Failed { reason } => {
                            summary.failed += 1;
                            warn!(trip_id = %trip_id, reason, "trip skipped in sweep");
                        }
                    }
                }
            })
            .await;

        summary.into_inner()
    }
}
