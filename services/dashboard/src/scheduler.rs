//! Ingestion scheduling with per-source daily triggers and freshness
//! markers.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{error, info, warn};

use storage::AdvisoryStore;

use crate::ingest::{self, DustBatch, PollenBatch};
use crate::sources::{DustClient, PollenClient};

/// Date/timestamp of the most recently ingested batch per source.
///
/// Written only after a successful, complete persist; read by the
/// dashboard aggregator. Not persisted across restarts, so the first run
/// after a restart may re-ingest one batch per source.
#[derive(Debug, Default)]
pub struct FreshnessMarkers {
    pollen: RwLock<Option<NaiveDate>>,
    dust: RwLock<Option<NaiveDateTime>>,
}

impl FreshnessMarkers {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn pollen_date(&self) -> Option<NaiveDate> {
        *self.pollen.read().await
    }

    pub async fn dust_time(&self) -> Option<NaiveDateTime> {
        *self.dust.read().await
    }

    async fn set_pollen(&self, date: NaiveDate) {
        *self.pollen.write().await = Some(date);
    }

    async fn set_dust(&self, time: NaiveDateTime) {
        *self.dust.write().await = Some(time);
    }
}

/// Persist a pollen batch unless the freshness marker says its forecast
/// date was already ingested. Returns true when a batch was persisted.
pub async fn apply_pollen_batch(
    store: &AdvisoryStore,
    markers: &FreshnessMarkers,
    batch: PollenBatch,
) -> Result<bool> {
    match batch {
        PollenBatch::Empty => {
            info!("Pollen payload flattened to zero records, nothing to ingest");
            Ok(false)
        }
        PollenBatch::Ready {
            forecast_date,
            records,
        } => {
            if markers.pollen_date().await == Some(forecast_date) {
                info!(date = %forecast_date, "No new pollen data to ingest");
                return Ok(false);
            }

            store.insert_pollen_batch(&records).await?;
            markers.set_pollen(forecast_date).await;

            info!(
                date = %forecast_date,
                count = records.len(),
                "Persisted pollen forecast batch"
            );
            Ok(true)
        }
    }
}

/// Persist a dust batch unless the freshness marker says its observation
/// timestamp was already ingested. Returns true when a batch was persisted.
pub async fn apply_dust_batch(
    store: &AdvisoryStore,
    markers: &FreshnessMarkers,
    batch: DustBatch,
) -> Result<bool> {
    match batch {
        DustBatch::Empty => {
            info!("Dust payload reduced to zero sites, nothing to ingest");
            Ok(false)
        }
        DustBatch::Ready {
            observed_at,
            records,
        } => {
            if markers.dust_time().await == Some(observed_at) {
                info!(time = %observed_at, "No new dust data to ingest");
                return Ok(false);
            }

            store.insert_dust_batch(&records).await?;
            markers.set_dust(observed_at).await;

            info!(
                time = %observed_at,
                count = records.len(),
                "Persisted dust advisory batch"
            );
            Ok(true)
        }
    }
}

/// Seconds until the next daily occurrence of `target`, from `now`.
fn delay_until(now: NaiveTime, target: NaiveTime) -> Duration {
    let mut secs = (target - now).num_seconds();
    if secs <= 0 {
        secs += 86_400;
    }
    Duration::from_secs(secs as u64)
}

enum Due {
    Pollen,
    Dust,
}

/// Scheduler coordinating both ingestion workflows.
pub struct IngestScheduler {
    store: Arc<AdvisoryStore>,
    markers: Arc<FreshnessMarkers>,
    pollen_client: PollenClient,
    dust_client: DustClient,
    pollen_at: NaiveTime,
    dust_at: NaiveTime,
    pollen_running: Mutex<()>,
    dust_running: Mutex<()>,
}

impl IngestScheduler {
    pub fn new(
        store: Arc<AdvisoryStore>,
        markers: Arc<FreshnessMarkers>,
        pollen_client: PollenClient,
        dust_client: DustClient,
        pollen_at: NaiveTime,
        dust_at: NaiveTime,
    ) -> Self {
        Self {
            store,
            markers,
            pollen_client,
            dust_client,
            pollen_at,
            dust_at,
            pollen_running: Mutex::new(()),
            dust_running: Mutex::new(()),
        }
    }

    /// Run one pollen ingestion cycle: fetch, normalize, persist-if-fresh.
    ///
    /// A fetch or parse failure aborts the run without touching state; the
    /// next scheduled trigger retries naturally.
    pub async fn run_pollen_once(&self) {
        let Ok(_guard) = self.pollen_running.try_lock() else {
            warn!("Previous pollen run still in progress, skipping trigger");
            return;
        };

        let response = match self.pollen_client.fetch_forecast().await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Pollen fetch failed, waiting for next scheduled run");
                return;
            }
        };

        if response.daily_info.is_none() {
            warn!("Pollen response carries no dailyInfo, nothing to ingest");
            return;
        }

        let batch = ingest::normalize_pollen(&response);
        if let Err(e) = apply_pollen_batch(&self.store, &self.markers, batch).await {
            error!(error = %e, "Failed to persist pollen batch");
        }
    }

    /// Run one dust ingestion cycle: fetch, normalize, persist-if-fresh.
    pub async fn run_dust_once(&self) {
        let Ok(_guard) = self.dust_running.try_lock() else {
            warn!("Previous dust run still in progress, skipping trigger");
            return;
        };

        let response = match self.dust_client.fetch_sites().await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Dust fetch failed, waiting for next scheduled run");
                return;
            }
        };

        if response.records.is_none() {
            warn!("Dust response carries no records, nothing to ingest");
            return;
        }

        let batch = ingest::normalize_dust(&response, Local::now().naive_local());
        if let Err(e) = apply_dust_batch(&self.store, &self.markers, batch).await {
            error!(error = %e, "Failed to persist dust batch");
        }
    }

    /// Run both workflows a single time (for `--once` mode).
    pub async fn run_once(&self) {
        self.run_pollen_once().await;
        self.run_dust_once().await;
    }

    /// Run forever, triggering each workflow at its daily local time.
    pub async fn run_forever(&self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            pollen_at = %self.pollen_at,
            dust_at = %self.dust_at,
            "Starting ingestion schedule"
        );

        loop {
            let now = Local::now().time();
            let pollen_delay = delay_until(now, self.pollen_at);
            let dust_delay = delay_until(now, self.dust_at);

            let (delay, due) = if pollen_delay <= dust_delay {
                (pollen_delay, Due::Pollen)
            } else {
                (dust_delay, Due::Dust)
            };

            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Shutting down scheduler");
                    break;
                }
                _ = tokio::time::sleep(delay) => {
                    match due {
                        Due::Pollen => self.run_pollen_once().await,
                        Due::Dust => self.run_dust_once().await,
                    }
                }
            }
        }
    }
}
