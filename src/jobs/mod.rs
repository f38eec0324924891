//! Scheduled Jobs
//!
//! Background jobs that keep cached upstream data warm.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{interval, MissedTickBehavior};

use crate::catalog::{normalize, CatalogClient, CatalogError};

// =========================================================================
// Catalog Refresh Job
// =========================================================================

/// Fetch the shop catalog and replace the cached copy.
/// Returns the number of offers in the new document.
pub async fn refresh_catalog(catalog: &CatalogClient) -> Result<usize, CatalogError> {
    let document = catalog.refresh().await?;
    let offers = normalize(&document).len();

    tracing::debug!(offers = offers, "Catalog cache refreshed");

    Ok(offers)
}

// =========================================================================
// Job Scheduler
// =========================================================================

/// Configuration for job scheduler
#[derive(Debug, Clone)]
pub struct JobSchedulerConfig {
    /// Interval for catalog refresh (default: 30 seconds)
    pub catalog_refresh_interval: Duration,
}

impl Default for JobSchedulerConfig {
    fn default() -> Self {
        Self {
            catalog_refresh_interval: Duration::from_secs(30),
        }
    }
}

/// Job Scheduler - runs periodic background tasks
pub struct JobScheduler {
    catalog: Arc<CatalogClient>,
    config: JobSchedulerConfig,
}

impl JobScheduler {
    /// Create a scheduler refreshing the catalog once per TTL
    pub fn new(catalog: Arc<CatalogClient>) -> Self {
        let config = JobSchedulerConfig {
            catalog_refresh_interval: catalog.ttl(),
        };
        Self { catalog, config }
    }

    /// Start the job scheduler in the background
    /// Returns a handle that can be used to abort the scheduler
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Run the scheduler loop
    async fn run(&self) {
        tracing::info!(
            interval_secs = self.config.catalog_refresh_interval.as_secs(),
            "Job scheduler started"
        );

        let mut catalog_interval = interval(self.config.catalog_refresh_interval);
        catalog_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            catalog_interval.tick().await;
            if let Err(e) = refresh_catalog(&self.catalog).await {
                tracing::warn!(error = %e, "Catalog refresh failed");
            }
        }
    }

    /// Run all jobs once (for manual trigger or testing)
    pub async fn run_all_once(&self) -> JobReport {
        let mut report = JobReport::default();

        match refresh_catalog(&self.catalog).await {
            Ok(offers) => report.catalog_offers = Some(offers),
            Err(e) => report.errors.push(format!("Catalog refresh: {}", e)),
        }

        report.completed_at = Utc::now();
        report
    }
}

/// Report from running background jobs
#[derive(Debug, Clone, Default)]
pub struct JobReport {
    pub catalog_offers: Option<usize>,
    pub errors: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_job_scheduler_config_default() {
        let config = JobSchedulerConfig::default();
        assert_eq!(config.catalog_refresh_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_job_report_default() {
        let report = JobReport::default();
        assert!(report.catalog_offers.is_none());
        assert_eq!(report.errors.len(), 0);
    }

    #[tokio::test]
    async fn test_run_all_once_refreshes_catalog() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "entries": [
                    { "offerId": "a", "finalPrice": 100, "bundle": { "name": "A" } },
                    { "offerId": "b", "finalPrice": 200, "bundle": { "name": "B" } }
                ]}
            })))
            .mount(&server)
            .await;

        let catalog =
            Arc::new(CatalogClient::new(server.uri(), None, Duration::from_secs(45)).unwrap());
        let scheduler = JobScheduler::new(catalog.clone());
        assert_eq!(scheduler.config.catalog_refresh_interval, Duration::from_secs(45));

        let report = scheduler.run_all_once().await;
        assert_eq!(report.catalog_offers, Some(2));
        assert!(report.errors.is_empty());
        assert_eq!(catalog.items().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_run_all_once_reports_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let catalog =
            Arc::new(CatalogClient::new(server.uri(), None, Duration::from_secs(30)).unwrap());
        let report = JobScheduler::new(catalog).run_all_once().await;

        assert!(report.catalog_offers.is_none());
        assert_eq!(report.errors.len(), 1);
    }
}
