//! Progress reporting to an external monitoring service

use std::error::Error;

/// Opaque caller context forwarded to the monitoring collaborator untouched
#[derive(Debug, Clone, Default)]
pub struct MonitoringContext {
    /// Organization identifier
    pub org: String,
    /// User identifier
    pub user: String,
    /// Scenario identifier
    pub scenario: String,
}

impl MonitoringContext {
    /// Context with an organization and user
    pub fn new(org: &str, user: &str) -> Self {
        MonitoringContext {
            org: org.to_string(),
            user: user.to_string(),
            scenario: String::new(),
        }
    }

    /// Attach a scenario identifier
    pub fn with_scenario(mut self, scenario: &str) -> Self {
        self.scenario = scenario.to_string();
        self
    }
}

/// Collaborator notified after every flushed batch.
///
/// Reporting is fire-and-forget from the exporter's perspective: a failed
/// update is logged and never affects the export outcome. `total_batches`
/// is the up-front estimate and is not corrected mid-stream, so
/// `current_batch` can exceed it when the caller's record count was wrong.
pub trait ProgressReporter {
    /// Report that `current_batch` of `total_batches` has been flushed
    fn update_progress(
        &self,
        context: &MonitoringContext,
        correlation_id: &str,
        monitoring_id: &str,
        current_batch: u64,
        total_batches: u64,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}
