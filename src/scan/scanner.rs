//! Bounded-concurrency DNS scanning over a sequence range

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use super::{ScanItem, ScanOptions, ScanResult};
use crate::error::Result;
use crate::name::builder;
use crate::probe::HostProbe;
use crate::store::TemplateStore;
use crate::types::{DiscoveryConfig, ScanConfig};
use crate::validation_error;

/// Fans existence probes out over a sequence range, no more than the
/// configured number in flight at once.
pub struct RangeScanner {
    pub(super) templates: Arc<dyn TemplateStore>,
    pub(super) probe: Arc<dyn HostProbe>,
    pub(super) config: ScanConfig,
    pub(super) discovery: DiscoveryConfig,
}

impl RangeScanner {
    /// Create a scanner with default scan and discovery tuning
    pub fn new(templates: Arc<dyn TemplateStore>, probe: Arc<dyn HostProbe>) -> Self {
        Self::with_config(
            templates,
            probe,
            ScanConfig::default(),
            DiscoveryConfig::default(),
        )
    }

    /// Create a scanner with custom tuning
    pub fn with_config(
        templates: Arc<dyn TemplateStore>,
        probe: Arc<dyn HostProbe>,
        config: ScanConfig,
        discovery: DiscoveryConfig,
    ) -> Self {
        Self {
            templates,
            probe,
            config,
            discovery,
        }
    }

    /// Probe every sequence in `[start_seq, end_seq]` and report which of
    /// the rendered hostnames exist.
    ///
    /// Per-item render or probe failures are logged and omitted from the
    /// results; the scan itself keeps going. The call returns once every
    /// dispatched probe has completed.
    pub async fn scan(&self, options: ScanOptions) -> Result<ScanResult> {
        let started = Instant::now();

        if options.template_id <= 0 {
            return Err(validation_error!("invalid template ID"));
        }
        if options.end_seq < options.start_seq {
            return Err(validation_error!(
                "end sequence must be greater than or equal to start sequence"
            ));
        }
        let max_concurrent = if options.max_concurrent == 0 {
            self.config.max_concurrent
        } else {
            options.max_concurrent
        };

        let template = self.templates.get(options.template_id).await?;

        let semaphore = Arc::new(Semaphore::new(max_concurrent));
        let results: Mutex<Vec<ScanItem>> = Mutex::new(Vec::new());

        let tasks = (options.start_seq..=options.end_seq).map(|sequence| {
            let semaphore = Arc::clone(&semaphore);
            let template = &template;
            let params = &options.params;
            let probe = &self.probe;
            let results = &results;
            async move {
                // A closed semaphore means the scan is being torn down;
                // just stop issuing probes.
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };

                let hostname = match builder::render(template, sequence, params) {
                    Ok(name) => name,
                    Err(e) => {
                        tracing::error!(sequence, error = %e, "failed to generate hostname");
                        return;
                    }
                };

                match probe.check(&hostname).await {
                    Ok(outcome) => {
                        results.lock().push(ScanItem {
                            hostname,
                            exists: outcome.exists,
                            ip_address: outcome.ip_address,
                        });
                    }
                    Err(e) => {
                        tracing::error!(hostname = %hostname, error = %e, "failed to check hostname in DNS");
                    }
                }
            }
        });
        join_all(tasks).await;

        let results = results.into_inner();
        let existing_hostnames = results.iter().filter(|item| item.exists).count();
        let scan_duration = started.elapsed();

        tracing::info!(
            template = %template.name,
            total = results.len(),
            existing = existing_hostnames,
            duration_ms = scan_duration.as_millis() as u64,
            "DNS range scan completed"
        );

        Ok(ScanResult {
            template_id: options.template_id,
            template_name: template.name,
            total_hostnames: results.len(),
            existing_hostnames,
            scan_duration,
            results,
        })
    }
}
