//! Sequence-range discovery and usage sampling

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use super::RangeScanner;
use crate::error::{HostForgeError, Result};
use crate::name::builder;
use crate::types::Template;
use crate::validation_error;

impl RangeScanner {
    /// Find the contiguous block of sequence numbers currently present in
    /// DNS for a template, without being told the range.
    ///
    /// Probes a small window from the template's configured start, then
    /// widens by striding forward until a hit or the search envelope is
    /// exhausted. From the first hit the lower bound is walked down while
    /// names keep resolving, and the upper bound walked up until
    /// `miss_tolerance` consecutive names fail to resolve, so sparse gaps
    /// do not cut the range short. Probe cost is traded for robustness;
    /// callers that know their range should scan it explicitly.
    pub async fn discover_range(
        &self,
        template_id: i64,
        params: &HashMap<String, String>,
    ) -> Result<(i64, i64)> {
        let template = self.templates.get(template_id).await?;
        let start = template.sequence_start;

        let mut first_hit = None;
        for sequence in start..start + self.discovery.probe_window as i64 {
            if self.sequence_exists(&template, sequence, params).await {
                first_hit = Some(sequence);
                break;
            }
        }

        if first_hit.is_none() {
            let mut sequence = start;
            let envelope_end = start + self.discovery.search_envelope as i64;
            while sequence <= envelope_end {
                if self.sequence_exists(&template, sequence, params).await {
                    first_hit = Some(sequence);
                    break;
                }
                sequence += self.discovery.stride as i64;
            }
        }

        let Some(hit) = first_hit else {
            return Err(HostForgeError::DiscoveryFailed { template_id });
        };

        let mut lowest = hit;
        let mut sequence = hit - 1;
        while sequence >= start {
            if !self.sequence_exists(&template, sequence, params).await {
                break;
            }
            lowest = sequence;
            sequence -= 1;
        }

        let mut highest = hit;
        let mut misses = 0usize;
        let mut sequence = hit + 1;
        let upper_guard = hit + self.discovery.search_envelope as i64;
        while sequence <= upper_guard {
            if self.sequence_exists(&template, sequence, params).await {
                highest = sequence;
                misses = 0;
            } else {
                misses += 1;
                if misses >= self.discovery.miss_tolerance {
                    break;
                }
            }
            sequence += 1;
        }

        tracing::debug!(
            template = %template.name,
            lowest,
            highest,
            "discovered in-use sequence range"
        );

        Ok((lowest, highest))
    }

    /// Sample DNS usage for a template, bucketing existing names by their
    /// uppercased two-character prefix.
    ///
    /// The window comes from [`discover_range`](Self::discover_range); when
    /// discovery finds nothing the sampler falls back to a window of
    /// `sample_size` sequences from the template's start. Either way the
    /// window is capped at `sample_size`.
    pub async fn analyze_usage(
        &self,
        template_id: i64,
        sample_size: usize,
    ) -> Result<HashMap<String, usize>> {
        let template = self.templates.get(template_id).await?;
        if template.groups.is_empty() {
            return Err(validation_error!("template has no groups"));
        }
        if sample_size == 0 {
            return Err(validation_error!("sample size must be positive"));
        }

        let params = HashMap::new();
        let (low, mut high) = match self.discover_range(template_id, &params).await {
            Ok(range) => range,
            Err(HostForgeError::DiscoveryFailed { .. }) => {
                let low = template.sequence_start;
                (low, low + sample_size as i64 - 1)
            }
            Err(e) => return Err(e),
        };
        if high - low + 1 > sample_size as i64 {
            high = low + sample_size as i64 - 1;
        }

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent));
        let usage: Mutex<HashMap<String, usize>> = Mutex::new(HashMap::new());

        let tasks = (low..=high).map(|sequence| {
            let semaphore = Arc::clone(&semaphore);
            let template = &template;
            let params = &params;
            let usage = &usage;
            async move {
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };
                let Ok(hostname) = builder::render(template, sequence, params) else {
                    return;
                };
                match self.probe.check(&hostname).await {
                    Ok(outcome) if outcome.exists => {
                        let prefix = prefix_key(&hostname);
                        *usage.lock().entry(prefix).or_insert(0) += 1;
                    }
                    _ => {}
                }
            }
        });
        join_all(tasks).await;

        Ok(usage.into_inner())
    }

    async fn sequence_exists(
        &self,
        template: &Template,
        sequence: i64,
        params: &HashMap<String, String>,
    ) -> bool {
        let Ok(hostname) = builder::render(template, sequence, params) else {
            return false;
        };
        match self.probe.check(&hostname).await {
            Ok(outcome) => outcome.exists,
            Err(_) => false,
        }
    }
}

fn prefix_key(hostname: &str) -> String {
    let prefix: String = hostname.chars().take(2).collect();
    if prefix.chars().count() < 2 {
        String::new()
    } else {
        prefix.to_uppercase()
    }
}
