//! Advisory sequence number allocation

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::HostnameStore;
use crate::types::{HostnameStatus, Template};

/// Sequence number usage for a template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceUsage {
    pub template_id: i64,
    pub total_sequences: usize,
    /// Sequences held by reserved or committed hostnames
    pub used_sequences: usize,
    pub next_sequence: i64,
    pub highest_sequence: i64,
    pub lowest_sequence: i64,
}

/// Computes the next unused sequence number for a template.
///
/// The answer is advisory: nothing is locked, and two callers asking at the
/// same time receive the same number. Collisions surface later, when the
/// rendered name hits the store's unique-name constraint.
pub struct SequenceAllocator {
    hostnames: Arc<dyn HostnameStore>,
}

impl SequenceAllocator {
    pub fn new(hostnames: Arc<dyn HostnameStore>) -> Self {
        Self { hostnames }
    }

    /// Next sequence for a template: one past the highest allocated, or the
    /// template's configured start when nothing has been allocated yet.
    pub async fn next_sequence(&self, template: &Template) -> Result<i64> {
        Ok(match self.hostnames.max_sequence(template.id).await? {
            Some(max) => max + 1,
            None => template.sequence_start,
        })
    }

    /// Usage statistics over every hostname of a template
    pub async fn usage(&self, template: &Template) -> Result<SequenceUsage> {
        let hostnames = self.hostnames.get_by_template(template.id, 0, 0).await?;

        let mut usage = SequenceUsage {
            template_id: template.id,
            total_sequences: hostnames.len(),
            used_sequences: 0,
            next_sequence: template.sequence_start,
            highest_sequence: 0,
            lowest_sequence: 0,
        };

        if hostnames.is_empty() {
            return Ok(usage);
        }

        usage.lowest_sequence = hostnames[0].sequence_num;
        usage.highest_sequence = hostnames[0].sequence_num;
        for hostname in &hostnames {
            if matches!(
                hostname.status,
                HostnameStatus::Reserved | HostnameStatus::Committed
            ) {
                usage.used_sequences += 1;
            }
            usage.highest_sequence = usage.highest_sequence.max(hostname.sequence_num);
            usage.lowest_sequence = usage.lowest_sequence.min(hostname.sequence_num);
        }
        usage.next_sequence = self.next_sequence(template).await?;

        Ok(usage)
    }

    /// Unallocated sequence numbers between the lowest and highest in use,
    /// capped at `max_gaps`. Empty when the template has no hostnames.
    pub async fn find_gaps(&self, template: &Template, max_gaps: usize) -> Result<Vec<i64>> {
        let hostnames = self.hostnames.get_by_template(template.id, 0, 0).await?;
        if hostnames.is_empty() {
            return Ok(Vec::new());
        }

        let used: HashSet<i64> = hostnames.iter().map(|h| h.sequence_num).collect();
        let (min, max) = used
            .iter()
            .fold((i64::MAX, i64::MIN), |(lo, hi), &seq| (lo.min(seq), hi.max(seq)));

        let mut gaps = Vec::new();
        for seq in min..=max {
            if gaps.len() >= max_gaps {
                break;
            }
            if !used.contains(&seq) {
                gaps.push(seq);
            }
        }
        Ok(gaps)
    }
}
