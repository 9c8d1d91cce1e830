//! Core types and structures for hostforge

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{HostForgeError, Result};

/// Lifecycle status of a hostname record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostnameStatus {
    Available,
    Reserved,
    Committed,
    Released,
}

impl std::fmt::Display for HostnameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostnameStatus::Available => write!(f, "available"),
            HostnameStatus::Reserved => write!(f, "reserved"),
            HostnameStatus::Committed => write!(f, "committed"),
            HostnameStatus::Released => write!(f, "released"),
        }
    }
}

/// Validation rule of a template group.
///
/// One variant per rule kind, carrying its payload: a literal value, a
/// regular expression, an allow-list, or the sequence marker (the sequence
/// group renders the formatted sequence number and never reads parameters).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupRule {
    Fixed(String),
    Sequence,
    Regex(String),
    List(Vec<String>),
}

impl GroupRule {
    /// Build a rule from the stored `(validation_type, validation_value)`
    /// string pair. List values are comma-separated; tokens are trimmed.
    pub fn parse(kind: &str, value: &str) -> Result<Self> {
        match kind {
            "fixed" => Ok(GroupRule::Fixed(value.to_string())),
            "sequence" => Ok(GroupRule::Sequence),
            "regex" => Ok(GroupRule::Regex(value.to_string())),
            "list" => {
                if value.is_empty() {
                    return Ok(GroupRule::List(Vec::new()));
                }
                Ok(GroupRule::List(
                    value.split(',').map(|s| s.trim().to_string()).collect(),
                ))
            }
            other => Err(HostForgeError::validation(format!(
                "unknown validation type: {}",
                other
            ))),
        }
    }

    /// Stored name of the rule kind
    pub fn kind(&self) -> &'static str {
        match self {
            GroupRule::Fixed(_) => "fixed",
            GroupRule::Sequence => "sequence",
            GroupRule::Regex(_) => "regex",
            GroupRule::List(_) => "list",
        }
    }

    /// Stored string form of the rule payload
    pub fn value(&self) -> String {
        match self {
            GroupRule::Fixed(v) => v.clone(),
            GroupRule::Sequence => String::new(),
            GroupRule::Regex(v) => v.clone(),
            GroupRule::List(items) => items.join(","),
        }
    }
}

/// One positional segment of a hostname template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateGroup {
    pub id: i64,
    pub template_id: i64,
    pub name: String,
    pub length: usize,
    /// 1-based assembly position, unique within a template
    pub position: u32,
    pub is_required: bool,
    pub rule: GroupRule,
}

/// A named hostname blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub max_length: usize,
    /// Groups in ascending position order
    pub groups: Vec<TemplateGroup>,
    pub sequence_start: i64,
    pub sequence_length: usize,
    pub sequence_padding: bool,
    pub sequence_increment: i64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

/// A generated, persisted hostname instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hostname {
    pub id: i64,
    pub name: String,
    pub template_id: i64,
    pub status: HostnameStatus,
    pub sequence_num: i64,
    pub reserved_by: String,
    pub reserved_at: DateTime<Utc>,
    pub committed_by: Option<String>,
    pub committed_at: Option<DateTime<Utc>>,
    pub released_by: Option<String>,
    pub released_at: Option<DateTime<Utc>>,
    pub dns_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to reserve a hostname from a template
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReservationRequest {
    pub template_id: i64,
    #[serde(default)]
    pub params: HashMap<String, String>,
    pub requested_by: String,
}

/// Request to commit a reserved hostname
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRequest {
    pub hostname_id: i64,
    pub committed_by: String,
}

/// Request to release a committed hostname
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseRequest {
    pub hostname_id: i64,
    pub released_by: String,
}

/// Outcome of a single DNS existence check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub hostname: String,
    pub exists: bool,
    pub ip_address: Option<String>,
    pub checked_at: DateTime<Utc>,
}

/// DNS resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsConfig {
    /// Resolver endpoints, tried in order. Entries without a port use 53.
    pub servers: Vec<String>,
    /// Per-query timeout
    pub timeout: Duration,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            servers: vec!["8.8.8.8".to_string(), "8.8.4.4".to_string()],
            timeout: Duration::from_secs(5),
        }
    }
}

/// Range scanning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Upper bound on in-flight probes when a scan does not request its own
    pub max_concurrent: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self { max_concurrent: 10 }
    }
}

/// Tunables for the sequence-range discovery heuristic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Sequences probed one-by-one from the template's start
    pub probe_window: usize,
    /// Step size of the widening search after an empty window
    pub stride: usize,
    /// How far past the start (and past the first hit, when walking up) the
    /// search is allowed to reach
    pub search_envelope: usize,
    /// Consecutive misses accepted as the end of the in-use range
    pub miss_tolerance: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            probe_window: 10,
            stride: 100,
            search_envelope: 1000,
            miss_tolerance: 10,
        }
    }
}
