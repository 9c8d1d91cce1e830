//! DNS range scanning
//!
//! Renders candidate hostnames across a sequence range and probes them
//! against DNS under a bounded worker pool. Also hosts the range-discovery
//! heuristic and coarse usage sampling built on top of it.

mod discover;
mod scanner;

pub use scanner::RangeScanner;

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Options for a range scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanOptions {
    pub template_id: i64,
    pub start_seq: i64,
    pub end_seq: i64,
    #[serde(default)]
    pub params: HashMap<String, String>,
    /// 0 means the scanner's configured default
    #[serde(default)]
    pub max_concurrent: usize,
}

/// Per-name outcome of a scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanItem {
    pub hostname: String,
    pub exists: bool,
    pub ip_address: Option<String>,
}

/// Aggregate result of one scan invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub template_id: i64,
    pub template_name: String,
    pub total_hostnames: usize,
    pub existing_hostnames: usize,
    pub scan_duration: Duration,
    pub results: Vec<ScanItem>,
}
