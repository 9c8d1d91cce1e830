//! Hostforge - template-driven hostname allocation and DNS scanning
//!
//! Generates structurally-validated hostnames from reusable templates,
//! tracks them from reservation through commit to release, and verifies a
//! name-space against live DNS with bounded-concurrency scans.

pub mod error;
pub mod name;
pub mod probe;
pub mod reservation;
pub mod scan;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use error::{HostForgeError, Result};
pub use types::{
    CommitRequest, DiscoveryConfig, DnsConfig, GroupRule, Hostname, HostnameStatus, ProbeResult,
    ReleaseRequest, ReservationRequest, ScanConfig, Template, TemplateGroup,
};

// Re-export main functionality
pub use name::SequenceAllocator;
pub use probe::{DnsProbe, HostProbe};
pub use reservation::ReservationEngine;
pub use scan::{RangeScanner, ScanItem, ScanOptions, ScanResult};
pub use store::{HostnameFilter, HostnameStore, MemoryStore, TemplateStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library
pub fn init() -> Result<()> {
    // Load .env file if it exists
    dotenv::dotenv().ok();
    Ok(())
}
