//! DNS existence probing
//!
//! `HostProbe` is the seam the scanner drives; `DnsProbe` is the production
//! implementation speaking DNS over UDP against configured resolvers.

pub mod dns;

pub use dns::DnsProbe;

use async_trait::async_trait;
use futures::future::join_all;

use crate::error::Result;
use crate::types::ProbeResult;

/// A single-name existence check against a name-resolution authority
#[async_trait]
pub trait HostProbe: Send + Sync {
    async fn check(&self, hostname: &str) -> Result<ProbeResult>;
}

/// Check multiple hostnames concurrently.
///
/// Lookups fan out unordered, one task per name. Individual failures are
/// logged and dropped from the returned list; the call errors only when
/// every lookup failed.
pub async fn check_many(probe: &dyn HostProbe, hostnames: &[String]) -> Result<Vec<ProbeResult>> {
    if hostnames.is_empty() {
        return Ok(Vec::new());
    }

    let outcomes = join_all(hostnames.iter().map(|h| probe.check(h))).await;

    let mut results = Vec::with_capacity(hostnames.len());
    let mut first_err = None;
    for (hostname, outcome) in hostnames.iter().zip(outcomes) {
        match outcome {
            Ok(result) => results.push(result),
            Err(e) => {
                tracing::warn!(hostname = %hostname, error = %e, "hostname check failed");
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
    }

    match (results.is_empty(), first_err) {
        (true, Some(e)) => Err(e),
        _ => Ok(results),
    }
}
