//! Hostname reservation lifecycle
//!
//! Names move strictly reserved → committed → released; released is
//! terminal. The store's conditional status update arbitrates concurrent
//! transitions, and its unique-name constraint arbitrates concurrent
//! reservations.

use std::sync::Arc;

use crate::error::{HostForgeError, Result};
use crate::name::{builder, SequenceAllocator};
use crate::store::{HostnameFilter, HostnameStore, NewHostname, TemplateStore};
use crate::types::{
    CommitRequest, Hostname, HostnameStatus, ReleaseRequest, ReservationRequest,
};

/// Rendered-name collisions consume one retry with the template's increment
/// before the reservation gives up.
const MAX_RESERVE_ATTEMPTS: u32 = 2;

/// Orchestrates name generation, sequence allocation, and the hostname
/// state machine against the persistence stores.
pub struct ReservationEngine {
    hostnames: Arc<dyn HostnameStore>,
    templates: Arc<dyn TemplateStore>,
    allocator: SequenceAllocator,
}

impl ReservationEngine {
    pub fn new(hostnames: Arc<dyn HostnameStore>, templates: Arc<dyn TemplateStore>) -> Self {
        let allocator = SequenceAllocator::new(Arc::clone(&hostnames));
        Self {
            hostnames,
            templates,
            allocator,
        }
    }

    /// Reserve the next free hostname for a template.
    ///
    /// A collision — a rendered name that already exists, or an insert that
    /// loses to a concurrent reservation — advances the sequence by the
    /// template's increment and retries once. A second collision fails with
    /// [`HostForgeError::AllocationExhausted`].
    pub async fn reserve(&self, req: &ReservationRequest) -> Result<Hostname> {
        let template = self.templates.get(req.template_id).await?;
        let mut sequence = self.allocator.next_sequence(&template).await?;

        let mut attempt = 1;
        loop {
            let name = builder::render(&template, sequence, &req.params)?;

            if self.hostnames.get_by_name(&name).await?.is_some() {
                tracing::info!(
                    hostname = %name,
                    sequence,
                    "hostname already exists, trying with incremented sequence"
                );
            } else {
                match self
                    .hostnames
                    .create(NewHostname {
                        name: name.clone(),
                        template_id: template.id,
                        status: HostnameStatus::Reserved,
                        sequence_num: sequence,
                        reserved_by: req.requested_by.clone(),
                        dns_verified: false,
                    })
                    .await
                {
                    Ok(hostname) => {
                        tracing::debug!(
                            hostname = %hostname.name,
                            template_id = template.id,
                            sequence,
                            reserved_by = %hostname.reserved_by,
                            "hostname reserved"
                        );
                        return Ok(hostname);
                    }
                    Err(HostForgeError::DuplicateName { name }) => {
                        tracing::warn!(
                            hostname = %name,
                            sequence,
                            "insert lost to a concurrent reservation"
                        );
                    }
                    Err(e) => return Err(e),
                }
            }

            if attempt >= MAX_RESERVE_ATTEMPTS {
                return Err(HostForgeError::AllocationExhausted {
                    template_id: template.id,
                    last_sequence: sequence,
                    attempts: MAX_RESERVE_ATTEMPTS,
                });
            }
            attempt += 1;
            sequence += template.sequence_increment;
        }
    }

    /// Commit a reserved hostname
    pub async fn commit(&self, req: &CommitRequest) -> Result<Hostname> {
        self.transition(
            req.hostname_id,
            HostnameStatus::Reserved,
            HostnameStatus::Committed,
            &req.committed_by,
        )
        .await
    }

    /// Release a committed hostname. Released is terminal.
    pub async fn release(&self, req: &ReleaseRequest) -> Result<Hostname> {
        self.transition(
            req.hostname_id,
            HostnameStatus::Committed,
            HostnameStatus::Released,
            &req.released_by,
        )
        .await
    }

    async fn transition(
        &self,
        hostname_id: i64,
        expected: HostnameStatus,
        new_status: HostnameStatus,
        actor: &str,
    ) -> Result<Hostname> {
        let hostname = self.hostnames.get(hostname_id).await?;
        if hostname.status != expected {
            return Err(HostForgeError::state_conflict(expected, hostname.status));
        }

        match self
            .hostnames
            .update_status(hostname_id, expected, new_status, actor)
            .await?
        {
            Some(updated) => {
                tracing::debug!(
                    hostname = %updated.name,
                    status = %updated.status,
                    actor = %actor,
                    "hostname status updated"
                );
                Ok(updated)
            }
            // The conditional update matched nothing: a concurrent caller won
            // the transition between our read and write.
            None => {
                let current = self.hostnames.get(hostname_id).await?;
                Err(HostForgeError::state_conflict(expected, current.status))
            }
        }
    }

    /// Get a hostname by id
    pub async fn get(&self, id: i64) -> Result<Hostname> {
        self.hostnames.get(id).await
    }

    /// List reserved hostnames
    pub async fn list_reserved(&self, limit: usize, offset: usize) -> Result<Vec<Hostname>> {
        self.hostnames
            .get_by_status(HostnameStatus::Reserved, limit, offset)
            .await
    }

    /// List committed hostnames
    pub async fn list_committed(&self, limit: usize, offset: usize) -> Result<Vec<Hostname>> {
        self.hostnames
            .get_by_status(HostnameStatus::Committed, limit, offset)
            .await
    }

    /// List every hostname generated from a template
    pub async fn list_by_template(
        &self,
        template_id: i64,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Hostname>> {
        self.hostnames.get_by_template(template_id, limit, offset).await
    }

    /// Search hostnames with equality filters and a name substring filter
    pub async fn search(
        &self,
        filter: &HostnameFilter,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Hostname>, usize)> {
        self.hostnames.list(filter, limit, offset).await
    }

    /// Count a template's hostnames in a given status
    pub async fn count(&self, template_id: i64, status: HostnameStatus) -> Result<usize> {
        self.hostnames.count(template_id, status).await
    }

    /// Count a user's hostnames in a given status
    pub async fn count_by_user(&self, username: &str, status: HostnameStatus) -> Result<usize> {
        self.hostnames.count_by_user(username, status).await
    }

    /// The engine's sequence allocator, for usage statistics
    pub fn allocator(&self) -> &SequenceAllocator {
        &self.allocator
    }
}
