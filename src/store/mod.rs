//! Persistence contracts consumed by the allocation and scanning engines
//!
//! The engines never talk to a database directly; they are handed trait
//! objects. `MemoryStore` is an in-process implementation of both traits,
//! used by the test suite and by embedders without durable persistence.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{GroupRule, Hostname, HostnameStatus, Template, TemplateGroup};

/// Fields of a template record to be created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTemplate {
    pub name: String,
    pub description: String,
    pub max_length: usize,
    pub sequence_start: i64,
    pub sequence_length: usize,
    pub sequence_padding: bool,
    pub sequence_increment: i64,
    pub is_active: bool,
    pub created_by: String,
}

/// Fields of a template group record to be created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTemplateGroup {
    pub template_id: i64,
    pub name: String,
    pub length: usize,
    pub position: u32,
    pub is_required: bool,
    pub rule: GroupRule,
}

/// Fields of a hostname record to be created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewHostname {
    pub name: String,
    pub template_id: i64,
    pub status: HostnameStatus,
    pub sequence_num: i64,
    pub reserved_by: String,
    pub dns_verified: bool,
}

/// Equality filters plus a name substring filter for hostname listings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostnameFilter {
    pub template_id: Option<i64>,
    pub status: Option<HostnameStatus>,
    pub sequence_num: Option<i64>,
    pub reserved_by: Option<String>,
    /// Case-insensitive substring match on the hostname
    pub name_contains: Option<String>,
}

/// Template persistence operations.
///
/// A `limit` of 0 means no limit throughout.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn create(&self, template: NewTemplate) -> Result<Template>;
    async fn get(&self, id: i64) -> Result<Template>;
    async fn get_by_name(&self, name: &str) -> Result<Template>;
    async fn list(&self, limit: usize, offset: usize) -> Result<(Vec<Template>, usize)>;
    async fn update(&self, template: Template) -> Result<Template>;
    async fn delete(&self, id: i64) -> Result<()>;

    async fn groups(&self, template_id: i64) -> Result<Vec<TemplateGroup>>;
    async fn create_group(&self, group: NewTemplateGroup) -> Result<TemplateGroup>;
    async fn update_group(&self, group: TemplateGroup) -> Result<TemplateGroup>;
    async fn delete_group(&self, id: i64) -> Result<()>;
}

/// Hostname persistence operations.
///
/// `create` must reject a name that is already present with
/// [`HostForgeError::DuplicateName`](crate::error::HostForgeError::DuplicateName);
/// SQL-backed implementations satisfy this with a unique index on `name`.
/// A `limit` of 0 means no limit throughout.
#[async_trait]
pub trait HostnameStore: Send + Sync {
    async fn create(&self, hostname: NewHostname) -> Result<Hostname>;
    async fn get(&self, id: i64) -> Result<Hostname>;
    async fn get_by_name(&self, name: &str) -> Result<Option<Hostname>>;
    async fn get_by_status(
        &self,
        status: HostnameStatus,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Hostname>>;
    async fn get_by_template(
        &self,
        template_id: i64,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Hostname>>;

    /// Conditionally transition a hostname's status.
    ///
    /// The update must only apply while the row still holds `expected`
    /// status (`... WHERE id = ? AND status = ?` in SQL terms). Returns the
    /// updated row, or `None` when no row matched — the caller decides
    /// whether that is a missing record or a lost race.
    async fn update_status(
        &self,
        id: i64,
        expected: HostnameStatus,
        new_status: HostnameStatus,
        actor: &str,
    ) -> Result<Option<Hostname>>;

    /// Highest allocated sequence number for a template, if any
    async fn max_sequence(&self, template_id: i64) -> Result<Option<i64>>;

    async fn count(&self, template_id: i64, status: HostnameStatus) -> Result<usize>;
    async fn count_by_user(&self, username: &str, status: HostnameStatus) -> Result<usize>;
    async fn list(
        &self,
        filter: &HostnameFilter,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Hostname>, usize)>;
}
