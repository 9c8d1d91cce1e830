//! In-process store backed by interior-mutability maps

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use super::{
    HostnameFilter, HostnameStore, NewHostname, NewTemplate, NewTemplateGroup, TemplateStore,
};
use crate::error::{HostForgeError, Result};
use crate::types::{Hostname, HostnameStatus, Template, TemplateGroup};

#[derive(Default)]
struct State {
    templates: BTreeMap<i64, Template>,
    groups: BTreeMap<i64, TemplateGroup>,
    hostnames: BTreeMap<i64, Hostname>,
    /// hostname name -> id, enforces the unique-name constraint
    names: HashMap<String, i64>,
    next_template_id: i64,
    next_group_id: i64,
    next_hostname_id: i64,
}

/// In-memory implementation of [`TemplateStore`] and [`HostnameStore`].
///
/// Groups are stored separately and attached to templates on read, sorted by
/// position, mirroring how a relational backend would join them.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn template_with_groups(state: &State, id: i64) -> Result<Template> {
        let mut template = state
            .templates
            .get(&id)
            .cloned()
            .ok_or_else(|| HostForgeError::template_not_found(id))?;
        let mut groups: Vec<TemplateGroup> = state
            .groups
            .values()
            .filter(|g| g.template_id == id)
            .cloned()
            .collect();
        groups.sort_by_key(|g| g.position);
        template.groups = groups;
        Ok(template)
    }

    fn paginate<T>(items: Vec<T>, limit: usize, offset: usize) -> Vec<T> {
        let iter = items.into_iter().skip(offset);
        if limit == 0 {
            iter.collect()
        } else {
            iter.take(limit).collect()
        }
    }
}

#[async_trait]
impl TemplateStore for MemoryStore {
    async fn create(&self, template: NewTemplate) -> Result<Template> {
        let mut state = self.state.write();
        state.next_template_id += 1;
        let now = Utc::now();
        let record = Template {
            id: state.next_template_id,
            name: template.name,
            description: template.description,
            max_length: template.max_length,
            groups: Vec::new(),
            sequence_start: template.sequence_start,
            sequence_length: template.sequence_length,
            sequence_padding: template.sequence_padding,
            sequence_increment: template.sequence_increment,
            created_by: template.created_by,
            created_at: now,
            updated_at: now,
            is_active: template.is_active,
        };
        state.templates.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: i64) -> Result<Template> {
        let state = self.state.read();
        Self::template_with_groups(&state, id)
    }

    async fn get_by_name(&self, name: &str) -> Result<Template> {
        let state = self.state.read();
        let id = state
            .templates
            .values()
            .find(|t| t.name == name)
            .map(|t| t.id)
            .ok_or_else(|| HostForgeError::template_not_found(name))?;
        Self::template_with_groups(&state, id)
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<(Vec<Template>, usize)> {
        let state = self.state.read();
        let ids: Vec<i64> = state.templates.keys().copied().collect();
        let total = ids.len();
        let page = Self::paginate(ids, limit, offset)
            .into_iter()
            .map(|id| Self::template_with_groups(&state, id))
            .collect::<Result<Vec<_>>>()?;
        Ok((page, total))
    }

    async fn update(&self, template: Template) -> Result<Template> {
        let mut state = self.state.write();
        let existing = state
            .templates
            .get(&template.id)
            .cloned()
            .ok_or_else(|| HostForgeError::template_not_found(template.id))?;
        let record = Template {
            groups: Vec::new(),
            created_at: existing.created_at,
            created_by: existing.created_by,
            updated_at: Utc::now(),
            ..template
        };
        state.templates.insert(record.id, record.clone());
        Self::template_with_groups(&state, record.id)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut state = self.state.write();
        if !state.templates.contains_key(&id) {
            return Err(HostForgeError::template_not_found(id));
        }
        if state.hostnames.values().any(|h| h.template_id == id) {
            return Err(HostForgeError::store(format!(
                "cannot delete template {}: hostnames still reference it",
                id
            )));
        }
        state.templates.remove(&id);
        state.groups.retain(|_, g| g.template_id != id);
        Ok(())
    }

    async fn groups(&self, template_id: i64) -> Result<Vec<TemplateGroup>> {
        let state = self.state.read();
        let mut groups: Vec<TemplateGroup> = state
            .groups
            .values()
            .filter(|g| g.template_id == template_id)
            .cloned()
            .collect();
        groups.sort_by_key(|g| g.position);
        Ok(groups)
    }

    async fn create_group(&self, group: NewTemplateGroup) -> Result<TemplateGroup> {
        let mut state = self.state.write();
        if !state.templates.contains_key(&group.template_id) {
            return Err(HostForgeError::template_not_found(group.template_id));
        }
        state.next_group_id += 1;
        let record = TemplateGroup {
            id: state.next_group_id,
            template_id: group.template_id,
            name: group.name,
            length: group.length,
            position: group.position,
            is_required: group.is_required,
            rule: group.rule,
        };
        state.groups.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_group(&self, group: TemplateGroup) -> Result<TemplateGroup> {
        let mut state = self.state.write();
        if !state.groups.contains_key(&group.id) {
            return Err(HostForgeError::store(format!(
                "template group not found: {}",
                group.id
            )));
        }
        state.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn delete_group(&self, id: i64) -> Result<()> {
        let mut state = self.state.write();
        state
            .groups
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| HostForgeError::store(format!("template group not found: {}", id)))
    }
}

#[async_trait]
impl HostnameStore for MemoryStore {
    async fn create(&self, hostname: NewHostname) -> Result<Hostname> {
        let mut state = self.state.write();
        if state.names.contains_key(&hostname.name) {
            return Err(HostForgeError::duplicate_name(hostname.name));
        }
        state.next_hostname_id += 1;
        let now = Utc::now();
        let record = Hostname {
            id: state.next_hostname_id,
            name: hostname.name,
            template_id: hostname.template_id,
            status: hostname.status,
            sequence_num: hostname.sequence_num,
            reserved_by: hostname.reserved_by,
            reserved_at: now,
            committed_by: None,
            committed_at: None,
            released_by: None,
            released_at: None,
            dns_verified: hostname.dns_verified,
            created_at: now,
            updated_at: now,
        };
        state.names.insert(record.name.clone(), record.id);
        state.hostnames.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: i64) -> Result<Hostname> {
        let state = self.state.read();
        state
            .hostnames
            .get(&id)
            .cloned()
            .ok_or_else(|| HostForgeError::hostname_not_found(id))
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Hostname>> {
        let state = self.state.read();
        Ok(state
            .names
            .get(name)
            .and_then(|id| state.hostnames.get(id))
            .cloned())
    }

    async fn get_by_status(
        &self,
        status: HostnameStatus,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Hostname>> {
        let state = self.state.read();
        let matching: Vec<Hostname> = state
            .hostnames
            .values()
            .filter(|h| h.status == status)
            .cloned()
            .collect();
        Ok(Self::paginate(matching, limit, offset))
    }

    async fn get_by_template(
        &self,
        template_id: i64,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Hostname>> {
        let state = self.state.read();
        let matching: Vec<Hostname> = state
            .hostnames
            .values()
            .filter(|h| h.template_id == template_id)
            .cloned()
            .collect();
        Ok(Self::paginate(matching, limit, offset))
    }

    async fn update_status(
        &self,
        id: i64,
        expected: HostnameStatus,
        new_status: HostnameStatus,
        actor: &str,
    ) -> Result<Option<Hostname>> {
        let mut state = self.state.write();
        let Some(record) = state.hostnames.get_mut(&id) else {
            return Ok(None);
        };
        if record.status != expected {
            return Ok(None);
        }
        let now = Utc::now();
        record.status = new_status;
        record.updated_at = now;
        match new_status {
            HostnameStatus::Committed => {
                record.committed_by = Some(actor.to_string());
                record.committed_at = Some(now);
            }
            HostnameStatus::Released => {
                record.released_by = Some(actor.to_string());
                record.released_at = Some(now);
            }
            HostnameStatus::Available | HostnameStatus::Reserved => {}
        }
        Ok(Some(record.clone()))
    }

    async fn max_sequence(&self, template_id: i64) -> Result<Option<i64>> {
        let state = self.state.read();
        Ok(state
            .hostnames
            .values()
            .filter(|h| h.template_id == template_id)
            .map(|h| h.sequence_num)
            .max())
    }

    async fn count(&self, template_id: i64, status: HostnameStatus) -> Result<usize> {
        let state = self.state.read();
        Ok(state
            .hostnames
            .values()
            .filter(|h| h.template_id == template_id && h.status == status)
            .count())
    }

    async fn count_by_user(&self, username: &str, status: HostnameStatus) -> Result<usize> {
        let state = self.state.read();
        Ok(state
            .hostnames
            .values()
            .filter(|h| h.reserved_by == username && h.status == status)
            .count())
    }

    async fn list(
        &self,
        filter: &HostnameFilter,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Hostname>, usize)> {
        let state = self.state.read();
        let needle = filter.name_contains.as_ref().map(|s| s.to_lowercase());
        let matching: Vec<Hostname> = state
            .hostnames
            .values()
            .filter(|h| {
                filter.template_id.is_none_or(|id| h.template_id == id)
                    && filter.status.is_none_or(|s| h.status == s)
                    && filter.sequence_num.is_none_or(|n| h.sequence_num == n)
                    && filter
                        .reserved_by
                        .as_ref()
                        .is_none_or(|by| &h.reserved_by == by)
                    && needle
                        .as_ref()
                        .is_none_or(|n| h.name.to_lowercase().contains(n))
            })
            .cloned()
            .collect();
        let total = matching.len();
        Ok((Self::paginate(matching, limit, offset), total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GroupRule;

    fn new_template() -> NewTemplate {
        NewTemplate {
            name: "web".to_string(),
            description: "web servers".to_string(),
            max_length: 15,
            sequence_start: 1,
            sequence_length: 3,
            sequence_padding: true,
            sequence_increment: 1,
            is_active: true,
            created_by: "admin".to_string(),
        }
    }

    fn new_hostname(name: &str, template_id: i64, seq: i64) -> NewHostname {
        NewHostname {
            name: name.to_string(),
            template_id,
            status: HostnameStatus::Reserved,
            sequence_num: seq,
            reserved_by: "admin".to_string(),
            dns_verified: false,
        }
    }

    #[tokio::test]
    async fn test_template_crud() {
        let store = MemoryStore::new();
        let template = TemplateStore::create(&store, new_template()).await.unwrap();
        assert_eq!(template.id, 1);

        store
            .create_group(NewTemplateGroup {
                template_id: template.id,
                name: "prefix".to_string(),
                length: 3,
                position: 1,
                is_required: true,
                rule: GroupRule::Fixed("srv".to_string()),
            })
            .await
            .unwrap();

        let fetched = TemplateStore::get(&store, template.id).await.unwrap();
        assert_eq!(fetched.groups.len(), 1);
        assert_eq!(fetched.groups[0].position, 1);

        let by_name = TemplateStore::get_by_name(&store, "web").await.unwrap();
        assert_eq!(by_name.id, template.id);

        let (all, total) = TemplateStore::list(&store, 0, 0).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(all.len(), 1);

        TemplateStore::delete(&store, template.id).await.unwrap();
        assert!(TemplateStore::get(&store, template.id).await.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let store = MemoryStore::new();
        let template = TemplateStore::create(&store, new_template()).await.unwrap();
        HostnameStore::create(&store, new_hostname("srv001", template.id, 1))
            .await
            .unwrap();
        let err = HostnameStore::create(&store, new_hostname("srv001", template.id, 2))
            .await
            .unwrap_err();
        assert!(matches!(err, HostForgeError::DuplicateName { .. }));
    }

    #[tokio::test]
    async fn test_conditional_update_status() {
        let store = MemoryStore::new();
        let template = TemplateStore::create(&store, new_template()).await.unwrap();
        let hostname = HostnameStore::create(&store, new_hostname("srv001", template.id, 1))
            .await
            .unwrap();

        // Wrong expected status matches no row
        let missed = store
            .update_status(
                hostname.id,
                HostnameStatus::Committed,
                HostnameStatus::Released,
                "ops",
            )
            .await
            .unwrap();
        assert!(missed.is_none());

        let committed = store
            .update_status(
                hostname.id,
                HostnameStatus::Reserved,
                HostnameStatus::Committed,
                "ops",
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(committed.status, HostnameStatus::Committed);
        assert_eq!(committed.committed_by.as_deref(), Some("ops"));
        assert!(committed.committed_at.is_some());
    }

    #[tokio::test]
    async fn test_max_sequence_and_counts() {
        let store = MemoryStore::new();
        let template = TemplateStore::create(&store, new_template()).await.unwrap();
        assert_eq!(store.max_sequence(template.id).await.unwrap(), None);

        HostnameStore::create(&store, new_hostname("srv001", template.id, 1))
            .await
            .unwrap();
        HostnameStore::create(&store, new_hostname("srv005", template.id, 5))
            .await
            .unwrap();
        assert_eq!(store.max_sequence(template.id).await.unwrap(), Some(5));
        assert_eq!(
            store.count(template.id, HostnameStatus::Reserved).await.unwrap(),
            2
        );
        assert_eq!(
            store
                .count_by_user("admin", HostnameStatus::Reserved)
                .await
                .unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn test_filtered_list() {
        let store = MemoryStore::new();
        let template = TemplateStore::create(&store, new_template()).await.unwrap();
        HostnameStore::create(&store, new_hostname("srv001", template.id, 1))
            .await
            .unwrap();
        HostnameStore::create(&store, new_hostname("db001", template.id, 2))
            .await
            .unwrap();

        let filter = HostnameFilter {
            name_contains: Some("SRV".to_string()),
            ..Default::default()
        };
        let (matching, total) = HostnameStore::list(&store, &filter, 0, 0).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(matching[0].name, "srv001");

        let filter = HostnameFilter {
            sequence_num: Some(2),
            ..Default::default()
        };
        let (matching, _) = HostnameStore::list(&store, &filter, 0, 0).await.unwrap();
        assert_eq!(matching[0].name, "db001");
    }

    #[tokio::test]
    async fn test_delete_template_with_hostnames_refused() {
        let store = MemoryStore::new();
        let template = TemplateStore::create(&store, new_template()).await.unwrap();
        HostnameStore::create(&store, new_hostname("srv001", template.id, 1))
            .await
            .unwrap();
        let err = TemplateStore::delete(&store, template.id).await.unwrap_err();
        assert!(matches!(err, HostForgeError::Store { .. }));
    }
}
