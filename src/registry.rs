//! Provider Registry snapshot and the state transitions that keep its
//! invariants: provider ids are unique and at most one record is marked
//! default at any observable point.
//!
//! Transitions are plain synchronous functions so the facade can apply them
//! under its lock after a remote call succeeds, and tests can exercise them
//! against fixtures without a transport.

use crate::error::{ConfigError, Result};
use crate::models::ProviderRecord;

#[derive(Debug, Default)]
pub struct RegistrySnapshot {
    providers: Vec<ProviderRecord>,
    default_id: Option<String>,
}

impl RegistrySnapshot {
    pub fn providers(&self) -> &[ProviderRecord] {
        &self.providers
    }

    pub fn get(&self, id: &str) -> Option<&ProviderRecord> {
        self.providers.iter().find(|record| record.id == id)
    }

    pub fn default_provider(&self) -> Option<&ProviderRecord> {
        self.default_id.as_deref().and_then(|id| self.get(id))
    }

    pub fn default_id(&self) -> Option<&str> {
        self.default_id.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Replaces the whole snapshot with a freshly fetched list and
    /// re-resolves the default pointer from the records themselves.
    pub fn replace_all(&mut self, providers: Vec<ProviderRecord>) {
        self.default_id = providers
            .iter()
            .find(|record| record.is_default)
            .map(|record| record.id.clone());
        self.providers = providers;
    }

    /// Appends a newly created record. When the record was requested as
    /// default, the previous default is cleared in the same transition so no
    /// reader ever observes two defaults.
    pub fn apply_created(&mut self, record: ProviderRecord) {
        if record.is_default {
            self.clear_default_flags();
            self.default_id = Some(record.id.clone());
        }
        // Same id means the backend re-sent an existing record; replace it.
        self.providers.retain(|existing| existing.id != record.id);
        self.providers.push(record);
    }

    /// Replaces the matching record in place with the backend's updated copy.
    pub fn apply_updated(&mut self, record: ProviderRecord) {
        if record.is_default {
            self.clear_default_flags();
            self.default_id = Some(record.id.clone());
        } else if self.default_id.as_deref() == Some(record.id.as_str()) {
            self.default_id = None;
        }
        match self
            .providers
            .iter_mut()
            .find(|existing| existing.id == record.id)
        {
            Some(existing) => *existing = record,
            None => self.providers.push(record),
        }
    }

    /// Removes the record. When it was the default, the pointer becomes
    /// "none"; no other provider is auto-promoted.
    pub fn apply_deleted(&mut self, id: &str) {
        self.providers.retain(|record| record.id != id);
        if self.default_id.as_deref() == Some(id) {
            self.default_id = None;
        }
    }

    /// Marks `id` as the single default. Fails without mutation when the id
    /// is not in the registry.
    pub fn apply_default(&mut self, id: &str) -> Result<()> {
        if self.get(id).is_none() {
            return Err(ConfigError::ProviderNotFound(id.to_string()));
        }
        for record in &mut self.providers {
            record.is_default = record.id == id;
        }
        self.default_id = Some(id.to_string());
        Ok(())
    }

    fn clear_default_flags(&mut self) {
        for record in &mut self.providers {
            record.is_default = false;
        }
    }

    fn default_count(&self) -> usize {
        self.providers
            .iter()
            .filter(|record| record.is_default)
            .count()
    }

    #[cfg(test)]
    pub fn assert_invariants(&self) {
        assert!(self.default_count() <= 1, "more than one default provider");
        if let Some(id) = self.default_id.as_deref() {
            assert!(self.get(id).is_some(), "default pointer is dangling");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GenParams, ProviderKind};

    fn record(id: &str, is_default: bool) -> ProviderRecord {
        ProviderRecord {
            id: id.to_string(),
            name: id.to_uppercase(),
            kind: ProviderKind::OpenAi,
            base_url: "https://api.example.com/v1".to_string(),
            has_api_key: true,
            models: vec!["m1".to_string()],
            enabled: true,
            is_default,
            params: GenParams::default(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn replace_all_resolves_default_from_records() {
        let mut registry = RegistrySnapshot::default();
        registry.replace_all(vec![record("a", false), record("b", true)]);
        assert_eq!(registry.default_id(), Some("b"));
        registry.assert_invariants();
    }

    #[test]
    fn created_default_clears_previous_default() {
        let mut registry = RegistrySnapshot::default();
        registry.replace_all(vec![record("a", true)]);
        registry.apply_created(record("b", true));

        assert_eq!(registry.default_id(), Some("b"));
        assert!(!registry.get("a").expect("a should exist").is_default);
        registry.assert_invariants();
    }

    #[test]
    fn set_default_is_a_singleton_transition() {
        let mut registry = RegistrySnapshot::default();
        registry.replace_all(vec![record("a", true), record("b", false), record("c", false)]);

        registry.apply_default("c").expect("c exists");
        assert_eq!(registry.default_id(), Some("c"));
        assert!(registry.get("c").expect("c should exist").is_default);
        assert!(!registry.get("a").expect("a should exist").is_default);
        registry.assert_invariants();

        registry.apply_default("b").expect("b exists");
        assert_eq!(registry.default_id(), Some("b"));
        registry.assert_invariants();
    }

    #[test]
    fn set_default_on_missing_id_fails_without_mutation() {
        let mut registry = RegistrySnapshot::default();
        registry.replace_all(vec![record("a", true)]);

        let err = registry
            .apply_default("ghost")
            .expect_err("missing id should fail");
        assert!(matches!(err, ConfigError::ProviderNotFound(_)));
        assert_eq!(registry.default_id(), Some("a"));
        registry.assert_invariants();
    }

    #[test]
    fn deleting_default_clears_pointer_without_promotion() {
        let mut registry = RegistrySnapshot::default();
        registry.replace_all(vec![record("a", true), record("b", false)]);

        registry.apply_deleted("a");
        assert_eq!(registry.default_id(), None);
        assert_eq!(registry.providers().len(), 1);
        registry.assert_invariants();
    }

    #[test]
    fn deleting_non_default_keeps_pointer() {
        let mut registry = RegistrySnapshot::default();
        registry.replace_all(vec![record("a", true), record("b", false)]);

        registry.apply_deleted("b");
        assert_eq!(registry.default_id(), Some("a"));
        registry.assert_invariants();
    }

    #[test]
    fn update_that_drops_default_flag_clears_pointer() {
        let mut registry = RegistrySnapshot::default();
        registry.replace_all(vec![record("a", true)]);

        registry.apply_updated(record("a", false));
        assert_eq!(registry.default_id(), None);
        registry.assert_invariants();
    }
}
