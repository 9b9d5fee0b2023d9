//! Task Binding Table and read-time resolution of a task to its effective
//! provider/model/parameter triple.

use std::collections::HashMap;

use crate::models::{GenParams, ProviderRecord, TaskBinding, TaskKind};
use crate::registry::RegistrySnapshot;

#[derive(Debug, Default)]
pub struct BindingTable {
    bindings: HashMap<TaskKind, TaskBinding>,
}

impl BindingTable {
    pub fn replace_all(&mut self, bindings: Vec<TaskBinding>) {
        self.bindings = bindings
            .into_iter()
            .map(|binding| (binding.task, binding))
            .collect();
    }

    pub fn upsert(&mut self, binding: TaskBinding) {
        self.bindings.insert(binding.task, binding);
    }

    /// A task with no stored binding behaves as "use default, no overrides".
    pub fn get(&self, task: TaskKind) -> TaskBinding {
        self.bindings
            .get(&task)
            .cloned()
            .unwrap_or_else(|| TaskBinding::unbound(task))
    }

    pub fn stored(&self) -> Vec<TaskBinding> {
        self.bindings.values().cloned().collect()
    }
}

/// The execution target a task resolves to at read time. An unresolvable
/// task is a normal value (`provider: None`), never an error.
#[derive(Debug, Clone)]
pub struct ResolvedTask {
    pub task: TaskKind,
    pub provider: Option<ProviderRecord>,
    /// Kept only when the stored model is a member of the effective
    /// provider's model set; `None` means the execution layer picks a
    /// provider default.
    pub model: Option<String>,
    pub params: GenParams,
}

impl ResolvedTask {
    pub fn is_resolved(&self) -> bool {
        self.provider.is_some()
    }
}

/// Resolves a binding against the current registry snapshot.
///
/// Effective provider: the explicit reference if it still exists, else the
/// current default, else none. A stale reference to a deleted provider
/// degrades to the default rather than failing.
pub fn resolve(binding: &TaskBinding, registry: &RegistrySnapshot) -> ResolvedTask {
    let provider = binding
        .provider_id
        .as_deref()
        .and_then(|id| registry.get(id))
        .or_else(|| registry.default_provider())
        .cloned();

    let model = match (&provider, binding.model.as_deref()) {
        (Some(record), Some(model)) if record.has_model(model) => Some(model.to_string()),
        _ => None,
    };

    let base = provider
        .as_ref()
        .map(|record| record.params.clone())
        .unwrap_or_default();
    let params = binding.overrides.overlay(&base);

    ResolvedTask {
        task: binding.task,
        provider,
        model,
        params,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GenParamsPatch, ProviderKind};

    fn record(id: &str, is_default: bool, models: &[&str]) -> ProviderRecord {
        ProviderRecord {
            id: id.to_string(),
            name: id.to_uppercase(),
            kind: ProviderKind::OpenAi,
            base_url: "https://api.example.com/v1".to_string(),
            has_api_key: true,
            models: models.iter().map(|model| model.to_string()).collect(),
            enabled: true,
            is_default,
            params: GenParams {
                temperature: 0.2,
                ..GenParams::default()
            },
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    fn registry_with(records: Vec<ProviderRecord>) -> RegistrySnapshot {
        let mut registry = RegistrySnapshot::default();
        registry.replace_all(records);
        registry
    }

    #[test]
    fn unbound_task_resolves_to_default_provider() {
        let registry = registry_with(vec![record("a", true, &["m1"])]);
        let resolved = resolve(&TaskBinding::unbound(TaskKind::ResumeAnalysis), &registry);

        assert_eq!(
            resolved.provider.as_ref().map(|p| p.id.as_str()),
            Some("a")
        );
        assert_eq!(resolved.model, None);
        assert_eq!(resolved.params.temperature, 0.2);
    }

    #[test]
    fn stale_reference_falls_back_to_default() {
        let registry = registry_with(vec![record("b", true, &["m1"])]);
        let binding = TaskBinding {
            task: TaskKind::ResumeOptimization,
            provider_id: Some("deleted".to_string()),
            model: None,
            overrides: GenParamsPatch::default(),
        };

        let resolved = resolve(&binding, &registry);
        assert_eq!(
            resolved.provider.as_ref().map(|p| p.id.as_str()),
            Some("b")
        );
    }

    #[test]
    fn stale_reference_without_default_is_unresolved() {
        let registry = registry_with(vec![record("b", false, &["m1"])]);
        let binding = TaskBinding {
            task: TaskKind::QuestionGeneration,
            provider_id: Some("deleted".to_string()),
            model: Some("m1".to_string()),
            overrides: GenParamsPatch::default(),
        };

        let resolved = resolve(&binding, &registry);
        assert!(!resolved.is_resolved());
        assert_eq!(resolved.model, None);
    }

    #[test]
    fn model_outside_provider_set_is_dropped() {
        let registry = registry_with(vec![record("a", true, &["m1", "m2"])]);
        let binding = TaskBinding {
            task: TaskKind::ResumeAnalysis,
            provider_id: Some("a".to_string()),
            model: Some("gone".to_string()),
            overrides: GenParamsPatch::default(),
        };

        let resolved = resolve(&binding, &registry);
        assert_eq!(resolved.model, None);

        let binding = TaskBinding {
            model: Some("m2".to_string()),
            ..binding
        };
        let resolved = resolve(&binding, &registry);
        assert_eq!(resolved.model.as_deref(), Some("m2"));
    }

    #[test]
    fn overrides_take_precedence_field_by_field() {
        let registry = registry_with(vec![record("a", true, &["m1"])]);
        let binding = TaskBinding {
            task: TaskKind::ResumeAnalysis,
            provider_id: None,
            model: None,
            overrides: GenParamsPatch {
                max_tokens: Some(4096),
                ..GenParamsPatch::default()
            },
        };

        let resolved = resolve(&binding, &registry);
        assert_eq!(resolved.params.max_tokens, 4096);
        // Untouched fields come from the provider bundle.
        assert_eq!(resolved.params.temperature, 0.2);
    }

    #[test]
    fn missing_binding_is_the_unbound_binding() {
        let table = BindingTable::default();
        let binding = table.get(TaskKind::ResumeAnalysis);
        assert_eq!(binding.provider_id, None);
        assert_eq!(binding.model, None);
        assert!(binding.overrides.is_empty());
    }
}
