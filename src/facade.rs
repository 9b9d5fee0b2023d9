//! Configuration Facade: the single coordination point for all mutating
//! operations on the Provider Registry, Task Binding Table, and Test Result
//! store.
//!
//! The facade owns the shared state behind one `Mutex` that is never held
//! across an `.await`. Remote calls happen outside the lock; on success the
//! matching local transition is applied in one synchronous critical section,
//! so no observer sees a half-applied mutation and a second read immediately
//! observes the change without waiting for a refetch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, warn};

use crate::bindings::{resolve, BindingTable, ResolvedTask};
use crate::error::{ConfigError, Result};
use crate::models::{
    normalize_optional_string, validate_base_url, validate_display_name, ChatRequest,
    ProviderDraft, ProviderPatch, ProviderRecord, TaskBinding, TaskKind,
};
use crate::probe::{run_probe, ProbeKey, TestResult};
use crate::registry::RegistrySnapshot;
use crate::rpc::{ConfigRpc, SyncOutcome};
use crate::session::ChatSession;

#[derive(Default)]
struct FacadeState {
    registry: RegistrySnapshot,
    bindings: BindingTable,
    test_results: HashMap<ProbeKey, TestResult>,
    // Per-key depth so overlapping probes on the same key stay reported
    // busy until the last one completes.
    probes_in_flight: HashMap<ProbeKey, u32>,
    loading_depth: u32,
    provider_error: Option<String>,
    task_error: Option<String>,
}

/// Owns the registry, binding table, and test-result store. Constructed at
/// application start with an injected transport; consumers hold a reference,
/// there is no ambient singleton.
pub struct ConfigFacade {
    rpc: Arc<dyn ConfigRpc>,
    state: Mutex<FacadeState>,
}

impl ConfigFacade {
    pub fn new(rpc: Arc<dyn ConfigRpc>) -> Self {
        Self {
            rpc,
            state: Mutex::new(FacadeState::default()),
        }
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, FacadeState>> {
        self.state
            .lock()
            .map_err(|_| ConfigError::State("facade mutex poisoned".to_string()))
    }

    // ---- provider operations -------------------------------------------

    /// Replaces the registry snapshot with a fresh backend fetch and
    /// re-resolves the default pointer. On failure the last good snapshot is
    /// kept and the provider error flag is recorded.
    pub async fn refresh_providers(&self) -> Result<()> {
        self.lock_state()?.loading_depth += 1;
        let fetched = self.rpc.list_providers().await;

        let mut state = self.lock_state()?;
        state.loading_depth = state.loading_depth.saturating_sub(1);
        match fetched {
            Ok(providers) => {
                debug!("registry refreshed with {} providers", providers.len());
                state.registry.replace_all(providers);
                state.provider_error = None;
                Ok(())
            }
            Err(err) => {
                warn!("provider refresh failed: {err}");
                state.provider_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub async fn create_provider(&self, draft: ProviderDraft) -> Result<ProviderRecord> {
        validate_display_name(&draft.name)?;
        validate_base_url(&draft.base_url)?;
        if draft.models.iter().all(|model| model.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "at least one model is required".to_string(),
            ));
        }
        let want_default = draft.is_default;
        let draft = ProviderDraft {
            api_key: normalize_optional_string(draft.api_key),
            ..draft
        };

        let mut record = match self.rpc.create_provider(&draft).await {
            Ok(record) => record,
            Err(err) => return Err(self.note_provider_error(err)),
        };
        // Honor a requested default locally without waiting for a refetch.
        if want_default {
            record.is_default = true;
        }

        let mut state = self.lock_state()?;
        state.registry.apply_created(record.clone());
        state.provider_error = None;
        debug!("provider {} created", record.id);
        Ok(record)
    }

    /// A blank credential in the patch means "keep the stored credential";
    /// it is stripped before the wire call so an empty value never
    /// overwrites a stored secret.
    pub async fn update_provider(&self, id: &str, patch: ProviderPatch) -> Result<ProviderRecord> {
        if let Some(name) = patch.name.as_deref() {
            validate_display_name(name)?;
        }
        if let Some(base_url) = patch.base_url.as_deref() {
            validate_base_url(base_url)?;
        }
        if let Some(models) = patch.models.as_ref() {
            if models.iter().all(|model| model.trim().is_empty()) {
                return Err(ConfigError::Validation(
                    "model set cannot be emptied".to_string(),
                ));
            }
        }
        let patch = ProviderPatch {
            api_key: normalize_optional_string(patch.api_key),
            ..patch
        };

        let updated = match self.rpc.update_provider(id, &patch).await {
            Ok(updated) => updated,
            Err(err) => return Err(self.note_provider_error(err)),
        };
        let record = updated.ok_or_else(|| ConfigError::ProviderNotFound(id.to_string()))?;

        let mut state = self.lock_state()?;
        state.registry.apply_updated(record.clone());
        state.provider_error = None;
        debug!("provider {} updated", record.id);
        Ok(record)
    }

    /// Removes the record; when it was the default the pointer becomes
    /// "none" and no other provider is auto-promoted.
    pub async fn delete_provider(&self, id: &str) -> Result<()> {
        if let Err(err) = self.rpc.delete_provider(id).await {
            return Err(self.note_provider_error(err));
        }

        let mut state = self.lock_state()?;
        state.registry.apply_deleted(id);
        state.provider_error = None;
        debug!("provider {id} deleted");
        Ok(())
    }

    /// Persists the new default remotely, then applies the singleton
    /// transition locally: exactly one provider is default afterwards.
    pub async fn set_default_provider(&self, id: &str) -> Result<()> {
        {
            let state = self.lock_state()?;
            if state.registry.get(id).is_none() {
                return Err(ConfigError::ProviderNotFound(id.to_string()));
            }
        }

        if let Err(err) = self.rpc.set_default_provider(id).await {
            return Err(self.note_provider_error(err));
        }

        let mut state = self.lock_state()?;
        state.registry.apply_default(id)?;
        state.provider_error = None;
        debug!("provider {id} is now the default");
        Ok(())
    }

    /// Runs a connectivity probe for a provider/model pair. A structured
    /// failure from the backend is cached under the probe key and returned
    /// as a failed result; a transport rejection propagates and seeds no
    /// cache entry. The last probe to complete wins the cached result.
    pub async fn test_provider(&self, id: &str, model: Option<&str>) -> Result<TestResult> {
        let provider = self
            .provider(id)?
            .ok_or_else(|| ConfigError::ProviderNotFound(id.to_string()))?;
        let key = ProbeKey::new(id, model);

        {
            let mut state = self.lock_state()?;
            *state.probes_in_flight.entry(key.clone()).or_insert(0) += 1;
        }

        let probed = run_probe(self.rpc.as_ref(), &provider, model).await;

        let mut state = self.lock_state()?;
        match state.probes_in_flight.get_mut(&key) {
            Some(depth) if *depth > 1 => *depth -= 1,
            _ => {
                state.probes_in_flight.remove(&key);
            }
        }
        match probed {
            Ok(outcome) => {
                let result = TestResult::from_outcome(&outcome);
                if !result.is_success() {
                    debug!("probe {key} failed: {:?}", outcome.message);
                }
                state.test_results.insert(key, result.clone());
                Ok(result)
            }
            Err(err) => {
                warn!("probe {key} rejected: {err}");
                Err(err)
            }
        }
    }

    /// Probes every enabled provider concurrently with its default model.
    pub async fn test_all_providers(&self) -> Result<Vec<(String, Result<TestResult>)>> {
        let ids: Vec<String> = {
            let state = self.lock_state()?;
            state
                .registry
                .providers()
                .iter()
                .filter(|record| record.enabled)
                .map(|record| record.id.clone())
                .collect()
        };

        let probes = ids.iter().map(|id| self.test_provider(id, None));
        let results = futures::future::join_all(probes).await;
        Ok(ids.into_iter().zip(results).collect())
    }

    /// Synchronizes the provider's model catalog. On declared success a full
    /// registry refresh is triggered so the fetched list replaces the old
    /// model set; the outcome is returned to the caller regardless.
    pub async fn sync_models(&self, id: &str) -> Result<SyncOutcome> {
        let outcome = match self.rpc.sync_models(id).await {
            Ok(outcome) => outcome,
            Err(err) => return Err(self.note_provider_error(err)),
        };

        if outcome.success {
            if let Err(err) = self.refresh_providers().await {
                warn!("post-sync refresh failed for {id}: {err}");
            }
        }
        Ok(outcome)
    }

    /// Stateless pass-through to the remote chat endpoint; registry state is
    /// untouched.
    pub async fn chat(&self, request: &ChatRequest) -> Result<String> {
        self.rpc.chat(request).await
    }

    /// Drives one full chat-test turn: submit, remote call, resolve or fail.
    /// The session enforces its own single-outstanding-request rule.
    pub async fn chat_turn(&self, session: &mut ChatSession, message: &str) -> Result<String> {
        session.submit(message)?;
        let request = ChatRequest {
            provider_id: session.provider_id().to_string(),
            message: message.trim().to_string(),
            model: session.model().map(|model| model.to_string()),
        };
        match self.rpc.chat(&request).await {
            Ok(reply) => {
                session.resolve(&reply);
                Ok(reply)
            }
            Err(err) => {
                session.fail();
                Err(err)
            }
        }
    }

    // ---- task binding operations ---------------------------------------

    pub async fn fetch_task_configs(&self) -> Result<()> {
        let fetched = self.rpc.list_task_configs().await;

        let mut state = self.lock_state()?;
        match fetched {
            Ok(bindings) => {
                state.bindings.replace_all(bindings);
                state.task_error = None;
                Ok(())
            }
            Err(err) => {
                warn!("task config refresh failed: {err}");
                state.task_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Fetches the stored binding for one task and replaces the local entry.
    /// A task the backend has never seen behaves as "use default, no
    /// overrides".
    pub async fn refresh_task_config(&self, task: TaskKind) -> Result<TaskBinding> {
        let fetched = self.rpc.get_task_config(task).await;

        let mut state = self.lock_state()?;
        match fetched {
            Ok(stored) => {
                let binding = stored.unwrap_or_else(|| TaskBinding::unbound(task));
                state.bindings.upsert(binding.clone());
                state.task_error = None;
                Ok(binding)
            }
            Err(err) => {
                warn!("task config fetch failed for {}: {err}", task.as_str());
                state.task_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub async fn update_task_config(&self, binding: TaskBinding) -> Result<()> {
        if let Some(model) = binding.model.as_deref() {
            let state = self.lock_state()?;
            let effective = binding
                .provider_id
                .as_deref()
                .and_then(|id| state.registry.get(id))
                .or_else(|| state.registry.default_provider());
            if let Some(provider) = effective {
                if !provider.has_model(model) {
                    return Err(ConfigError::Validation(format!(
                        "model '{model}' is not offered by provider '{}'",
                        provider.id
                    )));
                }
            }
        }

        if let Err(err) = self.rpc.update_task_config(&binding).await {
            let mut state = self.lock_state()?;
            state.task_error = Some(err.to_string());
            return Err(err);
        }

        let mut state = self.lock_state()?;
        debug!("task binding saved for {}", binding.task.as_str());
        state.bindings.upsert(binding);
        state.task_error = None;
        Ok(())
    }

    // ---- synchronous read accessors ------------------------------------

    pub fn providers(&self) -> Result<Vec<ProviderRecord>> {
        Ok(self.lock_state()?.registry.providers().to_vec())
    }

    pub fn provider(&self, id: &str) -> Result<Option<ProviderRecord>> {
        Ok(self.lock_state()?.registry.get(id).cloned())
    }

    pub fn default_provider(&self) -> Result<Option<ProviderRecord>> {
        Ok(self.lock_state()?.registry.default_provider().cloned())
    }

    pub fn test_result(&self, id: &str, model: Option<&str>) -> Result<Option<TestResult>> {
        let key = ProbeKey::new(id, model);
        Ok(self.lock_state()?.test_results.get(&key).cloned())
    }

    pub fn is_probing(&self, id: &str, model: Option<&str>) -> Result<bool> {
        let key = ProbeKey::new(id, model);
        Ok(self.lock_state()?.probes_in_flight.contains_key(&key))
    }

    pub fn task_binding(&self, task: TaskKind) -> Result<TaskBinding> {
        Ok(self.lock_state()?.bindings.get(task))
    }

    /// Resolves a task to its effective provider/model/parameters against
    /// the current snapshot.
    pub fn resolve_task(&self, task: TaskKind) -> Result<ResolvedTask> {
        let state = self.lock_state()?;
        let binding = state.bindings.get(task);
        Ok(resolve(&binding, &state.registry))
    }

    pub fn is_loading(&self) -> Result<bool> {
        Ok(self.lock_state()?.loading_depth > 0)
    }

    pub fn last_provider_error(&self) -> Result<Option<String>> {
        Ok(self.lock_state()?.provider_error.clone())
    }

    pub fn last_task_error(&self) -> Result<Option<String>> {
        Ok(self.lock_state()?.task_error.clone())
    }

    pub fn clear_provider_error(&self) -> Result<()> {
        self.lock_state()?.provider_error = None;
        Ok(())
    }

    pub fn clear_task_error(&self) -> Result<()> {
        self.lock_state()?.task_error = None;
        Ok(())
    }

    // Records the remote failure on the provider concern and hands the
    // error back for propagation. Best-effort under a poisoned lock.
    fn note_provider_error(&self, err: ConfigError) -> ConfigError {
        if let Ok(mut state) = self.state.lock() {
            state.provider_error = Some(err.to_string());
        }
        err
    }
}
