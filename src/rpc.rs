//! Remote-procedure boundary to the backend configuration service.
//!
//! The facade only ever talks to [`ConfigRpc`]; `HttpRpc` is the production
//! implementation against the backend HTTP API. Tests inject a scripted
//! double instead.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ConfigError, Result};
use crate::models::{
    ChatRequest, ProviderDraft, ProviderPatch, ProviderRecord, TaskBinding, TaskKind,
};
use crate::utils::shorten_body;

/// Outcome of a backend connectivity test for one provider/model pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Outcome of a model-catalog synchronization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub success: bool,
    #[serde(default)]
    pub models: Vec<String>,
}

/// The opaque call/response channel to the backend. Every call is fallible;
/// a rejection must never corrupt the caller's last-known-good snapshot.
#[async_trait]
pub trait ConfigRpc: Send + Sync {
    async fn list_providers(&self) -> Result<Vec<ProviderRecord>>;
    async fn get_provider(&self, id: &str) -> Result<Option<ProviderRecord>>;
    async fn create_provider(&self, draft: &ProviderDraft) -> Result<ProviderRecord>;
    async fn update_provider(&self, id: &str, patch: &ProviderPatch)
        -> Result<Option<ProviderRecord>>;
    async fn delete_provider(&self, id: &str) -> Result<()>;
    async fn test_provider(&self, id: &str, model: Option<&str>) -> Result<TestOutcome>;
    async fn set_default_provider(&self, id: &str) -> Result<()>;
    async fn get_default_provider(&self) -> Result<Option<ProviderRecord>>;
    async fn chat(&self, request: &ChatRequest) -> Result<String>;
    async fn sync_models(&self, id: &str) -> Result<SyncOutcome>;
    async fn get_task_config(&self, task: TaskKind) -> Result<Option<TaskBinding>>;
    async fn list_task_configs(&self) -> Result<Vec<TaskBinding>>;
    async fn update_task_config(&self, binding: &TaskBinding) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    reply: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TestBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

/// `ConfigRpc` over the backend HTTP API.
#[derive(Debug, Clone)]
pub struct HttpRpc {
    base: Url,
    client: Client,
}

impl HttpRpc {
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|err| ConfigError::Validation(format!("backend URL is malformed: {err}")))?;
        Ok(Self {
            base,
            client: Client::new(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|err| ConfigError::Validation(format!("endpoint path invalid: {err}")))
    }
}

async fn reject(context: &str, response: reqwest::Response) -> ConfigError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let body = shorten_body(&body);
    if body.is_empty() {
        ConfigError::Rpc(format!("{context}: HTTP {status}"))
    } else {
        ConfigError::Rpc(format!("{context}: HTTP {status} - {body}"))
    }
}

#[async_trait]
impl ConfigRpc for HttpRpc {
    async fn list_providers(&self) -> Result<Vec<ProviderRecord>> {
        let response = self
            .client
            .get(self.endpoint("api/llm/providers")?)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(reject("list providers failed", response).await);
        }
        Ok(response.json().await?)
    }

    async fn get_provider(&self, id: &str) -> Result<Option<ProviderRecord>> {
        let response = self
            .client
            .get(self.endpoint(&format!("api/llm/providers/{id}"))?)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(reject("get provider failed", response).await);
        }
        Ok(Some(response.json().await?))
    }

    async fn create_provider(&self, draft: &ProviderDraft) -> Result<ProviderRecord> {
        let response = self
            .client
            .post(self.endpoint("api/llm/providers")?)
            .json(draft)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(reject("create provider failed", response).await);
        }
        Ok(response.json().await?)
    }

    async fn update_provider(
        &self,
        id: &str,
        patch: &ProviderPatch,
    ) -> Result<Option<ProviderRecord>> {
        let response = self
            .client
            .put(self.endpoint(&format!("api/llm/providers/{id}"))?)
            .json(patch)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(reject("update provider failed", response).await);
        }
        Ok(Some(response.json().await?))
    }

    async fn delete_provider(&self, id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.endpoint(&format!("api/llm/providers/{id}"))?)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(reject("delete provider failed", response).await);
        }
        Ok(())
    }

    async fn test_provider(&self, id: &str, model: Option<&str>) -> Result<TestOutcome> {
        let response = self
            .client
            .post(self.endpoint(&format!("api/llm/providers/{id}/test"))?)
            .json(&TestBody { model })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(reject("test provider failed", response).await);
        }
        Ok(response.json().await?)
    }

    async fn set_default_provider(&self, id: &str) -> Result<()> {
        let response = self
            .client
            .put(self.endpoint(&format!("api/llm/providers/{id}/default"))?)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ConfigError::ProviderNotFound(id.to_string()));
        }
        if !response.status().is_success() {
            return Err(reject("set default provider failed", response).await);
        }
        Ok(())
    }

    async fn get_default_provider(&self) -> Result<Option<ProviderRecord>> {
        let response = self
            .client
            .get(self.endpoint("api/llm/providers/default")?)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(reject("get default provider failed", response).await);
        }
        let record: Option<ProviderRecord> = response.json().await?;
        Ok(record)
    }

    async fn chat(&self, request: &ChatRequest) -> Result<String> {
        let response = self
            .client
            .post(self.endpoint("api/llm/chat")?)
            .json(request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(reject("chat request failed", response).await);
        }
        let reply: ChatReply = response.json().await?;
        Ok(reply.reply)
    }

    async fn sync_models(&self, id: &str) -> Result<SyncOutcome> {
        let response = self
            .client
            .post(self.endpoint(&format!("api/llm/providers/{id}/sync-models"))?)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(reject("sync models failed", response).await);
        }
        Ok(response.json().await?)
    }

    async fn get_task_config(&self, task: TaskKind) -> Result<Option<TaskBinding>> {
        let response = self
            .client
            .get(self.endpoint(&format!("api/llm/task-configs/{}", task.as_str()))?)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(reject("get task config failed", response).await);
        }
        Ok(Some(response.json().await?))
    }

    async fn list_task_configs(&self) -> Result<Vec<TaskBinding>> {
        let response = self
            .client
            .get(self.endpoint("api/llm/task-configs")?)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(reject("list task configs failed", response).await);
        }
        Ok(response.json().await?)
    }

    async fn update_task_config(&self, binding: &TaskBinding) -> Result<()> {
        let response = self
            .client
            .put(self.endpoint("api/llm/task-configs")?)
            .json(binding)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(reject("update task config failed", response).await);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_against_base() {
        let rpc = HttpRpc::new("http://127.0.0.1:8080/").expect("base URL should parse");
        let url = rpc
            .endpoint("api/llm/providers/p1/test")
            .expect("join should succeed");
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/api/llm/providers/p1/test");
    }

    #[test]
    fn malformed_base_url_is_rejected() {
        let err = HttpRpc::new("not a url").expect_err("parse should fail");
        assert!(err.to_string().contains("backend URL is malformed"));
    }

    #[test]
    fn test_outcome_accepts_failure_payload() {
        let outcome: TestOutcome =
            serde_json::from_str(r#"{"success":false,"message":"timeout"}"#)
                .expect("decode should succeed");
        assert!(!outcome.success);
        assert_eq!(outcome.message.as_deref(), Some("timeout"));
        assert_eq!(outcome.latency_ms, None);
    }
}
