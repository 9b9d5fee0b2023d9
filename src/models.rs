use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const MIN_NAME_LEN: usize = 1;
const MAX_NAME_LEN: usize = 128;

/// Backend family a provider speaks. Closed set per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProviderKind {
    OpenAi,
    Glm,
    Ollama,
    Anthropic,
    Azure,
    Custom,
}

/// Generation parameters as stored on a provider. Every field has a concrete
/// value; task-level overrides are expressed with [`GenParamsPatch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    /// Provider-kind specific extension, e.g. the API version for Azure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

impl Default for GenParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 2048,
            timeout_secs: 60,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            api_version: None,
        }
    }
}

/// Sparse counterpart of [`GenParams`]. Absent fields fall through to the
/// base bundle when overlaid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenParamsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

impl GenParamsPatch {
    /// Field-by-field precedence: a set field wins, an absent field falls
    /// through to `base`.
    pub fn overlay(&self, base: &GenParams) -> GenParams {
        GenParams {
            temperature: self.temperature.unwrap_or(base.temperature),
            max_tokens: self.max_tokens.unwrap_or(base.max_tokens),
            timeout_secs: self.timeout_secs.unwrap_or(base.timeout_secs),
            top_p: self.top_p.unwrap_or(base.top_p),
            frequency_penalty: self.frequency_penalty.unwrap_or(base.frequency_penalty),
            presence_penalty: self.presence_penalty.unwrap_or(base.presence_penalty),
            api_version: self
                .api_version
                .clone()
                .or_else(|| base.api_version.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A configured LLM backend as read back from the backend service.
///
/// The stored credential is write-only: reads carry `has_api_key` instead of
/// the secret itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRecord {
    pub id: String,
    pub name: String,
    pub kind: ProviderKind,
    pub base_url: String,
    #[serde(default)]
    pub has_api_key: bool,
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub params: GenParams,
    pub created_at: String,
    pub updated_at: String,
}

fn default_true() -> bool {
    true
}

impl ProviderRecord {
    pub fn has_model(&self, model: &str) -> bool {
        self.models.iter().any(|known| known == model)
    }
}

/// Input for creating a provider. The backend assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDraft {
    pub name: String,
    pub kind: ProviderKind,
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub models: Vec<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub params: GenParams,
}

/// Partial update for a provider. A blank or absent `api_key` means "keep the
/// stored credential"; it is stripped before the wire call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub models: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<GenParams>,
}

/// Named application tasks that can be bound to a provider. Extensible but
/// closed per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskKind {
    ResumeAnalysis,
    ResumeOptimization,
    QuestionGeneration,
}

impl TaskKind {
    pub const ALL: [TaskKind; 3] = [
        TaskKind::ResumeAnalysis,
        TaskKind::ResumeOptimization,
        TaskKind::QuestionGeneration,
    ];

    /// Wire name, matching the serde rename.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::ResumeAnalysis => "resumeAnalysis",
            TaskKind::ResumeOptimization => "resumeOptimization",
            TaskKind::QuestionGeneration => "questionGeneration",
        }
    }
}

/// Stored binding of a task to a provider/model/parameter triple. An absent
/// provider means "use the current default provider".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskBinding {
    pub task: TaskKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub overrides: GenParamsPatch,
}

impl TaskBinding {
    /// Lazily-created binding: use the default provider, no overrides.
    pub fn unbound(task: TaskKind) -> Self {
        Self {
            task,
            provider_id: None,
            model: None,
            overrides: GenParamsPatch::default(),
        }
    }
}

/// A single chat-test exchange against one provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub provider_id: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

pub fn normalize_optional_string(input: Option<String>) -> Option<String> {
    input.and_then(|value| normalize_string(&value))
}

pub fn normalize_string(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn validate_display_name(name: &str) -> Result<(), ConfigError> {
    let trimmed = name.trim();
    if trimmed.len() < MIN_NAME_LEN || trimmed.len() > MAX_NAME_LEN {
        return Err(ConfigError::Validation(
            "name must be between 1 and 128 characters".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_base_url(raw: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(raw.trim())
        .map_err(|err| ConfigError::Validation(format!("baseUrl is malformed: {err}")))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ConfigError::Validation(
            "baseUrl must use http or https".to_string(),
        ));
    }
    Ok(())
}
