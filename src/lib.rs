//! Provider and task configuration management for pluggable LLM backends.
//!
//! The crate models a set of configured providers (endpoint, write-only
//! credential, model catalog, generation parameters), binds named
//! application tasks to a provider/model/parameter triple, and exposes
//! connectivity probes and a chat-test session. All mutations funnel through
//! [`ConfigFacade`]; the backend service that persists records and speaks
//! the LLM wire protocols sits behind the [`ConfigRpc`] boundary.

mod bindings;
mod error;
mod facade;
mod models;
mod probe;
mod registry;
mod rpc;
mod session;
mod utils;

pub use bindings::{resolve, BindingTable, ResolvedTask};
pub use error::{ConfigError, Result};
pub use facade::ConfigFacade;
pub use models::{
    ChatRequest, GenParams, GenParamsPatch, ProviderDraft, ProviderKind, ProviderPatch,
    ProviderRecord, TaskBinding, TaskKind,
};
pub use probe::{ProbeKey, TestResult, DEFAULT_MODEL_KEY};
pub use registry::RegistrySnapshot;
pub use rpc::{ConfigRpc, HttpRpc, SyncOutcome, TestOutcome};
pub use session::{ChatRole, ChatSession, ChatTurn, SessionState};
