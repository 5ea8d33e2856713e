//! The external generator capability and the adapter that guards it.
//!
//! A [`Generator`] is untrusted and non-deterministic. Everything it returns
//! goes through the [`GenerationAdapter`], which bounds the call with a
//! timeout and validates the result before anyone else sees it.

pub mod adapter;
pub mod providers;
pub mod scripted;

pub use adapter::{strip_code_fences, GenerationAdapter, Stage};
pub use providers::{GeminiGenerator, GeneratorFactory, OpenAiGenerator};
pub use scripted::ScriptedGenerator;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("generator API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("unexpected generator response: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    NotAllowed(String),

    #[error("scripted generator has no response left for call {call}")]
    ScriptExhausted { call: usize },

    #[error("scripted generator failure: {0}")]
    Scripted(String),
}

/// One generator call: instructions, prompt, and the expected output schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorRequest {
    pub system_prompt: String,
    pub prompt: String,
    /// JSON Schema the answer should follow; `None` for free text.
    pub target_schema: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GeneratorResponse {
    Structured(Value),
    Text(String),
}

impl GeneratorResponse {
    /// Textual form, used for hashing and for free-text answers.
    pub fn to_text(&self) -> String {
        match self {
            GeneratorResponse::Structured(Value::String(s)) => s.clone(),
            GeneratorResponse::Structured(v) => v.to_string(),
            GeneratorResponse::Text(t) => t.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorInfo {
    pub name: String,
    pub model: String,
}

#[async_trait]
pub trait Generator: Send + Sync {
    async fn invoke(&self, request: &GeneratorRequest) -> Result<GeneratorResponse, GeneratorError>;

    fn info(&self) -> GeneratorInfo;
}

pub(crate) fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
