//! Remote generator providers.

use super::scripted::ScriptedGenerator;
use super::{sha256_hex, Generator, GeneratorError, GeneratorInfo, GeneratorRequest, GeneratorResponse};
use crate::config::{GeneratorConfig, ProviderKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Environment switch that permits the scripted provider outside tests.
pub const ALLOW_SCRIPTED_ENV: &str = "WTCONFIG_ALLOW_SCRIPTED_GENERATOR";

fn http_client(timeout: Duration) -> Result<reqwest::Client, GeneratorError> {
    // Slightly longer than the adapter timeout so the adapter reports it.
    Ok(reqwest::Client::builder()
        .timeout(timeout + Duration::from_secs(5))
        .build()?)
}

async fn read_body(response: reqwest::Response) -> Result<String, GeneratorError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(GeneratorError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

// Gemini generateContent wire types

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize, Deserialize, Default)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: GeminiContent,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: Option<u32>,
    #[serde(default)]
    candidates_token_count: Option<u32>,
}

/// Google Generative Language API (`models/{model}:generateContent`).
pub struct GeminiGenerator {
    config: GeneratorConfig,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiGenerator {
    pub fn new(config: GeneratorConfig, api_key: String) -> Result<Self, GeneratorError> {
        let client = http_client(config.timeout())?;
        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    fn body(&self, request: &GeneratorRequest) -> GeminiRequest {
        let system_instruction = (!request.system_prompt.is_empty()).then(|| GeminiContent {
            role: None,
            parts: vec![GeminiPart {
                text: request.system_prompt.clone(),
            }],
        });
        GeminiRequest {
            system_instruction,
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: request.prompt.clone(),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_output_tokens,
                response_mime_type: request
                    .target_schema
                    .as_ref()
                    .map(|_| "application/json".to_string()),
            },
        }
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    async fn invoke(&self, request: &GeneratorRequest) -> Result<GeneratorResponse, GeneratorError> {
        let base_url = self.config.base_url.as_deref().unwrap_or(GEMINI_BASE_URL);
        let url = format!("{}/models/{}:generateContent", base_url, self.config.model);
        let payload = serde_json::to_vec(&self.body(request))
            .map_err(|e| GeneratorError::InvalidResponse(format!("failed to encode request: {}", e)))?;
        let payload_hash = sha256_hex(&payload);

        let start = Instant::now();
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .body(payload)
            .send()
            .await?;
        let raw = read_body(response).await?;

        let parsed: GeminiResponse = serde_json::from_str(&raw)
            .map_err(|e| GeneratorError::InvalidResponse(format!("failed to parse response: {}", e)))?;
        let usage = parsed.usage_metadata.unwrap_or_default();
        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| GeneratorError::InvalidResponse("response has no candidates".into()))?;
        let text: String = candidate.content.parts.into_iter().map(|p| p.text).collect();
        debug!(
            provider = "gemini",
            model = %self.config.model,
            payload_sha256 = %payload_hash,
            prompt_tokens = ?usage.prompt_token_count,
            completion_tokens = ?usage.candidates_token_count,
            finish_reason = ?candidate.finish_reason,
            latency_ms = start.elapsed().as_millis() as u64,
            "gemini completion"
        );

        if request.target_schema.is_some() {
            if let Ok(value) = serde_json::from_str::<Value>(&text) {
                return Ok(GeneratorResponse::Structured(value));
            }
        }
        Ok(GeneratorResponse::Text(text))
    }

    fn info(&self) -> GeneratorInfo {
        GeneratorInfo {
            name: "gemini".to_string(),
            model: self.config.model.clone(),
        }
    }
}

// OpenAI chat completions wire types

#[derive(Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: Option<u32>,
    #[serde(default)]
    completion_tokens: Option<u32>,
}

/// OpenAI-compatible chat completions (works with OpenAI and OpenRouter).
pub struct OpenAiGenerator {
    config: GeneratorConfig,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiGenerator {
    pub fn new(config: GeneratorConfig, api_key: String) -> Result<Self, GeneratorError> {
        let client = http_client(config.timeout())?;
        Ok(Self {
            config,
            api_key,
            client,
        })
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn invoke(&self, request: &GeneratorRequest) -> Result<GeneratorResponse, GeneratorError> {
        let base_url = self.config.base_url.as_deref().unwrap_or(OPENAI_BASE_URL);
        let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));
        let body = OpenAiRequest {
            model: self.config.model.clone(),
            messages: vec![
                OpenAiMessage {
                    role: "system".to_string(),
                    content: request.system_prompt.clone(),
                },
                OpenAiMessage {
                    role: "user".to_string(),
                    content: request.prompt.clone(),
                },
            ],
            max_tokens: self.config.max_output_tokens,
            temperature: self.config.temperature,
            response_format: request
                .target_schema
                .as_ref()
                .map(|_| serde_json::json!({"type": "json_object"})),
        };
        let payload = serde_json::to_vec(&body)
            .map_err(|e| GeneratorError::InvalidResponse(format!("failed to encode request: {}", e)))?;
        let payload_hash = sha256_hex(&payload);

        let start = Instant::now();
        let mut builder = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json");
        if base_url.contains("openrouter.ai") {
            builder = builder.header("X-Title", "wtconfig");
        }
        let raw = read_body(builder.body(payload).send().await?).await?;

        let parsed: OpenAiResponse = serde_json::from_str(&raw)
            .map_err(|e| GeneratorError::InvalidResponse(format!("failed to parse response: {}", e)))?;
        let usage = parsed.usage.unwrap_or_default();
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GeneratorError::InvalidResponse("response has no choices".into()))?;
        debug!(
            provider = "openai",
            model = %self.config.model,
            payload_sha256 = %payload_hash,
            prompt_tokens = ?usage.prompt_tokens,
            completion_tokens = ?usage.completion_tokens,
            finish_reason = ?choice.finish_reason,
            latency_ms = start.elapsed().as_millis() as u64,
            "chat completion"
        );
        Ok(GeneratorResponse::Text(choice.message.content))
    }

    fn info(&self) -> GeneratorInfo {
        GeneratorInfo {
            name: "openai".to_string(),
            model: self.config.model.clone(),
        }
    }
}

/// Builds the configured generator.
pub struct GeneratorFactory;

impl GeneratorFactory {
    /// `api_key` comes from [`GeneratorConfig::credential`], read once at start.
    pub fn create(
        config: &GeneratorConfig,
        api_key: Option<String>,
    ) -> Result<Arc<dyn Generator>, GeneratorError> {
        let missing_key = || GeneratorError::NotAllowed(format!(
            "{:?} provider requires an API key ({})",
            config.provider, config.api_key_env
        ));
        match config.provider {
            ProviderKind::Gemini => {
                let key = api_key.ok_or_else(missing_key)?;
                Ok(Arc::new(GeminiGenerator::new(config.clone(), key)?))
            }
            ProviderKind::OpenAi => {
                let key = api_key.ok_or_else(missing_key)?;
                Ok(Arc::new(OpenAiGenerator::new(config.clone(), key)?))
            }
            ProviderKind::Scripted => {
                let allowed = std::env::var(ALLOW_SCRIPTED_ENV)
                    .map(|v| v == "1" || v == "true")
                    .unwrap_or(false)
                    || cfg!(test);
                if !allowed {
                    return Err(GeneratorError::NotAllowed(format!(
                        "scripted generator is for development only; set {}=1 to enable it",
                        ALLOW_SCRIPTED_ENV
                    )));
                }
                let script = config.script.as_deref().ok_or_else(|| {
                    GeneratorError::NotAllowed("scripted generator requires generator.script".into())
                })?;
                warn!("using scripted generator from {}", script.display());
                Ok(Arc::new(ScriptedGenerator::from_file(script)?))
            }
        }
    }
}
