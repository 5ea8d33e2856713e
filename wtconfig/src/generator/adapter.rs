use super::{sha256_hex, Generator, GeneratorRequest, GeneratorResponse};
use crate::context::GenerationContext;
use crate::error::{PipelineError, PipelineResult};
use crate::schema::{AggregateScope, ConfigurationSet, EntityKind};
use crate::validation::{ShapeReport, Validator, Verdict, Violation, ViolationKind};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

const SYNTHESIS_SYSTEM_PROMPT: &str = "\
You are an expert Data Transformation and System Configuration Agent.

Your primary mission is to accurately translate customer-specific work agreement \
rules, provided as a tabular requirements export, into structured JSON \
configuration tables for a time-management system. Act with precision: keep \
data integrity and follow the target JSON schema exactly.";

const REVISION_SYSTEM_PROMPT: &str = "\
You are an expert in modifying transformation rules based on provided feedback. \
Your goal is to update the rules to resolve discrepancies between expected and \
actual outputs. Provide only the updated rules content.";

/// Which adapter operation a generator call belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Synthesis,
    Revision,
}

impl Stage {
    fn timeout_error(self, timeout: Duration) -> PipelineError {
        match self {
            Stage::Synthesis => PipelineError::GenerationTimeout { timeout },
            Stage::Revision => PipelineError::RevisionTimeout { timeout },
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Synthesis => f.write_str("synthesis"),
            Stage::Revision => f.write_str("revision"),
        }
    }
}

/// Body of the first Markdown code fence in `text`, or the trimmed text when
/// there is none.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(open) = trimmed.find("```") else {
        return trimmed;
    };
    let after = &trimmed[open + 3..];
    // skip the info string (```json)
    let body = match after.find('\n') {
        Some(nl) => &after[nl + 1..],
        None => return trimmed,
    };
    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

/// Runs generator calls under a timeout and validates what comes back.
#[derive(Clone)]
pub struct GenerationAdapter {
    generator: Arc<dyn Generator>,
    validator: Validator,
    timeout: Duration,
}

impl GenerationAdapter {
    pub fn new(generator: Arc<dyn Generator>, validator: Validator, timeout: Duration) -> Self {
        Self {
            generator,
            validator,
            timeout,
        }
    }

    pub fn scope(&self) -> AggregateScope {
        self.validator.scope()
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// JSON Schema of the lists the generator is asked to produce.
    pub fn target_schema(&self) -> PipelineResult<Value> {
        self.validator.registry().target_schema(self.scope())
    }

    /// Generate a configuration set from `context` and validate it.
    pub async fn synthesize(&self, context: &GenerationContext) -> PipelineResult<ConfigurationSet> {
        let schema = self.target_schema()?;
        let request = GeneratorRequest {
            system_prompt: SYNTHESIS_SYSTEM_PROMPT.to_string(),
            prompt: synthesis_prompt(context, self.scope(), &schema)?,
            target_schema: Some(schema),
        };
        let candidate = match self.call(Stage::Synthesis, &request).await? {
            GeneratorResponse::Structured(Value::String(text)) | GeneratorResponse::Text(text) => {
                parse_candidate(&text)?
            }
            GeneratorResponse::Structured(value) => value,
        };

        let validator = self.validator.clone().with_reference(context.reference_keys());
        match validator.validate_json(&candidate)? {
            Verdict::Valid(set) => {
                info!(
                    "synthesized configuration: {} employee type(s), {} column display(s), {} day binding(s)",
                    set.employee_types.len(),
                    set.column_displays.len(),
                    set.day_type_bindings.len()
                );
                Ok(set)
            }
            Verdict::ShapeInvalid(report) => {
                warn!("generator output failed the shape check: {}", report);
                Err(PipelineError::SchemaConformance { report })
            }
            Verdict::Invalid(report) => {
                warn!("generator output violates invariants: {}", report);
                Err(PipelineError::Validation(report))
            }
        }
    }

    /// Ask the generator for rules that turn `actual` into `expected`.
    ///
    /// The answer is free text and is not schema-checked; only an empty
    /// answer is rejected.
    pub async fn revise_rules(
        &self,
        current_rules: &str,
        expected: &ConfigurationSet,
        actual: &ConfigurationSet,
    ) -> PipelineResult<String> {
        let scope = self.scope();
        let prompt = format!(
            "Given the current transformation rules:\n\n{}\n\n\
             And the following discrepancy:\n\
             Expected Output:\n{}\n\n\
             Actual Output:\n{}\n\n\
             Please update the transformation rules to ensure that this discrepancy does not occur again.\n\
             Provide only the updated rules content, no additional text or explanation.",
            current_rules,
            serde_json::to_string_pretty(&expected.to_document(scope)?)?,
            serde_json::to_string_pretty(&actual.to_document(scope)?)?,
        );
        let request = GeneratorRequest {
            system_prompt: REVISION_SYSTEM_PROMPT.to_string(),
            prompt,
            target_schema: None,
        };
        let text = self.call(Stage::Revision, &request).await?.to_text();
        let trimmed = text.trim();
        let rules = if trimmed.starts_with("```") {
            strip_code_fences(trimmed)
        } else {
            trimmed
        };
        if rules.is_empty() {
            warn!("generator returned empty rules");
            return Err(PipelineError::EmptyRules);
        }
        info!("revised rules: {} -> {} bytes", current_rules.len(), rules.len());
        Ok(rules.to_string())
    }

    async fn call(&self, stage: Stage, request: &GeneratorRequest) -> PipelineResult<GeneratorResponse> {
        let generator = self.generator.info();
        let prompt_hash = sha256_hex(request.prompt.as_bytes());
        let start = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, self.generator.invoke(request)).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        let response = match outcome {
            Err(_) => {
                warn!(%stage, provider = %generator.name, latency_ms, "generator call timed out");
                return Err(stage.timeout_error(self.timeout));
            }
            Ok(Err(e)) => {
                warn!(%stage, provider = %generator.name, latency_ms, "generator call failed: {}", e);
                return Err(e.into());
            }
            Ok(Ok(response)) => response,
        };
        info!(
            %stage,
            provider = %generator.name,
            model = %generator.model,
            prompt_sha256 = %prompt_hash,
            response_sha256 = %sha256_hex(response.to_text().as_bytes()),
            latency_ms,
            "generator call completed"
        );
        Ok(response)
    }
}

fn synthesis_prompt(
    context: &GenerationContext,
    scope: AggregateScope,
    schema: &Value,
) -> PipelineResult<String> {
    let tables = scope
        .entities()
        .iter()
        .map(|k| format!("- {}", k.list_key()))
        .collect::<Vec<_>>()
        .join("\n");
    Ok(format!(
        "{}\n\
         Generate the corresponding JSON configurations for the system tables.\n\
         The output should be a valid JSON object containing the configurations for the following tables:\n\
         {}\n\n\
         The object must follow this JSON Schema:\n{}\n\
         Return only the JSON object.",
        context.render(),
        tables,
        serde_json::to_string_pretty(schema)?,
    ))
}

/// Parse a text answer as JSON, looking inside a code fence when needed.
fn parse_candidate(text: &str) -> PipelineResult<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }
    serde_json::from_str(strip_code_fences(trimmed)).map_err(|e| {
        let mut report = ShapeReport::default();
        report.push(Violation::new(
            EntityKind::Aggregate,
            None,
            "",
            ViolationKind::Malformed,
            format!("generator output is not JSON: {}", e),
        ));
        PipelineError::SchemaConformance { report }
    })
}
