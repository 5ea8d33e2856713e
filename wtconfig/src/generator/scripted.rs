//! Deterministic generator replaying canned responses.

use super::{Generator, GeneratorError, GeneratorInfo, GeneratorRequest, GeneratorResponse};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// Canned outcome of one scripted call.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Respond(GeneratorResponse),
    Fail(String),
}

/// Replays responses in order and records every request it receives.
///
/// Script files are a JSON array: strings become text responses, anything
/// else a structured response.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<ScriptedReply>>,
    calls: Mutex<Vec<GeneratorRequest>>,
    delay: Option<Duration>,
}

impl ScriptedGenerator {
    pub fn new(responses: impl IntoIterator<Item = GeneratorResponse>) -> Self {
        Self::with_replies(responses.into_iter().map(ScriptedReply::Respond))
    }

    pub fn with_replies(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, GeneratorError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GeneratorError::Scripted(format!("cannot read script {}: {}", path.display(), e))
        })?;
        let script: Vec<Value> = serde_json::from_str(&content).map_err(|e| {
            GeneratorError::Scripted(format!("script {} is not a JSON array: {}", path.display(), e))
        })?;
        Ok(Self::new(script.into_iter().map(|v| match v {
            Value::String(text) => GeneratorResponse::Text(text),
            other => GeneratorResponse::Structured(other),
        })))
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push(&self, reply: ScriptedReply) -> Result<(), GeneratorError> {
        self.replies
            .lock()
            .map_err(|_| GeneratorError::Scripted("script poisoned".into()))?
            .push_back(reply);
        Ok(())
    }

    pub fn calls(&self) -> Vec<GeneratorRequest> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn invoke(&self, request: &GeneratorRequest) -> Result<GeneratorResponse, GeneratorError> {
        let call = {
            let mut calls = self
                .calls
                .lock()
                .map_err(|_| GeneratorError::Scripted("call log poisoned".into()))?;
            calls.push(request.clone());
            calls.len()
        };
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let reply = self
            .replies
            .lock()
            .map_err(|_| GeneratorError::Scripted("script poisoned".into()))?
            .pop_front();
        match reply {
            Some(ScriptedReply::Respond(response)) => Ok(response),
            Some(ScriptedReply::Fail(message)) => Err(GeneratorError::Scripted(message)),
            None => Err(GeneratorError::ScriptExhausted { call }),
        }
    }

    fn info(&self) -> GeneratorInfo {
        GeneratorInfo {
            name: "scripted".to_string(),
            model: "scripted".to_string(),
        }
    }
}
