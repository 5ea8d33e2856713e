//! Per-session ownership of the current rules and configuration.
//!
//! Generator calls are not deterministic, so two flows must never revise the
//! same session at once. The state sits behind one async mutex; whoever holds
//! the guard owns the session until it is dropped.

use crate::error::{PipelineError, PipelineResult};
use crate::persist;
use crate::schema::ConfigurationSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard};
use tracing::debug;

/// One recorded rules revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulesRevision {
    pub iteration: usize,
    pub rules: String,
    pub recorded_at: DateTime<Utc>,
}

/// Where each iteration's rules end up.
pub trait RulesStore: Send + Sync {
    fn store(&self, revision: &RulesRevision) -> PipelineResult<()>;
}

#[derive(Debug, Default)]
pub struct MemoryRulesStore {
    revisions: Mutex<Vec<RulesRevision>>,
}

impl MemoryRulesStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revisions(&self) -> Vec<RulesRevision> {
        self.revisions.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl RulesStore for MemoryRulesStore {
    fn store(&self, revision: &RulesRevision) -> PipelineResult<()> {
        self.revisions
            .lock()
            .map_err(|_| PipelineError::RulesStore("revision log poisoned".into()))?
            .push(revision.clone());
        Ok(())
    }
}

/// Overwrites one rules file with every revision.
#[derive(Debug, Clone)]
pub struct FileRulesStore {
    path: PathBuf,
}

impl FileRulesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RulesStore for FileRulesStore {
    fn store(&self, revision: &RulesRevision) -> PipelineResult<()> {
        persist::save_rules(&self.path, &revision.rules)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub rules: String,
    pub current: Option<ConfigurationSet>,
    pub history: Vec<RulesRevision>,
}

pub struct Session {
    state: AsyncMutex<SessionState>,
    store: Arc<dyn RulesStore>,
}

impl Session {
    pub fn new(rules: impl Into<String>, store: Arc<dyn RulesStore>) -> Self {
        Self {
            state: AsyncMutex::new(SessionState {
                rules: rules.into(),
                ..Default::default()
            }),
            store,
        }
    }

    pub fn in_memory(rules: impl Into<String>) -> Self {
        Self::new(rules, Arc::new(MemoryRulesStore::new()))
    }

    /// Exclusive access for the duration of a flow.
    pub async fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().await
    }

    /// Make `rules` current and persist them; there is no rollback.
    pub fn record_rules(
        &self,
        state: &mut SessionState,
        iteration: usize,
        rules: String,
    ) -> PipelineResult<()> {
        let revision = RulesRevision {
            iteration,
            rules,
            recorded_at: Utc::now(),
        };
        self.store.store(&revision)?;
        debug!("stored rules revision {} ({} bytes)", iteration, revision.rules.len());
        state.rules = revision.rules.clone();
        state.history.push(revision);
        Ok(())
    }

    pub async fn rules(&self) -> String {
        self.state.lock().await.rules.clone()
    }

    pub async fn current(&self) -> Option<ConfigurationSet> {
        self.state.lock().await.current.clone()
    }

    pub async fn history(&self) -> Vec<RulesRevision> {
        self.state.lock().await.history.clone()
    }
}
