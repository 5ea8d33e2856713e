//! Rules correction loop.
//!
//! Revises the rules until synthesis reproduces the expected configuration
//! or the iteration budget runs out. Every revision is stored as the current
//! rules as soon as it is produced, converged or not: a caller that gets
//! `converged == false` back holds the last attempt and must decide whether
//! to keep it.

use crate::context::GenerationContext;
use crate::error::PipelineResult;
use crate::generator::GenerationAdapter;
use crate::schema::ConfigurationSet;
use crate::session::Session;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionOutcome {
    pub rules: String,
    pub configuration: ConfigurationSet,
    pub converged: bool,
    /// Revision/synthesis pairs performed.
    pub iterations: usize,
}

pub struct CorrectionLoop {
    adapter: GenerationAdapter,
}

impl CorrectionLoop {
    pub fn new(adapter: GenerationAdapter) -> Self {
        Self { adapter }
    }

    fn matches(&self, expected: &ConfigurationSet, actual: &ConfigurationSet) -> bool {
        let scope = self.adapter.scope();
        expected
            .restricted_to(scope)
            .structurally_equal(&actual.restricted_to(scope))
    }

    /// Holds the session lock for the whole run. Errors abort the loop;
    /// revisions stored before the error stay stored.
    pub async fn correct(
        &self,
        session: &Session,
        context: &GenerationContext,
        expected: &ConfigurationSet,
        actual: ConfigurationSet,
        max_iterations: usize,
    ) -> PipelineResult<CorrectionOutcome> {
        let mut state = session.lock().await;
        state.current = Some(actual.clone());

        if self.matches(expected, &actual) {
            info!("actual configuration already matches the expected one");
            return Ok(CorrectionOutcome {
                rules: state.rules.clone(),
                configuration: actual,
                converged: true,
                iterations: 0,
            });
        }

        let mut actual = actual;
        for iteration in 1..=max_iterations {
            info!("correction iteration {}/{}", iteration, max_iterations);
            let revised = self
                .adapter
                .revise_rules(&state.rules, expected, &actual)
                .await?;
            session.record_rules(&mut state, iteration, revised)?;

            let revised_context = context.with_rules(state.rules.clone())?;
            actual = self.adapter.synthesize(&revised_context).await?;
            state.current = Some(actual.clone());

            if self.matches(expected, &actual) {
                info!("converged after {} iteration(s)", iteration);
                return Ok(CorrectionOutcome {
                    rules: state.rules.clone(),
                    configuration: actual,
                    converged: true,
                    iterations: iteration,
                });
            }
        }

        warn!(
            "not converged after {} iteration(s); keeping the last revised rules",
            max_iterations
        );
        Ok(CorrectionOutcome {
            rules: state.rules.clone(),
            configuration: actual,
            converged: false,
            iterations: max_iterations,
        })
    }
}
