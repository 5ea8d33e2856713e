//! Generation context assembly.
//!
//! The assembler is pure: callers read the files, the assembler only labels
//! and orders what it is given so the generator can tell authoritative rules
//! apart from raw requirements and read-only reference data.

use crate::error::{PipelineError, PipelineResult};
use crate::validation::ReferenceKeys;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Role of a context section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionKind {
    /// Authoritative transformation rules.
    Rules,
    /// Raw tabular requirements export.
    Requirements,
    /// Read-only reference table.
    Reference,
}

impl SectionKind {
    fn label(&self) -> &'static str {
        match self {
            SectionKind::Rules => "RULES (authoritative)",
            SectionKind::Requirements => "REQUIREMENTS (tabular export)",
            SectionKind::Reference => "REFERENCE (read-only)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSection {
    pub kind: SectionKind,
    /// Reference table name; `None` for rules and requirements.
    pub name: Option<String>,
    pub body: String,
}

impl fmt::Display for ContextSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => writeln!(f, "=== {}: {} ===", self.kind.label(), name)?,
            None => writeln!(f, "=== {} ===", self.kind.label())?,
        }
        writeln!(f, "{}", self.body.trim_end())
    }
}

/// Ordered, labelled input of a generation: rules, requirements, references.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationContext {
    rules: String,
    requirements: String,
    references: BTreeMap<String, Value>,
}

impl GenerationContext {
    pub fn rules(&self) -> &str {
        &self.rules
    }

    pub fn requirements(&self) -> &str {
        &self.requirements
    }

    pub fn references(&self) -> &BTreeMap<String, Value> {
        &self.references
    }

    /// Logical requirement rows: non-blank lines after the header.
    pub fn requirement_rows(&self) -> usize {
        self.requirements
            .lines()
            .filter(|l| !l.trim().is_empty())
            .count()
            .saturating_sub(1)
    }

    /// Same requirements and references, different rules.
    pub fn with_rules(&self, rules: impl Into<String>) -> PipelineResult<GenerationContext> {
        let rules = rules.into();
        if rules.trim().is_empty() {
            return Err(PipelineError::EmptyRules);
        }
        Ok(GenerationContext {
            rules,
            requirements: self.requirements.clone(),
            references: self.references.clone(),
        })
    }

    /// Keys harvested from the reference tables, for the validator.
    pub fn reference_keys(&self) -> ReferenceKeys {
        ReferenceKeys::from_tables(&self.references)
    }

    pub fn sections(&self) -> Vec<ContextSection> {
        let mut sections = vec![
            ContextSection {
                kind: SectionKind::Rules,
                name: None,
                body: self.rules.clone(),
            },
            ContextSection {
                kind: SectionKind::Requirements,
                name: None,
                body: self.requirements.clone(),
            },
        ];
        for (name, table) in &self.references {
            let body = serde_json::to_string_pretty(table).unwrap_or_else(|_| table.to_string());
            sections.push(ContextSection {
                kind: SectionKind::Reference,
                name: Some(name.clone()),
                body,
            });
        }
        sections
    }

    /// Single prompt-ready text with every section labelled.
    pub fn render(&self) -> String {
        self.sections()
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ContextAssembler;

impl ContextAssembler {
    pub fn new() -> Self {
        Self
    }

    pub fn assemble(
        &self,
        rules: &str,
        requirements: &str,
        references: BTreeMap<String, Value>,
    ) -> PipelineResult<GenerationContext> {
        if rules.trim().is_empty() {
            return Err(PipelineError::EmptyRules);
        }
        let context = GenerationContext {
            rules: rules.to_string(),
            requirements: requirements.to_string(),
            references,
        };
        debug!(
            "assembled context: {} rules bytes, {} requirement row(s), {} reference table(s)",
            context.rules.len(),
            context.requirement_rows(),
            context.references.len()
        );
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CSV: &str = "name,hours,days\nstandard,8,sun-thu\n\nshift,12,any\n";

    fn references() -> BTreeMap<String, Value> {
        let mut refs = BTreeMap::new();
        refs.insert("wt_et_cols_defs.json".to_string(), json!([{"pcol_number": 100}]));
        refs.insert("wt_day_types.json".to_string(), json!([{"day_type_id": 1}]));
        refs
    }

    #[test]
    fn test_blank_rules_rejected() {
        let err = ContextAssembler::new().assemble(" \n\t", CSV, BTreeMap::new()).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyRules));
    }

    #[test]
    fn test_sections_are_ordered_and_labelled() {
        let ctx = ContextAssembler::new()
            .assemble("Round hours up.", CSV, references())
            .unwrap();
        let sections = ctx.sections();
        let kinds: Vec<SectionKind> = sections.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SectionKind::Rules,
                SectionKind::Requirements,
                SectionKind::Reference,
                SectionKind::Reference
            ]
        );
        assert_eq!(sections[2].name.as_deref(), Some("wt_day_types.json"));

        let text = ctx.render();
        let rules_at = text.find("=== RULES").unwrap();
        let reqs_at = text.find("=== REQUIREMENTS").unwrap();
        let ref_at = text.find("=== REFERENCE (read-only): wt_day_types.json").unwrap();
        assert!(rules_at < reqs_at && reqs_at < ref_at);
        assert!(text.contains("standard,8,sun-thu"));
    }

    #[test]
    fn test_requirement_rows_skip_header_and_blanks() {
        let ctx = ContextAssembler::new().assemble("r", CSV, BTreeMap::new()).unwrap();
        assert_eq!(ctx.requirement_rows(), 2);
        let empty = ContextAssembler::new().assemble("r", "", BTreeMap::new()).unwrap();
        assert_eq!(empty.requirement_rows(), 0);
    }

    #[test]
    fn test_with_rules_keeps_inputs() {
        let ctx = ContextAssembler::new().assemble("v1", CSV, references()).unwrap();
        let next = ctx.with_rules("v2").unwrap();
        assert_eq!(next.rules(), "v2");
        assert_eq!(next.requirements(), ctx.requirements());
        assert_eq!(next.references(), ctx.references());
        assert!(matches!(ctx.with_rules(""), Err(PipelineError::EmptyRules)));
        assert!(next.reference_keys().get(crate::schema::EntityKind::DayType).is_some());
    }
}
