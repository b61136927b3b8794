// Rules module - declarative per-exercise form rules
//
// - spec: wire format and the closed RuleKind variants
// - evaluator: pass/warn/fail per rule, confidence short-circuit
// - catalog: spec lookup with built-in fallback, shared via Arc

pub mod catalog;
pub mod evaluator;
pub mod spec;

pub use catalog::{DirectoryRuleSource, InMemoryRuleSource, RuleCatalog, RuleSpecSource};
pub use evaluator::{evaluate, RuleEvaluation, RuleIssue, RuleResult, CONFIDENCE_ISSUE_ID};
pub use spec::{ExerciseRuleSpec, RuleDefinition, RuleKind, Severity, SeverityMessages};
