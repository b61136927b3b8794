//! Rule spec lookup with built-in fallback
//!
//! The rule-config service is an external collaborator. Whatever it
//! answers, the coaching session always gets a spec: unknown exercises and
//! fetch failures fall back to [`ExerciseRuleSpec::builtin`]. Resolved specs
//! are cached and shared read-only between sessions via `Arc`.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use super::spec::ExerciseRuleSpec;
use crate::config::SessionConfig;
use crate::error::{log_rule_spec_error, RuleSpecError};
use crate::telemetry::{self, DiagnosticError};

/// Source of exercise rule specs, keyed by exercise id
pub trait RuleSpecSource: Send + Sync {
    fn fetch(&self, exercise: &str) -> Result<ExerciseRuleSpec, RuleSpecError>;
}

/// Specs held in memory, mostly for tests and embedding
#[derive(Debug, Default, Clone)]
pub struct InMemoryRuleSource {
    specs: HashMap<String, ExerciseRuleSpec>,
}

impl InMemoryRuleSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_spec(mut self, spec: ExerciseRuleSpec) -> Self {
        self.insert(spec);
        self
    }

    pub fn insert(&mut self, spec: ExerciseRuleSpec) {
        self.specs.insert(spec.exercise.clone(), spec);
    }
}

impl RuleSpecSource for InMemoryRuleSource {
    fn fetch(&self, exercise: &str) -> Result<ExerciseRuleSpec, RuleSpecError> {
        self.specs
            .get(exercise)
            .cloned()
            .ok_or_else(|| RuleSpecError::NotFound {
                exercise: exercise.to_string(),
            })
    }
}

/// Reads `<dir>/<exercise>.json`
#[derive(Debug, Clone)]
pub struct DirectoryRuleSource {
    dir: PathBuf,
}

impl DirectoryRuleSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl RuleSpecSource for DirectoryRuleSource {
    fn fetch(&self, exercise: &str) -> Result<ExerciseRuleSpec, RuleSpecError> {
        let valid_id = !exercise.is_empty()
            && exercise
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid_id {
            return Err(RuleSpecError::NotFound {
                exercise: exercise.to_string(),
            });
        }

        let path = self.dir.join(format!("{}.json", exercise));
        let json = fs::read_to_string(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => RuleSpecError::NotFound {
                exercise: exercise.to_string(),
            },
            _ => RuleSpecError::Io {
                path: path.display().to_string(),
                reason: err.to_string(),
            },
        })?;

        let spec = ExerciseRuleSpec::from_json(&json)?;
        log::info!("[Rules] Loaded '{}' from {:?}", exercise, path);
        Ok(spec)
    }
}

/// Resolves and caches rule specs
pub struct RuleCatalog {
    source: Option<Box<dyn RuleSpecSource>>,
    cache: Mutex<HashMap<String, Arc<ExerciseRuleSpec>>>,
}

impl RuleCatalog {
    pub fn new(source: Box<dyn RuleSpecSource>) -> Self {
        Self {
            source: Some(source),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Catalog that only knows the built-in spec
    pub fn builtin() -> Self {
        Self {
            source: None,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Directory-backed catalog when `rules_dir` is configured
    pub fn from_config(config: &SessionConfig) -> Self {
        match &config.rules_dir {
            Some(dir) => Self::new(Box::new(DirectoryRuleSource::new(dir.clone()))),
            None => Self::builtin(),
        }
    }

    /// Spec for `exercise`; never fails
    pub fn resolve(&self, exercise: &str) -> Arc<ExerciseRuleSpec> {
        if let Some(spec) = self.cached(exercise) {
            return spec;
        }

        let spec = match self.source.as_ref().map(|s| s.fetch(exercise)) {
            Some(Ok(spec)) => spec,
            Some(Err(RuleSpecError::NotFound { .. })) | None => {
                log::info!("[Rules] No spec for '{}', using built-in rules", exercise);
                ExerciseRuleSpec::builtin(exercise)
            }
            Some(Err(err)) => {
                log_rule_spec_error(&err, "RuleCatalog::resolve");
                telemetry::hub().record_error(DiagnosticError::RuleSpecFetch, err.to_string());
                ExerciseRuleSpec::builtin(exercise)
            }
        };

        let spec = Arc::new(spec);
        if let Ok(mut cache) = self.cache.lock() {
            cache
                .entry(exercise.to_string())
                .or_insert_with(|| Arc::clone(&spec));
        }
        spec
    }

    fn cached(&self, exercise: &str) -> Option<Arc<ExerciseRuleSpec>> {
        self.cache
            .lock()
            .ok()
            .and_then(|cache| cache.get(exercise).cloned())
    }
}

impl Default for RuleCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::spec::{RuleDefinition, Severity};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("squat_coach_{}_{}", tag, nanos));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_unknown_exercise_falls_back_to_builtin() {
        let catalog = RuleCatalog::new(Box::new(InMemoryRuleSource::new()));
        let spec = catalog.resolve("lunge");

        assert_eq!(spec.exercise, "lunge");
        assert_eq!(spec.rules.len(), 2);
    }

    #[test]
    fn test_resolved_spec_is_shared() {
        let custom = ExerciseRuleSpec {
            rules: vec![RuleDefinition::min("knee_bend", "knee_angle_deg", 80.0)
                .with_severity(Severity::Fail)],
            ..ExerciseRuleSpec::builtin("squat")
        };
        let catalog = RuleCatalog::new(Box::new(InMemoryRuleSource::new().with_spec(custom)));

        let a = catalog.resolve("squat");
        let b = catalog.resolve("squat");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.rules[0].id, "knee_bend");
    }

    #[test]
    fn test_directory_source_reads_json() {
        let dir = temp_dir("rules");
        fs::write(
            dir.join("squat.json"),
            r#"{ "exercise": "squat", "min_confidence": 0.6,
                 "rules": [ { "id": "knee_bend", "type": "min", "min_deg": 80 } ] }"#,
        )
        .unwrap();

        let source = DirectoryRuleSource::new(&dir);
        let spec = source.fetch("squat").unwrap();
        assert_eq!(spec.min_confidence, 0.6);

        assert!(matches!(
            source.fetch("deadlift"),
            Err(RuleSpecError::NotFound { .. })
        ));
        assert!(matches!(
            source.fetch("../squat"),
            Err(RuleSpecError::NotFound { .. })
        ));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let dir = temp_dir("bad_rules");
        fs::write(dir.join("squat.json"), "{ nope").unwrap();

        let catalog = RuleCatalog::new(Box::new(DirectoryRuleSource::new(&dir)));
        let spec = catalog.resolve("squat");
        assert_eq!(*spec, ExerciseRuleSpec::builtin("squat"));

        fs::remove_dir_all(&dir).ok();
    }
}
