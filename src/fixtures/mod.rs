//! Fixture utilities for the deterministic CLI harness.
//!
//! Recordings are JSON pose streams under `fixtures/`, optionally paired
//! with a `<name>.expect.json` describing the reps and cues a replay must
//! produce. The synthetic generator writes the same format, so CI can
//! exercise the full pipeline without a camera.

mod recording;
mod replay;
mod synthetic;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

pub use recording::PoseRecording;
pub use replay::{replay, ReplayCue, ReplayRep, ReplayReport};
pub use synthetic::{side_view_frame, SyntheticSquat};

/// Default location for fixture recordings.
pub const DEFAULT_FIXTURE_ROOT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures");

const EXPECT_SUFFIX: &str = ".expect.json";

/// Metadata describing an available recording.
#[derive(Clone, Debug)]
pub struct FixtureMetadata {
    pub name: String,
    pub recording_path: PathBuf,
    pub expect_path: Option<PathBuf>,
}

/// Loaded recording plus its expectations, when present.
pub struct FixtureData {
    pub metadata: FixtureMetadata,
    pub recording: PoseRecording,
    pub expectations: Option<FixtureExpectations>,
}

/// JSON expectation schema for replay verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureExpectations {
    #[serde(default)]
    pub notes: Option<String>,
    pub reps: u32,
    #[serde(default)]
    pub rep_tolerance: u32,
    /// Issues that must be spoken at least once
    #[serde(default)]
    pub cues: Vec<String>,
    /// Issues that must never be spoken
    #[serde(default)]
    pub silent: Vec<String>,
}

impl FixtureExpectations {
    pub fn verify(&self, report: &ReplayReport) -> std::result::Result<(), ExpectationDiff> {
        let mut failures = Vec::new();

        if report.rep_count.abs_diff(self.reps) > self.rep_tolerance {
            failures.push(ExpectationFailure::RepCount {
                expected: self.reps,
                actual: report.rep_count,
                tolerance: self.rep_tolerance,
            });
        }

        for issue_id in &self.cues {
            if report.cue_count(issue_id) == 0 {
                failures.push(ExpectationFailure::MissingCue {
                    issue_id: issue_id.clone(),
                });
            }
        }

        for issue_id in &self.silent {
            let spoken = report.cue_count(issue_id);
            if spoken > 0 {
                failures.push(ExpectationFailure::UnexpectedCue {
                    issue_id: issue_id.clone(),
                    spoken,
                });
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ExpectationDiff { failures })
        }
    }
}

/// Outcome of comparing a replay with expectations.
#[derive(Debug, Serialize)]
pub struct ExpectationDiff {
    pub failures: Vec<ExpectationFailure>,
}

impl ExpectationDiff {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "failures": self.failures })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExpectationFailure {
    RepCount {
        expected: u32,
        actual: u32,
        tolerance: u32,
    },
    MissingCue {
        issue_id: String,
    },
    UnexpectedCue {
        issue_id: String,
        spoken: usize,
    },
}

/// Catalog responsible for discovering recordings on disk.
pub struct FixtureCatalog {
    root: PathBuf,
}

impl FixtureCatalog {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List all recordings by their metadata.
    pub fn discover(&self) -> Result<Vec<FixtureMetadata>> {
        let mut fixtures = Vec::new();
        if !self.root.exists() {
            return Ok(fixtures);
        }

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            if is_recording_path(&path) {
                fixtures.push(self.metadata_for_path(&path)?);
            }
        }

        fixtures.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(fixtures)
    }

    /// Load a recording + expectations by name or path.
    pub fn load(&self, fixture: &str, override_expect: Option<PathBuf>) -> Result<FixtureData> {
        let path = self.resolve_fixture_path(fixture)?;
        let metadata = self.metadata_for_path(&path)?;
        let recording = PoseRecording::load(&path)?;

        let expectation_path = override_expect.or(metadata.expect_path.clone());
        let expectations = match expectation_path {
            Some(path) => {
                let json = fs::read_to_string(&path)
                    .with_context(|| format!("reading expectation {}", path.display()))?;
                Some(
                    serde_json::from_str(&json)
                        .with_context(|| format!("parsing {}", path.display()))?,
                )
            }
            None => None,
        };

        Ok(FixtureData {
            metadata,
            recording,
            expectations,
        })
    }

    fn resolve_fixture_path(&self, fixture: &str) -> Result<PathBuf> {
        let as_path = Path::new(fixture);
        if as_path.is_file() {
            return Ok(as_path.to_path_buf());
        }

        let candidate = self.root.join(format!("{fixture}.json"));
        if candidate.is_file() {
            Ok(candidate)
        } else {
            Err(anyhow!(
                "Fixture '{fixture}' not found in {}",
                self.root.display()
            ))
        }
    }

    fn metadata_for_path(&self, path: &Path) -> Result<FixtureMetadata> {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| anyhow!("Invalid fixture name for {}", path.display()))?
            .to_string();
        let expect_path = path.with_file_name(format!("{name}{EXPECT_SUFFIX}"));
        Ok(FixtureMetadata {
            name,
            recording_path: path.to_path_buf(),
            expect_path: expect_path.is_file().then_some(expect_path),
        })
    }
}

impl Default for FixtureCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_FIXTURE_ROOT)
    }
}

fn is_recording_path(path: &Path) -> bool {
    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    file_name.ends_with(".json") && !file_name.ends_with(EXPECT_SUFFIX)
}
