use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::pose::PoseFrame;

fn default_frame_interval() -> u64 {
    100
}

/// A captured (or generated) stream of pose frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseRecording {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Spacing assumed for frames that carry no `t_ms`
    #[serde(default = "default_frame_interval")]
    pub frame_interval_ms: u64,
    pub frames: Vec<PoseFrame>,
}

/// Files may hold the full object or just the frame array
#[derive(Deserialize)]
#[serde(untagged)]
enum RecordingFile {
    Full(PoseRecording),
    Frames(Vec<PoseFrame>),
}

impl PoseRecording {
    pub fn new(name: impl Into<String>, frames: Vec<PoseFrame>) -> Self {
        Self {
            name: name.into(),
            notes: None,
            frame_interval_ms: default_frame_interval(),
            frames,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("reading recording {}", path.display()))?;
        let parsed: RecordingFile =
            serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))?;

        Ok(match parsed {
            RecordingFile::Full(recording) => recording,
            RecordingFile::Frames(frames) => {
                let name = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .ok_or_else(|| anyhow!("Invalid recording name for {}", path.display()))?;
                Self::new(name, frames)
            }
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))
    }

    /// Capture time of frame `index`, falling back to the nominal spacing
    pub fn timestamp_ms(&self, index: usize) -> u64 {
        self.frames
            .get(index)
            .and_then(|frame| frame.t_ms)
            .unwrap_or(index as u64 * self.frame_interval_ms)
    }

    pub fn duration_ms(&self) -> u64 {
        match self.frames.len() {
            0 => 0,
            n => self.timestamp_ms(n - 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::side_view_frame;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("squat_coach_recording_{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_save_and_load_preserves_frames() {
        let path = temp_path("saved.json");
        let recording = PoseRecording::new(
            "saved",
            vec![
                side_view_frame(300.0, 5.0, 0.9).with_timestamp(0),
                side_view_frame(310.0, 5.0, 0.9).with_timestamp(120),
            ],
        );
        recording.save(&path).unwrap();

        let loaded = PoseRecording::load(&path).unwrap();
        assert_eq!(loaded.name, "saved");
        assert_eq!(loaded.frames.len(), 2);
        assert_eq!(loaded.timestamp_ms(1), 120);
        assert_eq!(loaded.frames[1].keypoints, recording.frames[1].keypoints);
    }

    #[test]
    fn test_bare_frame_array_takes_name_from_file() {
        let path = temp_path("bare_frames.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let frames = vec![side_view_frame(300.0, 0.0, 0.9); 3];
        fs::write(&path, serde_json::to_string(&frames).unwrap()).unwrap();

        let loaded = PoseRecording::load(&path).unwrap();
        assert_eq!(loaded.name, "bare_frames");
        assert_eq!(loaded.timestamp_ms(2), 200);
        assert_eq!(loaded.duration_ms(), 200);
    }

    #[test]
    fn test_load_reports_path_on_error() {
        let err = PoseRecording::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(format!("{err:#}").contains("/definitely/not/here.json"));
    }
}
