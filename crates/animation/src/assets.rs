//! Frame index: the startup-loaded map from frame groups to selectors
//!
//! The display backend owns the actual pixels; this index only names which
//! frames exist and which group each mouth shape resolves to.

use crate::cue::MouthShape;
use seance_core::FrameSelector;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameIndex {
    /// One frame per mouth shape while speaking with viseme data
    #[serde(default = "default_mouth_frames")]
    mouth: HashMap<MouthShape, FrameSelector>,

    /// Frames cycled while idle (and in the error state)
    #[serde(default = "default_idle_frames")]
    idle: Vec<FrameSelector>,

    /// Frames cycled by the talk-loop fallback
    #[serde(default = "default_talk_frames")]
    talk: Vec<FrameSelector>,
}

impl Default for FrameIndex {
    fn default() -> Self {
        Self {
            mouth: default_mouth_frames(),
            idle: default_idle_frames(),
            talk: default_talk_frames(),
        }
    }
}

impl FrameIndex {
    /// Load an index from a YAML file, falling back to the built-in index
    /// when the path is empty, missing, or malformed. Animation assets are
    /// never allowed to stop the engine from starting.
    pub fn load(path: &str) -> Self {
        if path.is_empty() {
            return Self::default();
        }
        let path = Path::new(path);
        if !path.exists() {
            warn!(path = %path.display(), "frame index not found, using built-in frames");
            return Self::default();
        }
        match std::fs::read_to_string(path).map_err(|e| e.to_string()).and_then(|text| {
            serde_yaml::from_str::<FrameIndex>(&text).map_err(|e| e.to_string())
        }) {
            Ok(index) => {
                if let Err(reason) = index.check() {
                    warn!(%reason, "frame index invalid, using built-in frames");
                    return Self::default();
                }
                info!(path = %path.display(), "loaded frame index");
                index
            },
            Err(reason) => {
                warn!(%reason, "failed to read frame index, using built-in frames");
                Self::default()
            },
        }
    }

    fn check(&self) -> Result<(), String> {
        if self.idle.is_empty() {
            return Err("idle frame list is empty".into());
        }
        if self.talk.is_empty() {
            return Err("talk frame list is empty".into());
        }
        for shape in [MouthShape::Closed, MouthShape::Narrow, MouthShape::Wide] {
            if !self.mouth.contains_key(&shape) {
                return Err(format!("missing mouth frame for {shape:?}"));
            }
        }
        Ok(())
    }

    /// Frame for a bucketed mouth shape. The index is validated at load
    /// time, so a missing entry only occurs for a hand-built index; fall
    /// back to the first talk frame rather than panicking.
    pub fn mouth_frame(&self, shape: MouthShape) -> FrameSelector {
        self.mouth
            .get(&shape)
            .cloned()
            .unwrap_or_else(|| self.talk[0].clone())
    }

    pub fn idle_frames(&self) -> &[FrameSelector] {
        &self.idle
    }

    pub fn talk_frames(&self) -> &[FrameSelector] {
        &self.talk
    }
}

fn default_mouth_frames() -> HashMap<MouthShape, FrameSelector> {
    let mut mouth = HashMap::new();
    mouth.insert(MouthShape::Closed, FrameSelector::segment("mouth_closed", 0));
    mouth.insert(MouthShape::Narrow, FrameSelector::segment("mouth_narrow", 0));
    mouth.insert(MouthShape::Wide, FrameSelector::segment("mouth_wide", 0));
    mouth
}

fn default_idle_frames() -> Vec<FrameSelector> {
    (0..4).map(|i| FrameSelector::segment("idle", i)).collect()
}

fn default_talk_frames() -> Vec<FrameSelector> {
    (0..3).map(|i| FrameSelector::segment("talk", i)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_index_is_complete() {
        let index = FrameIndex::default();
        assert!(index.check().is_ok());
        assert!(!index.idle_frames().is_empty());
        assert_ne!(
            index.mouth_frame(MouthShape::Closed),
            index.mouth_frame(MouthShape::Wide)
        );
    }

    #[test]
    fn test_missing_path_falls_back() {
        let index = FrameIndex::load("/nonexistent/frames.yaml");
        assert!(index.check().is_ok());
    }

    #[test]
    fn test_load_yaml_index() {
        let mut file = tempfile::NamedTempFile::with_suffix(".yaml").expect("temp file");
        writeln!(
            file,
            concat!(
                "mouth:\n",
                "  closed: {{ clip: shut, frame: 0 }}\n",
                "  narrow: {{ clip: mid, frame: 0 }}\n",
                "  wide: {{ clip: open, frame: 0 }}\n",
                "idle:\n",
                "  - {{ clip: breathe, frame: 0 }}\n",
                "  - {{ clip: breathe, frame: 1 }}\n",
                "talk: [3, 4, 5]\n",
            )
        )
        .expect("write");

        let index = FrameIndex::load(file.path().to_str().unwrap());
        assert_eq!(
            index.mouth_frame(MouthShape::Wide),
            FrameSelector::segment("open", 0)
        );
        assert_eq!(index.talk_frames()[0], FrameSelector::index(3));
    }

    #[test]
    fn test_malformed_yaml_falls_back() {
        let mut file = tempfile::NamedTempFile::with_suffix(".yaml").expect("temp file");
        writeln!(file, "idle: [not-a-frame]").expect("write");

        let index = FrameIndex::load(file.path().to_str().unwrap());
        assert!(index.check().is_ok());
        assert_eq!(index.idle_frames(), FrameIndex::default().idle_frames());
    }
}
