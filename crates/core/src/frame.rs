//! Frame selection: what the synchronizer hands the display backend

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Identifies one displayable frame in the pre-indexed animation assets.
///
/// The display backend owns the mapping from a selector to actual pixels;
/// this type is the whole of the render boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrameSelector {
    /// Frame index into the flat asset sequence
    Index(u32),
    /// Named clip segment plus a frame offset within it
    Segment {
        clip: Arc<str>,
        frame: u32,
    },
}

impl FrameSelector {
    pub fn index(i: u32) -> Self {
        FrameSelector::Index(i)
    }

    pub fn segment(clip: impl Into<Arc<str>>, frame: u32) -> Self {
        FrameSelector::Segment {
            clip: clip.into(),
            frame,
        }
    }
}

impl std::fmt::Display for FrameSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameSelector::Index(i) => write!(f, "#{i}"),
            FrameSelector::Segment { clip, frame } => write!(f, "{clip}:{frame}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_display() {
        assert_eq!(FrameSelector::index(12).to_string(), "#12");
        assert_eq!(FrameSelector::segment("mouth_wide", 2).to_string(), "mouth_wide:2");
    }

    #[test]
    fn test_selector_serde() {
        let sel = FrameSelector::segment("idle", 0);
        let json = serde_json::to_string(&sel).unwrap();
        let back: FrameSelector = serde_json::from_str(&json).unwrap();
        assert_eq!(sel, back);
    }
}
