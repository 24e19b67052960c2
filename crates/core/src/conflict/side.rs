//! One side (ours or theirs) of a conflict.

use serde::{Deserialize, Serialize};

use super::ConflictId;
use crate::text::{Gravity, Range, TextBuffer};

/// Which competing version a side holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideKind {
    Ours,
    Theirs,
}

impl SideKind {
    pub fn other(self) -> Self {
        match self {
            Self::Ours => Self::Theirs,
            Self::Theirs => Self::Ours,
        }
    }

    /// Human-readable description used in banners and logs.
    pub fn description(self) -> &'static str {
        match self {
            Self::Ours => "our changes",
            Self::Theirs => "their changes",
        }
    }
}

impl std::fmt::Display for SideKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ours => write!(f, "ours"),
            Self::Theirs => write!(f, "theirs"),
        }
    }
}

/// Which half of the marker block a side occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Top,
    Bottom,
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Top => write!(f, "top"),
            Self::Bottom => write!(f, "bottom"),
        }
    }
}

/// The range a side's content runs into: the separator for the top side, the
/// side's own closing banner for the bottom side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Following {
    Separator,
    Banner,
}

/// One side of a conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Side {
    pub(crate) kind: SideKind,
    pub(crate) position: Position,
    pub(crate) label: String,
    pub(crate) range: Range,
    pub(crate) banner_range: Range,
    pub(crate) following: Following,
    pub(crate) original_text: String,
    pub(crate) dirty: bool,
    pub(crate) conflict: ConflictId,
}

impl Side {
    pub fn kind(&self) -> SideKind {
        self.kind
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Ref name from the banner line (`HEAD`, a branch, a commit shortlog).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Content rows, excluding banner and separator lines.
    pub fn range(&self) -> Range {
        self.range
    }

    pub fn banner_range(&self) -> Range {
        self.banner_range
    }

    pub fn following(&self) -> Following {
        self.following
    }

    /// Content captured when the conflict was scanned.
    pub fn original_text(&self) -> &str {
        &self.original_text
    }

    /// Result of the last [`detect_dirty`](Self::detect_dirty).
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The owning conflict.
    pub fn conflict(&self) -> ConflictId {
        self.conflict
    }

    pub fn description(&self) -> &'static str {
        self.kind.description()
    }

    /// Current text of the side's content range.
    pub fn current_text(&self, buffer: &impl TextBuffer) -> String {
        buffer.text_in_range(self.range)
    }

    /// Compare the buffer with `original_text` and record the outcome.
    pub fn detect_dirty(&mut self, buffer: &impl TextBuffer) -> bool {
        self.dirty = self.current_text(buffer) != self.original_text;
        self.dirty
    }

    pub(crate) fn track_edit(&mut self, old: Range, new: Range) {
        self.range.track_edit(old, new, Gravity::Grow);
        self.banner_range.track_edit(old, new, Gravity::Fixed);
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}) '{}' at {}",
            self.kind,
            self.description(),
            self.label,
            self.range
        )?;
        if self.dirty {
            write!(f, " [modified]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::{Point, StringBuffer};

    fn ours_side() -> Side {
        Side {
            kind: SideKind::Ours,
            position: Position::Top,
            label: "HEAD".into(),
            range: Range::rows(1, 2),
            banner_range: Range::rows(0, 1),
            following: Following::Separator,
            original_text: "A\n".into(),
            dirty: false,
            conflict: ConflictId(0),
        }
    }

    #[test]
    fn test_kind_helpers() {
        assert_eq!(SideKind::Ours.other(), SideKind::Theirs);
        assert_eq!(SideKind::Theirs.other(), SideKind::Ours);
        assert_eq!(SideKind::Ours.description(), "our changes");
        assert_eq!(SideKind::Theirs.to_string(), "theirs");
    }

    #[test]
    fn test_detect_dirty() {
        let mut buffer = StringBuffer::new("<<<<<<< HEAD\nA\n=======\nB\n>>>>>>> branch\n");
        let mut side = ours_side();
        assert!(!side.detect_dirty(&buffer));

        let old = Range::empty_at(Point::new(1, 0));
        let new = buffer.set_text_in_range(old, "I prefer this! ");
        side.track_edit(old, new);

        assert!(side.detect_dirty(&buffer));
        assert!(side.is_dirty());
        assert_eq!(side.original_text(), "A\n");
        assert_eq!(side.current_text(&buffer), "I prefer this! A\n");
    }

    #[test]
    fn test_display_marks_dirty_sides() {
        let mut side = ours_side();
        assert_eq!(side.to_string(), "ours (our changes) 'HEAD' at [(1, 0) - (2, 0)]");
        side.dirty = true;
        assert!(side.to_string().ends_with("[modified]"));
    }

    #[test]
    fn test_position_serializes_lowercase() {
        let json = serde_json::to_string(&Position::Bottom).unwrap();
        assert_eq!(json, "\"bottom\"");
    }
}
