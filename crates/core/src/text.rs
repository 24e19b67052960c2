//! Buffer positions and the host text-buffer boundary.
//!
//! The conflict model never owns document text. It stores [`Range`]s into a
//! buffer supplied by the host through the [`TextBuffer`] trait and keeps
//! those ranges valid as edits land (see [`Range::track_edit`]).
//! [`StringBuffer`] is a plain in-memory implementation.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Point / Range
// ---------------------------------------------------------------------------

/// A zero-based (row, column) position. Columns count characters.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Point {
    pub row: usize,
    pub column: usize,
}

impl Point {
    pub fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }

    /// Column zero of `row`.
    pub fn row_start(row: usize) -> Self {
        Self { row, column: 0 }
    }

    /// Translate a point at or after `old.end` so it keeps its position
    /// relative to the text that follows the edit.
    fn shifted(self, old: Range, new: Range) -> Self {
        if self.row == old.end.row {
            Self {
                row: new.end.row,
                column: new.end.column + (self.column - old.end.column),
            }
        } else {
            Self {
                row: self.row - old.end.row + new.end.row,
                column: self.column,
            }
        }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

/// How a stored range reacts to text inserted exactly at one of its ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gravity {
    /// Insertions at either boundary become part of the range.
    Grow,
    /// Insertions at a boundary stay outside the range.
    Fixed,
}

/// A half-open span between two points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Range {
    pub start: Point,
    pub end: Point,
}

impl Range {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Whole rows `[start_row, end_row)`, both ends at column zero.
    pub fn rows(start_row: usize, end_row: usize) -> Self {
        Self {
            start: Point::row_start(start_row),
            end: Point::row_start(end_row),
        }
    }

    /// An empty range at `point`.
    pub fn empty_at(point: Point) -> Self {
        Self {
            start: point,
            end: point,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Inclusive on both ends, so a cursor at the end of a side still counts
    /// as inside it.
    pub fn contains_point(&self, point: Point) -> bool {
        self.start <= point && point <= self.end
    }

    /// `(start_row, end_row)` pair, handy for assertions and logs.
    pub fn row_span(&self) -> (usize, usize) {
        (self.start.row, self.end.row)
    }

    /// Update this range after the text in `old` was replaced by text now
    /// occupying `new`. `new.start` must equal `old.start`.
    pub fn track_edit(&mut self, old: Range, new: Range, gravity: Gravity) {
        match gravity {
            Gravity::Fixed => {
                if self.end <= old.start {
                    return;
                }
                if self.start >= old.end {
                    self.start = self.start.shifted(old, new);
                    self.end = self.end.shifted(old, new);
                    return;
                }
            }
            Gravity::Grow => {
                if self.end < old.start {
                    return;
                }
                if self.start > old.end {
                    self.start = self.start.shifted(old, new);
                    self.end = self.end.shifted(old, new);
                    return;
                }
            }
        }

        // Overlapping (or touching, for growing ranges).
        if self.start > old.start {
            self.start = if self.start >= old.end {
                self.start.shifted(old, new)
            } else {
                new.end
            };
        }
        self.end = if self.end >= old.end {
            self.end.shifted(old, new)
        } else {
            new.end
        };
    }
}

impl std::fmt::Display for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{} - {}]", self.start, self.end)
    }
}

// ---------------------------------------------------------------------------
// Buffer boundary
// ---------------------------------------------------------------------------

/// Text storage owned by the host editor.
///
/// Implementations clip points that fall past the end of a line or the end of
/// the document, so callers may pass row-aligned ranges whose final row does
/// not exist.
pub trait TextBuffer {
    /// The full document text.
    fn text(&self) -> String;

    /// The text covered by `range`.
    fn text_in_range(&self, range: Range) -> String;

    /// Replace the text covered by `range` and return the range the new text
    /// occupies.
    fn set_text_in_range(&mut self, range: Range, text: &str) -> Range;
}

/// In-memory [`TextBuffer`] backed by a `String`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringBuffer {
    text: String,
    /// Byte offset of the first character of each row.
    line_starts: Vec<usize>,
}

impl StringBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let line_starts = compute_line_starts(&text);
        Self { text, line_starts }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Clamp `point` to a position that exists in the document.
    pub fn clip_point(&self, point: Point) -> Point {
        let last_row = self.line_starts.len() - 1;
        if point.row > last_row {
            return Point::new(last_row, self.line_len(last_row));
        }
        Point::new(point.row, point.column.min(self.line_len(point.row)))
    }

    /// Character length of `row`, excluding its line ending.
    fn line_len(&self, row: usize) -> usize {
        self.line_content(row).chars().count()
    }

    fn line_content(&self, row: usize) -> &str {
        let start = self.line_starts[row];
        let end = match self.line_starts.get(row + 1) {
            Some(next) => next - 1,
            None => self.text.len(),
        };
        let line = &self.text[start..end];
        line.strip_suffix('\r').unwrap_or(line)
    }

    fn offset_of(&self, point: Point) -> usize {
        let point = self.clip_point(point);
        let start = self.line_starts[point.row];
        self.line_content(point.row)
            .char_indices()
            .nth(point.column)
            .map(|(i, _)| start + i)
            .unwrap_or_else(|| start + self.line_content(point.row).len())
    }
}

impl TextBuffer for StringBuffer {
    fn text(&self) -> String {
        self.text.clone()
    }

    fn text_in_range(&self, range: Range) -> String {
        let start = self.offset_of(range.start);
        let end = self.offset_of(range.end).max(start);
        self.text[start..end].to_string()
    }

    fn set_text_in_range(&mut self, range: Range, text: &str) -> Range {
        let start_point = self.clip_point(range.start);
        let start = self.offset_of(start_point);
        let end = self.offset_of(range.end).max(start);
        self.text.replace_range(start..end, text);
        self.line_starts = compute_line_starts(&self.text);

        let end_point = match text.rfind('\n') {
            Some(last_newline) => Point::new(
                start_point.row + text.matches('\n').count(),
                text[last_newline + 1..].chars().count(),
            ),
            None => Point::new(start_point.row, start_point.column + text.chars().count()),
        };
        Range::new(start_point, end_point)
    }
}

fn compute_line_starts(text: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(text.match_indices('\n').map(|(i, _)| i + 1))
        .collect()
}
