//! Conflict-marker scanning.
//!
//! [`RegionScanner`] finds `<<<<<<<` / `=======` / `>>>>>>>` blocks in raw
//! document text and yields them as [`ConflictRegion`]s in document order.
//! The scanner is lenient: a block that does not match the full pattern is
//! skipped without complaint. [`validate_markers`] is the strict counterpart
//! that reports unbalanced or nested marker lines.

use std::sync::OnceLock;

use regex_lite::{CaptureMatches, Regex};
use serde::Serialize;
use tracing::debug;

/// Length of every marker token (`<<<<<<<`, `=======`, `>>>>>>>`).
pub const MARKER_LEN: usize = 7;

// Marker tokens end at a space or the line end, the same rule
// `classify_line` applies, so `>>>>>>>>` or `>>>>>>>x` lines stay content.
const CONFLICT_PATTERN: &str = concat!(
    r"(?m)^<{7}(?: ([^\r\n]*))?\r?\n",
    r"((?s:.*?))",
    r"^={7}\r?\n",
    r"((?s:.*?))",
    r"^>{7}(?: ([^\r\n]*))?(?:\r?\n|\r?\z)",
);

fn conflict_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(CONFLICT_PATTERN).expect("conflict pattern is a valid regex"))
}

// ---------------------------------------------------------------------------
// Regions
// ---------------------------------------------------------------------------

/// One raw conflict block, borrowed from the scanned text.
///
/// `ours_*` is the first (upper) block and `theirs_*` the second, following
/// the marker syntax. Which of them plays the "ours" role is decided later by
/// the builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictRegion<'t> {
    /// Byte offset of the opening `<<<<<<<`.
    pub start: usize,
    /// Byte offset just past the closing banner line.
    pub end: usize,
    /// Row of the opening banner.
    pub start_row: usize,
    pub ours_label: &'t str,
    pub ours_text: &'t str,
    pub theirs_label: &'t str,
    pub theirs_text: &'t str,
}

impl ConflictRegion<'_> {
    /// Rows covered by the first block's content.
    pub fn ours_rows(&self) -> usize {
        count_newlines(self.ours_text)
    }

    /// Rows covered by the second block's content.
    pub fn theirs_rows(&self) -> usize {
        count_newlines(self.theirs_text)
    }
}

/// Scans one document for conflict blocks.
#[derive(Debug, Clone, Copy)]
pub struct RegionScanner<'t> {
    text: &'t str,
}

impl<'t> RegionScanner<'t> {
    pub fn new(text: &'t str) -> Self {
        Self { text }
    }

    /// A fresh iterator over the regions, starting from the top of the text.
    pub fn regions(&self) -> Regions<'t> {
        Regions {
            text: self.text,
            matches: conflict_regex().captures_iter(self.text),
            offset: 0,
            row: 0,
        }
    }
}

/// Iterator returned by [`RegionScanner::regions`].
///
/// Rows are tracked incrementally: only the text between the previous match
/// and the current one is measured.
pub struct Regions<'t> {
    text: &'t str,
    matches: CaptureMatches<'static, 't>,
    offset: usize,
    row: usize,
}

impl<'t> Iterator for Regions<'t> {
    type Item = ConflictRegion<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        let caps = self.matches.next()?;
        let whole = caps.get(0)?;

        let start_row = self.row + count_newlines(&self.text[self.offset..whole.start()]);
        let group = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or("");

        let region = ConflictRegion {
            start: whole.start(),
            end: whole.end(),
            start_row,
            ours_label: group(1),
            ours_text: group(2),
            theirs_text: group(3),
            theirs_label: group(4),
        };

        self.row = start_row + count_newlines(whole.as_str());
        self.offset = whole.end();

        debug!(
            start_row,
            ours = region.ours_label,
            theirs = region.theirs_label,
            "matched conflict region"
        );
        Some(region)
    }
}

fn count_newlines(text: &str) -> usize {
    text.bytes().filter(|b| *b == b'\n').count()
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// What is wrong with a marker line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerProblem {
    /// `<<<<<<<` while another block is still open.
    NestedOpen,
    /// `>>>>>>>` reached before any `=======`.
    MissingSeparator,
    /// A second `=======` inside the same block.
    StraySeparator,
    /// `>>>>>>>` with no open block.
    StrayClose,
    /// The document ended inside a block.
    Unterminated,
}

impl std::fmt::Display for MarkerProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NestedOpen => write!(f, "nested conflict opening marker"),
            Self::MissingSeparator => write!(f, "closing marker without separator"),
            Self::StraySeparator => write!(f, "extra separator"),
            Self::StrayClose => write!(f, "closing marker without opening marker"),
            Self::Unterminated => write!(f, "unterminated conflict block"),
        }
    }
}

/// A malformed marker found by [`validate_markers`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MarkerDiagnostic {
    pub row: usize,
    pub problem: MarkerProblem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerLine {
    Open,
    Separator,
    Close,
}

fn classify_line(line: &str) -> Option<MarkerLine> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let bytes = line.as_bytes();
    let run_of =
        |token: u8| bytes.len() >= MARKER_LEN && bytes[..MARKER_LEN].iter().all(|b| *b == token);
    let banner =
        |token: u8| run_of(token) && matches!(bytes.get(MARKER_LEN), None | Some(b' '));
    if banner(b'<') {
        Some(MarkerLine::Open)
    } else if banner(b'>') {
        Some(MarkerLine::Close)
    } else if bytes.len() == MARKER_LEN && run_of(b'=') {
        Some(MarkerLine::Separator)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy)]
enum BlockState {
    Outside,
    Top { open_row: usize },
    Bottom { open_row: usize },
}

/// Check every marker line for balance and nesting.
///
/// `=======` lines outside a block are ordinary text and are not reported.
pub fn validate_markers(text: &str) -> Vec<MarkerDiagnostic> {
    let mut diagnostics = Vec::new();
    let mut state = BlockState::Outside;
    let mut report = |row, problem| diagnostics.push(MarkerDiagnostic { row, problem });

    for (row, line) in text.split('\n').enumerate() {
        let Some(marker) = classify_line(line) else {
            continue;
        };
        state = match (state, marker) {
            (BlockState::Outside, MarkerLine::Open) => BlockState::Top { open_row: row },
            (BlockState::Outside, MarkerLine::Separator) => BlockState::Outside,
            (BlockState::Outside, MarkerLine::Close) => {
                report(row, MarkerProblem::StrayClose);
                BlockState::Outside
            }
            (BlockState::Top { .. } | BlockState::Bottom { .. }, MarkerLine::Open) => {
                report(row, MarkerProblem::NestedOpen);
                BlockState::Top { open_row: row }
            }
            (BlockState::Top { open_row }, MarkerLine::Separator) => BlockState::Bottom { open_row },
            (BlockState::Top { .. }, MarkerLine::Close) => {
                report(row, MarkerProblem::MissingSeparator);
                BlockState::Outside
            }
            (s @ BlockState::Bottom { .. }, MarkerLine::Separator) => {
                report(row, MarkerProblem::StraySeparator);
                s
            }
            (BlockState::Bottom { .. }, MarkerLine::Close) => BlockState::Outside,
        };
    }

    if let BlockState::Top { open_row } | BlockState::Bottom { open_row } = state {
        report(open_row, MarkerProblem::Unterminated);
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;

    const SINGLE: &str = "<<<<<<< HEAD\nA\n=======\nB\n>>>>>>> branch\n";

    fn scan(text: &str) -> Vec<ConflictRegion<'_>> {
        RegionScanner::new(text).regions().collect()
    }

    #[test]
    fn test_single_region() {
        let regions = scan(SINGLE);
        assert_eq!(regions.len(), 1);
        let r = &regions[0];
        assert_eq!(r.start, 0);
        assert_eq!(r.end, SINGLE.len());
        assert_eq!(r.start_row, 0);
        assert_eq!(r.ours_label, "HEAD");
        assert_eq!(r.ours_text, "A\n");
        assert_eq!(r.theirs_text, "B\n");
        assert_eq!(r.theirs_label, "branch");
    }

    #[test]
    fn test_no_conflicts() {
        assert!(scan("plain text\n======= not a separator\n").is_empty());
        assert!(scan("").is_empty());
    }

    #[test]
    fn test_empty_sides() {
        let text = "<<<<<<< HEAD\n=======\n>>>>>>> branch\n";
        let regions = scan(text);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].ours_text, "");
        assert_eq!(regions[0].theirs_text, "");
        assert_eq!(regions[0].end, text.len());
    }

    #[test]
    fn test_crlf_line_endings() {
        let text = "<<<<<<< HEAD\r\nA\r\n=======\r\nB\r\n>>>>>>> branch\r\n";
        let regions = scan(text);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].ours_label, "HEAD");
        assert_eq!(regions[0].theirs_label, "branch");
        assert_eq!(regions[0].ours_text, "A\r\n");
        assert_eq!(regions[0].theirs_text, "B\r\n");
    }

    #[test]
    fn test_closing_banner_at_end_of_file() {
        let text = "<<<<<<< HEAD\nA\n=======\nB\n>>>>>>> branch";
        let regions = scan(text);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].theirs_label, "branch");
        assert_eq!(regions[0].end, text.len());
    }

    #[test]
    fn test_rows_track_across_regions() {
        let text = concat!(
            "intro\n",
            "<<<<<<< HEAD\none\ntwo\n=======\nthree\n>>>>>>> topic\n",
            "middle\nmore\n",
            "<<<<<<< HEAD\nfour\n=======\nfive\nsix\n>>>>>>> topic\n",
        );
        let regions = scan(text);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].start_row, 1);
        assert_eq!(regions[0].ours_rows() + regions[0].theirs_rows(), 3);
        assert_eq!(regions[1].start_row, 9);
        assert_eq!(regions[1].ours_text, "four\n");
        assert_eq!(regions[1].theirs_text, "five\nsix\n");
    }

    #[test]
    fn test_shortlog_banner_label() {
        let text = "<<<<<<< HEAD\nA\n=======\nB\n>>>>>>> 2f1e3c9... Add the widget\n";
        let regions = scan(text);
        assert_eq!(regions[0].theirs_label, "2f1e3c9... Add the widget");
    }

    #[test]
    fn test_separator_must_start_a_line() {
        let text = "<<<<<<< HEAD\nA =======\nB\n>>>>>>> branch\n";
        assert!(scan(text).is_empty());
    }

    #[test]
    fn test_missing_separator_is_skipped() {
        let text = concat!(
            "<<<<<<< HEAD\nA\n=======\nB\n>>>>>>> branch\n",
            "<<<<<<< HEAD\nC\n>>>>>>> branch\n",
        );
        let regions = scan(text);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].ours_text, "A\n");
    }

    #[test]
    fn test_scanning_is_restartable() {
        let text = concat!(
            "<<<<<<< HEAD\nA\n=======\nB\n>>>>>>> branch\n",
            "x\n",
            "<<<<<<< HEAD\nC\n=======\nD\n>>>>>>> branch\n",
        );
        let scanner = RegionScanner::new(text);
        let first: Vec<_> = scanner.regions().collect();
        let second: Vec<_> = scanner.regions().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_validate_well_formed() {
        assert!(validate_markers(SINGLE).is_empty());
        assert!(validate_markers("title\n=======\nbody\n").is_empty());
    }

    #[test]
    fn test_validate_missing_separator() {
        let diagnostics = validate_markers("<<<<<<< HEAD\nA\n>>>>>>> branch\n");
        assert_eq!(
            diagnostics,
            vec![MarkerDiagnostic {
                row: 2,
                problem: MarkerProblem::MissingSeparator
            }]
        );
    }

    #[test]
    fn test_validate_nested_and_unterminated() {
        let text = "<<<<<<< HEAD\nA\n<<<<<<< other\nB\n=======\nC\n";
        let problems: Vec<_> = validate_markers(text)
            .into_iter()
            .map(|d| (d.row, d.problem))
            .collect();
        assert_eq!(
            problems,
            vec![(2, MarkerProblem::NestedOpen), (2, MarkerProblem::Unterminated)]
        );
    }

    #[test]
    fn test_validate_stray_markers() {
        let text = ">>>>>>> branch\n<<<<<<< HEAD\nA\n=======\nB\n=======\n>>>>>>> branch\n";
        let problems: Vec<_> = validate_markers(text)
            .into_iter()
            .map(|d| (d.row, d.problem))
            .collect();
        assert_eq!(
            problems,
            vec![(0, MarkerProblem::StrayClose), (5, MarkerProblem::StraySeparator)]
        );
    }

    #[test]
    fn test_long_closing_run_is_content() {
        let text = "<<<<<<< HEAD\nA\n=======\n>>>>>>>> quoted reply\nB\n>>>>>>> branch\n";
        let regions = scan(text);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].theirs_text, ">>>>>>>> quoted reply\nB\n");
        assert_eq!(regions[0].theirs_label, "branch");
        assert_eq!(regions[0].end, text.len());
        assert!(validate_markers(text).is_empty());
    }

    #[test]
    fn test_unspaced_closing_run_is_content() {
        let text = "<<<<<<< HEAD\nA\n=======\n>>>>>>>x\n>>>>>>> branch";
        let regions = scan(text);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].theirs_text, ">>>>>>>x\n");
        assert_eq!(regions[0].theirs_label, "branch");
        assert_eq!(regions[0].end, text.len());
    }

    /// Rows of every banner and separator the scanner consumed.
    fn scanned_marker_rows(text: &str) -> Vec<usize> {
        scan(text)
            .iter()
            .flat_map(|r| {
                let separator = r.start_row + 1 + r.ours_rows();
                [r.start_row, separator, separator + 1 + r.theirs_rows()]
            })
            .collect()
    }

    fn classified_marker_rows(text: &str) -> Vec<usize> {
        text.split('\n')
            .enumerate()
            .filter(|(_, line)| classify_line(line).is_some())
            .map(|(row, _)| row)
            .collect()
    }

    #[test]
    fn test_scanner_and_validation_agree_on_marker_lines() {
        let noisy = concat!(
            "<<<<<<<< not open\n",
            "<<<<<<< HEAD\n",
            "A\n",
            "<<<<<<<x\n",
            "========\n",
            "=======\n",
            ">>>>>>>> reply\n",
            ">>>>>>>x\n",
            "B\n",
            ">>>>>>> branch\n",
        );
        let crlf = SINGLE.replace('\n', "\r\n");
        let no_trailing_newline = SINGLE.trim_end_matches('\n');

        for text in [SINGLE, noisy, crlf.as_str(), no_trailing_newline] {
            assert!(validate_markers(text).is_empty(), "diagnostics for {text:?}");
            assert_eq!(
                scanned_marker_rows(text),
                classified_marker_rows(text),
                "marker rows disagree for {text:?}"
            );
        }
        assert_eq!(scanned_marker_rows(noisy), vec![1, 5, 9]);
    }

    #[test]
    fn test_eight_character_runs_are_not_markers() {
        assert_eq!(classify_line("<<<<<<<< x"), None);
        assert_eq!(classify_line("========"), None);
        assert_eq!(classify_line("<<<<<<<"), Some(MarkerLine::Open));
        assert_eq!(classify_line("=======\r"), Some(MarkerLine::Separator));
    }
}
