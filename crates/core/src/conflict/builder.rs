//! Turns scanned regions into a linked [`ConflictSet`].

use tracing::{debug, info, warn};

use super::navigator::Navigator;
use super::scanner::{validate_markers, ConflictRegion, RegionScanner};
use super::set::ConflictSet;
use super::side::{Following, Position, Side, SideKind};
use super::state::Conflict;
use super::ConflictId;
use crate::config::{ResolutionPolicy, ResolverConfig};
use crate::errors::ConflictError;
use crate::text::{Range, TextBuffer};

/// Builds conflict sets for one buffer.
///
/// ```
/// use mergeconflicts_core::conflict::{ConflictSetBuilder, SideKind};
///
/// let text = "<<<<<<< HEAD\nA\n=======\nB\n>>>>>>> branch\n";
/// let set = ConflictSetBuilder::new().build(text).unwrap();
/// assert_eq!(set.len(), 1);
/// assert_eq!(set.conflicts()[0].side(SideKind::Ours).label(), "HEAD");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConflictSetBuilder {
    is_rebase: bool,
    policy: ResolutionPolicy,
    strict_markers: bool,
}

impl ConflictSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the policy and marker strictness from configuration.
    pub fn from_config(config: &ResolverConfig) -> Self {
        Self {
            is_rebase: false,
            policy: config.resolution.policy,
            strict_markers: config.scanner.strict_markers,
        }
    }

    /// In a rebase the upper block holds "theirs" and the lower one "ours".
    pub fn rebase(mut self, is_rebase: bool) -> Self {
        self.is_rebase = is_rebase;
        self
    }

    pub fn policy(mut self, policy: ResolutionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Refuse to build when any marker line is unbalanced or nested.
    pub fn strict_markers(mut self, strict: bool) -> Self {
        self.strict_markers = strict;
        self
    }

    /// Scan `text` and build one conflict per well-formed block.
    pub fn build(&self, text: &str) -> Result<ConflictSet, ConflictError> {
        let diagnostics = validate_markers(text);
        if let Some(first) = diagnostics.first() {
            if self.strict_markers {
                warn!(
                    problems = diagnostics.len(),
                    first_row = first.row,
                    "refusing to build from malformed conflict markers"
                );
                return Err(ConflictError::MalformedMarkers {
                    count: diagnostics.len(),
                    first_row: first.row,
                });
            }
            for diagnostic in &diagnostics {
                warn!(
                    row = diagnostic.row,
                    problem = %diagnostic.problem,
                    "malformed conflict marker"
                );
            }
        }

        let mut conflicts: Vec<Conflict> = Vec::new();
        for region in RegionScanner::new(text).regions() {
            let id = ConflictId(conflicts.len());
            let mut conflict = self.conflict_from(id, &region);
            if let Some(previous) = conflicts.last_mut() {
                previous.navigator.next = Some(id);
                conflict.navigator.previous = Some(previous.id);
            }
            conflicts.push(conflict);
        }

        info!(
            conflicts = conflicts.len(),
            rebase = self.is_rebase,
            policy = %self.policy,
            "conflict set built"
        );
        Ok(ConflictSet::new(conflicts, self.is_rebase, self.policy))
    }

    /// [`build`](Self::build) over the full text of `buffer`.
    pub fn build_from(&self, buffer: &impl TextBuffer) -> Result<ConflictSet, ConflictError> {
        self.build(&buffer.text())
    }

    fn conflict_from(&self, id: ConflictId, region: &ConflictRegion<'_>) -> Conflict {
        let row = region.start_row;
        let top_end = row + 1 + region.ours_rows();
        let bottom_end = top_end + 1 + region.theirs_rows();

        let (top_kind, bottom_kind) = if self.is_rebase {
            (SideKind::Theirs, SideKind::Ours)
        } else {
            (SideKind::Ours, SideKind::Theirs)
        };

        let top = Side {
            kind: top_kind,
            position: Position::Top,
            label: region.ours_label.to_string(),
            range: Range::rows(row + 1, top_end),
            banner_range: Range::rows(row, row + 1),
            following: Following::Separator,
            original_text: region.ours_text.to_string(),
            dirty: false,
            conflict: id,
        };
        let bottom = Side {
            kind: bottom_kind,
            position: Position::Bottom,
            label: region.theirs_label.to_string(),
            range: Range::rows(top_end + 1, bottom_end),
            banner_range: Range::rows(bottom_end, bottom_end + 1),
            following: Following::Banner,
            original_text: region.theirs_text.to_string(),
            dirty: false,
            conflict: id,
        };
        let navigator = Navigator::new(Range::rows(top_end, top_end + 1), id);

        debug!(
            conflict = %id,
            top = %top.range,
            bottom = %bottom.range,
            "built conflict"
        );
        let (ours, theirs) = if self.is_rebase {
            (bottom, top)
        } else {
            (top, bottom)
        };
        Conflict::new(id, ours, theirs, navigator)
    }
}
