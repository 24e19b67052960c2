//! The ordered collection of conflicts found in one document.
//!
//! [`ConflictSet`] owns every [`Conflict`] and is the entry point for all
//! operations that touch the buffer: combining sides, reverting edits and
//! finally rewriting the document once a side has been picked. Every edit it
//! makes is fed back through [`ConflictSet::did_change_text`] so the stored
//! ranges follow the text.
//!
//! Resolve callbacks run while the set is mutably borrowed, so they cannot
//! call back into the set. Capture shared state (an `Rc<Cell<_>>` or a
//! channel) instead.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, info};

use super::events::Subscription;
use super::side::SideKind;
use super::state::Conflict;
use super::ConflictId;
use crate::config::ResolutionPolicy;
use crate::errors::ConflictError;
use crate::text::{Point, Range, TextBuffer};

/// Identifies one side of one conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SideRef {
    pub conflict: ConflictId,
    pub kind: SideKind,
}

/// How far along a document's resolution is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolutionProgress {
    pub total: usize,
    pub resolved: usize,
}

impl ResolutionProgress {
    pub fn remaining(&self) -> usize {
        self.total - self.resolved
    }

    pub fn is_complete(&self) -> bool {
        self.resolved == self.total
    }
}

/// All conflicts of one document, in document order.
#[derive(Debug)]
pub struct ConflictSet {
    conflicts: Vec<Conflict>,
    is_rebase: bool,
    policy: ResolutionPolicy,
}

impl ConflictSet {
    pub(crate) fn new(
        conflicts: Vec<Conflict>,
        is_rebase: bool,
        policy: ResolutionPolicy,
    ) -> Self {
        Self {
            conflicts,
            is_rebase,
            policy,
        }
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Conflict> {
        self.conflicts.iter()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Whether the set was built for a rebase, where the upper block holds
    /// "theirs".
    pub fn is_rebase(&self) -> bool {
        self.is_rebase
    }

    pub fn policy(&self) -> ResolutionPolicy {
        self.policy
    }

    pub fn get(&self, id: ConflictId) -> Option<&Conflict> {
        self.conflicts.get(id.0)
    }

    fn require(&self, id: ConflictId) -> Result<&Conflict, ConflictError> {
        self.get(id).ok_or(ConflictError::NotFound(id))
    }

    fn require_mut(&mut self, id: ConflictId) -> Result<&mut Conflict, ConflictError> {
        self.conflicts
            .get_mut(id.0)
            .ok_or(ConflictError::NotFound(id))
    }

    /// The conflict whose banners enclose `point`.
    pub fn conflict_at(&self, point: Point) -> Option<ConflictId> {
        self.conflicts
            .iter()
            .find(|c| c.span().contains_point(point))
            .map(Conflict::id)
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    /// Pick `kind` as the winner of conflict `id`.
    pub fn resolve_as(&mut self, id: ConflictId, kind: SideKind) -> Result<(), ConflictError> {
        let policy = self.policy;
        self.require_mut(id)?.resolve_as(kind, policy)
    }

    /// Register a callback fired each time conflict `id` is resolved.
    pub fn on_did_resolve_conflict(
        &self,
        id: ConflictId,
        callback: impl FnMut() + 'static,
    ) -> Result<Subscription, ConflictError> {
        Ok(self.require(id)?.on_did_resolve_conflict(callback))
    }

    /// Keep every stored range valid after the text in `old` was replaced by
    /// text now occupying `new`.
    pub fn did_change_text(&mut self, old: Range, new: Range) {
        debug!(%old, %new, "tracking buffer edit");
        for conflict in &mut self.conflicts {
            conflict.track_edit(old, new);
        }
    }

    /// Append the other side's current text to `first` and resolve as
    /// `first`. Returns `first`'s content range after the insertion.
    pub fn combine_sides(
        &mut self,
        buffer: &mut impl TextBuffer,
        id: ConflictId,
        first: SideKind,
    ) -> Result<Range, ConflictError> {
        let conflict = self.require(id)?;
        if self.policy == ResolutionPolicy::Strict && conflict.is_resolved() {
            return Err(ConflictError::AlreadyResolved(id));
        }

        let text = conflict.side(first.other()).current_text(&*buffer);
        let old = Range::empty_at(conflict.side(first).range.end);
        let new = buffer.set_text_in_range(old, &text);
        self.did_change_text(old, new);
        debug!(conflict = %id, side = %first, inserted = %new, "combined sides");

        self.resolve_as(id, first)?;
        Ok(self.require(id)?.side(first).range)
    }

    /// Write `kind`'s original text back over its current content.
    pub fn revert_side(
        &mut self,
        buffer: &mut impl TextBuffer,
        id: ConflictId,
        kind: SideKind,
    ) -> Result<(), ConflictError> {
        let side = self.require(id)?.side(kind);
        let old = side.range;
        let original = side.original_text.clone();

        let new = buffer.set_text_in_range(old, &original);
        self.did_change_text(old, new);
        self.require_mut(id)?.side_mut(kind).dirty = false;
        info!(conflict = %id, side = %kind, "side reverted to original text");
        Ok(())
    }

    /// Refresh the dirty flag of every side and return the modified ones.
    pub fn detect_dirty(&mut self, buffer: &impl TextBuffer) -> Vec<SideRef> {
        let mut dirty = Vec::new();
        for conflict in &mut self.conflicts {
            let id = conflict.id;
            for kind in [SideKind::Ours, SideKind::Theirs] {
                if conflict.side_mut(kind).detect_dirty(buffer) {
                    dirty.push(SideRef { conflict: id, kind });
                }
            }
        }
        dirty
    }

    /// Like [`detect_dirty`](Self::detect_dirty), limited to the sides under
    /// `cursors`.
    pub fn detect_dirty_at(
        &mut self,
        buffer: &impl TextBuffer,
        cursors: &[Point],
    ) -> Vec<SideRef> {
        let mut dirty = Vec::new();
        for side in self.active_sides(cursors) {
            let conflict = &mut self.conflicts[side.conflict.0];
            if conflict.side_mut(side.kind).detect_dirty(buffer) {
                dirty.push(side);
            }
        }
        dirty
    }

    // -----------------------------------------------------------------------
    // Cursor-driven operations
    // -----------------------------------------------------------------------

    /// Sides whose content range contains at least one cursor, in document
    /// order. A side under several cursors is listed once.
    pub fn active_sides(&self, cursors: &[Point]) -> Vec<SideRef> {
        let mut sides = Vec::new();
        for conflict in &self.conflicts {
            for side in [conflict.top(), conflict.bottom()] {
                if cursors.iter().any(|&p| side.range.contains_point(p)) {
                    sides.push(SideRef {
                        conflict: conflict.id,
                        kind: side.kind,
                    });
                }
            }
        }
        sides
    }

    fn active_conflicts(&self, cursors: &[Point]) -> Vec<ConflictId> {
        let ids: BTreeSet<ConflictId> = self
            .active_sides(cursors)
            .into_iter()
            .map(|side| side.conflict)
            .collect();
        ids.into_iter().collect()
    }

    /// Whether a bulk operation should leave conflict `id` alone.
    fn skip_resolved(&self, id: ConflictId) -> bool {
        let skip = self.policy == ResolutionPolicy::Strict
            && self.get(id).is_some_and(Conflict::is_resolved);
        if skip {
            debug!(conflict = %id, "skipping resolved conflict");
        }
        skip
    }

    /// Resolve each conflict under a cursor as the side the cursor is in.
    /// Conflicts with cursors in both sides are left alone.
    pub fn accept_current(
        &mut self,
        cursors: &[Point],
    ) -> Result<Vec<ConflictId>, ConflictError> {
        let sides = self.active_sides(cursors);
        let mut resolved = Vec::new();
        for side in &sides {
            let ambiguous = sides
                .iter()
                .any(|other| other.conflict == side.conflict && other.kind != side.kind);
            if ambiguous {
                debug!(conflict = %side.conflict, "cursors in both sides, not resolving");
                continue;
            }
            if self.skip_resolved(side.conflict) {
                continue;
            }
            self.resolve_as(side.conflict, side.kind)?;
            resolved.push(side.conflict);
        }
        Ok(resolved)
    }

    fn accept_side(
        &mut self,
        cursors: &[Point],
        kind: SideKind,
    ) -> Result<Vec<ConflictId>, ConflictError> {
        let mut resolved = Vec::new();
        for id in self.active_conflicts(cursors) {
            if self.skip_resolved(id) {
                continue;
            }
            self.resolve_as(id, kind)?;
            resolved.push(id);
        }
        Ok(resolved)
    }

    /// Resolve every conflict under a cursor as ours.
    pub fn accept_ours(&mut self, cursors: &[Point]) -> Result<Vec<ConflictId>, ConflictError> {
        self.accept_side(cursors, SideKind::Ours)
    }

    /// Resolve every conflict under a cursor as theirs.
    pub fn accept_theirs(&mut self, cursors: &[Point]) -> Result<Vec<ConflictId>, ConflictError> {
        self.accept_side(cursors, SideKind::Theirs)
    }

    fn combine_at(
        &mut self,
        buffer: &mut impl TextBuffer,
        cursors: &[Point],
        first: SideKind,
    ) -> Result<Vec<ConflictId>, ConflictError> {
        let mut combined = Vec::new();
        for id in self.active_conflicts(cursors) {
            if self.skip_resolved(id) {
                continue;
            }
            self.combine_sides(buffer, id, first)?;
            combined.push(id);
        }
        Ok(combined)
    }

    /// Combine ours followed by theirs in every conflict under a cursor.
    pub fn accept_ours_then_theirs(
        &mut self,
        buffer: &mut impl TextBuffer,
        cursors: &[Point],
    ) -> Result<Vec<ConflictId>, ConflictError> {
        self.combine_at(buffer, cursors, SideKind::Ours)
    }

    /// Combine theirs followed by ours in every conflict under a cursor.
    pub fn accept_theirs_then_ours(
        &mut self,
        buffer: &mut impl TextBuffer,
        cursors: &[Point],
    ) -> Result<Vec<ConflictId>, ConflictError> {
        self.combine_at(buffer, cursors, SideKind::Theirs)
    }

    /// Revert every modified side of the conflicts under the cursors.
    pub fn revert_current(
        &mut self,
        buffer: &mut impl TextBuffer,
        cursors: &[Point],
    ) -> Result<Vec<SideRef>, ConflictError> {
        let mut reverted = Vec::new();
        for id in self.active_conflicts(cursors) {
            for kind in [SideKind::Ours, SideKind::Theirs] {
                if self.require_mut(id)?.side_mut(kind).detect_dirty(&*buffer) {
                    self.revert_side(buffer, id, kind)?;
                    reverted.push(SideRef { conflict: id, kind });
                }
            }
        }
        Ok(reverted)
    }

    /// The next unresolved conflict after the cursors.
    ///
    /// Inside a conflict the walk starts from the last active one. Otherwise
    /// the first conflict at or after the last cursor is used, or the next
    /// unresolved one if it is already resolved.
    pub fn next_unresolved_from(&self, cursors: &[Point]) -> Option<ConflictId> {
        if let Some(last) = self.active_sides(cursors).last() {
            return self.get(last.conflict)?.navigator().next_unresolved(self);
        }

        let cursor = cursors.iter().max()?;
        let first_after = self
            .conflicts
            .iter()
            .find(|c| c.scroll_target() >= *cursor)?;
        if first_after.is_resolved() {
            first_after.navigator().next_unresolved(self)
        } else {
            Some(first_after.id)
        }
    }

    /// The previous unresolved conflict before the cursors. Mirrors
    /// [`next_unresolved_from`](Self::next_unresolved_from).
    pub fn previous_unresolved_from(&self, cursors: &[Point]) -> Option<ConflictId> {
        if let Some(first) = self.active_sides(cursors).first() {
            return self.get(first.conflict)?.navigator().previous_unresolved(self);
        }

        let cursor = cursors.iter().min()?;
        let last_before = self
            .conflicts
            .iter()
            .rev()
            .find(|c| c.scroll_target() <= *cursor)?;
        if last_before.is_resolved() {
            last_before.navigator().previous_unresolved(self)
        } else {
            Some(last_before.id)
        }
    }

    // -----------------------------------------------------------------------
    // Progress & finalization
    // -----------------------------------------------------------------------

    pub fn progress(&self) -> ResolutionProgress {
        ResolutionProgress {
            total: self.conflicts.len(),
            resolved: self.conflicts.iter().filter(|c| c.is_resolved()).count(),
        }
    }

    pub fn is_all_resolved(&self) -> bool {
        self.progress().is_complete()
    }

    /// Ranges to delete so only the chosen side remains, last range first.
    pub fn resolution_edits(&self, id: ConflictId) -> Result<Vec<Range>, ConflictError> {
        let conflict = self.require(id)?;
        let chosen = conflict
            .resolution()
            .ok_or(ConflictError::NotResolved(id))?;

        let (top, bottom) = (conflict.top(), conflict.bottom());
        let mut edits = vec![bottom.banner_range];
        if bottom.kind != chosen && !bottom.range.is_empty() {
            edits.push(bottom.range);
        }
        edits.push(conflict.navigator().separator_range);
        if top.kind != chosen && !top.range.is_empty() {
            edits.push(top.range);
        }
        edits.push(top.banner_range);
        Ok(edits)
    }

    /// Delete the markers and the losing side of conflict `id` from the
    /// buffer. Running it a second time does nothing.
    pub fn apply_resolution(
        &mut self,
        buffer: &mut impl TextBuffer,
        id: ConflictId,
    ) -> Result<(), ConflictError> {
        if self.require(id)?.applied {
            debug!(conflict = %id, "resolution already applied");
            return Ok(());
        }

        let edits = self.resolution_edits(id)?;
        for old in edits {
            let new = buffer.set_text_in_range(old, "");
            self.did_change_text(old, new);
        }

        let conflict = self.require_mut(id)?;
        conflict.applied = true;
        info!(
            conflict = %id,
            side = ?conflict.resolution(),
            "resolution written to buffer"
        );
        Ok(())
    }

    /// Drop every resolve callback held by the set.
    pub fn dispose(&self) {
        for conflict in &self.conflicts {
            conflict.dispose();
        }
    }
}

impl<'a> IntoIterator for &'a ConflictSet {
    type Item = &'a Conflict;
    type IntoIter = std::slice::Iter<'a, Conflict>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
