//! A single conflict and its resolution state machine.
//!
//! A conflict starts unresolved and moves to resolved once a side is chosen.
//! Every successful resolution fires the did-resolve event synchronously.
//! Whether a second resolution is rejected or overwrites the first is decided
//! by the [`ResolutionPolicy`] of the owning set.

use tracing::{debug, info, warn};

use super::events::{Emitter, Subscription};
use super::navigator::Navigator;
use super::side::{Following, Position, Side, SideKind};
use super::ConflictId;
use crate::config::ResolutionPolicy;
use crate::errors::ConflictError;
use crate::text::{Point, Range};

/// Two competing sides plus the navigator linking them into the document.
#[derive(Debug)]
pub struct Conflict {
    pub(crate) id: ConflictId,
    pub(crate) ours: Side,
    pub(crate) theirs: Side,
    pub(crate) navigator: Navigator,
    pub(crate) resolution: Option<SideKind>,
    /// Set once the resolution edits have been written to the buffer.
    pub(crate) applied: bool,
    resolved: Emitter,
}

impl Conflict {
    /// Wire the parts together, pointing every back-reference at `id`.
    pub(crate) fn new(
        id: ConflictId,
        mut ours: Side,
        mut theirs: Side,
        mut navigator: Navigator,
    ) -> Self {
        ours.conflict = id;
        theirs.conflict = id;
        navigator.conflict = id;
        Self {
            id,
            ours,
            theirs,
            navigator,
            resolution: None,
            applied: false,
            resolved: Emitter::new(),
        }
    }

    pub fn id(&self) -> ConflictId {
        self.id
    }

    pub fn ours(&self) -> &Side {
        &self.ours
    }

    pub fn theirs(&self) -> &Side {
        &self.theirs
    }

    pub fn side(&self, kind: SideKind) -> &Side {
        match kind {
            SideKind::Ours => &self.ours,
            SideKind::Theirs => &self.theirs,
        }
    }

    pub(crate) fn side_mut(&mut self, kind: SideKind) -> &mut Side {
        match kind {
            SideKind::Ours => &mut self.ours,
            SideKind::Theirs => &mut self.theirs,
        }
    }

    /// The side drawn in the upper half of the block.
    pub fn top(&self) -> &Side {
        if self.ours.position == Position::Top {
            &self.ours
        } else {
            &self.theirs
        }
    }

    /// The side drawn in the lower half of the block.
    pub fn bottom(&self) -> &Side {
        if self.ours.position == Position::Bottom {
            &self.ours
        } else {
            &self.theirs
        }
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    /// The chosen side, if any.
    pub fn resolution(&self) -> Option<SideKind> {
        self.resolution
    }

    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }

    pub fn was_chosen(&self, kind: SideKind) -> bool {
        self.resolution == Some(kind)
    }

    /// Whether [`ConflictSet::apply_resolution`](super::ConflictSet::apply_resolution)
    /// has already rewritten the buffer for this conflict.
    pub fn is_applied(&self) -> bool {
        self.applied
    }

    /// The range `kind`'s content runs into.
    pub fn following_range(&self, kind: SideKind) -> Range {
        let side = self.side(kind);
        match side.following {
            Following::Separator => self.navigator.separator_range,
            Following::Banner => side.banner_range,
        }
    }

    /// From the first banner through the last one.
    pub fn span(&self) -> Range {
        Range::new(self.top().banner_range.start, self.bottom().banner_range.end)
    }

    /// Where a host should scroll to bring this conflict into view.
    pub fn scroll_target(&self) -> Point {
        self.ours.range.start
    }

    /// Every range this conflict keeps track of.
    pub fn ranges(&self) -> [Range; 5] {
        [
            self.ours.banner_range,
            self.ours.range,
            self.navigator.separator_range,
            self.theirs.range,
            self.theirs.banner_range,
        ]
    }

    /// Register a callback for every successful resolution of this conflict.
    pub fn on_did_resolve_conflict(&self, callback: impl FnMut() + 'static) -> Subscription {
        self.resolved.subscribe(callback)
    }

    pub(crate) fn resolve_as(
        &mut self,
        kind: SideKind,
        policy: ResolutionPolicy,
    ) -> Result<(), ConflictError> {
        if let Some(previous) = self.resolution {
            match policy {
                ResolutionPolicy::Strict => {
                    warn!(
                        conflict = %self.id,
                        %previous,
                        requested = %kind,
                        "conflict already resolved"
                    );
                    return Err(ConflictError::AlreadyResolved(self.id));
                }
                ResolutionPolicy::Permissive => {
                    debug!(
                        conflict = %self.id,
                        %previous,
                        requested = %kind,
                        "overwriting earlier resolution"
                    );
                }
            }
        }

        self.resolution = Some(kind);
        info!(
            conflict = %self.id,
            side = %kind,
            label = %self.side(kind).label,
            "conflict resolved"
        );
        self.resolved.emit();
        Ok(())
    }

    pub(crate) fn track_edit(&mut self, old: Range, new: Range) {
        self.ours.track_edit(old, new);
        self.theirs.track_edit(old, new);
        self.navigator.track_edit(old, new);
    }

    /// Drop every resolve callback.
    pub(crate) fn dispose(&self) {
        self.resolved.clear();
    }
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[conflict {}: {} | {}]", self.id, self.ours, self.theirs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn conflict() -> Conflict {
        let side = |kind: SideKind,
                    position: Position,
                    range: Range,
                    banner_range: Range,
                    following: Following,
                    text: &str| Side {
            kind,
            position,
            label: kind.to_string(),
            range,
            banner_range,
            following,
            original_text: text.into(),
            dirty: false,
            conflict: ConflictId(99),
        };
        Conflict::new(
            ConflictId(0),
            side(
                SideKind::Ours,
                Position::Top,
                Range::rows(1, 2),
                Range::rows(0, 1),
                Following::Separator,
                "A\n",
            ),
            side(
                SideKind::Theirs,
                Position::Bottom,
                Range::rows(3, 4),
                Range::rows(4, 5),
                Following::Banner,
                "B\n",
            ),
            Navigator::new(Range::rows(2, 3), ConflictId(99)),
        )
    }

    #[test]
    fn test_back_references_point_at_owner() {
        let c = conflict();
        assert_eq!(c.ours().conflict(), ConflictId(0));
        assert_eq!(c.theirs().conflict(), ConflictId(0));
        assert_eq!(c.navigator().conflict(), ConflictId(0));
    }

    #[test]
    fn test_starts_unresolved() {
        let c = conflict();
        assert!(!c.is_resolved());
        assert_eq!(c.resolution(), None);
        assert!(!c.was_chosen(SideKind::Ours));
        assert!(!c.was_chosen(SideKind::Theirs));
    }

    #[test]
    fn test_resolve_as_fires_once() {
        let mut c = conflict();
        let fired = Rc::new(Cell::new(0));
        let f = fired.clone();
        let _sub = c.on_did_resolve_conflict(move || f.set(f.get() + 1));

        c.resolve_as(SideKind::Theirs, ResolutionPolicy::Strict).unwrap();
        assert!(c.is_resolved());
        assert!(c.was_chosen(SideKind::Theirs));
        assert!(!c.was_chosen(SideKind::Ours));
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_strict_rejects_second_resolution() {
        let mut c = conflict();
        let fired = Rc::new(Cell::new(0));
        let f = fired.clone();
        let _sub = c.on_did_resolve_conflict(move || f.set(f.get() + 1));

        c.resolve_as(SideKind::Ours, ResolutionPolicy::Strict).unwrap();
        let err = c.resolve_as(SideKind::Theirs, ResolutionPolicy::Strict).unwrap_err();
        assert_eq!(err, ConflictError::AlreadyResolved(ConflictId(0)));
        assert!(c.was_chosen(SideKind::Ours));
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_permissive_overwrites_and_refires() {
        let mut c = conflict();
        let fired = Rc::new(Cell::new(0));
        let f = fired.clone();
        let _sub = c.on_did_resolve_conflict(move || f.set(f.get() + 1));

        c.resolve_as(SideKind::Ours, ResolutionPolicy::Permissive).unwrap();
        c.resolve_as(SideKind::Theirs, ResolutionPolicy::Permissive).unwrap();
        assert!(c.was_chosen(SideKind::Theirs));
        assert_eq!(fired.get(), 2);
    }

    #[test]
    fn test_top_bottom_and_following() {
        let c = conflict();
        assert_eq!(c.top().kind(), SideKind::Ours);
        assert_eq!(c.bottom().kind(), SideKind::Theirs);
        assert_eq!(c.following_range(SideKind::Ours), Range::rows(2, 3));
        assert_eq!(c.following_range(SideKind::Theirs), Range::rows(4, 5));
        assert_eq!(c.span(), Range::rows(0, 5));
        assert_eq!(c.scroll_target(), Point::row_start(1));
    }

    #[test]
    fn test_dispose_drops_callbacks() {
        let mut c = conflict();
        let fired = Rc::new(Cell::new(false));
        let f = fired.clone();
        let _sub = c.on_did_resolve_conflict(move || f.set(true));
        c.dispose();
        c.resolve_as(SideKind::Ours, ResolutionPolicy::Strict).unwrap();
        assert!(!fired.get());
    }
}
