//! Document-order links between conflicts.

use serde::Serialize;

use super::set::ConflictSet;
use super::ConflictId;
use crate::text::{Gravity, Range};

/// Linked-list node attached to each conflict.
///
/// `previous`/`next` point at the neighbouring conflicts whether or not they
/// are resolved. The `*_unresolved` walks skip resolved ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Navigator {
    pub(crate) separator_range: Range,
    pub(crate) conflict: ConflictId,
    pub(crate) previous: Option<ConflictId>,
    pub(crate) next: Option<ConflictId>,
}

impl Navigator {
    pub(crate) fn new(separator_range: Range, conflict: ConflictId) -> Self {
        Self {
            separator_range,
            conflict,
            previous: None,
            next: None,
        }
    }

    /// The `=======` line.
    pub fn separator_range(&self) -> Range {
        self.separator_range
    }

    pub fn conflict(&self) -> ConflictId {
        self.conflict
    }

    pub fn previous(&self) -> Option<ConflictId> {
        self.previous
    }

    pub fn next(&self) -> Option<ConflictId> {
        self.next
    }

    /// The closest following conflict that is still unresolved.
    pub fn next_unresolved(&self, set: &ConflictSet) -> Option<ConflictId> {
        walk_unresolved(set, self.next, |nav| nav.next)
    }

    /// The closest preceding conflict that is still unresolved.
    pub fn previous_unresolved(&self, set: &ConflictSet) -> Option<ConflictId> {
        walk_unresolved(set, self.previous, |nav| nav.previous)
    }

    pub(crate) fn track_edit(&mut self, old: Range, new: Range) {
        self.separator_range.track_edit(old, new, Gravity::Fixed);
    }
}

/// Follow `step` from `start` until an unresolved conflict turns up. At most
/// `set.len()` hops are taken.
fn walk_unresolved(
    set: &ConflictSet,
    start: Option<ConflictId>,
    step: impl Fn(&Navigator) -> Option<ConflictId>,
) -> Option<ConflictId> {
    let mut current = start;
    for _ in 0..set.len() {
        let conflict = set.get(current?)?;
        if !conflict.is_resolved() {
            return current;
        }
        current = step(conflict.navigator());
    }
    None
}
