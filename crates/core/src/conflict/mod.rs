//! Merge-conflict parsing, navigation, and resolution.
//!
//! The conflict subsystem is made of:
//! 1. **Scanning** -- [`RegionScanner`] finds marker blocks in raw text.
//! 2. **Building** -- [`ConflictSetBuilder`] turns blocks into [`Conflict`]s,
//!    each with an ours and a theirs [`Side`], linked by [`Navigator`]s.
//! 3. **Resolution** -- [`ConflictSet`] resolves conflicts, tracks buffer
//!    edits, and writes the chosen text back.
//!
//! Conflicts live in an arena owned by the set and refer to each other by
//! [`ConflictId`].

pub mod builder;
pub mod events;
pub mod navigator;
pub mod scanner;
pub mod set;
pub mod side;
pub mod state;

use serde::{Deserialize, Serialize};

pub use builder::ConflictSetBuilder;
pub use events::{Emitter, Subscription};
pub use navigator::Navigator;
pub use scanner::{
    validate_markers, ConflictRegion, MarkerDiagnostic, MarkerProblem, RegionScanner,
};
pub use set::{ConflictSet, ResolutionProgress, SideRef};
pub use side::{Following, Position, Side, SideKind};
pub use state::Conflict;

/// Index of a conflict within its [`ConflictSet`], in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConflictId(pub usize);

impl std::fmt::Display for ConflictId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
