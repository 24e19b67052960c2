//! Merge-conflict core library.
//!
//! This crate parses `<<<<<<<` / `=======` / `>>>>>>>` conflict blocks out of
//! a text buffer and models their resolution: configuration, buffer ranges,
//! conflict scanning, navigation, and the resolution state machine. The text
//! itself stays with the host behind the [`TextBuffer`] trait.

pub mod config;
pub mod conflict;
pub mod errors;
pub mod text;

// Re-exports for convenience.
pub use config::{ResolutionPolicy, ResolverConfig};
pub use conflict::{Conflict, ConflictId, ConflictSet, ConflictSetBuilder, SideKind};
pub use errors::{ConflictError, CoreError};
pub use text::{Point, Range, StringBuffer, TextBuffer};
