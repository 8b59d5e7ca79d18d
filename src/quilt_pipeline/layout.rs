//! Quilt geometry module
//!
//! Resolves tile and canvas dimensions and maps view indices to canvas tiles.

mod placement;
mod resolver;
pub mod types;

pub use placement::placement_for;
pub use resolver::{resolve, QuiltSource, ResolvedQuilt};
pub use types::{InputMode, QuiltGrid, QuiltLayout, TilePlacement};
