//! Value containers shared by every slicing stage.
//!
//! Points are chained into [`Path`]s, paths are grouped horizontally into
//! [`Layer`]s or vertically into [`Segment`]s, and print organization turns
//! each path into a sequence of [`PrintPoint`]s.

mod layer;
mod path;
mod print_point;

pub use layer::{Layer, PathsMut, Segment, VerticalLayersManager};
pub use path::Path;
pub use print_point::{Frame, PathKey, PrintPoint};
