//! Foundation types shared by every layer.

mod line_index;
mod position;

pub use line_index::LineIndex;
pub use position::{Position, Range};
