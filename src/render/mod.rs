// =============================================================================
// Chart rendering
// =============================================================================

pub mod svg;

pub use svg::{Renderer, SvgRenderer};
