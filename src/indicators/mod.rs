// =============================================================================
// Indicators Module
// =============================================================================
//
// Pure, side-effect-free series transforms. Every public function returns a
// `Result` so callers must handle insufficient windows and degenerate
// averages.

pub mod avg_rate;
