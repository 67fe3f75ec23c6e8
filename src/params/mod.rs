//! Parameter definitions with units and documented semantics.
//!
//! All tuning constants are extracted here with:
//! - Units (Hz, pixels, frames, radians)
//! - Documented formulas showing how audio features drive them
//! - `Default` values matching the reference look

mod audio;
mod render;
mod visual;

// Re-export all types
pub use audio::AnalysisConfig;
pub use render::{ExportConfig, RenderConfig};
pub use visual::{
    BranchCount, CompositorParams, FractalParams, ParticleParams, TriggerThresholds,
};
