//! Vibescope library - Audio-reactive layered visualizer
//!
//! Audio blocks are reduced to bass/mid/treble/energy/transient features,
//! which drive a set of generators drawing into persistent layers. The
//! compositor blends those layers into one frame per tick.

pub mod analysis;
pub mod audio;
pub mod canvas;
pub mod cli;
pub mod clock;
pub mod compositor;
pub mod error;
pub mod generators;
pub mod params;
pub mod pipeline;
pub mod present;
pub mod sink;
