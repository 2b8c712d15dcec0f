//! deepbrot: escape-time and periodicity computation for Mandelbrot and
//! Multibrot sets across zoom depths from unit scale down to ~1e-60.
//!
//! The crate wires the numerical layers together: `deepbrot-core` carries
//! the extended-precision scalars and viewport math, `deepbrot-engine` the
//! CPU boards and the scheduler, `deepbrot-gpu` the wgpu boards. This crate
//! adds the board selector, the option surface, and the `Engine` facade a
//! renderer drives.

mod engine;
mod options;
mod selector;

pub use engine::Engine;
pub use options::{BoardKind, EngineOptions, ForceBoard};
pub use selector::{select_board, MAX_ZOOM};

pub use deepbrot_core::{
    ChangeRecord, ConvergedPixel, Dd, Progress, Qd, QdComplex, QdParseError, ViewportSpec,
};
pub use deepbrot_engine::{Board, CancelFlag, EngineError, ReferenceOrbit};
pub use deepbrot_gpu::{Capabilities, GpuAvailability, GpuContext, GpuError};
