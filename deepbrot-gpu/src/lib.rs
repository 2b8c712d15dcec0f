//! GPU boards for the escape-time engine, built on wgpu compute kernels.
//!
//! Three boards live here: shallow direct f32, perturbation f32, and the
//! adaptive per-pixel-scale perturbation board for extreme zoom. Each
//! implements the same `Board` contract as the CPU boards, so the scheduler
//! cannot tell them apart.

mod adaptive_board;
pub mod adaptive_kernel;
mod device;
mod error;
mod perturb_f32;
mod runner;
mod shaders;
mod shallow;
#[cfg(test)]
mod tests;
mod track;

pub use adaptive_board::GpuAdaptiveBoard;
pub use adaptive_kernel::{AdaptiveReferenceBoard, CONVERGENCE_SCALE_WINDOW, REBASE_MIN_Z};
pub use device::{Capabilities, GpuAvailability, GpuContext, DEFAULT_BUFFER_LIMIT};
pub use error::GpuError;
pub use perturb_f32::GpuPerturbF32Board;
pub use shallow::GpuShallowBoard;
