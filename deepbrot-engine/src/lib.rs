//! Computation engine: reference orbits, boards, and the scheduler that
//! drives them and streams results.

pub mod board;
pub mod cancellation;
pub mod error;
pub mod reference;
pub mod scheduler;

pub use board::{
    is_chaotic_spike, Board, DeltaValue, DirectBoard, DirectDdBoard, DirectF32Board,
    DirectF64Board, DirectQdBoard, DirectValue, F32Complex, F64Complex, PerturbBoard,
    PerturbDdBoard, PerturbQdBoard, CHAOTIC_SPIKE_MAX_RE, CHAOTIC_SPIKE_MIN_RE,
    MAX_CHAOTIC_ITERATIONS,
};
pub use cancellation::CancelFlag;
pub use error::EngineError;
pub use reference::{ReferenceOrbit, DEFAULT_REFERENCE_ESCAPE_RADIUS, NEAR_PERIODIC_EPS};
pub use scheduler::{ChangeSink, CollectSink, Scheduler, SchedulerPool};
