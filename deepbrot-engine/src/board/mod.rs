//! Boards: interchangeable per-view state machines that all satisfy one
//! pixel-result contract. The scheduler only ever talks to this trait; the
//! numerical strategy behind it (direct iteration, perturbation, adaptive
//! scaling) is the board's own business.

mod direct;
mod perturb;

pub use direct::{
    DirectBoard, DirectDdBoard, DirectF32Board, DirectF64Board, DirectQdBoard, DirectValue,
    F32Complex, F64Complex,
};
pub use perturb::{DeltaValue, PerturbBoard, PerturbDdBoard, PerturbQdBoard};

use crate::error::EngineError;
use deepbrot_core::{ChangeRecord, QdComplex};

/// Pixels on the chaotic spike are declared convergent once they reach this
/// many iterations.
pub const MAX_CHAOTIC_ITERATIONS: u32 = 100_000;

/// The real-axis chaotic segment for exponent 2 (open interval).
pub const CHAOTIC_SPIKE_MIN_RE: f64 = -2.0;
pub const CHAOTIC_SPIKE_MAX_RE: f64 = -1.401155;

/// Escape disc: |z|^2 beyond this means the orbit diverges.
pub const ESCAPE_RADIUS_SQ: f64 = 4.0;

/// The uniform pixel-iteration contract.
pub trait Board {
    /// Run up to `iterations` scheduler-level iterations, reporting pixels
    /// that finished. A pixel transitions from active to finished entirely
    /// within one call; no index is ever reported twice.
    fn iterate_batch(&mut self, iterations: u32) -> Result<ChangeRecord, EngineError>;

    fn remaining_active(&self) -> u32;

    /// Chaotic-spike pixels still iterating toward their cap.
    fn chaotic_spike_count(&self) -> u32;

    /// Iterations performed so far.
    fn iteration(&self) -> u32;

    // Read-only accessors for renderer annotations.
    fn current_z(&self, index: u32) -> (f64, f64);
    fn current_c(&self, index: u32) -> (f64, f64);
    fn current_period(&self, index: u32) -> u32;
}

/// Bounded-but-chaotic segment of the real axis; these pixels never settle
/// into a detectable cycle and are completed by iteration cap instead.
pub fn is_chaotic_spike(c: &QdComplex, exponent: u32) -> bool {
    if exponent != 2 || !c.im.is_zero() {
        return false;
    }
    let re = c.re.to_f64();
    re > CHAOTIC_SPIKE_MIN_RE && re < CHAOTIC_SPIKE_MAX_RE
}

#[cfg(test)]
mod tests {
    use super::*;
    use deepbrot_core::Qd;

    #[test]
    fn chaotic_spike_bounds_are_open() {
        let mk = |re: f64| QdComplex::from_f64(re, 0.0);
        assert!(is_chaotic_spike(&mk(-1.6), 2));
        assert!(is_chaotic_spike(&mk(-1.99), 2));
        assert!(!is_chaotic_spike(&mk(-2.0), 2));
        assert!(!is_chaotic_spike(&mk(-1.401155), 2));
        assert!(!is_chaotic_spike(&mk(-1.3), 2));
        assert!(!is_chaotic_spike(&mk(-1.6), 3));
        let off_axis = QdComplex::new(Qd::from_f64(-1.6), Qd::parse("1e-40").unwrap());
        assert!(!is_chaotic_spike(&off_axis, 2));
    }
}
