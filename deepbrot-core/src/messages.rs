//! Records flowing from boards to consumers.
//!
//! A board reports finished pixels as deltas; the scheduler aggregates them
//! into batches tagged by iteration index and publishes them downstream.

use crate::Qd;
use serde::{Deserialize, Serialize};

/// A pixel whose orbit was detected as periodic (or capped as in-set).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConvergedPixel {
    pub index: u32,
    /// Representative cycle point, widened to quad-double regardless of the
    /// board's working precision.
    pub z_re: Qd,
    pub z_im: Qd,
    /// Iterations between two successive close checkpoints; 0 if unknown.
    pub period: u32,
}

/// Pixels that finished during one scheduler batch.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Iteration index this batch completed at.
    pub iter: u32,
    /// Indices that escaped the |z| <= 2 disc at `iter` or earlier in the batch.
    pub escaped: Vec<u32>,
    pub converged: Vec<ConvergedPixel>,
}

impl ChangeRecord {
    pub fn new(iter: u32) -> Self {
        Self {
            iter,
            escaped: Vec::new(),
            converged: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.escaped.is_empty() && self.converged.is_empty()
    }

    /// Approximate wire size, used for flush thresholds.
    pub fn byte_size(&self) -> usize {
        4 + self.escaped.len() * 4 + self.converged.len() * (4 + 4 + 8 * 8)
    }
}

/// Readable progress counters for a view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub iter: u32,
    pub active: u32,
    pub escaped: u32,
    pub converged: u32,
    pub chaotic: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_size_counts_both_lists() {
        let mut r = ChangeRecord::new(7);
        assert!(r.is_empty());
        r.escaped.push(3);
        r.converged.push(ConvergedPixel {
            index: 9,
            z_re: Qd::ZERO,
            z_im: Qd::ZERO,
            period: 2,
        });
        assert!(!r.is_empty());
        assert_eq!(r.byte_size(), 4 + 4 + (4 + 4 + 64));
    }

    #[test]
    fn serde_round_trip() {
        let r = ChangeRecord {
            iter: 100,
            escaped: vec![1, 2, 3],
            converged: vec![ConvergedPixel {
                index: 4,
                z_re: Qd::from_f64(-1.0),
                z_im: Qd::ZERO,
                period: 2,
            }],
        };
        let json = serde_json::to_string(&r).unwrap();
        let back: ChangeRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}
