//! CPU-side bookkeeping shared by the GPU boards: the readback buffer
//! mirrors the finished-pixel state, and this tracker diffs it against the
//! previous snapshot so no pixel index ever surfaces twice.

use deepbrot_core::{ChangeRecord, ConvergedPixel, Qd};

pub(crate) struct PixelTracker {
    nn: Vec<i32>,
    active: u32,
    chaotic: Vec<bool>,
    chaotic_active: u32,
}

impl PixelTracker {
    pub fn new(chaotic: Vec<bool>) -> Self {
        let n = chaotic.len() as u32;
        let chaotic_active = chaotic.iter().filter(|&&f| f).count() as u32;
        Self {
            nn: vec![0; chaotic.len()],
            active: n,
            chaotic,
            chaotic_active,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.active
    }

    pub fn chaotic_count(&self) -> u32 {
        self.chaotic_active
    }

    pub fn result(&self, index: u32) -> i32 {
        self.nn[index as usize]
    }

    /// Fold a fresh readback into the record: every pixel whose nn went
    /// nonzero since the last batch is reported exactly once.
    pub fn absorb<F>(&mut self, rec: &mut ChangeRecord, read: F)
    where
        F: Fn(usize) -> (i32, [f32; 2], u32),
    {
        for i in 0..self.nn.len() {
            if self.nn[i] != 0 {
                continue;
            }
            let (nn, z, period) = read(i);
            if nn == 0 {
                continue;
            }
            self.nn[i] = nn;
            self.active -= 1;
            if self.chaotic[i] {
                self.chaotic_active -= 1;
            }
            if nn > 0 {
                rec.escaped.push(i as u32);
            } else {
                rec.converged.push(ConvergedPixel {
                    index: i as u32,
                    z_re: Qd::from_f64(z[0] as f64),
                    z_im: Qd::from_f64(z[1] as f64),
                    period,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absorb_reports_each_pixel_once() {
        let mut t = PixelTracker::new(vec![false, true, false]);
        assert_eq!(t.remaining(), 3);
        assert_eq!(t.chaotic_count(), 1);

        let mut rec = ChangeRecord::new(5);
        t.absorb(&mut rec, |i| match i {
            0 => (3, [1.0, 0.0], 0),
            1 => (-4, [0.5, 0.5], 2),
            _ => (0, [0.0, 0.0], 0),
        });
        assert_eq!(rec.escaped, vec![0]);
        assert_eq!(rec.converged.len(), 1);
        assert_eq!(t.remaining(), 1);
        assert_eq!(t.chaotic_count(), 0);

        // Same state again: nothing new is reported.
        let mut rec2 = ChangeRecord::new(6);
        t.absorb(&mut rec2, |i| match i {
            0 => (3, [1.0, 0.0], 0),
            1 => (-4, [0.5, 0.5], 2),
            _ => (0, [0.0, 0.0], 0),
        });
        assert!(rec2.is_empty());
    }
}
