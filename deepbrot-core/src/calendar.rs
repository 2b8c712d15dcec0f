//! The iteration calendar deciding when boards snapshot a pixel's z for the
//! periodicity comparison.
//!
//! `figure_period(i)` returns 1 exactly at checkpoint iterations; between
//! checkpoints it counts up from 2. The stride between checkpoints is the
//! largest power of two T with floor(i/T)^3 > T, so snapshots thin out
//! roughly as i^(3/4) while staying dense enough to catch short periods
//! early.

/// Largest power of two T satisfying floor(i/T)^3 > T (minimum 1).
pub fn checkpoint_stride(i: u32) -> u32 {
    let mut best = 1u32;
    let mut t = 1u64;
    while t <= i as u64 {
        let q = i as u64 / t;
        if q * q * q > t {
            best = t as u32;
        } else {
            break;
        }
        t <<= 1;
    }
    best
}

/// 1 + (i mod T(i)); boards snapshot when this returns 1.
pub fn figure_period(i: u32) -> u32 {
    1 + (i % checkpoint_stride(i))
}

/// True when iteration i is a checkpoint: refresh b <- z and clear the
/// period estimate.
#[inline]
pub fn snapshot_due(i: u32) -> bool {
    figure_period(i) == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_is_monotone_power_of_two() {
        let mut prev = 1;
        for i in 1..100_000u32 {
            let t = checkpoint_stride(i);
            assert!(t.is_power_of_two());
            assert!(t >= prev || t * 2 >= prev, "stride collapsed at {i}");
            prev = t;
        }
    }

    #[test]
    fn stride_matches_definition() {
        for i in [1u32, 2, 7, 8, 100, 4096, 99_999] {
            let t = checkpoint_stride(i) as u64;
            let q = i as u64 / t;
            if i > 1 {
                assert!(q * q * q > t, "T={t} invalid for i={i}");
            }
            // The next power of two must fail the predicate.
            let t2 = t * 2;
            let q2 = i as u64 / t2;
            assert!(q2 * q2 * q2 <= t2, "T={t} not maximal for i={i}");
        }
    }

    #[test]
    fn early_iterations_are_all_checkpoints() {
        // While T(i) == 1 every iteration snapshots.
        for i in 1..=3 {
            assert!(snapshot_due(i), "iteration {i} should snapshot");
        }
    }

    #[test]
    fn checkpoints_thin_out() {
        let checkpoints: Vec<u32> = (1..=200).filter(|&i| snapshot_due(i)).collect();
        // Strides grow, so gaps between checkpoints are non-decreasing.
        let gaps: Vec<u32> = checkpoints.windows(2).map(|w| w[1] - w[0]).collect();
        for w in gaps.windows(2) {
            assert!(w[1] >= w[0], "gaps must widen: {gaps:?}");
        }
        // And far fewer than half the iterations snapshot past the start.
        let late = (1000..2000).filter(|&i| snapshot_due(i)).count();
        assert!(late < 100, "too many late checkpoints: {late}");
    }

    #[test]
    fn figure_period_counts_up_between_checkpoints() {
        // Pick a range with stride 8: i in [4096, ...): q = i/8 ~ 512,
        // 512^3 > 8 holds, 16 fails when (i/16)^3 <= 16 is false...
        // just verify the defining relation directly.
        for i in 1..10_000u32 {
            assert_eq!(figure_period(i), 1 + (i % checkpoint_stride(i)));
        }
    }
}
