//! Complex numbers over the extended-precision scalars.

use crate::{Dd, Qd};
use serde::{Deserialize, Serialize};

/// Complex number with quad-double components.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QdComplex {
    pub re: Qd,
    pub im: Qd,
}

impl QdComplex {
    pub const ZERO: Self = Self {
        re: Qd::ZERO,
        im: Qd::ZERO,
    };

    pub fn new(re: Qd, im: Qd) -> Self {
        Self { re, im }
    }

    pub fn from_f64(re: f64, im: f64) -> Self {
        Self {
            re: Qd::from_f64(re),
            im: Qd::from_f64(im),
        }
    }

    #[inline]
    pub fn add(self, o: Self) -> Self {
        Self {
            re: self.re.add(o.re),
            im: self.im.add(o.im),
        }
    }

    #[inline]
    pub fn sub(self, o: Self) -> Self {
        Self {
            re: self.re.sub(o.re),
            im: self.im.sub(o.im),
        }
    }

    #[inline]
    pub fn mul(self, o: Self) -> Self {
        Self {
            re: self.re.mul(o.re).sub(self.im.mul(o.im)),
            im: self.re.mul(o.im).add(self.im.mul(o.re)),
        }
    }

    #[inline]
    pub fn square(self) -> Self {
        Self {
            re: self.re.square().sub(self.im.square()),
            im: self.re.mul(self.im).mul_pow2(1),
        }
    }

    /// z^n for n >= 1 by repeated multiplication.
    pub fn powi(self, n: u32) -> Self {
        debug_assert!(n >= 1);
        let mut acc = self;
        for _ in 1..n {
            acc = acc.mul(self);
        }
        acc
    }

    #[inline]
    pub fn scale(self, k: f64) -> Self {
        Self {
            re: self.re.mul_f64(k),
            im: self.im.mul_f64(k),
        }
    }

    #[inline]
    pub fn norm_sq(self) -> Qd {
        self.re.square().add(self.im.square())
    }

    #[inline]
    pub fn norm_sq_f64(self) -> f64 {
        self.norm_sq().to_f64()
    }

    /// Max-component (Chebyshev) norm, collapsed to f64.
    #[inline]
    pub fn chebyshev(self) -> f64 {
        self.re.abs().to_f64().max(self.im.abs().to_f64())
    }

    #[inline]
    pub fn to_dd(self) -> DdComplex {
        DdComplex {
            re: self.re.to_dd(),
            im: self.im.to_dd(),
        }
    }

    #[inline]
    pub fn to_f64_pair(self) -> (f64, f64) {
        (self.re.to_f64(), self.im.to_f64())
    }
}

/// Complex number with double-double components.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DdComplex {
    pub re: Dd,
    pub im: Dd,
}

impl DdComplex {
    pub const ZERO: Self = Self {
        re: Dd::ZERO,
        im: Dd::ZERO,
    };

    pub fn new(re: Dd, im: Dd) -> Self {
        Self { re, im }
    }

    pub fn from_f64(re: f64, im: f64) -> Self {
        Self {
            re: Dd::from_f64(re),
            im: Dd::from_f64(im),
        }
    }

    #[inline]
    pub fn add(self, o: Self) -> Self {
        Self {
            re: self.re.add(o.re),
            im: self.im.add(o.im),
        }
    }

    #[inline]
    pub fn sub(self, o: Self) -> Self {
        Self {
            re: self.re.sub(o.re),
            im: self.im.sub(o.im),
        }
    }

    #[inline]
    pub fn mul(self, o: Self) -> Self {
        Self {
            re: self.re.mul(o.re).sub(self.im.mul(o.im)),
            im: self.re.mul(o.im).add(self.im.mul(o.re)),
        }
    }

    #[inline]
    pub fn square(self) -> Self {
        Self {
            re: self.re.square().sub(self.im.square()),
            im: self.re.mul(self.im).mul_pow2(1),
        }
    }

    pub fn powi(self, n: u32) -> Self {
        debug_assert!(n >= 1);
        let mut acc = self;
        for _ in 1..n {
            acc = acc.mul(self);
        }
        acc
    }

    #[inline]
    pub fn scale(self, k: f64) -> Self {
        Self {
            re: self.re.mul_f64(k),
            im: self.im.mul_f64(k),
        }
    }

    #[inline]
    pub fn norm_sq_f64(self) -> f64 {
        let n = self.re.square().add(self.im.square());
        n.to_f64()
    }

    #[inline]
    pub fn chebyshev(self) -> f64 {
        self.re.abs().to_f64().max(self.im.abs().to_f64())
    }

    #[inline]
    pub fn to_qd(self) -> QdComplex {
        QdComplex {
            re: Qd::from_dd(self.re),
            im: Qd::from_dd(self.im),
        }
    }

    #[inline]
    pub fn to_f64_pair(self) -> (f64, f64) {
        (self.re.to_f64(), self.im.to_f64())
    }
}
