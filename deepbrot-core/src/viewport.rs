//! Viewport configuration: the immutable description a board is built from.
//!
//! Centers and size are quad-double so a front-end can address views down to
//! ~10^-60 across; they round-trip through decimal strings
//! (`from_strings` / `Qd::format_roundtrip`).

use crate::{Qd, QdComplex, QdParseError};
use serde::{Deserialize, Serialize};

/// Default safety bound on iterations per pixel.
pub const DEFAULT_MAX_ITER: u32 = 100_000;

/// Horizontal extent of the canonical unzoomed view, used as the zoom
/// reference ("zoom 1").
pub const BASE_SIZE: f64 = 4.0;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ViewportSpec {
    pub width: u32,
    pub height: u32,
    pub center_re: Qd,
    pub center_im: Qd,
    /// Horizontal extent of the view in fractal space (a positive real).
    pub size: Qd,
    /// Exponent n of the iterated map z -> z^n + c (n >= 2).
    pub exponent: u32,
    pub max_iter: u32,
    /// Convergence threshold: delta below this declares the pixel periodic.
    pub periodicity_eps_1: f64,
    /// Period-estimation threshold (eps_1 <= eps_2).
    pub periodicity_eps_2: f64,
}

impl ViewportSpec {
    /// Build from decimal-string center/size, with epsilons derived from the
    /// pixel spacing.
    pub fn from_strings(
        width: u32,
        height: u32,
        center_re: &str,
        center_im: &str,
        size: &str,
        exponent: u32,
        max_iter: u32,
    ) -> Result<Self, QdParseError> {
        Ok(Self::new(
            width,
            height,
            Qd::parse(center_re)?,
            Qd::parse(center_im)?,
            Qd::parse(size)?,
            exponent,
            max_iter,
        ))
    }

    pub fn from_f64(
        width: u32,
        height: u32,
        center_re: f64,
        center_im: f64,
        size: f64,
        exponent: u32,
        max_iter: u32,
    ) -> Self {
        Self::new(
            width,
            height,
            Qd::from_f64(center_re),
            Qd::from_f64(center_im),
            Qd::from_f64(size),
            exponent,
            max_iter,
        )
    }

    pub fn new(
        width: u32,
        height: u32,
        center_re: Qd,
        center_im: Qd,
        size: Qd,
        exponent: u32,
        max_iter: u32,
    ) -> Self {
        let spacing = if width > 0 {
            size.div_f64(width as f64).to_f64().abs()
        } else {
            0.0
        };
        // Pixel spacing underflows f64 past zoom ~1e290; the floor keeps the
        // comparison meaningful for the perturbation boards, which test the
        // total z at order-1 scale.
        let eps2 = spacing.clamp(1e-12, 1e-2);
        let eps1 = (eps2 * 1e-3).max(1e-15);
        Self {
            width,
            height,
            center_re,
            center_im,
            size,
            exponent,
            max_iter,
            periodicity_eps_1: eps1,
            periodicity_eps_2: eps2,
        }
    }

    pub fn with_epsilons(mut self, eps1: f64, eps2: f64) -> Self {
        self.periodicity_eps_1 = eps1;
        self.periodicity_eps_2 = eps2;
        self
    }

    /// Total pixel count.
    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }

    /// Fractal-space distance between adjacent pixel centers.
    pub fn pixel_spacing(&self) -> Qd {
        self.size.div_f64(self.width as f64)
    }

    /// Center of the viewport as a complex value.
    pub fn center(&self) -> QdComplex {
        QdComplex::new(self.center_re, self.center_im)
    }

    /// The c value of a pixel by row-major index. Row 0 is the top of the
    /// viewport (larger imaginary part).
    pub fn pixel_c(&self, index: u32) -> QdComplex {
        let col = (index % self.width) as f64;
        let row = (index / self.width) as f64;
        let spacing = self.pixel_spacing();
        let dx = col + 0.5 - self.width as f64 / 2.0;
        let dy = row + 0.5 - self.height as f64 / 2.0;
        QdComplex::new(
            self.center_re.add(spacing.mul_f64(dx)),
            self.center_im.sub(spacing.mul_f64(dy)),
        )
    }

    /// Offset of a pixel's c from the viewport center, as a complex value.
    /// This is the delta-c perturbation boards iterate with.
    pub fn pixel_dc(&self, index: u32) -> QdComplex {
        self.pixel_c(index).sub(self.center())
    }

    /// Zoom factor relative to the canonical unzoomed view.
    pub fn zoom(&self) -> f64 {
        let s = self.size.to_f64().abs();
        if s == 0.0 {
            f64::INFINITY
        } else {
            BASE_SIZE / s
        }
    }

    /// Base-2 exponent of the pixel spacing (the adaptive board's
    /// `initial_scale`).
    pub fn spacing_exponent(&self) -> i32 {
        let s = self.pixel_spacing().to_f64().abs();
        if s == 0.0 {
            i32::MIN / 2
        } else {
            libm::frexp(s).1 - 1
        }
    }
}
