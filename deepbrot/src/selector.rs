//! Board selection: zoom range, exponent, and the capability probe decide
//! which numerical strategy a view gets.

use crate::options::BoardKind;
use deepbrot_core::ViewportSpec;
use deepbrot_engine::EngineError;
use deepbrot_gpu::Capabilities;

/// Maximum zoom any board supports.
pub const MAX_ZOOM: f64 = 1e60;

/// Estimated per-pixel device storage for the GPU boards.
fn gpu_bytes_per_pixel(kind: BoardKind) -> u64 {
    match kind {
        BoardKind::GpuShallow => 40,
        BoardKind::GpuPertF32 => 48,
        BoardKind::GpuAdaptive => 56,
        _ => 0,
    }
}

/// CPU board that takes over when a GPU board's buffers exceed the device
/// limit.
fn cpu_fallback(kind: BoardKind, zoom: f64) -> BoardKind {
    match kind {
        BoardKind::GpuShallow => BoardKind::DirectF64,
        BoardKind::GpuPertF32 if zoom < 1e15 => BoardKind::PertDd,
        BoardKind::GpuPertF32 => BoardKind::PertQd,
        BoardKind::GpuAdaptive => BoardKind::PertQd,
        other => other,
    }
}

/// Pick a board for the viewport. Rules are ordered; first match wins.
pub fn select_board(spec: &ViewportSpec, caps: &Capabilities) -> Result<BoardKind, EngineError> {
    let zoom = spec.zoom();
    if spec.exponent < 2 || spec.width == 0 || spec.height == 0 || !(zoom > 0.0) {
        return Err(EngineError::BoardUnsupported {
            zoom,
            exponent: spec.exponent,
        });
    }
    if zoom > MAX_ZOOM {
        return Err(EngineError::BoardUnsupported {
            zoom,
            exponent: spec.exponent,
        });
    }

    let gpu = caps.gpu_available;
    let choice = if zoom < 1e7 {
        if gpu {
            BoardKind::GpuShallow
        } else {
            BoardKind::DirectF64
        }
    } else if zoom < 1e15 {
        if gpu {
            BoardKind::GpuPertF32
        } else {
            BoardKind::PertDd
        }
    } else if zoom < 1e20 {
        if gpu {
            BoardKind::GpuPertF32
        } else {
            // The table nominates the GPU board for this range regardless;
            // without a device the quad-double deltas are the safe stand-in.
            BoardKind::PertQd
        }
    } else if gpu {
        BoardKind::GpuAdaptive
    } else {
        BoardKind::PertQd
    };

    // Per-pixel storage must fit a single device buffer; otherwise hand the
    // view to the CPU counterpart.
    if choice.is_gpu() {
        let bytes = spec.pixel_count() as u64 * gpu_bytes_per_pixel(choice);
        if bytes > caps.max_buffer_bytes {
            log::info!(
                "GPU board needs {bytes} bytes (> {} limit), using CPU fallback",
                caps.max_buffer_bytes
            );
            return Ok(cpu_fallback(choice, zoom));
        }
    }
    Ok(choice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use deepbrot_gpu::DEFAULT_BUFFER_LIMIT;

    fn caps(gpu: bool) -> Capabilities {
        Capabilities {
            gpu_available: gpu,
            max_buffer_bytes: DEFAULT_BUFFER_LIMIT,
        }
    }

    fn spec_at(size: &str) -> ViewportSpec {
        ViewportSpec::from_strings(64, 64, "-0.5", "0", size, 2, 1000).unwrap()
    }

    #[test]
    fn table_rows_with_gpu() {
        let c = caps(true);
        assert_eq!(select_board(&spec_at("4"), &c).unwrap(), BoardKind::GpuShallow);
        assert_eq!(
            select_board(&spec_at("1e-8"), &c).unwrap(),
            BoardKind::GpuPertF32
        );
        assert_eq!(
            select_board(&spec_at("1e-16"), &c).unwrap(),
            BoardKind::GpuPertF32
        );
        assert_eq!(
            select_board(&spec_at("1e-25"), &c).unwrap(),
            BoardKind::GpuAdaptive
        );
        assert_eq!(
            select_board(&spec_at("1e-55"), &c).unwrap(),
            BoardKind::GpuAdaptive
        );
    }

    #[test]
    fn table_rows_without_gpu() {
        let c = caps(false);
        assert_eq!(select_board(&spec_at("4"), &c).unwrap(), BoardKind::DirectF64);
        assert_eq!(select_board(&spec_at("1e-8"), &c).unwrap(), BoardKind::PertDd);
        assert_eq!(select_board(&spec_at("1e-16"), &c).unwrap(), BoardKind::PertQd);
        assert_eq!(select_board(&spec_at("1e-25"), &c).unwrap(), BoardKind::PertQd);
    }

    #[test]
    fn beyond_supported_zoom_is_rejected() {
        let err = select_board(&spec_at("1e-61"), &caps(true)).unwrap_err();
        assert!(matches!(err, EngineError::BoardUnsupported { .. }));
    }

    #[test]
    fn invalid_exponent_is_rejected() {
        let spec = ViewportSpec::from_f64(8, 8, 0.0, 0.0, 4.0, 1, 100);
        assert!(matches!(
            select_board(&spec, &caps(true)),
            Err(EngineError::BoardUnsupported { exponent: 1, .. })
        ));
    }

    #[test]
    fn buffer_limit_forces_cpu_fallback() {
        let tight = Capabilities {
            gpu_available: true,
            max_buffer_bytes: 1024,
        };
        assert_eq!(
            select_board(&spec_at("4"), &tight).unwrap(),
            BoardKind::DirectF64
        );
        assert_eq!(
            select_board(&spec_at("1e-25"), &tight).unwrap(),
            BoardKind::PertQd
        );
    }
}
