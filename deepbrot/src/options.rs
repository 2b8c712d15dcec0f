//! Engine configuration toggles.

use serde::{Deserialize, Serialize};

/// Selector override. `Auto` lets the zoom/capability rules decide.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForceBoard {
    #[default]
    Auto,
    DirectF32,
    DirectF64,
    DirectDd,
    DirectQd,
    PertDd,
    PertQd,
    GpuShallow,
    GpuPertF32,
    GpuAdaptive,
}

/// A concrete board implementation the selector can choose.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardKind {
    DirectF32,
    DirectF64,
    DirectDd,
    DirectQd,
    PertDd,
    PertQd,
    GpuShallow,
    GpuPertF32,
    GpuAdaptive,
}

impl BoardKind {
    pub fn is_gpu(self) -> bool {
        matches!(
            self,
            BoardKind::GpuShallow | BoardKind::GpuPertF32 | BoardKind::GpuAdaptive
        )
    }
}

impl ForceBoard {
    pub fn forced(self) -> Option<BoardKind> {
        match self {
            ForceBoard::Auto => None,
            ForceBoard::DirectF32 => Some(BoardKind::DirectF32),
            ForceBoard::DirectF64 => Some(BoardKind::DirectF64),
            ForceBoard::DirectDd => Some(BoardKind::DirectDd),
            ForceBoard::DirectQd => Some(BoardKind::DirectQd),
            ForceBoard::PertDd => Some(BoardKind::PertDd),
            ForceBoard::PertQd => Some(BoardKind::PertQd),
            ForceBoard::GpuShallow => Some(BoardKind::GpuShallow),
            ForceBoard::GpuPertF32 => Some(BoardKind::GpuPertF32),
            ForceBoard::GpuAdaptive => Some(BoardKind::GpuAdaptive),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    pub force_board: ForceBoard,
    /// Treat the capability probe as if no GPU were present.
    pub disable_gpu: bool,
    /// Hard cap on iterations per pixel.
    pub max_iter: u32,
    /// Scheduler batch granularity.
    pub batch_size: u32,
    /// Threshold for marking the reference orbit escaped.
    pub reference_escape_radius: f64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            force_board: ForceBoard::Auto,
            disable_gpu: false,
            max_iter: 100_000,
            batch_size: 100,
            reference_escape_radius: 1e5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let o = EngineOptions::default();
        assert_eq!(o.force_board, ForceBoard::Auto);
        assert!(!o.disable_gpu);
        assert_eq!(o.max_iter, 100_000);
        assert_eq!(o.batch_size, 100);
        assert_eq!(o.reference_escape_radius, 1e5);
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let o: EngineOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(o, EngineOptions::default());

        let o: EngineOptions = serde_json::from_str(
            r#"{"force_board": "pert_dd", "disable_gpu": true, "batch_size": 25}"#,
        )
        .unwrap();
        assert_eq!(o.force_board, ForceBoard::PertDd);
        assert!(o.disable_gpu);
        assert_eq!(o.batch_size, 25);
        assert_eq!(o.max_iter, 100_000);
    }

    #[test]
    fn force_board_snake_case_names() {
        let f: ForceBoard = serde_json::from_str(r#""gpu_adaptive""#).unwrap();
        assert_eq!(f.forced(), Some(BoardKind::GpuAdaptive));
        let f: ForceBoard = serde_json::from_str(r#""auto""#).unwrap();
        assert_eq!(f.forced(), None);
    }
}
