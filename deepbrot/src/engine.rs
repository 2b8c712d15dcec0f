//! The engine facade: probe capabilities, select and construct a board,
//! then drive it through a scheduler while exposing the change stream and
//! progress counters.

use crate::options::{BoardKind, EngineOptions};
use crate::selector::select_board;
use deepbrot_core::{ChangeRecord, Progress, ViewportSpec};
use deepbrot_engine::{
    Board, CancelFlag, CollectSink, DirectDdBoard, DirectF32Board, DirectF64Board, DirectQdBoard,
    EngineError, PerturbDdBoard, PerturbQdBoard, Scheduler,
};
use deepbrot_gpu::{
    Capabilities, GpuAdaptiveBoard, GpuAvailability, GpuContext, GpuPerturbF32Board,
    GpuShallowBoard,
};

pub struct Engine {
    scheduler: Scheduler,
    sink: CollectSink,
    cancel: CancelFlag,
    kind: BoardKind,
}

impl Engine {
    pub fn new(spec: &ViewportSpec, options: &EngineOptions) -> Result<Self, EngineError> {
        let mut spec = spec.clone();
        spec.max_iter = spec.max_iter.min(options.max_iter);

        let (caps, ctx) = if options.disable_gpu {
            (Capabilities::without_gpu(), None)
        } else {
            match GpuContext::try_init_blocking() {
                GpuAvailability::Available(ctx) => (ctx.capabilities(), Some(ctx)),
                GpuAvailability::Unavailable(_) => (Capabilities::without_gpu(), None),
            }
        };

        let kind = match options.force_board.forced() {
            Some(kind) => kind,
            None => select_board(&spec, &caps)?,
        };

        let radius = options.reference_escape_radius;
        let board: Box<dyn Board> = if kind.is_gpu() {
            let ctx = ctx.ok_or(EngineError::BoardUnsupported {
                zoom: spec.zoom(),
                exponent: spec.exponent,
            })?;
            match kind {
                BoardKind::GpuShallow => Box::new(GpuShallowBoard::new(ctx, &spec)?),
                BoardKind::GpuPertF32 => {
                    Box::new(GpuPerturbF32Board::new(ctx, &spec, radius)?)
                }
                _ => Box::new(GpuAdaptiveBoard::new(ctx, &spec, radius)?),
            }
        } else {
            match kind {
                BoardKind::DirectF32 => Box::new(DirectF32Board::new(&spec)),
                BoardKind::DirectF64 => Box::new(DirectF64Board::new(&spec)),
                BoardKind::DirectDd => Box::new(DirectDdBoard::new(&spec)),
                BoardKind::DirectQd => Box::new(DirectQdBoard::new(&spec)),
                BoardKind::PertDd => Box::new(PerturbDdBoard::new(&spec, radius)),
                _ => Box::new(PerturbQdBoard::new(&spec, radius)),
            }
        };
        log::debug!(
            "view {}x{} at zoom {:.3e} -> {:?}",
            spec.width,
            spec.height,
            spec.zoom(),
            kind
        );

        let scheduler = Scheduler::new(board, options.batch_size);
        let cancel = scheduler.cancel_flag();
        Ok(Self {
            scheduler,
            sink: CollectSink::default(),
            cancel,
            kind,
        })
    }

    pub fn board_kind(&self) -> BoardKind {
        self.kind
    }

    /// Advance by up to `batches` scheduler ticks (or until completion).
    /// Returns true when the view is complete.
    pub fn step(&mut self, batches: u32) -> Result<bool, EngineError> {
        self.scheduler.step(batches, &mut self.sink)
    }

    /// Run to completion (or cancellation).
    pub fn run_to_completion(&mut self) -> Result<bool, EngineError> {
        while !self.scheduler.is_complete() && !self.cancel.is_cancelled() {
            self.step(64)?;
        }
        Ok(self.scheduler.is_complete())
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_complete(&self) -> bool {
        self.scheduler.is_complete()
    }

    pub fn progress(&self) -> Progress {
        self.scheduler.progress()
    }

    /// Take the change records published so far.
    pub fn drain(&mut self) -> Vec<ChangeRecord> {
        std::mem::take(&mut self.sink.records)
    }

    /// Read-only access to the underlying board for annotations.
    pub fn board(&self) -> &dyn Board {
        self.scheduler.board()
    }
}
