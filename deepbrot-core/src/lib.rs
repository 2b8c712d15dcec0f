pub mod calendar;
pub mod complex;
pub mod dd;
mod eft;
pub mod error;
pub mod messages;
pub mod qd;
pub mod viewport;

pub use calendar::{checkpoint_stride, figure_period, snapshot_due};
pub use complex::{DdComplex, QdComplex};
pub use dd::Dd;
pub use error::QdParseError;
pub use messages::{ChangeRecord, ConvergedPixel, Progress};
pub use qd::Qd;
pub use viewport::ViewportSpec;
