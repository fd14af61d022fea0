//! Run observability: progress bars, status triggers, log deduplication,
//! and operator-facing output rendering.

pub mod dedup;
pub mod progress;
pub mod render;
pub mod status;

pub use dedup::{DedupLogger, LogSink, TracingSink};
pub use progress::{maybe_progress_bar, MIN_PROGRESS_SIZE};
pub use status::{SignalToken, StatusReporter};
