//! Ingest orchestration for orbitscrape.
//!
//! Wires the crawler's workers to a paced, bounded [`dispatcher`] and a single
//! writing [`aggregator`], exposed as one [`pipeline::run_ingest`] call.

pub mod aggregator;
pub mod dispatcher;
pub mod pipeline;

pub use aggregator::{AggregateStats, Aggregator};
pub use dispatcher::{DispatchStats, Dispatcher};
pub use pipeline::{IngestReport, ProgressReporter, SilentProgress, run_ingest};
