pub mod alignment;
pub mod config;
pub mod corpus;
pub mod error;
pub mod pipeline;
pub mod table;
pub mod types;

pub use alignment::assemble::{
    beat_timeline_table, compact_table, full_table, warp_map_table, OutputTable,
};
pub use alignment::mapper::{align_events, MappingStats};
pub use alignment::report::{JobRecord, JobStatus, RunMeta, RunReport, RunSummary};
pub use alignment::warp::WarpingFunction;
pub use config::{AlignerConfig, OutputMode};
pub use error::AlignError;
pub use pipeline::batch::run_batch;
pub use pipeline::builder::AnnotationAlignerBuilder;
pub use pipeline::defaults::PrecomputedWarpSource;
pub use pipeline::runtime::AnnotationAligner;
pub use pipeline::traits::WarpSource;
pub use table::Table;
pub use types::{
    AlignedEvent, AlignmentJob, EventKind, JobOutput, MappedTime, ScoreEvent, WarpAnchor,
};
