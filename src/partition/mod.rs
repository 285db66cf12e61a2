mod engine;
mod report;

pub use engine::{BlockEngine, Objective, PartitionEngine, PartitionOptions, PartitionRequest, check_assignment};
pub use report::PartitionReport;

/// Part id assigned to a vertex.
pub type PartId = u32;
