//! Assembly geometry analysis.
//!
//! Everything here works on axis-aligned bounding boxes (AABBs):
//!
//! - [`geometry`]: transform math and the pairwise overlap test
//! - [`assembly`]: typed assembly definition records
//! - [`cache`]: per-call bounding-box memoisation
//! - [`interference`]: pairwise interference detection and its report
//! - [`positioning`]: position reports, absolute and relative placement, face
//!   alignment
//!
//! The engines read data through the [`source`] traits and never perform I/O
//! themselves. Internally all lengths are metres; reports are in inches.

pub mod assembly;
pub mod cache;
pub mod error;
pub mod geometry;
pub mod interference;
pub mod positioning;
pub mod source;

pub use assembly::{
    format_assembly_summary, AssemblyDefinition, ElementPath, Instance, Occurrence, PartKey,
};
pub use error::{AnalysisError, AnalysisResult, InstanceRole};
pub use geometry::{BoundingBox, Transform};
pub use interference::{
    check_interference, format_interference_result, InterferenceResult, OverlapInfo,
};
pub use positioning::{
    align_to_face, get_positions, set_absolute_position, transform_instance, Face,
    InstancePositionInfo, PositionsResult,
};
pub use source::{AssemblySource, PartGeometrySource};
