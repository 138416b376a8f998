//! Collaborator interfaces consumed by the analysis engines.
//!
//! The engines never talk to the network directly. [`crate::onshape::OnshapeClient`]
//! implements both traits over HTTP; tests use in-memory fakes.

use async_trait::async_trait;

use crate::analysis::assembly::{AssemblyDefinition, ElementPath, Occurrence};
use crate::analysis::geometry::BoundingBox;
use crate::onshape::OnshapeResult;

/// Reads assembly definitions and moves occurrences.
#[async_trait]
pub trait AssemblySource: Send + Sync {
    /// Fetches the assembly definition of `assembly`.
    async fn get_assembly_definition(
        &self,
        assembly: &ElementPath,
    ) -> OnshapeResult<AssemblyDefinition>;

    /// Applies each occurrence's transform to its path.
    ///
    /// With `absolute` set the transform replaces the current placement;
    /// otherwise it is composed with it.
    async fn apply_transform(
        &self,
        assembly: &ElementPath,
        occurrences: &[Occurrence],
        absolute: bool,
    ) -> OnshapeResult<()>;
}

/// Reads part geometry.
#[async_trait]
pub trait PartGeometrySource: Send + Sync {
    /// Fetches the local bounding box (metres) of one part.
    async fn get_part_bounding_box(
        &self,
        document_id: &str,
        workspace_id: &str,
        element_id: &str,
        part_id: &str,
    ) -> OnshapeResult<BoundingBox>;
}
