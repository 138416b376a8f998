//! Assembly endpoints.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::analysis::assembly::{AssemblyDefinition, ElementPath, Occurrence};
use crate::analysis::geometry::Transform;
use crate::analysis::source::AssemblySource;
use crate::onshape::client::OnshapeClient;
use crate::onshape::error::OnshapeResult;

/// `/api/v9/assemblies/d/{did}/w/{wid}/e/{eid}` as path segments.
fn assembly_segments(assembly: &ElementPath) -> Vec<&str> {
    vec![
        "api",
        "v9",
        "assemblies",
        "d",
        assembly.document_id.as_str(),
        "w",
        assembly.workspace_id.as_str(),
        "e",
        assembly.element_id.as_str(),
    ]
}

/// Request bodies for the occurrence-transforms endpoint.
///
/// The endpoint applies one transform to a list of paths, so occurrences are
/// grouped by transform, keeping first-seen order.
fn occurrence_transform_bodies(occurrences: &[Occurrence], absolute: bool) -> Vec<Value> {
    let mut groups: Vec<(Transform, Vec<&[String]>)> = Vec::new();

    for occ in occurrences {
        let transform = occ.transform.unwrap_or_default();
        match groups.iter().position(|(t, _)| *t == transform) {
            Some(i) => groups[i].1.push(occ.path.as_slice()),
            None => groups.push((transform, vec![occ.path.as_slice()])),
        }
    }

    groups
        .into_iter()
        .map(|(transform, paths)| {
            let occurrences: Vec<Value> =
                paths.iter().map(|path| json!({ "path": path })).collect();
            json!({
                "isRelative": !absolute,
                "occurrences": occurrences,
                "transform": transform,
            })
        })
        .collect()
}

#[async_trait]
impl AssemblySource for OnshapeClient {
    async fn get_assembly_definition(
        &self,
        assembly: &ElementPath,
    ) -> OnshapeResult<AssemblyDefinition> {
        self.get_json(&assembly_segments(assembly)).await
    }

    async fn apply_transform(
        &self,
        assembly: &ElementPath,
        occurrences: &[Occurrence],
        absolute: bool,
    ) -> OnshapeResult<()> {
        let mut segments = assembly_segments(assembly);
        segments.push("occurrencetransforms");

        for body in occurrence_transform_bodies(occurrences, absolute) {
            self.post_json(&segments, &body).await?;
        }

        debug!(
            element_id = %assembly.element_id,
            count = occurrences.len(),
            absolute,
            "Applied occurrence transforms"
        );
        Ok(())
    }
}
