//! Part geometry endpoints.

use async_trait::async_trait;

use crate::analysis::geometry::BoundingBox;
use crate::analysis::source::PartGeometrySource;
use crate::onshape::client::OnshapeClient;
use crate::onshape::error::OnshapeResult;

/// `/api/v9/parts/d/{did}/w/{wid}/e/{eid}/partid/{pid}/boundingboxes`.
fn bounding_box_segments<'a>(
    document_id: &'a str,
    workspace_id: &'a str,
    element_id: &'a str,
    part_id: &'a str,
) -> [&'a str; 12] {
    [
        "api",
        "v9",
        "parts",
        "d",
        document_id,
        "w",
        workspace_id,
        "e",
        element_id,
        "partid",
        part_id,
        "boundingboxes",
    ]
}

#[async_trait]
impl PartGeometrySource for OnshapeClient {
    async fn get_part_bounding_box(
        &self,
        document_id: &str,
        workspace_id: &str,
        element_id: &str,
        part_id: &str,
    ) -> OnshapeResult<BoundingBox> {
        let segments = bounding_box_segments(document_id, workspace_id, element_id, part_id);
        self.get_json(&segments).await
    }
}
