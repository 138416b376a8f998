//! In-memory Onshape stand-in shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use onshape_mcp::analysis::geometry::{Point3, INCHES_TO_METERS};
use onshape_mcp::analysis::{
    AssemblyDefinition, AssemblySource, BoundingBox, ElementPath, Occurrence, PartGeometrySource,
    Transform,
};
use onshape_mcp::onshape::{OnshapeError, OnshapeResult};

pub const DOC: &str = "doc1";
pub const WORKSPACE: &str = "ws1";
pub const ASSEMBLY: &str = "asm1";
pub const PART_STUDIO: &str = "ps1";

/// The element path every fake assembly lives at.
pub fn assembly_path() -> ElementPath {
    ElementPath::new(DOC, WORKSPACE, ASSEMBLY)
}

/// Tool arguments naming [`assembly_path`].
pub fn assembly_args() -> Value {
    json!({"documentId": DOC, "workspaceId": WORKSPACE, "elementId": ASSEMBLY})
}

/// An axis-aligned cube with edge `size` metres and low corner at the origin.
pub fn cube(size: f64) -> BoundingBox {
    BoundingBox::new([0.0; 3], [size; 3])
}

/// A cube with 1-inch edges.
pub fn inch_cube() -> BoundingBox {
    cube(INCHES_TO_METERS)
}

/// A translation given in inches.
pub fn at_inches(x: f64, y: f64, z: f64) -> Transform {
    Transform::translation_inches([x, y, z])
}

/// One `apply_transform` call.
#[derive(Debug, Clone)]
pub struct AppliedTransform {
    pub occurrences: Vec<Occurrence>,
    pub absolute: bool,
}

impl AppliedTransform {
    /// Translation applied to the single occurrence of this call.
    pub fn position(&self) -> Point3 {
        assert_eq!(self.occurrences.len(), 1);
        self.occurrences[0]
            .transform
            .expect("transform present")
            .position()
    }
}

/// Assembly and part-geometry source backed by in-memory data.
#[derive(Default)]
pub struct FakeOnshape {
    instances: Vec<Value>,
    occurrences: Vec<Value>,
    boxes: HashMap<String, BoundingBox>,
    failing_parts: HashSet<String>,
    assembly_status: Option<u16>,
    transform_status: Option<u16>,
    assembly_fetches: AtomicUsize,
    bbox_requests: Mutex<Vec<[String; 4]>>,
    applied: Mutex<Vec<AppliedTransform>>,
}

impl FakeOnshape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a part instance placed at `transform`, with its own part id.
    pub fn part(self, id: &str, name: &str, local: BoundingBox, transform: Transform) -> Self {
        let part_id = format!("part-{id}");
        self.instance_of(id, name, &part_id, local, transform)
    }

    /// Adds a part instance of `part_id`; instances may share a part id.
    pub fn instance_of(
        mut self,
        id: &str,
        name: &str,
        part_id: &str,
        local: BoundingBox,
        transform: Transform,
    ) -> Self {
        self.instances.push(json!({
            "id": id,
            "name": name,
            "type": "Part",
            "suppressed": false,
            "elementId": PART_STUDIO,
            "partId": part_id,
        }));
        self.occurrences.push(json!({"path": [id], "transform": transform}));
        self.boxes.insert(part_id.to_string(), local);
        self
    }

    /// Adds an arbitrary instance record with no occurrence.
    pub fn raw_instance(mut self, instance: Value) -> Self {
        self.instances.push(instance);
        self
    }

    /// Adds an arbitrary occurrence record.
    pub fn raw_occurrence(mut self, occurrence: Value) -> Self {
        self.occurrences.push(occurrence);
        self
    }

    /// Registers the local bounding box for `part_id`.
    pub fn bounding_box(mut self, part_id: &str, local: BoundingBox) -> Self {
        self.boxes.insert(part_id.to_string(), local);
        self
    }

    /// Makes bounding-box requests for `part_id` fail with HTTP 404.
    pub fn failing_part(mut self, part_id: &str) -> Self {
        self.failing_parts.insert(part_id.to_string());
        self
    }

    /// Makes assembly-definition requests fail with `status`.
    pub fn assembly_fails(mut self, status: u16) -> Self {
        self.assembly_status = Some(status);
        self
    }

    /// Makes transform requests fail with `status`.
    pub fn transforms_fail(mut self, status: u16) -> Self {
        self.transform_status = Some(status);
        self
    }

    pub fn assembly_fetches(&self) -> usize {
        self.assembly_fetches.load(Ordering::SeqCst)
    }

    pub fn bbox_fetches(&self) -> usize {
        self.bbox_requests.lock().unwrap().len()
    }

    /// `[document, workspace, element, part]` of every bounding-box request.
    pub fn bbox_requests(&self) -> Vec<[String; 4]> {
        self.bbox_requests.lock().unwrap().clone()
    }

    pub fn applied(&self) -> Vec<AppliedTransform> {
        self.applied.lock().unwrap().clone()
    }

    fn definition(&self) -> AssemblyDefinition {
        serde_json::from_value(json!({
            "rootAssembly": {
                "instances": self.instances,
                "occurrences": self.occurrences,
            }
        }))
        .expect("fake assembly definition parses")
    }
}

#[async_trait]
impl AssemblySource for FakeOnshape {
    async fn get_assembly_definition(
        &self,
        assembly: &ElementPath,
    ) -> OnshapeResult<AssemblyDefinition> {
        self.assembly_fetches.fetch_add(1, Ordering::SeqCst);
        assert_eq!(assembly, &assembly_path());

        if let Some(status) = self.assembly_status {
            return Err(OnshapeError::http(status, "/api/v9/assemblies", "assembly error"));
        }
        Ok(self.definition())
    }

    async fn apply_transform(
        &self,
        _assembly: &ElementPath,
        occurrences: &[Occurrence],
        absolute: bool,
    ) -> OnshapeResult<()> {
        if let Some(status) = self.transform_status {
            return Err(OnshapeError::http(status, "/occurrencetransforms", "rejected"));
        }
        self.applied.lock().unwrap().push(AppliedTransform {
            occurrences: occurrences.to_vec(),
            absolute,
        });
        Ok(())
    }
}

#[async_trait]
impl PartGeometrySource for FakeOnshape {
    async fn get_part_bounding_box(
        &self,
        document_id: &str,
        workspace_id: &str,
        element_id: &str,
        part_id: &str,
    ) -> OnshapeResult<BoundingBox> {
        self.bbox_requests.lock().unwrap().push([
            document_id.to_string(),
            workspace_id.to_string(),
            element_id.to_string(),
            part_id.to_string(),
        ]);

        if self.failing_parts.contains(part_id) {
            return Err(OnshapeError::http(404, "/api/v9/parts", "part not found"));
        }
        self.boxes
            .get(part_id)
            .copied()
            .ok_or_else(|| OnshapeError::http(404, "/api/v9/parts", "unknown part"))
    }
}
