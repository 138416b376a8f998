//! Typed records for Onshape assembly definitions.
//!
//! The assembly definition endpoint returns a `rootAssembly` object with a
//! flat list of `instances` and a flat list of `occurrences`. Only the fields
//! the analysis needs are modelled; everything else is ignored.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::analysis::error::{AnalysisError, AnalysisResult};
use crate::analysis::geometry::Transform;

/// Instance type string for parts.
pub const PART_TYPE: &str = "Part";

/// Identifies an element (Part Studio or Assembly) inside a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementPath {
    /// Document id.
    pub document_id: String,
    /// Workspace id.
    pub workspace_id: String,
    /// Element id.
    pub element_id: String,
}

impl ElementPath {
    /// Creates an element path.
    pub fn new(
        document_id: impl Into<String>,
        workspace_id: impl Into<String>,
        element_id: impl Into<String>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            workspace_id: workspace_id.into(),
            element_id: element_id.into(),
        }
    }
}

/// A full assembly definition.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyDefinition {
    /// The top-level assembly.
    #[serde(default)]
    pub root_assembly: RootAssembly,
}

/// Instances and occurrences of the top-level assembly.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RootAssembly {
    /// Everything inserted into the assembly.
    #[serde(default)]
    pub instances: Vec<Instance>,
    /// World placements, one per (possibly nested) instance path.
    #[serde(default)]
    pub occurrences: Vec<Occurrence>,
}

/// A part or sub-assembly inserted into an assembly.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    /// Instance id, unique within the assembly.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// `"Part"`, `"Assembly"`, ...
    #[serde(rename = "type", default)]
    pub instance_type: String,
    /// Suppressed instances take no part in analysis.
    #[serde(default)]
    pub suppressed: bool,
    /// Source document; absent means the assembly's own document.
    #[serde(default)]
    pub document_id: Option<String>,
    /// Source Part Studio element.
    #[serde(default)]
    pub element_id: Option<String>,
    /// Part id within the Part Studio.
    #[serde(default)]
    pub part_id: Option<String>,
}

/// Key identifying one physical part, shared by all its instances.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartKey {
    /// Document the part lives in.
    pub document_id: String,
    /// Part Studio element.
    pub element_id: String,
    /// Part id.
    pub part_id: String,
}

impl Instance {
    /// Returns `true` for non-suppressed `Part` instances.
    #[must_use]
    pub fn is_active_part(&self) -> bool {
        self.instance_type == PART_TYPE && !self.suppressed
    }

    /// Display name, or `fallback` if the instance has none.
    #[must_use]
    pub fn display_name<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(fallback)
    }

    /// Resolves the physical part this instance refers to.
    ///
    /// `assembly_document_id` is used when the instance does not name a
    /// document of its own.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::MalformedAssembly`] if `elementId` or
    /// `partId` is missing.
    pub fn part_key(&self, assembly_document_id: &str) -> AnalysisResult<PartKey> {
        let element_id = self.element_id.as_deref().ok_or_else(|| {
            AnalysisError::malformed(format!("instance '{}' has no elementId", self.id))
        })?;
        let part_id = self.part_id.as_deref().ok_or_else(|| {
            AnalysisError::malformed(format!("instance '{}' has no partId", self.id))
        })?;

        Ok(PartKey {
            document_id: self
                .document_id
                .clone()
                .unwrap_or_else(|| assembly_document_id.to_string()),
            element_id: element_id.to_string(),
            part_id: part_id.to_string(),
        })
    }
}

/// A placement of an instance path in assembly space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Occurrence {
    /// Instance ids from the root down; length 1 for top-level instances.
    #[serde(default)]
    pub path: Vec<String>,
    /// Placement transform; absent means identity.
    #[serde(default)]
    pub transform: Option<Transform>,
}

impl Occurrence {
    /// Creates an occurrence for a single top-level instance.
    pub fn top_level(instance_id: impl Into<String>, transform: Transform) -> Self {
        Self {
            path: vec![instance_id.into()],
            transform: Some(transform),
        }
    }
}

/// Top-level instance id to transform.
pub type OccurrenceTransforms = HashMap<String, Transform>;

impl RootAssembly {
    /// Builds the transform map from top-level occurrences.
    ///
    /// Nested occurrences (path longer than one) are ignored. A top-level
    /// occurrence without a transform maps to identity.
    #[must_use]
    pub fn occurrence_transforms(&self) -> OccurrenceTransforms {
        self.occurrences
            .iter()
            .filter_map(|occ| match occ.path.as_slice() {
                [id] => Some((id.clone(), occ.transform.unwrap_or_default())),
                _ => None,
            })
            .collect()
    }

    /// Looks up an instance by id.
    #[must_use]
    pub fn instance(&self, id: &str) -> Option<&Instance> {
        self.instances.iter().find(|inst| inst.id == id)
    }

    /// Non-suppressed part instances, in assembly order.
    pub fn active_parts(&self) -> impl Iterator<Item = &Instance> {
        self.instances.iter().filter(|inst| inst.is_active_part())
    }
}

/// Transform for `instance_id`, or identity if it has no top-level occurrence.
#[must_use]
pub fn transform_for(transforms: &OccurrenceTransforms, instance_id: &str) -> Transform {
    transforms.get(instance_id).copied().unwrap_or_default()
}

/// Plain-text listing of an assembly's instances and top-level occurrences.
#[must_use]
pub fn format_assembly_summary(definition: &AssemblyDefinition) -> String {
    let root = &definition.root_assembly;
    let top_level = root
        .occurrences
        .iter()
        .filter(|occ| occ.path.len() == 1)
        .count();

    let mut lines = vec![
        "Assembly Structure".to_string(),
        "=".repeat(40),
        format!(
            "Instances: {}  Top-level occurrences: {top_level}",
            root.instances.len()
        ),
        String::new(),
    ];

    if root.instances.is_empty() {
        lines.push("No instances found in assembly.".to_string());
    }

    for inst in &root.instances {
        let kind = if inst.instance_type.is_empty() {
            "?"
        } else {
            inst.instance_type.as_str()
        };
        let suppressed = if inst.suppressed { " [suppressed]" } else { "" };
        lines.push(format!(
            "- {} ({kind}, id {}){suppressed}",
            inst.display_name("Unnamed"),
            inst.id
        ));
    }

    lines.join("\n")
}
