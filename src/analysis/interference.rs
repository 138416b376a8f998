//! Assembly interference detection using AABB overlap.
//!
//! Every resolved part instance gets a world-space AABB; all unordered pairs
//! are then tested. There is no broad phase: assemblies handled through this
//! tool are small and the cost is dominated by the bounding-box fetches.

use tracing::{debug, warn};

use crate::analysis::assembly::{transform_for, ElementPath, Instance};
use crate::analysis::cache::{BoundingBoxCache, BoxFetch};
use crate::analysis::error::AnalysisResult;
use crate::analysis::geometry::{check_overlap, to_inches, world_aabb, Axis, BoundingBox, Point3};
use crate::analysis::source::{AssemblySource, PartGeometrySource};

/// Name shown for instances that have none.
const UNKNOWN_NAME: &str = "Unknown";

/// One detected overlap between two instances.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlapInfo {
    /// Name of the first instance.
    pub instance_a_name: String,
    /// Id of the first instance.
    pub instance_a_id: String,
    /// Name of the second instance.
    pub instance_b_name: String,
    /// Id of the second instance.
    pub instance_b_id: String,
    /// Penetration depth per axis, in inches.
    pub penetration_inches: Point3,
    /// Product of the three penetrations, in cubic inches.
    pub volume_cubic_inches: f64,
}

impl OverlapInfo {
    /// The axis needing the least displacement to separate the pair.
    ///
    /// Ties go to the first axis in X, Y, Z order.
    #[must_use]
    pub fn smallest_axis(&self) -> (Axis, f64) {
        let mut best = (Axis::X, self.penetration_inches[0]);
        for axis in [Axis::Y, Axis::Z] {
            let value = self.penetration_inches[axis.index()];
            if value < best.1 {
                best = (axis, value);
            }
        }
        best
    }
}

/// Result of one interference check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterferenceResult {
    /// Instances that resolved to a world AABB.
    pub total_instances: usize,
    /// Unordered pairs tested.
    pub total_pairs_checked: usize,
    /// Detected overlaps, in pair order.
    pub overlaps: Vec<OverlapInfo>,
    /// Non-fatal problems worth showing to the user.
    pub warnings: Vec<String>,
}

/// Runs an AABB interference check on `assembly`.
///
/// Part instances whose bounding box cannot be fetched are skipped with a
/// warning. Fewer than two instances short-circuits without touching
/// `parts`.
///
/// # Errors
///
/// Returns an error if the assembly definition cannot be fetched or an
/// active part instance lacks its `elementId`/`partId`.
pub async fn check_interference<A, G>(
    assemblies: &A,
    parts: &G,
    assembly: &ElementPath,
) -> AnalysisResult<InterferenceResult>
where
    A: AssemblySource + ?Sized,
    G: PartGeometrySource + ?Sized,
{
    let definition = assemblies.get_assembly_definition(assembly).await?;
    let root = &definition.root_assembly;

    if root.instances.len() < 2 {
        return Ok(InterferenceResult {
            total_instances: root.instances.len(),
            total_pairs_checked: 0,
            overlaps: Vec::new(),
            warnings: vec!["Need at least 2 instances for interference check.".to_string()],
        });
    }

    let transforms = root.occurrence_transforms();
    let mut cache = BoundingBoxCache::new(parts, &assembly.workspace_id);
    let mut warnings = Vec::new();
    let mut placed: Vec<(&Instance, BoundingBox)> = Vec::new();

    for inst in root.active_parts() {
        let key = inst.part_key(&assembly.document_id)?;
        match cache.resolve(&key).await {
            BoxFetch::Ready(local) => {
                let world = world_aabb(&local, &transform_for(&transforms, &inst.id));
                placed.push((inst, world));
            }
            BoxFetch::Skipped { reason } => {
                warnings.push(format!(
                    "Skipped \"{}\": bounding box unavailable ({reason})",
                    inst.display_name(UNKNOWN_NAME)
                ));
            }
        }
    }

    let mut result = InterferenceResult {
        total_instances: placed.len(),
        total_pairs_checked: 0,
        overlaps: Vec::new(),
        warnings,
    };

    if placed.len() < 2 {
        result
            .warnings
            .push("Fewer than 2 active part instances could be checked.".to_string());
    }

    for (i, (inst_a, box_a)) in placed.iter().enumerate() {
        for (inst_b, box_b) in &placed[i + 1..] {
            result.total_pairs_checked += 1;

            if let Some(overlap) = check_overlap(box_a, box_b) {
                let penetration = to_inches(overlap);
                result.overlaps.push(OverlapInfo {
                    instance_a_name: inst_a.display_name(UNKNOWN_NAME).to_string(),
                    instance_a_id: inst_a.id.clone(),
                    instance_b_name: inst_b.display_name(UNKNOWN_NAME).to_string(),
                    instance_b_id: inst_b.id.clone(),
                    penetration_inches: penetration,
                    volume_cubic_inches: penetration.iter().product(),
                });
            }
        }
    }

    if !result.overlaps.is_empty() {
        warn!(
            overlaps = result.overlaps.len(),
            element_id = %assembly.element_id,
            "Assembly has interfering instances"
        );
    }
    debug!(
        instances = result.total_instances,
        pairs = result.total_pairs_checked,
        fetches = cache.fetches(),
        "Interference check complete"
    );

    Ok(result)
}

/// Renders an [`InterferenceResult`] as a human-readable report.
#[must_use]
pub fn format_interference_result(result: &InterferenceResult) -> String {
    let mut lines = vec![
        "Assembly Interference Check Results".to_string(),
        "=".repeat(40),
    ];

    if !result.warnings.is_empty() {
        lines.extend(result.warnings.iter().map(|w| format!("Warning: {w}")));
        lines.push(String::new());
    }

    lines.push(format!(
        "Checked {} instances ({} pairs)",
        result.total_instances, result.total_pairs_checked
    ));
    lines.push(String::new());

    if result.overlaps.is_empty() {
        lines.push("No overlaps detected. All parts are properly spaced.".to_string());
    } else {
        lines.push(format!("FOUND {} OVERLAP(S):", result.overlaps.len()));
        lines.push(String::new());

        for (n, ov) in result.overlaps.iter().enumerate() {
            let [x, y, z] = ov.penetration_inches;
            let (axis, amount) = ov.smallest_axis();
            lines.push(format!(
                "Overlap {}: \"{}\" and \"{}\"",
                n + 1,
                ov.instance_a_name,
                ov.instance_b_name
            ));
            lines.push(format!(
                "  Penetration: X={x:.3}\", Y={y:.3}\", Z={z:.3}\""
            ));
            lines.push(format!(
                "  Overlap volume: {:.3} cubic inches",
                ov.volume_cubic_inches
            ));
            lines.push(format!(
                "  Suggestion: Move one part {amount:.3}\" along {axis} to resolve"
            ));
            lines.push(String::new());
        }
    }

    lines.push(String::new());
    lines.push(
        "Note: Uses AABB (axis-aligned bounding box) detection. \
         Exact for axis-aligned rectangular parts. \
         For rotated parts, may report false positives."
            .to_string(),
    );

    lines.join("\n")
}
