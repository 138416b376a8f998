//! Instance position reporting, placement, and face alignment.
//!
//! Absolute placement and face alignment go through an absolute,
//! translation-only transform, so they also reset the instance's rotation to
//! identity. [`transform_instance`] is the one relative move: it composes
//! with the current placement.

use std::fmt;
use std::str::FromStr;

use tracing::{debug, info};

use crate::analysis::assembly::{transform_for, ElementPath, Instance, Occurrence};
use crate::analysis::cache::{BoundingBoxCache, BoxFetch};
use crate::analysis::error::{AnalysisError, AnalysisResult, InstanceRole};
use crate::analysis::geometry::{
    to_inches, world_aabb, Axis, BoundingBox, Point3, Transform, INCHES_TO_METERS,
};
use crate::analysis::source::{AssemblySource, PartGeometrySource};

/// Name shown for instances that have none.
const UNNAMED: &str = "Unnamed";

/// A face of a world-space AABB.
///
/// Front/back are the low/high Y faces, left/right the low/high X faces,
/// bottom/top the low/high Z faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    /// Low Y.
    Front,
    /// High Y.
    Back,
    /// Low X.
    Left,
    /// High X.
    Right,
    /// Low Z.
    Bottom,
    /// High Z.
    Top,
}

impl Face {
    /// All faces, sorted by name.
    pub const ALL: [Self; 6] = [
        Self::Back,
        Self::Bottom,
        Self::Front,
        Self::Left,
        Self::Right,
        Self::Top,
    ];

    /// Lowercase face name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Back => "back",
            Self::Left => "left",
            Self::Right => "right",
            Self::Bottom => "bottom",
            Self::Top => "top",
        }
    }

    /// The axis perpendicular to this face.
    #[must_use]
    pub const fn axis(self) -> Axis {
        match self {
            Self::Front | Self::Back => Axis::Y,
            Self::Left | Self::Right => Axis::X,
            Self::Bottom | Self::Top => Axis::Z,
        }
    }

    /// Whether this face sits on the high side of its axis.
    #[must_use]
    pub const fn is_high_side(self) -> bool {
        matches!(self, Self::Back | Self::Right | Self::Top)
    }

    fn allowed_list() -> String {
        Self::ALL
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Face {
    type Err = AnalysisError;

    /// Parses a face name, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == name)
            .ok_or_else(|| AnalysisError::InvalidFace {
                face: name,
                allowed: Self::allowed_list(),
            })
    }
}

/// Position and extent of one instance, in inches.
#[derive(Debug, Clone, PartialEq)]
pub struct InstancePositionInfo {
    /// Display name.
    pub name: String,
    /// Instance id.
    pub instance_id: String,
    /// Translation of the instance's top-level transform.
    pub position_inches: Point3,
    /// World AABB extent per axis.
    pub size_inches: Point3,
    /// World AABB low corner.
    pub world_low_inches: Point3,
    /// World AABB high corner.
    pub world_high_inches: Point3,
}

impl InstancePositionInfo {
    fn new(inst: &Instance, transform: &Transform, world: &BoundingBox) -> Self {
        Self {
            name: inst.display_name(UNNAMED).to_string(),
            instance_id: inst.id.clone(),
            position_inches: to_inches(transform.position()),
            size_inches: to_inches(world.size()),
            world_low_inches: to_inches(world.low()),
            world_high_inches: to_inches(world.high()),
        }
    }
}

/// Positions of the resolvable instances plus per-instance warnings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionsResult {
    /// One entry per active part instance whose bounding box resolved.
    pub positions: Vec<InstancePositionInfo>,
    /// One entry per instance that was skipped.
    pub warnings: Vec<String>,
}

/// New absolute position (metres) placing the source flush against `face`.
///
/// The source ends up outside the target, touching it. Only the coordinate
/// on the face's axis changes; the other two keep `current_position`.
#[must_use]
pub fn compute_aligned_position(
    source_local: &BoundingBox,
    current_position: Point3,
    target_world: &BoundingBox,
    face: Face,
) -> Point3 {
    let axis = face.axis().index();
    let mut position = current_position;
    position[axis] = if face.is_high_side() {
        target_world.high()[axis] - source_local.low()[axis]
    } else {
        target_world.low()[axis] - source_local.high()[axis]
    };
    position
}

/// Collects position info for every resolvable active part instance.
///
/// Instances whose bounding box cannot be fetched are left out and named in
/// [`PositionsResult::warnings`].
///
/// # Errors
///
/// Returns an error if the assembly definition cannot be fetched or an
/// active part instance lacks its `elementId`/`partId`.
pub async fn collect_positions<A, G>(
    assemblies: &A,
    parts: &G,
    assembly: &ElementPath,
) -> AnalysisResult<PositionsResult>
where
    A: AssemblySource + ?Sized,
    G: PartGeometrySource + ?Sized,
{
    let definition = assemblies.get_assembly_definition(assembly).await?;
    let root = &definition.root_assembly;
    let transforms = root.occurrence_transforms();
    let mut cache = BoundingBoxCache::new(parts, &assembly.workspace_id);
    let mut result = PositionsResult::default();

    for inst in root.active_parts() {
        let key = inst.part_key(&assembly.document_id)?;
        match cache.resolve(&key).await {
            BoxFetch::Ready(local) => {
                let transform = transform_for(&transforms, &inst.id);
                let world = world_aabb(&local, &transform);
                result
                    .positions
                    .push(InstancePositionInfo::new(inst, &transform, &world));
            }
            BoxFetch::Skipped { reason } => result.warnings.push(format!(
                "Skipped \"{}\": bounding box unavailable ({reason})",
                inst.display_name(UNNAMED)
            )),
        }
    }

    debug!(
        instances = result.positions.len(),
        skipped = result.warnings.len(),
        fetches = cache.fetches(),
        "Collected instance positions"
    );

    Ok(result)
}

/// Fetches and formats every instance position in `assembly`.
///
/// # Errors
///
/// See [`collect_positions`].
pub async fn get_positions<A, G>(
    assemblies: &A,
    parts: &G,
    assembly: &ElementPath,
) -> AnalysisResult<String>
where
    A: AssemblySource + ?Sized,
    G: PartGeometrySource + ?Sized,
{
    let result = collect_positions(assemblies, parts, assembly).await?;
    Ok(format_positions_report(&result))
}

/// Renders a [`PositionsResult`] as a human-readable report.
#[must_use]
pub fn format_positions_report(result: &PositionsResult) -> String {
    let mut lines = vec![
        "Assembly Instance Positions".to_string(),
        "=".repeat(40),
        String::new(),
    ];

    if !result.warnings.is_empty() {
        lines.extend(result.warnings.iter().map(|w| format!("Warning: {w}")));
        lines.push(String::new());
    }

    let positions = &result.positions;
    if positions.is_empty() {
        lines.push(if result.warnings.is_empty() {
            "No instances found in assembly.".to_string()
        } else {
            "No instance positions could be resolved.".to_string()
        });
        return lines.join("\n");
    }

    lines.push(format!("Found {} instance(s):", positions.len()));
    lines.push(String::new());

    for p in positions {
        let [px, py, pz] = p.position_inches;
        let [sx, sy, sz] = p.size_inches;
        let [lx, ly, lz] = p.world_low_inches;
        let [hx, hy, hz] = p.world_high_inches;

        lines.push(format!("**{}** (ID: {})", p.name, p.instance_id));
        lines.push(format!(
            "  Position: X={px:.3}\", Y={py:.3}\", Z={pz:.3}\""
        ));
        lines.push(format!(
            "  Size: {sx:.3}\" W x {sy:.3}\" D x {sz:.3}\" H"
        ));
        lines.push(format!(
            "  World bounds: X=[{lx:.3}\", {hx:.3}\"], Y=[{ly:.3}\", {hy:.3}\"], Z=[{lz:.3}\", {hz:.3}\"]"
        ));
        lines.push(String::new());
    }

    lines.join("\n")
}

/// Moves `instance_id` to an absolute position given in inches.
///
/// Applies an identity-rotation transform, so any existing rotation of the
/// instance is discarded.
///
/// # Errors
///
/// Returns an error if the transform call fails.
pub async fn set_absolute_position<A>(
    assemblies: &A,
    assembly: &ElementPath,
    instance_id: &str,
    position_inches: Point3,
) -> AnalysisResult<String>
where
    A: AssemblySource + ?Sized,
{
    let transform = Transform::translation_inches(position_inches);
    assemblies
        .apply_transform(assembly, &[Occurrence::top_level(instance_id, transform)], true)
        .await?;

    let [x, y, z] = position_inches;
    info!(instance_id, x, y, z, "Set absolute instance position");

    Ok(format!(
        "Set instance {instance_id} to absolute position: X={x:.3}\", Y={y:.3}\", Z={z:.3}\""
    ))
}

/// Moves `instance_id` relative to its current placement.
///
/// `translation_inches` is added to the current position and
/// `rotation_degrees` (about X, Y and Z) is composed with the current
/// rotation; see [`Transform::from_translation_rotation`].
///
/// # Errors
///
/// Returns an error if the transform call fails.
pub async fn transform_instance<A>(
    assemblies: &A,
    assembly: &ElementPath,
    instance_id: &str,
    translation_inches: Point3,
    rotation_degrees: Point3,
) -> AnalysisResult<String>
where
    A: AssemblySource + ?Sized,
{
    let transform = Transform::from_translation_rotation(
        translation_inches.map(|v| v * INCHES_TO_METERS),
        rotation_degrees.map(f64::to_radians),
    );
    assemblies
        .apply_transform(assembly, &[Occurrence::top_level(instance_id, transform)], false)
        .await?;

    let [tx, ty, tz] = translation_inches;
    let [rx, ry, rz] = rotation_degrees;
    info!(instance_id, tx, ty, tz, rx, ry, rz, "Transformed instance");

    Ok(format!(
        "Transformed instance {instance_id}: translate X={tx:.3}\", Y={ty:.3}\", Z={tz:.3}\", \
         rotate X={rx:.1}°, Y={ry:.1}°, Z={rz:.1}°"
    ))
}

/// Moves `source_id` so it sits flush against `face` of `target_id`.
///
/// The face name is validated and both instances are looked up before any
/// bounding box is fetched or any transform applied.
///
/// # Errors
///
/// Returns an error if the face is invalid, either instance is missing or
/// not a resolvable part, or any collaborator call fails.
pub async fn align_to_face<A, G>(
    assemblies: &A,
    parts: &G,
    assembly: &ElementPath,
    source_id: &str,
    target_id: &str,
    face: &str,
) -> AnalysisResult<String>
where
    A: AssemblySource + ?Sized,
    G: PartGeometrySource + ?Sized,
{
    let face: Face = face.parse()?;

    let definition = assemblies.get_assembly_definition(assembly).await?;
    let root = &definition.root_assembly;
    let source = root
        .instance(source_id)
        .ok_or_else(|| AnalysisError::instance_not_found(InstanceRole::Source, source_id))?;
    let target = root
        .instance(target_id)
        .ok_or_else(|| AnalysisError::instance_not_found(InstanceRole::Target, target_id))?;

    let source_key = source.part_key(&assembly.document_id)?;
    let target_key = target.part_key(&assembly.document_id)?;

    let source_local = parts
        .get_part_bounding_box(
            &source_key.document_id,
            &assembly.workspace_id,
            &source_key.element_id,
            &source_key.part_id,
        )
        .await?;
    let target_local = parts
        .get_part_bounding_box(
            &target_key.document_id,
            &assembly.workspace_id,
            &target_key.element_id,
            &target_key.part_id,
        )
        .await?;

    let transforms = root.occurrence_transforms();
    let target_world = world_aabb(&target_local, &transform_for(&transforms, target_id));
    let current = transform_for(&transforms, source_id).position();

    let new_position = compute_aligned_position(&source_local, current, &target_world, face);
    let transform = Transform::translation(new_position);
    assemblies
        .apply_transform(assembly, &[Occurrence::top_level(source_id, transform)], true)
        .await?;

    let [x, y, z] = to_inches(new_position);
    info!(source_id, target_id, %face, x, y, z, "Aligned instance to face");

    Ok(format!(
        "Aligned '{}' to '{face}' face of '{}'.\nNew position: X={x:.3}\", Y={y:.3}\", Z={z:.3}\"",
        source.name.as_deref().unwrap_or(source_id),
        target.name.as_deref().unwrap_or(target_id),
    ))
}
