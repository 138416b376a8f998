//! Integration tests for the positioning engine.

mod common;

use common::{assembly_path, at_inches, cube, inch_cube, FakeOnshape, PART_STUDIO};
use onshape_mcp::analysis::geometry::{Point3, INCHES_TO_METERS};
use onshape_mcp::analysis::positioning::collect_positions;
use onshape_mcp::analysis::geometry::transform_point;
use onshape_mcp::analysis::{
    align_to_face, get_positions, set_absolute_position, transform_instance, AnalysisError,
    BoundingBox, Face, InstanceRole, Transform,
};
use serde_json::json;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn approx_point(a: Point3, b: Point3) -> bool {
    a.iter().zip(b).all(|(x, y)| approx(*x, y))
}

/// Target: 2 x 4 x 6 inch block at (10, 20, 30) inches.
/// Source: 1 inch cube currently at (1, 2, 3) inches.
fn alignment_fixture() -> FakeOnshape {
    let target = BoundingBox::new([0.0; 3], [2.0, 4.0, 6.0].map(|v| v * INCHES_TO_METERS));
    FakeOnshape::new()
        .part("src", "Bracket", inch_cube(), at_inches(1.0, 2.0, 3.0))
        .part("tgt", "Frame", target, at_inches(10.0, 20.0, 30.0))
}

fn inches(p: Point3) -> Point3 {
    p.map(|v| v / INCHES_TO_METERS)
}

// =============================================================================
// Position Report
// =============================================================================

#[tokio::test]
async fn test_positions_report_translation_size_and_bounds() {
    let part = BoundingBox::new([0.0; 3], [0.0254, 0.0508, 0.0762]);
    let fake = FakeOnshape::new()
        .part("a", "Plate", part, at_inches(1.0, 2.0, 3.0))
        .raw_instance(json!({"id": "s", "name": "Hidden", "type": "Part", "suppressed": true}));

    let result = collect_positions(&fake, &fake, &assembly_path())
        .await
        .unwrap();

    assert!(result.warnings.is_empty());
    assert_eq!(result.positions.len(), 1);
    let info = &result.positions[0];
    assert_eq!(info.name, "Plate");
    assert_eq!(info.instance_id, "a");
    assert!(approx_point(info.position_inches, [1.0, 2.0, 3.0]));
    assert!(approx_point(info.size_inches, [1.0, 2.0, 3.0]));
    assert!(approx_point(info.world_low_inches, [1.0, 2.0, 3.0]));
    assert!(approx_point(info.world_high_inches, [2.0, 4.0, 6.0]));

    let report = get_positions(&fake, &fake, &assembly_path()).await.unwrap();
    assert!(report.contains("Found 1 instance(s):"));
    assert!(report.contains("**Plate** (ID: a)"));
    assert!(report.contains("Position: X=1.000\", Y=2.000\", Z=3.000\""));
    assert!(report.contains("Size: 1.000\" W x 2.000\" D x 3.000\" H"));
    assert!(!report.contains("Hidden"));
}

#[tokio::test]
async fn test_positions_warn_about_failed_fetches() {
    let fake = FakeOnshape::new()
        .part("a", "Good", inch_cube(), Transform::IDENTITY)
        .part("b", "Broken", inch_cube(), Transform::IDENTITY)
        .failing_part("part-b");

    let result = collect_positions(&fake, &fake, &assembly_path())
        .await
        .unwrap();
    assert_eq!(result.positions.len(), 1);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].starts_with("Skipped \"Broken\": bounding box unavailable"));
    assert!(result.warnings[0].contains("404"));

    let report = get_positions(&fake, &fake, &assembly_path()).await.unwrap();
    assert!(report.contains("Found 1 instance(s):"));
    assert!(report.contains("**Good** (ID: a)"));
    assert!(report.contains("Warning: Skipped \"Broken\""));
    assert!(!report.contains("**Broken**"));
}

#[tokio::test]
async fn test_positions_when_every_fetch_fails() {
    let fake = FakeOnshape::new()
        .part("a", "Only", inch_cube(), Transform::IDENTITY)
        .failing_part("part-a");

    let report = get_positions(&fake, &fake, &assembly_path()).await.unwrap();

    assert!(report.contains("Warning: Skipped \"Only\""));
    assert!(report.contains("No instance positions could be resolved."));
    assert!(!report.contains("No instances found"));
}

#[tokio::test]
async fn test_positions_of_empty_assembly() {
    let fake = FakeOnshape::new();

    let report = get_positions(&fake, &fake, &assembly_path()).await.unwrap();

    assert!(report.contains("No instances found in assembly."));
    assert_eq!(fake.bbox_fetches(), 0);
}

#[tokio::test]
async fn test_unnamed_instance_uses_fallback_name() {
    let fake = FakeOnshape::new()
        .raw_instance(json!({"id": "n", "type": "Part", "elementId": PART_STUDIO, "partId": "p"}))
        .bounding_box("p", inch_cube());

    let report = get_positions(&fake, &fake, &assembly_path()).await.unwrap();

    assert!(report.contains("**Unnamed** (ID: n)"));
}

// =============================================================================
// Absolute Placement
// =============================================================================

#[tokio::test]
async fn test_set_absolute_position_applies_translation_only_transform() {
    let fake = FakeOnshape::new();

    let message = set_absolute_position(&fake, &assembly_path(), "inst", [1.5, -2.0, 0.25])
        .await
        .unwrap();

    assert_eq!(
        message,
        "Set instance inst to absolute position: X=1.500\", Y=-2.000\", Z=0.250\""
    );

    let applied = fake.applied();
    assert_eq!(applied.len(), 1);
    assert!(applied[0].absolute);
    assert_eq!(applied[0].occurrences[0].path, ["inst"]);

    let transform = applied[0].occurrences[0].transform.unwrap();
    let expected = Transform::translation([1.5, -2.0, 0.25].map(|v| v * INCHES_TO_METERS));
    assert_eq!(transform, expected);
}

#[tokio::test]
async fn test_set_absolute_position_propagates_failure() {
    let fake = FakeOnshape::new().transforms_fail(500);

    let err = set_absolute_position(&fake, &assembly_path(), "inst", [0.0; 3])
        .await
        .unwrap_err();

    assert!(matches!(err, AnalysisError::Source(_)));
}

// =============================================================================
// Relative Transform
// =============================================================================

#[tokio::test]
async fn test_transform_instance_translation_nudge() {
    let fake = FakeOnshape::new();

    let message = transform_instance(&fake, &assembly_path(), "inst", [5.0, 0.0, -1.0], [0.0; 3])
        .await
        .unwrap();

    assert_eq!(
        message,
        "Transformed instance inst: translate X=5.000\", Y=0.000\", Z=-1.000\", \
         rotate X=0.0°, Y=0.0°, Z=0.0°"
    );

    let applied = fake.applied();
    assert_eq!(applied.len(), 1);
    assert!(!applied[0].absolute);
    assert_eq!(applied[0].occurrences[0].path, ["inst"]);

    let transform = applied[0].occurrences[0].transform.unwrap();
    assert_eq!(transform, Transform::translation_inches([5.0, 0.0, -1.0]));
}

#[tokio::test]
async fn test_transform_instance_rotation_nudge() {
    let fake = FakeOnshape::new();

    transform_instance(&fake, &assembly_path(), "inst", [1.0, 0.0, 0.0], [0.0, 0.0, 90.0])
        .await
        .unwrap();

    let applied = fake.applied();
    assert!(!applied[0].absolute);
    let transform = applied[0].occurrences[0].transform.unwrap();

    // Quarter turn about Z: +X becomes +Y, then the 1 inch offset is added.
    let moved = inches(transform_point(&transform, [INCHES_TO_METERS, 0.0, 0.0]));
    assert!(approx_point(moved, [1.0, 1.0, 0.0]), "{moved:?}");
    assert!(approx_point(inches(applied[0].position()), [1.0, 0.0, 0.0]));
}

#[tokio::test]
async fn test_transform_instance_propagates_failure() {
    let fake = FakeOnshape::new().transforms_fail(403);

    let err = transform_instance(&fake, &assembly_path(), "inst", [0.0; 3], [0.0, 45.0, 0.0])
        .await
        .unwrap_err();

    assert!(matches!(err, AnalysisError::Source(_)));
    assert!(fake.applied().is_empty());
}

// =============================================================================
// Face Alignment
// =============================================================================

#[tokio::test]
async fn test_align_changes_only_the_face_axis() {
    // Target world box spans X [10, 12], Y [20, 24], Z [30, 36] inches.
    let cases = [
        (Face::Front, [1.0, 19.0, 3.0]),
        (Face::Back, [1.0, 24.0, 3.0]),
        (Face::Left, [9.0, 2.0, 3.0]),
        (Face::Right, [12.0, 2.0, 3.0]),
        (Face::Bottom, [1.0, 2.0, 29.0]),
        (Face::Top, [1.0, 2.0, 36.0]),
    ];

    for (face, expected) in cases {
        let fake = alignment_fixture();

        align_to_face(&fake, &fake, &assembly_path(), "src", "tgt", face.as_str())
            .await
            .unwrap();

        let applied = fake.applied();
        assert_eq!(applied.len(), 1, "{face}");
        assert!(applied[0].absolute);
        assert_eq!(applied[0].occurrences[0].path, ["src"]);

        let position = inches(applied[0].position());
        assert!(approx_point(position, expected), "{face}: {position:?}");

        let axis = face.axis().index();
        for other in (0..3).filter(|&i| i != axis) {
            assert!(approx(position[other], [1.0, 2.0, 3.0][other]), "{face}");
        }
    }
}

#[tokio::test]
async fn test_aligned_source_touches_without_overlap() {
    let fake = alignment_fixture();

    align_to_face(&fake, &fake, &assembly_path(), "src", "tgt", "right")
        .await
        .unwrap();

    // Source now spans X [12, 13]; the target ends at X = 12.
    let position = inches(fake.applied()[0].position());
    assert!(approx(position[0], 12.0));
}

#[tokio::test]
async fn test_align_uses_source_local_box_offset() {
    // Source box does not start at its origin: local X [0.5, 1.5] inches.
    let offset = BoundingBox::new(
        [0.5 * INCHES_TO_METERS, 0.0, 0.0],
        [1.5 * INCHES_TO_METERS, 0.0254, 0.0254],
    );
    let target = cube(2.0 * INCHES_TO_METERS);
    let fake = FakeOnshape::new()
        .part("src", "Offset", offset, Transform::IDENTITY)
        .part("tgt", "Block", target, Transform::IDENTITY);

    align_to_face(&fake, &fake, &assembly_path(), "src", "tgt", "left")
        .await
        .unwrap();

    let position = inches(fake.applied()[0].position());
    assert!(approx_point(position, [-1.5, 0.0, 0.0]));
}

#[tokio::test]
async fn test_align_confirmation_names_both_instances() {
    let fake = alignment_fixture();

    let message = align_to_face(&fake, &fake, &assembly_path(), "src", "tgt", "  TOP ")
        .await
        .unwrap();

    assert_eq!(
        message,
        "Aligned 'Bracket' to 'top' face of 'Frame'.\nNew position: X=1.000\", Y=2.000\", Z=36.000\""
    );
}

#[tokio::test]
async fn test_invalid_face_fails_before_any_call() {
    let fake = alignment_fixture();

    let err = align_to_face(&fake, &fake, &assembly_path(), "src", "tgt", "diagonal")
        .await
        .unwrap_err();

    assert!(matches!(err, AnalysisError::InvalidFace { .. }));
    assert!(err.is_validation());
    assert_eq!(
        err.to_string(),
        "Invalid face 'diagonal'. Must be one of: back, bottom, front, left, right, top"
    );
    assert_eq!(fake.assembly_fetches(), 0);
    assert_eq!(fake.bbox_fetches(), 0);
    assert!(fake.applied().is_empty());
}

#[tokio::test]
async fn test_missing_instances_are_named_by_role() {
    let fake = alignment_fixture();

    let err = align_to_face(&fake, &fake, &assembly_path(), "nope", "tgt", "top")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::InstanceNotFound {
            role: InstanceRole::Source,
            ..
        }
    ));
    assert_eq!(err.to_string(), "Source instance 'nope' not found in assembly");

    let err = align_to_face(&fake, &fake, &assembly_path(), "src", "gone", "top")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Target instance 'gone' not found in assembly");

    assert_eq!(fake.bbox_fetches(), 0);
    assert!(fake.applied().is_empty());
}

#[tokio::test]
async fn test_align_bounding_box_failure_is_not_applied() {
    let fake = alignment_fixture().failing_part("part-tgt");

    let err = align_to_face(&fake, &fake, &assembly_path(), "src", "tgt", "top")
        .await
        .unwrap_err();

    match err {
        AnalysisError::Source(source) => assert_eq!(source.status(), Some(404)),
        other => panic!("Expected source error, got {other:?}"),
    }
    assert!(fake.applied().is_empty());
}
