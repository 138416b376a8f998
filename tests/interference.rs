//! Integration tests for the interference engine.
//!
//! These tests drive `check_interference` against an in-memory assembly and
//! check pair counting, skipping rules and the rendered report.

mod common;

use common::{assembly_path, at_inches, cube, inch_cube, FakeOnshape, DOC, PART_STUDIO, WORKSPACE};
use onshape_mcp::analysis::geometry::INCHES_TO_METERS;
use onshape_mcp::analysis::{
    check_interference, format_interference_result, AnalysisError, BoundingBox, Transform,
};
use serde_json::json;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

// =============================================================================
// Worked Examples
// =============================================================================

#[tokio::test]
async fn test_half_inch_overlap_along_x() {
    let fake = FakeOnshape::new()
        .part("a", "Block A", inch_cube(), Transform::IDENTITY)
        .part("b", "Block B", inch_cube(), at_inches(0.5, 0.0, 0.0));

    let result = check_interference(&fake, &fake, &assembly_path())
        .await
        .unwrap();

    assert_eq!(result.total_instances, 2);
    assert_eq!(result.total_pairs_checked, 1);
    assert_eq!(result.overlaps.len(), 1);

    let overlap = &result.overlaps[0];
    assert_eq!(overlap.instance_a_id, "a");
    assert_eq!(overlap.instance_b_id, "b");
    let [x, y, z] = overlap.penetration_inches;
    assert!(approx(x, 0.5));
    assert!(approx(y, 1.0));
    assert!(approx(z, 1.0));
    assert!(approx(overlap.volume_cubic_inches, 0.5));
}

#[tokio::test]
async fn test_separated_blocks_do_not_interfere() {
    let fake = FakeOnshape::new()
        .part("a", "Block A", inch_cube(), Transform::IDENTITY)
        .part("b", "Block B", inch_cube(), at_inches(2.0, 0.0, 0.0));

    let result = check_interference(&fake, &fake, &assembly_path())
        .await
        .unwrap();

    assert_eq!(result.total_pairs_checked, 1);
    assert!(result.overlaps.is_empty());
    assert!(result.warnings.is_empty());

    let report = format_interference_result(&result);
    assert!(report.contains("No overlaps detected"));
}

#[tokio::test]
async fn test_touching_blocks_do_not_interfere() {
    let fake = FakeOnshape::new()
        .part("a", "Left", inch_cube(), Transform::IDENTITY)
        .part("b", "Right", inch_cube(), at_inches(1.0, 0.0, 0.0));

    let result = check_interference(&fake, &fake, &assembly_path())
        .await
        .unwrap();

    assert_eq!(result.total_pairs_checked, 1);
    assert!(result.overlaps.is_empty());
}

#[tokio::test]
async fn test_contained_part_reports_its_full_extent() {
    let inner = BoundingBox::new([0.0; 3], [0.01, 0.02, 0.03]);
    let fake = FakeOnshape::new()
        .part("shell", "Shell", cube(0.1), Transform::IDENTITY)
        .part("core", "Core", inner, Transform::translation([0.02, 0.02, 0.02]));

    let result = check_interference(&fake, &fake, &assembly_path())
        .await
        .unwrap();

    assert_eq!(result.overlaps.len(), 1);
    let [x, y, z] = result.overlaps[0].penetration_inches;
    assert!(approx(x, 0.01 / INCHES_TO_METERS));
    assert!(approx(y, 0.02 / INCHES_TO_METERS));
    assert!(approx(z, 0.03 / INCHES_TO_METERS));
}

// =============================================================================
// Pair Counting and Filtering
// =============================================================================

#[tokio::test]
async fn test_every_unordered_pair_is_checked() {
    let fake = FakeOnshape::new()
        .part("a", "A", inch_cube(), at_inches(0.0, 0.0, 0.0))
        .part("b", "B", inch_cube(), at_inches(5.0, 0.0, 0.0))
        .part("c", "C", inch_cube(), at_inches(10.0, 0.0, 0.0))
        .part("d", "D", inch_cube(), at_inches(10.5, 0.0, 0.0));

    let result = check_interference(&fake, &fake, &assembly_path())
        .await
        .unwrap();

    assert_eq!(result.total_instances, 4);
    assert_eq!(result.total_pairs_checked, 6);
    assert_eq!(result.overlaps.len(), 1);
    assert_eq!(result.overlaps[0].instance_a_name, "C");
    assert_eq!(result.overlaps[0].instance_b_name, "D");
}

#[tokio::test]
async fn test_suppressed_and_non_part_instances_are_excluded() {
    let fake = FakeOnshape::new()
        .part("a", "Active", inch_cube(), Transform::IDENTITY)
        .raw_instance(json!({
            "id": "s", "name": "Suppressed", "type": "Part", "suppressed": true,
            "elementId": PART_STUDIO, "partId": "part-s"
        }))
        .raw_instance(json!({"id": "sub", "name": "Sub", "type": "Assembly"}))
        .bounding_box("part-s", inch_cube());

    let result = check_interference(&fake, &fake, &assembly_path())
        .await
        .unwrap();

    assert_eq!(result.total_instances, 1);
    assert_eq!(result.total_pairs_checked, 0);
    assert!(result.overlaps.is_empty());
    assert_eq!(fake.bbox_fetches(), 1);
    assert!(result
        .warnings
        .contains(&"Fewer than 2 active part instances could be checked.".to_string()));
}

#[tokio::test]
async fn test_fewer_than_two_instances_short_circuits() {
    let fake = FakeOnshape::new().part("a", "Only", inch_cube(), Transform::IDENTITY);

    let result = check_interference(&fake, &fake, &assembly_path())
        .await
        .unwrap();

    assert_eq!(result.total_instances, 1);
    assert_eq!(result.total_pairs_checked, 0);
    assert_eq!(
        result.warnings,
        ["Need at least 2 instances for interference check."]
    );
    assert_eq!(fake.bbox_fetches(), 0);

    let report = format_interference_result(&result);
    assert!(report.contains("Warning: Need at least 2 instances"));
}

#[tokio::test]
async fn test_shared_part_is_fetched_once() {
    let fake = FakeOnshape::new()
        .instance_of("a", "Bolt 1", "bolt", inch_cube(), at_inches(0.0, 0.0, 0.0))
        .instance_of("b", "Bolt 2", "bolt", inch_cube(), at_inches(3.0, 0.0, 0.0))
        .instance_of("c", "Bolt 3", "bolt", inch_cube(), at_inches(6.0, 0.0, 0.0));

    let result = check_interference(&fake, &fake, &assembly_path())
        .await
        .unwrap();

    assert_eq!(result.total_instances, 3);
    assert_eq!(result.total_pairs_checked, 3);
    assert_eq!(fake.bbox_fetches(), 1);
}

#[tokio::test]
async fn test_bounding_box_requests_use_assembly_workspace_and_document() {
    let fake = FakeOnshape::new()
        .part("a", "Local", inch_cube(), Transform::IDENTITY)
        .raw_instance(json!({
            "id": "x", "name": "Linked", "type": "Part",
            "documentId": "other-doc", "elementId": "other-ps", "partId": "linked"
        }))
        .bounding_box("linked", inch_cube());

    check_interference(&fake, &fake, &assembly_path())
        .await
        .unwrap();

    let requests = fake.bbox_requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0], [DOC, WORKSPACE, PART_STUDIO, "part-a"]);
    assert_eq!(requests[1], ["other-doc", WORKSPACE, "other-ps", "linked"]);
}

#[tokio::test]
async fn test_missing_transform_means_identity() {
    // "x" has no occurrence, so it sits at the origin on top of "a".
    let fake = FakeOnshape::new()
        .part("a", "Placed", inch_cube(), Transform::IDENTITY)
        .raw_instance(json!({
            "id": "x", "name": "Unplaced", "type": "Part",
            "elementId": PART_STUDIO, "partId": "loose"
        }))
        .bounding_box("loose", inch_cube());

    let result = check_interference(&fake, &fake, &assembly_path())
        .await
        .unwrap();

    assert_eq!(result.overlaps.len(), 1);
    assert!(approx(result.overlaps[0].volume_cubic_inches, 1.0));
}

#[tokio::test]
async fn test_nested_occurrences_are_ignored() {
    // The nested path would move "b" away; only its top-level placement counts.
    let fake = FakeOnshape::new()
        .part("a", "A", inch_cube(), Transform::IDENTITY)
        .part("b", "B", inch_cube(), at_inches(0.25, 0.0, 0.0))
        .raw_occurrence(json!({"path": ["b", "inner"], "transform": at_inches(50.0, 0.0, 0.0)}));

    let result = check_interference(&fake, &fake, &assembly_path())
        .await
        .unwrap();

    assert_eq!(result.overlaps.len(), 1);
    assert!(approx(result.overlaps[0].penetration_inches[0], 0.75));
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_failed_fetch_skips_instance_with_warning() {
    let fake = FakeOnshape::new()
        .part("a", "A", inch_cube(), Transform::IDENTITY)
        .part("b", "B", inch_cube(), at_inches(0.5, 0.0, 0.0))
        .part("c", "Broken", inch_cube(), Transform::IDENTITY)
        .failing_part("part-c");

    let result = check_interference(&fake, &fake, &assembly_path())
        .await
        .unwrap();

    assert_eq!(result.total_instances, 2);
    assert_eq!(result.total_pairs_checked, 1);
    assert_eq!(result.overlaps.len(), 1);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].starts_with("Skipped \"Broken\""));
    assert!(result.warnings[0].contains("404"));
}

#[tokio::test]
async fn test_assembly_fetch_failure_is_fatal() {
    let fake = FakeOnshape::new()
        .part("a", "A", inch_cube(), Transform::IDENTITY)
        .assembly_fails(403);

    let err = check_interference(&fake, &fake, &assembly_path())
        .await
        .unwrap_err();

    match err {
        AnalysisError::Source(source) => assert_eq!(source.status(), Some(403)),
        other => panic!("Expected source error, got {other:?}"),
    }
    assert_eq!(fake.bbox_fetches(), 0);
}

#[tokio::test]
async fn test_part_without_part_id_is_malformed() {
    let fake = FakeOnshape::new()
        .part("a", "A", inch_cube(), Transform::IDENTITY)
        .raw_instance(json!({"id": "bad", "name": "Bad", "type": "Part", "elementId": PART_STUDIO}));

    let err = check_interference(&fake, &fake, &assembly_path())
        .await
        .unwrap_err();

    assert!(matches!(err, AnalysisError::MalformedAssembly { .. }));
    assert!(err.to_string().contains("partId"));
}

// =============================================================================
// Report
// =============================================================================

#[tokio::test]
async fn test_report_suggests_smallest_axis() {
    let fake = FakeOnshape::new()
        .part("a", "Base", inch_cube(), Transform::IDENTITY)
        .part("b", "Lid", inch_cube(), at_inches(0.5, 0.75, 0.0));

    let result = check_interference(&fake, &fake, &assembly_path())
        .await
        .unwrap();
    let report = format_interference_result(&result);

    assert!(report.contains("FOUND 1 OVERLAP(S):"));
    assert!(report.contains("Overlap 1: \"Base\" and \"Lid\""));
    assert!(report.contains("Penetration: X=0.500\", Y=0.250\", Z=1.000\""));
    assert!(report.contains("Overlap volume: 0.125 cubic inches"));
    assert!(report.contains("Suggestion: Move one part 0.250\" along Y to resolve"));
    assert!(report.contains("may report false positives"));
}

#[test]
fn test_rotated_part_reports_conservative_overlap() {
    // A 45 degree rotation about Z widens the AABB. The neighbour clears the
    // rotated outline but not its enclosing box.
    let c = std::f64::consts::FRAC_1_SQRT_2;
    let rotated = Transform([
        c, -c, 0.0, 0.0, //
        c, c, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]);
    let fake = FakeOnshape::new()
        .part("a", "Rotated", cube(0.1), rotated)
        .part("b", "Neighbour", cube(0.1), Transform::translation([0.05, 0.12, 0.0]));

    let result = tokio_test::block_on(check_interference(&fake, &fake, &assembly_path())).unwrap();

    assert_eq!(result.overlaps.len(), 1);
    let [x, y, _] = result.overlaps[0].penetration_inches;
    assert!(approx(x, (0.1 * std::f64::consts::FRAC_1_SQRT_2 - 0.05) / INCHES_TO_METERS));
    assert!(approx(y, (0.1 * std::f64::consts::SQRT_2 - 0.12) / INCHES_TO_METERS));
}
