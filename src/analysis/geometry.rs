//! Transform math and axis-aligned box overlap.
//!
//! All lengths here are in metres, matching the Onshape API. Conversion to
//! inches happens only when building user-facing reports.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Inches per metre.
pub const METERS_TO_INCHES: f64 = 1.0 / 0.0254;

/// Metres per inch.
pub const INCHES_TO_METERS: f64 = 0.0254;

/// Minimum per-axis overlap (metres) that counts as a real intersection.
///
/// Boxes that merely touch produce an overlap of zero plus floating-point
/// noise; anything at or below this is treated as "not overlapping".
pub const OVERLAP_TOLERANCE: f64 = 1e-8;

/// A point or vector in 3D, `[x, y, z]`.
pub type Point3 = [f64; 3];

/// One of the three coordinate axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// The X axis.
    X,
    /// The Y axis.
    Y,
    /// The Z axis.
    Z,
}

impl Axis {
    /// All axes in X, Y, Z order.
    pub const ALL: [Self; 3] = [Self::X, Self::Y, Self::Z];

    /// Index of this axis into a [`Point3`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X => f.write_str("X"),
            Self::Y => f.write_str("Y"),
            Self::Z => f.write_str("Z"),
        }
    }
}

/// Axis-aligned bounding box.
///
/// Deserialises directly from the Onshape bounding-box response
/// (`lowX`, `lowY`, ... `highZ`). `low <= high` is expected on every axis but
/// is not enforced; see [`BoundingBox::is_inverted`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    /// Minimum X.
    pub low_x: f64,
    /// Minimum Y.
    pub low_y: f64,
    /// Minimum Z.
    pub low_z: f64,
    /// Maximum X.
    pub high_x: f64,
    /// Maximum Y.
    pub high_y: f64,
    /// Maximum Z.
    pub high_z: f64,
}

impl BoundingBox {
    /// Creates a box from its low and high corners.
    #[must_use]
    pub const fn new(low: Point3, high: Point3) -> Self {
        Self {
            low_x: low[0],
            low_y: low[1],
            low_z: low[2],
            high_x: high[0],
            high_y: high[1],
            high_z: high[2],
        }
    }

    /// The low corner.
    #[must_use]
    pub const fn low(&self) -> Point3 {
        [self.low_x, self.low_y, self.low_z]
    }

    /// The high corner.
    #[must_use]
    pub const fn high(&self) -> Point3 {
        [self.high_x, self.high_y, self.high_z]
    }

    /// Extent along each axis (`high - low`).
    #[must_use]
    pub fn size(&self) -> Point3 {
        [
            self.high_x - self.low_x,
            self.high_y - self.low_y,
            self.high_z - self.low_z,
        ]
    }

    /// All eight corners, every combination of low/high per axis.
    #[must_use]
    pub const fn corners(&self) -> [Point3; 8] {
        let (lx, ly, lz) = (self.low_x, self.low_y, self.low_z);
        let (hx, hy, hz) = (self.high_x, self.high_y, self.high_z);
        [
            [lx, ly, lz],
            [lx, ly, hz],
            [lx, hy, lz],
            [lx, hy, hz],
            [hx, ly, lz],
            [hx, ly, hz],
            [hx, hy, lz],
            [hx, hy, hz],
        ]
    }

    /// Returns `true` if `low > high` on any axis.
    #[must_use]
    pub fn is_inverted(&self) -> bool {
        self.low_x > self.high_x || self.low_y > self.high_y || self.low_z > self.high_z
    }
}

/// A 4x4 row-major homogeneous transform, stored flat as 16 values.
///
/// The last row is `[0, 0, 0, 1]` by convention; it is never read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transform(pub [f64; 16]);

impl Transform {
    /// The identity transform.
    pub const IDENTITY: Self = Self([
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]);

    /// Identity rotation with the given translation (metres).
    #[must_use]
    pub const fn translation(offset: Point3) -> Self {
        Self([
            1.0, 0.0, 0.0, offset[0], //
            0.0, 1.0, 0.0, offset[1], //
            0.0, 0.0, 1.0, offset[2], //
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    /// Rotation about X, then Y, then Z (radians), followed by `offset`
    /// (metres).
    ///
    /// The rotation block is `Rz · Ry · Rx`.
    #[must_use]
    pub fn from_translation_rotation(offset: Point3, rotation: Point3) -> Self {
        let (sx, cx) = rotation[0].sin_cos();
        let (sy, cy) = rotation[1].sin_cos();
        let (sz, cz) = rotation[2].sin_cos();

        Self([
            cz * cy,
            (cz * sy).mul_add(sx, -sz * cx),
            (cz * sy).mul_add(cx, sz * sx),
            offset[0],
            sz * cy,
            (sz * sy).mul_add(sx, cz * cx),
            (sz * sy).mul_add(cx, -cz * sx),
            offset[1],
            -sy,
            cy * sx,
            cy * cx,
            offset[2],
            0.0,
            0.0,
            0.0,
            1.0,
        ])
    }

    /// Identity rotation with the given translation in inches.
    #[must_use]
    pub fn translation_inches(offset: Point3) -> Self {
        Self::translation(offset.map(|v| v * INCHES_TO_METERS))
    }

    /// The translation component (elements 3, 7 and 11), in metres.
    #[must_use]
    pub const fn position(&self) -> Point3 {
        [self.0[3], self.0[7], self.0[11]]
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Applies a row-major affine transform to a point.
#[must_use]
pub fn transform_point(matrix: &Transform, point: Point3) -> Point3 {
    let m = &matrix.0;
    let [x, y, z] = point;
    [
        m[0].mul_add(x, m[1].mul_add(y, m[2].mul_add(z, m[3]))),
        m[4].mul_add(x, m[5].mul_add(y, m[6].mul_add(z, m[7]))),
        m[8].mul_add(x, m[9].mul_add(y, m[10].mul_add(z, m[11]))),
    ]
}

/// World-space AABB of `local` under `transform`.
///
/// Transforms all eight corners and takes the componentwise min/max. Exact
/// for translation-only transforms; for rotated parts the result encloses the
/// rotated box and is generally larger than it.
#[must_use]
pub fn world_aabb(local: &BoundingBox, transform: &Transform) -> BoundingBox {
    let mut low = [f64::INFINITY; 3];
    let mut high = [f64::NEG_INFINITY; 3];

    for corner in local.corners() {
        let p = transform_point(transform, corner);
        for axis in 0..3 {
            low[axis] = low[axis].min(p[axis]);
            high[axis] = high[axis].max(p[axis]);
        }
    }

    BoundingBox::new(low, high)
}

/// Per-axis overlap of two boxes, using [`OVERLAP_TOLERANCE`].
///
/// Returns `Some([dx, dy, dz])` (metres) only if the boxes overlap by more
/// than the tolerance on all three axes at once.
#[must_use]
pub fn check_overlap(a: &BoundingBox, b: &BoundingBox) -> Option<Point3> {
    check_overlap_with_tolerance(a, b, OVERLAP_TOLERANCE)
}

/// Like [`check_overlap`] with an explicit tolerance.
#[must_use]
pub fn check_overlap_with_tolerance(
    a: &BoundingBox,
    b: &BoundingBox,
    tolerance: f64,
) -> Option<Point3> {
    let overlap = [
        a.high_x.min(b.high_x) - a.low_x.max(b.low_x),
        a.high_y.min(b.high_y) - a.low_y.max(b.low_y),
        a.high_z.min(b.high_z) - a.low_z.max(b.low_z),
    ];

    overlap.iter().all(|&d| d > tolerance).then_some(overlap)
}

/// Converts a metre-valued point to inches.
#[must_use]
pub fn to_inches(value: Point3) -> Point3 {
    value.map(|v| v * METERS_TO_INCHES)
}
