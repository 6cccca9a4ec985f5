//! Geometric types and matrix routines shared across the core.

use crate::error::PsError;

/// A 2D point (x, y).
pub type Point = (f64, f64);

/// A rectangle defined by (x0, y0, x1, y1) with (x0, y0) the lower-left
/// and (x1, y1) the upper-right corner.
pub type Rect = (f64, f64, f64, f64);

/// A 6-element affine transformation matrix (a, b, c, d, e, f).
/// Transforms point (x, y) to (ax + cy + e, bx + dy + f).
pub type Matrix = (f64, f64, f64, f64, f64, f64);

/// Identity transformation matrix.
pub const MATRIX_IDENTITY: Matrix = (1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

/// Small epsilon for floating-point comparisons.
pub const EPSILON: f64 = 1e-9;

/// Compares two floats for approximate equality.
#[inline]
pub fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

/// Multiplies two matrices: result = m1 * m0.
/// This applies m0 first, then m1.
pub fn mult_matrix(m1: Matrix, m0: Matrix) -> Matrix {
    let (a1, b1, c1, d1, e1, f1) = m1;
    let (a0, b0, c0, d0, e0, f0) = m0;
    (
        a0 * a1 + c0 * b1,
        b0 * a1 + d0 * b1,
        a0 * c1 + c0 * d1,
        b0 * c1 + d0 * d1,
        a0 * e1 + c0 * f1 + e0,
        b0 * e1 + d0 * f1 + f0,
    )
}

/// Translation matrix for (tx, ty).
pub const fn translation_matrix(tx: f64, ty: f64) -> Matrix {
    (1.0, 0.0, 0.0, 1.0, tx, ty)
}

/// Scaling matrix for (sx, sy).
pub const fn scaling_matrix(sx: f64, sy: f64) -> Matrix {
    (sx, 0.0, 0.0, sy, 0.0, 0.0)
}

/// Rotation matrix for an angle in degrees, counter-clockwise.
pub fn rotation_matrix(degrees: f64) -> Matrix {
    let rad = degrees.to_radians();
    let (sin, cos) = rad.sin_cos();
    (cos, sin, -sin, cos, 0.0, 0.0)
}

/// Applies a matrix to a point.
pub fn apply_matrix_pt(m: Matrix, v: Point) -> Point {
    let (a, b, c, d, e, f) = m;
    let (x, y) = v;
    (a * x + c * y + e, b * x + d * y + f)
}

/// Applies a matrix to a distance vector, ignoring translation.
pub fn apply_matrix_norm(m: Matrix, v: Point) -> Point {
    let (a, b, c, d, _, _) = m;
    let (x, y) = v;
    (a * x + c * y, b * x + d * y)
}

/// Inverts an affine matrix.
///
/// A singular matrix has no inverse; PostScript reports that condition as
/// undefinedresult.
pub fn invert_matrix(m: Matrix) -> Result<Matrix, PsError> {
    let (a, b, c, d, e, f) = m;
    let det = a * d - b * c;
    if det.abs() < EPSILON {
        return Err(PsError::UndefinedResult);
    }
    let ia = d / det;
    let ib = -b / det;
    let ic = -c / det;
    let id = a / det;
    Ok((
        ia,
        ib,
        ic,
        id,
        -(e * ia + f * ic),
        -(e * ib + f * id),
    ))
}

/// Applies the inverse of a matrix to a point.
pub fn itransform_pt(m: Matrix, v: Point) -> Result<Point, PsError> {
    Ok(apply_matrix_pt(invert_matrix(m)?, v))
}
