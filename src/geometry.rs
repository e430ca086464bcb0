use std::{
    fmt,
    ops::{Add, Div, Mul, Sub},
};

pub type Scalar = f64;
pub const EPSILON: f64 = f64::EPSILON;
pub const PI: f64 = std::f64::consts::PI;

/// Sine/cosine values closer to zero than this are snapped to exactly zero
/// when building rotations, so `rotate(90)` produces a clean quarter turn
/// instead of long-tail floating noise from trigonometric evaluation.
const TRIG_EPSILON: Scalar = 1e-16;

/// Format floats in a compact way
pub fn scalar_fmt(f: &mut fmt::Formatter<'_>, value: Scalar) -> fmt::Result {
    let value_abs = value.abs();
    if value_abs.fract() < EPSILON {
        write!(f, "{}", value.trunc() as i64)
    } else if value_abs > 9999.0 || value_abs <= 0.0001 {
        write!(f, "{:.3e}", value)
    } else {
        let ten: Scalar = 10.0;
        let round = ten.powi(6 - (value_abs.trunc() + 1.0).log10().ceil() as i32);
        write!(f, "{}", (value * round).round() / round)
    }
}

/// Value representing a 2D point or vector.
#[derive(Clone, Copy, PartialEq, Default)]
pub struct Point(pub [Scalar; 2]);

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Point([x, y]) = self;
        scalar_fmt(f, *x)?;
        write!(f, ",")?;
        scalar_fmt(f, *y)?;
        Ok(())
    }
}

impl Point {
    #[inline]
    pub fn new(x: Scalar, y: Scalar) -> Self {
        Self([x, y])
    }

    /// Get `x` component of the point
    #[inline]
    pub fn x(&self) -> Scalar {
        self.0[0]
    }

    /// Get `y` component of the point
    #[inline]
    pub fn y(self) -> Scalar {
        self.0[1]
    }

    /// Squared distance between two points
    pub fn dist_squared(self, other: Self) -> Scalar {
        let Self([x0, y0]) = self;
        let Self([x1, y1]) = other;
        let (dx, dy) = (x0 - x1, y0 - y1);
        dx * dx + dy * dy
    }

    /// Both coordinates are finite (not NaN and not infinite)
    pub fn is_finite(self) -> bool {
        let Self([x, y]) = self;
        x.is_finite() && y.is_finite()
    }

    /// Determine if self is close to the other within the margin of error (EPSILON)
    pub fn is_close_to(self, other: Point) -> bool {
        let Self([x0, y0]) = self;
        let Self([x1, y1]) = other;
        (x0 - x1).abs() < EPSILON && (y0 - y1).abs() < EPSILON
    }
}

impl From<(Scalar, Scalar)> for Point {
    #[inline]
    fn from(xy: (Scalar, Scalar)) -> Self {
        Self([xy.0, xy.1])
    }
}

impl Mul<Point> for Scalar {
    type Output = Point;

    #[inline]
    fn mul(self, other: Point) -> Self::Output {
        let Point([x, y]) = other;
        Point([self * x, self * y])
    }
}

impl Div<Scalar> for Point {
    type Output = Point;

    #[inline]
    fn div(self, rhs: Scalar) -> Self::Output {
        let Point([x, y]) = self;
        Point([x / rhs, y / rhs])
    }
}

impl Add for Point {
    type Output = Point;

    #[inline]
    fn add(self, other: Point) -> Self::Output {
        let Point([x0, y0]) = self;
        let Point([x1, y1]) = other;
        Point([x0 + x1, y0 + y1])
    }
}

impl Sub for Point {
    type Output = Point;

    #[inline]
    fn sub(self, other: Point) -> Self::Output {
        let Point([x0, y0]) = self;
        let Point([x1, y1]) = other;
        Point([x0 - x1, y0 - y1])
    }
}

impl Mul for Point {
    type Output = Point;

    #[inline]
    fn mul(self, other: Point) -> Self::Output {
        let Point([x0, y0]) = self;
        let Point([x1, y1]) = other;
        Point([x0 * x1, y0 * y1])
    }
}

/// 2D affine transformation
///
/// Stored as an array [m00, m01, m02, m10, m11, m12] but semantically corresponds to
/// a matrix:
/// ┌             ┐
/// │ m00 m01 m02 │
/// │ m10 m11 m12 │
/// │   0   0   1 │
/// └             ┘
///
/// In the SVG notation `matrix(a b c d e f)` this is (a, c, e, b, d, f).
#[derive(Clone, Copy, PartialEq)]
pub struct Transform([Scalar; 6]);

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self([m00, m01, m02, m10, m11, m12]) = self;
        write!(f, "matrix(")?;
        for (index, value) in [m00, m10, m01, m11, m02, m12].iter().enumerate() {
            if index != 0 {
                write!(f, " ")?;
            }
            scalar_fmt(f, **value)?;
        }
        write!(f, ")")
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn new(
        m00: Scalar,
        m01: Scalar,
        m02: Scalar,
        m10: Scalar,
        m11: Scalar,
        m12: Scalar,
    ) -> Self {
        Self([m00, m01, m02, m10, m11, m12])
    }

    pub fn identity() -> Self {
        Self([1.0, 0.0, 0.0, 0.0, 1.0, 0.0])
    }

    /// Construct translation transformation
    pub fn new_translate(tx: Scalar, ty: Scalar) -> Self {
        Self([1.0, 0.0, tx, 0.0, 1.0, ty])
    }

    /// Construct scale transformation
    pub fn new_scale(sx: Scalar, sy: Scalar) -> Self {
        Self([sx, 0.0, 0.0, 0.0, sy, 0.0])
    }

    /// Construct rotation around the origin, angle in radians
    pub fn new_rotate(a: Scalar) -> Self {
        let (mut sin, mut cos) = a.sin_cos();
        if cos.abs() < TRIG_EPSILON {
            cos = 0.0;
        }
        if sin.abs() < TRIG_EPSILON {
            sin = 0.0;
        }
        Self([cos, -sin, 0.0, sin, cos, 0.0])
    }

    /// Construct rotation around the point `p`, angle in radians
    pub fn new_rotate_around(a: Scalar, p: impl Into<Point>) -> Self {
        let p = p.into();
        Transform::new_translate(p.x(), p.y())
            * Transform::new_rotate(a)
            * Transform::new_translate(-p.x(), -p.y())
    }

    /// Construct horizontal shear, angle in radians
    pub fn new_skew_x(a: Scalar) -> Self {
        Self([1.0, a.tan(), 0.0, 0.0, 1.0, 0.0])
    }

    /// Construct vertical shear, angle in radians
    pub fn new_skew_y(a: Scalar) -> Self {
        Self([1.0, 0.0, 0.0, a.tan(), 1.0, 0.0])
    }

    /// Apply this transformation to a point
    pub fn apply(&self, point: Point) -> Point {
        let Self([m00, m01, m02, m10, m11, m12]) = self;
        let Point([x, y]) = point;
        Point([x * m00 + y * m01 + m02, x * m10 + y * m11 + m12])
    }

    /// Multiply transformations in matrix form
    ///
    /// `self.matmul(other)` applied to a point first applies `other` then
    /// `self`, so folding a transform list left-to-right with
    /// `tr = tr.matmul(next)` preserves source order.
    pub fn matmul(&self, other: Transform) -> Self {
        let Self([s00, s01, s02, s10, s11, s12]) = self;
        let Self([o00, o01, o02, o10, o11, o12]) = other;

        // s00, s01, s02 | o00, o01, o02
        // s10, s11, s12 | o10, o11, o12
        // 0  , 0  , 1   | 0  , 0  , 1
        Self([
            s00 * o00 + s01 * o10,
            s00 * o01 + s01 * o11,
            s00 * o02 + s01 * o12 + s02,
            s10 * o00 + s11 * o10,
            s10 * o01 + s11 * o11,
            s10 * o02 + s11 * o12 + s12,
        ])
    }
}

impl Mul<Transform> for Transform {
    type Output = Transform;

    fn mul(self, other: Transform) -> Self::Output {
        self.matmul(other)
    }
}

/// Bounding box with sides directed along the axes
#[derive(Clone, Copy)]
pub struct BBox {
    /// Point with minimal x and y values
    min: Point,
    /// Point with maximum x and y values
    max: Point,
}

impl BBox {
    /// Construct bounding box which includes points `p0` and `p1`
    pub fn new(p0: impl Into<Point>, p1: impl Into<Point>) -> Self {
        let Point([x0, y0]) = p0.into();
        let Point([x1, y1]) = p1.into();
        let (x0, x1) = if x0 <= x1 { (x0, x1) } else { (x1, x0) };
        let (y0, y1) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
        Self {
            min: Point([x0, y0]),
            max: Point([x1, y1]),
        }
    }

    /// Point with minimum values of x and y coordinates
    #[inline]
    pub fn min(&self) -> Point {
        self.min
    }

    /// Point with maximum values of x and y coordinates
    #[inline]
    pub fn max(&self) -> Point {
        self.max
    }

    /// `x` coordinate of the point with the minimal value
    #[inline]
    pub fn x(&self) -> Scalar {
        self.min.x()
    }

    /// `y` coordinate of the point with the minimal value
    #[inline]
    pub fn y(&self) -> Scalar {
        self.min.y()
    }

    /// Width of the bounding box
    #[inline]
    pub fn width(&self) -> Scalar {
        self.max.x() - self.min.x()
    }

    /// Height of the bounding box
    #[inline]
    pub fn height(&self) -> Scalar {
        self.max.y() - self.min.y()
    }

    /// Determine if the point is inside of the bounding box
    pub fn contains(&self, point: Point) -> bool {
        let Point([x, y]) = point;
        self.min.x() <= x && x <= self.max.x() && self.min.y() <= y && y <= self.max.y()
    }

    /// Extend bounding box so it would contain the provided point
    pub fn extend(&self, point: Point) -> Self {
        let Point([x, y]) = point;
        let Point([x0, y0]) = self.min;
        let Point([x1, y1]) = self.max;
        let (x0, x1) = if x < x0 {
            (x, x1)
        } else if x > x1 {
            (x0, x)
        } else {
            (x0, x1)
        };
        let (y0, y1) = if y < y0 {
            (y, y1)
        } else if y > y1 {
            (y0, y)
        } else {
            (y0, y1)
        };
        Self {
            min: Point([x0, y0]),
            max: Point([x1, y1]),
        }
    }

    /// Extend optional bounding box, `None` is treated as an empty box
    pub fn extend_opt(bbox: Option<BBox>, point: Point) -> Self {
        match bbox {
            None => BBox::new(point, point),
            Some(bbox) => bbox.extend(point),
        }
    }
}

impl fmt::Debug for BBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BBox x=")?;
        scalar_fmt(f, self.x())?;
        write!(f, ", y=")?;
        scalar_fmt(f, self.y())?;
        write!(f, ", w=")?;
        scalar_fmt(f, self.width())?;
        write!(f, ", h=")?;
        scalar_fmt(f, self.height())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_approx_eq;

    #[test]
    fn test_transform() {
        let tr = Transform::new_translate(1.0, 2.0)
            * Transform::new_rotate(PI / 3.0)
            * Transform::new_skew_x(0.3)
            * Transform::new_scale(3.0, 2.0);
        let p0 = Point::new(1.0, 1.0);
        let p1 = tr.apply(p0);
        // composed transform applies the right-most factor first
        let q = Transform::new_translate(1.0, 2.0).apply(
            Transform::new_rotate(PI / 3.0).apply(
                Transform::new_skew_x(0.3).apply(Transform::new_scale(3.0, 2.0).apply(p0)),
            ),
        );
        assert_approx_eq!(p1.x(), q.x(), 1e-12);
        assert_approx_eq!(p1.y(), q.y(), 1e-12);
    }

    #[test]
    fn test_rotate_snap() {
        let tr = Transform::new_rotate(PI / 2.0);
        let p = tr.apply(Point::new(1.0, 0.0));
        // cos(pi/2) is not exactly zero in f64, the snap makes it so
        assert_eq!(p.x(), 0.0);
        assert_eq!(p.y(), 1.0);
    }

    #[test]
    fn test_rotate_around() {
        let tr = Transform::new_rotate_around(PI, (1.0, 1.0));
        let p = tr.apply(Point::new(2.0, 1.0));
        assert_approx_eq!(p.x(), 0.0, 1e-12);
        assert_approx_eq!(p.y(), 1.0, 1e-12);
    }

    #[test]
    fn test_bbox() {
        let bbox = BBox::new(Point::new(1.0, 3.0), Point::new(2.0, 0.0));
        assert_approx_eq!(bbox.x(), 1.0);
        assert_approx_eq!(bbox.y(), 0.0);
        assert_approx_eq!(bbox.width(), 1.0);
        assert_approx_eq!(bbox.height(), 3.0);

        let bbox = bbox.extend(Point::new(-1.0, 4.0));
        assert!(bbox.contains(Point::new(0.0, 3.5)));
        assert!(!bbox.contains(Point::new(3.0, 3.5)));
    }
}
