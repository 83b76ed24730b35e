// Engine-independent vector math and oriented-box overlap tests.
//
// The world is Y-up with vehicles rotating only around Y, so boxes carry a yaw
// rather than a full rotation. Forward is +Z at yaw 0.

use std::f32::consts::PI;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// Squared length below which a candidate SAT axis is treated as degenerate.
pub const DEGENERATE_AXIS_SQ: f32 = 1e-5;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);
    pub const X: Vec3 = Vec3::new(1.0, 0.0, 0.0);
    pub const Y: Vec3 = Vec3::new(0.0, 1.0, 0.0);
    pub const Z: Vec3 = Vec3::new(0.0, 0.0, 1.0);

    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Planar (XZ) vector with no vertical component.
    #[inline]
    pub const fn planar(x: f32, z: f32) -> Self {
        Self { x, y: 0.0, z }
    }

    #[inline]
    pub fn dot(self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[inline]
    pub fn cross(self, other: Vec3) -> Vec3 {
        Vec3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    #[inline]
    pub fn length_sq(self) -> f32 {
        self.dot(self)
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.length_sq().sqrt()
    }

    /// Length ignoring the vertical component.
    #[inline]
    pub fn planar_length(self) -> f32 {
        (self.x * self.x + self.z * self.z).sqrt()
    }

    /// Returns the unit vector, or `None` when the vector is too short to have
    /// a meaningful direction.
    pub fn try_normalize(self, min_length_sq: f32) -> Option<Vec3> {
        let len_sq = self.length_sq();
        if len_sq <= min_length_sq {
            return None;
        }
        Some(self * (1.0 / len_sq.sqrt()))
    }

    #[inline]
    pub fn with_y(self, y: f32) -> Vec3 {
        Vec3 { y, ..self }
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Vec3) {
        *self = *self + rhs;
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl SubAssign for Vec3 {
    fn sub_assign(&mut self, rhs: Vec3) {
        *self = *self - rhs;
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;
    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vec3 {
    type Output = Vec3;
    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

/// World-space forward direction for a yaw angle.
#[inline]
pub fn forward_from_heading(heading: f32) -> Vec3 {
    Vec3::planar(heading.sin(), heading.cos())
}

/// Wraps an angle into (-PI, PI].
pub fn wrap_angle(angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    let mut a = angle.rem_euclid(2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    }
    // rem_euclid can land exactly on -PI after the subtraction due to rounding.
    if a <= -PI {
        a += 2.0 * PI;
    }
    a
}

/// Closed interval produced by projecting a vertex set onto an axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f32,
    pub max: f32,
}

impl Interval {
    #[inline]
    pub fn overlaps(self, other: Interval) -> bool {
        !(self.max < other.min || other.max < self.min)
    }
}

/// Box with local half extents, placed in the world by a translation and a yaw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obb {
    pub center: Vec3,
    pub half_extents: Vec3,
    /// World-space local X, Y, Z axes (unit length).
    pub axes: [Vec3; 3],
}

impl Obb {
    pub fn new(center: Vec3, half_extents: Vec3, yaw: f32) -> Self {
        let (sin, cos) = yaw.sin_cos();
        Self {
            center,
            half_extents,
            axes: [Vec3::new(cos, 0.0, -sin), Vec3::Y, Vec3::new(sin, 0.0, cos)],
        }
    }

    /// Box aligned with the world basis (walls).
    pub fn axis_aligned(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            center,
            half_extents,
            axes: [Vec3::X, Vec3::Y, Vec3::Z],
        }
    }

    /// Places a box given in this box's local frame into world space.
    pub fn child(&self, local_offset: Vec3, half_extents: Vec3) -> Obb {
        let [ax, ay, az] = self.axes;
        Obb {
            center: self.center + ax * local_offset.x + ay * local_offset.y + az * local_offset.z,
            half_extents,
            axes: self.axes,
        }
    }

    pub fn vertices(&self) -> [Vec3; 8] {
        let [ax, ay, az] = self.axes;
        let ex = ax * self.half_extents.x;
        let ey = ay * self.half_extents.y;
        let ez = az * self.half_extents.z;
        let c = self.center;
        [
            c - ex - ey - ez,
            c + ex - ey - ez,
            c - ex + ey - ez,
            c - ex - ey + ez,
            c + ex + ey - ez,
            c + ex - ey + ez,
            c - ex + ey + ez,
            c + ex + ey + ez,
        ]
    }

    pub fn project(&self, axis: Vec3) -> Interval {
        project_vertices(&self.vertices(), axis)
    }
}

pub fn project_vertices(vertices: &[Vec3], axis: Vec3) -> Interval {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for v in vertices {
        let p = v.dot(axis);
        min = min.min(p);
        max = max.max(p);
    }
    Interval { min, max }
}

/// Separating-axis test between two oriented boxes.
///
/// Candidate axes are the three face normals of each box plus the nine edge
/// cross products; cross products of (near-)parallel edges are discarded.
/// Returns `true` when no axis separates the boxes.
pub fn obb_intersects(a: &Obb, b: &Obb) -> bool {
    let va = a.vertices();
    let vb = b.vertices();

    let separated_on =
        |axis: Vec3| !project_vertices(&va, axis).overlaps(project_vertices(&vb, axis));

    for axis in a.axes.iter().chain(b.axes.iter()) {
        if separated_on(*axis) {
            return false;
        }
    }

    for ea in a.axes {
        for eb in b.axes {
            let Some(axis) = ea.cross(eb).try_normalize(DEGENERATE_AXIS_SQ) else {
                continue;
            };
            if separated_on(axis) {
                return false;
            }
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn cube(center: Vec3, yaw: f32) -> Obb {
        Obb::new(center, Vec3::new(0.4, 0.4, 0.4), yaw)
    }

    #[test]
    fn when_axis_aligned_boxes_overlap_then_intersects() {
        let a = cube(Vec3::ZERO, 0.0);
        let b = cube(Vec3::new(0.5, 0.0, 0.0), 0.0);
        assert!(obb_intersects(&a, &b));
    }

    #[test]
    fn when_axis_aligned_boxes_are_apart_then_no_intersection() {
        let a = cube(Vec3::ZERO, 0.0);
        let b = cube(Vec3::new(2.0, 0.0, 0.0), 0.0);
        assert!(!obb_intersects(&a, &b));
    }

    #[test]
    fn when_boxes_are_parallel_then_degenerate_axes_do_not_mask_a_gap() {
        // Every cross product of identical axis sets is zero or a duplicate.
        let a = cube(Vec3::ZERO, 0.7);
        let b = cube(Vec3::new(0.0, 0.0, 1.5), 0.7);
        assert!(!obb_intersects(&a, &b));
    }

    #[test]
    fn when_rotated_corner_clears_a_face_then_no_intersection() {
        // A diamond next to a square: the AABBs overlap, the boxes do not.
        let a = Obb::axis_aligned(Vec3::ZERO, Vec3::new(0.5, 0.5, 0.5));
        let b = Obb::new(Vec3::new(1.15, 0.0, 1.15), Vec3::new(0.5, 0.5, 0.5), PI / 4.0);
        assert!(!obb_intersects(&a, &b));

        let c = Obb::new(Vec3::new(0.7, 0.0, 0.7), Vec3::new(0.5, 0.5, 0.5), PI / 4.0);
        assert!(obb_intersects(&a, &c));
    }

    #[test]
    fn when_arguments_are_swapped_then_result_is_unchanged() {
        let yaws = [0.0, 0.3, PI / 4.0, 1.2, PI / 2.0, -2.5];
        let offsets = [
            Vec3::new(0.5, 0.0, 0.0),
            Vec3::new(0.7, 0.0, 0.6),
            Vec3::new(1.1, 0.0, 0.0),
            Vec3::new(0.0, 0.9, 0.0),
            Vec3::new(-0.6, 0.1, 0.8),
        ];
        for &ya in &yaws {
            for &yb in &yaws {
                for &offset in &offsets {
                    let a = Obb::new(Vec3::ZERO, Vec3::new(0.35, 0.3, 0.75), ya);
                    let b = Obb::new(offset, Vec3::new(0.35, 0.3, 0.75), yb);
                    assert_eq!(obb_intersects(&a, &b), obb_intersects(&b, &a));
                }
            }
        }
    }

    #[test]
    fn when_child_box_is_offset_forward_then_it_follows_the_yaw() {
        let parent = Obb::new(Vec3::new(1.0, 0.3, 1.0), Vec3::new(0.35, 0.3, 0.75), PI / 2.0);
        let child = parent.child(Vec3::new(0.0, 0.0, 0.5), Vec3::new(0.1, 0.1, 0.1));
        assert_approx_eq!(child.center.x, 1.5, 1e-5);
        assert_approx_eq!(child.center.z, 1.0, 1e-5);
    }

    #[test]
    fn when_angle_wraps_then_it_lands_in_canonical_range() {
        assert_approx_eq!(wrap_angle(3.0 * PI), PI, 1e-5);
        assert_approx_eq!(wrap_angle(-PI), PI, 1e-5);
        assert_approx_eq!(wrap_angle(2.0 * PI + 0.25), 0.25, 1e-5);
        assert_approx_eq!(wrap_angle(-0.25), -0.25, 1e-6);
        for i in -40..40 {
            let a = wrap_angle(i as f32 * 0.77);
            assert!(a > -PI && a <= PI, "angle {a} out of range");
        }
    }

    #[test]
    fn when_vector_is_tiny_then_normalize_refuses() {
        assert!(Vec3::new(1e-4, 0.0, 0.0).try_normalize(DEGENERATE_AXIS_SQ).is_none());
        let n = Vec3::new(3.0, 0.0, 4.0)
            .try_normalize(DEGENERATE_AXIS_SQ)
            .expect("non-degenerate");
        assert_approx_eq!(n.length(), 1.0, 1e-6);
    }
}
