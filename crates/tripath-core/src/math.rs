//! Minimal 2D/3D vector math and the planar projection used by the navmesh.

use core::ops::{Add, Div, Mul, Neg, Sub};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self::new(0.0, 0.0);

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn dot(self, rhs: Self) -> f32 {
        self.x * rhs.x + self.y * rhs.y
    }

    /// Z component of the 3D cross product of `(self, 0)` and `(rhs, 0)`.
    ///
    /// Positive when `rhs` lies counter-clockwise of `self`.
    pub fn perp_dot(self, rhs: Self) -> f32 {
        self.x * rhs.y - self.y * rhs.x
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    pub fn distance(self, rhs: Self) -> f32 {
        (self - rhs).length()
    }

    pub fn distance_squared(self, rhs: Self) -> f32 {
        let d = self - rhs;
        d.dot(d)
    }
}

impl Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f32> for Vec2 {
    type Output = Self;

    fn div(self, rhs: f32) -> Self {
        Self::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Vec2 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, rhs: Self) -> f32 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    pub fn cross(self, rhs: Self) -> Self {
        Self::new(
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        )
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    pub fn distance(self, rhs: Self) -> f32 {
        self.distance_squared(rhs).sqrt()
    }

    /// Squared distance, accumulated in f64 so large coordinates don't lose the small terms.
    pub fn distance_squared(self, rhs: Self) -> f32 {
        let dx = f64::from(self.x - rhs.x);
        let dy = f64::from(self.y - rhs.y);
        let dz = f64::from(self.z - rhs.z);
        (dx * dx + dy * dy + dz * dz) as f32
    }

    pub fn normalize_or_zero(self) -> Self {
        let len = self.length();
        if len.is_finite() && len > f32::EPSILON {
            self / len
        } else {
            Self::ZERO
        }
    }

    /// Drop the Y axis: `(x, z)`.
    pub fn xz(self) -> Vec2 {
        Vec2::new(self.x, self.z)
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Div<f32> for Vec3 {
    type Output = Self;

    fn div(self, rhs: f32) -> Self {
        Self::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

impl Neg for Vec3 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

pub fn cross2(a: Vec2, b: Vec2) -> f32 {
    a.perp_dot(b)
}

/// Intersection of the infinite lines through `p0..p1` and `q0..q1`.
///
/// Returns `p0` when the lines are parallel.
pub fn segment_line_intersection(p0: Vec2, p1: Vec2, q0: Vec2, q1: Vec2) -> Vec2 {
    let d1 = p1 - p0;
    let d2 = q1 - q0;
    let det = cross2(d1, d2);
    if det.abs() <= f32::MIN_POSITIVE {
        return p0;
    }
    let t = cross2(q0 - p0, d2) / det;
    p0 + d1 * t
}

/// Even-odd ray crossing test.
///
/// Points exactly on an edge may land on either side, but a point on an edge shared by two
/// polygons of a partition is reported inside exactly one of them.
pub fn point_in_polygon(poly: &[Vec2], p: Vec2) -> bool {
    let mut inside = false;
    let n = poly.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let (vi, vj) = (poly[i], poly[j]);
        if (vi.y > p.y) != (vj.y > p.y) {
            let x_at = (vj.x - vi.x) * (p.y - vi.y) / (vj.y - vi.y) + vi.x;
            if p.x < x_at {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

pub fn triangle_normal(v0: Vec3, v1: Vec3, v2: Vec3) -> Vec3 {
    (v1 - v0).cross(v2 - v0).normalize_or_zero()
}

/// First undirected edge shared by two index triples, in `a`'s winding order.
pub fn shared_edge(a: [u32; 3], b: [u32; 3]) -> Option<(u32, u32)> {
    for i in 0..3 {
        let (a0, a1) = (a[i], a[(i + 1) % 3]);
        for j in 0..3 {
            let (b0, b1) = (b[j], b[(j + 1) % 3]);
            if (a0 == b0 && a1 == b1) || (a0 == b1 && a1 == b0) {
                return Some((a0, a1));
            }
        }
    }
    None
}

/// Named working planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ProjectionPlane {
    Xy,
    #[default]
    Xz,
    Yz,
}

impl ProjectionPlane {
    pub fn euler_degrees(self) -> Vec3 {
        match self {
            ProjectionPlane::Xy => Vec3::new(-90.0, 0.0, 0.0),
            ProjectionPlane::Xz => Vec3::ZERO,
            ProjectionPlane::Yz => Vec3::new(0.0, 0.0, -90.0),
        }
    }
}

/// Orientation of the 2D working plane inside world space.
///
/// World points are rotated into the plane's local frame with the inverse rotation; the plane
/// coordinates are the local `(x, z)` and local `y` is the height above the plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneProjection {
    // Row-major; rows are the rotated basis axes, i.e. the inverse rotation.
    to_local: [[f32; 3]; 3],
}

impl Default for PlaneProjection {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl PlaneProjection {
    pub const IDENTITY: Self = Self {
        to_local: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    /// Rotation given as Euler angles in degrees, applied around Z, then X, then Y.
    pub fn from_euler_degrees(euler: Vec3) -> Self {
        let (sx, cx) = euler.x.to_radians().sin_cos();
        let (sy, cy) = euler.y.to_radians().sin_cos();
        let (sz, cz) = euler.z.to_radians().sin_cos();

        let rx = [[1.0, 0.0, 0.0], [0.0, cx, -sx], [0.0, sx, cx]];
        let ry = [[cy, 0.0, sy], [0.0, 1.0, 0.0], [-sy, 0.0, cy]];
        let rz = [[cz, -sz, 0.0], [sz, cz, 0.0], [0.0, 0.0, 1.0]];
        let rotation = mat_mul(ry, mat_mul(rx, rz));

        Self {
            to_local: transpose(rotation),
        }
    }

    pub fn from_plane(plane: ProjectionPlane) -> Self {
        match plane {
            ProjectionPlane::Xz => Self::IDENTITY,
            other => Self::from_euler_degrees(other.euler_degrees()),
        }
    }

    pub fn to_local(&self, world: Vec3) -> Vec3 {
        mat_vec(&self.to_local, world)
    }

    pub fn to_world(&self, local: Vec3) -> Vec3 {
        mat_vec(&transpose(self.to_local), local)
    }

    pub fn project(&self, world: Vec3) -> Vec2 {
        self.to_local(world).xz()
    }
}

type Mat3 = [[f32; 3]; 3];

fn mat_mul(a: Mat3, b: Mat3) -> Mat3 {
    let mut out = [[0.0; 3]; 3];
    for (r, row) in out.iter_mut().enumerate() {
        for (c, cell) in row.iter_mut().enumerate() {
            *cell = a[r][0] * b[0][c] + a[r][1] * b[1][c] + a[r][2] * b[2][c];
        }
    }
    out
}

fn transpose(m: Mat3) -> Mat3 {
    [
        [m[0][0], m[1][0], m[2][0]],
        [m[0][1], m[1][1], m[2][1]],
        [m[0][2], m[1][2], m[2][2]],
    ]
}

fn mat_vec(m: &Mat3, v: Vec3) -> Vec3 {
    Vec3::new(
        m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z,
        m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z,
        m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z,
    )
}
