//! Rigid-body geometry: vectors, rotations and their composition.
//!
//! A [`Transform3D`] describes the pose of a child frame expressed in its
//! parent frame.  To convert a point expressed in the child frame into the
//! parent frame, rotate it by `rotation` then add `translation`.

use serde::{Deserialize, Serialize};

/// Above this dot product two rotations are treated as parallel and slerp
/// falls back to a normalised lerp.
const SLERP_PARALLEL_THRESHOLD: f64 = 0.9995;

/// Rotations with a smaller norm cannot be normalised.
const MIN_ROTATION_NORM: f64 = 1e-12;

// ────────────────────────────────────────────────────────────────────────────
// Vec3
// ────────────────────────────────────────────────────────────────────────────

/// A 3-D translation vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The zero vector.
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }

    pub fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }

    /// Linear interpolation: `alpha == 0` yields `self`, `alpha == 1` yields `other`.
    pub fn lerp(self, other: Self, alpha: f64) -> Self {
        Self::new(
            self.x + alpha * (other.x - self.x),
            self.y + alpha * (other.y - self.y),
            self.z + alpha * (other.z - self.z),
        )
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Quaternion
// ────────────────────────────────────────────────────────────────────────────

/// A quaternion representing a 3-D rotation (w, x, y, z convention).
///
/// Operations that treat the quaternion as a rotation ([`Quaternion::rotate`],
/// [`Quaternion::conjugate`] as inverse) assume unit length; use
/// [`Quaternion::normalized`] on untrusted input first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quaternion {
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// The identity rotation (no rotation).
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Hamilton product: `self` applied after `rhs`.
    pub fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        )
    }

    /// Conjugate (== inverse for a unit quaternion).
    pub fn conjugate(self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    pub fn dot(self, rhs: Self) -> f64 {
        self.w * rhs.w + self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    pub fn norm(self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Scale to unit length.  Returns `None` for a (near) zero quaternion,
    /// which does not describe any rotation.
    pub fn normalized(self) -> Option<Self> {
        let n = self.norm();
        if !n.is_finite() || n < MIN_ROTATION_NORM {
            return None;
        }
        Some(Self::new(self.w / n, self.x / n, self.y / n, self.z / n))
    }

    /// Rotate a vector by this quaternion: p' = q * p * q*.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let p = Self::new(0.0, v.x, v.y, v.z);
        let rotated = self.mul(p).mul(self.conjugate());
        Vec3::new(rotated.x, rotated.y, rotated.z)
    }

    /// Spherical linear interpolation along the shortest arc.
    pub fn slerp(self, other: Self, alpha: f64) -> Self {
        let mut other = other;
        let mut dot = self.dot(other);

        // q and -q encode the same rotation; flip to take the short way round.
        if dot < 0.0 {
            other = Self::new(-other.w, -other.x, -other.y, -other.z);
            dot = -dot;
        }

        if dot > SLERP_PARALLEL_THRESHOLD {
            let lerped = Self::new(
                self.w + alpha * (other.w - self.w),
                self.x + alpha * (other.x - self.x),
                self.y + alpha * (other.y - self.y),
                self.z + alpha * (other.z - self.z),
            );
            return lerped.normalized().unwrap_or(self);
        }

        let theta_0 = dot.clamp(-1.0, 1.0).acos();
        let theta = theta_0 * alpha;
        let sin_theta_0 = theta_0.sin();
        let s0 = (theta_0 - theta).sin() / sin_theta_0;
        let s1 = theta.sin() / sin_theta_0;

        Self::new(
            s0 * self.w + s1 * other.w,
            s0 * self.x + s1 * other.x,
            s0 * self.y + s1 * other.y,
            s0 * self.z + s1 * other.z,
        )
    }

    pub fn is_finite(&self) -> bool {
        self.w.is_finite() && self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Transform3D
// ────────────────────────────────────────────────────────────────────────────

/// A rigid-body 3-D transform: rotation followed by translation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform3D {
    pub translation: Vec3,
    pub rotation: Quaternion,
}

impl Transform3D {
    pub fn new(translation: Vec3, rotation: Quaternion) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// The identity transform (no translation, no rotation).
    pub fn identity() -> Self {
        Self::new(Vec3::zero(), Quaternion::identity())
    }

    /// Compose two transforms: `self` applied first, then `other`.
    ///
    /// If `self` = T_A_B and `other` = T_B_C, the result is T_A_C.
    pub fn compose(self, other: Self) -> Self {
        let translation = self.translation.add(self.rotation.rotate(other.translation));
        let rotation = self.rotation.mul(other.rotation);
        Self::new(translation, rotation)
    }

    /// Reverse the direction: T_A_B becomes T_B_A.
    pub fn inverse(self) -> Self {
        let rotation = self.rotation.conjugate();
        let translation = rotation.rotate(self.translation.neg());
        Self::new(translation, rotation)
    }

    /// Lerp the translation and slerp the rotation towards `other`.
    pub fn interpolate(self, other: Self, alpha: f64) -> Self {
        Self::new(
            self.translation.lerp(other.translation, alpha),
            self.rotation.slerp(other.rotation, alpha),
        )
    }

    /// Map a point expressed in the child frame into the parent frame.
    pub fn transform_point(self, point: Vec3) -> Vec3 {
        self.rotation.rotate(point).add(self.translation)
    }

    pub fn is_finite(&self) -> bool {
        self.translation.is_finite() && self.rotation.is_finite()
    }
}

impl Default for Transform3D {
    fn default() -> Self {
        Self::identity()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
