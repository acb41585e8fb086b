//! `rct-types` – shared vocabulary of the transform store.
//!
//! - [`geometry`] – [`Vec3`], [`Quaternion`] and [`Transform3D`] with
//!   composition, inversion and interpolation.
//! - [`TransformSample`] – one timestamped parent→child relation as published
//!   by a producer.
//! - [`TransformerError`] – every failure the core can report.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod geometry;

pub use geometry::{Quaternion, Transform3D, Vec3};

/// Timestamp in caller-defined, comparable time units.
pub type Timestamp = u64;

/// One timestamped relation between a parent and a child frame.
///
/// `transform` is the pose of `frame_child` expressed in `frame_parent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformSample {
    pub frame_parent: String,
    pub frame_child: String,
    pub time: Timestamp,
    pub transform: Transform3D,
    /// Provenance of the sample (publishing component), informational only.
    #[serde(default)]
    pub authority: String,
}

impl TransformSample {
    pub fn new(
        frame_parent: impl Into<String>,
        frame_child: impl Into<String>,
        time: Timestamp,
        transform: Transform3D,
    ) -> Self {
        Self {
            frame_parent: frame_parent.into(),
            frame_child: frame_child.into(),
            time,
            transform,
            authority: String::new(),
        }
    }

    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into();
        self
    }

    pub fn translation(&self) -> Vec3 {
        self.transform.translation
    }

    pub fn rotation(&self) -> Quaternion {
        self.transform.rotation
    }

    /// Check the frame names and numeric fields.
    ///
    /// # Errors
    ///
    /// [`TransformerError::InvalidTransform`] when a frame name is empty, both
    /// names are equal, or any component is NaN/infinite.
    pub fn validate(&self) -> Result<(), TransformerError> {
        if self.frame_parent.is_empty() || self.frame_child.is_empty() {
            return Err(self.invalid("frame names must not be empty"));
        }
        if self.frame_parent == self.frame_child {
            return Err(self.invalid("parent and child frame are identical"));
        }
        if !self.transform.is_finite() {
            return Err(self.invalid("transform contains non-finite values"));
        }
        Ok(())
    }

    /// Validate and return the sample with a unit-length rotation.
    ///
    /// A zero rotation quaternion describes no rotation at all and is
    /// rejected as [`TransformerError::InvalidTransform`].
    pub fn normalized(mut self) -> Result<Self, TransformerError> {
        self.validate()?;
        let rotation = self
            .transform
            .rotation
            .normalized()
            .ok_or_else(|| self.invalid("rotation quaternion has zero length"))?;
        self.transform.rotation = rotation;
        Ok(self)
    }

    fn invalid(&self, reason: &str) -> TransformerError {
        TransformerError::InvalidTransform(format!(
            "{} -> {} at {}: {}",
            self.frame_parent, self.frame_child, self.time, reason
        ))
    }
}

impl fmt::Display for TransformSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = self.transform.translation;
        let q = self.transform.rotation;
        write!(
            f,
            "Transform[{} -> {} @ {}] t=({}, {}, {}) q=(w={}, x={}, y={}, z={})",
            self.frame_parent, self.frame_child, self.time, t.x, t.y, t.z, q.w, q.x, q.y, q.z
        )?;
        if !self.authority.is_empty() {
            write!(f, " authority={}", self.authority)?;
        }
        Ok(())
    }
}

/// Every failure reported by the transform store.
///
/// Variants map one-to-one onto the conditions a caller may want to react
/// to; match on them rather than on the message text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformerError {
    #[error("Invalid transform: {0}")]
    InvalidTransform(String),

    #[error("Frame '{child}' already has parent '{existing}', cannot attach it to '{requested}'")]
    MultipleParents {
        child: String,
        existing: String,
        requested: String,
    },

    #[error("Edge {parent} -> {child} would create a cycle")]
    CycleDetected { parent: String, child: String },

    #[error("Edge {parent} -> {child} was registered as {existing}, not {requested}")]
    ModeMismatch {
        parent: String,
        child: String,
        existing: &'static str,
        requested: &'static str,
    },

    #[error("Unknown frame '{0}'")]
    UnknownFrame(String),

    #[error("No path between '{0}' and '{1}'")]
    NoPath(String, String),

    #[error("No data on edge {parent} -> {child}")]
    NoData { parent: String, child: String },

    #[error("Only one sample on edge {parent} -> {child}, cannot interpolate")]
    InsufficientData { parent: String, child: String },

    #[error(
        "Lookup at {requested} on edge {parent} -> {child} would require extrapolation \
         (data covers {earliest}..={latest})"
    )]
    Extrapolation {
        parent: String,
        child: String,
        requested: Timestamp,
        earliest: Timestamp,
        latest: Timestamp,
    },
}
