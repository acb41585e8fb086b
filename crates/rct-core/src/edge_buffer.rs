//! Per-edge time series of [`TransformSample`]s.
//!
//! An [`EdgeBuffer`] is created in one of two modes that never change
//! afterwards:
//!
//! | Mode | Storage | Query at time `t` |
//! |---|---|---|
//! | [`EdgeMode::Static`] | a single sample, overwritten on every insert | always the stored sample |
//! | [`EdgeMode::Dynamic`] | time-ascending history, bounded by the retention window | exact match, or lerp/slerp between the two neighbours |
//!
//! Dynamic queries never extrapolate: a time before the oldest or after the
//! newest sample is an [`TransformerError::Extrapolation`].

use rct_types::{Timestamp, TransformSample, TransformerError};

/// Whether an edge is time-invariant or recorded as a time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeMode {
    Static,
    Dynamic,
}

impl EdgeMode {
    pub fn from_static_flag(is_static: bool) -> Self {
        if is_static { Self::Static } else { Self::Dynamic }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Dynamic => "dynamic",
        }
    }
}

/// Time-indexed storage for one parent→child edge.
#[derive(Debug, Clone)]
pub struct EdgeBuffer {
    parent: String,
    child: String,
    mode: EdgeMode,
    retention_window: Timestamp,
    /// Static: at most one entry.  Dynamic: strictly ascending by time.
    samples: Vec<TransformSample>,
}

impl EdgeBuffer {
    /// Create an empty buffer for `parent -> child`.
    ///
    /// `retention_window` only applies to [`EdgeMode::Dynamic`] buffers.
    pub fn new(
        parent: impl Into<String>,
        child: impl Into<String>,
        mode: EdgeMode,
        retention_window: Timestamp,
    ) -> Self {
        Self {
            parent: parent.into(),
            child: child.into(),
            mode,
            retention_window,
            samples: Vec::new(),
        }
    }

    pub fn mode(&self) -> EdgeMode {
        self.mode
    }

    pub fn parent(&self) -> &str {
        &self.parent
    }

    pub fn child(&self) -> &str {
        &self.child
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Oldest and newest stored timestamps, if any.
    pub fn time_range(&self) -> Option<(Timestamp, Timestamp)> {
        Some((self.samples.first()?.time, self.samples.last()?.time))
    }

    /// Ensure a sample of the given mode may be stored here.
    pub fn check_mode(&self, mode: EdgeMode) -> Result<(), TransformerError> {
        if self.mode == mode {
            return Ok(());
        }
        Err(TransformerError::ModeMismatch {
            parent: self.parent.clone(),
            child: self.child.clone(),
            existing: self.mode.as_str(),
            requested: mode.as_str(),
        })
    }

    /// Store `sample`.
    ///
    /// Static buffers keep only the latest inserted sample.  Dynamic buffers
    /// insert by timestamp (replacing an entry with the same timestamp) and
    /// then evict entries older than `newest - retention_window`.
    ///
    /// # Errors
    ///
    /// [`TransformerError::ModeMismatch`] when `mode` differs from the mode
    /// the buffer was created with.
    pub fn insert(&mut self, sample: TransformSample, mode: EdgeMode) -> Result<(), TransformerError> {
        self.check_mode(mode)?;

        match self.mode {
            EdgeMode::Static => {
                self.samples.clear();
                self.samples.push(sample);
            }
            EdgeMode::Dynamic => {
                match self.samples.binary_search_by_key(&sample.time, |s| s.time) {
                    Ok(idx) => self.samples[idx] = sample,
                    Err(idx) => self.samples.insert(idx, sample),
                }
                self.evict_expired();
            }
        }
        Ok(())
    }

    /// Resolve the transform of this edge at `time`.
    ///
    /// Static buffers return the stored sample with its own recorded time.
    /// Dynamic buffers return either the exact sample at `time` or a sample
    /// interpolated between the two neighbours and stamped with `time`.
    pub fn query(&self, time: Timestamp) -> Result<TransformSample, TransformerError> {
        match self.mode {
            EdgeMode::Static => self.samples.first().cloned().ok_or_else(|| self.no_data()),
            EdgeMode::Dynamic => self.query_dynamic(time),
        }
    }

    fn query_dynamic(&self, time: Timestamp) -> Result<TransformSample, TransformerError> {
        match self.samples.len() {
            0 => return Err(self.no_data()),
            1 => {
                return Err(TransformerError::InsufficientData {
                    parent: self.parent.clone(),
                    child: self.child.clone(),
                });
            }
            _ => {}
        }

        let idx = match self.samples.binary_search_by_key(&time, |s| s.time) {
            Ok(idx) => return Ok(self.samples[idx].clone()),
            Err(idx) => idx,
        };

        if idx == 0 || idx == self.samples.len() {
            let (earliest, latest) = self.time_range().unwrap_or((time, time));
            return Err(TransformerError::Extrapolation {
                parent: self.parent.clone(),
                child: self.child.clone(),
                requested: time,
                earliest,
                latest,
            });
        }

        let before = &self.samples[idx - 1];
        let after = &self.samples[idx];
        let alpha = (time - before.time) as f64 / (after.time - before.time) as f64;

        let mut out = before.clone();
        out.time = time;
        out.transform = before.transform.interpolate(after.transform, alpha);
        Ok(out)
    }

    fn evict_expired(&mut self) {
        let Some(newest) = self.samples.last().map(|s| s.time) else {
            return;
        };
        let cutoff = newest.saturating_sub(self.retention_window);
        let expired = self.samples.partition_point(|s| s.time < cutoff);
        if expired > 0 {
            self.samples.drain(..expired);
        }
    }

    fn no_data(&self) -> TransformerError {
        TransformerError::NoData {
            parent: self.parent.clone(),
            child: self.child.clone(),
        }
    }
}
