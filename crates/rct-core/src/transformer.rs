//! [`TransformerCore`] – the thread-safe transform store.
//!
//! Combines the [`FrameGraph`], one [`EdgeBuffer`] per edge and the
//! [`PendingRequests`] registry behind two locks:
//!
//! | Lock | Guards | Taken by |
//! |---|---|---|
//! | `state` (`RwLock`) | graph + buffers | writers exclusively, readers shared |
//! | `pending` (`Mutex`) | outstanding requests | `set_transform` and `request_transform`, always after `state` |
//!
//! `set_transform` re-evaluates pending requests while it still holds the
//! write lock, and `request_transform` registers under the read lock, so a
//! request can never miss the sample that satisfies it.
//!
//! # Example
//!
//! ```rust
//! use rct_core::TransformerCore;
//! use rct_types::{Quaternion, Transform3D, TransformSample, Vec3};
//!
//! let core = TransformerCore::new(1000);
//! let offset = Transform3D::new(Vec3::new(0.5, 0.0, 0.0), Quaternion::identity());
//!
//! core.set_transform(TransformSample::new("base", "camera", 0, offset), true).unwrap();
//!
//! let t = core.lookup_transform("base", "camera", 42).unwrap();
//! assert!((t.translation().x - 0.5).abs() < 1e-9);
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rct_types::{Timestamp, Transform3D, TransformSample, TransformerError};
use tracing::{debug, info, warn};

use crate::config::TransformerConfig;
use crate::edge_buffer::{EdgeBuffer, EdgeMode};
use crate::frame_graph::{Direction, FrameGraph};
use crate::interface::{TransformListener, TransformReceiver};
use crate::request::{PendingRequests, TransformFuture};

// ────────────────────────────────────────────────────────────────────────────
// Guarded state
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct CoreState {
    graph: FrameGraph,
    /// Keyed by child frame: a child has exactly one parent edge.
    buffers: HashMap<String, EdgeBuffer>,
}

impl CoreState {
    fn lookup(
        &self,
        frame_from: &str,
        frame_to: &str,
        time: Timestamp,
    ) -> Result<TransformSample, TransformerError> {
        let path = self.graph.find_path(frame_from, frame_to)?;

        let mut composed = Transform3D::identity();
        let mut authorities: Vec<String> = Vec::new();
        for step in &path {
            let edge = self
                .buffers
                .get(&step.child)
                .ok_or_else(|| TransformerError::NoData {
                    parent: step.parent.clone(),
                    child: step.child.clone(),
                })?
                .query(time)?;

            let hop = match step.direction {
                Direction::Forward => edge.transform,
                Direction::Inverse => edge.transform.inverse(),
            };
            composed = composed.compose(hop);

            if !edge.authority.is_empty() && !authorities.contains(&edge.authority) {
                authorities.push(edge.authority);
            }
        }

        Ok(TransformSample::new(frame_from, frame_to, time, composed)
            .with_authority(authorities.join(",")))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// TransformerCore
// ────────────────────────────────────────────────────────────────────────────

/// Time-indexed store of frame relations answering "where is frame B in
/// frame A at time T".
///
/// Share it between producers and consumers with an `Arc`; every method
/// takes `&self`.  Dropping the core cancels all still-pending requests.
#[derive(Debug)]
pub struct TransformerCore {
    retention_window: Timestamp,
    state: RwLock<CoreState>,
    pending: Mutex<PendingRequests>,
}

impl TransformerCore {
    /// Create an empty core keeping `retention_window` time units of history
    /// on each dynamic edge.
    pub fn new(retention_window: Timestamp) -> Self {
        info!(retention_window, "transformer core created");
        Self {
            retention_window,
            state: RwLock::new(CoreState::default()),
            pending: Mutex::new(PendingRequests::new()),
        }
    }

    pub fn from_config(config: &TransformerConfig) -> Self {
        Self::new(config.retention_window)
    }

    pub fn retention_window(&self) -> Timestamp {
        self.retention_window
    }

    /// Accept a new sample for the edge `frame_parent -> frame_child`.
    ///
    /// The first sample of an edge fixes its mode (`is_static`).  Every
    /// pending request that becomes answerable is resolved before this call
    /// returns.
    ///
    /// # Errors
    ///
    /// - [`TransformerError::InvalidTransform`] – empty or identical frame
    ///   names, non-finite numbers, zero rotation.
    /// - [`TransformerError::MultipleParents`] / [`TransformerError::CycleDetected`]
    ///   – the edge does not fit the frame tree.
    /// - [`TransformerError::ModeMismatch`] – static sample on a dynamic edge
    ///   or vice versa.
    ///
    /// A rejected sample leaves the store unchanged.
    pub fn set_transform(
        &self,
        sample: TransformSample,
        is_static: bool,
    ) -> Result<(), TransformerError> {
        let sample = sample
            .normalized()
            .inspect_err(|e| debug!(error = %e, "rejected transform sample"))?;
        let mode = EdgeMode::from_static_flag(is_static);

        let mut state = self.write_state();

        if let Some(buffer) = state.buffers.get(&sample.frame_child)
            && buffer.parent() == sample.frame_parent
        {
            buffer.check_mode(mode)?;
        }

        if state.graph.add_edge(&sample.frame_parent, &sample.frame_child)? {
            info!(
                parent = %sample.frame_parent,
                child = %sample.frame_child,
                mode = mode.as_str(),
                "new frame edge"
            );
        }

        let retention_window = self.retention_window;
        debug!(
            parent = %sample.frame_parent,
            child = %sample.frame_child,
            time = sample.time,
            authority = %sample.authority,
            "transform accepted"
        );
        state
            .buffers
            .entry(sample.frame_child.clone())
            .or_insert_with(|| {
                EdgeBuffer::new(&sample.frame_parent, &sample.frame_child, mode, retention_window)
            })
            .insert(sample, mode)?;

        let committed: &CoreState = &state;
        self.lock_pending().resolve_with(|request| {
            committed
                .lookup(request.frame_from(), request.frame_to(), request.time())
                .ok()
        });
        Ok(())
    }

    /// The pose of `frame_to` expressed in `frame_from` at `time`.
    ///
    /// The result is stamped with the requested frames and time.
    ///
    /// # Errors
    ///
    /// [`TransformerError::UnknownFrame`], [`TransformerError::NoPath`], or
    /// the first per-edge failure along the path
    /// ([`TransformerError::NoData`], [`TransformerError::InsufficientData`],
    /// [`TransformerError::Extrapolation`]).
    pub fn lookup_transform(
        &self,
        frame_from: &str,
        frame_to: &str,
        time: Timestamp,
    ) -> Result<TransformSample, TransformerError> {
        self.read_state().lookup(frame_from, frame_to, time)
    }

    /// Whether [`Self::lookup_transform`] would currently succeed.
    pub fn can_transform(&self, frame_from: &str, frame_to: &str, time: Timestamp) -> bool {
        self.lookup_transform(frame_from, frame_to, time).is_ok()
    }

    /// Ask for a transform that may not be available yet.
    ///
    /// Returns an already resolved handle when the lookup succeeds right
    /// away; otherwise the request is registered and resolved by the first
    /// [`Self::set_transform`] that makes it answerable.
    pub fn request_transform(
        &self,
        frame_from: &str,
        frame_to: &str,
        time: Timestamp,
    ) -> TransformFuture {
        let state = self.read_state();
        match state.lookup(frame_from, frame_to, time) {
            Ok(sample) => TransformFuture::resolved(sample),
            Err(reason) => {
                let request = TransformFuture::pending(frame_from, frame_to, time);
                debug!(
                    request = %request.id(),
                    from = frame_from,
                    to = frame_to,
                    time,
                    reason = %reason,
                    "transform request pending"
                );
                self.lock_pending().push(request.clone());
                request
            }
        }
    }

    /// Human-readable dump of every known frame and its parent, one per line.
    pub fn all_frames_as_string(&self) -> String {
        let state = self.read_state();
        state
            .graph
            .frames()
            .into_iter()
            .map(|(frame, parent)| match (parent, state.buffers.get(frame)) {
                (Some(parent), Some(buffer)) => format!(
                    "Frame {frame} exists with parent {parent} ({}, {} samples).\n",
                    buffer.mode().as_str(),
                    buffer.len()
                ),
                (Some(parent), None) => format!("Frame {frame} exists with parent {parent}.\n"),
                (None, _) => format!("Frame {frame} exists with no parent.\n"),
            })
            .collect()
    }

    /// Names of all known frames, sorted.
    pub fn frame_names(&self) -> Vec<String> {
        self.read_state()
            .graph
            .frames()
            .into_keys()
            .map(str::to_string)
            .collect()
    }

    /// Number of requests still waiting for data.
    pub fn pending_request_count(&self) -> usize {
        self.lock_pending().len()
    }

    // ── Lock helpers ────────────────────────────────────────────────────────
    //
    // Every mutation of the guarded state completes before its guard is
    // released, so a poisoned lock still holds consistent data.

    fn read_state(&self) -> RwLockReadGuard<'_, CoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, CoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_pending(&self) -> MutexGuard<'_, PendingRequests> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for TransformerCore {
    fn default() -> Self {
        Self::from_config(&TransformerConfig::default())
    }
}

impl Drop for TransformerCore {
    fn drop(&mut self) {
        let cancelled = self
            .pending
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel_all();
        if cancelled > 0 {
            info!(cancelled, "transformer core dropped; pending requests cancelled");
        }
    }
}

impl TransformListener for TransformerCore {
    fn new_transform_available(&self, sample: &TransformSample, is_static: bool) {
        if let Err(e) = self.set_transform(sample.clone(), is_static) {
            warn!(
                parent = %sample.frame_parent,
                child = %sample.frame_child,
                time = sample.time,
                error = %e,
                "dropping published transform"
            );
        }
    }
}

impl TransformReceiver for TransformerCore {
    fn lookup_transform(
        &self,
        frame_from: &str,
        frame_to: &str,
        time: Timestamp,
    ) -> Result<TransformSample, TransformerError> {
        TransformerCore::lookup_transform(self, frame_from, frame_to, time)
    }

    fn can_transform(&self, frame_from: &str, frame_to: &str, time: Timestamp) -> bool {
        TransformerCore::can_transform(self, frame_from, frame_to, time)
    }

    fn request_transform(
        &self,
        frame_from: &str,
        frame_to: &str,
        time: Timestamp,
    ) -> TransformFuture {
        TransformerCore::request_transform(self, frame_from, frame_to, time)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
