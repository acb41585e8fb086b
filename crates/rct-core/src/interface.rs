//! Seams between the core and its collaborators.
//!
//! The core never talks to a transport.  A transport decodes remote samples
//! into [`TransformSample`]s and hands them to a [`TransformListener`];
//! consumers query through a [`TransformReceiver`].  Both traits are
//! implemented by [`TransformerCore`][crate::TransformerCore].

use rct_types::{Timestamp, TransformSample, TransformerError};

use crate::request::TransformFuture;

/// Sink for newly published samples.
///
/// # Contract
///
/// * Invalid or conflicting samples are rejected and logged by the
///   implementation; a publisher is never failed by a bad sample.
pub trait TransformListener: Send + Sync {
    fn new_transform_available(&self, sample: &TransformSample, is_static: bool);
}

/// Consumer-side queries.
///
/// # Contract
///
/// * `lookup_transform` – the pose of `frame_to` expressed in `frame_from`
///   at `time`, or the first error found along the path.
/// * `can_transform` – `true` exactly when `lookup_transform` would succeed.
/// * `request_transform` – a handle that resolves once the lookup succeeds;
///   already resolved when it succeeds immediately.
pub trait TransformReceiver: Send + Sync {
    fn lookup_transform(
        &self,
        frame_from: &str,
        frame_to: &str,
        time: Timestamp,
    ) -> Result<TransformSample, TransformerError>;

    fn can_transform(&self, frame_from: &str, frame_to: &str, time: Timestamp) -> bool;

    fn request_transform(&self, frame_from: &str, frame_to: &str, time: Timestamp)
    -> TransformFuture;
}
