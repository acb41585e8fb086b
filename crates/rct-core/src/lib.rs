//! `rct-core` – the coordinate-frame transform store.
//!
//! Tracks, over time, how named frames relate to one another and answers
//! "what is the transform from frame A to frame B at time T", through any
//! number of intermediate frames and in either edge direction.
//!
//! # Modules
//!
//! - [`transformer`] – [`TransformerCore`]: the thread-safe store; ingests
//!   samples, answers synchronous lookups and resolves asynchronous requests.
//! - [`frame_graph`] – [`FrameGraph`][frame_graph::FrameGraph]: single-parent
//!   frame tree with cycle rejection and lowest-common-ancestor path search.
//! - [`edge_buffer`] – [`EdgeBuffer`][edge_buffer::EdgeBuffer]: static or
//!   time-ordered history of one edge with lerp/slerp interpolation and no
//!   extrapolation.
//! - [`request`] – [`TransformFuture`]: blocking, cancellable handle on a
//!   transform that is not available yet.
//! - [`interface`] – [`TransformListener`] and [`TransformReceiver`], the
//!   seams a transport or consumer codes against.
//! - [`config`] – [`TransformerConfig`]: retention window from TOML or the
//!   environment.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: default
//!   `tracing` subscriber for host processes.

pub mod config;
pub mod edge_buffer;
pub mod frame_graph;
pub mod interface;
pub mod request;
pub mod telemetry;
pub mod transformer;

pub use config::{ConfigError, TransformerConfig};
pub use interface::{TransformListener, TransformReceiver};
pub use request::{RequestError, RequestStatus, TransformFuture};
pub use transformer::TransformerCore;

pub use rct_types::{Timestamp, TransformSample, TransformerError};
