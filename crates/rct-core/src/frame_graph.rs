//! Frame tree stored as a parent-pointer map.
//!
//! Every known frame maps to its parent name, or `None` for a root.  Walking
//! ancestry is a sequence of map lookups, never pointer chasing, and each
//! frame has at most one parent, so several independent trees may coexist.
//!
//! [`FrameGraph::find_path`] joins two frames through their lowest common
//! ancestor:
//!
//! ```text
//!            map                find_path("laser", "camera"):
//!           /   \                 laser -> base   (inverse)
//!        base    gps              base  -> ...    (inverse, up to the LCA)
//!        /  \                     ...   -> camera (forward, down from the LCA)
//!    laser  camera
//! ```

use std::collections::{BTreeMap, HashMap};

use rct_types::TransformerError;

/// How an edge is traversed along a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Parent to child, the direction the edge was recorded in.
    Forward,
    /// Child to parent; the edge transform must be inverted.
    Inverse,
}

/// One edge on a path between two frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    pub parent: String,
    pub child: String,
    pub direction: Direction,
}

/// Topology of all known frames.
#[derive(Debug, Default)]
pub struct FrameGraph {
    /// `parents[frame] = Some(parent)`, or `None` for a root.
    parents: HashMap<String, Option<String>>,
}

impl FrameGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, frame: &str) -> bool {
        self.parents.contains_key(frame)
    }

    pub fn parent(&self, frame: &str) -> Option<&str> {
        self.parents.get(frame)?.as_deref()
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// Register `parent -> child`.
    ///
    /// Returns `Ok(true)` when the edge is new and `Ok(false)` when it was
    /// already registered with the same parent.
    ///
    /// # Errors
    ///
    /// - [`TransformerError::MultipleParents`] when `child` already has a
    ///   different parent.
    /// - [`TransformerError::CycleDetected`] when `child` is an ancestor of
    ///   (or equal to) `parent`.
    pub fn add_edge(&mut self, parent: &str, child: &str) -> Result<bool, TransformerError> {
        if let Some(existing) = self.parent(child) {
            if existing == parent {
                return Ok(false);
            }
            return Err(TransformerError::MultipleParents {
                child: child.to_string(),
                existing: existing.to_string(),
                requested: parent.to_string(),
            });
        }

        if self.ancestry(parent).iter().any(|frame| *frame == child) {
            return Err(TransformerError::CycleDetected {
                parent: parent.to_string(),
                child: child.to_string(),
            });
        }

        self.parents
            .entry(parent.to_string())
            .or_insert(None);
        self.parents
            .insert(child.to_string(), Some(parent.to_string()));
        Ok(true)
    }

    /// Compute the edges joining `from` to `to`.
    ///
    /// Edges climbing from `from` to the common ancestor come first and are
    /// marked [`Direction::Inverse`]; edges descending to `to` follow and are
    /// marked [`Direction::Forward`].  A frame to itself is an empty path.
    pub fn find_path(&self, from: &str, to: &str) -> Result<Vec<PathStep>, TransformerError> {
        for frame in [from, to] {
            if !self.contains(frame) {
                return Err(TransformerError::UnknownFrame(frame.to_string()));
            }
        }

        let up = self.ancestry(from);
        let down = self.ancestry(to);

        // Depth of each of `to`'s ancestors, for the common-ancestor search.
        let down_depth: HashMap<&str, usize> =
            down.iter().enumerate().map(|(depth, f)| (*f, depth)).collect();

        let (up_len, down_len) = up
            .iter()
            .enumerate()
            .find_map(|(depth, f)| down_depth.get(f).map(|d| (depth, *d)))
            .ok_or_else(|| TransformerError::NoPath(from.to_string(), to.to_string()))?;

        let mut path = Vec::with_capacity(up_len + down_len);
        for pair in up[..=up_len].windows(2) {
            path.push(PathStep {
                parent: pair[1].to_string(),
                child: pair[0].to_string(),
                direction: Direction::Inverse,
            });
        }
        for pair in down[..=down_len].windows(2).rev() {
            path.push(PathStep {
                parent: pair[1].to_string(),
                child: pair[0].to_string(),
                direction: Direction::Forward,
            });
        }
        Ok(path)
    }

    /// Every known frame with its parent, sorted by frame name.
    pub fn frames(&self) -> BTreeMap<&str, Option<&str>> {
        self.parents
            .iter()
            .map(|(frame, parent)| (frame.as_str(), parent.as_deref()))
            .collect()
    }

    /// `frame` followed by its ancestors up to the root.
    ///
    /// Unknown frames yield just themselves.
    fn ancestry<'a>(&'a self, frame: &'a str) -> Vec<&'a str> {
        let mut chain = vec![frame];
        let mut current = frame;
        while let Some(parent) = self.parent(current) {
            // Insertions reject cycles; the bound only guards corrupted state.
            if chain.len() > self.parents.len() {
                break;
            }
            chain.push(parent);
            current = parent;
        }
        chain
    }
}
