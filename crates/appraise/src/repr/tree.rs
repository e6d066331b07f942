//! SoA regression tree storage and its mutable builder.
//!
//! Splits are numeric only: a sample goes left when
//! `features[split_index] < split_threshold` and right otherwise, so a `NaN`
//! feature always goes right. Feature extraction rejects `NaN` before it
//! reaches a tree.

use thiserror::Error;

/// Index of a node within one tree (0 = root).
pub type NodeId = u32;

// ============================================================================
// Validation
// ============================================================================

/// Structural validation errors for [`Tree`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeValidationError {
    #[error("tree has no nodes")]
    EmptyTree,
    #[error("node arrays have inconsistent lengths")]
    LengthMismatch,
    #[error("node {node}: {side} child {child} out of bounds (n_nodes = {n_nodes})")]
    ChildOutOfBounds {
        node: NodeId,
        side: &'static str,
        child: NodeId,
        n_nodes: usize,
    },
    #[error("node {node} references itself")]
    SelfLoop { node: NodeId },
    #[error("node {node} reached by more than one path")]
    DuplicateVisit { node: NodeId },
    #[error("cycle detected at node {node}")]
    CycleDetected { node: NodeId },
    #[error("node {node} is unreachable from the root")]
    UnreachableNode { node: NodeId },
    #[error("node {node} holds a non-finite value")]
    NonFiniteValue { node: NodeId },
}

// ============================================================================
// Tree
// ============================================================================

/// Structure-of-Arrays tree storage.
///
/// Child indices are local to this tree. Split fields of leaf nodes and leaf
/// values of split nodes are unused and stored as zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    split_indices: Box<[u32]>,
    split_thresholds: Box<[f32]>,
    left_children: Box<[NodeId]>,
    right_children: Box<[NodeId]>,
    is_leaf: Box<[bool]>,
    leaf_values: Box<[f32]>,
}

impl Tree {
    /// Assemble a tree from raw node arrays.
    ///
    /// No structural checks are made here; call [`Tree::validate`] on
    /// untrusted input.
    pub fn from_parts(
        split_indices: Vec<u32>,
        split_thresholds: Vec<f32>,
        left_children: Vec<NodeId>,
        right_children: Vec<NodeId>,
        is_leaf: Vec<bool>,
        leaf_values: Vec<f32>,
    ) -> Self {
        Self {
            split_indices: split_indices.into_boxed_slice(),
            split_thresholds: split_thresholds.into_boxed_slice(),
            left_children: left_children.into_boxed_slice(),
            right_children: right_children.into_boxed_slice(),
            is_leaf: is_leaf.into_boxed_slice(),
            leaf_values: leaf_values.into_boxed_slice(),
        }
    }

    /// A single-leaf tree.
    pub fn leaf(value: f32) -> Self {
        Self::from_parts(vec![0], vec![0.0], vec![0], vec![0], vec![true], vec![value])
    }

    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.is_leaf.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.is_leaf.iter().filter(|&&l| l).count()
    }

    #[inline]
    pub fn is_leaf(&self, node: NodeId) -> bool {
        self.is_leaf[node as usize]
    }

    #[inline]
    pub fn split_index(&self, node: NodeId) -> u32 {
        self.split_indices[node as usize]
    }

    #[inline]
    pub fn split_threshold(&self, node: NodeId) -> f32 {
        self.split_thresholds[node as usize]
    }

    #[inline]
    pub fn left_child(&self, node: NodeId) -> NodeId {
        self.left_children[node as usize]
    }

    #[inline]
    pub fn right_child(&self, node: NodeId) -> NodeId {
        self.right_children[node as usize]
    }

    #[inline]
    pub fn leaf_value(&self, node: NodeId) -> f32 {
        self.leaf_values[node as usize]
    }

    pub fn split_indices(&self) -> &[u32] {
        &self.split_indices
    }

    pub fn split_thresholds(&self) -> &[f32] {
        &self.split_thresholds
    }

    pub fn left_children(&self) -> &[NodeId] {
        &self.left_children
    }

    pub fn right_children(&self) -> &[NodeId] {
        &self.right_children
    }

    pub fn leaf_flags(&self) -> &[bool] {
        &self.is_leaf
    }

    pub fn leaf_values(&self) -> &[f32] {
        &self.leaf_values
    }

    /// Walk from the root to the leaf reached by `features`.
    #[inline]
    pub fn traverse_to_leaf(&self, features: &[f32]) -> NodeId {
        let mut node = 0;
        while !self.is_leaf(node) {
            let value = features[self.split_index(node) as usize];
            node = if value < self.split_threshold(node) {
                self.left_child(node)
            } else {
                self.right_child(node)
            };
        }
        node
    }

    /// Leaf value reached by `features`.
    #[inline]
    pub fn predict_row(&self, features: &[f32]) -> f32 {
        self.leaf_value(self.traverse_to_leaf(features))
    }

    /// Maximum root-to-leaf depth (a single leaf has depth 0).
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0 as NodeId, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            if self.is_leaf(node) {
                max_depth = max_depth.max(depth);
            } else {
                stack.push((self.left_child(node), depth + 1));
                stack.push((self.right_child(node), depth + 1));
            }
        }
        max_depth
    }

    /// Validate structural invariants.
    ///
    /// Checks that all node arrays agree in length, every child index is in
    /// bounds, the nodes form a tree rooted at 0 (no cycles, no shared
    /// children, nothing unreachable), and thresholds and leaf values are
    /// finite.
    pub fn validate(&self) -> Result<(), TreeValidationError> {
        let n_nodes = self.n_nodes();
        if n_nodes == 0 {
            return Err(TreeValidationError::EmptyTree);
        }
        let lens = [
            self.split_indices.len(),
            self.split_thresholds.len(),
            self.left_children.len(),
            self.right_children.len(),
            self.leaf_values.len(),
        ];
        if lens.iter().any(|&len| len != n_nodes) {
            return Err(TreeValidationError::LengthMismatch);
        }

        // Iterative DFS with color marking.
        // 0 = unvisited, 1 = visiting, 2 = done
        let mut color = vec![0u8; n_nodes];
        let mut stack: Vec<(NodeId, bool)> = vec![(0, false)];

        while let Some((node, exiting)) = stack.pop() {
            let idx = node as usize;
            if exiting {
                color[idx] = 2;
                continue;
            }
            match color[idx] {
                0 => {}
                1 => return Err(TreeValidationError::CycleDetected { node }),
                _ => return Err(TreeValidationError::DuplicateVisit { node }),
            }
            color[idx] = 1;
            stack.push((node, true));

            if self.is_leaf(node) {
                if !self.leaf_value(node).is_finite() {
                    return Err(TreeValidationError::NonFiniteValue { node });
                }
                continue;
            }
            if !self.split_threshold(node).is_finite() {
                return Err(TreeValidationError::NonFiniteValue { node });
            }

            for (side, child) in [("right", self.right_child(node)), ("left", self.left_child(node))] {
                if child == node {
                    return Err(TreeValidationError::SelfLoop { node });
                }
                if child as usize >= n_nodes {
                    return Err(TreeValidationError::ChildOutOfBounds {
                        node,
                        side,
                        child,
                        n_nodes,
                    });
                }
                stack.push((child, false));
            }
        }

        match color.iter().position(|&c| c == 0) {
            Some(i) => Err(TreeValidationError::UnreachableNode { node: i as NodeId }),
            None => Ok(()),
        }
    }
}

// ============================================================================
// MutableTree
// ============================================================================

/// Tree under construction.
///
/// Nodes are appended as splits are applied; the root is node 0.
#[derive(Debug, Clone, Default)]
pub struct MutableTree {
    split_indices: Vec<u32>,
    split_thresholds: Vec<f32>,
    left_children: Vec<NodeId>,
    right_children: Vec<NodeId>,
    is_leaf: Vec<bool>,
    leaf_values: Vec<f32>,
}

impl MutableTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset and allocate the root as a leaf placeholder.
    pub fn init_root(&mut self) -> NodeId {
        self.split_indices.clear();
        self.split_thresholds.clear();
        self.left_children.clear();
        self.right_children.clear();
        self.is_leaf.clear();
        self.leaf_values.clear();
        self.alloc_node()
    }

    fn alloc_node(&mut self) -> NodeId {
        let id = self.is_leaf.len() as NodeId;
        self.split_indices.push(0);
        self.split_thresholds.push(0.0);
        self.left_children.push(0);
        self.right_children.push(0);
        self.is_leaf.push(true);
        self.leaf_values.push(0.0);
        id
    }

    /// Turn `node` into a numeric split and allocate its two children.
    ///
    /// Returns `(left, right)`.
    pub fn apply_numeric_split(
        &mut self,
        node: NodeId,
        feature: u32,
        threshold: f32,
    ) -> (NodeId, NodeId) {
        let left = self.alloc_node();
        let right = self.alloc_node();
        let idx = node as usize;
        self.split_indices[idx] = feature;
        self.split_thresholds[idx] = threshold;
        self.left_children[idx] = left;
        self.right_children[idx] = right;
        self.is_leaf[idx] = false;
        (left, right)
    }

    /// Finalize `node` as a leaf with `value`.
    pub fn make_leaf(&mut self, node: NodeId, value: f32) {
        let idx = node as usize;
        self.is_leaf[idx] = true;
        self.leaf_values[idx] = value;
    }

    pub fn n_nodes(&self) -> usize {
        self.is_leaf.len()
    }

    /// Freeze into an immutable [`Tree`].
    pub fn freeze(self) -> Tree {
        Tree::from_parts(
            self.split_indices,
            self.split_thresholds,
            self.left_children,
            self.right_children,
            self.is_leaf,
            self.leaf_values,
        )
    }
}
