//! Isolation tree node implementation
//!
//! Trees are stored as flat node vectors; internal nodes refer to their
//! children by index.

use serde::{Deserialize, Serialize};

use crate::{MLError, MLResult, Sample};

/// Euler–Mascheroni constant
const EULER: f64 = 0.577_215_664_901_532_9;

/// Node type in the isolation tree
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NodeType {
    /// Internal node with split condition
    Internal {
        /// Feature index to split on
        feature: usize,
        /// Samples below go left, the rest right
        split_value: f64,
        /// Left child index
        left: usize,
        /// Right child index
        right: usize,
    },
    /// Leaf node (external)
    External {
        /// Number of training samples that reached this leaf
        size: usize,
    },
}

/// Tree node with its depth
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Node type and data
    pub node_type: NodeType,
    /// Edges from the root
    pub depth: usize,
}

impl Node {
    /// Create an internal node
    pub fn internal(feature: usize, split_value: f64, left: usize, right: usize, depth: usize) -> Self {
        Self {
            node_type: NodeType::Internal {
                feature,
                split_value,
                left,
                right,
            },
            depth,
        }
    }

    /// Create an external (leaf) node
    pub fn external(size: usize, depth: usize) -> Self {
        Self {
            node_type: NodeType::External { size },
            depth,
        }
    }

    /// Check if node is a leaf
    pub fn is_leaf(&self) -> bool {
        matches!(self.node_type, NodeType::External { .. })
    }

    /// Path length credited to a sample ending here
    ///
    /// Depth plus the expected remaining depth of the unsplit leaf.
    pub fn path_length(&self) -> f64 {
        match self.node_type {
            NodeType::External { size } => self.depth as f64 + average_path_length(size),
            NodeType::Internal { .. } => self.depth as f64,
        }
    }

    /// Child index to visit next
    pub fn traverse(&self, sample: &Sample) -> MLResult<usize> {
        match self.node_type {
            NodeType::Internal {
                feature,
                split_value,
                left,
                right,
            } => {
                let value = sample
                    .get_feature(feature)
                    .ok_or_else(|| MLError::InvalidFeature(format!("sample has no feature {feature}")))?;
                Ok(if value < split_value { left } else { right })
            }
            NodeType::External { .. } => Err(MLError::InvalidConfig("cannot traverse from a leaf".to_string())),
        }
    }
}

/// c(n): average path length of an unsuccessful BST search over `n` points
///
/// Normalizes path lengths into scores and credits unsplit leaves.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * harmonic(n - 1.0) - 2.0 * (n - 1.0) / n
        }
    }
}

/// H(i) ≈ ln(i) + γ
fn harmonic(i: f64) -> f64 {
    i.ln() + EULER
}
