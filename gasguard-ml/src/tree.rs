//! Isolation tree implementation
//!
//! Trees are built by recursively partitioning a subsample on a random
//! feature at a uniform random split until every point is isolated, all
//! remaining points are identical, or the depth limit is reached.

use serde::{Deserialize, Serialize};

use crate::{MLError, MLResult, Node, NodeType, Rng, Sample};

/// Isolation tree in flat array form; the root is node 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationTree {
    /// Tree nodes, parents before children
    nodes: Vec<Node>,
    /// Depth limit used while building
    max_depth: usize,
}

impl IsolationTree {
    /// Build a tree over `samples`
    pub fn fit(samples: &[Sample], max_depth: usize, rng: &mut Rng) -> MLResult<Self> {
        if samples.is_empty() {
            return Err(MLError::InsufficientData);
        }

        let mut tree = Self {
            nodes: Vec::new(),
            max_depth,
        };
        tree.build(samples, (0..samples.len()).collect(), 0, rng)?;
        Ok(tree)
    }

    fn build(&mut self, samples: &[Sample], indices: Vec<usize>, depth: usize, rng: &mut Rng) -> MLResult<usize> {
        // Reserve this node's slot; replaced below if it splits
        let index = self.nodes.len();
        self.nodes.push(Node::external(indices.len(), depth));

        if depth >= self.max_depth || indices.len() <= 1 {
            return Ok(index);
        }

        let Some((feature, split_value)) = select_split(samples, &indices, rng)? else {
            // All remaining points identical
            return Ok(index);
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| samples[i].features()[feature] < split_value);
        if left.is_empty() || right.is_empty() {
            return Ok(index);
        }

        let left = self.build(samples, left, depth + 1, rng)?;
        let right = self.build(samples, right, depth + 1, rng)?;
        self.nodes[index] = Node::internal(feature, split_value, left, right, depth);

        Ok(index)
    }

    /// Path length of `sample` from the root to its leaf
    pub fn path_length(&self, sample: &Sample) -> MLResult<f64> {
        let mut current = 0;
        loop {
            let node = self.nodes.get(current).ok_or(MLError::NotFitted)?;
            match node.node_type {
                NodeType::External { .. } => return Ok(node.path_length()),
                NodeType::Internal { .. } => current = node.traverse(sample)?,
            }
        }
    }

    /// Check child links of a deserialized tree
    ///
    /// Every child must come after its parent, which rules out cycles.
    pub fn check_structure(&self, num_features: usize) -> MLResult<()> {
        if self.nodes.is_empty() {
            return Err(MLError::NotFitted);
        }
        for (index, node) in self.nodes.iter().enumerate() {
            if let NodeType::Internal {
                feature,
                split_value,
                left,
                right,
            } = node.node_type
            {
                let links_ok = left > index && right > index && left < self.nodes.len() && right < self.nodes.len();
                if !links_ok || feature >= num_features || !split_value.is_finite() {
                    return Err(MLError::InvalidConfig(format!("corrupt tree node {index}")));
                }
            }
        }
        Ok(())
    }

    /// Get the number of nodes in the tree
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Deepest node
    pub fn depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }
}

/// Random feature with spread among `indices`, and a split inside its range
fn select_split(samples: &[Sample], indices: &[usize], rng: &mut Rng) -> MLResult<Option<(usize, f64)>> {
    let num_features = samples[indices[0]].num_features();

    let mut candidates = Vec::with_capacity(num_features);
    for feature in 0..num_features {
        let (min, max) = feature_range(samples, indices, feature)?;
        if max > min {
            candidates.push((feature, min, max));
        }
    }

    if candidates.is_empty() {
        return Ok(None);
    }
    let (feature, min, max) = candidates[rng.next_range(candidates.len())];
    Ok(Some((feature, rng.next_f64_range(min, max))))
}

fn feature_range(samples: &[Sample], indices: &[usize], feature: usize) -> MLResult<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &i in indices {
        let value = samples[i]
            .get_feature(feature)
            .ok_or_else(|| MLError::InvalidFeature(format!("sample {i} has no feature {feature}")))?;
        min = min.min(value);
        max = max.max(value);
    }
    Ok((min, max))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_samples() -> Vec<Sample> {
        vec![
            // Normal samples
            Sample::new(&[20.0, 50.0, 1013.0]).unwrap(),
            Sample::new(&[22.0, 55.0, 1012.0]).unwrap(),
            Sample::new(&[21.0, 52.0, 1014.0]).unwrap(),
            Sample::new(&[19.0, 48.0, 1013.0]).unwrap(),
            // Anomaly
            Sample::new(&[35.0, 90.0, 1000.0]).unwrap(),
        ]
    }

    #[test]
    fn tree_fit() {
        let mut rng = Rng::new(123);
        let tree = IsolationTree::fit(&create_test_samples(), 5, &mut rng).unwrap();

        assert!(tree.node_count() > 0);
        assert!(tree.depth() <= 5);
        assert!(tree.check_structure(3).is_ok());
    }

    #[test]
    fn empty_input_rejected() {
        let mut rng = Rng::new(1);
        assert!(matches!(
            IsolationTree::fit(&[], 5, &mut rng),
            Err(MLError::InsufficientData)
        ));
    }

    #[test]
    fn identical_samples_make_one_leaf() {
        let samples = vec![Sample::new(&[4.0]).unwrap(); 8];
        let tree = IsolationTree::fit(&samples, 10, &mut Rng::new(9)).unwrap();

        assert_eq!(tree.node_count(), 1);
        // Leaf of 8: 0 + c(8)
        let path = tree.path_length(&samples[0]).unwrap();
        assert!((path - crate::average_path_length(8)).abs() < 1e-12);
    }

    #[test]
    fn depth_limit_respected() {
        let samples: Vec<Sample> = (0..64).map(|i| Sample::new(&[i as f64]).unwrap()).collect();
        let tree = IsolationTree::fit(&samples, 3, &mut Rng::new(5)).unwrap();
        assert!(tree.depth() <= 3);
    }

    #[test]
    fn path_length() {
        let samples = create_test_samples();
        let tree = IsolationTree::fit(&samples, 10, &mut Rng::new(42)).unwrap();

        assert!(tree.path_length(&samples[0]).unwrap() > 0.0);
        assert!(tree.path_length(&samples[4]).unwrap() > 0.0);
    }

    #[test]
    fn corrupt_links_detected() {
        let tree = IsolationTree {
            nodes: vec![Node::internal(0, 1.0, 0, 1, 0), Node::external(1, 1)],
            max_depth: 4,
        };
        assert!(tree.check_structure(1).is_err());
    }
}
