/// Regression Model Module
///
/// Bagged ensemble of regression trees plus the persisted bundle wrapping it.
/// Trees are fitted by recursive variance-minimizing splits; the ensemble
/// averages per-tree predictions. The whole model is serde-serializable so a
/// bundle written after training can be reloaded byte-for-byte at startup.
use crate::error::AppError;
use crate::models::TrainingMetrics;
use ndarray::{Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Splitting stops once a node holds fewer than twice this many rows.
const MIN_LEAF_SAMPLES: usize = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Single regression tree, nodes stored in an arena with the root at index 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    fn fit(x: &ArrayView2<f64>, y: &[f64], idx: &[usize], max_depth: usize) -> Self {
        let mut nodes = Vec::new();
        Self::grow(&mut nodes, x, y, idx, 0, max_depth);
        Self { nodes }
    }

    /// Grow the subtree for `idx`, returning its arena index.
    fn grow(
        nodes: &mut Vec<TreeNode>,
        x: &ArrayView2<f64>,
        y: &[f64],
        idx: &[usize],
        depth: usize,
        max_depth: usize,
    ) -> usize {
        let mean = if idx.is_empty() {
            0.0
        } else {
            idx.iter().map(|&i| y[i]).sum::<f64>() / idx.len() as f64
        };

        let split = if depth >= max_depth || idx.len() < 2 * MIN_LEAF_SAMPLES {
            None
        } else {
            best_split(x, y, idx)
        };

        let Some((feature, threshold)) = split else {
            nodes.push(TreeNode::Leaf { value: mean });
            return nodes.len() - 1;
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = idx
            .iter()
            .copied()
            .partition(|&i| x[[i, feature]] <= threshold);
        if left_idx.is_empty() || right_idx.is_empty() {
            nodes.push(TreeNode::Leaf { value: mean });
            return nodes.len() - 1;
        }

        // Reserve the slot before the children so the root stays at index 0.
        let node_idx = nodes.len();
        nodes.push(TreeNode::Leaf { value: mean });

        let left = Self::grow(nodes, x, y, &left_idx, depth + 1, max_depth);
        let right = Self::grow(nodes, x, y, &right_idx, depth + 1, max_depth);

        nodes[node_idx] = TreeNode::Split {
            feature,
            threshold,
            left,
            right,
        };
        node_idx
    }

    fn predict_row(&self, row: &[f64]) -> f64 {
        let mut current = 0;
        loop {
            match &self.nodes[current] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    current = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// Find the (feature, threshold) split minimizing the summed squared error of
/// the two resulting partitions. Returns `None` when no feature separates the
/// rows (all values equal) or the labels carry no variance worth splitting.
fn best_split(x: &ArrayView2<f64>, y: &[f64], idx: &[usize]) -> Option<(usize, f64)> {
    let n = idx.len();
    let total_sum: f64 = idx.iter().map(|&i| y[i]).sum();
    let total_sq: f64 = idx.iter().map(|&i| y[i] * y[i]).sum();

    // Labels already homogeneous: splitting cannot improve anything.
    if total_sq - total_sum * total_sum / n as f64 <= f64::EPSILON {
        return None;
    }

    let mut best: Option<(usize, f64, f64)> = None;

    for feature in 0..x.ncols() {
        let mut order = idx.to_vec();
        order.sort_by(|&a, &b| {
            x[[a, feature]]
                .partial_cmp(&x[[b, feature]])
                .unwrap_or(Ordering::Equal)
        });

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for split in 1..n {
            let prev = order[split - 1];
            left_sum += y[prev];
            left_sq += y[prev] * y[prev];

            // A threshold must fall strictly between two distinct values.
            if x[[prev, feature]] == x[[order[split], feature]] {
                continue;
            }

            let left_n = split as f64;
            let right_n = (n - split) as f64;
            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let sse = (left_sq - left_sum * left_sum / left_n)
                + (right_sq - right_sum * right_sum / right_n);

            if best.map_or(true, |(_, _, best_sse)| sse < best_sse) {
                let threshold = (x[[prev, feature]] + x[[order[split], feature]]) / 2.0;
                best = Some((feature, threshold, sse));
            }
        }
    }

    best.map(|(feature, threshold, _)| (feature, threshold))
}

/// Bagged regression forest.
///
/// Each tree is fitted on a bootstrap sample drawn with a seeded RNG, so the
/// same (data, seed) pair always produces the same ensemble.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestRegressor {
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl ForestRegressor {
    pub fn fit(x: &Array2<f64>, y: &[f64], n_trees: usize, max_depth: usize, seed: u64) -> Self {
        let n = x.nrows();
        let view = x.view();
        let mut rng = StdRng::seed_from_u64(seed);

        let trees = (0..n_trees)
            .map(|_| {
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(&view, y, &sample, max_depth)
            })
            .collect();

        Self {
            trees,
            n_features: x.ncols(),
        }
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Predict a raw score for one feature vector.
    pub fn predict(&self, features: &[f64]) -> Result<f64, AppError> {
        if features.len() != self.n_features {
            return Err(AppError::Inference(format!(
                "Expected {} features, got {}",
                self.n_features,
                features.len()
            )));
        }
        if self.trees.is_empty() {
            return Err(AppError::Inference("Model has no trees".to_string()));
        }

        let sum: f64 = self.trees.iter().map(|t| t.predict_row(features)).sum();
        Ok(sum / self.trees.len() as f64)
    }
}

/// Bag-of-words text vectorizer with per-term idf weights.
///
/// Bundle schema capacity for a text-feature mode: when a bundle carries one,
/// inference runs "question answer" through it instead of the numeric
/// features. The current training pipeline never populates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl TextVectorizer {
    pub fn new(vocabulary: HashMap<String, usize>, idf: Vec<f64>) -> Self {
        Self { vocabulary, idf }
    }

    pub fn transform(&self, text: &str) -> Vec<f64> {
        let mut vector = vec![0.0; self.idf.len()];
        for token in text.to_lowercase().split_whitespace() {
            if let Some(&i) = self.vocabulary.get(token) {
                vector[i] += 1.0;
            }
        }
        for (value, idf) in vector.iter_mut().zip(&self.idf) {
            *value *= idf;
        }
        vector
    }
}

/// The unit of model persistence: regressor, optional vectorizer, metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundle {
    pub regressor: ForestRegressor,
    pub vectorizer: Option<TextVectorizer>,
    pub metrics: TrainingMetrics,
}

impl ModelBundle {
    /// Read a bundle from disk.
    ///
    /// A missing file is a normal state (the service has not been trained
    /// yet) and an unreadable or undecodable file must never take the
    /// serving process down; both come back as `None` and callers fall back
    /// to heuristic scoring.
    pub fn load<P: AsRef<Path>>(path: P) -> Option<Self> {
        let path = path.as_ref();

        if !path.exists() {
            warn!(
                "Model not found at {}. Using fallback scoring.",
                path.display()
            );
            return None;
        }

        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                warn!("Error reading model file {}: {}", path.display(), e);
                return None;
            }
        };

        match bincode::deserialize::<ModelBundle>(&data) {
            Ok(bundle) => {
                info!(
                    samples = bundle.metrics.samples,
                    "Model loaded from {}",
                    path.display()
                );
                Some(bundle)
            }
            Err(e) => {
                warn!("Error decoding model file {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Write the bundle to disk, creating parent directories as needed.
    ///
    /// Writes to a temp file and renames over the target so a concurrent
    /// reload never observes a torn bundle.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), AppError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| AppError::Persistence(format!("create {}: {e}", parent.display())))?;
            }
        }

        let data = bincode::serialize(self)
            .map_err(|e| AppError::Persistence(format!("encode bundle: {e}")))?;

        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &data)
            .map_err(|e| AppError::Persistence(format!("write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, path)
            .map_err(|e| AppError::Persistence(format!("rename into {}: {e}", path.display())))?;

        info!("Model saved to {}", path.display());
        Ok(())
    }
}
