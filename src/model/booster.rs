use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};

use crate::data::schema::{feature_names, FEATURE_COUNT};

/// One standardized input row.
pub type Row = [f64; FEATURE_COUNT];

// ---------------------------------------------------------------------------
// Hyperparameters
// ---------------------------------------------------------------------------

/// Boosting configuration for the logistic objective.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoosterParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    /// L2 penalty on leaf weights.
    pub reg_lambda: f64,
    /// Minimum hessian sum in each child of a split.
    pub min_child_weight: f64,
    /// Prior probability of the positive class.
    pub base_score: f64,
}

impl Default for BoosterParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 5,
            learning_rate: 0.1,
            reg_lambda: 1.0,
            min_child_weight: 1.0,
            base_score: 0.5,
        }
    }
}

impl BoosterParams {
    pub fn validate(&self) -> Result<(), String> {
        if self.n_estimators == 0 {
            return Err("n_estimators must be at least 1".into());
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(format!("learning_rate must be positive, got {}", self.learning_rate));
        }
        if !(self.reg_lambda.is_finite() && self.reg_lambda >= 0.0) {
            return Err(format!("reg_lambda must be non-negative, got {}", self.reg_lambda));
        }
        if !(self.min_child_weight.is_finite() && self.min_child_weight >= 0.0) {
            return Err(format!(
                "min_child_weight must be non-negative, got {}",
                self.min_child_weight
            ));
        }
        if !(self.base_score > 0.0 && self.base_score < 1.0) {
            return Err(format!("base_score must lie in (0, 1), got {}", self.base_score));
        }
        Ok(())
    }
}

pub fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

fn logit(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

// ---------------------------------------------------------------------------
// Regression tree
// ---------------------------------------------------------------------------

/// Tree node. Rows with `x[feature] < threshold` go `left`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// Flat array of nodes, root at index 0; children always follow their parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Leaf value reached by `x`. Requires a tree that passed [`validate`](Self::validate).
    pub fn predict(&self, x: &Row) -> f64 {
        let mut i = 0;
        loop {
            match self.nodes[i] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => i = if x[feature] < threshold { left } else { right },
                Node::Leaf { value } => return value,
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], i: usize) -> usize {
            match nodes[i] {
                Node::Split { left, right, .. } => 1 + walk(nodes, left).max(walk(nodes, right)),
                Node::Leaf { .. } => 0,
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".into());
        }
        let len = self.nodes.len();
        for (i, node) in self.nodes.iter().enumerate() {
            match *node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if feature >= FEATURE_COUNT {
                        return Err(format!("node {i} splits on unknown feature {feature}"));
                    }
                    if threshold.is_nan() {
                        return Err(format!("node {i} has a NaN threshold"));
                    }
                    for child in [left, right] {
                        if child <= i || child >= len {
                            return Err(format!("node {i} points to invalid child {child}"));
                        }
                    }
                }
                Node::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(format!("leaf {i} has non-finite value {value}"));
                    }
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tree growth (second-order, exact greedy)
// ---------------------------------------------------------------------------

struct Split {
    feature: usize,
    threshold: f64,
}

struct TreeBuilder<'a> {
    x: &'a [Row],
    grad: &'a [f64],
    hess: &'a [f64],
    params: &'a BoosterParams,
    nodes: Vec<Node>,
}

impl TreeBuilder<'_> {
    fn build(mut self) -> Tree {
        let all: Vec<usize> = (0..self.x.len()).collect();
        self.grow(all, 0);
        Tree { nodes: self.nodes }
    }

    /// Grow the subtree over `rows` and return the index of its root.
    fn grow(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let g: f64 = rows.iter().map(|&i| self.grad[i]).sum();
        let h: f64 = rows.iter().map(|&i| self.hess[i]).sum();

        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { value: 0.0 });

        if depth < self.params.max_depth {
            if let Some(split) = self.best_split(&rows, g, h) {
                let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                    .iter()
                    .copied()
                    .partition(|&i| self.x[i][split.feature] < split.threshold);
                let left = self.grow(left_rows, depth + 1);
                let right = self.grow(right_rows, depth + 1);
                self.nodes[id] = Node::Split {
                    feature: split.feature,
                    threshold: split.threshold,
                    left,
                    right,
                };
                return id;
            }
        }

        let weight = -g / (h + self.params.reg_lambda);
        self.nodes[id] = Node::Leaf {
            value: self.params.learning_rate * weight,
        };
        id
    }

    /// Highest positive-gain split over all features and thresholds.
    /// Earlier features and lower thresholds win ties.
    fn best_split(&self, rows: &[usize], g: f64, h: f64) -> Option<Split> {
        let lambda = self.params.reg_lambda;
        let min_child = self.params.min_child_weight;
        let parent_score = g * g / (h + lambda);

        let mut best: Option<Split> = None;
        let mut best_gain = 0.0;
        let mut order = rows.to_vec();

        for feature in 0..FEATURE_COUNT {
            order.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));

            let (mut gl, mut hl) = (0.0, 0.0);
            for k in 0..order.len().saturating_sub(1) {
                let i = order[k];
                gl += self.grad[i];
                hl += self.hess[i];

                let here = self.x[i][feature];
                let next = self.x[order[k + 1]][feature];
                if here == next {
                    continue;
                }
                let (gr, hr) = (g - gl, h - hl);
                if hl < min_child || hr < min_child {
                    continue;
                }

                let gain = 0.5 * (gl * gl / (hl + lambda) + gr * gr / (hr + lambda) - parent_score);
                if gain > best_gain {
                    best_gain = gain;
                    best = Some(Split {
                        feature,
                        threshold: here + (next - here) / 2.0,
                    });
                }
            }
        }
        best
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Binary classifier: sigmoid of the base margin plus the sum of tree leaves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedClassifier {
    feature_names: Vec<String>,
    params: BoosterParams,
    trees: Vec<Tree>,
}

impl GradientBoostedClassifier {
    /// Assemble a classifier over the schema from already-grown trees.
    pub fn from_trees(params: BoosterParams, trees: Vec<Tree>) -> Self {
        Self {
            feature_names: feature_names(),
            params,
            trees,
        }
    }

    /// Fit `params.n_estimators` trees on standardized rows against 0/1 labels.
    pub fn fit(x: &[Row], y: &[f64], params: &BoosterParams) -> Result<Self> {
        params.validate().map_err(|e| anyhow!("invalid booster parameters: {e}"))?;
        if x.is_empty() {
            bail!("cannot fit a classifier on an empty table");
        }
        if x.len() != y.len() {
            bail!("{} rows but {} labels", x.len(), y.len());
        }

        let n = x.len();
        let mut margins = vec![logit(params.base_score); n];
        let mut grad = vec![0.0; n];
        let mut hess = vec![0.0; n];
        let mut trees = Vec::with_capacity(params.n_estimators);

        for round in 0..params.n_estimators {
            for i in 0..n {
                let p = sigmoid(margins[i]);
                grad[i] = p - y[i];
                hess[i] = p * (1.0 - p);
            }

            let tree = TreeBuilder {
                x,
                grad: &grad,
                hess: &hess,
                params,
                nodes: Vec::new(),
            }
            .build();

            for (m, row) in margins.iter_mut().zip(x) {
                *m += tree.predict(row);
            }
            log::debug!(
                "round {}/{}: {} nodes, depth {}",
                round + 1,
                params.n_estimators,
                tree.nodes.len(),
                tree.depth()
            );
            trees.push(tree);
        }

        Ok(Self::from_trees(*params, trees))
    }

    /// Raw log-odds for one standardized row.
    pub fn margin(&self, x: &Row) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.predict(x)).sum();
        logit(self.params.base_score) + sum
    }

    /// `P(label = 1)` for one standardized row.
    pub fn predict_proba(&self, x: &Row) -> f64 {
        sigmoid(self.margin(x))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.feature_names != feature_names() {
            return Err(format!(
                "feature names {:?} do not match the schema {:?}",
                self.feature_names,
                feature_names()
            ));
        }
        self.params.validate()?;
        if self.trees.is_empty() {
            return Err("classifier has no trees".into());
        }
        for (t, tree) in self.trees.iter().enumerate() {
            tree.validate().map_err(|e| format!("tree {t}: {e}"))?;
        }
        Ok(())
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn params(&self) -> &BoosterParams {
        &self.params
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }
}
