use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::EvalError;

/// Hiperparámetros del ensamble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_trees: usize,
    /// `None` = crecer hasta hojas puras
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Node {
    /// Fracción de muestras de cada clase que llegaron a la hoja
    Leaf { distribution: Vec<f64> },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Árbol CART (Gini) guardado como arreglo plano; la raíz es el nodo 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [usize],
    n_classes: usize,
    max_features: usize,
    params: &'a ForestParams,
    nodes: Vec<Node>,
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let t = total as f64;
    1.0 - counts.iter().map(|&c| (c as f64 / t).powi(2)).sum::<f64>()
}

impl<'a> TreeBuilder<'a> {
    fn class_counts(&self, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &i in indices {
            counts[self.y[i]] += 1;
        }
        counts
    }

    fn build(&mut self, indices: &[usize], depth: usize, rng: &mut StdRng) -> usize {
        let counts = self.class_counts(indices);
        let node_idx = self.nodes.len();
        let total = indices.len();

        let is_pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let depth_reached = self.params.max_depth.map(|d| depth >= d).unwrap_or(false);

        let split = if is_pure || depth_reached || total < self.params.min_samples_split {
            None
        } else {
            self.best_split(indices, &counts, rng)
        };

        let Some(split) = split else {
            let distribution = counts.iter().map(|&c| c as f64 / total as f64).collect();
            self.nodes.push(Node::Leaf { distribution });
            return node_idx;
        };

        // Reservar el nodo antes de construir los hijos
        self.nodes.push(Node::Leaf {
            distribution: Vec::new(),
        });

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .copied()
            .partition(|&i| self.x[i][split.feature] <= split.threshold);

        let left = self.build(&left_idx, depth + 1, rng);
        let right = self.build(&right_idx, depth + 1, rng);

        self.nodes[node_idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_idx
    }

    /// Recorre las características en orden aleatorio y evalúa como máximo
    /// `max_features` que no sean constantes en el nodo.
    fn best_split(
        &self,
        indices: &[usize],
        counts: &[usize],
        rng: &mut StdRng,
    ) -> Option<SplitCandidate> {
        let n_features = self.x[indices[0]].len();
        let mut features: Vec<usize> = (0..n_features).collect();
        features.shuffle(rng);

        let total = indices.len();
        let mut best: Option<SplitCandidate> = None;
        let mut visited = 0;

        for feature in features {
            if visited >= self.max_features {
                break;
            }

            let mut pairs: Vec<(f64, usize)> = indices
                .iter()
                .map(|&i| (self.x[i][feature], self.y[i]))
                .collect();
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

            if pairs[0].0 == pairs[total - 1].0 {
                continue;
            }
            visited += 1;

            let mut left = vec![0; self.n_classes];
            let mut right = counts.to_vec();
            for k in 0..total - 1 {
                let (value, label) = pairs[k];
                left[label] += 1;
                right[label] -= 1;

                let next = pairs[k + 1].0;
                if value == next {
                    continue;
                }

                let n_left = k + 1;
                let n_right = total - n_left;
                let weighted = n_left as f64 * gini(&left, n_left)
                    + n_right as f64 * gini(&right, n_right);
                let impurity = weighted / total as f64;

                if best.as_ref().map(|b| impurity < b.impurity).unwrap_or(true) {
                    let mut threshold = value + (next - value) / 2.0;
                    if threshold >= next || !threshold.is_finite() {
                        threshold = value;
                    }
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        impurity,
                    });
                }
            }
        }

        best
    }
}

impl DecisionTree {
    fn predict_proba(&self, row: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { distribution } => return distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

/// Ensamble de árboles con bootstrap y submuestreo de características
/// (sqrt(n) por nodo). La semilla fija hace el entrenamiento reproducible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    n_classes: usize,
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// `y` contiene índices de clase en `0..n_classes`
    pub fn fit(
        x: &[Vec<f64>],
        y: &[usize],
        n_classes: usize,
        params: &ForestParams,
    ) -> Result<Self, EvalError> {
        if x.is_empty() || n_classes == 0 {
            return Err(EvalError::EmptyTrainingSet);
        }
        if x.len() != y.len() {
            return Err(EvalError::InvalidFeatureSize {
                expected: x.len(),
                actual: y.len(),
            });
        }
        let n_features = x[0].len();
        if let Some(bad) = x.iter().find(|row| row.len() != n_features) {
            return Err(EvalError::InvalidFeatureSize {
                expected: n_features,
                actual: bad.len(),
            });
        }
        if y.iter().any(|&label| label >= n_classes) {
            return Err(EvalError::InvalidConfig(format!(
                "etiqueta fuera de rango (n_classes = {})",
                n_classes
            )));
        }

        let max_features = ((n_features as f64).sqrt().ceil() as usize).max(1);
        let mut rng = StdRng::seed_from_u64(params.seed);
        let n = x.len();

        let mut trees = Vec::with_capacity(params.n_trees.max(1));
        for _ in 0..params.n_trees.max(1) {
            let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let mut builder = TreeBuilder {
                x,
                y,
                n_classes,
                max_features,
                params,
                nodes: Vec::new(),
            };
            builder.build(&sample, 0, &mut rng);
            trees.push(DecisionTree {
                nodes: builder.nodes,
            });
        }

        log::debug!(
            "Bosque entrenado: {} árboles, {} características, {} clases",
            trees.len(),
            n_features,
            n_classes
        );

        Ok(Self {
            n_classes,
            n_features,
            trees,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Promedio de las distribuciones de hoja de todos los árboles
    pub fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>, EvalError> {
        if row.len() != self.n_features {
            return Err(EvalError::InvalidFeatureSize {
                expected: self.n_features,
                actual: row.len(),
            });
        }

        let mut proba = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (acc, p) in proba.iter_mut().zip(tree.predict_proba(row)) {
                *acc += p;
            }
        }
        let n = self.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= n);
        Ok(proba)
    }
}

/// Índice de la clase más probable; en empate gana el índice menor
pub fn best_class(proba: &[f64]) -> usize {
    let mut best = 0;
    for (i, &p) in proba.iter().enumerate() {
        if p > proba[best] {
            best = i;
        }
    }
    best
}
