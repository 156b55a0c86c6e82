//! TabNet-style network and its training loop.
//!
//! Inputs arrive as one `f64` matrix whose first `n_categorical` columns hold
//! category codes and whose remaining columns hold standardized numerics.
use std::collections::HashMap;

use anyhow::{anyhow, bail, Context, Result};
use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::ops::softmax;
use candle_nn::{Module, Optimizer, VarBuilder, VarMap};
use leadgen_classifiers::models::classifier_trait::ClassifierModel;
use log::{debug, info};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::building_blocks::attentive::DecisionStep;
use crate::building_blocks::nn::{CategoricalEmbeddings, DenseRelu};
use crate::config::AttentionConfig;
use crate::utils::stats::{accuracy, TrainingHistory, TrainingPhase};
use crate::utils::utils::{get_device, restore_weights, seed_weights, snapshot_weights};

const N_CLASSES: usize = 2;

pub struct TabAttentionNet {
    config: AttentionConfig,
    device: Device,
    varmap: VarMap,
    cardinalities: Vec<usize>,
    n_numeric: usize,
    embeddings: CategoricalEmbeddings,
    initial: DenseRelu,
    steps: Vec<DecisionStep>,
    head: candle_nn::Linear,
    history: TrainingHistory,
    fitted: bool,
}

impl TabAttentionNet {
    pub fn new(cardinalities: Vec<usize>, n_numeric: usize, config: AttentionConfig) -> Result<Self> {
        let device = get_device(&config.device)?;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);

        let embeddings = CategoricalEmbeddings::new(&cardinalities, config.embedding_dim, vb.pp("embeddings"))?;
        let n_features = embeddings.output_dim() + n_numeric;
        if n_features == 0 {
            bail!("Attention network needs at least one input feature");
        }
        if config.n_steps == 0 || config.n_d == 0 || config.n_a == 0 {
            bail!("n_steps, n_d and n_a must all be positive");
        }

        let width = config.n_d + config.n_a;
        let initial = DenseRelu::new(n_features, width, vb.pp("initial"))?;
        let steps = (0..config.n_steps)
            .map(|i| {
                DecisionStep::new(n_features, config.n_d, config.n_a, config.gamma, vb.pp(format!("step_{}", i)))
            })
            .collect::<candle_core::Result<Vec<_>>>()?;
        let head = candle_nn::linear(config.n_d, N_CLASSES, vb.pp("head"))?;

        seed_weights(&varmap, config.seed).context("Failed to initialize weights")?;

        Ok(Self {
            config,
            device,
            varmap,
            cardinalities,
            n_numeric,
            embeddings,
            initial,
            steps,
            head,
            history: TrainingHistory::default(),
            fitted: false,
        })
    }

    pub fn history(&self) -> &TrainingHistory {
        &self.history
    }

    pub fn n_inputs(&self) -> usize {
        self.cardinalities.len() + self.n_numeric
    }

    /// Class logits `(batch, 2)`.
    pub fn forward(&self, codes: Option<&Tensor>, numeric: Option<&Tensor>) -> candle_core::Result<Tensor> {
        let mut parts = Vec::with_capacity(2);
        if let Some(codes) = codes {
            parts.push(self.embeddings.forward(codes)?);
        }
        if let Some(numeric) = numeric {
            parts.push(numeric.clone());
        }
        let features = Tensor::cat(&parts, 1)?;

        let hidden = self.initial.forward(&features)?;
        let mut attention = hidden.narrow(1, self.config.n_d, self.config.n_a)?;
        let mut prior = features.ones_like()?;
        let mut aggregated = Tensor::zeros((features.dim(0)?, self.config.n_d), DType::F32, &self.device)?;

        for step in &self.steps {
            let (decision, next_attention, next_prior) = step.forward(&features, &attention, &prior)?;
            aggregated = (aggregated + decision)?;
            attention = next_attention;
            prior = next_prior;
        }
        self.head.forward(&aggregated)
    }

    /// Split the selected rows of `x` into code and numeric tensors.
    fn batch_tensors(&self, x: &Array2<f64>, rows: &[usize]) -> Result<(Option<Tensor>, Option<Tensor>)> {
        let n_cat = self.cardinalities.len();
        let codes = if n_cat > 0 {
            let mut values = Vec::with_capacity(rows.len() * n_cat);
            for &r in rows {
                for (j, &card) in self.cardinalities.iter().enumerate() {
                    let v = x[(r, j)];
                    let code = if v.is_finite() && v >= 0.0 && (v as usize) < card {
                        v as u32
                    } else {
                        0
                    };
                    values.push(code);
                }
            }
            Some(Tensor::from_vec(values, (rows.len(), n_cat), &self.device)?)
        } else {
            None
        };

        let numeric = if self.n_numeric > 0 {
            let mut values = Vec::with_capacity(rows.len() * self.n_numeric);
            for &r in rows {
                for j in n_cat..n_cat + self.n_numeric {
                    let v = x[(r, j)];
                    values.push(if v.is_finite() { v as f32 } else { 0.0 });
                }
            }
            Some(Tensor::from_vec(values, (rows.len(), self.n_numeric), &self.device)?)
        } else {
            None
        };
        Ok((codes, numeric))
    }

    fn check_width(&self, x: &Array2<f64>) -> Result<()> {
        if x.ncols() != self.n_inputs() {
            bail!("Expected {} input columns, got {}", self.n_inputs(), x.ncols());
        }
        Ok(())
    }

    fn proba_rows(&self, x: &Array2<f64>, rows: &[usize]) -> Result<Vec<f64>> {
        let mut out = Vec::with_capacity(rows.len());
        for chunk in rows.chunks(self.config.batch_size.max(1)) {
            let (codes, numeric) = self.batch_tensors(x, chunk)?;
            let logits = self.forward(codes.as_ref(), numeric.as_ref())?;
            let positive = softmax(&logits, 1)?.i((.., 1))?.to_vec1::<f32>()?;
            out.extend(positive.into_iter().map(f64::from));
        }
        Ok(out)
    }

    fn labels_rows(&self, x: &Array2<f64>, rows: &[usize]) -> Result<Vec<usize>> {
        Ok(self
            .proba_rows(x, rows)?
            .into_iter()
            .map(|p| usize::from(p > 0.5))
            .collect())
    }
}

impl ClassifierModel for TabAttentionNet {
    /// Train with AdamW on shuffled mini-batches. When an evaluation set is
    /// given, validation accuracy drives early stopping and the best epoch's
    /// weights are restored; otherwise training accuracy is monitored.
    fn fit(
        &mut self,
        x: &Array2<f64>,
        y: &[usize],
        x_eval: Option<&Array2<f64>>,
        y_eval: Option<&[usize]>,
    ) -> Result<()> {
        self.check_width(x)?;
        if x.nrows() == 0 || x.nrows() != y.len() {
            bail!("Invalid training set: {} rows, {} labels", x.nrows(), y.len());
        }
        let (x_val, y_val) = match (x_eval, y_eval) {
            (Some(xv), Some(yv)) if xv.nrows() > 0 => {
                self.check_width(xv)?;
                if xv.nrows() != yv.len() {
                    bail!("Invalid validation set: {} rows, {} labels", xv.nrows(), yv.len());
                }
                (xv, yv)
            }
            _ => (x, y),
        };

        let targets: Vec<u32> = y.iter().map(|&t| t as u32).collect();
        let val_rows: Vec<usize> = (0..x_val.nrows()).collect();
        let batch_size = self.config.batch_size.max(1);

        let params = candle_nn::ParamsAdamW {
            lr: self.config.learning_rate,
            ..Default::default()
        };
        let mut opt = candle_nn::AdamW::new(self.varmap.all_vars(), params)?;
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut order: Vec<usize> = (0..x.nrows()).collect();

        info!(
            "Training attention network on {} rows ({} validation) for up to {} epochs",
            x.nrows(),
            x_val.nrows(),
            self.config.max_epochs
        );

        let mut history = TrainingHistory::default();
        let mut best: Option<(f32, usize, HashMap<String, Tensor>)> = None;
        let mut epochs_without_improvement = 0;

        for epoch in 0..self.config.max_epochs {
            order.shuffle(&mut rng);
            let mut total_loss = 0.0f32;
            let mut n_batches = 0usize;

            for chunk in order.chunks(batch_size) {
                let (codes, numeric) = self.batch_tensors(x, chunk)?;
                let batch_targets: Vec<u32> = chunk.iter().map(|&i| targets[i]).collect();
                let target = Tensor::from_vec(batch_targets, chunk.len(), &self.device)?;

                let logits = self.forward(codes.as_ref(), numeric.as_ref())?;
                let loss = candle_nn::loss::cross_entropy(&logits, &target)?;
                opt.backward_step(&loss)?;

                total_loss += loss.to_scalar::<f32>()?;
                n_batches += 1;
            }

            let avg_loss = total_loss / n_batches.max(1) as f32;
            let val_acc = accuracy(&self.labels_rows(x_val, &val_rows)?, y_val);
            history.record(epoch, TrainingPhase::Train, Some(avg_loss), None);
            history.record(epoch, TrainingPhase::Validation, None, Some(val_acc));
            debug!(
                "[attention] Epoch {}: avg. batch loss {:.5}, validation accuracy {:.4}",
                epoch, avg_loss, val_acc
            );

            let improved = best.as_ref().map_or(true, |(acc, _, _)| val_acc > *acc);
            if improved {
                best = Some((val_acc, epoch, snapshot_weights(&self.varmap)?));
                epochs_without_improvement = 0;
            } else {
                epochs_without_improvement += 1;
                if epochs_without_improvement >= self.config.patience {
                    info!(
                        "Early stopping at epoch {}; best validation accuracy {:.4}",
                        epoch,
                        best.as_ref().map(|b| b.0).unwrap_or_default()
                    );
                    break;
                }
            }
        }

        if let Some((acc, epoch, weights)) = best {
            restore_weights(&self.varmap, &weights)?;
            history.best_epoch = Some(epoch);
            info!("Restored weights from epoch {} (validation accuracy {:.4})", epoch, acc);
        }
        self.history = history;
        self.fitted = true;
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(anyhow!("Attention network is not trained"));
        }
        self.check_width(x)?;
        let rows: Vec<usize> = (0..x.nrows()).collect();
        self.proba_rows(x, &rows)
    }

    fn name(&self) -> &str {
        "tab_attention"
    }
}
