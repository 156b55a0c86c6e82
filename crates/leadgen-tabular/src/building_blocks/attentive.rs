use candle_core::{Result, Tensor, D};
use candle_nn as nn;
use candle_nn::ops::softmax;
use candle_nn::Module;

const PRIOR_EPS: f64 = 1e-6;

/// Produces a soft feature mask from the previous step's attention output,
/// scaled by the prior of how much each feature has been used.
#[derive(Clone, Debug)]
pub struct AttentiveTransformer {
    fc: nn::Linear,
    gamma: f64,
}

impl AttentiveTransformer {
    pub fn new(n_a: usize, n_features: usize, gamma: f64, vb: nn::VarBuilder) -> Result<Self> {
        Ok(Self {
            fc: nn::linear(n_a, n_features, vb.pp("fc"))?,
            gamma,
        })
    }

    /// Returns `(mask, next_prior)`.
    pub fn forward(&self, attention: &Tensor, prior: &Tensor) -> Result<(Tensor, Tensor)> {
        let logits = self.fc.forward(attention)?;
        let log_prior = (prior + PRIOR_EPS)?.log()?;
        let mask = softmax(&(logits + log_prior)?, D::Minus1)?;
        let next_prior = (prior * mask.affine(-1.0, self.gamma)?)?;
        Ok((mask, next_prior))
    }
}

/// One sequential decision step: attend, mask the features, transform.
#[derive(Clone, Debug)]
pub struct DecisionStep {
    attentive: AttentiveTransformer,
    transformer: nn::Linear,
    n_d: usize,
    n_a: usize,
}

impl DecisionStep {
    pub fn new(n_features: usize, n_d: usize, n_a: usize, gamma: f64, vb: nn::VarBuilder) -> Result<Self> {
        Ok(Self {
            attentive: AttentiveTransformer::new(n_a, n_features, gamma, vb.pp("attentive"))?,
            transformer: nn::linear(n_features, n_d + n_a, vb.pp("transformer"))?,
            n_d,
            n_a,
        })
    }

    /// Returns `(decision, attention, next_prior)`; the decision is already ReLU'd.
    pub fn forward(&self, features: &Tensor, attention: &Tensor, prior: &Tensor) -> Result<(Tensor, Tensor, Tensor)> {
        let (mask, next_prior) = self.attentive.forward(attention, prior)?;
        let out = self.transformer.forward(&(features * mask)?)?;
        let decision = out.narrow(1, 0, self.n_d)?.relu()?;
        let attention = out.narrow(1, self.n_d, self.n_a)?;
        Ok((decision, attention, next_prior))
    }
}
