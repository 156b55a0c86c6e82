use candle_core::{IndexOp, Result, Tensor};
use candle_nn as nn;
use candle_nn::Module;

/// One embedding table per categorical column, outputs concatenated.
#[derive(Clone, Debug)]
pub struct CategoricalEmbeddings {
    tables: Vec<nn::Embedding>,
    dim: usize,
}

impl CategoricalEmbeddings {
    /// `cardinalities[j]` includes the reserved unknown code 0.
    pub fn new(cardinalities: &[usize], dim: usize, vb: nn::VarBuilder) -> Result<Self> {
        let tables = cardinalities
            .iter()
            .enumerate()
            .map(|(j, &card)| nn::embedding(card.max(1), dim, vb.pp(format!("col_{}", j))))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { tables, dim })
    }

    pub fn output_dim(&self) -> usize {
        self.tables.len() * self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// `codes` is `(batch, n_columns)` of `u32`.
    pub fn forward(&self, codes: &Tensor) -> Result<Tensor> {
        let parts = self
            .tables
            .iter()
            .enumerate()
            .map(|(j, table)| table.forward(&codes.i((.., j))?.contiguous()?))
            .collect::<Result<Vec<_>>>()?;
        Tensor::cat(&parts, 1)
    }
}

/// Linear layer followed by ReLU.
#[derive(Clone, Debug)]
pub struct DenseRelu {
    linear: nn::Linear,
}

impl DenseRelu {
    pub fn new(in_features: usize, out_features: usize, vb: nn::VarBuilder) -> Result<Self> {
        Ok(Self {
            linear: nn::linear(in_features, out_features, vb)?,
        })
    }
}

impl Module for DenseRelu {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        self.linear.forward(xs)?.relu()
    }
}
