use anyhow::Result;
use ndarray::Array2;

/// Contract shared by the binary classifiers behind both scoring wrappers.
/// Labels are 0/1; probabilities are for the positive class.
pub trait ClassifierModel: Send + Sync {
    /// Fit the model. The optional evaluation set drives early stopping for
    /// models that support it.
    fn fit(
        &mut self,
        x: &Array2<f64>,
        y: &[usize],
        x_eval: Option<&Array2<f64>>,
        y_eval: Option<&[usize]>,
    ) -> Result<()>;

    /// Positive-class probability per row.
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Vec<f64>>;

    /// Hard labels; 1 iff the positive probability exceeds one half.
    fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>> {
        Ok(self
            .predict_proba(x)?
            .into_iter()
            .map(|p| usize::from(p > 0.5))
            .collect())
    }

    /// Optional human readable name for the model
    fn name(&self) -> &str {
        "classifier"
    }
}
