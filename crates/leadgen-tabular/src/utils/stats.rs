/// A single phase of an epoch: training or validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingPhase {
    Train,
    Validation,
}

/// Per-epoch training record in a Struct of Arrays layout.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct TrainingHistory {
    pub epochs: Vec<usize>,
    pub phases: Vec<TrainingPhase>,
    pub losses: Vec<Option<f32>>,
    pub accuracies: Vec<Option<f32>>,
    /// Epoch whose weights were kept.
    pub best_epoch: Option<usize>,
}

impl TrainingHistory {
    pub fn record(&mut self, epoch: usize, phase: TrainingPhase, loss: Option<f32>, accuracy: Option<f32>) {
        self.epochs.push(epoch);
        self.phases.push(phase);
        self.losses.push(loss);
        self.accuracies.push(accuracy);
    }

    /// Number of distinct epochs recorded.
    pub fn n_epochs(&self) -> usize {
        let mut epochs = self.epochs.clone();
        epochs.dedup();
        epochs.len()
    }

    /// Validation accuracy of the kept epoch.
    pub fn best_accuracy(&self) -> Option<f32> {
        let best = self.best_epoch?;
        self.epochs
            .iter()
            .zip(&self.phases)
            .zip(&self.accuracies)
            .find(|((&e, &p), _)| e == best && p == TrainingPhase::Validation)
            .and_then(|(_, acc)| *acc)
    }
}

/// Fraction of predictions equal to the labels; 0 for empty input.
pub fn accuracy(predicted: &[usize], labels: &[usize]) -> f32 {
    if labels.is_empty() {
        return 0.0;
    }
    let correct = predicted.iter().zip(labels).filter(|(p, l)| p == l).count();
    correct as f32 / labels.len() as f32
}
