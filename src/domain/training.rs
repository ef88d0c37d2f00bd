//! Offline predictor training: sliding-window normalized examples and a
//! linear autoregressive model fitted by gradient descent.
//!
//! Decoupled from the live trading loop; consumes stored history only.

use super::error::IgTraderError;
use super::market::PriceRecord;
use serde::{Deserialize, Serialize};

/// Input window length: 30 consecutive normalized closes predict the next.
pub const WINDOW: usize = 30;
/// Upper bound on training epochs.
pub const MAX_EPOCHS: usize = 2000;
/// Early-stop threshold on mean squared error.
pub const ERROR_THRESHOLD: f64 = 1e-4;
/// Gradient descent step size.
pub const LEARNING_RATE: f64 = 0.05;

/// Min/max bounds used to rescale closes into [0, 1]. Persisted alongside
/// the model so an inference consumer can undo the scaling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scaling {
    pub min: f64,
    pub max: f64,
}

impl Scaling {
    /// Global bounds over `values`. None when the slice is empty.
    pub fn fit(values: &[f64]) -> Option<Self> {
        let first = *values.first()?;
        let (min, max) = values
            .iter()
            .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        Some(Self { min, max })
    }

    pub fn normalize(&self, x: f64) -> f64 {
        let range = self.max - self.min;
        if range == 0.0 {
            return 0.0;
        }
        (x - self.min) / range
    }

    pub fn denormalize(&self, y: f64) -> f64 {
        self.min + y * (self.max - self.min)
    }
}

/// One supervised pair: a fixed-length window of normalized closes and the
/// value that immediately follows it.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingExample {
    pub input: Vec<f64>,
    pub output: f64,
}

/// Overlapping windows over `values`, each paired with its successor.
pub fn build_examples(values: &[f64], window: usize) -> Vec<TrainingExample> {
    if values.len() <= window {
        return Vec::new();
    }
    (0..values.len() - window)
        .map(|i| TrainingExample {
            input: values[i..i + window].to_vec(),
            output: values[i + window],
        })
        .collect()
}

/// Flatten every record's points into one globally chronological close
/// sequence.
pub fn flatten_closes(records: &[PriceRecord]) -> Vec<f64> {
    let mut points: Vec<(chrono::NaiveDateTime, f64)> = records
        .iter()
        .flat_map(|r| r.points.iter().map(|p| (p.timestamp, p.close)))
        .collect();
    points.sort_by_key(|(ts, _)| *ts);
    points.into_iter().map(|(_, close)| close).collect()
}

/// Linear autoregressive predictor: one weight per lag plus a bias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predictor {
    pub weights: Vec<f64>,
    pub bias: f64,
}

/// How a fit terminated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitReport {
    pub epochs_run: usize,
    pub final_error: f64,
}

impl Predictor {
    /// Deterministic start: uniform weights averaging the window.
    pub fn new(window: usize) -> Self {
        Self {
            weights: vec![1.0 / window as f64; window],
            bias: 0.0,
        }
    }

    pub fn predict(&self, input: &[f64]) -> f64 {
        let dot: f64 = self
            .weights
            .iter()
            .zip(input)
            .map(|(w, x)| w * x)
            .sum();
        dot + self.bias
    }

    /// Batch gradient descent on mean squared error, at most `max_epochs`
    /// epochs, stopping early once the error drops below `threshold`.
    pub fn fit(
        &mut self,
        examples: &[TrainingExample],
        max_epochs: usize,
        learning_rate: f64,
        threshold: f64,
    ) -> FitReport {
        let n = examples.len() as f64;
        let mut report = FitReport {
            epochs_run: 0,
            final_error: f64::INFINITY,
        };

        for epoch in 1..=max_epochs {
            let mut grad_w = vec![0.0; self.weights.len()];
            let mut grad_b = 0.0;
            let mut squared = 0.0;

            for example in examples {
                let err = self.predict(&example.input) - example.output;
                squared += err * err;
                for (g, x) in grad_w.iter_mut().zip(&example.input) {
                    *g += err * x;
                }
                grad_b += err;
            }

            for (w, g) in self.weights.iter_mut().zip(&grad_w) {
                *w -= learning_rate * g / n;
            }
            self.bias -= learning_rate * grad_b / n;

            report.epochs_run = epoch;
            report.final_error = squared / n;
            if report.final_error < threshold {
                break;
            }
        }

        report
    }
}

/// Fitted model with its companion scaling bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedModel {
    pub predictor: Predictor,
    pub scaling: Scaling,
    pub report: FitReport,
}

/// Full offline training pass over stored history.
///
/// Errors with [`IgTraderError::NoHistory`] when the store is empty and
/// [`IgTraderError::InsufficientHistory`] when there are too few closes to
/// form a single window.
pub fn train_from_records(records: &[PriceRecord]) -> Result<TrainedModel, IgTraderError> {
    if records.is_empty() {
        return Err(IgTraderError::NoHistory);
    }

    let closes = flatten_closes(records);
    if closes.len() <= WINDOW {
        return Err(IgTraderError::InsufficientHistory {
            points: closes.len(),
            minimum: WINDOW + 1,
        });
    }

    // fit() on a non-empty slice cannot return None.
    let scaling = Scaling::fit(&closes).ok_or(IgTraderError::NoHistory)?;
    let normalized: Vec<f64> = closes.iter().map(|&c| scaling.normalize(c)).collect();
    let examples = build_examples(&normalized, WINDOW);

    let mut predictor = Predictor::new(WINDOW);
    let report = predictor.fit(&examples, MAX_EPOCHS, LEARNING_RATE, ERROR_THRESHOLD);

    Ok(TrainedModel {
        predictor,
        scaling,
        report,
    })
}
