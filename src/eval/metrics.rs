// Accuracy metrics over paired actual/projected arrays.

/// One bundle of regression-accuracy metrics. `f64::NAN` is the undefined
/// sentinel (empty input); it serializes as null in output artifacts.
#[derive(Debug, Clone, Copy)]
pub struct Metrics {
    pub rmse: f64,
    pub mae: f64,
    pub bias: f64,
    pub r_squared: f64,
}

impl Metrics {
    pub fn undefined() -> Self {
        Metrics {
            rmse: f64::NAN,
            mae: f64::NAN,
            bias: f64::NAN,
            r_squared: f64::NAN,
        }
    }
}

/// Compute RMSE, MAE, bias, and floor-clamped R² for projected vs actual.
///
/// Errors are `projected - actual`. With `weights`, every mean becomes a
/// weighted mean and the R² sums are weighted against the weighted mean of
/// `actual`. R² is 0 when the actual values have zero variance (SS_tot = 0)
/// and is never reported below 0.
pub fn compute_metrics(actual: &[f64], projected: &[f64], weights: Option<&[f64]>) -> Metrics {
    debug_assert_eq!(actual.len(), projected.len());
    if actual.is_empty() {
        return Metrics::undefined();
    }

    let errors: Vec<f64> = projected
        .iter()
        .zip(actual)
        .map(|(p, a)| p - a)
        .collect();

    let mae = weighted_mean(errors.iter().map(|e| e.abs()), weights);
    let rmse = weighted_mean(errors.iter().map(|e| e * e), weights).sqrt();
    let bias = weighted_mean(errors.iter().copied(), weights);

    let actual_mean = weighted_mean(actual.iter().copied(), weights);
    let (ss_res, ss_tot) = match weights {
        Some(w) => (
            errors.iter().zip(w).map(|(e, w)| w * e * e).sum::<f64>(),
            actual
                .iter()
                .zip(w)
                .map(|(a, w)| w * (a - actual_mean).powi(2))
                .sum::<f64>(),
        ),
        None => (
            errors.iter().map(|e| e * e).sum::<f64>(),
            actual.iter().map(|a| (a - actual_mean).powi(2)).sum::<f64>(),
        ),
    };

    let r_squared = if ss_tot > 0.0 {
        (1.0 - ss_res / ss_tot).max(0.0)
    } else {
        0.0
    };

    Metrics {
        rmse,
        mae,
        bias,
        r_squared,
    }
}

fn weighted_mean(values: impl Iterator<Item = f64>, weights: Option<&[f64]>) -> f64 {
    match weights {
        Some(w) => {
            let (sum, total) = values
                .zip(w)
                .fold((0.0, 0.0), |(s, t), (v, w)| (s + v * w, t + w));
            sum / total
        }
        None => {
            let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
            sum / n as f64
        }
    }
}
