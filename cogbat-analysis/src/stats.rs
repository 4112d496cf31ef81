//! Descriptive statistics over response times. Every function skips missing
//! values and returns NaN when there is nothing to summarise, which the
//! summary sheet prints as `NA`.

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator).
pub fn sd(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

/// Coefficient of variation.
pub fn cov(values: &[f64]) -> f64 {
    sd(values) / mean(values)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ols {
    pub intercept: f64,
    pub slope: f64,
}

impl Ols {
    pub const MISSING: Ols = Ols {
        intercept: f64::NAN,
        slope: f64::NAN,
    };

    /// Least squares fit of RT against a two-level factor coded 0 for the
    /// reference level and 1 for the other. With one dummy regressor the
    /// intercept is the reference mean and the slope the difference of means.
    pub fn treatment(reference: &[f64], other: &[f64]) -> Ols {
        if reference.is_empty() || other.is_empty() {
            return Ols::MISSING;
        }
        let intercept = mean(reference);
        Ols {
            intercept,
            slope: mean(other) - intercept,
        }
    }
}

/// Mean RT of trials that follow an error and of trials that follow a
/// correct response, in that order.
pub fn follow_rts(correct: &[Option<bool>], rt: &[Option<f64>]) -> (f64, f64) {
    let mut after_error = Vec::new();
    let mut after_correct = Vec::new();
    for i in 1..correct.len().min(rt.len()) {
        let Some(value) = rt[i] else { continue };
        match correct[i - 1] {
            Some(false) => after_error.push(value),
            Some(true) => after_correct.push(value),
            None => {}
        }
    }
    (mean(&after_error), mean(&after_correct))
}
