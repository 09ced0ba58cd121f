//! Loss derivatives evaluated at the final ensemble prediction.
//!
//! Derivatives follow the log-likelihood convention used by the leaf-fitting
//! formulas: the first derivative points towards the target (for squared
//! error it is `target - approx`) and is scaled by the document weight.

use std::fmt;
use std::str::FromStr;

use crate::error::ImportanceError;

/// Loss the ensemble was trained with.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum LossFunction {
    /// Squared error.
    Rmse,
    /// Binary log loss on `{0, 1}` targets.
    Logloss,
    /// Log loss on probabilistic targets in `[0, 1]`.
    CrossEntropy,
    /// Pinball loss at level `alpha`.
    Quantile {
        /// Quantile level in (0.0, 1.0).
        alpha: f64,
    },
    /// Absolute error, the 0.5 quantile.
    Mae,
    /// Poisson regression with a log link.
    Poisson,
}

impl LossFunction {
    /// Return the quantile level of a `Quantile` loss after range checking.
    ///
    /// # Errors
    ///
    /// Returns [`ImportanceError::InvalidQuantileAlpha`] when `alpha` is not in (0.0, 1.0).
    pub fn quantile(alpha: f64) -> Result<Self, ImportanceError> {
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(ImportanceError::InvalidQuantileAlpha { alpha });
        }
        Ok(Self::Quantile { alpha })
    }

    fn derivatives(self, approx: f64, target: f64) -> (f64, f64) {
        match self {
            Self::Rmse => (target - approx, -1.0),
            Self::Logloss | Self::CrossEntropy => {
                let p = sigmoid(approx);
                (target - p, -p * (1.0 - p))
            }
            Self::Quantile { alpha } => quantile_derivatives(alpha, approx, target),
            Self::Mae => quantile_derivatives(0.5, approx, target),
            Self::Poisson => {
                let expected = approx.exp();
                (target - expected, -expected)
            }
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn quantile_derivatives(alpha: f64, approx: f64, target: f64) -> (f64, f64) {
    let der1 = if target > approx { alpha } else { -(1.0 - alpha) };
    (der1, 0.0)
}

impl fmt::Display for LossFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rmse => f.write_str("RMSE"),
            Self::Logloss => f.write_str("Logloss"),
            Self::CrossEntropy => f.write_str("CrossEntropy"),
            Self::Quantile { alpha } => write!(f, "Quantile:alpha={alpha}"),
            Self::Mae => f.write_str("MAE"),
            Self::Poisson => f.write_str("Poisson"),
        }
    }
}

impl FromStr for LossFunction {
    type Err = ImportanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ImportanceError::InvalidOption {
            option: "loss function",
            value: s.to_string(),
            expected: "RMSE, Logloss, CrossEntropy, MAE, Poisson, Quantile:alpha=<a>",
        };
        match s {
            "RMSE" => Ok(Self::Rmse),
            "Logloss" => Ok(Self::Logloss),
            "CrossEntropy" => Ok(Self::CrossEntropy),
            "MAE" => Ok(Self::Mae),
            "Poisson" => Ok(Self::Poisson),
            "Quantile" => Self::quantile(0.5),
            other => {
                let alpha = other
                    .strip_prefix("Quantile:alpha=")
                    .ok_or_else(invalid)?
                    .parse::<f64>()
                    .map_err(|_| invalid())?;
                Self::quantile(alpha)
            }
        }
    }
}

/// How leaf values were estimated during training.
///
/// `Newton` steps use second derivatives in the leaf denominators, so the
/// evaluator only computes them for that method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LeafEstimationMethod {
    /// Second-order steps.
    Newton,
    /// First-order steps.
    Gradient,
}

impl fmt::Display for LeafEstimationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Newton => f.write_str("Newton"),
            Self::Gradient => f.write_str("Gradient"),
        }
    }
}

impl FromStr for LeafEstimationMethod {
    type Err = ImportanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Newton" => Ok(Self::Newton),
            "Gradient" => Ok(Self::Gradient),
            _ => Err(ImportanceError::InvalidOption {
                option: "leaf estimation method",
                value: s.to_string(),
                expected: "Newton, Gradient",
            }),
        }
    }
}

/// Evaluate weighted loss derivatives at `approxes` for every pool document.
///
/// `first` receives first derivatives. `second`, when provided, receives
/// second derivatives for [`LeafEstimationMethod::Newton`] and is left
/// untouched for [`LeafEstimationMethod::Gradient`].
///
/// # Panics
///
/// Panics if `approxes`, `targets`, `weights`, `first` (and `second`, if
/// given) differ in length.
pub fn evaluate_derivatives(
    loss: LossFunction,
    method: LeafEstimationMethod,
    approxes: &[f64],
    targets: &[f64],
    weights: &[f64],
    first: &mut [f64],
    second: Option<&mut [f64]>,
) {
    assert_eq!(approxes.len(), targets.len());
    assert_eq!(approxes.len(), weights.len());
    assert_eq!(approxes.len(), first.len());

    let second = match (method, second) {
        (LeafEstimationMethod::Newton, Some(s)) => {
            assert_eq!(approxes.len(), s.len());
            Some(s)
        }
        _ => None,
    };

    match second {
        Some(second) => {
            for (i, ((&approx, &target), &weight)) in
                approxes.iter().zip(targets).zip(weights).enumerate()
            {
                let (der1, der2) = loss.derivatives(approx, target);
                first[i] = weight * der1;
                second[i] = weight * der2;
            }
        }
        None => {
            for (i, ((&approx, &target), &weight)) in
                approxes.iter().zip(targets).zip(weights).enumerate()
            {
                first[i] = weight * loss.derivatives(approx, target).0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn rmse_points_towards_target() {
        let mut first = vec![0.0; 2];
        let mut second = vec![0.0; 2];
        evaluate_derivatives(
            LossFunction::Rmse,
            LeafEstimationMethod::Newton,
            &[1.0, 3.0],
            &[2.0, 1.0],
            &[1.0, 2.0],
            &mut first,
            Some(&mut second),
        );
        assert_eq!(first, vec![1.0, -4.0]);
        assert_eq!(second, vec![-1.0, -2.0]);
    }

    #[test]
    fn gradient_method_skips_second_derivatives() {
        let mut first = vec![0.0; 1];
        let mut second = vec![7.0; 1];
        evaluate_derivatives(
            LossFunction::Rmse,
            LeafEstimationMethod::Gradient,
            &[0.0],
            &[1.0],
            &[1.0],
            &mut first,
            Some(&mut second),
        );
        assert_eq!(first, vec![1.0]);
        assert_eq!(second, vec![7.0]);
    }

    #[test]
    fn logloss_at_zero_approx() {
        let mut first = vec![0.0; 2];
        evaluate_derivatives(
            LossFunction::Logloss,
            LeafEstimationMethod::Gradient,
            &[0.0, 0.0],
            &[1.0, 0.0],
            &[1.0, 1.0],
            &mut first,
            None,
        );
        assert_abs_diff_eq!(first[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(first[1], -0.5, epsilon = 1e-12);
    }

    #[test]
    fn quantile_is_piecewise_constant() {
        let mut first = vec![0.0; 2];
        evaluate_derivatives(
            LossFunction::quantile(0.8).unwrap(),
            LeafEstimationMethod::Gradient,
            &[0.0, 0.0],
            &[1.0, -1.0],
            &[1.0, 1.0],
            &mut first,
            None,
        );
        assert_abs_diff_eq!(first[0], 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(first[1], -0.2, epsilon = 1e-12);
    }

    #[test]
    fn poisson_uses_log_link() {
        let mut first = vec![0.0; 1];
        evaluate_derivatives(
            LossFunction::Poisson,
            LeafEstimationMethod::Gradient,
            &[0.0],
            &[3.0],
            &[1.0],
            &mut first,
            None,
        );
        assert_abs_diff_eq!(first[0], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn parse_losses() {
        assert_eq!("RMSE".parse::<LossFunction>().unwrap(), LossFunction::Rmse);
        assert_eq!("MAE".parse::<LossFunction>().unwrap(), LossFunction::Mae);
        assert_eq!(
            "Quantile:alpha=0.25".parse::<LossFunction>().unwrap(),
            LossFunction::Quantile { alpha: 0.25 }
        );
        assert!(matches!(
            "Quantile:alpha=1.5".parse::<LossFunction>(),
            Err(ImportanceError::InvalidQuantileAlpha { .. })
        ));
        assert!(matches!(
            "Hinge".parse::<LossFunction>(),
            Err(ImportanceError::InvalidOption { .. })
        ));
    }

    #[test]
    fn display_round_trips() {
        for loss in [
            LossFunction::Rmse,
            LossFunction::Logloss,
            LossFunction::CrossEntropy,
            LossFunction::Mae,
            LossFunction::Poisson,
            LossFunction::Quantile { alpha: 0.3 },
        ] {
            assert_eq!(loss.to_string().parse::<LossFunction>().unwrap(), loss);
        }
        assert_eq!(
            "Gradient".parse::<LeafEstimationMethod>().unwrap(),
            LeafEstimationMethod::Gradient
        );
    }
}
