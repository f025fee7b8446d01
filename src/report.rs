//! Agreement metrics between analytic and empirical moments.
//!
//! Tensors are compared by the Frobenius norm of their difference, the
//! volume statistic by its signed difference from 2/81, its relative error
//! and, when the run has more than one trial, a z-score against the Monte
//! Carlo standard error.

use std::fmt;

use serde::Serialize;

use crate::error::Result;
use crate::estimator::{EmpiricalMoments, EstimatorConfig, MonteCarloEstimator};
use crate::tensor::AnalyticMoments;

/// Deviation metrics for one run. Pure function of its inputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    /// `‖M2_emp − M2‖_F`
    pub m2_frobenius: f64,
    /// `‖M4_emp − M4‖_F`
    pub m4_frobenius: f64,
    pub volume_empirical: f64,
    pub volume_analytic: f64,
    /// `empirical − analytic`
    pub volume_difference: f64,
    /// `|difference| / analytic`
    pub volume_relative_error: f64,
    /// `difference / standard error`, when a standard error exists.
    pub volume_z_score: Option<f64>,
}

impl ComparisonReport {
    /// Compares an empirical run against the analytic moments.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if the rank-2 tensors have different
    /// dimensions.
    ///
    /// # Examples
    /// ```
    /// use sphere_moments::estimator::run;
    /// use sphere_moments::report::ComparisonReport;
    /// use sphere_moments::tensor::AnalyticMoments;
    ///
    /// let empirical = run(20_000, Some(1)).unwrap();
    /// let report = ComparisonReport::compare(&empirical, &AnalyticMoments::sphere3()).unwrap();
    /// assert!(report.m2_frobenius < 0.05);
    /// ```
    pub fn compare(empirical: &EmpiricalMoments, analytic: &AnalyticMoments) -> Result<Self> {
        let m2_frobenius = empirical.m2.frobenius_distance(&analytic.m2)?;
        let m4_frobenius = empirical.m4.frobenius_distance(&analytic.m4);
        let volume_difference = empirical.mean_squared_volume - analytic.mean_squared_volume;
        let volume_relative_error = volume_difference.abs() / analytic.mean_squared_volume;
        let volume_z_score = empirical
            .volume_std_error
            .filter(|se| *se > 0.0)
            .map(|se| volume_difference / se);
        Ok(Self {
            m2_frobenius,
            m4_frobenius,
            volume_empirical: empirical.mean_squared_volume,
            volume_analytic: analytic.mean_squared_volume,
            volume_difference,
            volume_relative_error,
            volume_z_score,
        })
    }
}

/// Everything the reporting layer needs: analytic moments, empirical
/// moments and the metrics derived from them.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub analytic: AnalyticMoments,
    pub empirical: EmpiricalMoments,
    pub comparison: ComparisonReport,
}

impl Summary {
    /// Builds the comparison and bundles it with its inputs.
    pub fn new(analytic: AnalyticMoments, empirical: EmpiricalMoments) -> Result<Self> {
        let comparison = ComparisonReport::compare(&empirical, &analytic)?;
        Ok(Self {
            analytic,
            empirical,
            comparison,
        })
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Summary {
            analytic,
            empirical,
            comparison,
        } = self;
        writeln!(f, "Samples: {}", empirical.n_samples)?;
        writeln!(f, "Seed: {} (workers: {})", empirical.seed, empirical.workers)?;

        writeln!(f)?;
        writeln!(f, "Second moment E[r_i r_j]")?;
        writeln!(f, "Empirical:")?;
        writeln!(f, "{}", empirical.m2)?;
        writeln!(f, "Theoretical δ_ij / 3:")?;
        writeln!(f, "{}", analytic.m2)?;
        writeln!(f, "||Empirical - Theory||_F = {:.6e}", comparison.m2_frobenius)?;

        writeln!(f)?;
        writeln!(f, "Fourth moment E[r_i r_j r_k r_l]")?;
        writeln!(f, "Empirical M4[0,0,:,:]:")?;
        writeln!(f, "{}", empirical.m4.slice(0, 0))?;
        writeln!(f, "Theoretical M4[0,0,:,:]:")?;
        writeln!(f, "{}", analytic.m4.slice(0, 0))?;
        writeln!(f, "||Empirical - Theory||_F = {:.6e}", comparison.m4_frobenius)?;

        writeln!(f)?;
        writeln!(f, "E[V^2] for random tetrahedron (vertices on S^2)")?;
        write!(f, "Empirical E[V^2] ≈ {:.6}", comparison.volume_empirical)?;
        match empirical.volume_std_error {
            Some(se) => writeln!(f, " ± {se:.2e}")?,
            None => writeln!(f)?,
        }
        writeln!(
            f,
            "Theoretical E[V^2] = 2/81 ≈ {:.6}",
            comparison.volume_analytic
        )?;
        write!(
            f,
            "Difference ≈ {:.6e} (relative {:.3e}",
            comparison.volume_difference, comparison.volume_relative_error
        )?;
        match comparison.volume_z_score {
            Some(z) => write!(f, ", z = {z:.2})"),
            None => write!(f, ")"),
        }
    }
}

// ============================================================================
// Convergence
// ============================================================================

/// Errors of one run in a convergence study.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvergencePoint {
    pub n_samples: usize,
    pub m2_frobenius: f64,
    pub m4_frobenius: f64,
    pub volume_abs_error: f64,
}

/// Runs the estimator once per entry of `sizes`, all with the same seed
/// and worker count, and reports the error of each run.
///
/// Monte Carlo error shrinks like `1/√n`, so for sizes a factor of 100
/// apart the errors should shrink by roughly a factor of 10.
///
/// # Errors
/// Returns `InvalidArgument` if any size or `workers` is zero.
pub fn convergence_study(
    sizes: &[usize],
    seed: u64,
    workers: usize,
) -> Result<Vec<ConvergencePoint>> {
    let analytic = AnalyticMoments::sphere3();
    sizes
        .iter()
        .map(|&n| -> Result<ConvergencePoint> {
            let config = EstimatorConfig::new(n)
                .with_seed(seed)
                .with_workers(workers);
            let empirical = MonteCarloEstimator::new(config)?.run()?;
            let report = ComparisonReport::compare(&empirical, &analytic)?;
            tracing::debug!(n, m2 = report.m2_frobenius, "convergence point");
            Ok(ConvergencePoint {
                n_samples: n,
                m2_frobenius: report.m2_frobenius,
                m4_frobenius: report.m4_frobenius,
                volume_abs_error: report.volume_difference.abs(),
            })
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
