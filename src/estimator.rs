//! Monte Carlo estimation of sphere moments and the tetrahedron statistic.
//!
//! Each trial draws one direction `r` uniform on S^2 and adds `r ⊗ r` and
//! `r ⊗ r ⊗ r ⊗ r` into running sums, then draws four fresh points and adds
//! the squared volume of their tetrahedron into a scalar accumulator. After
//! all trials the sums are divided by the trial count.
//!
//! # Workers and reproducibility
//!
//! The trials are split into `workers` contiguous chunks. Chunk `k` runs on
//! its own generator seeded with [`stream_seed`]`(seed, k)` and fills a
//! private [`MomentAccumulator`]; partials are merged in chunk order once
//! every chunk has finished. Within a chunk trials are summed in draw order.
//! The result is therefore bit-for-bit reproducible for a fixed
//! `(seed, workers)` pair, whether or not the `parallel` feature is enabled.
//! Different worker counts consume different random streams and give
//! different (equally valid) estimates.

use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::Serialize;

use crate::error::{MomentsError, Result};
use crate::geometry::tetrahedron_volume3;
use crate::random::{create_rng, resolve_seed, stream_seed, SampleRng};
use crate::sphere::sample_unit_vector3;
use crate::stats::{CompensatedSum, WelfordAccumulator};
use crate::tensor::{Tensor2, Tensor4, DIM, RANK4_LEN};

/// Trial count used when none is given.
pub const DEFAULT_SAMPLE_COUNT: usize = 200_000;

const RANK2_LEN: usize = DIM * DIM;

// ============================================================================
// Configuration
// ============================================================================

/// Parameters of one estimation run.
///
/// # Examples
/// ```
/// use sphere_moments::estimator::{EstimatorConfig, DEFAULT_SAMPLE_COUNT};
/// let config = EstimatorConfig::default().with_seed(42).with_workers(4);
/// assert_eq!(config.n_samples, DEFAULT_SAMPLE_COUNT);
/// assert_eq!(config.seed, Some(42));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EstimatorConfig {
    /// Number of independent trials.
    pub n_samples: usize,
    /// Master seed; `None` draws one from OS entropy at run time.
    pub seed: Option<u64>,
    /// Number of independent random streams.
    pub workers: usize,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            n_samples: DEFAULT_SAMPLE_COUNT,
            seed: None,
            workers: 1,
        }
    }
}

impl EstimatorConfig {
    /// Config with `n_samples` trials, no fixed seed and one worker.
    pub fn new(n_samples: usize) -> Self {
        Self {
            n_samples,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// # Errors
    /// Returns `InvalidArgument` if `n_samples` or `workers` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.n_samples == 0 {
            return Err(MomentsError::invalid("n_samples must be positive, got 0"));
        }
        if self.workers == 0 {
            return Err(MomentsError::invalid("workers must be positive, got 0"));
        }
        Ok(())
    }
}

// ============================================================================
// Results
// ============================================================================

/// Empirical moments produced by one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmpiricalMoments {
    /// Estimate of `E[r_i r_j]`.
    pub m2: Tensor2,
    /// Estimate of `E[r_i r_j r_k r_l]`.
    pub m4: Tensor4,
    /// Estimate of `E[V²]` for a random inscribed tetrahedron.
    pub mean_squared_volume: f64,
    /// Standard error of `mean_squared_volume`; `None` for a single trial.
    pub volume_std_error: Option<f64>,
    pub n_samples: usize,
    /// Master seed actually used (drawn from entropy if none was given).
    pub seed: u64,
    pub workers: usize,
}

// ============================================================================
// Accumulator
// ============================================================================

/// Running sums owned by one worker.
#[derive(Debug, Clone)]
pub struct MomentAccumulator {
    m2: [CompensatedSum; RANK2_LEN],
    m4: [CompensatedSum; RANK4_LEN],
    volume_sq: WelfordAccumulator,
    directions: u64,
}

impl Default for MomentAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl MomentAccumulator {
    pub fn new() -> Self {
        Self {
            m2: [CompensatedSum::new(); RANK2_LEN],
            m4: [CompensatedSum::new(); RANK4_LEN],
            volume_sq: WelfordAccumulator::new(),
            directions: 0,
        }
    }

    /// Adds `r ⊗ r` and `r ⊗ r ⊗ r ⊗ r`.
    pub fn record_direction(&mut self, r: &[f64; DIM]) {
        let mut pairs = [0.0; RANK2_LEN];
        for i in 0..DIM {
            for j in 0..DIM {
                pairs[i * DIM + j] = r[i] * r[j];
            }
        }
        for (acc, &p) in self.m2.iter_mut().zip(&pairs) {
            acc.add(p);
        }
        // offset(i, j, k, l) = (i·3 + j)·9 + (k·3 + l)
        for (ij, &p) in pairs.iter().enumerate() {
            let row = &mut self.m4[ij * RANK2_LEN..(ij + 1) * RANK2_LEN];
            for (acc, &q) in row.iter_mut().zip(&pairs) {
                acc.add(p * q);
            }
        }
        self.directions += 1;
    }

    /// Adds the squared volume of one tetrahedron.
    pub fn record_volume(&mut self, volume: f64) {
        self.volume_sq.update(volume * volume);
    }

    /// Runs one complete trial: one direction, then four fresh vertices.
    pub fn trial(&mut self, rng: &mut SampleRng) {
        let r = sample_unit_vector3(rng);
        self.record_direction(&r);

        let a = sample_unit_vector3(rng);
        let b = sample_unit_vector3(rng);
        let c = sample_unit_vector3(rng);
        let d = sample_unit_vector3(rng);
        self.record_volume(tetrahedron_volume3(&a, &b, &c, &d));
    }

    /// Number of completed trials.
    pub fn trials(&self) -> u64 {
        self.directions
    }

    /// Adds another worker's partial sums into this one.
    pub fn merge(&mut self, other: &MomentAccumulator) {
        for (a, b) in self.m2.iter_mut().zip(&other.m2) {
            a.merge(b);
        }
        for (a, b) in self.m4.iter_mut().zip(&other.m4) {
            a.merge(b);
        }
        self.volume_sq.merge(&other.volume_sq);
        self.directions += other.directions;
    }

    /// Divides every sum by the trial count.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if no trial was recorded, or if the number
    /// of recorded directions differs from the number of recorded volumes.
    pub fn finalize(&self, seed: u64, workers: usize) -> Result<EmpiricalMoments> {
        if self.directions != self.volume_sq.count() {
            return Err(MomentsError::invalid(format!(
                "accumulator holds {} directions but {} volumes",
                self.directions,
                self.volume_sq.count()
            )));
        }
        let mean_squared_volume = self
            .volume_sq
            .mean()
            .ok_or_else(|| MomentsError::invalid("cannot finalize an empty accumulator"))?;
        let n = self.directions as f64;
        let m2 = Tensor2::from_fn(DIM, |i, j| self.m2[i * DIM + j].value() / n);
        let m4 = Tensor4::from_flat(self.m4.iter().map(|s| s.value() / n).collect())?;
        Ok(EmpiricalMoments {
            m2,
            m4,
            mean_squared_volume,
            volume_std_error: self.volume_sq.standard_error(),
            n_samples: self.directions as usize,
            seed,
            workers,
        })
    }
}

// ============================================================================
// Estimator
// ============================================================================

/// Runs the trial loop for a validated [`EstimatorConfig`].
///
/// # Examples
/// ```
/// use sphere_moments::estimator::{EstimatorConfig, MonteCarloEstimator};
/// let estimator = MonteCarloEstimator::new(EstimatorConfig::new(2_000).with_seed(7)).unwrap();
/// let result = estimator.run().unwrap();
/// assert_eq!(result.n_samples, 2_000);
/// assert!((result.m2.trace() - 1.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct MonteCarloEstimator {
    config: EstimatorConfig,
}

impl MonteCarloEstimator {
    /// # Errors
    /// Returns `InvalidArgument` if the config does not validate.
    pub fn new(config: EstimatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Performs all trials and returns the empirical moments.
    pub fn run(&self) -> Result<EmpiricalMoments> {
        let EstimatorConfig {
            n_samples, workers, ..
        } = self.config;
        let seed = resolve_seed(self.config.seed);
        tracing::debug!(n_samples, seed, workers, "starting monte carlo run");
        let started = Instant::now();

        let plan: Vec<(u64, usize)> = chunk_sizes(n_samples, workers)
            .into_iter()
            .enumerate()
            .map(|(k, len)| (stream_seed(seed, k as u64), len))
            .collect();

        #[cfg(feature = "parallel")]
        let partials: Vec<MomentAccumulator> = plan
            .into_par_iter()
            .map(|(stream, len)| run_stream(stream, len))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let partials: Vec<MomentAccumulator> = plan
            .into_iter()
            .map(|(stream, len)| run_stream(stream, len))
            .collect();

        let mut total = MomentAccumulator::new();
        for partial in &partials {
            total.merge(partial);
        }
        let result = total.finalize(seed, workers)?;

        tracing::debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            mean_squared_volume = result.mean_squared_volume,
            "monte carlo run finished"
        );
        Ok(result)
    }
}

/// Runs `n_samples` trials on a single stream.
///
/// # Errors
/// Returns `InvalidArgument` if `n_samples == 0`.
///
/// # Examples
/// ```
/// let a = sphere_moments::estimator::run(500, Some(42)).unwrap();
/// let b = sphere_moments::estimator::run(500, Some(42)).unwrap();
/// assert_eq!(a, b);
/// ```
pub fn run(n_samples: usize, seed: Option<u64>) -> Result<EmpiricalMoments> {
    let mut config = EstimatorConfig::new(n_samples);
    config.seed = seed;
    MonteCarloEstimator::new(config)?.run()
}

fn run_stream(seed: u64, trials: usize) -> MomentAccumulator {
    let mut rng = create_rng(seed);
    let mut acc = MomentAccumulator::new();
    for _ in 0..trials {
        acc.trial(&mut rng);
    }
    acc
}

/// Splits `n` trials into `workers` contiguous chunks; the first
/// `n % workers` chunks get one extra trial.
fn chunk_sizes(n: usize, workers: usize) -> Vec<usize> {
    let base = n / workers;
    let extra = n % workers;
    (0..workers).map(|k| base + usize::from(k < extra)).collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::MEAN_SQUARED_TETRAHEDRON_VOLUME;
    use crate::tensor::{fourth_moment, second_moment};

    #[test]
    fn test_zero_samples_rejected() {
        assert!(matches!(
            run(0, Some(1)),
            Err(MomentsError::InvalidArgument(_))
        ));
        assert!(MonteCarloEstimator::new(EstimatorConfig::new(0)).is_err());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config = EstimatorConfig::new(10).with_workers(0);
        assert!(MonteCarloEstimator::new(config).is_err());
    }

    #[test]
    fn test_default_config() {
        let config = EstimatorConfig::default();
        assert_eq!(config.n_samples, 200_000);
        assert_eq!(config.seed, None);
        assert_eq!(config.workers, 1);
    }

    #[test]
    fn test_single_sample() {
        let result = run(1, Some(5)).unwrap();
        assert_eq!(result.n_samples, 1);
        assert!(result.volume_std_error.is_none());
        // One unit vector: M2 = r ⊗ r has trace 1 and rank one.
        assert!((result.m2.trace() - 1.0).abs() < 1e-12);
        assert!(result.m2.is_symmetric(0.0));
        assert!(result.mean_squared_volume >= 0.0);
        assert!(result.mean_squared_volume <= (8.0 / (9.0 * 3.0_f64.sqrt())).powi(2));
    }

    #[test]
    fn test_seeded_runs_identical() {
        let a = run(3_000, Some(42)).unwrap();
        let b = run(3_000, Some(42)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.seed, 42);
    }

    #[test]
    fn test_seeded_runs_identical_with_workers() {
        let config = EstimatorConfig::new(5_001).with_seed(9).with_workers(4);
        let a = MonteCarloEstimator::new(config.clone()).unwrap().run().unwrap();
        let b = MonteCarloEstimator::new(config).unwrap().run().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.n_samples, 5_001);
        assert_eq!(a.workers, 4);
    }

    #[test]
    fn test_single_worker_matches_free_run() {
        let via_config = MonteCarloEstimator::new(EstimatorConfig::new(1_000).with_seed(3))
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(via_config, run(1_000, Some(3)).unwrap());
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = run(100, Some(1)).unwrap();
        let b = run(100, Some(2)).unwrap();
        assert_ne!(a.m2, b.m2);
    }

    #[test]
    fn test_unseeded_run_records_seed() {
        let result = run(10, None).unwrap();
        let replay = run(10, Some(result.seed)).unwrap();
        assert_eq!(result, replay);
    }

    #[test]
    fn test_more_workers_than_samples() {
        let config = EstimatorConfig::new(3).with_seed(1).with_workers(8);
        let result = MonteCarloEstimator::new(config).unwrap().run().unwrap();
        assert_eq!(result.n_samples, 3);
        assert!((result.m2.trace() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_empirical_structure() {
        let result = run(2_000, Some(17)).unwrap();
        // Every direction has |r| = 1, so these hold for each trial exactly.
        assert!((result.m2.trace() - 1.0).abs() < 1e-12);
        assert!(result.m2.is_symmetric(1e-15));
        let contracted = result.m4.contract_last_pair();
        assert!(contracted.frobenius_distance(&result.m2).unwrap() < 1e-12);
        let swapped = result.m4.permuted([1, 0, 3, 2]).unwrap();
        assert!(swapped.frobenius_distance(&result.m4) < 1e-15);
    }

    #[test]
    fn test_end_to_end_200k_seed_42() {
        let result = run(200_000, Some(42)).unwrap();
        let m2_err = result.m2.frobenius_distance(&second_moment(3).unwrap()).unwrap();
        let m4_err = result.m4.frobenius_distance(&fourth_moment());
        let vol_err = (result.mean_squared_volume - MEAN_SQUARED_TETRAHEDRON_VOLUME).abs();
        assert!(m2_err < 0.01, "M2 error {m2_err}");
        assert!(m4_err < 0.01, "M4 error {m4_err}");
        assert!(vol_err < 0.01, "E[V²] error {vol_err}");
        let se = result.volume_std_error.unwrap();
        assert!(se > 0.0 && se < 1e-3, "standard error {se}");
    }

    #[test]
    fn test_parallel_streams_converge() {
        let config = EstimatorConfig::new(100_000).with_seed(8).with_workers(6);
        let result = MonteCarloEstimator::new(config).unwrap().run().unwrap();
        let m2_err = result.m2.frobenius_distance(&second_moment(3).unwrap()).unwrap();
        assert!(m2_err < 0.01, "M2 error {m2_err}");
        assert!((result.mean_squared_volume - MEAN_SQUARED_TETRAHEDRON_VOLUME).abs() < 0.01);
    }

    #[test]
    fn test_accumulator_merge_matches_single_stream() {
        let mut rng = create_rng(77);
        let mut whole = MomentAccumulator::new();
        let mut left = MomentAccumulator::new();
        let mut right = MomentAccumulator::new();
        for n in 0..400 {
            let r = sample_unit_vector3(&mut rng);
            whole.record_direction(&r);
            whole.record_volume(0.1);
            let part = if n < 150 { &mut left } else { &mut right };
            part.record_direction(&r);
            part.record_volume(0.1);
        }
        left.merge(&right);
        assert_eq!(left.trials(), 400);
        let a = left.finalize(0, 2).unwrap();
        let b = whole.finalize(0, 1).unwrap();
        assert!(a.m2.frobenius_distance(&b.m2).unwrap() < 1e-13);
        assert!(a.m4.frobenius_distance(&b.m4) < 1e-13);
        assert!((a.mean_squared_volume - 0.01).abs() < 1e-15);
    }

    #[test]
    fn test_record_direction_layout() {
        let mut acc = MomentAccumulator::new();
        let r = [0.6, 0.0, 0.8];
        acc.record_direction(&r);
        acc.record_volume(0.0);
        let m = acc.finalize(0, 1).unwrap();
        assert!(m.m4.frobenius_distance(&Tensor4::outer(&r)) < 1e-15);
        assert_eq!(m.m2, Tensor2::outer(&r));
    }

    #[test]
    fn test_finalize_empty_fails() {
        assert!(MomentAccumulator::new().finalize(0, 1).is_err());
    }

    #[test]
    fn test_finalize_rejects_unpaired_records() {
        let mut acc = MomentAccumulator::new();
        acc.record_direction(&[1.0, 0.0, 0.0]);
        acc.record_direction(&[0.0, 1.0, 0.0]);
        acc.record_volume(0.5);
        let err = acc.finalize(0, 1).unwrap_err();
        assert!(matches!(err, MomentsError::InvalidArgument(_)));
        assert!(err.to_string().contains("2 directions but 1 volumes"));

        acc.record_volume(0.5);
        let m = acc.finalize(0, 1).unwrap();
        assert_eq!(m.n_samples, 2);
        assert!((m.mean_squared_volume - 0.25).abs() < 1e-15);
    }

    #[test]
    fn test_finalize_rejects_volumes_without_directions() {
        let mut acc = MomentAccumulator::new();
        acc.record_volume(0.1);
        assert!(acc.finalize(0, 1).is_err());
    }

    #[test]
    fn test_chunk_sizes() {
        assert_eq!(chunk_sizes(10, 1), vec![10]);
        assert_eq!(chunk_sizes(10, 3), vec![4, 3, 3]);
        assert_eq!(chunk_sizes(2, 4), vec![1, 1, 0, 0]);
        assert_eq!(chunk_sizes(12, 4).iter().sum::<usize>(), 12);
    }
}
