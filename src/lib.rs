//! # sphere-moments
//!
//! Moment tensors of a vector uniformly distributed on the unit sphere in
//! R^3, computed in closed form and cross-checked by Monte Carlo.
//!
//! ## Modules
//!
//! - [`tensor`]: Kronecker delta, analytic rank-2 and rank-4 moments
//! - [`sphere`]: Uniform points on S^{d-1} from normalized Gaussians
//! - [`geometry`]: Tetrahedron volume and the constant `E[V²] = 2/81`
//! - [`estimator`]: Seeded, optionally parallel Monte Carlo trial loop
//! - [`report`]: Frobenius and scalar agreement metrics, text/JSON summary
//! - [`stats`]: Compensated sums and Welford accumulators
//! - [`random`]: Seeded RNG construction and per-worker stream seeds
//!
//! ## Example
//!
//! ```
//! use sphere_moments::{estimator, report::Summary, tensor::AnalyticMoments};
//!
//! let empirical = estimator::run(10_000, Some(42)).unwrap();
//! let summary = Summary::new(AnalyticMoments::sphere3(), empirical).unwrap();
//! assert!(summary.comparison.m2_frobenius < 0.05);
//! ```
//!
//! ## Design Philosophy
//!
//! - **Reproducible by default**: every run records the seed it used
//! - **Numerical stability first**: compensated summation for tensor sums,
//!   Welford's algorithm for the volume statistic
//! - **Property-based testing**: geometric and tensor invariants verified
//!   via proptest

pub mod error;
pub mod estimator;
pub mod geometry;
pub mod random;
pub mod report;
pub mod sphere;
pub mod stats;
pub mod tensor;

pub use error::{MomentsError, Result};
pub use estimator::{EmpiricalMoments, EstimatorConfig, MonteCarloEstimator, DEFAULT_SAMPLE_COUNT};
pub use report::{ComparisonReport, Summary};
pub use tensor::{AnalyticMoments, Tensor2, Tensor4};
