//! Uniform sampling on the unit sphere S^{d-1} ⊂ R^d.
//!
//! # Algorithm
//! Draw `d` independent standard normal coordinates and divide by the
//! Euclidean norm. The standard Gaussian in R^d is rotation invariant, so
//! its direction is uniform on the sphere.
//!
//! Reference: Muller (1959), "A Note on a Method for Generating Points
//! Uniformly on N-Dimensional Spheres", *Comm. ACM* 2(4).

use rand::Rng;
use rand_distr::StandardNormal;

use crate::error::{MomentsError, Result};
use crate::tensor::DIM;

/// Draws with a norm below this are discarded and redrawn.
pub const MIN_NORM: f64 = 1e-12;

/// Draws one point uniformly distributed on the unit sphere in R^d.
///
/// # Errors
/// Returns `InvalidArgument` if `d == 0`.
///
/// # Examples
/// ```
/// use sphere_moments::random::create_rng;
/// use sphere_moments::sphere::sample_unit_vector;
/// let mut rng = create_rng(42);
/// let v = sample_unit_vector(5, &mut rng).unwrap();
/// let norm: f64 = v.iter().map(|x| x * x).sum::<f64>().sqrt();
/// assert!((norm - 1.0).abs() < 1e-12);
/// ```
pub fn sample_unit_vector<R: Rng>(d: usize, rng: &mut R) -> Result<Vec<f64>> {
    if d == 0 {
        return Err(MomentsError::invalid("dimension must be positive, got 0"));
    }
    let mut v = vec![0.0; d];
    loop {
        for x in v.iter_mut() {
            *x = rng.sample(StandardNormal);
        }
        if normalize(&mut v) {
            return Ok(v);
        }
    }
}

/// Draws one point uniformly distributed on S^2.
pub fn sample_unit_vector3<R: Rng>(rng: &mut R) -> [f64; DIM] {
    let mut v = [0.0; DIM];
    loop {
        for x in v.iter_mut() {
            *x = rng.sample(StandardNormal);
        }
        if normalize(&mut v) {
            return v;
        }
    }
}

/// Scales `v` to unit length. Returns false, leaving `v` untouched, when
/// the norm is too small (or not finite) to divide by safely.
fn normalize(v: &mut [f64]) -> bool {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if !norm.is_finite() || norm < MIN_NORM {
        tracing::trace!(norm, "degenerate gaussian draw, resampling");
        return false;
    }
    v.iter_mut().for_each(|x| *x /= norm);
    true
}
