//! Isotropic moment tensors of the uniform distribution on the unit sphere.
//!
//! For `r` uniform on S^{d-1} ⊂ R^d, isotropy and `|r| = 1` fix the
//! low-order moments completely:
//!
//! ```text
//! E[r_i r_j]         = δ_ij / d
//! E[r_i r_j r_k r_l] = (δ_ij δ_kl + δ_ik δ_jl + δ_il δ_jk) / (d (d + 2))
//! ```
//!
//! The rank-4 tensor is provided for d = 3 only, where the normalizer is 15.
//!
//! # Storage
//!
//! [`Tensor2`] is a dense row-major `d × d` array. [`Tensor4`] is a dense
//! `3 × 3 × 3 × 3` array stored flat with strides `(27, 9, 3, 1)`; all 81
//! entries are stored even though the analytic tensor is fully symmetric,
//! so that empirical and analytic tensors share one layout.

use std::fmt;

use serde::Serialize;

use crate::error::{MomentsError, Result};
use crate::geometry::MEAN_SQUARED_TETRAHEDRON_VOLUME;

/// Ambient dimension of the rank-4 and tetrahedron paths.
pub const DIM: usize = 3;

/// Number of entries of a rank-4 tensor in [`DIM`] dimensions.
pub const RANK4_LEN: usize = DIM * DIM * DIM * DIM;

// ============================================================================
// Rank 2
// ============================================================================

/// Dense `d × d` tensor, row-major.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tensor2 {
    dim: usize,
    data: Vec<f64>,
}

impl Tensor2 {
    /// Builds a tensor by evaluating `f(i, j)` at every index pair.
    pub fn from_fn(dim: usize, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        let mut data = Vec::with_capacity(dim * dim);
        for i in 0..dim {
            for j in 0..dim {
                data.push(f(i, j));
            }
        }
        Self { dim, data }
    }

    /// Outer product `v ⊗ v`.
    pub fn outer(v: &[f64]) -> Self {
        Self::from_fn(v.len(), |i, j| v[i] * v[j])
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Entry `(i, j)`. Panics if either index is out of range.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        assert!(i < self.dim && j < self.dim, "index ({i}, {j}) out of range");
        self.data[i * self.dim + j]
    }

    /// Entry `(i, j)`.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if either index is `≥ dim`.
    pub fn try_get(&self, i: usize, j: usize) -> Result<f64> {
        if i >= self.dim || j >= self.dim {
            return Err(MomentsError::invalid(format!(
                "index ({i}, {j}) out of range for {0}x{0} tensor",
                self.dim
            )));
        }
        Ok(self.data[i * self.dim + j])
    }

    /// Row-major view of all entries.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Iterates over rows.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks(self.dim.max(1))
    }

    /// Sum of the diagonal.
    pub fn trace(&self) -> f64 {
        (0..self.dim).map(|i| self.data[i * self.dim + i]).sum()
    }

    /// Returns true if `|T_ij − T_ji| ≤ tol` for every pair.
    pub fn is_symmetric(&self, tol: f64) -> bool {
        (0..self.dim).all(|i| (0..i).all(|j| (self.get(i, j) - self.get(j, i)).abs() <= tol))
    }

    /// Multiplies every entry by `factor`.
    pub fn scaled(mut self, factor: f64) -> Self {
        self.data.iter_mut().for_each(|x| *x *= factor);
        self
    }

    /// Frobenius norm of `self − other`.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if the dimensions differ.
    pub fn frobenius_distance(&self, other: &Tensor2) -> Result<f64> {
        if self.dim != other.dim {
            return Err(MomentsError::invalid(format!(
                "cannot compare {0}x{0} tensor with {1}x{1} tensor",
                self.dim, other.dim
            )));
        }
        Ok(frobenius(
            self.data.iter().zip(&other.data).map(|(a, b)| a - b),
        ))
    }
}

impl fmt::Display for Tensor2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = f.precision().unwrap_or(6);
        for (n, row) in self.rows().enumerate() {
            if n > 0 {
                writeln!(f)?;
            }
            write!(f, "[")?;
            for (m, x) in row.iter().enumerate() {
                if m > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{x:>width$.precision$}", width = precision + 4)?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

// ============================================================================
// Rank 4
// ============================================================================

/// Dense `3 × 3 × 3 × 3` tensor, stored flat.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tensor4 {
    data: Vec<f64>,
}

impl Tensor4 {
    /// Flat offset of `(i, j, k, l)`.
    #[inline]
    pub const fn offset(i: usize, j: usize, k: usize, l: usize) -> usize {
        ((i * DIM + j) * DIM + k) * DIM + l
    }

    /// Builds a tensor by evaluating `f(i, j, k, l)` at every quadruple.
    pub fn from_fn(mut f: impl FnMut(usize, usize, usize, usize) -> f64) -> Self {
        let mut data = Vec::with_capacity(RANK4_LEN);
        for i in 0..DIM {
            for j in 0..DIM {
                for k in 0..DIM {
                    for l in 0..DIM {
                        data.push(f(i, j, k, l));
                    }
                }
            }
        }
        Self { data }
    }

    /// Four-fold outer product `r ⊗ r ⊗ r ⊗ r`.
    pub fn outer(r: &[f64; DIM]) -> Self {
        Self::from_fn(|i, j, k, l| r[i] * r[j] * r[k] * r[l])
    }

    /// Builds a tensor from 81 flat entries in `(i, j, k, l)` order.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if `data.len() != 81`.
    pub fn from_flat(data: Vec<f64>) -> Result<Self> {
        if data.len() != RANK4_LEN {
            return Err(MomentsError::invalid(format!(
                "rank-4 tensor needs {RANK4_LEN} entries, got {}",
                data.len()
            )));
        }
        Ok(Self { data })
    }

    /// Entry `(i, j, k, l)`. Panics if any index is `≥ 3`.
    pub fn get(&self, i: usize, j: usize, k: usize, l: usize) -> f64 {
        assert!(
            i < DIM && j < DIM && k < DIM && l < DIM,
            "index ({i}, {j}, {k}, {l}) out of range"
        );
        self.data[Self::offset(i, j, k, l)]
    }

    /// Entry `(i, j, k, l)`.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if any index is `≥ 3`.
    pub fn try_get(&self, i: usize, j: usize, k: usize, l: usize) -> Result<f64> {
        if [i, j, k, l].iter().any(|&x| x >= DIM) {
            return Err(MomentsError::invalid(format!(
                "index ({i}, {j}, {k}, {l}) out of range for rank-4 tensor in {DIM} dimensions"
            )));
        }
        Ok(self.data[Self::offset(i, j, k, l)])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Contraction over the last index pair: `C_ij = Σ_k T_ijkk`.
    pub fn contract_last_pair(&self) -> Tensor2 {
        Tensor2::from_fn(DIM, |i, j| (0..DIM).map(|k| self.get(i, j, k, k)).sum())
    }

    /// The `3 × 3` slice `T[i, j, :, :]`.
    pub fn slice(&self, i: usize, j: usize) -> Tensor2 {
        Tensor2::from_fn(DIM, |k, l| self.get(i, j, k, l))
    }

    /// Index permutation: the result `P` satisfies
    /// `P[x_0, x_1, x_2, x_3] = T[x_{perm[0]}, x_{perm[1]}, x_{perm[2]}, x_{perm[3]}]`.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if `perm` is not a permutation of `0..4`.
    pub fn permuted(&self, perm: [usize; 4]) -> Result<Tensor4> {
        let mut seen = [false; 4];
        for &p in &perm {
            if p >= 4 || seen[p] {
                return Err(MomentsError::invalid(format!(
                    "{perm:?} is not a permutation of 0..4"
                )));
            }
            seen[p] = true;
        }
        Ok(Self::from_fn(|i, j, k, l| {
            let x = [i, j, k, l];
            self.get(x[perm[0]], x[perm[1]], x[perm[2]], x[perm[3]])
        }))
    }

    /// Frobenius norm of `self − other`.
    pub fn frobenius_distance(&self, other: &Tensor4) -> f64 {
        frobenius(self.data.iter().zip(&other.data).map(|(a, b)| a - b))
    }
}

fn frobenius(entries: impl Iterator<Item = f64>) -> f64 {
    entries.map(|x| x * x).sum::<f64>().sqrt()
}

// ============================================================================
// Builders
// ============================================================================

fn check_dim(d: usize) -> Result<()> {
    if d == 0 {
        return Err(MomentsError::invalid("dimension must be positive, got 0"));
    }
    Ok(())
}

#[inline]
fn delta(i: usize, j: usize) -> f64 {
    if i == j {
        1.0
    } else {
        0.0
    }
}

/// Kronecker delta `δ_ij` as a `d × d` identity tensor.
///
/// # Errors
/// Returns `InvalidArgument` if `d == 0`.
///
/// # Examples
/// ```
/// use sphere_moments::tensor::kronecker_delta;
/// let id = kronecker_delta(3).unwrap();
/// assert_eq!(id.get(1, 1), 1.0);
/// assert_eq!(id.get(0, 2), 0.0);
/// ```
pub fn kronecker_delta(d: usize) -> Result<Tensor2> {
    check_dim(d)?;
    Ok(Tensor2::from_fn(d, delta))
}

/// Analytic second moment `E[r_i r_j] = δ_ij / d` on S^{d-1}.
///
/// The result is symmetric with trace exactly 1.
///
/// # Errors
/// Returns `InvalidArgument` if `d == 0`.
///
/// # Examples
/// ```
/// use sphere_moments::tensor::second_moment;
/// let m2 = second_moment(3).unwrap();
/// assert!((m2.trace() - 1.0).abs() < 1e-15);
/// ```
pub fn second_moment(d: usize) -> Result<Tensor2> {
    Ok(kronecker_delta(d)?.scaled(1.0 / d as f64))
}

/// Analytic fourth moment on S^2:
/// `E[r_i r_j r_k r_l] = (δ_ij δ_kl + δ_ik δ_jl + δ_il δ_jk) / 15`.
///
/// Every entry is 0, 1/15 or 3/15.
pub fn fourth_moment() -> Tensor4 {
    Tensor4::from_fn(|i, j, k, l| {
        (delta(i, j) * delta(k, l) + delta(i, k) * delta(j, l) + delta(i, l) * delta(j, k))
            / 15.0
    })
}

/// The closed-form quantities the Monte Carlo run is checked against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticMoments {
    /// `δ_ij / 3`
    pub m2: Tensor2,
    /// See [`fourth_moment`].
    pub m4: Tensor4,
    /// `E[V²] = 2/81` for a tetrahedron with vertices uniform on S^2.
    pub mean_squared_volume: f64,
}

impl AnalyticMoments {
    /// Analytic moments on the unit sphere in R^3.
    pub fn sphere3() -> Self {
        Self {
            m2: Tensor2::from_fn(DIM, |i, j| delta(i, j) / DIM as f64),
            m4: fourth_moment(),
            mean_squared_volume: MEAN_SQUARED_TETRAHEDRON_VOLUME,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn second_moment_trace_is_one(d in 1_usize..64) {
            let m2 = second_moment(d).unwrap();
            prop_assert!((m2.trace() - 1.0).abs() < 1e-12);
            prop_assert!(m2.is_symmetric(0.0));
        }

        #[test]
        fn outer4_contracts_to_outer2_for_unit_vectors(
            x in -1.0_f64..1.0,
            y in -1.0_f64..1.0,
            z in -1.0_f64..1.0,
        ) {
            let n = (x * x + y * y + z * z).sqrt();
            prop_assume!(n > 1e-3);
            let r = [x / n, y / n, z / n];
            let c = Tensor4::outer(&r).contract_last_pair();
            let o2 = Tensor2::outer(&r);
            prop_assert!(c.frobenius_distance(&o2).unwrap() < 1e-12);
        }
    }
}
