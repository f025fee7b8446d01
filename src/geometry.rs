//! Tetrahedron volume from four vertices in R^3.
//!
//! ```text
//! V = |det(b − a, c − a, d − a)| / 6
//! ```

use crate::error::{MomentsError, Result};
use crate::tensor::DIM;

/// `E[V²]` for a tetrahedron whose four vertices are independent and
/// uniform on the unit sphere S^2.
pub const MEAN_SQUARED_TETRAHEDRON_VOLUME: f64 = 2.0 / 81.0;

/// Determinant of the 3×3 matrix with columns `u`, `v`, `w`.
///
/// Computed as the scalar triple product `u · (v × w)`.
#[inline]
pub fn det3(u: &[f64; DIM], v: &[f64; DIM], w: &[f64; DIM]) -> f64 {
    u[0] * (v[1] * w[2] - v[2] * w[1]) - v[0] * (u[1] * w[2] - u[2] * w[1])
        + w[0] * (u[1] * v[2] - u[2] * v[1])
}

#[inline]
fn sub(p: &[f64; DIM], q: &[f64; DIM]) -> [f64; DIM] {
    [p[0] - q[0], p[1] - q[1], p[2] - q[2]]
}

/// Volume of the tetrahedron `abcd` for fixed-size vertices.
///
/// Non-negative; zero when the four points are coplanar.
#[inline]
pub fn tetrahedron_volume3(a: &[f64; DIM], b: &[f64; DIM], c: &[f64; DIM], d: &[f64; DIM]) -> f64 {
    det3(&sub(b, a), &sub(c, a), &sub(d, a)).abs() / 6.0
}

/// Volume of the tetrahedron `abcd`.
///
/// # Errors
/// Returns `InvalidArgument` if any vertex is not 3-dimensional.
///
/// # Examples
/// ```
/// use sphere_moments::geometry::tetrahedron_volume;
/// let v = tetrahedron_volume(
///     &[0.0, 0.0, 0.0],
///     &[1.0, 0.0, 0.0],
///     &[0.0, 1.0, 0.0],
///     &[0.0, 0.0, 1.0],
/// ).unwrap();
/// assert!((v - 1.0 / 6.0).abs() < 1e-15);
/// ```
pub fn tetrahedron_volume(a: &[f64], b: &[f64], c: &[f64], d: &[f64]) -> Result<f64> {
    let a = as_point(a, "a")?;
    let b = as_point(b, "b")?;
    let c = as_point(c, "c")?;
    let d = as_point(d, "d")?;
    Ok(tetrahedron_volume3(a, b, c, d))
}

fn as_point<'a>(p: &'a [f64], name: &str) -> Result<&'a [f64; DIM]> {
    p.try_into().map_err(|_| {
        MomentsError::invalid(format!(
            "vertex {name} must have {DIM} coordinates, got {}",
            p.len()
        ))
    })
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn point() -> impl Strategy<Value = [f64; 3]> {
        proptest::array::uniform3(-10.0_f64..10.0)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn volume_non_negative(a in point(), b in point(), c in point(), d in point()) {
            prop_assert!(tetrahedron_volume3(&a, &b, &c, &d) >= 0.0);
        }

        #[test]
        fn volume_translation_invariant(
            a in point(), b in point(), c in point(), d in point(), t in point(),
        ) {
            let shift = |p: [f64; 3]| [p[0] + t[0], p[1] + t[1], p[2] + t[2]];
            let v0 = tetrahedron_volume3(&a, &b, &c, &d);
            let v1 = tetrahedron_volume3(&shift(a), &shift(b), &shift(c), &shift(d));
            prop_assert!((v0 - v1).abs() < 1e-8 * v0.max(1.0));
        }

        #[test]
        fn planar_points_have_zero_volume(
            a in point(), b in point(), c in point(), d in point(),
        ) {
            let flat = |p: [f64; 3]| [p[0], p[1], 0.0];
            prop_assert_eq!(tetrahedron_volume3(&flat(a), &flat(b), &flat(c), &flat(d)), 0.0);
        }
    }
}
