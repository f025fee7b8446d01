//! Streaming accumulators with numerical stability guarantees.
//!
//! The estimator adds hundreds of thousands of O(1) terms into each tensor
//! entry; plain `+=` loses low-order bits as the running sum grows.
//!
//! # Algorithms
//!
//! - **Sums**: Kahan–Babuška (Neumaier) compensated summation, O(ε) error
//!   independent of n.
//!   Reference: Neumaier (1974), "Rundungsfehleranalyse einiger Verfahren
//!   zur Summation endlicher Summen", *ZAMM* 54(1).
//! - **Mean/Variance**: Welford's online algorithm, with Chan's pairwise
//!   merge for combining worker partials.
//!   Reference: Welford (1962), *Technometrics* 4(3); Chan, Golub &
//!   LeVeque (1979), "Updating Formulae and a Pairwise Algorithm for
//!   Computing Sample Variances".

/// Running Neumaier-compensated sum.
///
/// # Examples
/// ```
/// use sphere_moments::stats::CompensatedSum;
/// let mut acc = CompensatedSum::new();
/// for x in [1.0, 1e100, 1.0, -1e100] {
///     acc.add(x);
/// }
/// assert_eq!(acc.value(), 2.0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CompensatedSum {
    sum: f64,
    c: f64,
}

impl CompensatedSum {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one term.
    #[inline]
    pub fn add(&mut self, x: f64) {
        let t = self.sum + x;
        if self.sum.abs() >= x.abs() {
            self.c += (self.sum - t) + x;
        } else {
            self.c += (x - t) + self.sum;
        }
        self.sum = t;
    }

    /// Folds another partial sum into this one.
    pub fn merge(&mut self, other: &CompensatedSum) {
        self.add(other.sum);
        self.c += other.c;
    }

    /// Current compensated total.
    #[inline]
    pub fn value(&self) -> f64 {
        self.sum + self.c
    }
}

/// Online mean and variance (Welford), mergeable across workers.
///
/// # Examples
/// ```
/// use sphere_moments::stats::WelfordAccumulator;
/// let mut acc = WelfordAccumulator::new();
/// for x in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
///     acc.update(x);
/// }
/// assert!((acc.mean().unwrap() - 5.0).abs() < 1e-15);
/// assert!((acc.population_variance().unwrap() - 4.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WelfordAccumulator {
    count: u64,
    mean_acc: f64,
    m2: f64,
}

impl WelfordAccumulator {
    /// Creates a new empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a new sample into the accumulator.
    pub fn update(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean_acc;
        self.mean_acc += delta / self.count as f64;
        self.m2 += delta * (value - self.mean_acc);
    }

    /// Returns the number of samples seen so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Returns the running mean, or `None` if no samples have been added.
    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.mean_acc)
        }
    }

    /// Returns the sample variance (n − 1 denominator), or `None` if fewer
    /// than 2 samples have been added.
    pub fn sample_variance(&self) -> Option<f64> {
        if self.count < 2 {
            None
        } else {
            Some(self.m2 / (self.count - 1) as f64)
        }
    }

    /// Returns the population variance (n denominator), or `None` if no
    /// samples have been added.
    pub fn population_variance(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.m2 / self.count as f64)
        }
    }

    /// Standard error of the mean, `s / √n`, or `None` if fewer than 2
    /// samples have been added.
    pub fn standard_error(&self) -> Option<f64> {
        self.sample_variance()
            .map(|v| (v / self.count as f64).sqrt())
    }

    /// Merges another accumulator into this one (parallel-friendly).
    pub fn merge(&mut self, other: &WelfordAccumulator) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }
        let na = self.count as f64;
        let nb = other.count as f64;
        let total = self.count + other.count;
        let n = total as f64;
        let delta = other.mean_acc - self.mean_acc;

        self.mean_acc += delta * (nb / n);
        self.m2 += other.m2 + delta * delta * na * nb / n;
        self.count = total;
    }
}

// ============================================================================
// Tests
// ============================================================================


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn finite_vec(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<f64>> {
        proptest::collection::vec(-1e6_f64..1e6, min_len..=max_len)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn variance_non_negative(data in finite_vec(2, 100)) {
            let mut acc = WelfordAccumulator::new();
            for &x in &data {
                acc.update(x);
            }
            prop_assert!(acc.sample_variance().unwrap() >= 0.0);
        }

        #[test]
        fn merge_is_split_invariant(data in finite_vec(2, 100), split in 0_usize..100) {
            let split = split.min(data.len());
            let mut full = WelfordAccumulator::new();
            data.iter().for_each(|&x| full.update(x));

            let mut a = WelfordAccumulator::new();
            let mut b = WelfordAccumulator::new();
            data[..split].iter().for_each(|&x| a.update(x));
            data[split..].iter().for_each(|&x| b.update(x));
            a.merge(&b);

            let tol = 1e-9 * full.mean().unwrap().abs().max(1.0);
            prop_assert!((a.mean().unwrap() - full.mean().unwrap()).abs() < tol);
        }

        #[test]
        fn compensated_sum_close_to_naive(data in finite_vec(0, 100)) {
            let naive: f64 = data.iter().sum();
            let scale: f64 = data.iter().map(|x| x.abs()).sum::<f64>().max(1.0);
            let mut acc = CompensatedSum::new();
            data.iter().for_each(|&x| acc.add(x));
            prop_assert!((acc.value() - naive).abs() <= 1e-12 * scale);
        }
    }
}
