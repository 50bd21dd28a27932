//! Probability that samples drawn without replacement from a common population
//! overlap, i.e. `1 - P(no two samples share a member)`.
//!
//! All three implementations evaluate the same formula. With `N` the population
//! and `a_1..a_k` the sample sizes, the exclusive probability is
//!
//! ```text
//! p = N! / (N - sum(a))!  /  prod_i N! / (N - a_i)!
//! ```
//!
//! and every function returns `1 - p`. Outside the valid domain
//! (`sum(a) > N`) the functions still return a number, but it is meaningless.
//! Use [`Algorithm::try_compute`] to reject such input.

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::{
    error::DomainError,
    statistics::combinatorics::{combinations, falling_product},
};

fn signed(x: u64) -> i64 {
    i64::try_from(x).unwrap_or(i64::MAX)
}

/// Evaluates the formula as a product of binomial ratios
/// `C(N - consumed, a_i) / C(N, a_i)`, one term per sample in the given order.
///
/// Overflows for populations above 170.
pub fn exclusive_probability_naive(samples: &[u64], population: u64) -> f64 {
    let population = signed(population);
    let mut p = 1.0;
    let mut sum: i64 = 0;
    for &a in samples {
        let a = signed(a);
        p *= combinations(population.saturating_sub(sum), a) / combinations(population, a);
        sum = sum.saturating_add(a);
    }
    1.0 - p
}

/// Evaluates the formula with the factorials cancelled, so that only the
/// falling products `N * (N - 1) * ... * (N - a + 1)` are ever computed.
pub fn exclusive_probability_algebraic(samples: &[u64], population: u64) -> f64 {
    let population = signed(population);
    let top = population.saturating_add(1);
    let mut sum: i64 = 0;
    let mut denominator = 1.0;
    for &a in samples {
        let a = signed(a);
        denominator *= falling_product(top.saturating_sub(a), top);
        sum = sum.saturating_add(a);
    }
    let numerator = falling_product(top.saturating_sub(sum), top);
    1.0 - numerator / denominator
}

/// Same result as [`exclusive_probability_algebraic`], computed with a running
/// product `h` shared between terms.
///
/// The samples are visited in ascending order on a private copy. Each term's
/// range `[N - a + 1, N]` then contains the previous one, so `h` only has to be
/// extended over the new integers and every factor is multiplied exactly once.
pub fn exclusive_probability_fully_optimized(samples: &[u64], population: u64) -> f64 {
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();

    let population = signed(population);
    let top = population.saturating_add(1);
    let mut sum: i64 = 0;
    let mut denominator = 1.0;

    let mut h = 1.0;
    let mut initial_x_of_last_h = top;

    for a in sorted {
        let a = signed(a);
        let initial_x = top.saturating_sub(a);
        h *= falling_product(initial_x, initial_x_of_last_h);
        denominator *= h;
        sum = sum.saturating_add(a);

        initial_x_of_last_h = initial_x;
    }

    let numerator = h * falling_product(top.saturating_sub(sum), initial_x_of_last_h);
    1.0 - numerator / denominator
}

/// Checks that the samples fit in the population.
pub fn validate_domain(samples: &[u64], population: u64) -> Result<(), DomainError> {
    let sum = samples
        .iter()
        .try_fold(0u64, |acc, &a| acc.checked_add(a))
        .ok_or(DomainError::SumOverflow)?;
    if sum > population {
        return Err(DomainError::SamplesExceedPopulation { sum, population });
    }
    Ok(())
}

#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    #[display("naive")]
    Naive,
    #[display("algebraic")]
    Algebraic,
    #[display("fully-optimized")]
    FullyOptimized,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [
        Algorithm::Naive,
        Algorithm::Algebraic,
        Algorithm::FullyOptimized,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Naive => "naive",
            Algorithm::Algebraic => "algebraic",
            Algorithm::FullyOptimized => "fully-optimized",
        }
    }

    pub fn compute(&self, samples: &[u64], population: u64) -> f64 {
        match self {
            Algorithm::Naive => exclusive_probability_naive(samples, population),
            Algorithm::Algebraic => exclusive_probability_algebraic(samples, population),
            Algorithm::FullyOptimized => {
                exclusive_probability_fully_optimized(samples, population)
            }
        }
    }

    /// Like [`Algorithm::compute`], but rejects samples that do not fit in the
    /// population and results that overflowed.
    pub fn try_compute(&self, samples: &[u64], population: u64) -> Result<f64, DomainError> {
        validate_domain(samples, population)?;
        let value = self.compute(samples, population);
        if !value.is_finite() {
            return Err(DomainError::NonFinite { value });
        }
        Ok(value)
    }
}
