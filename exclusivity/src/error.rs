use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("sample sizes sum to {sum}, which exceeds the population size {population}")]
    SamplesExceedPopulation { sum: u64, population: u64 },
    #[error("sum of sample sizes overflows u64")]
    SumOverflow,
    #[error("result is not finite ({value}); the population is too large for f64 products")]
    NonFinite { value: f64 },
}
