use std::hint::black_box;

use serde::{Deserialize, Serialize};

use crate::{
    experiment::sequence::generate_sequence,
    statistics::{
        exclusive::{Algorithm, validate_domain},
        roller::Roller,
    },
};

/// Everything needed to run one trial, independent of the experiment that
/// produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialContext {
    /// 1-based position of the trial among those for its population.
    pub index: usize,
    pub trials_per_n: usize,
    pub iterations_per_trial: usize,
    pub population: u64,
    pub sequence: Vec<u64>,
}

impl TrialContext {
    /// Builds the `index`th trial for `population`.
    ///
    /// Later trials allow larger samples: the largest size is
    /// `population * index / trials_per_n`, but never less than 2.
    pub fn generate(
        index: usize,
        trials_per_n: usize,
        iterations_per_trial: usize,
        population: u64,
        roller: &mut Roller,
    ) -> anyhow::Result<Self> {
        let max_value = Self::max_sample_size(index, trials_per_n, population);
        let sequence = generate_sequence(population, max_value, roller)?;
        Ok(Self {
            index,
            trials_per_n,
            iterations_per_trial,
            population,
            sequence,
        })
    }

    pub fn max_sample_size(index: usize, trials_per_n: usize, population: u64) -> u64 {
        let max_value = (population as u128 * index as u128 / trials_per_n.max(1) as u128) as u64;
        if max_value <= 1 { 2 } else { max_value }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialArgs {
    pub population: u64,
    pub sequence: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmResult {
    pub algorithm: Algorithm,
    /// Total wall-clock seconds over all iterations.
    pub runtime: Option<f64>,
    pub result: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    pub args: TrialArgs,
    pub index: usize,
    pub iterations: usize,
    pub results: Vec<AlgorithmResult>,
}

impl TrialResult {
    pub fn result_for(&self, algorithm: Algorithm) -> Option<&AlgorithmResult> {
        self.results.iter().find(|r| r.algorithm == algorithm)
    }
}

/// Runs every algorithm on the trial's sequence, timing
/// `iterations_per_trial` repetitions of each.
pub fn execute_trial(context: &TrialContext) -> TrialResult {
    let results = Algorithm::ALL
        .into_iter()
        .map(|algorithm| execute_algorithm(algorithm, context))
        .collect();

    TrialResult {
        args: TrialArgs {
            population: context.population,
            sequence: context.sequence.clone(),
        },
        index: context.index,
        iterations: context.iterations_per_trial,
        results,
    }
}

fn execute_algorithm(algorithm: Algorithm, context: &TrialContext) -> AlgorithmResult {
    let failed = |error: String| AlgorithmResult {
        algorithm,
        runtime: None,
        result: None,
        error: Some(error),
    };

    if let Err(e) = validate_domain(&context.sequence, context.population) {
        return failed(e.to_string());
    }

    let start = chrono::Utc::now();
    let mut value = f64::NAN;
    for _ in 0..context.iterations_per_trial.max(1) {
        value = algorithm.compute(black_box(&context.sequence), black_box(context.population));
    }
    let runtime = (chrono::Utc::now() - start).as_seconds_f64();

    if !value.is_finite() {
        log::debug!(
            "{algorithm} produced {value} for population {} and sequence {:?}",
            context.population,
            context.sequence
        );
        return failed(format!("result is not finite ({value})"));
    }

    AlgorithmResult {
        algorithm,
        runtime: Some(runtime),
        result: Some(value),
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use statrs::assert_almost_eq;

    use super::*;

    #[test]
    fn test_max_sample_size() {
        assert_eq!(TrialContext::max_sample_size(1, 30, 10), 2);
        assert_eq!(TrialContext::max_sample_size(15, 30, 10), 5);
        assert_eq!(TrialContext::max_sample_size(30, 30, 10), 10);
        assert_eq!(TrialContext::max_sample_size(1, 1, 1), 2);
    }

    #[test]
    fn test_generate_context() {
        let mut roller = Roller::test_rng();
        let context = TrialContext::generate(3, 10, 5, 40, &mut roller).unwrap();
        assert_eq!(context.index, 3);
        assert_eq!(context.population, 40);
        assert!(context.sequence.len() >= 2);
        assert!(context.sequence.iter().all(|&a| a <= 12));
    }

    #[test]
    fn test_execute_trial() {
        let context = TrialContext {
            index: 1,
            trials_per_n: 1,
            iterations_per_trial: 4,
            population: 10,
            sequence: vec![2, 2],
        };
        let trial = execute_trial(&context);
        assert_eq!(trial.iterations, 4);
        assert_eq!(trial.args.sequence, vec![2, 2]);
        assert_eq!(trial.results.len(), Algorithm::ALL.len());
        for algorithm in Algorithm::ALL {
            let result = trial.result_for(algorithm).unwrap();
            assert!(result.error.is_none());
            assert!(result.runtime.unwrap() >= 0.0);
            assert_almost_eq!(result.result.unwrap(), 1.0 - 28.0 / 45.0, 1e-12);
        }
    }

    #[test]
    fn test_execute_trial_records_errors() {
        let context = TrialContext {
            index: 1,
            trials_per_n: 1,
            iterations_per_trial: 1,
            population: 1000,
            sequence: vec![100, 2],
        };
        let trial = execute_trial(&context);
        let naive = trial.result_for(Algorithm::Naive).unwrap();
        assert!(naive.error.is_some());
        assert!(naive.runtime.is_none() && naive.result.is_none());
        let optimized = trial.result_for(Algorithm::FullyOptimized).unwrap();
        assert!(optimized.error.is_none());

        let context = TrialContext {
            sequence: vec![800, 300],
            ..context
        };
        let trial = execute_trial(&context);
        assert!(trial.results.iter().all(|r| r.error.is_some()));
    }
}
