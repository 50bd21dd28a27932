use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
        mpsc,
    },
    thread,
};

use serde::{Deserialize, Serialize};

use crate::{
    experiment::{
        sequence::MIN_POPULATION,
        trial::{TrialContext, TrialResult, execute_trial},
    },
    statistics::{exclusive::Algorithm, roller::Roller},
};

/// Parameters of a benchmarking run over a range of population sizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experiment {
    pub trials_per_n: usize,
    pub iterations_per_trial: usize,
    /// Inclusive range of population sizes.
    pub range: (u64, u64),
    pub cores: usize,
    pub ascending: bool,
    pub seed: Option<u64>,
}

impl Experiment {
    /// Number of (trial, algorithm) pairs the experiment will run.
    pub fn total_algotrials(&self) -> usize {
        Algorithm::ALL.len() * self.total_trials()
    }

    pub fn total_populations(&self) -> usize {
        let (lo, hi) = self.range;
        if hi < lo { 0 } else { (hi - lo + 1) as usize }
    }

    pub fn total_trials(&self) -> usize {
        self.total_populations() * self.trials_per_n
    }

    pub fn populations(&self) -> Box<dyn Iterator<Item = u64>> {
        let (lo, hi) = self.range;
        if self.ascending {
            Box::new(lo..=hi)
        } else {
            Box::new((lo..=hi).rev())
        }
    }

    /// Generates every trial up front so a seeded experiment always runs the
    /// same sequences, regardless of how many workers execute them.
    pub fn trials(&self, roller: &mut Roller) -> anyhow::Result<Vec<TrialContext>> {
        let mut contexts = Vec::with_capacity(self.total_trials());
        for population in self.populations() {
            for i in 0..self.trials_per_n {
                contexts.push(TrialContext::generate(
                    i + 1,
                    self.trials_per_n,
                    self.iterations_per_trial,
                    population,
                    roller,
                )?);
            }
        }
        Ok(contexts)
    }

    pub fn run(&self) -> anyhow::Result<Vec<TrialResult>> {
        let mut roller = match self.seed {
            Some(seed) => Roller::from_seed(seed),
            None => Roller::new(),
        };
        let contexts = self.trials(&mut roller)?;
        log::info!(
            "Running {} trials ({} algorithm runs) over populations {}..={}",
            contexts.len(),
            self.total_algotrials(),
            self.range.0,
            self.range.1
        );

        if self.cores <= 1 {
            Ok(self.serial(&contexts))
        } else {
            self.parallel(contexts)
        }
    }

    pub fn serial(&self, contexts: &[TrialContext]) -> Vec<TrialResult> {
        let mut progress = Progress::new(contexts.len());
        contexts
            .iter()
            .map(|context| {
                let result = execute_trial(context);
                progress.advance();
                result
            })
            .collect()
    }

    /// Runs the trials on `self.cores` worker threads. Results come back in
    /// completion order, not in trial order.
    pub fn parallel(&self, contexts: Vec<TrialContext>) -> anyhow::Result<Vec<TrialResult>> {
        let contexts = Arc::new(contexts);
        let next = Arc::new(AtomicUsize::new(0));
        let (result_tx, result_rx) = mpsc::channel();

        let workers = (0..self.cores)
            .map(|worker| {
                let contexts = Arc::clone(&contexts);
                let next = Arc::clone(&next);
                let result_tx = result_tx.clone();
                thread::Builder::new()
                    .name(format!("trial-worker-{worker}"))
                    .spawn(move || {
                        loop {
                            let i = next.fetch_add(1, Ordering::Relaxed);
                            let Some(context) = contexts.get(i) else {
                                break;
                            };
                            if result_tx.send(execute_trial(context)).is_err() {
                                break;
                            }
                        }
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        drop(result_tx);

        let mut progress = Progress::new(contexts.len());
        let mut results = Vec::with_capacity(contexts.len());
        for result in result_rx {
            results.push(result);
            progress.advance();
        }

        for worker in workers {
            if worker.join().is_err() {
                anyhow::bail!("Trial worker panicked");
            }
        }
        if results.len() != contexts.len() {
            anyhow::bail!(
                "Expected {} trial results, got {}",
                contexts.len(),
                results.len()
            );
        }
        Ok(results)
    }
}

struct Progress {
    total: usize,
    completed: usize,
    last_reported: f64,
}

impl Progress {
    fn new(total: usize) -> Self {
        Self {
            total,
            completed: 0,
            last_reported: 0.0,
        }
    }

    fn advance(&mut self) {
        self.completed += 1;
        let progress = self.completed as f64 / self.total.max(1) as f64;
        if (progress - self.last_reported) >= 0.1 || self.completed == self.total {
            self.last_reported = progress;
            log::info!(
                "Trials: {}/{} ({:.0}%)",
                self.completed,
                self.total,
                progress * 100.0
            );
        }
    }
}

/// Validating constructor for [`Experiment`].
#[derive(Debug, Clone)]
pub struct ExperimentBuilder {
    trials_per_n: usize,
    iterations_per_trial: usize,
    range: (u64, u64),
    cores: i64,
    ascending: bool,
    seed: Option<u64>,
}

impl Default for ExperimentBuilder {
    fn default() -> Self {
        Self {
            trials_per_n: 30,
            iterations_per_trial: 30,
            range: (10, 100),
            cores: -1,
            ascending: false,
            seed: None,
        }
    }
}

impl ExperimentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trials_per_n(mut self, trials: usize) -> Self {
        self.trials_per_n = trials;
        self
    }

    pub fn iterations_per_trial(mut self, iterations: usize) -> Self {
        self.iterations_per_trial = iterations;
        self
    }

    /// Population sizes to test, both ends included. The ends may be given in
    /// either order.
    pub fn range(mut self, lo: u64, hi: u64) -> Self {
        self.range = (lo, hi);
        self
    }

    /// Worker threads: `0` means one, a negative value means every available CPU.
    pub fn cores(mut self, cores: i64) -> Self {
        self.cores = cores;
        self
    }

    pub fn ascending(mut self, ascending: bool) -> Self {
        self.ascending = ascending;
        self
    }

    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn build(self) -> anyhow::Result<Experiment> {
        let available = thread::available_parallelism().map_or(1, |n| n.get());
        self.build_with_available_cores(available)
    }

    fn build_with_available_cores(self, available: usize) -> anyhow::Result<Experiment> {
        let (mut lo, mut hi) = self.range;
        if lo > hi {
            std::mem::swap(&mut lo, &mut hi);
        }
        if lo < MIN_POPULATION {
            anyhow::bail!("Testable populations must be in range [{MIN_POPULATION}, inf.)");
        }
        if self.trials_per_n == 0 {
            anyhow::bail!("At least one trial per population is required");
        }
        if self.iterations_per_trial == 0 {
            anyhow::bail!("At least one iteration per trial is required");
        }

        let cores = match self.cores {
            0 => 1,
            c if c < 0 => available,
            c if c as u64 > available as u64 => {
                anyhow::bail!("Cores must be in range [-1, {available}]")
            }
            c => c as usize,
        };

        Ok(Experiment {
            trials_per_n: self.trials_per_n,
            iterations_per_trial: self.iterations_per_trial,
            range: (lo, hi),
            cores,
            ascending: self.ascending,
            seed: self.seed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_experiment(cores: i64) -> Experiment {
        ExperimentBuilder::new()
            .trials_per_n(4)
            .iterations_per_trial(2)
            .range(12, 5)
            .cores(cores)
            .ascending(true)
            .seed(Some(11))
            .build_with_available_cores(4)
            .unwrap()
    }

    #[test]
    fn test_builder_normalizes_input() {
        let experiment = small_experiment(0);
        assert_eq!(experiment.range, (5, 12));
        assert_eq!(experiment.cores, 1);
        assert_eq!(small_experiment(-1).cores, 4);
        assert_eq!(small_experiment(3).cores, 3);
    }

    #[test]
    fn test_builder_rejects_invalid_input() {
        let builder = ExperimentBuilder::new();
        assert!(builder.clone().cores(5).build_with_available_cores(4).is_err());
        assert!(builder.clone().range(2, 10).build_with_available_cores(4).is_err());
        assert!(builder.clone().trials_per_n(0).build_with_available_cores(4).is_err());
        assert!(
            builder
                .iterations_per_trial(0)
                .build_with_available_cores(4)
                .is_err()
        );
    }

    #[test]
    fn test_totals() {
        let experiment = small_experiment(1);
        assert_eq!(experiment.total_populations(), 8);
        assert_eq!(experiment.total_trials(), 32);
        assert_eq!(experiment.total_algotrials(), 96);
    }

    #[test]
    fn test_population_order() {
        let mut experiment = small_experiment(1);
        assert_eq!(experiment.populations().next(), Some(5));
        experiment.ascending = false;
        let populations: Vec<u64> = experiment.populations().collect();
        assert_eq!(populations.first(), Some(&12));
        assert_eq!(populations.last(), Some(&5));
    }

    #[test]
    fn test_serial_run() {
        let experiment = small_experiment(1);
        let results = experiment.run().unwrap();
        assert_eq!(results.len(), experiment.total_trials());
        for trial in &results {
            assert_eq!(trial.iterations, 2);
            assert!(trial.results.iter().all(|r| r.error.is_none()));
        }
    }

    #[test]
    fn test_parallel_matches_serial() {
        let key = |t: &TrialResult| (t.args.population, t.index);

        let mut serial = small_experiment(1).run().unwrap();
        let mut parallel = small_experiment(3).run().unwrap();
        assert_eq!(serial.len(), parallel.len());
        serial.sort_by_key(key);
        parallel.sort_by_key(key);
        for (a, b) in serial.iter().zip(&parallel) {
            assert_eq!(a.args, b.args);
            for algorithm in Algorithm::ALL {
                assert_eq!(
                    a.result_for(algorithm).unwrap().result,
                    b.result_for(algorithm).unwrap().result
                );
            }
        }
    }
}
