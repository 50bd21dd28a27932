use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthStr;

use crate::{
    experiment::{runner::Experiment, trial::TrialResult},
    statistics::exclusive::Algorithm,
    utils::result_file_basename,
};

pub type Timestamp = chrono::DateTime<chrono::Local>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMeta {
    pub begin: Timestamp,
    pub end: Option<Timestamp>,
}

/// Everything recorded about one experiment run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub meta: ReportMeta,
    pub params: Experiment,
    pub results: Vec<TrialResult>,
}

impl Report {
    pub fn new(params: Experiment) -> Self {
        Self {
            meta: ReportMeta {
                begin: chrono::Local::now(),
                end: None,
            },
            params,
            results: Vec::new(),
        }
    }

    /// Runs the experiment and writes the report to `result_dir`, even when the
    /// run fails. Returns the path written; a failed run is reported after the
    /// file is on disk.
    pub fn run(experiment: Experiment, result_dir: &Path) -> anyhow::Result<(Self, PathBuf)> {
        let mut report = Self::new(experiment);
        let outcome = report.params.run();
        report.meta.end = Some(chrono::Local::now());

        let outcome = outcome.map(|results| report.results = results);
        let path = report.write_json(result_dir)?;
        outcome?;
        Ok((report, path))
    }

    pub fn write_json(&self, result_dir: &Path) -> anyhow::Result<PathBuf> {
        std::fs::create_dir_all(result_dir)?;
        let path = result_dir.join(result_file_basename(self.meta.begin, Some(".json")));
        let file = std::fs::File::create(&path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer(writer, self)?;
        log::info!("Results written to {}", path.display());
        Ok(path)
    }

    /// Aggregates the trials per algorithm, in [`Algorithm::ALL`] order.
    pub fn summary(&self) -> Vec<AlgorithmSummary> {
        let mut summaries: FxHashMap<Algorithm, AlgorithmSummary> = Algorithm::ALL
            .into_iter()
            .map(|algorithm| (algorithm, AlgorithmSummary::empty(algorithm)))
            .collect();
        let mut iterations_timed: FxHashMap<Algorithm, usize> = FxHashMap::default();

        for trial in &self.results {
            let reference = trial
                .result_for(Algorithm::Naive)
                .and_then(|naive| naive.result);
            for result in &trial.results {
                let summary = summaries
                    .entry(result.algorithm)
                    .or_insert_with(|| AlgorithmSummary::empty(result.algorithm));
                summary.trials += 1;
                if result.error.is_some() {
                    summary.errors += 1;
                }
                if let Some(runtime) = result.runtime {
                    summary.total_runtime += runtime;
                    *iterations_timed.entry(result.algorithm).or_default() += trial.iterations;
                }
                if let (Some(value), Some(reference)) = (result.result, reference) {
                    let deviation = (value - reference).abs();
                    summary.max_deviation_from_naive =
                        summary.max_deviation_from_naive.max(deviation);
                }
            }
        }

        let mut summaries: Vec<AlgorithmSummary> = summaries
            .into_iter()
            .map(|(algorithm, mut summary)| {
                let iterations = iterations_timed.get(&algorithm).copied().unwrap_or(0);
                if iterations > 0 {
                    summary.mean_runtime = Some(summary.total_runtime / iterations as f64);
                }
                summary
            })
            .collect();
        summaries.sort_by_key(|s| s.algorithm);
        summaries
    }

    pub fn pretty_print_summary(&self, f: &mut impl std::fmt::Write) -> std::fmt::Result {
        let summaries = self.summary();
        let name_width = summaries
            .iter()
            .map(|s| s.algorithm.name().width())
            .chain(["algorithm".width()])
            .max()
            .unwrap_or(0);

        writeln!(
            f,
            "{:<name_width$}  {:>8}  {:>8}  {:>14}  {:>12}",
            "algorithm", "trials", "errors", "mean runtime", "max |Δ naive|"
        )?;
        for s in &summaries {
            let padding = name_width - s.algorithm.name().width();
            write!(f, "{}{}", s.algorithm.name(), " ".repeat(padding))?;
            write!(f, "  {:>8}  {:>8}", s.trials, s.errors)?;
            match s.mean_runtime {
                Some(runtime) => write!(f, "  {:>12.3}µs", runtime * 1e6)?,
                None => write!(f, "  {:>14}", "-")?,
            }
            writeln!(f, "  {:>12.3e}", s.max_deviation_from_naive)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmSummary {
    pub algorithm: Algorithm,
    pub trials: usize,
    pub errors: usize,
    /// Seconds summed over every timed iteration.
    pub total_runtime: f64,
    /// Seconds per iteration.
    pub mean_runtime: Option<f64>,
    /// Largest absolute difference from the naive result, over trials where
    /// both succeeded.
    pub max_deviation_from_naive: f64,
}

impl AlgorithmSummary {
    fn empty(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            trials: 0,
            errors: 0,
            total_runtime: 0.0,
            mean_runtime: None,
            max_deviation_from_naive: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::{
        runner::ExperimentBuilder,
        trial::{AlgorithmResult, TrialArgs},
    };

    fn experiment() -> Experiment {
        ExperimentBuilder::new()
            .trials_per_n(2)
            .iterations_per_trial(3)
            .range(10, 12)
            .cores(1)
            .seed(Some(5))
            .build()
            .unwrap()
    }

    fn trial(naive: Option<f64>, optimized: Option<f64>) -> TrialResult {
        let result = |algorithm, value: Option<f64>| AlgorithmResult {
            algorithm,
            runtime: value.map(|_| 0.003),
            result: value,
            error: value.is_none().then(|| String::from("overflow")),
        };
        TrialResult {
            args: TrialArgs {
                population: 10,
                sequence: vec![2, 2],
            },
            index: 1,
            iterations: 3,
            results: vec![
                result(Algorithm::Naive, naive),
                result(Algorithm::Algebraic, optimized),
                result(Algorithm::FullyOptimized, optimized),
            ],
        }
    }

    #[test]
    fn test_summary() {
        let mut report = Report::new(experiment());
        report.results = vec![trial(Some(0.5), Some(0.5 + 1e-12)), trial(None, Some(0.25))];

        let summary = report.summary();
        let order: Vec<Algorithm> = summary.iter().map(|s| s.algorithm).collect();
        assert_eq!(order, Algorithm::ALL.to_vec());

        let naive = &summary[0];
        assert_eq!((naive.trials, naive.errors), (2, 1));
        assert!((naive.mean_runtime.unwrap() - 0.001).abs() < 1e-12);
        assert_eq!(naive.max_deviation_from_naive, 0.0);

        let optimized = &summary[2];
        assert_eq!((optimized.trials, optimized.errors), (2, 0));
        assert!((optimized.mean_runtime.unwrap() - 0.001).abs() < 1e-12);
        assert!((optimized.max_deviation_from_naive - 1e-12).abs() < 1e-15);
    }

    #[test]
    fn test_pretty_print_summary() {
        let mut report = Report::new(experiment());
        report.results = vec![trial(Some(0.5), Some(0.5))];
        let mut out = String::new();
        report.pretty_print_summary(&mut out).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 1 + Algorithm::ALL.len());
        assert!(lines[1].starts_with("naive "));
        assert!(lines[3].starts_with("fully-optimized "));
    }

    #[test]
    fn test_run_writes_report() {
        let dir = std::env::temp_dir().join(format!("exclusivity-report-{}", std::process::id()));
        let (report, path) = Report::run(experiment(), &dir).unwrap();
        assert!(report.meta.end.is_some());
        assert_eq!(report.results.len(), 6);

        let written: Report = serde_json::from_reader(std::fs::File::open(&path).unwrap()).unwrap();
        assert_eq!(written.params, report.params);
        assert_eq!(written.results.len(), report.results.len());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
