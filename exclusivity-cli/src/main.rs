use std::{path::PathBuf, sync::LazyLock};

use clap::{Parser, Subcommand, ValueEnum};
use exclusivity::prelude::*;
use serde::Serialize;

static BENCHMARK_ABOUT: LazyLock<String> = LazyLock::new(|| {
    format!(
        "Runs the benchmarking experiment for the {} algorithms",
        grammatical_list(Algorithm::ALL.iter().map(Algorithm::name), "and", true)
    )
});

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Computes the probability that samples of the given sizes overlap
    Compute {
        /// Population size
        #[arg(short = 'N', long)]
        population: u64,

        /// Sample sizes
        #[arg(required = true, value_name = "SIZE")]
        samples: Vec<u64>,

        /// Algorithm to evaluate with
        #[arg(short, long, value_enum, default_value_t = AlgorithmChoice::All)]
        algorithm: AlgorithmChoice,

        /// Reject sample sizes that do not fit in the population
        #[arg(long, default_value_t = false)]
        checked: bool,

        /// Print the results as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    #[command(about = BENCHMARK_ABOUT.as_str())]
    Benchmark {
        /// Number of trials to generate for each population
        #[arg(short = 'T', long, default_value_t = 30)]
        trials: usize,

        /// Range of population sizes (ends included) to generate trials for
        #[arg(
            short = 'R',
            long = "rng",
            num_args = 2,
            value_names = ["LO", "HI"],
            default_values_t = [10, 100]
        )]
        range: Vec<u64>,

        /// Number of times to run each trial
        #[arg(short = 'I', long, default_value_t = 30)]
        iterations: usize,

        /// Number of CPUs to use. -1 uses all on machine and 0 uses 1
        #[arg(short = 'C', long, default_value_t = -1, allow_negative_numbers = true)]
        cores: i64,

        /// Test population sizes in ascending order. Descending by default
        #[arg(long, default_value_t = false)]
        ascending: bool,

        /// Random seed for reproducible trials
        #[arg(long, default_value = None)]
        seed: Option<u64>,

        /// Directory the results file is written to
        #[arg(short, long, default_value = "Results", value_name = "DIR")]
        output_dir: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum AlgorithmChoice {
    Naive,
    Algebraic,
    FullyOptimized,
    All,
}

impl AlgorithmChoice {
    fn algorithms(self) -> Vec<Algorithm> {
        match self {
            AlgorithmChoice::Naive => vec![Algorithm::Naive],
            AlgorithmChoice::Algebraic => vec![Algorithm::Algebraic],
            AlgorithmChoice::FullyOptimized => vec![Algorithm::FullyOptimized],
            AlgorithmChoice::All => Algorithm::ALL.to_vec(),
        }
    }
}

#[derive(Serialize, Debug)]
struct ComputeOutput {
    algorithm: Algorithm,
    probability: f64,
}

fn compute(
    population: u64,
    samples: &[u64],
    algorithm: AlgorithmChoice,
    checked: bool,
    json: bool,
) -> anyhow::Result<()> {
    let mut outputs = Vec::new();
    for algorithm in algorithm.algorithms() {
        let probability = if checked {
            algorithm.try_compute(samples, population)?
        } else {
            algorithm.compute(samples, population)
        };
        log::debug!("{algorithm}: {probability}");
        outputs.push(ComputeOutput {
            algorithm,
            probability,
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&outputs)?);
    } else {
        for output in &outputs {
            println!("{}: {}", output.algorithm, output.probability);
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    env_logger::builder()
        .format_timestamp_secs()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    match args.command {
        Command::Compute {
            population,
            samples,
            algorithm,
            checked,
            json,
        } => compute(population, &samples, algorithm, checked, json),
        Command::Benchmark {
            trials,
            range,
            iterations,
            cores,
            ascending,
            seed,
            output_dir,
        } => {
            let [lo, hi] = range[..] else {
                anyhow::bail!("Expected two population bounds, got {}", range.len());
            };
            let experiment = ExperimentBuilder::new()
                .trials_per_n(trials)
                .iterations_per_trial(iterations)
                .range(lo, hi)
                .cores(cores)
                .ascending(ascending)
                .seed(seed)
                .build()?;
            log::info!("Starting benchmark with parameters: {:?}", experiment);

            let (report, path) = Report::run(experiment, &output_dir)?;

            let elapsed = report
                .meta
                .end
                .map(|end| (end - report.meta.begin).as_seconds_f64())
                .unwrap_or_default();
            log::info!(
                "Benchmark complete: {} trials in {:.2} seconds, written to {}",
                report.results.len(),
                elapsed,
                path.display()
            );

            let mut summary = String::new();
            report.pretty_print_summary(&mut summary)?;
            print!("{summary}");
            Ok(())
        }
    }
}
