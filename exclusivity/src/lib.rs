pub mod error;
pub mod experiment;
pub mod statistics;
pub mod utils;

pub mod prelude {
    pub use crate::{
        error::DomainError,
        experiment::{
            report::{AlgorithmSummary, Report},
            runner::{Experiment, ExperimentBuilder},
            sequence::generate_sequence,
            trial::{AlgorithmResult, TrialContext, TrialResult, execute_trial},
        },
        statistics::{
            combinatorics::{combinations, factorial, falling_product},
            exclusive::{
                Algorithm, exclusive_probability_algebraic, exclusive_probability_fully_optimized,
                exclusive_probability_naive, validate_domain,
            },
            roller::Roller,
        },
        utils::grammatical_list,
    };
}
