use crate::statistics::roller::Roller;

/// The smallest population for which a sequence of at least two positive sizes
/// with a sum below the population exists.
pub const MIN_POPULATION: u64 = 3;

/// Generates a random sequence of sample sizes for a population of size
/// `population`.
///
/// Each size is uniform in `[1, max_value]`. The sequence always holds at least
/// two sizes and its sum is strictly less than `population`. Whenever the sum
/// reaches the population the largest size is dropped. The chance of stopping
/// after each step grows with the sum, so sequences tend to fill the population.
pub fn generate_sequence(
    population: u64,
    max_value: u64,
    roller: &mut Roller,
) -> anyhow::Result<Vec<u64>> {
    if population < MIN_POPULATION {
        anyhow::bail!("Population must be at least {MIN_POPULATION}, got {population}");
    }
    if max_value == 0 {
        anyhow::bail!("Maximum sample size must be positive");
    }

    let mut sequence: Vec<u64> = Vec::new();
    let mut sum: u64 = 0;
    loop {
        // the stopping chance uses the sum from before the removal
        let observed_sum = sum;
        if sum >= population {
            if let Some((index, _)) = sequence.iter().enumerate().max_by_key(|(_, a)| **a) {
                sum -= sequence.remove(index);
            }
        }

        let probability_of_terminating = observed_sum as f64 / population as f64;
        if roller.unit() < probability_of_terminating && sequence.len() >= 2 {
            break;
        }

        let value = roller.roll(1, max_value);
        sequence.push(value);
        sum += value;
    }

    log::trace!("Generated sequence {sequence:?} for population {population}");
    Ok(sequence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_postconditions() {
        let mut roller = Roller::test_rng();
        for population in MIN_POPULATION..=120 {
            for max_value in [1, 2, population / 3 + 1, population, population * 2] {
                let sequence = generate_sequence(population, max_value, &mut roller).unwrap();
                assert!(sequence.len() >= 2, "{sequence:?}");
                assert!(sequence.iter().sum::<u64>() < population, "{sequence:?}");
                assert!(sequence.iter().all(|&a| (1..=max_value).contains(&a)));
            }
        }
    }

    #[test]
    fn test_sequence_is_reproducible() {
        let a = generate_sequence(50, 10, &mut Roller::from_seed(3)).unwrap();
        let b = generate_sequence(50, 10, &mut Roller::from_seed(3)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_sequence_rejects_degenerate_input() {
        let mut roller = Roller::test_rng();
        assert!(generate_sequence(2, 2, &mut roller).is_err());
        assert!(generate_sequence(10, 0, &mut roller).is_err());
    }
}
