//! Sampler — draws a fixed-size random subset of candidate records.
//!
//! Reseeds from wall-clock time on every invocation, so repeated runs draw
//! independent samples. Pass a fixed seed for deterministic tests.

use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::dataset::{CandidateDataset, CandidateRecord};
use crate::error::SampleError;

/// Draw `n` records uniformly at random, without replacement.
///
/// The returned order is unspecified.
pub fn sample(
    dataset: &CandidateDataset,
    n: usize,
    seed: Option<u64>,
) -> Result<Vec<CandidateRecord>, SampleError> {
    let population = dataset.len();
    if n > population {
        return Err(SampleError::SizeExceedsPopulation {
            requested: n,
            population,
        });
    }

    let seed = seed.unwrap_or_else(|| Utc::now().timestamp() as u64);
    let mut rng = StdRng::seed_from_u64(seed);
    let picked: Vec<CandidateRecord> = dataset
        .records()
        .choose_multiple(&mut rng, n)
        .cloned()
        .collect();
    debug!(requested = n, population, seed, "Sample drawn");
    Ok(picked)
}
