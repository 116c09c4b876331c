//! Sum of squares of random integers.
//!
//! The computation is a small graph: generate numbers, fan them out to independent square
//! computations, then reduce the squares to their sum. The squares run on the rayon thread pool
//! and the reduction is an order-independent sum, so the result does not depend on scheduling.

use rand::Rng;
use rayon::prelude::*;

/// Generated numbers are drawn uniformly from `0..=MAX_NUMBER`.
pub const MAX_NUMBER: u64 = 99;

/// Generate `length` random numbers.
pub fn generate_numbers<R: Rng + ?Sized>(length: usize, rng: &mut R) -> Vec<u64> {
    (0..length).map(|_| rng.gen_range(0..=MAX_NUMBER)).collect()
}

/// Fan the numbers out to one square computation each.
pub fn fan_out(numbers: &[u64]) -> impl ParallelIterator<Item = u64> + '_ {
    numbers.par_iter().map(|n| square_number(*n))
}

pub fn square_number(n: u64) -> u64 {
    n * n
}

/// Reduce the squares to their sum.
pub fn reduce_squares<I: ParallelIterator<Item = u64>>(squares: I) -> u64 {
    squares.sum()
}

/// Run the whole graph for `length` numbers drawn from `rng`.
pub fn sum_of_squares<R: Rng + ?Sized>(length: usize, rng: &mut R) -> u64 {
    let numbers = generate_numbers(length, rng);
    reduce_squares(fan_out(&numbers))
}
