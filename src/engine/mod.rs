// engine module organization
// the algorithm seam plus the modified genetic implementation

pub mod genetic;

pub use genetic::ModifiedGenetic;

use crate::geom::NormPointGroup;
use serde::Serialize;
use std::time::Duration;

/// an iterative optimisation algorithm over point groups.
pub trait Algorithm {
    /// runs one generation.
    fn step(&mut self);

    /// the point group with the highest fitness in the population.
    fn best(&self) -> &NormPointGroup;

    /// statistics about the algorithm's progress.
    fn stats(&self) -> Stats;
}

/// basic statistics of a running algorithm.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct Stats {
    pub best_fitness: f64,
    pub generation: u64,
    /// wall time of the most recent generation.
    pub time_for_gen: Duration,
}
