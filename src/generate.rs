// point-group generators
//
// a generator produces the initial members of a population. random
// placement is the default; the spaced generator anneals points apart for
// a more even starting mesh, which helps small point counts.

use rand::Rng;
use rand_pcg::Pcg32;

use crate::geom::{NormPoint, NormPointGroup};

/// produces point groups of a requested size.
pub trait Generator {
    fn generate(&mut self, n: usize) -> NormPointGroup;
}

/// uniformly random points in the unit square.
pub struct RandomGenerator {
    rng: Pcg32,
}

impl RandomGenerator {
    pub fn new(rng: Pcg32) -> Self {
        RandomGenerator { rng }
    }
}

impl Generator for RandomGenerator {
    fn generate(&mut self, n: usize) -> NormPointGroup {
        random_points(n, &mut self.rng)
    }
}

fn random_points(n: usize, rng: &mut Pcg32) -> NormPointGroup {
    let mut points = Vec::with_capacity(n);
    for _ in 0..n {
        points.push(NormPoint::new(rng.random::<f64>(), rng.random::<f64>()));
    }
    NormPointGroup(points)
}

const START_TEMP: f64 = 0.5;
const MIN_TEMP: f64 = 0.02;

/// random points annealed apart: repeatedly jitter a random point and keep
/// the move when it increases the distance to its nearest neighbour, with
/// the jitter temperature decaying geometrically over the configured
/// iteration count.
pub struct SpacedGenerator {
    iterations: usize,
    decrement: f64,
    rng: Pcg32,
}

impl SpacedGenerator {
    pub fn new(iterations: usize, rng: Pcg32) -> Self {
        SpacedGenerator {
            iterations,
            decrement: (MIN_TEMP / START_TEMP).powf(1.0 / iterations as f64),
            rng,
        }
    }
}

impl Generator for SpacedGenerator {
    fn generate(&mut self, n: usize) -> NormPointGroup {
        let mut points = random_points(n, &mut self.rng);
        let mut temp = START_TEMP;

        for _ in 0..self.iterations {
            let i = self.rng.random_range(0..n);
            let mut candidate = points[i];

            let current_dist = nearest_dist(points[i], &points);
            candidate.x += (self.rng.random::<f64>() - 0.5) * temp;
            candidate.y += (self.rng.random::<f64>() - 0.5) * temp;
            candidate.clamp();

            if nearest_dist(candidate, &points) > current_dist {
                points[i] = candidate;
            }

            temp *= self.decrement;
        }

        points
    }
}

/// distance from `point` to its nearest distinct neighbour in `group`.
fn nearest_dist(point: NormPoint, group: &NormPointGroup) -> f64 {
    let mut dist = f64::INFINITY;
    for &p in group.iter() {
        if p == point {
            continue;
        }
        dist = dist.min(p.dist(point));
    }
    dist
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_random_generator_count() {
        let mut gen = RandomGenerator::new(Pcg32::seed_from_u64(7));
        let points = gen.generate(121);
        assert_eq!(points.len(), 121);

        for p in points.iter() {
            assert!(p.x >= 0.0 && p.x <= 1.0);
            assert!(p.y >= 0.0 && p.y <= 1.0);
        }
    }

    #[test]
    fn test_spaced_generator_count() {
        let mut gen = SpacedGenerator::new(1, Pcg32::seed_from_u64(7));
        let points = gen.generate(121);
        assert_eq!(points.len(), 121);
    }

    #[test]
    fn test_spaced_generator_improves_spacing() {
        let n = 40;
        let min_spacing = |points: &NormPointGroup| {
            points
                .iter()
                .map(|&p| nearest_dist(p, points))
                .fold(f64::INFINITY, f64::min)
        };

        let mut random = RandomGenerator::new(Pcg32::seed_from_u64(11));
        let mut spaced = SpacedGenerator::new(4000, Pcg32::seed_from_u64(11));

        let base = min_spacing(&random.generate(n));
        let annealed = min_spacing(&spaced.generate(n));

        assert!(
            annealed > base,
            "annealing did not improve spacing: {annealed} <= {base}"
        );
    }
}
