// mutation methods
//
// a mutator perturbs a point group in place and reports every change it
// makes, exactly once, through a callback. the reported records are what
// the fitness pipeline replays onto a base triangulation, and what the
// optimiser recombines when a mutation turns out to be beneficial.

use rand::Rng;
use rand_distr::StandardNormal;
use rand_pcg::Pcg32;

use crate::geom::{NormPoint, NormPointGroup};

/// one applied point move: which point, where it was, where it ended up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mutation {
    pub index: usize,
    pub old: NormPoint,
    pub new: NormPoint,
}

/// a mutation operator over point groups.
pub trait Mutator {
    /// mutates `points` in place, invoking `on_mutation` once per applied
    /// mutation. coordinates are clamped back into [0, 1] before the record
    /// is emitted.
    fn mutate(&mut self, points: &mut NormPointGroup, on_mutation: &mut dyn FnMut(Mutation));
}

/// gaussian jitter: each point mutates with probability `rate`, moving by
/// normally distributed offsets scaled by `amount`. usually outperforms the
/// uniform method.
pub struct GaussianMutation {
    rate: f32,
    amount: f64,
    rng: Pcg32,
}

impl GaussianMutation {
    pub fn new(rate: f32, amount: f64, rng: Pcg32) -> Self {
        GaussianMutation { rate, amount, rng }
    }

    /// the defaults that work well in practice: about two mutated points
    /// per member per generation, each moving on the order of a third of
    /// the image.
    pub fn default_for(num_points: usize, rng: Pcg32) -> Self {
        Self::new(2.0 / num_points as f32, 0.3, rng)
    }
}

impl Mutator for GaussianMutation {
    fn mutate(&mut self, points: &mut NormPointGroup, on_mutation: &mut dyn FnMut(Mutation)) {
        profiling::scope!("gaussian_mutate");
        for i in 0..points.len() {
            if self.rng.random::<f32>() < self.rate {
                let old = points[i];

                let dx: f64 = self.rng.sample(StandardNormal);
                let dy: f64 = self.rng.sample(StandardNormal);
                points[i].x += dx * self.amount / 2.0;
                points[i].y += dy * self.amount / 2.0;
                points[i].clamp();

                on_mutation(Mutation {
                    index: i,
                    old,
                    new: points[i],
                });
            }
        }
    }
}

/// uniform jitter: offsets drawn uniformly from ±amount/2.
pub struct UniformMutation {
    rate: f64,
    amount: f64,
    rng: Pcg32,
}

impl UniformMutation {
    pub fn new(rate: f64, amount: f64, rng: Pcg32) -> Self {
        UniformMutation { rate, amount, rng }
    }
}

impl Mutator for UniformMutation {
    fn mutate(&mut self, points: &mut NormPointGroup, on_mutation: &mut dyn FnMut(Mutation)) {
        profiling::scope!("uniform_mutate");
        for i in 0..points.len() {
            if self.rng.random::<f64>() < self.rate {
                let old = points[i];

                points[i].x += (self.rng.random::<f64>() - 0.5) * self.amount;
                points[i].y += (self.rng.random::<f64>() - 0.5) * self.amount;
                points[i].clamp();

                on_mutation(Mutation {
                    index: i,
                    old,
                    new: points[i],
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn group() -> NormPointGroup {
        NormPointGroup(vec![
            NormPoint::new(0.23, 0.12),
            NormPoint::new(0.56, 0.34),
            NormPoint::new(0.34, 0.12),
        ])
    }

    #[test]
    fn test_gaussian_rate_zero_mutates_nothing() {
        let mut points = group();
        let original = points.clone();

        let mut method = GaussianMutation::new(0.0, 0.0, Pcg32::seed_from_u64(1));
        let mut count = 0;
        method.mutate(&mut points, &mut |_| count += 1);

        assert_eq!(points, original);
        assert_eq!(count, 0);
    }

    #[test]
    fn test_gaussian_rate_one_mutates_every_point() {
        let mut points = group();
        let original = points.clone();

        let mut method = GaussianMutation::new(1.0, 1.0, Pcg32::seed_from_u64(2));
        let mut records = Vec::new();
        method.mutate(&mut points, &mut |m| records.push(m));

        assert_ne!(points, original);
        assert_eq!(records.len(), 3);

        for (i, m) in records.iter().enumerate() {
            assert_eq!(m.index, i);
            assert_eq!(m.old, original[i]);
            assert_eq!(m.new, points[i]);
            assert!(m.new.x >= 0.0 && m.new.x <= 1.0);
            assert!(m.new.y >= 0.0 && m.new.y <= 1.0);
        }
    }

    #[test]
    fn test_uniform_rate_one_mutates_every_point() {
        let mut points = group();
        let original = points.clone();

        let mut method = UniformMutation::new(1.0, 1.0, Pcg32::seed_from_u64(3));
        let mut count = 0;
        method.mutate(&mut points, &mut |_| count += 1);

        assert_ne!(points, original);
        assert_eq!(count, 3);
        for p in points.iter() {
            assert!(p.x >= 0.0 && p.x <= 1.0);
            assert!(p.y >= 0.0 && p.y <= 1.0);
        }
    }

    #[test]
    fn test_uniform_offsets_stay_within_amount() {
        let mut points = group();
        let original = points.clone();

        let mut method = UniformMutation::new(1.0, 0.1, Pcg32::seed_from_u64(4));
        method.mutate(&mut points, &mut |_| {});

        for (p, o) in points.iter().zip(original.iter()) {
            assert!((p.x - o.x).abs() <= 0.05 + 1e-12);
            assert!((p.y - o.y).abs() <= 0.05 + 1e-12);
        }
    }
}
