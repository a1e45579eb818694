// the modified genetic algorithm
//
// each generation a fixed number of members survive unchanged (the bases);
// every other member is a mutated copy of a base. after parallel fitness
// evaluation, mutations whose carrier outscored its base are recombined
// into one reserved member per base, so independent improvements found by
// different members in the same generation are not lost to each other.
// the population is then sorted by fitness and the cycle repeats.

use std::time::Instant;

use crate::evaluate::Evaluator;
use crate::fitness::PointsData;
use crate::geom::NormPointGroup;
use crate::mutate::{Mutation, Mutator};

use super::{Algorithm, Stats};

/// a beneficial mutation together with the member that carried it, kept so
/// duplicate point indexes can be resolved toward the fitter carrier.
#[derive(Clone, Copy)]
struct Beneficial {
    mutation: Mutation,
    carrier: usize,
}

/// see the module docs. generic over the evaluator and mutator so the hot
/// fitness loop is monomorphised at the call site.
pub struct ModifiedGenetic<E, M> {
    evaluator: E,
    mutator: M,

    population: Vec<NormPointGroup>,
    new_population: Vec<NormPointGroup>,

    fitnesses: Vec<f64>,

    /// mutations applied to each member this generation.
    mutations: Vec<Vec<Mutation>>,

    /// beneficial mutations collected per base, at most one per point index.
    beneficial: Vec<Vec<Beneficial>>,

    best: NormPointGroup,
    cutoff: usize,
    stats: Stats,
}

impl<E: Evaluator, M: Mutator> ModifiedGenetic<E, M> {
    /// builds the algorithm and scores the starting population so the first
    /// `step()` has base fitnesses and cache contents to work against.
    pub fn new(
        mut point_factory: impl FnMut() -> NormPointGroup,
        size: usize,
        cutoff: usize,
        evaluator_factory: impl FnOnce(usize) -> E,
        mutator: M,
    ) -> Self {
        assert!(
            cutoff >= 1 && size > 2 * cutoff,
            "population must hold bases, mutated members and recombination slots"
        );

        let mut population = Vec::with_capacity(size);
        let mut new_population = Vec::with_capacity(size);
        for _ in 0..size {
            let points = point_factory();
            new_population.push(points.clone());
            population.push(points);
        }

        let best = population[0].clone();

        let mut algo = ModifiedGenetic {
            evaluator: evaluator_factory(size),
            mutator,
            population,
            new_population,
            fitnesses: vec![0.0; size],
            mutations: vec![Vec::new(); size],
            beneficial: vec![Vec::new(); cutoff],
            best,
            cutoff,
            stats: Stats::default(),
        };

        algo.calculate_fitnesses();
        algo.update_fitnesses();

        algo
    }

    /// fills the next generation: bases survive unchanged, everything up to
    /// the recombination slots becomes a mutated copy of a base.
    fn new_generation(&mut self) {
        profiling::scope!("new_generation");
        let size = self.population.len();
        let cutoff = self.cutoff;

        for i in 0..cutoff {
            self.new_population[i].set(&self.population[i]);
            self.mutations[i].clear();
        }

        // the top slice is reserved for recombined members, so mutated
        // copies stop at size - cutoff
        let mut i = cutoff;
        while i < size - cutoff {
            let mut base = 0;
            while base < cutoff && i < size - cutoff {
                self.mutations[i].clear();
                self.new_population[i].set(&self.population[base]);
                self.evaluator.set_base(i, base);

                let mutations = &mut self.mutations[i];
                self.mutator
                    .mutate(&mut self.new_population[i], &mut |m| mutations.push(m));

                i += 1;
                base += 1;
            }
        }

        for b in &mut self.beneficial {
            b.clear();
        }

        std::mem::swap(&mut self.population, &mut self.new_population);
    }

    /// scores members [0, size - cutoff) in parallel. bases are included:
    /// their triangles refresh the cache every generation. results are
    /// drained in completion order on this thread, which is where the
    /// beneficial-mutation bookkeeping happens.
    fn calculate_fitnesses(&mut self) {
        profiling::scope!("calculate_fitnesses");
        let size = self.population.len();
        let cutoff = self.cutoff;
        let active = size - cutoff;

        // swap the cache buffers: this generation's lookups are served from
        // the previous generation's merged results
        self.evaluator.prepare();

        let jobs: Vec<PointsData<'_>> = (0..active)
            .map(|i| PointsData {
                points: &self.population[i],
                mutations: &self.mutations[i],
            })
            .collect();

        let fitnesses = &mut self.fitnesses;
        let beneficial = &mut self.beneficial;
        let mutations = &self.mutations;

        self.evaluator.evaluate(&jobs, &mut |member, fitness| {
            fitnesses[member] = fitness;

            // a member that outscored its base carried beneficial mutations
            let base = member % cutoff;
            if fitness > fitnesses[base] {
                Self::record_beneficial(beneficial, mutations, fitnesses, member, base);
            }
        });
    }

    /// folds the mutations of `member` into its base's beneficial list,
    /// keeping at most one mutation per point index: the one whose carrier
    /// scored highest.
    fn record_beneficial(
        beneficial: &mut [Vec<Beneficial>],
        mutations: &[Vec<Mutation>],
        fitnesses: &[f64],
        member: usize,
        base: usize,
    ) {
        for &m in &mutations[member] {
            match beneficial[base]
                .iter()
                .position(|b| b.mutation.index == m.index)
            {
                None => beneficial[base].push(Beneficial {
                    mutation: m,
                    carrier: member,
                }),
                Some(found) => {
                    let other = beneficial[base][found].carrier;
                    if fitnesses[member] > fitnesses[other] {
                        beneficial[base][found] = Beneficial {
                            mutation: m,
                            carrier: member,
                        };
                    }
                }
            }
        }
    }

    /// builds the reserved members: each is its base plus every beneficial
    /// mutation collected for that base. a base with nothing beneficial
    /// leaves its slot at fitness 0, to sink in the sort and be discarded.
    fn combine_mutations(&mut self) {
        profiling::scope!("combine_mutations");
        let size = self.population.len();
        let cutoff = self.cutoff;

        for i in (size - cutoff)..size {
            let base = i % cutoff;

            if self.beneficial[base].is_empty() {
                self.fitnesses[i] = 0.0;
                continue;
            }

            let (head, tail) = self.population.split_at_mut(i);
            let member = &mut tail[0];
            member.set(&head[base]);
            for b in &self.beneficial[base] {
                member[b.mutation.index] = b.mutation.new;
            }

            self.evaluator.set_base(i, base);

            let muts: Vec<Mutation> = self.beneficial[base].iter().map(|b| b.mutation).collect();
            self.fitnesses[i] = self.evaluator.evaluate_one(
                i,
                PointsData {
                    points: &self.population[i],
                    mutations: &muts,
                },
            );
        }
    }

    /// sorts members by descending fitness. population, fitnesses and the
    /// evaluator's per-member state are permuted together, swap by swap.
    fn update_fitnesses(&mut self) {
        profiling::scope!("update_fitnesses");
        let size = self.population.len();

        let mut order: Vec<usize> = (0..size).collect();
        order.sort_by(|&a, &b| {
            self.fitnesses[b]
                .partial_cmp(&self.fitnesses[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        // apply the permutation with explicit swaps so evaluator state
        // follows its member
        let mut at: Vec<usize> = (0..size).collect(); // slot -> original member
        let mut pos: Vec<usize> = (0..size).collect(); // original member -> slot
        for slot in 0..size {
            let want = order[slot];
            let from = pos[want];
            if from != slot {
                self.population.swap(slot, from);
                self.fitnesses.swap(slot, from);
                self.evaluator.swap(slot, from);

                let displaced = at[slot];
                at[slot] = want;
                at[from] = displaced;
                pos[want] = slot;
                pos[displaced] = from;
            }
        }

        self.best.set(&self.population[0]);
        self.stats.best_fitness = self.fitnesses[0];
    }
}

impl<E: Evaluator, M: Mutator> Algorithm for ModifiedGenetic<E, M> {
    fn step(&mut self) {
        profiling::scope!("step");
        let start = Instant::now();

        self.new_generation();
        self.calculate_fitnesses();
        self.combine_mutations();
        self.update_fitnesses();

        self.stats.generation += 1;
        self.stats.time_for_gen = start.elapsed();
    }

    fn best(&self) -> &NormPointGroup {
        &self.best
    }

    fn stats(&self) -> Stats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::{ManyEvaluator, ParallelEvaluator};
    use crate::fitness::{FitnessFunction, TriangleImageFitness};
    use crate::generate::{Generator, RandomGenerator};
    use crate::geom::NormPoint;
    use crate::image::{Rgb, RgbBuffer};
    use crate::mutate::GaussianMutation;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    const SIZE: usize = 12;
    const CUTOFF: usize = 2;
    const POINTS: usize = 12;
    const BLOCK_SIZE: usize = 3;

    fn pattern_image(w: usize, h: usize) -> RgbBuffer {
        RgbBuffer::from_fn(w, h, |x, y| Rgb {
            r: ((x * 31 + y * 17) % 256) as f64 / 255.0,
            g: ((x * 7 + y * 47) % 256) as f64 / 255.0,
            b: ((x * 13 + y * 3) % 256) as f64 / 255.0,
        })
    }

    fn image_algorithm(
        image: &RgbBuffer,
    ) -> ModifiedGenetic<ParallelEvaluator, GaussianMutation> {
        let mut gen = RandomGenerator::new(Pcg32::seed_from_u64(42));
        ModifiedGenetic::new(
            || gen.generate(POINTS),
            SIZE,
            CUTOFF,
            |n| {
                ParallelEvaluator::new(TriangleImageFitness::functions(image, BLOCK_SIZE, n), 14)
                    .unwrap()
            },
            GaussianMutation::default_for(POINTS, Pcg32::seed_from_u64(43)),
        )
    }

    #[test]
    fn test_population_invariants_after_steps() {
        let image = pattern_image(40, 30);
        let mut algo = image_algorithm(&image);

        for _ in 0..4 {
            algo.step();

            assert_eq!(algo.population.len(), SIZE);
            for member in &algo.population {
                assert_eq!(member.len(), POINTS);
                for p in member.iter() {
                    assert!(p.x >= 0.0 && p.x <= 1.0);
                    assert!(p.y >= 0.0 && p.y <= 1.0);
                }
            }

            // fitnesses sorted descending, best coherent with slot 0
            for pair in algo.fitnesses.windows(2) {
                assert!(pair[0] >= pair[1]);
            }
            assert_eq!(algo.stats.best_fitness, algo.fitnesses[0]);
            assert_eq!(algo.best, algo.population[0]);
        }

        assert_eq!(algo.stats().generation, 4);
    }

    #[test]
    fn test_best_fitness_never_decreases() {
        let image = pattern_image(36, 36);
        let mut algo = image_algorithm(&image);

        let mut previous = algo.stats().best_fitness;
        for _ in 0..6 {
            algo.step();
            let current = algo.stats().best_fitness;
            assert!(
                current >= previous,
                "best fitness regressed: {current} < {previous}"
            );
            previous = current;
        }
    }

    #[test]
    fn test_recombined_members_differ_from_base_or_sink() {
        let image = pattern_image(40, 30);
        let mut algo = image_algorithm(&image);

        // run the phases by hand so the recombination slots can be examined
        // before the sort scatters them
        algo.new_generation();
        algo.calculate_fitnesses();
        algo.combine_mutations();

        for i in (SIZE - CUTOFF)..SIZE {
            let base = i % CUTOFF;
            if algo.fitnesses[i] != 0.0 {
                assert_ne!(
                    algo.population[i], algo.population[base],
                    "recombined member {i} identical to its base"
                );
            }
        }

        algo.update_fitnesses();
    }

    #[test]
    fn test_record_beneficial_keeps_fitter_carrier() {
        let m = |index, x: f64| Mutation {
            index,
            old: NormPoint::new(0.0, 0.0),
            new: NormPoint::new(x, x),
        };

        let mut beneficial = vec![Vec::new()];
        let mutations = vec![
            vec![],            // base
            vec![m(3, 0.4)],   // member 1
            vec![m(3, 0.9)],   // member 2, same point index, fitter carrier
            vec![m(5, 0.2)],   // member 3, different point
        ];
        let fitnesses = vec![0.1, 0.5, 0.7, 0.6];

        type Algo = ModifiedGenetic<ManyEvaluator<Toy>, GaussianMutation>;
        Algo::record_beneficial(&mut beneficial, &mutations, &fitnesses, 1, 0);
        Algo::record_beneficial(&mut beneficial, &mutations, &fitnesses, 2, 0);
        Algo::record_beneficial(&mut beneficial, &mutations, &fitnesses, 3, 0);

        assert_eq!(beneficial[0].len(), 2);
        let for_point_3 = beneficial[0]
            .iter()
            .find(|b| b.mutation.index == 3)
            .unwrap();
        assert_eq!(for_point_3.carrier, 2);
        assert_eq!(for_point_3.mutation.new, NormPoint::new(0.9, 0.9));
    }

    /// toy fitness: rewards the first point for approaching the centre.
    struct Toy;

    impl FitnessFunction for Toy {
        fn calculate(&mut self, data: PointsData<'_>) -> f64 {
            1.0 - data.points[0].dist(NormPoint::new(0.5, 0.5))
        }
    }

    #[test]
    fn test_algorithm_improves_toy_fitness() {
        let mut gen = RandomGenerator::new(Pcg32::seed_from_u64(5));
        let mut algo = ModifiedGenetic::new(
            || gen.generate(4),
            9,
            2,
            |n| ManyEvaluator::new((0..n).map(|_| Toy).collect::<Vec<_>>()),
            GaussianMutation::new(0.9, 0.4, Pcg32::seed_from_u64(6)),
        );

        let start = algo.stats().best_fitness;
        for _ in 0..30 {
            algo.step();
        }
        let end = algo.stats().best_fitness;

        assert!(end > start, "no improvement: {end} <= {start}");
        // the best member's first point should have moved toward the centre
        assert!(algo.best()[0].dist(NormPoint::new(0.5, 0.5)) < 0.25);
    }
}
