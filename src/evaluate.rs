// population evaluators
//
// the optimiser scores a whole generation at once. `ParallelEvaluator`
// fans the members out over the rayon pool and maintains the shared
// triangle-variance cache: two fixed-capacity buffers that swap roles each
// generation, so this generation's lookups are served from the previous
// generation's merged results. workers only ever read the lookup buffer;
// the merge buffer is written exclusively by the draining thread, which is
// what makes the cache safe without a single lock.

use std::sync::mpsc;

use crate::delaunay::Triangulation;
use crate::error::Error;
use crate::fitness::{FitnessFunction, PointsData, TriFit, TriangleImageFitness};

/// scores population members for an optimisation algorithm. members are
/// identified by their index in the population; jobs passed to `evaluate`
/// are index-aligned with it.
pub trait Evaluator {
    /// swaps the cache buffers at a generation boundary. called once per
    /// generation, before any member of that generation is scored.
    fn prepare(&mut self);

    /// links a member to the base it was derived from this generation.
    fn set_base(&mut self, member: usize, base: usize);

    /// keeps per-member state aligned when the optimiser reorders members.
    fn swap(&mut self, i: usize, j: usize);

    /// scores `jobs[i]` for every i, in parallel. `on_result` runs on the
    /// calling thread in completion order, after member i's cache entries
    /// have been merged.
    fn evaluate(&mut self, jobs: &[PointsData<'_>], on_result: &mut dyn FnMut(usize, f64));

    /// scores a single member on the calling thread and merges its cache
    /// entries immediately.
    fn evaluate_one(&mut self, member: usize, data: PointsData<'_>) -> f64;
}

/// the production evaluator: one [`TriangleImageFitness`] per member plus
/// the shared two-buffer triangle cache.
pub struct ParallelEvaluator {
    members: Vec<TriangleImageFitness>,
    links: Vec<Option<usize>>,

    /// merge target: written by the draining thread as results come in.
    cache: Vec<TriFit>,
    /// lookup table: the previous generation's merged entries.
    next_cache: Vec<TriFit>,
}

impl ParallelEvaluator {
    /// `cache_bits` sizes both shared cache buffers at 2^cache_bits entries.
    pub fn new(functions: Vec<TriangleImageFitness>, cache_bits: u32) -> Result<Self, Error> {
        if cache_bits == 0 || cache_bits > 31 {
            return Err(Error::CacheDisabled { bits: cache_bits });
        }
        let capacity = 1usize << cache_bits;

        let links = vec![None; functions.len()];
        Ok(ParallelEvaluator {
            members: functions,
            links,
            cache: vec![TriFit::default(); capacity],
            next_cache: vec![TriFit::default(); capacity],
        })
    }
}

impl Evaluator for ParallelEvaluator {
    fn prepare(&mut self) {
        std::mem::swap(&mut self.cache, &mut self.next_cache);
    }

    fn set_base(&mut self, member: usize, base: usize) {
        self.links[member] = Some(base);
    }

    fn swap(&mut self, i: usize, j: usize) {
        self.members.swap(i, j);
        self.links.swap(i, j);
    }

    fn evaluate(&mut self, jobs: &[PointsData<'_>], on_result: &mut dyn FnMut(usize, f64)) {
        profiling::scope!("evaluate_generation");
        assert!(jobs.len() <= self.members.len());

        // park every triangulation that serves as a base this generation in
        // an arena: children restore from them concurrently, so for the
        // duration of the batch they are shared and immutable by construction
        let mut is_base = vec![false; self.members.len()];
        for member in 0..jobs.len() {
            if let Some(base) = self.links[member] {
                is_base[base] = true;
            }
        }

        // a base that has never been scored has no mesh yet; build it here,
        // sequentially, so its children have something to restore from
        for (base, job) in jobs.iter().enumerate() {
            if is_base[base] && self.members[base].tri.is_none() {
                self.members[base].retriangulate(*job, None);
            }
        }

        let mut parked: Vec<Option<Triangulation>> = self
            .members
            .iter_mut()
            .enumerate()
            .map(|(i, m)| if is_base[i] { m.tri.take() } else { None })
            .collect();

        // base links are consumed by this generation's scoring
        let links: Vec<Option<usize>> = (0..jobs.len()).map(|i| self.links[i].take()).collect();

        let lookup: &[TriFit] = &self.next_cache;
        let merge = &mut self.cache;
        let arena: &[Option<Triangulation>] = &parked;
        let (active, _) = self.members.split_at_mut(jobs.len());

        let (tx, rx) = mpsc::sync_channel::<(usize, f64, Vec<TriFit>)>(jobs.len());
        let mut returned: Vec<(usize, Vec<TriFit>)> = Vec::with_capacity(jobs.len());

        // in_place_scope keeps the drain below on the calling thread while
        // the spawns run on the pool
        rayon::in_place_scope(|s| {
            // dispatch in member-index order; completion order is whatever
            // the pool produces
            for (member, (scorer, job)) in active.iter_mut().zip(jobs).enumerate() {
                let tx = tx.clone();
                let link = links[member];
                s.spawn(move |_| {
                    profiling::scope!("fitness_task");
                    let own = arena[member].as_ref();
                    let base = link.and_then(|b| arena[b].as_ref());
                    if link.is_some() && base.is_none() {
                        // the linked base never got a mesh; fall back to a
                        // full rebuild rather than replaying onto stale state
                        scorer.tri = None;
                    }

                    let fitness = scorer.run(*job, own, base, lookup);
                    let entries = std::mem::take(&mut scorer.results);
                    let _ = tx.send((member, fitness, entries));
                });
            }
            drop(tx);

            // drain on the calling thread: merge each member's entries into
            // the write buffer (last writer wins per slot), then surface the
            // fitness. workers never touch this buffer.
            while let Ok((member, fitness, entries)) = rx.recv() {
                for entry in &entries {
                    merge[entry.slot as usize] = *entry;
                }
                returned.push((member, entries));
                on_result(member, fitness);
            }
        });

        // a worker panic propagates out of the scope above, so reaching this
        // point means every job completed and was merged
        debug_assert_eq!(returned.len(), jobs.len());

        // hand scratch buffers and parked triangulations back
        for (member, entries) in returned {
            self.members[member].results = entries;
        }
        for (member, tri) in parked.iter_mut().enumerate() {
            if let Some(tri) = tri.take() {
                self.members[member].tri = Some(tri);
            }
        }
    }

    fn evaluate_one(&mut self, member: usize, data: PointsData<'_>) -> f64 {
        profiling::scope!("evaluate_member");
        let link = self.links[member].take();

        let fitness = match link {
            Some(base) if base < member => {
                let (lo, hi) = self.members.split_at_mut(member);
                let scorer = &mut hi[0];
                let base_tri = lo[base].tri.as_ref();
                if base_tri.is_none() {
                    scorer.tri = None;
                }
                scorer.run(data, None, base_tri, &self.next_cache)
            }
            _ => self.members[member].run(data, None, None, &self.next_cache),
        };

        for entry in &self.members[member].results {
            self.cache[entry.slot as usize] = *entry;
        }

        fitness
    }
}

/// an evaluator holding one independent fitness function per member, with
/// no shared cache and no base linkage. fits plain fitness functions that
/// keep no cross-member state.
pub struct ManyEvaluator<F> {
    functions: Vec<F>,
}

impl<F: FitnessFunction + Send> ManyEvaluator<F> {
    pub fn new(functions: Vec<F>) -> Self {
        ManyEvaluator { functions }
    }
}

impl<F: FitnessFunction + Send> Evaluator for ManyEvaluator<F> {
    fn prepare(&mut self) {}

    fn set_base(&mut self, _member: usize, _base: usize) {}

    fn swap(&mut self, i: usize, j: usize) {
        self.functions.swap(i, j);
    }

    fn evaluate(&mut self, jobs: &[PointsData<'_>], on_result: &mut dyn FnMut(usize, f64)) {
        let (tx, rx) = mpsc::sync_channel::<(usize, f64)>(jobs.len());

        rayon::in_place_scope(|s| {
            for (member, (function, job)) in self.functions.iter_mut().zip(jobs).enumerate() {
                let tx = tx.clone();
                s.spawn(move |_| {
                    let _ = tx.send((member, function.calculate(*job)));
                });
            }
            drop(tx);

            while let Ok((member, fitness)) = rx.recv() {
                on_result(member, fitness);
            }
        });
    }

    fn evaluate_one(&mut self, member: usize, data: PointsData<'_>) -> f64 {
        self.functions[member].calculate(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{NormPoint, NormPointGroup};
    use crate::image::{Rgb, RgbBuffer};
    use crate::mutate::Mutation;
    use approx::assert_relative_eq;

    const BLOCK_SIZE: usize = 3;

    fn pattern_image(w: usize, h: usize) -> RgbBuffer {
        RgbBuffer::from_fn(w, h, |x, y| Rgb {
            r: ((x * 31 + y * 17) % 256) as f64 / 255.0,
            g: ((x * 7 + y * 47) % 256) as f64 / 255.0,
            b: ((x * 13 + y * 3) % 256) as f64 / 255.0,
        })
    }

    fn group(coords: &[(f64, f64)]) -> NormPointGroup {
        NormPointGroup(coords.iter().map(|&(x, y)| NormPoint::new(x, y)).collect())
    }

    #[test]
    fn test_cache_capacity_must_be_power_of_two() {
        assert_eq!(
            ParallelEvaluator::new(Vec::new(), 0).err(),
            Some(Error::CacheDisabled { bits: 0 })
        );
        assert_eq!(
            ParallelEvaluator::new(Vec::new(), 40).err(),
            Some(Error::CacheDisabled { bits: 40 })
        );
        assert!(ParallelEvaluator::new(Vec::new(), 10).is_ok());
    }

    #[test]
    fn test_parallel_matches_standalone() {
        let image = pattern_image(60, 45);

        let groups = [
            group(&[(0.1, 0.1), (0.9, 0.2), (0.5, 0.8), (0.3, 0.4)]),
            group(&[(0.2, 0.7), (0.8, 0.9), (0.4, 0.1), (0.6, 0.5)]),
            group(&[(0.15, 0.35), (0.75, 0.25), (0.55, 0.65), (0.25, 0.85)]),
        ];

        let functions = TriangleImageFitness::functions(&image, BLOCK_SIZE, groups.len());
        let mut evaluator = ParallelEvaluator::new(functions, 12).unwrap();
        evaluator.prepare();

        let jobs: Vec<PointsData<'_>> = groups
            .iter()
            .map(|g| PointsData {
                points: g,
                mutations: &[],
            })
            .collect();

        let mut fitnesses = vec![0.0; groups.len()];
        evaluator.evaluate(&jobs, &mut |member, fitness| {
            fitnesses[member] = fitness;
        });

        for (g, &fitness) in groups.iter().zip(&fitnesses) {
            let mut standalone = TriangleImageFitness::from_image(&image, BLOCK_SIZE);
            let expect = standalone.calculate(PointsData {
                points: g,
                mutations: &[],
            });
            assert_eq!(fitness.to_bits(), expect.to_bits());
        }
    }

    #[test]
    fn test_cache_hits_are_bit_stable_across_generations() {
        let image = pattern_image(70, 50);

        let groups = [
            group(&[(0.1, 0.1), (0.9, 0.2), (0.5, 0.8), (0.3, 0.4), (0.7, 0.6)]),
            group(&[(0.2, 0.7), (0.8, 0.9), (0.4, 0.1), (0.6, 0.5), (0.35, 0.3)]),
        ];

        let functions = TriangleImageFitness::functions(&image, BLOCK_SIZE, groups.len());
        let mut evaluator = ParallelEvaluator::new(functions, 12).unwrap();

        let jobs: Vec<PointsData<'_>> = groups
            .iter()
            .map(|g| PointsData {
                points: g,
                mutations: &[],
            })
            .collect();

        let mut first = vec![0.0f64; groups.len()];
        evaluator.prepare();
        evaluator.evaluate(&jobs, &mut |member, fitness| {
            first[member] = fitness;
        });

        // next generation, same meshes: every triangle hits the cache and
        // every contribution must be byte-equal
        for _ in 0..3 {
            let mut again = vec![0.0f64; groups.len()];
            evaluator.prepare();
            evaluator.evaluate(&jobs, &mut |member, fitness| {
                again[member] = fitness;
            });
            for (a, b) in first.iter().zip(&again) {
                assert_eq!(a.to_bits(), b.to_bits());
            }
        }
    }

    #[test]
    fn test_base_linked_incremental_evaluation() {
        let image = pattern_image(64, 48);

        let base_points = group(&[
            (0.1, 0.1),
            (0.9, 0.15),
            (0.5, 0.5),
            (0.2, 0.85),
            (0.8, 0.8),
        ]);
        let mut child_points = base_points.clone();
        let moved = NormPoint::new(0.55, 0.45);
        let mutation = Mutation {
            index: 2,
            old: child_points[2],
            new: moved,
        };
        child_points[2] = moved;

        let functions = TriangleImageFitness::functions(&image, BLOCK_SIZE, 2);
        let mut evaluator = ParallelEvaluator::new(functions, 12).unwrap();

        // generation 1: both members score their own points from scratch
        let gen1 = [
            PointsData {
                points: &base_points,
                mutations: &[],
            },
            PointsData {
                points: &base_points,
                mutations: &[],
            },
        ];
        evaluator.prepare();
        evaluator.evaluate(&gen1, &mut |_, _| {});

        // generation 2: member 1 is a mutated copy of base member 0
        let muts = [mutation];
        let gen2 = [
            PointsData {
                points: &base_points,
                mutations: &[],
            },
            PointsData {
                points: &child_points,
                mutations: &muts,
            },
        ];
        evaluator.set_base(1, 0);
        evaluator.prepare();
        let mut fitnesses = vec![0.0f64; 2];
        evaluator.evaluate(&gen2, &mut |member, fitness| {
            fitnesses[member] = fitness;
        });

        // the incremental result agrees with a from-scratch evaluation of
        // the child's points
        let mut fresh = TriangleImageFitness::from_image(&image, BLOCK_SIZE);
        let expect = fresh.calculate(PointsData {
            points: &child_points,
            mutations: &[],
        });
        assert_relative_eq!(fitnesses[1], expect, epsilon = 1e-12);
    }

    #[test]
    fn test_evaluate_one_merges_into_cache() {
        let image = pattern_image(40, 40);
        let points = group(&[(0.2, 0.2), (0.8, 0.3), (0.5, 0.9), (0.4, 0.5)]);

        let functions = TriangleImageFitness::functions(&image, BLOCK_SIZE, 1);
        let mut evaluator = ParallelEvaluator::new(functions, 10).unwrap();

        evaluator.prepare();
        let first = evaluator.evaluate_one(
            0,
            PointsData {
                points: &points,
                mutations: &[],
            },
        );

        // after the swap the merged entries serve as lookups: bit-identical
        evaluator.prepare();
        let second = evaluator.evaluate_one(
            0,
            PointsData {
                points: &points,
                mutations: &[],
            },
        );
        assert_eq!(first.to_bits(), second.to_bits());
    }

    /// toy fitness for evaluator plumbing tests: scores how close the first
    /// point is to the image centre.
    struct CentreFitness;

    impl FitnessFunction for CentreFitness {
        fn calculate(&mut self, data: PointsData<'_>) -> f64 {
            let p = data.points[0];
            1.0 - p.dist(NormPoint::new(0.5, 0.5))
        }
    }

    #[test]
    fn test_many_evaluator_runs_all_jobs() {
        let functions = (0..4).map(|_| CentreFitness).collect();
        let mut evaluator = ManyEvaluator::new(functions);

        let groups: Vec<NormPointGroup> = (0..4)
            .map(|i| group(&[(0.1 * i as f64, 0.2)]))
            .collect();
        let jobs: Vec<PointsData<'_>> = groups
            .iter()
            .map(|g| PointsData {
                points: g,
                mutations: &[],
            })
            .collect();

        let mut seen = vec![false; 4];
        let mut fitnesses = vec![0.0; 4];
        evaluator.evaluate(&jobs, &mut |member, fitness| {
            seen[member] = true;
            fitnesses[member] = fitness;
        });

        assert!(seen.iter().all(|&s| s));
        for (i, g) in groups.iter().enumerate() {
            assert_eq!(fitnesses[i], 1.0 - g[0].dist(NormPoint::new(0.5, 0.5)));
        }
    }
}
