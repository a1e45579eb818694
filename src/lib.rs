//! tessella approximates a raster image by a mesh of coloured triangles.
//!
//! given a target image and a point count, a modified genetic algorithm
//! searches for the point set whose Delaunay triangulation, with each
//! triangle painted in the mean colour of the pixels it covers, minimises
//! per-pixel RGB variance against the target. the expensive part of every
//! generation is fitness: it is kept fast by incremental retriangulation
//! (members re-derive their mesh from their base in O(mutations)), a
//! cross-generation triangle-variance cache, and a blocked rasteriser fed
//! from precomputed pixel sum tables.
//!
//! the usual wiring:
//!
//! ```no_run
//! use rand::SeedableRng;
//! use rand_pcg::Pcg32;
//! use tessella::{
//!     Algorithm, GaussianMutation, Generator, ModifiedGenetic, ParallelEvaluator,
//!     RandomGenerator, RgbBuffer, TriangleImageFitness,
//! };
//!
//! let image = RgbBuffer::new(256, 256); // decoded pixels from elsewhere
//! let points = 300;
//!
//! let mut generator = RandomGenerator::new(Pcg32::seed_from_u64(0));
//! let mut algo = ModifiedGenetic::new(
//!     || generator.generate(points),
//!     400,
//!     5,
//!     |n| {
//!         ParallelEvaluator::new(TriangleImageFitness::functions(&image, 5, n), 22).unwrap()
//!     },
//!     GaussianMutation::default_for(points, Pcg32::seed_from_u64(1)),
//! );
//!
//! for _ in 0..1000 {
//!     algo.step();
//! }
//! let best = algo.best();
//! ```

pub mod delaunay;
pub mod engine;
pub mod error;
pub mod evaluate;
pub mod fitness;
pub mod generate;
pub mod geom;
pub mod image;
pub mod mutate;
pub mod raster;

pub use engine::{Algorithm, ModifiedGenetic, Stats};
pub use error::Error;
pub use evaluate::{Evaluator, ManyEvaluator, ParallelEvaluator};
pub use fitness::{FitnessFunction, PointsData, TriangleImageFitness};
pub use generate::{Generator, RandomGenerator, SpacedGenerator};
pub use geom::{NormPoint, NormPointGroup};
pub use image::{ImageData, Rgb, RgbBuffer};
pub use mutate::{GaussianMutation, Mutation, Mutator, UniformMutation};
