// fitness module organization
// each submodule handles one stage of turning a point group into a score

pub mod cache;
pub mod pixels;
pub mod triangles;

pub use cache::TriFit;
pub use pixels::{BlockTable, PixelTable};
pub use triangles::TriangleImageFitness;

use crate::geom::NormPointGroup;
use crate::mutate::Mutation;

/// the largest possible difference a single pixel can contribute: variance
/// is computed on squared 0-255 channels, summed over R, G and B.
pub const MAX_PIXEL_DIFFERENCE: f64 = (255 * 255 * 3) as f64;

/// a candidate point group plus the mutations that produced it from its
/// base. the mutation list is what makes incremental retriangulation
/// possible; an empty list with no base means "score the points as they are".
#[derive(Clone, Copy)]
pub struct PointsData<'a> {
    pub points: &'a NormPointGroup,
    pub mutations: &'a [Mutation],
}

/// scores a point group. higher is better; 1.0 means the triangle mesh
/// reconstructs the target image exactly.
pub trait FitnessFunction {
    fn calculate(&mut self, data: PointsData<'_>) -> f64;
}
