// the per-member triangle fitness function
//
// scoring a point group means: triangulate it, paint every triangle with
// the mean colour of the pixels it covers, and measure the pooled RGB
// variance against the target. the triangulation is owned per member and
// updated incrementally from the member's mutation list; per-triangle
// variances are memoised across generations through the caches in
// `evaluate`.

use std::sync::Arc;

use crate::delaunay::Triangulation;
use crate::geom;
use crate::raster;

use super::cache::TriFit;
use super::pixels::{BlockTable, PixelTable};
use super::{FitnessFunction, PointsData, MAX_PIXEL_DIFFERENCE};

/// fitness of a point group measured as triangle-mesh colour variance
/// against a target image. one instance per population member; instances
/// built by [`TriangleImageFitness::functions`] share the pixel tables.
pub struct TriangleImageFitness {
    target: Arc<PixelTable>,
    target_blocks: Arc<BlockTable>,
    block_size: i32,
    max_difference: f64,

    pub(crate) tri: Option<Triangulation>,

    /// entries produced by the most recent scoring pass, one per real
    /// triangle. the parallel evaluator merges these into its shared cache;
    /// standalone use recycles them as the next call's lookup table.
    pub(crate) results: Vec<TriFit>,
    lookup: Vec<TriFit>,

    warned_degenerate: bool,
}

impl TriangleImageFitness {
    /// builds a single function for a target image.
    pub fn from_image<I: crate::image::ImageData + ?Sized>(image: &I, block_size: usize) -> Self {
        let target = Arc::new(PixelTable::from_image(image));
        let blocks = Arc::new(BlockTable::from_image(image, block_size));
        Self::with_tables(target, blocks, block_size)
    }

    /// builds n functions sharing one set of pixel tables, one per
    /// population member.
    pub fn functions<I: crate::image::ImageData + ?Sized>(
        image: &I,
        block_size: usize,
        n: usize,
    ) -> Vec<Self> {
        let target = Arc::new(PixelTable::from_image(image));
        let blocks = Arc::new(BlockTable::from_image(image, block_size));

        (0..n)
            .map(|_| Self::with_tables(Arc::clone(&target), Arc::clone(&blocks), block_size))
            .collect()
    }

    fn with_tables(target: Arc<PixelTable>, blocks: Arc<BlockTable>, block_size: usize) -> Self {
        let (w, h) = target.size();
        TriangleImageFitness {
            target,
            target_blocks: blocks,
            block_size: block_size as i32,
            max_difference: MAX_PIXEL_DIFFERENCE * (w * h) as f64,
            tri: None,
            results: Vec::new(),
            lookup: vec![TriFit::default(); 2],
            warned_degenerate: false,
        }
    }

    /// brings the member's triangulation up to date with `data`.
    ///
    /// without a triangulation everything is rebuilt from scratch. with a
    /// base, the base's mesh is restored and the mutation list replayed:
    /// all removals run before any insertion because a moved point may be
    /// reinserted by another entry of the same list. with neither, the
    /// triangulation is already current (an unmutated base member) and the
    /// mutation list is ignored.
    pub(crate) fn retriangulate(&mut self, data: PointsData<'_>, base: Option<&Triangulation>) {
        profiling::scope!("retriangulate");
        let (w, h) = self.target.size();

        match (&mut self.tri, base) {
            (None, _) => {
                let mut tri = Triangulation::new(w as i32, h as i32);
                for p in data.points.iter() {
                    tri.insert(p.to_pixel(w, h));
                }
                self.tri = Some(tri);
            }
            (Some(tri), Some(base)) => {
                tri.set(base);
                for m in data.mutations {
                    tri.remove(m.old.to_pixel(w, h));
                }
                for m in data.mutations {
                    tri.insert(m.new.to_pixel(w, h));
                }
            }
            (Some(_), None) => {}
        }
    }

    /// full evaluation for one member. `external_tri` is set when this
    /// member's triangulation is parked read-only in the evaluator's arena
    /// (it is a base other members restore from); `base` is the parked
    /// triangulation of this member's own base, if any.
    pub(crate) fn run(
        &mut self,
        data: PointsData<'_>,
        external_tri: Option<&Triangulation>,
        base: Option<&Triangulation>,
        lookup: &[TriFit],
    ) -> f64 {
        if let Some(tri) = external_tri {
            debug_assert!(base.is_none() && data.mutations.is_empty());
            return self.score(tri, lookup);
        }

        self.retriangulate(data, base);
        let tri = self
            .tri
            .take()
            .expect("retriangulate always leaves a triangulation");
        let fitness = self.score(&tri, lookup);
        self.tri = Some(tri);
        fitness
    }

    /// scores the triangulation against the target, probing `lookup` for
    /// memoised triangle variances and recording every triangle seen into
    /// `results`.
    fn score(&mut self, tri: &Triangulation, lookup: &[TriFit]) -> f64 {
        profiling::scope!("score");
        let (w, h) = self.target.size();

        self.results.clear();

        let cache_mask = (lookup.len() as u64).wrapping_sub(1);

        let mut difference = 0.0f64;
        let mut area = 0.0f64;
        let mut real_triangles = 0usize;

        let target = &self.target;
        let blocks = &self.target_blocks;
        let results = &mut self.results;
        let block_size = self.block_size;

        tri.iter_triangles(|t| {
            real_triangles += 1;
            let (a, b, c) = (t.a, t.b, t.c);

            // covered area feeds the blank-coverage penalty below
            area += (0.5
                * ((b.x as i32 - a.x as i32) as f64 * (c.y as i32 - a.y as i32) as f64
                    - (c.x as i32 - a.x as i32) as f64 * (b.y as i32 - a.y as i32) as f64))
                .abs();

            let mut entry = TriFit::from_vertices(a, b, c);
            let slot = if lookup.is_empty() {
                0
            } else {
                (entry.hash() & cache_mask) as usize
            };

            if let Some(cached) = lookup.get(slot).filter(|d| d.same_triangle(&entry)) {
                difference += cached.fitness;
                results.push(*cached);
                return;
            }

            // miss: pool channel sums over the covered pixels
            let mut n: i64 = 0;
            let mut sr: i64 = 0;
            let mut sg: i64 = 0;
            let mut sb: i64 = 0;
            let mut ssq: i64 = 0;

            let pixel_tri = geom::Triangle::new(
                a.x as i32, a.y as i32, b.x as i32, b.y as i32, c.x as i32, c.y as i32,
            );

            raster::triangle_blocks(pixel_tri, block_size, |span| match span {
                raster::Span::Line { x0, x1, y } => {
                    let row = target.row(y as usize);
                    if x0 >= 0 && x1 as usize <= row.len() {
                        for x in x0..x1 {
                            let px = row[x as usize];
                            sr += px.r as i64;
                            sg += px.g as i64;
                            sb += px.b as i64;
                            ssq += px.sq as i64;
                        }
                    }
                    n += (x1 - x0) as i64;
                }
                raster::Span::Block { x, y } => {
                    let block = blocks.at(x as usize, y as usize);
                    sr += block.r as i64;
                    sg += block.g as i64;
                    sb += block.b as i64;
                    ssq += block.sq as i64;
                    n += (block_size * block_size) as i64;
                }
            });

            // pooled variance with the mean factored out
            let diff = if n != 0 {
                ssq as f64 - (sr * sr + sg * sg + sb * sb) as f64 / n as f64
            } else {
                0.0
            };

            difference += diff;
            entry.fitness = diff;
            entry.slot = slot as u32;
            results.push(entry);
        });

        if real_triangles == 0 && !self.warned_degenerate {
            self.warned_degenerate = true;
            log::warn!(
                "point group is degenerate (fewer than 3 distinct points or all collinear); fitness is 0"
            );
        }

        // the mesh rarely covers the whole image when points are few; charge
        // every uncovered pixel at the maximum per-pixel variance
        let blank = (w * h) as f64 - area;
        difference += MAX_PIXEL_DIFFERENCE * blank;

        1.0 - difference / self.max_difference
    }
}

impl FitnessFunction for TriangleImageFitness {
    fn calculate(&mut self, data: PointsData<'_>) -> f64 {
        profiling::scope!("calculate");
        let lookup = std::mem::take(&mut self.lookup);
        let fitness = self.run(data, None, None, &lookup);

        // the entries just produced serve as the next call's lookup table;
        // the old table becomes scratch
        self.lookup = std::mem::replace(&mut self.results, lookup);

        fitness
    }
}
