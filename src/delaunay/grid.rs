// spatial index over triangle circumcircles
//
// the domain is divided into a fixed lattice of cells; every triangle is
// registered in each cell its circumcircle's bounding box touches. a point
// query then only scans the one cell containing the point, which keeps
// cavity searches O(1) expected instead of O(triangles).

use super::geom::{Point, Triangle};
use super::predicates::in_circle;

#[derive(Debug)]
pub struct CircumcircleGrid {
    cells: Vec<Vec<u32>>, // triangle slots, indexed [col * rows + row]
    cols: usize,
    rows: usize,
    col_pixels: f64,
    row_pixels: f64,
}

impl CircumcircleGrid {
    pub fn new(cols: usize, rows: usize, w: i32, h: i32) -> Self {
        CircumcircleGrid {
            cells: vec![Vec::new(); cols * rows],
            cols,
            rows,
            col_pixels: w as f64 / cols as f64,
            row_pixels: h as f64 / rows as f64,
        }
    }

    /// the range of cells the circumcircle's bounding box intersects,
    /// clamped to the lattice. the radius is padded slightly so boundary
    /// contacts are never missed to f32 rounding.
    fn cell_range(&self, t: &Triangle) -> (usize, usize, usize, usize) {
        let radius = t.circumcircle.radius + 0.001;
        let x0 = ((t.circumcircle.x - radius) as f64 / self.col_pixels) as i64;
        let y0 = ((t.circumcircle.y - radius) as f64 / self.row_pixels) as i64;
        let x1 = ((t.circumcircle.x + radius) as f64 / self.col_pixels).ceil() as i64;
        let y1 = ((t.circumcircle.y + radius) as f64 / self.row_pixels).ceil() as i64;

        (
            x0.max(0) as usize,
            y0.max(0) as usize,
            x1.clamp(0, self.cols as i64) as usize,
            y1.clamp(0, self.rows as i64) as usize,
        )
    }

    /// the single cell containing a point.
    fn cell_of(&self, p: Point) -> usize {
        let x = ((p.x as f64 / self.col_pixels).floor() as usize).min(self.cols - 1);
        let y = ((p.y as f64 / self.row_pixels).floor() as usize).min(self.rows - 1);
        x * self.rows + y
    }

    /// registers a triangle slot in every cell its circumcircle bbox touches.
    pub fn add(&mut self, t: &Triangle, slot: u32) {
        let (x0, y0, x1, y1) = self.cell_range(t);
        for x in x0..x1 {
            for y in y0..y1 {
                self.cells[x * self.rows + y].push(slot);
            }
        }
    }

    /// deregisters a triangle slot by swap-remove from each covered cell.
    pub fn remove(&mut self, t: &Triangle, slot: u32) {
        let (x0, y0, x1, y1) = self.cell_range(t);
        for x in x0..x1 {
            for y in y0..y1 {
                let cell = &mut self.cells[x * self.rows + y];
                if let Some(i) = cell.iter().position(|&s| s == slot) {
                    cell.swap_remove(i);
                }
            }
        }
    }

    /// whether any registered triangle has p as a vertex.
    pub fn has_point(&self, p: Point, triangles: &[Triangle]) -> bool {
        let cell = self.cell_of(p);
        self.cells[cell].iter().any(|&slot| {
            let t = &triangles[slot as usize];
            debug_assert!(t.a.x != super::FREE_SLOT);
            t.has_vertex(p)
        })
    }

    /// pops every triangle whose circumcircle contains p (boundary included)
    /// out of the grid, appending the freed slots to `out`.
    pub fn pop_circumcircles_containing(
        &mut self,
        p: Point,
        triangles: &[Triangle],
        out: &mut Vec<u32>,
    ) {
        let cell = self.cell_of(p);
        let mut i = 0;
        while i < self.cells[cell].len() {
            let slot = self.cells[cell][i];
            let t = triangles[slot as usize];
            debug_assert!(t.a.x != super::FREE_SLOT);

            let contains = in_circle(
                t.a.x as i64,
                t.a.y as i64,
                t.b.x as i64,
                t.b.y as i64,
                t.c.x as i64,
                t.c.y as i64,
                p.x as i64,
                p.y as i64,
            ) >= 0;

            if contains {
                out.push(slot);
                // removal swap-fills the current index, so don't advance
                self.remove(&t, slot);
            } else {
                i += 1;
            }
        }
    }

    /// pops every triangle that has p as a vertex out of the grid,
    /// appending the freed slots to `out`.
    pub fn pop_with_vertex(&mut self, p: Point, triangles: &[Triangle], out: &mut Vec<u32>) {
        let cell = self.cell_of(p);
        let mut i = 0;
        while i < self.cells[cell].len() {
            let slot = self.cells[cell][i];
            let t = triangles[slot as usize];

            if t.has_vertex(p) {
                out.push(slot);
                self.remove(&t, slot);
            } else {
                i += 1;
            }
        }
    }

    /// structural copy from another grid, reusing cell allocations.
    pub fn set(&mut self, other: &CircumcircleGrid) {
        debug_assert_eq!(self.cells.len(), other.cells.len());
        for (cell, other_cell) in self.cells.iter_mut().zip(&other.cells) {
            cell.clone_from(other_cell);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::geom;
    use super::*;

    #[test]
    fn test_add_query_remove() {
        let mut grid = CircumcircleGrid::new(10, 10, 100, 100);
        let t = Triangle::new(
            Point::new(10, 10),
            Point::new(30, 12),
            Point::new(18, 25),
        );
        let triangles = vec![t];

        grid.add(&t, 0);
        assert!(grid.has_point(Point::new(10, 10), &triangles));
        assert!(!grid.has_point(Point::new(11, 10), &triangles));

        let mut cavity = Vec::new();
        grid.pop_circumcircles_containing(Point::new(19, 15), &triangles, &mut cavity);
        assert_eq!(cavity, vec![0]);

        // popped triangles are no longer registered anywhere
        cavity.clear();
        grid.pop_circumcircles_containing(Point::new(19, 15), &triangles, &mut cavity);
        assert!(cavity.is_empty());
    }

    #[test]
    fn test_super_triangle_is_registered_near_every_domain_point() {
        let mut grid = CircumcircleGrid::new(10, 10, 100, 100);
        let s = geom::super_triangle(100, 100);
        let triangles = vec![s];
        grid.add(&s, 0);

        for &(x, y) in &[(0, 0), (99, 0), (0, 99), (99, 99), (42, 57)] {
            let mut cavity = Vec::new();
            let mut probe = CircumcircleGrid::new(10, 10, 100, 100);
            probe.set(&grid);
            probe.pop_circumcircles_containing(Point::new(x, y), &triangles, &mut cavity);
            assert_eq!(cavity, vec![0], "super-triangle missed at ({x}, {y})");
        }
    }
}
