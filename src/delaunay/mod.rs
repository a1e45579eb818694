// incremental Delaunay triangulation
//
// the mesh supports point insertion (Bowyer-Watson) and removal (Devillers
// ear clipping) plus a structural snapshot/restore, which is what lets the
// fitness pipeline retriangulate a mutated member in O(mutations) instead
// of O(points). triangles live in a dense slab with freed slots recycled
// through a free-list; a spatial grid over circumcircle bounding boxes keeps
// cavity searches near O(1).

mod geom;
mod grid;
mod pointmap;
mod predicates;

pub use geom::{Circumcircle, Point, Triangle};

use crate::error::Error;
use geom::{super_triangle, Edge};
use grid::CircumcircleGrid;
use pointmap::PointMap;
use predicates::{ear_score, orientation};

/// sentinel x coordinate marking a recycled slab slot.
pub(crate) const FREE_SLOT: i16 = -1;

const GRID_COLS: usize = 10;
const GRID_ROWS: usize = 10;
const POINT_MAP_BUCKETS: usize = 100;

/// an ear of the hole polygon during point removal.
#[derive(Clone, Copy, Debug)]
struct Ear {
    a: Point,
    b: Point,
    c: Point,
    score: f64,
}

/// a mutable Delaunay triangulation over integer points in a bounded domain.
#[derive(Debug)]
pub struct Triangulation {
    triangles: Vec<Triangle>,
    free: Vec<u32>,
    grid: CircumcircleGrid,
    points: PointMap,
    super_tri: Triangle,

    // scratch buffers reused across operations
    cavity: Vec<u32>,
    edges: Vec<Edge>,
    hull: Vec<Point>,
    ears: Vec<Ear>,

    num_points: usize,
    #[allow(dead_code)]
    unique_points: usize,
}

impl Triangulation {
    /// an empty triangulation for a w×h domain, holding only the
    /// super-triangle that encloses all future inserts.
    pub fn new(w: i32, h: i32) -> Self {
        let super_tri = super_triangle(w, h);

        let mut tri = Triangulation {
            triangles: Vec::new(),
            free: Vec::new(),
            grid: CircumcircleGrid::new(GRID_COLS, GRID_ROWS, w, h),
            points: PointMap::new(POINT_MAP_BUCKETS),
            super_tri,
            cavity: Vec::new(),
            edges: Vec::new(),
            hull: Vec::new(),
            ears: Vec::new(),
            num_points: 0,
            unique_points: 0,
        };
        tri.add_triangle(super_tri);
        tri
    }

    /// builds a triangulation containing every point of `points`.
    /// fails when the points admit no triangulation: fewer than 3 distinct
    /// points, or all of them collinear.
    pub fn from_points(w: i32, h: i32, points: &[Point]) -> Result<Self, Error> {
        let mut tri = Triangulation::new(w, h);
        for &p in points {
            tri.insert(p);
        }

        let mut real = 0usize;
        tri.iter_triangles(|_| real += 1);
        if real == 0 {
            return Err(Error::DegenerateInput);
        }
        Ok(tri)
    }

    /// adds a point using Bowyer-Watson. repeated copies of a point are
    /// counted but leave the mesh unchanged.
    pub fn insert(&mut self, p: Point) {
        profiling::scope!("delaunay_insert");
        self.num_points += 1;
        if self.points.add(p) > 1 {
            return;
        }
        self.unique_points += 1;

        // carve the cavity: every triangle whose circumcircle contains p
        let mut cavity = std::mem::take(&mut self.cavity);
        cavity.clear();
        self.grid
            .pop_circumcircles_containing(p, &self.triangles, &mut cavity);

        // edges appearing an odd number of times form the cavity boundary
        let mut edges = std::mem::take(&mut self.edges);
        edges.clear();
        for &slot in &cavity {
            let t = self.triangles[slot as usize];
            toggle_edge(&mut edges, Edge::new(t.a, t.b));
            toggle_edge(&mut edges, Edge::new(t.b, t.c));
            toggle_edge(&mut edges, Edge::new(t.c, t.a));
            self.mark_free(slot);
        }

        // connect the boundary to p, skipping collinear slivers
        for e in &edges {
            let g = orientation(
                e.a.x as i64,
                e.a.y as i64,
                e.b.x as i64,
                e.b.y as i64,
                p.x as i64,
                p.y as i64,
            );
            if g != 0 {
                self.add_triangle(Triangle::new(e.a, e.b, p));
            }
        }

        self.cavity = cavity;
        self.edges = edges;
    }

    /// removes one copy of a point. the mesh changes only when the last
    /// copy goes; the hole is retriangulated by Devillers ear clipping.
    pub fn remove(&mut self, p: Point) {
        profiling::scope!("delaunay_remove");
        self.num_points -= 1;
        if self.points.remove(p) != 0 {
            return;
        }
        self.unique_points -= 1;

        // free every triangle incident to p, collecting the hole's vertices
        let mut cavity = std::mem::take(&mut self.cavity);
        cavity.clear();
        self.grid.pop_with_vertex(p, &self.triangles, &mut cavity);

        let mut hull = std::mem::take(&mut self.hull);
        hull.clear();
        for &slot in &cavity {
            let t = self.triangles[slot as usize];
            for v in [t.a, t.b, t.c] {
                if v != p && !hull.contains(&v) {
                    hull.push(v);
                }
            }
            self.mark_free(slot);
        }

        // order the hole counter-clockwise around p: by half-plane first,
        // then by cross-product sign, no trigonometry
        hull.sort_by(|&u, &v| cmp_around(p, u, v));

        // one ear per consecutive triple, then clip from the lowest score up
        let mut ears = std::mem::take(&mut self.ears);
        ears.clear();
        let n = hull.len();
        for i in 0..n {
            let a = hull[i];
            let b = hull[(i + 1) % n];
            let c = hull[(i + 2) % n];
            ears.push(Ear {
                a,
                b,
                c,
                score: ear_score(a, b, c, p),
            });
        }

        while ears.len() > 3 {
            let mut index = 0;
            let mut lowest = f64::MAX;
            for (i, e) in ears.iter().enumerate() {
                if e.score < lowest {
                    lowest = e.score;
                    index = i;
                }
            }

            let ear = ears[index];
            self.add_triangle(Triangle::new(ear.a, ear.b, ear.c));

            // stitch the neighbouring ears across the clipped one and
            // refresh their scores
            let len = ears.len();
            let before = (index + len - 1) % len;
            let after = (index + 1) % len;

            ears[before].c = ears[index].c;
            ears[before].score = ear_score(ears[before].a, ears[before].b, ears[before].c, p);
            ears[after].a = ears[index].a;
            ears[after].score = ear_score(ears[after].a, ears[after].b, ears[after].c, p);

            ears.remove(index);
        }

        // the three remaining ears describe the same final triangle
        let last = ears[0];
        self.add_triangle(Triangle::new(last.a, last.b, last.c));

        self.cavity = cavity;
        self.hull = hull;
        self.ears = ears;
    }

    /// makes this triangulation structurally identical to another,
    /// reusing existing allocations where possible.
    pub fn set(&mut self, other: &Triangulation) {
        profiling::scope!("delaunay_set");
        self.triangles.clone_from(&other.triangles);
        self.free.clone_from(&other.free);
        self.super_tri = other.super_tri;
        self.grid.set(&other.grid);
        self.points.set(&other.points);
        self.num_points = other.num_points;
        self.unique_points = other.unique_points;
    }

    /// calls f for every live triangle that does not touch a super-triangle
    /// vertex, in slab order.
    pub fn iter_triangles<F>(&self, mut f: F)
    where
        F: FnMut(&Triangle),
    {
        let s = &self.super_tri;
        for t in &self.triangles {
            if t.a.x == FREE_SLOT {
                continue;
            }
            if t.has_vertex(s.a) || t.has_vertex(s.b) || t.has_vertex(s.c) {
                continue;
            }
            f(t);
        }
    }

    /// whether the triangulation contains p as a vertex.
    pub fn has_point(&self, p: Point) -> bool {
        self.grid.has_point(p, &self.triangles)
    }

    /// the number of points inserted, counting duplicates.
    pub fn num_points(&self) -> usize {
        self.num_points
    }

    /// the closest mesh vertex to p, super-triangle corners included.
    pub fn closest_to(&self, p: Point) -> Option<Point> {
        let mut closest = None;
        let mut closest_dist = i64::MAX;

        for t in &self.triangles {
            if t.a.x == FREE_SLOT {
                continue;
            }
            for v in [t.a, t.b, t.c] {
                let dist = p.dist_sq(v);
                if dist < closest_dist {
                    closest_dist = dist;
                    closest = Some(v);
                }
            }
        }
        closest
    }

    fn add_triangle(&mut self, t: Triangle) {
        if let Some(slot) = self.free.pop() {
            self.triangles[slot as usize] = t;
            self.grid.add(&t, slot);
        } else {
            self.grid.add(&t, self.triangles.len() as u32);
            self.triangles.push(t);
        }
    }

    fn mark_free(&mut self, slot: u32) {
        self.triangles[slot as usize].a.x = FREE_SLOT;
        self.free.push(slot);
    }
}

/// XOR-style edge toggle: an edge seen twice cancels out, so after all
/// cavity triangles are visited only the boundary polygon remains.
fn toggle_edge(edges: &mut Vec<Edge>, e: Edge) {
    if let Some(i) = edges.iter().position(|&other| other == e) {
        edges.swap_remove(i);
    } else {
        edges.push(e);
    }
}

/// counter-clockwise-around-p ordering for the hole polygon.
fn cmp_around(p: Point, u: Point, v: Point) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    let ax = v.x as i64 - p.x as i64;
    let ay = v.y as i64 - p.y as i64;
    let bx = u.x as i64 - p.x as i64;
    let by = u.y as i64 - p.y as i64;

    if ax >= 0 && bx < 0 {
        return Ordering::Less;
    }
    if ax < 0 && bx >= 0 {
        return Ordering::Greater;
    }
    if ax == 0 && bx == 0 {
        return if ay >= 0 || by >= 0 {
            if ay > by {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        } else if by > ay {
            Ordering::Less
        } else {
            Ordering::Greater
        };
    }

    let det = ax * by - bx * ay;
    match det.cmp(&0) {
        Ordering::Less => Ordering::Less,
        Ordering::Greater => Ordering::Greater,
        // two hull vertices collinear with p on the same ray would mean a
        // mesh edge passing through a vertex, which a Delaunay mesh forbids
        Ordering::Equal => unreachable!("hull vertices collinear around removed point"),
    }
}
