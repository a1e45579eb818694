// mesh-level geometry: compact points, triangles with precomputed
// circumcircles, ordered edges, and the bounding super-triangle.

/// a 2D mesh vertex. i16 keeps the triangle slab and grid cells compact;
/// the image domain is bounded well inside the i16 range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Point {
    pub x: i16,
    pub y: i16,
}

impl Point {
    #[inline]
    pub fn new(x: i16, y: i16) -> Self {
        Point { x, y }
    }

    /// squared distance to another point.
    #[inline]
    pub fn dist_sq(self, other: Point) -> i64 {
        let dx = other.x as i64 - self.x as i64;
        let dy = other.y as i64 - self.y as i64;
        dx * dx + dy * dy
    }

    /// hash used by the duplicate-point table.
    #[inline]
    pub(crate) fn hash(self) -> i64 {
        (53 + self.x as i64) * 53 + self.y as i64
    }
}

/// circumcircle of a triangle. f32 is enough precision for the grid's
/// bounding-box registration; containment tests use exact integer
/// arithmetic instead.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Circumcircle {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

/// a mesh triangle: three vertices in construction order plus the
/// precomputed circumcircle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    pub a: Point,
    pub b: Point,
    pub c: Point,
    pub circumcircle: Circumcircle,
}

impl Triangle {
    pub fn new(a: Point, b: Point, c: Point) -> Self {
        Triangle {
            a,
            b,
            c,
            circumcircle: circumcircle(a, b, c),
        }
    }

    /// whether p is one of the three vertices.
    #[inline]
    pub fn has_vertex(&self, p: Point) -> bool {
        self.a == p || self.b == p || self.c == p
    }
}

/// computes the circumcircle of three points. the centre is derived in
/// exact i64 arithmetic and only narrowed at the end.
fn circumcircle(v0: Point, v1: Point, v2: Point) -> Circumcircle {
    let a = v1.x as i64 - v0.x as i64;
    let b = v1.y as i64 - v0.y as i64;
    let c = v2.x as i64 - v0.x as i64;
    let d = v2.y as i64 - v0.y as i64;

    let e = a * (v0.x as i64 + v1.x as i64) + b * (v0.y as i64 + v1.y as i64);
    let f = c * (v0.x as i64 + v2.x as i64) + d * (v0.y as i64 + v2.y as i64);

    let g = (2 * (a * (v2.y as i64 - v1.y as i64) - b * (v2.x as i64 - v1.x as i64))) as f64;

    let cx = (d * e - b * f) as f64 / g;
    let cy = (a * f - c * e) as f64 / g;

    let dx = cx - v0.x as f64;
    let dy = cy - v0.y as f64;

    Circumcircle {
        x: cx as f32,
        y: cy as f32,
        radius: (dx * dx + dy * dy).sqrt() as f32,
    }
}

/// returns a triangle large enough to enclose every point of a w×h domain.
pub fn super_triangle(w: i32, h: i32) -> Triangle {
    let hw = (w as f64 / 2.0).ceil() as i32;
    let hh = (h as f64 / 2.0).ceil() as i32;
    let max = w.max(h);

    let a = Point::new((hw - 2 * max) as i16, (hh - max) as i16);
    let b = Point::new(hw as i16, (hh + 2 * max) as i16);
    let c = Point::new((hw + 2 * max) as i16, (hh - max) as i16);

    Triangle::new(a, b, c)
}

/// an undirected mesh edge, stored with its endpoints ordered so that equal
/// edges compare equal regardless of traversal direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edge {
    pub a: Point,
    pub b: Point,
}

impl Edge {
    pub fn new(mut a: Point, mut b: Point) -> Self {
        if a.x > b.x || (a.x == b.x && a.y > b.y) {
            std::mem::swap(&mut a, &mut b);
        }
        Edge { a, b }
    }
}
