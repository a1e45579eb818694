// exact geometric predicates
//
// every test is computed in i64 on coordinate differences. with coordinates
// bounded by the i16 domain no intermediate product can overflow, so there
// is no floating-point ambiguity anywhere in the mesh logic.

use super::geom::Point;

/// sign of the in-circumcircle test: positive when d lies inside the
/// circumcircle of triangle abc, zero when cocircular, negative outside.
/// the vertex order of abc is canonicalised internally, so callers may pass
/// either orientation.
#[allow(clippy::too_many_arguments)]
pub fn in_circle(
    mut ax: i64,
    mut ay: i64,
    mut bx: i64,
    mut by: i64,
    cx: i64,
    cy: i64,
    dx: i64,
    dy: i64,
) -> i64 {
    if orientation(ax, ay, bx, by, cx, cy) < 0 {
        std::mem::swap(&mut ax, &mut bx);
        std::mem::swap(&mut ay, &mut by);
    }

    let a11 = ax - dx;
    let a21 = bx - dx;
    let a31 = cx - dx;

    let a12 = ay - dy;
    let a22 = by - dy;
    let a32 = cy - dy;

    (a11 * a11 + a12 * a12) * (a21 * a32 - a31 * a22)
        + (a21 * a21 + a22 * a22) * (a31 * a12 - a11 * a32)
        + (a31 * a31 + a32 * a32) * (a11 * a22 - a21 * a12)
}

/// twice the signed area of triangle abc. zero means collinear; the sign
/// distinguishes the two windings.
#[inline]
pub fn orientation(ax: i64, ay: i64, bx: i64, by: i64, cx: i64, cy: i64) -> i64 {
    (ax - cx) * (by - cy) - (bx - cx) * (ay - cy)
}

/// score of a Devillers ear (a, b, c) around the point d being removed:
/// in_circle / orientation, with wrongly-wound ears pushed to +∞ so they are
/// never clipped first. lower scores are clipped earlier.
pub fn ear_score(a: Point, b: Point, c: Point, d: Point) -> f64 {
    let orient = orientation(
        a.x as i64, a.y as i64, b.x as i64, b.y as i64, c.x as i64, c.y as i64,
    );

    if orient <= 0 {
        return f64::MAX;
    }

    let in_c = in_circle(
        a.x as i64, a.y as i64, b.x as i64, b.y as i64, c.x as i64, c.y as i64, d.x as i64,
        d.y as i64,
    );

    in_c as f64 / orient as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_circle_signs() {
        // unit-ish right triangle scaled by 10, test point well inside
        assert!(in_circle(0, 0, 10, 0, 0, 10, 1, 1) > 0);
        // far outside
        assert!(in_circle(0, 0, 10, 0, 0, 10, 50, 50) < 0);
        // the fourth corner of the square is exactly cocircular
        assert_eq!(in_circle(0, 0, 10, 0, 0, 10, 10, 10), 0);
    }

    #[test]
    fn test_in_circle_ignores_orientation() {
        let a = in_circle(0, 0, 10, 0, 0, 10, 2, 3);
        let b = in_circle(10, 0, 0, 0, 0, 10, 2, 3);
        assert_eq!(a, b);
    }

    #[test]
    fn test_orientation_collinear() {
        assert_eq!(orientation(0, 0, 5, 5, 10, 10), 0);
        assert_ne!(orientation(0, 0, 5, 5, 10, 9), 0);
    }

    #[test]
    fn test_ear_score_rejects_bad_winding() {
        let p = Point::new(5, 5);
        let a = Point::new(0, 0);
        let b = Point::new(10, 0);
        let c = Point::new(10, 10);
        // one winding is finite, the reverse is pushed to +infinity
        let s0 = ear_score(a, b, c, p);
        let s1 = ear_score(c, b, a, p);
        assert!(s0 == f64::MAX || s1 == f64::MAX);
        assert!(s0 != s1);
    }
}
