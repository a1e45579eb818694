// triangle rasterisation
//
// all entry points enumerate exactly the same pixel set for a given
// triangle; they differ in how the work is reported to the caller:
// - `triangle_lines` emits one callback per covered row
// - `triangle_pixels` emits one callback per covered pixel
// - `triangle_blocks` emits fully-contained n×n blocks where it can and
//   falls back to rows around the fringes
//
// the blocked form is what the fitness evaluator uses: combined with
// precomputed block sum tables it removes (n²−1)/n² of the per-pixel work
// inside large triangles.

use crate::geom::Triangle;

/// one unit of rasterisation work from [`triangle_blocks`]: either a row
/// span to process pixel by pixel, or a fully-covered block to look up in
/// a precomputed sum table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Span {
    /// pixels [x0, x1) of row y.
    Line { x0: i32, x1: i32, y: i32 },
    /// the block whose top-left corner is (x, y).
    Block { x: i32, y: i32 },
}

/// calls `line(x0, x1, y)` for every horizontal span a triangle covers.
/// spans are half-open in x. degenerate triangles emit nothing.
pub fn triangle_lines<L>(tri: Triangle, mut line: L)
where
    L: FnMut(i32, i32, i32),
{
    let [p0, p1, p2] = tri.points;
    let (mut x0, mut y0) = (p0.x, p0.y);
    let (mut x1, mut y1) = (p1.x, p1.y);
    let (mut x2, mut y2) = (p2.x, p2.y);

    // sort vertices so y0 is the largest y and y2 the smallest
    if y1 > y0 {
        std::mem::swap(&mut x0, &mut x1);
        std::mem::swap(&mut y0, &mut y1);
    }
    if y2 > y1 {
        std::mem::swap(&mut x1, &mut x2);
        std::mem::swap(&mut y1, &mut y2);
        if y1 > y0 {
            std::mem::swap(&mut x0, &mut x1);
            std::mem::swap(&mut y0, &mut y1);
        }
    }

    if y1 == y2 {
        // flat edge at the smallest y; both slopes run to the remaining apex
        if x2 < x1 {
            std::mem::swap(&mut x1, &mut x2);
        }
        if y1 == y0 {
            return; // all three rows coincide: nothing to emit
        }
        let m0 = (x1 - x0) as f64 / (y1 - y0) as f64;
        let m1 = (x2 - x0) as f64 / (y1 - y0) as f64;
        fill_lines(y1, y0, x1 as f64, x2 as f64, m0, m1, &mut line);
    } else if y0 == y1 {
        // flat edge at the largest y
        if x0 > x1 {
            std::mem::swap(&mut x0, &mut x1);
        }
        let m0 = (x2 - x0) as f64 / (y2 - y0) as f64;
        let m1 = (x2 - x1) as f64 / (y2 - y0) as f64;
        fill_lines(y2, y0, x2 as f64, x2 as f64, m0, m1, &mut line);
    } else {
        normal_lines(x0, y0, x1, y1, x2, y2, &mut line);
    }
}

/// rasterises a triangle whose three y values all differ.
/// y values must be sorted with y0 the largest.
fn normal_lines<L>(x0: i32, y0: i32, x1: i32, y1: i32, x2: i32, y2: i32, line: &mut L)
where
    L: FnMut(i32, i32, i32),
{
    let mut m0 = (x2 - x0) as f64 / (y2 - y0) as f64;
    let mut m1 = (x2 - x1) as f64 / (y2 - y1) as f64;

    // keep m0 on the left edge and m1 on the right
    let swapped = m0 > m1;
    if swapped {
        std::mem::swap(&mut m0, &mut m1);
    }

    let mut b0 = x2 as f64;
    let mut b1 = x2 as f64;

    for i in y2..y1 {
        let nx0 = m0 * (i - y2) as f64 + b0;
        let nx1 = m1 * (i - y2) as f64 + b1;
        line(nx0 as i32, nx1 as i32, i);
    }

    // one slope carries through the middle vertex; the other restarts there
    let mut d0 = 0;
    let mut d1 = 0;
    if swapped {
        m0 = (x1 - x0) as f64 / (y1 - y0) as f64;
        b0 = x1 as f64;
        d1 = y1 - y2;
    } else {
        m1 = (x1 - x0) as f64 / (y1 - y0) as f64;
        b1 = x1 as f64;
        d0 = y1 - y2;
    }

    for i in y1..y0 {
        let nx0 = m0 * (i - y1 + d0) as f64 + b0;
        let nx1 = m1 * (i - y1 + d1) as f64 + b1;
        line(nx0 as i32, nx1 as i32, i);
    }
}

fn fill_lines<L>(min_y: i32, max_y: i32, lx0: f64, lx1: f64, m0: f64, m1: f64, line: &mut L)
where
    L: FnMut(i32, i32, i32),
{
    for i in min_y..max_y {
        let nx0 = m0 * (i - min_y) as f64 + lx0;
        let nx1 = m1 * (i - min_y) as f64 + lx1;
        line(nx0 as i32, nx1 as i32, i);
    }
}

/// calls `pixel(x, y)` for every pixel a triangle covers.
pub fn triangle_pixels<P>(tri: Triangle, mut pixel: P)
where
    P: FnMut(i32, i32),
{
    triangle_lines(tri, |x0, x1, y| {
        for x in x0..x1 {
            pixel(x, y);
        }
    });
}

/// emits a [`Span`] for each fully-contained block_size×block_size block a
/// triangle covers and for every remaining partial row. the emitted pixel
/// set depends only on the set of vertices, not their order.
pub fn triangle_blocks<F>(tri: Triangle, block_size: i32, mut emit: F)
where
    F: FnMut(Span),
{
    profiling::scope!("triangle_blocks");
    let [p0, p1, p2] = tri.points;
    let (mut x0, mut y0) = (p0.x, p0.y);
    let (mut x1, mut y1) = (p1.x, p1.y);
    let (mut x2, mut y2) = (p2.x, p2.y);

    // sort vertices so y0 is the largest y and y2 the smallest
    if y1 > y0 {
        std::mem::swap(&mut x0, &mut x1);
        std::mem::swap(&mut y0, &mut y1);
    }
    if y2 > y1 {
        std::mem::swap(&mut x1, &mut x2);
        std::mem::swap(&mut y1, &mut y2);
        if y1 > y0 {
            std::mem::swap(&mut x0, &mut x1);
            std::mem::swap(&mut y0, &mut y1);
        }
    }

    let mut m0 = (x2 - x0) as f64 / (y2 - y0) as f64;
    let mut m1 = (x2 - x1) as f64 / (y2 - y1) as f64;

    let swapped = m0 > m1;
    if swapped {
        std::mem::swap(&mut m0, &mut m1);
    }

    let mut lx0 = x2 as f64;
    let mut lx1 = x2 as f64;

    // top sub-triangle: walk upward from just below the middle vertex in
    // strides of block_size while the span is wide enough for whole blocks
    let mut i = y1 - 1;
    while i > y2 {
        let top = i - block_size + 1;

        let bottom_x = m0 * (i - y2) as f64 + lx0;
        let top_x = m0 * (top - y2) as f64 + lx0;
        let max_x = bottom_x.max(top_x);

        let bottom_x = m1 * (i - y2) as f64 + lx1;
        let top_x = m1 * (top - y2) as f64 + lx1;
        let min_x = bottom_x.min(top_x);

        // remaining span too narrow for blocks
        if ((max_x as i32) + block_size) as f64 >= min_x {
            break;
        }

        // left fringe, block run, right fringe
        for y in 0..block_size {
            let px0 = m0 * ((i - y) - y2) as f64 + lx0;
            emit(Span::Line {
                x0: px0 as i32,
                x1: max_x as i32,
                y: i - y,
            });
        }

        let mut x = max_x as i32;
        while ((x + block_size) as f64) < min_x {
            emit(Span::Block {
                x,
                y: i - block_size + 1,
            });
            x += block_size;
        }

        for y in 0..block_size {
            let px1 = m1 * ((i - y) - y2) as f64 + lx1;
            emit(Span::Line {
                x0: x,
                x1: px1 as i32,
                y: i - y,
            });
        }

        i -= block_size;
    }

    // remainder of the top sub-triangle, row by row
    while i > y2 {
        let px0 = m0 * (i - y2) as f64 + lx0;
        let px1 = m1 * (i - y2) as f64 + lx1;
        emit(Span::Line {
            x0: px0 as i32,
            x1: px1 as i32,
            y: i,
        });
        i -= 1;
    }

    // recompute the slope that changes at the middle vertex, then repeat
    // the same walk for the bottom sub-triangle
    let mut d0 = 0;
    let mut d1 = 0;
    if swapped {
        m0 = (x1 - x0) as f64 / (y1 - y0) as f64;
        lx0 = x1 as f64;
        d1 = y1 - y2;
    } else {
        m1 = (x1 - x0) as f64 / (y1 - y0) as f64;
        lx1 = x1 as f64;
        d0 = y1 - y2;
    }

    if y1 == y2 {
        // flat top: both sub-triangle edges start on the flat edge
        lx0 = x2 as f64;
        lx1 = x1 as f64;
        if lx0 > lx1 {
            std::mem::swap(&mut lx0, &mut lx1);
        }
        if m0 < m1 {
            std::mem::swap(&mut m0, &mut m1);
        }
    }

    i = y1;
    while i + block_size < y0 {
        let top = i + block_size - 1;

        let bottom_x = m0 * (i - y1 + d0) as f64 + lx0;
        let top_x = m0 * (top - y1 + d0) as f64 + lx0;
        let max_x = bottom_x.max(top_x);

        let bottom_x = m1 * (i - y1 + d1) as f64 + lx1;
        let top_x = m1 * (top - y1 + d1) as f64 + lx1;
        let min_x = bottom_x.min(top_x);

        if ((max_x as i32) + block_size) as f64 >= min_x {
            break;
        }

        for y in 0..block_size {
            let px0 = m0 * ((i + y) - y1 + d0) as f64 + lx0;
            emit(Span::Line {
                x0: px0 as i32,
                x1: max_x as i32,
                y: i + y,
            });
        }

        let mut x = max_x as i32;
        while ((x + block_size) as f64) < min_x {
            emit(Span::Block { x, y: i });
            x += block_size;
        }

        for y in 0..block_size {
            let px1 = m1 * ((i + y) - y1 + d1) as f64 + lx1;
            emit(Span::Line {
                x0: x,
                x1: px1 as i32,
                y: i + y,
            });
        }

        i += block_size;
    }

    while i < y0 {
        let px0 = m0 * (i - y1 + d0) as f64 + lx0;
        let px1 = m1 * (i - y1 + d1) as f64 + lx1;
        emit(Span::Line {
            x0: px0 as i32,
            x1: px1 as i32,
            y: i,
        });
        i += 1;
    }
}
