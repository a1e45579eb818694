// duplicate-point bookkeeping
//
// the mesh stores each distinct vertex once; this table counts how many
// copies of a point the caller has inserted so that insert/remove only
// touch the mesh on the first and last copy.

use super::geom::Point;

#[derive(Clone, Copy, Debug)]
struct PointEntry {
    x: i16,
    y: i16,
    count: u16,
}

/// a small bucketed hash table from point to copy count.
#[derive(Debug)]
pub struct PointMap {
    buckets: Vec<Vec<PointEntry>>,
}

impl PointMap {
    pub fn new(size: usize) -> Self {
        PointMap {
            buckets: vec![Vec::new(); size],
        }
    }

    #[inline]
    fn bucket_of(&self, p: Point) -> usize {
        p.hash().rem_euclid(self.buckets.len() as i64) as usize
    }

    /// counts one more copy of p, returning the new count.
    pub fn add(&mut self, p: Point) -> u16 {
        let bucket = self.bucket_of(p);

        for entry in &mut self.buckets[bucket] {
            if entry.x == p.x && entry.y == p.y {
                entry.count += 1;
                return entry.count;
            }
        }

        self.buckets[bucket].push(PointEntry {
            x: p.x,
            y: p.y,
            count: 1,
        });
        1
    }

    /// counts one copy of p removed, returning how many copies remain.
    /// removing a point that was never added is a caller bug.
    pub fn remove(&mut self, p: Point) -> u16 {
        let bucket = self.bucket_of(p);

        for i in 0..self.buckets[bucket].len() {
            let entry = &mut self.buckets[bucket][i];
            if entry.x == p.x && entry.y == p.y {
                entry.count -= 1;
                if entry.count != 0 {
                    return entry.count;
                }
                self.buckets[bucket].swap_remove(i);
                return 0;
            }
        }
        panic!("removed a point that is not in the triangulation");
    }

    /// total number of copies across all points.
    pub fn num_points(&self) -> usize {
        self.buckets
            .iter()
            .flatten()
            .map(|e| e.count as usize)
            .sum()
    }

    /// structural copy from another map, reusing bucket allocations.
    pub fn set(&mut self, other: &PointMap) {
        debug_assert_eq!(self.buckets.len(), other.buckets.len());
        for (bucket, other_bucket) in self.buckets.iter_mut().zip(&other.buckets) {
            bucket.clone_from(other_bucket);
        }
    }
}
