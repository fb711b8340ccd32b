//! Break-line visibility
//!
//! A break line is a hard discontinuity: a sample on one side must not
//! influence a query point on the other side. Sample V is hidden from
//! query point Q when the open segment Q-V crosses a break line.
//!
//! A crossing is either a proper crossing of one break segment, or a
//! passage through break-line vertices where the line arrives from one
//! side of Q-V and leaves to the other. A path that only grazes an apex,
//! or runs along the line and returns to the side it came from, is not
//! blocked. Touching and collinear configurations never block, so samples
//! on the break line itself stay visible.

/// Upper bound of buckets per axis in [`BreakIndex`]
const MAX_BUCKETS_PER_AXIS: usize = 256;

/// Edge between two consecutive vertices of a break line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakSegment {
    pub ax: f64,
    pub ay: f64,
    pub bx: f64,
    pub by: f64,
    pub line_id: u32,
    // Bounding box, for cheap rejection
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
}

impl BreakSegment {
    pub fn new(ax: f64, ay: f64, bx: f64, by: f64, line_id: u32) -> Self {
        Self {
            ax,
            ay,
            bx,
            by,
            line_id,
            min_x: ax.min(bx),
            max_x: ax.max(bx),
            min_y: ay.min(by),
            max_y: ay.max(by),
        }
    }

    /// Whether the path from (qx, qy) to (vx, vy) properly crosses this
    /// segment.
    ///
    /// Q and V must lie strictly on opposite sides of the segment's line,
    /// and the segment's endpoints strictly on opposite sides of the path.
    /// Passages through an endpoint are resolved by [`BreakIndex::hides`],
    /// which knows the neighbouring segments.
    pub fn blocks(&self, qx: f64, qy: f64, vx: f64, vy: f64) -> bool {
        if qx.max(vx) < self.min_x
            || qx.min(vx) > self.max_x
            || qy.max(vy) < self.min_y
            || qy.min(vy) > self.max_y
        {
            return false;
        }

        let o_q = orient(self.ax, self.ay, self.bx, self.by, qx, qy);
        let o_v = orient(self.ax, self.ay, self.bx, self.by, vx, vy);
        if o_q * o_v >= 0.0 {
            return false;
        }

        let o_a = orient(qx, qy, vx, vy, self.ax, self.ay);
        let o_b = orient(qx, qy, vx, vy, self.bx, self.by);
        o_a * o_b < 0.0
    }

    fn start(&self) -> (f64, f64) {
        (self.ax, self.ay)
    }

    fn end(&self) -> (f64, f64) {
        (self.bx, self.by)
    }
}

/// Twice the signed area of triangle (a, b, c); positive when c is left of a->b.
#[inline]
fn orient(ax: f64, ay: f64, bx: f64, by: f64, cx: f64, cy: f64) -> f64 {
    (bx - ax) * (cy - ay) - (by - ay) * (cx - ax)
}

/// Query path Q-V.
struct Path {
    qx: f64,
    qy: f64,
    vx: f64,
    vy: f64,
}

impl Path {
    /// Signed side of (x, y) relative to Q->V; zero on the path's line.
    fn side(&self, x: f64, y: f64) -> f64 {
        orient(self.qx, self.qy, self.vx, self.vy, x, y)
    }

    /// Whether (x, y) lies on the open segment Q-V.
    fn passes_through(&self, x: f64, y: f64) -> bool {
        if self.side(x, y) != 0.0 {
            return false;
        }
        let (dx, dy) = (self.vx - self.qx, self.vy - self.qy);
        let t = (x - self.qx) * dx + (y - self.qy) * dy;
        t > 0.0 && t < dx * dx + dy * dy
    }
}

/// Uniform bucket grid over the bounding box of the break segments.
#[derive(Debug, Clone, Copy, Default)]
struct BucketGrid {
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
    bucket_w: f64,
    bucket_h: f64,
    cols: usize,
    rows: usize,
}

impl BucketGrid {
    fn covering(segments: &[BreakSegment]) -> Self {
        let (x_min, x_max, y_min, y_max) = segments.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
            |(x0, x1, y0, y1), s| (x0.min(s.min_x), x1.max(s.max_x), y0.min(s.min_y), y1.max(s.max_y)),
        );
        let per_axis = ((segments.len() as f64).sqrt().ceil() as usize).clamp(1, MAX_BUCKETS_PER_AXIS);
        let axis = |span: f64| {
            if span > 0.0 {
                (per_axis, span / per_axis as f64)
            } else {
                (1, 1.0)
            }
        };
        let (cols, bucket_w) = axis(x_max - x_min);
        let (rows, bucket_h) = axis(y_max - y_min);
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
            bucket_w,
            bucket_h,
            cols,
            rows,
        }
    }

    fn len(&self) -> usize {
        self.cols * self.rows
    }

    fn col_of(&self, x: f64) -> usize {
        let c = ((x - self.x_min) / self.bucket_w).floor().max(0.0) as usize;
        c.min(self.cols - 1)
    }

    fn row_of(&self, y: f64) -> usize {
        let r = ((y - self.y_min) / self.bucket_h).floor().max(0.0) as usize;
        r.min(self.rows - 1)
    }

    /// Calls `f` with every bucket the segment (ax, ay)-(bx, by) may pass
    /// through, one band of rows at a time, until `f` returns true.
    ///
    /// Column ranges are widened by one bucket on each side to absorb
    /// rounding at bucket edges.
    fn any_along(&self, ax: f64, ay: f64, bx: f64, by: f64, mut f: impl FnMut(usize) -> bool) -> bool {
        if self.len() == 0 {
            return false;
        }
        let (lo_x, hi_x) = (ax.min(bx), ax.max(bx));
        let (lo_y, hi_y) = (ay.min(by), ay.max(by));
        if hi_x < self.x_min || lo_x > self.x_max || hi_y < self.y_min || lo_y > self.y_max {
            return false;
        }

        let first_row = self.row_of(lo_y);
        let last_row = self.row_of(hi_y);
        for row in first_row..=last_row {
            let band_lo = if row == first_row {
                lo_y
            } else {
                self.y_min + row as f64 * self.bucket_h
            };
            let band_hi = if row == last_row {
                hi_y
            } else {
                self.y_min + (row + 1) as f64 * self.bucket_h
            };

            let (x0, x1) = if ay == by {
                (lo_x, hi_x)
            } else {
                let x_at = |y: f64| ax + (y - ay) * (bx - ax) / (by - ay);
                let (p, q) = (x_at(band_lo), x_at(band_hi));
                (p.min(q), p.max(q))
            };

            let first_col = self.col_of(x0).saturating_sub(1);
            let last_col = (self.col_of(x1) + 1).min(self.cols - 1);
            for col in first_col..=last_col {
                if f(row * self.cols + col) {
                    return true;
                }
            }
        }
        false
    }
}

/// Break segments bucketed on a uniform grid for visibility queries.
///
/// A query only tests the segments registered in the buckets its path
/// passes through. Immutable once built; safe to query from many threads.
#[derive(Debug, Clone, Default)]
pub struct BreakIndex {
    segments: Vec<BreakSegment>,
    /// Segment continuing each segment along its line, wrapping on closed rings
    next: Vec<Option<usize>>,
    grid: BucketGrid,
    buckets: Vec<Vec<usize>>,
}

impl BreakIndex {
    /// Index `segments`, which must list each line's segments in order.
    pub fn new(segments: &[BreakSegment]) -> Self {
        if segments.is_empty() {
            return Self::default();
        }

        let grid = BucketGrid::covering(segments);
        let mut buckets = vec![Vec::new(); grid.len()];
        for (i, s) in segments.iter().enumerate() {
            grid.any_along(s.ax, s.ay, s.bx, s.by, |b| {
                buckets[b].push(i);
                false
            });
        }

        Self {
            segments: segments.to_vec(),
            next: link(segments),
            grid,
            buckets,
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether a break line hides (vx, vy) from (qx, qy).
    pub fn hides(&self, qx: f64, qy: f64, vx: f64, vy: f64) -> bool {
        if self.segments.is_empty() {
            return false;
        }
        let path = Path { qx, qy, vx, vy };
        self.grid.any_along(qx, qy, vx, vy, |b| {
            self.buckets[b].iter().any(|&i| self.segment_hides(i, &path))
        })
    }

    /// Proper crossing of segment `i`, or a passage through the vertices
    /// that start at its end: the line arrives from one side of the path
    /// and, after any stretch along the path, leaves to the other side.
    fn segment_hides(&self, i: usize, path: &Path) -> bool {
        let s = &self.segments[i];
        if s.blocks(path.qx, path.qy, path.vx, path.vy) {
            return true;
        }

        let arriving = path.side(s.ax, s.ay);
        if arriving == 0.0 || !path.passes_through(s.bx, s.by) {
            return false;
        }

        let mut current = i;
        for _ in 0..self.segments.len() {
            let Some(j) = self.next[current] else {
                return false;
            };
            let n = &self.segments[j];
            let leaving = path.side(n.bx, n.by);
            if leaving != 0.0 {
                return leaving.signum() != arriving.signum();
            }
            if !path.passes_through(n.bx, n.by) {
                return false;
            }
            current = j;
        }
        false
    }
}

/// Successor of each segment along its line. The last segment of a closed
/// line links back to the first.
fn link(segments: &[BreakSegment]) -> Vec<Option<usize>> {
    let mut next = vec![None; segments.len()];
    let mut first = 0;
    for (i, s) in segments.iter().enumerate() {
        let joined = |a: &BreakSegment, b: &BreakSegment| a.line_id == b.line_id && a.end() == b.start();
        if i > 0 && !joined(&segments[i - 1], s) {
            first = i;
        }
        next[i] = match segments.get(i + 1) {
            Some(n) if joined(s, n) => Some(i + 1),
            _ if i > first && segments[first].start() == s.end() => Some(first),
            _ => None,
        };
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertical_wall() -> BreakSegment {
        BreakSegment::new(5.0, 0.0, 5.0, 10.0, 0)
    }

    /// Consecutive segments of one polyline
    fn polyline(points: &[(f64, f64)], line_id: u32) -> Vec<BreakSegment> {
        points
            .windows(2)
            .map(|w| BreakSegment::new(w[0].0, w[0].1, w[1].0, w[1].1, line_id))
            .collect()
    }

    #[test]
    fn test_crossing_blocks() {
        assert!(vertical_wall().blocks(2.0, 5.0, 8.0, 5.0));
        assert!(vertical_wall().blocks(8.0, 1.0, 2.0, 9.0));
    }

    #[test]
    fn test_same_side_visible() {
        assert!(!vertical_wall().blocks(2.0, 5.0, 4.0, 1.0));
    }

    #[test]
    fn test_path_passing_beyond_end_visible() {
        assert!(!vertical_wall().blocks(2.0, 12.0, 8.0, 12.0));
        assert!(!vertical_wall().blocks(2.0, 20.0, 8.0, 11.0));
    }

    #[test]
    fn test_vertex_on_break_line_visible() {
        // V lies on the wall: touching is not crossing
        let index = BreakIndex::new(&[vertical_wall()]);
        assert!(!index.hides(2.0, 5.0, 5.0, 5.0));
        assert!(!index.hides(5.0, 3.0, 8.0, 5.0));
    }

    #[test]
    fn test_collinear_visible() {
        let index = BreakIndex::new(&[vertical_wall()]);
        assert!(!index.hides(5.0, -5.0, 5.0, 20.0));
    }

    #[test]
    fn test_path_ending_at_wall_end_visible() {
        // Path touches the wall's lower end point only
        let index = BreakIndex::new(&[vertical_wall()]);
        assert!(!index.hides(2.0, 0.0, 8.0, 0.0));
    }

    #[test]
    fn test_path_through_polyline_vertex_blocked() {
        // Polyline (5,0)-(5,5)-(5,10); path crosses exactly at the shared vertex
        let index = BreakIndex::new(&polyline(&[(5.0, 0.0), (5.0, 5.0), (5.0, 10.0)], 1));
        assert!(index.hides(2.0, 5.0, 8.0, 5.0));
        assert!(index.hides(8.0, 5.0, 2.0, 5.0));
    }

    #[test]
    fn test_path_grazing_apex_visible() {
        // Both segments of the apex stay below the path
        let peak = polyline(&[(4.0, 0.0), (5.0, 5.0), (6.0, 0.0)], 0);
        let index = BreakIndex::new(&peak);
        assert!(!index.hides(2.0, 5.0, 8.0, 5.0));
        assert!(!index.hides(8.0, 5.0, 2.0, 5.0));

        // Same apex from above
        let valley = polyline(&[(4.0, 10.0), (5.0, 5.0), (6.0, 10.0)], 0);
        assert!(!BreakIndex::new(&valley).hides(2.0, 5.0, 8.0, 5.0));
    }

    #[test]
    fn test_path_along_line_then_across_blocked() {
        let across = polyline(&[(3.0, 0.0), (4.0, 5.0), (6.0, 5.0), (7.0, 10.0)], 0);
        assert!(BreakIndex::new(&across).hides(2.0, 5.0, 8.0, 5.0));

        let back = polyline(&[(3.0, 0.0), (4.0, 5.0), (6.0, 5.0), (7.0, 0.0)], 0);
        assert!(!BreakIndex::new(&back).hides(2.0, 5.0, 8.0, 5.0));
    }

    #[test]
    fn test_path_through_closed_ring_start_blocked() {
        // Diamond ring starting and ending at (3,5); V lies inside
        let ring = polyline(
            &[(3.0, 5.0), (5.0, 8.0), (7.0, 5.0), (5.0, 2.0), (3.0, 5.0)],
            0,
        );
        let index = BreakIndex::new(&ring);
        assert!(index.hides(1.0, 5.0, 4.0, 5.0));
        assert!(!index.hides(4.0, 5.0, 6.0, 5.0));
    }

    #[test]
    fn test_separate_lines_do_not_join() {
        // Two lines meeting at (5,5): each ends on the path
        let mut segs = polyline(&[(5.0, 0.0), (5.0, 5.0)], 0);
        segs.extend(polyline(&[(5.0, 5.0), (5.0, 10.0)], 1));
        assert!(!BreakIndex::new(&segs).hides(2.0, 5.0, 8.0, 5.0));
    }

    #[test]
    fn test_bbox_rejection() {
        assert!(!vertical_wall().blocks(20.0, 20.0, 30.0, 30.0));
        assert!(!BreakIndex::new(&[vertical_wall()]).hides(20.0, 20.0, 30.0, 30.0));
    }

    #[test]
    fn test_empty_index_hides_nothing() {
        let index = BreakIndex::new(&[]);
        assert!(index.is_empty());
        assert!(!index.hides(0.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn test_buckets_agree_with_full_scan() {
        let segments: Vec<BreakSegment> = (0..200u32)
            .map(|i| {
                let ax = ((i * 37 + 11) % 1000) as f64 / 10.0;
                let ay = ((i * 53 + 29) % 1000) as f64 / 10.0;
                let bx = ax + ((i * 17) % 23) as f64 - 11.0;
                let by = ay + ((i * 29) % 19) as f64 - 9.0;
                BreakSegment::new(ax, ay, bx, by, i)
            })
            .collect();
        let index = BreakIndex::new(&segments);
        assert_eq!(index.len(), 200);

        for k in 0..400u32 {
            let qx = ((k * 71 + 3) % 1000) as f64 / 10.0 + 0.013;
            let qy = ((k * 43 + 7) % 1000) as f64 / 10.0 + 0.029;
            let vx = ((k * 89 + 5) % 1000) as f64 / 10.0 + 0.041;
            let vy = ((k * 61 + 1) % 1000) as f64 / 10.0 + 0.057;
            let expected = segments.iter().any(|s| s.blocks(qx, qy, vx, vy));
            assert_eq!(index.hides(qx, qy, vx, vy), expected, "path {}", k);
        }
    }
}
