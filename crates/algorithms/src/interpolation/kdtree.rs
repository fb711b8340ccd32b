//! 2D k-d tree over sample vertices
//!
//! Provides O(log n) nearest, k-nearest and fixed-radius queries. The tree
//! stores vertex coordinates and answers with indices into the slice it was
//! built from; it is immutable after construction and can be queried from
//! many threads at once.
//!
//! Reference:
//! Bentley, J.L. (1975). Multidimensional binary search trees used
//! for associative searching. CACM, 18(9).

use std::cmp::Ordering;

use super::Vertex;

/// A 2D k-d tree for spatial queries on vertices.
#[derive(Debug, Clone)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    /// (x, y) of each vertex, in input order
    coords: Vec<[f64; 2]>,
}

#[derive(Debug, Clone)]
struct KdNode {
    /// Index into `coords`
    point_idx: usize,
    /// Split axis: 0 = x, 1 = y
    axis: usize,
    left: Option<usize>,
    right: Option<usize>,
}

/// A query result: vertex index and squared distance to the query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub distance_sq: f64,
}

impl Neighbor {
    #[inline]
    pub fn distance(&self) -> f64 {
        self.distance_sq.sqrt()
    }
}

/// Nearest first, ties broken by vertex index.
pub(crate) fn by_distance(a: &Neighbor, b: &Neighbor) -> Ordering {
    a.distance_sq
        .partial_cmp(&b.distance_sq)
        .unwrap_or(Ordering::Equal)
        .then(a.index.cmp(&b.index))
}

impl KdTree {
    /// Build a k-d tree with median splits, O(n log² n).
    pub fn build(vertices: &[Vertex]) -> Self {
        let coords: Vec<[f64; 2]> = vertices.iter().map(|v| [v.x, v.y]).collect();
        let mut nodes = Vec::with_capacity(coords.len());

        if !coords.is_empty() {
            let mut indices: Vec<usize> = (0..coords.len()).collect();
            build_recursive(&coords, &mut indices, 0, &mut nodes);
        }

        Self { nodes, coords }
    }

    /// Number of indexed vertices.
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Find the nearest vertex to (qx, qy); `None` if the tree is empty.
    pub fn nearest(&self, qx: f64, qy: f64) -> Option<Neighbor> {
        self.k_nearest(qx, qy, 1).into_iter().next()
    }

    /// Find the k nearest vertices to (qx, qy), nearest first.
    pub fn k_nearest(&self, qx: f64, qy: f64, k: usize) -> Vec<Neighbor> {
        if self.nodes.is_empty() || k == 0 {
            return Vec::new();
        }

        // Sorted farthest first, so the k-th best is always at index 0
        let mut best: Vec<Neighbor> = Vec::with_capacity(k + 1);
        self.knn_recursive(0, qx, qy, k, &mut best);

        best.sort_by(by_distance);
        best
    }

    /// Find all vertices within `radius` of (qx, qy), nearest first.
    pub fn within_radius(&self, qx: f64, qy: f64, radius: f64) -> Vec<Neighbor> {
        if self.nodes.is_empty() || !(radius >= 0.0) {
            return Vec::new();
        }

        let mut results = Vec::new();
        self.radius_recursive(0, qx, qy, radius * radius, &mut results);
        results.sort_by(by_distance);
        results
    }

    /// Every vertex with its distance to (qx, qy), nearest first.
    pub fn all(&self, qx: f64, qy: f64) -> Vec<Neighbor> {
        let mut results: Vec<Neighbor> = self
            .coords
            .iter()
            .enumerate()
            .map(|(index, c)| Neighbor {
                index,
                distance_sq: dist_sq(c, qx, qy),
            })
            .collect();
        results.sort_by(by_distance);
        results
    }

    fn knn_recursive(&self, node_idx: usize, qx: f64, qy: f64, k: usize, best: &mut Vec<Neighbor>) {
        let node = &self.nodes[node_idx];
        let p = &self.coords[node.point_idx];
        let candidate = Neighbor {
            index: node.point_idx,
            distance_sq: dist_sq(p, qx, qy),
        };

        if best.len() < k || by_distance(&candidate, &best[0]) == Ordering::Less {
            if best.len() >= k {
                best.remove(0);
            }
            let pos = best
                .binary_search_by(|n| by_distance(n, &candidate).reverse())
                .unwrap_or_else(|e| e);
            best.insert(pos, candidate);
        }

        let diff = if node.axis == 0 { qx - p[0] } else { qy - p[1] };
        let (first, second) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(child) = first {
            self.knn_recursive(child, qx, qy, k, best);
        }

        let threshold = if best.len() >= k { best[0].distance_sq } else { f64::INFINITY };
        if diff * diff <= threshold {
            if let Some(child) = second {
                self.knn_recursive(child, qx, qy, k, best);
            }
        }
    }

    fn radius_recursive(&self, node_idx: usize, qx: f64, qy: f64, radius_sq: f64, results: &mut Vec<Neighbor>) {
        let node = &self.nodes[node_idx];
        let p = &self.coords[node.point_idx];
        let distance_sq = dist_sq(p, qx, qy);

        if distance_sq <= radius_sq {
            results.push(Neighbor {
                index: node.point_idx,
                distance_sq,
            });
        }

        let diff = if node.axis == 0 { qx - p[0] } else { qy - p[1] };

        if let Some(left) = node.left {
            if diff >= 0.0 || diff * diff <= radius_sq {
                self.radius_recursive(left, qx, qy, radius_sq, results);
            }
        }
        if let Some(right) = node.right {
            if diff <= 0.0 || diff * diff <= radius_sq {
                self.radius_recursive(right, qx, qy, radius_sq, results);
            }
        }
    }
}

#[inline]
fn dist_sq(p: &[f64; 2], qx: f64, qy: f64) -> f64 {
    let dx = qx - p[0];
    let dy = qy - p[1];
    dx * dx + dy * dy
}

fn build_recursive(coords: &[[f64; 2]], indices: &mut [usize], depth: usize, nodes: &mut Vec<KdNode>) -> usize {
    let axis = depth % 2;
    indices.sort_by(|&a, &b| {
        coords[a][axis]
            .partial_cmp(&coords[b][axis])
            .unwrap_or(Ordering::Equal)
    });

    let median = indices.len() / 2;
    let node_idx = nodes.len();
    nodes.push(KdNode {
        point_idx: indices[median],
        axis,
        left: None,
        right: None,
    });

    let (lower, rest) = indices.split_at_mut(median);
    let upper = &mut rest[1..];

    if !lower.is_empty() {
        let left = build_recursive(coords, lower, depth + 1, nodes);
        nodes[node_idx].left = Some(left);
    }
    if !upper.is_empty() {
        let right = build_recursive(coords, upper, depth + 1, nodes);
        nodes[node_idx].right = Some(right);
    }

    node_idx
}
