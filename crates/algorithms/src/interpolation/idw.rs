//! Inverse Distance Weighting (IDW) interpolation
//!
//! Estimates values at unknown locations as a weighted average of sample
//! vertices, where weights are inversely proportional to distance raised
//! to a power parameter. Samples hidden behind a break line do not take
//! part in the average.
//!
//! Reference:
//! Shepard, D. (1968). A two-dimensional interpolation function for
//! irregularly-spaced data. ACM National Conference.

use serde::{Deserialize, Serialize};
use zgrid_core::{Error, Result};

use super::breaklines::BreakIndex;
use super::kdtree::{by_distance, KdTree, Neighbor};
use super::vertex_source::VertexSet;

/// Upper bound of the distance coefficient
pub const MAX_POWER: f64 = 99.99;

/// Which samples are considered for a query point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Every visible sample (global IDW).
    ///
    /// Each query visits all n samples and sorts them, so a grid costs
    /// O(cells * n log n). Break lines add one bucketed visibility test
    /// per sample.
    #[default]
    All,
    /// The k nearest visible samples
    Nearest(usize),
    /// Visible samples within a radius
    Radius(f64),
    /// At most k nearest visible samples within a radius
    RadiusNearest { radius: f64, k: usize },
}

impl SearchStrategy {
    fn validate(&self) -> Result<()> {
        let check_k = |k: usize| {
            if k == 0 {
                return Err(Error::InvalidParameter {
                    name: "max_points",
                    value: k.to_string(),
                    reason: "must be at least 1".into(),
                });
            }
            Ok(())
        };
        let check_radius = |r: f64| {
            if !(r.is_finite() && r > 0.0) {
                return Err(Error::InvalidParameter {
                    name: "radius",
                    value: r.to_string(),
                    reason: "must be a positive number".into(),
                });
            }
            Ok(())
        };

        match *self {
            SearchStrategy::All => Ok(()),
            SearchStrategy::Nearest(k) => check_k(k),
            SearchStrategy::Radius(r) => check_radius(r),
            SearchStrategy::RadiusNearest { radius, k } => {
                check_radius(radius)?;
                check_k(k)
            }
        }
    }
}

/// Parameters for IDW estimation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IdwOptions {
    /// Distance coefficient (default: 2.0).
    /// Higher values give more weight to nearby samples; 0 gives the mean.
    pub power: f64,
    /// Candidate selection (default: all samples)
    pub search: SearchStrategy,
    /// A sample at most this far from the query point is returned as is.
    /// The default 0.0 only snaps exact coincidence.
    pub snap_distance: f64,
}

impl Default for IdwOptions {
    fn default() -> Self {
        Self {
            power: 2.0,
            search: SearchStrategy::All,
            snap_distance: 0.0,
        }
    }
}

impl IdwOptions {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=MAX_POWER).contains(&self.power) {
            return Err(Error::InvalidParameter {
                name: "distance_coefficient",
                value: self.power.to_string(),
                reason: format!("must be within [0, {}]", MAX_POWER),
            });
        }
        if !(self.snap_distance.is_finite() && self.snap_distance >= 0.0) {
            return Err(Error::InvalidParameter {
                name: "snap_distance",
                value: self.snap_distance.to_string(),
                reason: "must be a finite, non-negative number".into(),
            });
        }
        self.search.validate()
    }
}

/// IDW estimator over an indexed vertex set.
///
/// Immutable once built; `value_at` can be called from many threads.
#[derive(Debug, Clone)]
pub struct IdwInterpolator {
    vertices: VertexSet,
    tree: KdTree,
    breaks: BreakIndex,
    options: IdwOptions,
}

impl IdwInterpolator {
    /// Index `vertices` for querying. An empty set is allowed; every query
    /// then yields [`Error::NoData`].
    pub fn new(vertices: VertexSet, options: IdwOptions) -> Result<Self> {
        options.validate()?;

        let tree = KdTree::build(vertices.vertices());
        let breaks = BreakIndex::new(vertices.breaks());
        Ok(Self {
            vertices,
            tree,
            breaks,
            options,
        })
    }

    pub fn vertices(&self) -> &VertexSet {
        &self.vertices
    }

    pub fn options(&self) -> &IdwOptions {
        &self.options
    }

    /// Estimate Z at (x, y).
    ///
    /// # Algorithm
    ///
    /// ```text
    /// z(x,y) = Σ(wi * zi) / Σ(wi)
    /// where wi = (d_min / di)^p
    /// ```
    ///
    /// which is `1 / di^p` scaled by the constant `d_min^p`.
    ///
    /// Returns [`Error::NoData`] when no sample is a candidate.
    pub fn value_at(&self, x: f64, y: f64) -> Result<f64> {
        let candidates = self.candidates(x, y);
        let nearest = candidates
            .iter()
            .min_by(|a, b| by_distance(a, b))
            .ok_or(Error::NoData { x, y })?;

        let snap = self.options.snap_distance;
        if nearest.distance_sq <= snap * snap {
            return Ok(self.z(nearest.index));
        }

        let power = self.options.power;
        let d_min = nearest.distance();
        let mut sum_w = 0.0;
        let mut sum_wz = 0.0;

        for n in &candidates {
            let w = if power == 0.0 {
                1.0
            } else {
                (d_min / n.distance()).powf(power)
            };
            sum_w += w;
            sum_wz += w * self.z(n.index);
        }

        // The nearest candidate always has weight 1
        Ok(sum_wz / sum_w)
    }

    #[inline]
    fn z(&self, index: usize) -> f64 {
        self.vertices.vertices()[index].z
    }

    fn visible(&self, x: f64, y: f64, n: &Neighbor) -> bool {
        let v = &self.vertices.vertices()[n.index];
        !self.breaks.hides(x, y, v.x, v.y)
    }

    fn candidates(&self, x: f64, y: f64) -> Vec<Neighbor> {
        match self.options.search {
            SearchStrategy::All => self
                .tree
                .all(x, y)
                .into_iter()
                .filter(|n| self.visible(x, y, n))
                .collect(),
            SearchStrategy::Nearest(k) => self.nearest_visible(x, y, k),
            SearchStrategy::Radius(r) => self
                .tree
                .within_radius(x, y, r)
                .into_iter()
                .filter(|n| self.visible(x, y, n))
                .collect(),
            SearchStrategy::RadiusNearest { radius, k } => self
                .tree
                .within_radius(x, y, radius)
                .into_iter()
                .filter(|n| self.visible(x, y, n))
                .take(k)
                .collect(),
        }
    }

    /// k nearest samples that are not hidden, widening the query until
    /// enough are found or the index is exhausted.
    fn nearest_visible(&self, x: f64, y: f64, k: usize) -> Vec<Neighbor> {
        if self.breaks.is_empty() {
            return self.tree.k_nearest(x, y, k);
        }

        let mut fetch = k;
        loop {
            let found = self.tree.k_nearest(x, y, fetch);
            let exhausted = found.len() >= self.tree.len();
            let visible: Vec<Neighbor> = found
                .into_iter()
                .filter(|n| self.visible(x, y, n))
                .take(k)
                .collect();
            if visible.len() == k || exhausted {
                return visible;
            }
            fetch = fetch.saturating_mul(2);
        }
    }
}
