//! Bottom-up hierarchical clustering.
//!
//! Every row starts as its own cluster; the closest pair under the chosen
//! [`Linkage`] is merged until one cluster remains. Inter-cluster distances
//! are maintained with the Lance–Williams recurrences over Euclidean
//! distances, so a merge costs `O(n)` and the full build `O(n³)`: fine for
//! the few hundred area-years this crate works with.
//!
//! The merge history is kept as a [`Dendrogram`] and can be cut either into
//! a fixed number of clusters or at a distance threshold.

use landslide_map_analytics_models::{ClusterAssignment, Linkage, Merge};

use crate::distance::pairwise_distances;
use crate::{AnalyticsError, validate_matrix};

/// Agglomerative clustering with a fixed linkage rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Agglomerative {
    linkage: Linkage,
}

/// Complete merge history of an agglomerative run.
#[derive(Debug, Clone, PartialEq)]
pub struct Dendrogram {
    n_leaves: usize,
    merges: Vec<Merge>,
}

impl Agglomerative {
    /// Clustering with `linkage`.
    #[must_use]
    pub const fn new(linkage: Linkage) -> Self {
        Self { linkage }
    }

    /// Linkage rule in use.
    #[must_use]
    pub const fn linkage(&self) -> Linkage {
        self.linkage
    }

    /// Builds the full dendrogram over `data`.
    ///
    /// Ties between equally close pairs go to the pair with the lowest
    /// `(i, j)` slot indices, which keeps the result deterministic.
    ///
    /// # Errors
    ///
    /// Returns any error from [`validate_matrix`].
    #[allow(clippy::cast_precision_loss, clippy::needless_range_loop)]
    pub fn dendrogram(&self, data: &[Vec<f64>]) -> Result<Dendrogram, AnalyticsError> {
        validate_matrix(data, 1)?;
        let n = data.len();
        let mut dist = pairwise_distances(data);
        let mut active = vec![true; n];
        let mut node = (0..n).collect::<Vec<_>>();
        let mut size = vec![1usize; n];
        let mut merges = Vec::with_capacity(n - 1);

        for step in 0..n - 1 {
            let mut best: Option<(usize, usize, f64)> = None;
            for i in 0..n {
                if !active[i] {
                    continue;
                }
                for j in (i + 1)..n {
                    if !active[j] {
                        continue;
                    }
                    if best.is_none_or(|(_, _, d)| dist[i][j] < d) {
                        best = Some((i, j, dist[i][j]));
                    }
                }
            }
            let Some((i, j, d_ij)) = best else {
                break;
            };

            let (ni, nj) = (size[i] as f64, size[j] as f64);
            for m in 0..n {
                if !active[m] || m == i || m == j {
                    continue;
                }
                let nm = size[m] as f64;
                let (d_im, d_jm) = (dist[i][m], dist[j][m]);
                let updated = match self.linkage {
                    Linkage::Single => d_im.min(d_jm),
                    Linkage::Complete => d_im.max(d_jm),
                    Linkage::Average => ni.mul_add(d_im, nj * d_jm) / (ni + nj),
                    Linkage::Ward => {
                        let num = (ni + nm).mul_add(
                            d_im * d_im,
                            (nj + nm).mul_add(d_jm * d_jm, -(nm * d_ij * d_ij)),
                        );
                        (num / (ni + nj + nm)).max(0.0).sqrt()
                    }
                };
                dist[i][m] = updated;
                dist[m][i] = updated;
            }

            merges.push(Merge {
                left: node[i].min(node[j]),
                right: node[i].max(node[j]),
                distance: d_ij,
                size: size[i] + size[j],
            });

            active[j] = false;
            size[i] += size[j];
            node[i] = n + step;
        }

        log::debug!(
            "Built {} dendrogram over {n} rows ({} merges)",
            self.linkage,
            merges.len()
        );

        Ok(Dendrogram {
            n_leaves: n,
            merges,
        })
    }

    /// Clusters `data` into exactly `k` groups.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::InvalidParameter`] if `k` is zero,
    /// [`AnalyticsError::InsufficientData`] if `data` has fewer than `k`
    /// rows, or any error from [`validate_matrix`].
    pub fn fit(&self, data: &[Vec<f64>], k: usize) -> Result<ClusterAssignment, AnalyticsError> {
        if k == 0 {
            return Err(AnalyticsError::InvalidParameter {
                name: "k",
                message: "must be at least 1".to_string(),
            });
        }
        validate_matrix(data, k)?;
        self.dendrogram(data)?.cut_into(k)
    }
}

impl Dendrogram {
    /// Rebuilds a dendrogram from a stored merge list.
    #[must_use]
    pub const fn from_merges(n_leaves: usize, merges: Vec<Merge>) -> Self {
        Self { n_leaves, merges }
    }

    /// Number of input rows.
    #[must_use]
    pub const fn n_leaves(&self) -> usize {
        self.n_leaves
    }

    /// Merges in the order they happened (the linkage matrix).
    #[must_use]
    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    /// Applies the first `n - k` merges and labels the resulting `k` groups
    /// densely in order of first appearance.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::InsufficientData`] if `k` exceeds the number
    /// of leaves, or [`AnalyticsError::InvalidParameter`] if `k` is zero.
    pub fn cut_into(&self, k: usize) -> Result<ClusterAssignment, AnalyticsError> {
        if k == 0 {
            return Err(AnalyticsError::InvalidParameter {
                name: "k",
                message: "must be at least 1".to_string(),
            });
        }
        if k > self.n_leaves {
            return Err(AnalyticsError::InsufficientData {
                requested: k,
                available: self.n_leaves,
            });
        }
        Ok(self.apply(self.n_leaves - k))
    }

    /// Applies every merge at or below `threshold`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::InvalidParameter`] if `threshold` is
    /// negative or not finite.
    pub fn cut_by_distance(&self, threshold: f64) -> Result<ClusterAssignment, AnalyticsError> {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(AnalyticsError::InvalidParameter {
                name: "distance_threshold",
                message: format!("must be a non-negative number, got {threshold}"),
            });
        }
        // Merge heights never decrease for these linkages.
        let count = self
            .merges
            .iter()
            .take_while(|m| m.distance <= threshold)
            .count();
        Ok(self.apply(count))
    }

    fn apply(&self, count: usize) -> ClusterAssignment {
        let n = self.n_leaves;
        let mut uf = UnionFind::new(n);
        // Any leaf under each node, so node ids resolve to union-find sets.
        let mut representative: Vec<usize> = (0..n).collect();
        for merge in &self.merges {
            representative.push(representative[merge.left]);
        }
        for merge in self.merges.iter().take(count) {
            uf.union(representative[merge.left], representative[merge.right]);
        }
        let roots: Vec<usize> = (0..n).map(|i| uf.find(i)).collect();
        ClusterAssignment::from_labels(&roots)
    }

    /// Cophenetic distance for every pair of rows, in condensed pair order
    /// (see [`crate::distance::condensed_distances`]).
    #[must_use]
    pub fn cophenetic_distances(&self) -> Vec<f64> {
        let n = self.n_leaves;
        let mut members: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();
        let mut coph = vec![vec![0.0; n]; n];

        for merge in &self.merges {
            for &a in &members[merge.left] {
                for &b in &members[merge.right] {
                    coph[a][b] = merge.distance;
                    coph[b][a] = merge.distance;
                }
            }
            let mut joined = members[merge.left].clone();
            joined.extend_from_slice(&members[merge.right]);
            members.push(joined);
        }

        let mut out = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                out.push(coph[i][j]);
            }
        }
        out
    }
}

#[derive(Clone, Debug)]
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            let root = self.find(self.parent[x]);
            self.parent[x] = root;
        }
        self.parent[x]
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            // Smaller root wins so labels depend only on the merge order.
            let (keep, drop) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[drop] = keep;
        }
    }
}
