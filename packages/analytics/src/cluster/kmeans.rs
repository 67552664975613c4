//! Lloyd's K-Means with seeded k-means++ initialisation.
//!
//! Iteration stops as soon as an assignment step changes no labels, or after
//! `max_iter` rounds. A cluster that loses all its members is re-seeded with
//! the point farthest from its own centroid, taken from a cluster that can
//! spare it, so the returned labels cover every id whenever the data has at
//! least `k` distinct points.

use rand::SeedableRng as _;
use rand::distributions::{Distribution as _, WeightedIndex};
use rand::rngs::StdRng;
use rand::Rng as _;

use crate::distance::{mean_of, squared_euclidean};
use crate::{AnalyticsError, validate_matrix};

/// Iteration cap used when none is given.
pub const DEFAULT_MAX_ITER: usize = 300;

/// K-Means parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KMeans {
    k: usize,
    seed: u64,
    max_iter: usize,
}

/// Result of a K-Means fit.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    /// Final centroids, indexed by cluster id.
    pub centroids: Vec<Vec<f64>>,
    /// Cluster id per input row.
    pub labels: Vec<usize>,
    /// Sum of squared distances from each row to its centroid.
    pub inertia: f64,
    /// Assignment rounds executed.
    pub iterations: usize,
}

impl KMeans {
    /// K-Means with `k` clusters, seed 0, and [`DEFAULT_MAX_ITER`].
    #[must_use]
    pub const fn new(k: usize) -> Self {
        Self {
            k,
            seed: 0,
            max_iter: DEFAULT_MAX_ITER,
        }
    }

    /// Sets the initialisation seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the iteration cap.
    #[must_use]
    pub const fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Requested cluster count.
    #[must_use]
    pub const fn k(&self) -> usize {
        self.k
    }

    fn validate(&self, data: &[Vec<f64>]) -> Result<(), AnalyticsError> {
        if self.k == 0 {
            return Err(AnalyticsError::InvalidParameter {
                name: "k",
                message: "must be at least 1".to_string(),
            });
        }
        if self.max_iter == 0 {
            return Err(AnalyticsError::InvalidParameter {
                name: "max_iter",
                message: "must be at least 1".to_string(),
            });
        }
        validate_matrix(data, self.k)?;
        Ok(())
    }

    /// Fits `data` from a k-means++ initialisation drawn with the configured
    /// seed.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::InvalidParameter`] if `k` is zero,
    /// [`AnalyticsError::InsufficientData`] if `data` has fewer than `k`
    /// rows, or any error from [`validate_matrix`].
    pub fn fit(&self, data: &[Vec<f64>]) -> Result<KMeansFit, AnalyticsError> {
        self.validate(data)?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let centroids = kmeans_plus_plus(data, self.k, &mut rng);
        Ok(self.lloyd(data, centroids))
    }

    /// Fits `data` starting from the given centroids instead of a random
    /// initialisation. The number of centroids overrides `k`.
    ///
    /// # Errors
    ///
    /// As [`Self::fit`], plus [`AnalyticsError::DimensionMismatch`] if a
    /// centroid's length differs from the data's.
    pub fn fit_from(
        &self,
        data: &[Vec<f64>],
        centroids: Vec<Vec<f64>>,
    ) -> Result<KMeansFit, AnalyticsError> {
        let with_k = Self {
            k: centroids.len(),
            ..*self
        };
        with_k.validate(data)?;
        let dim = data[0].len();
        if let Some(c) = centroids.iter().find(|c| c.len() != dim) {
            return Err(AnalyticsError::DimensionMismatch {
                expected: dim,
                found: c.len(),
            });
        }
        Ok(with_k.lloyd(data, centroids))
    }

    fn lloyd(&self, data: &[Vec<f64>], mut centroids: Vec<Vec<f64>>) -> KMeansFit {
        let mut labels = vec![0; data.len()];
        let mut iterations = 0;

        for iter in 0..self.max_iter {
            iterations = iter + 1;
            let changed = assign_nearest(data, &centroids, &mut labels);
            let relocated = relocate_empty_clusters(data, &mut centroids, &mut labels);
            if iter > 0 && !changed && !relocated {
                break;
            }
            update_centroids(data, &labels, &mut centroids);
        }

        let inertia = inertia(data, &centroids, &labels);
        log::trace!(
            "k-means k={} converged after {iterations} iteration(s), inertia {inertia:.4}",
            centroids.len()
        );

        KMeansFit {
            centroids,
            labels,
            inertia,
            iterations,
        }
    }
}

/// k-means++ seeding: the first centroid is uniform, each subsequent one is
/// drawn with probability proportional to its squared distance from the
/// nearest centroid chosen so far.
fn kmeans_plus_plus(data: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let n = data.len();
    let mut centroids = Vec::with_capacity(k);
    centroids.push(data[rng.gen_range(0..n)].clone());

    let mut closest: Vec<f64> = data
        .iter()
        .map(|p| squared_euclidean(p, &centroids[0]))
        .collect();

    while centroids.len() < k {
        // All weights are zero once every distinct point is a centroid.
        let next = match WeightedIndex::<f64>::new(&closest) {
            Ok(dist) => dist.sample(rng),
            Err(_) => rng.gen_range(0..n),
        };
        let chosen = data[next].clone();
        for (d, p) in closest.iter_mut().zip(data) {
            *d = d.min(squared_euclidean(p, &chosen));
        }
        centroids.push(chosen);
    }

    centroids
}

/// Assigns each row to its nearest centroid. A row tied between its current
/// centroid and another stays put; other ties go to the lowest id. Returns
/// whether any label changed.
fn assign_nearest(data: &[Vec<f64>], centroids: &[Vec<f64>], labels: &mut [usize]) -> bool {
    let mut changed = false;
    for (point, label) in data.iter().zip(labels.iter_mut()) {
        let (best, best_dist) = nearest(point, centroids);
        if best != *label && squared_euclidean(point, &centroids[*label]) > best_dist {
            *label = best;
            changed = true;
        }
    }
    changed
}

fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (c, centroid) in centroids.iter().enumerate() {
        let d = squared_euclidean(point, centroid);
        if d < best_dist {
            best_dist = d;
            best = c;
        }
    }
    (best, best_dist)
}

/// Moves one point into each empty cluster. The point chosen is the one
/// farthest from its current centroid among clusters with more than one
/// member. Returns whether anything moved.
fn relocate_empty_clusters(
    data: &[Vec<f64>],
    centroids: &mut [Vec<f64>],
    labels: &mut [usize],
) -> bool {
    let mut sizes = vec![0usize; centroids.len()];
    for &label in labels.iter() {
        sizes[label] += 1;
    }

    let mut relocated = false;
    for empty in 0..centroids.len() {
        if sizes[empty] > 0 {
            continue;
        }
        let candidate = (0..data.len())
            .filter(|&i| sizes[labels[i]] > 1)
            .map(|i| (i, squared_euclidean(&data[i], &centroids[labels[i]])))
            .fold(None::<(usize, f64)>, |best, (i, d)| match best {
                Some((_, bd)) if bd >= d => best,
                _ => Some((i, d)),
            });

        let Some((i, _)) = candidate else {
            break;
        };
        log::debug!("Re-seeding empty cluster {empty} with row {i}");
        sizes[labels[i]] -= 1;
        sizes[empty] = 1;
        labels[i] = empty;
        centroids[empty].clone_from(&data[i]);
        relocated = true;
    }
    relocated
}

/// Sets each centroid to the mean of its members. Empty clusters keep their
/// previous position.
fn update_centroids(data: &[Vec<f64>], labels: &[usize], centroids: &mut [Vec<f64>]) {
    let mut members: Vec<Vec<usize>> = vec![Vec::new(); centroids.len()];
    for (i, &label) in labels.iter().enumerate() {
        members[label].push(i);
    }
    for (centroid, members) in centroids.iter_mut().zip(&members) {
        if let Some(mean) = mean_of(data, members) {
            *centroid = mean;
        }
    }
}

fn inertia(data: &[Vec<f64>], centroids: &[Vec<f64>], labels: &[usize]) -> f64 {
    data.iter()
        .zip(labels)
        .map(|(p, &l)| squared_euclidean(p, &centroids[l]))
        .sum()
}
