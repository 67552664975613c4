//! Euclidean distance helpers shared by the clustering engines and the
//! evaluation metrics.

/// Squared Euclidean distance between two equal-length vectors.
#[must_use]
pub fn squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Euclidean distance between two equal-length vectors.
#[must_use]
pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    squared_euclidean(a, b).sqrt()
}

/// Full symmetric `n x n` Euclidean distance matrix.
#[must_use]
pub fn pairwise_distances(data: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = data.len();
    let mut dist = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = euclidean(&data[i], &data[j]);
            dist[i][j] = d;
            dist[j][i] = d;
        }
    }
    dist
}

/// Upper-triangle distances in row-major pair order
/// `(0,1), (0,2), ..., (1,2), ...`.
#[must_use]
pub fn condensed_distances(data: &[Vec<f64>]) -> Vec<f64> {
    let n = data.len();
    let mut out = Vec::with_capacity(n * n.saturating_sub(1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            out.push(euclidean(&data[i], &data[j]));
        }
    }
    out
}

/// Component-wise mean of the rows at `members`. Returns `None` when
/// `members` is empty.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean_of(data: &[Vec<f64>], members: &[usize]) -> Option<Vec<f64>> {
    let first = members.first()?;
    let mut sum = vec![0.0; data[*first].len()];
    for &i in members {
        for (s, v) in sum.iter_mut().zip(&data[i]) {
            *s += v;
        }
    }
    let n = members.len() as f64;
    Some(sum.into_iter().map(|s| s / n).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_four_five() {
        assert!((euclidean(&[0.0, 0.0], &[3.0, 4.0]) - 5.0).abs() < 1e-12);
        assert!((squared_euclidean(&[0.0, 0.0], &[3.0, 4.0]) - 25.0).abs() < 1e-12);
    }

    #[test]
    fn condensed_order_matches_matrix() {
        let data = vec![vec![0.0], vec![1.0], vec![3.0]];
        let full = pairwise_distances(&data);
        let condensed = condensed_distances(&data);
        assert_eq!(condensed, vec![full[0][1], full[0][2], full[1][2]]);
        assert_eq!(condensed, vec![1.0, 3.0, 2.0]);
    }

    #[test]
    fn mean_of_members() {
        let data = vec![vec![0.0, 2.0], vec![4.0, 4.0], vec![100.0, 100.0]];
        assert_eq!(mean_of(&data, &[0, 1]), Some(vec![2.0, 3.0]));
        assert_eq!(mean_of(&data, &[]), None);
    }
}
