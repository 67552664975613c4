//! Progress reporting for cluster-count sweeps.
//!
//! Evaluation sweeps (elbow and silhouette curves, linkage comparisons) run
//! one clustering per candidate `k`. [`ProgressCallback`] lets them report
//! each step without knowing whether the caller renders a bar, logs, or
//! stays silent. Every method defaults to a no-op.

use std::sync::Arc;

/// Receives sweep lifecycle events. A callback may see several sweeps in a
/// row; each starts with [`begin`](Self::begin).
pub trait ProgressCallback: Send + Sync {
    /// A sweep named `label` is about to evaluate `steps` cluster counts.
    fn begin(&self, label: &str, steps: u64) {
        let _ = (label, steps);
    }

    /// Cluster count `k` of the current sweep is done.
    fn advance(&self, k: usize) {
        let _ = k;
    }

    /// The current sweep is over.
    fn end(&self, summary: &str) {
        let _ = summary;
    }
}

/// Discards every event.
pub struct NullProgress;

impl ProgressCallback for NullProgress {}

/// Returns a [`NullProgress`] behind the `Arc` the sweeps take, for callers
/// that do not render progress.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_progress_accepts_a_full_sweep() {
        let progress = null_progress();
        progress.begin("elbow", 3);
        for k in 1..=3 {
            progress.advance(k);
        }
        progress.end("elbow: 3 fits");
    }
}
