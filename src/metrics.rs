use std::sync::atomic::{AtomicU64, Ordering};

use crate::report::AnalysisBranch;

/// Thread-safe counters describing analysis activity.
#[derive(Default)]
pub struct AnalysisMetrics {
    reports_analyzed: AtomicU64,
    query_specific: AtomicU64,
    full_pipeline: AtomicU64,
    searches: AtomicU64,
}

impl AnalysisMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a persisted analysis and the branch that produced it.
    pub fn record_analysis(&self, branch: AnalysisBranch) {
        self.reports_analyzed.fetch_add(1, Ordering::Relaxed);
        let counter = match branch {
            AnalysisBranch::QuerySpecific => &self.query_specific,
            AnalysisBranch::FullPipeline => &self.full_pipeline,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a similarity search.
    pub fn record_search(&self) {
        self.searches.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            reports_analyzed: self.reports_analyzed.load(Ordering::Relaxed),
            query_specific: self.query_specific.load(Ordering::Relaxed),
            full_pipeline: self.full_pipeline.load(Ordering::Relaxed),
            searches: self.searches.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of analysis counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of reports analysed and persisted since startup.
    pub reports_analyzed: u64,
    /// Analyses answered by the query-specific branch.
    pub query_specific: u64,
    /// Analyses answered by the full report pipeline.
    pub full_pipeline: u64,
    /// Similarity searches served.
    pub searches: u64,
}
