// Run report: per-category tallies accumulated over one run.
// Skipped-as-already-recorded and item-scoped errors are tracked apart
// from processed so idempotent re-runs are visible in the totals.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::{Category, JobId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    pub processed: u64,
    pub skipped: u64,
    pub errors: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub job_id: JobId,
    pub categories: BTreeMap<Category, CategoryCounts>,
}

impl RunReport {
    pub fn new(job_id: impl Into<JobId>) -> Self {
        Self {
            job_id: job_id.into(),
            categories: BTreeMap::new(),
        }
    }

    pub(crate) fn counts_mut(&mut self, category: Category) -> &mut CategoryCounts {
        self.categories.entry(category).or_default()
    }

    pub fn counts(&self, category: Category) -> CategoryCounts {
        self.categories.get(&category).copied().unwrap_or_default()
    }

    pub fn total_processed(&self) -> u64 {
        self.categories.values().map(|c| c.processed).sum()
    }

    pub fn total_skipped(&self) -> u64 {
        self.categories.values().map(|c| c.skipped).sum()
    }

    pub fn total_errors(&self) -> u64 {
        self.categories.values().map(|c| c.errors).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_sum_across_categories() {
        let mut report = RunReport::new("job-1");
        report.counts_mut(Category::Followers).processed = 10;
        report.counts_mut(Category::Followers).errors = 1;
        report.counts_mut(Category::Following).processed = 4;
        report.counts_mut(Category::Following).skipped = 2;

        assert_eq!(report.total_processed(), 14);
        assert_eq!(report.total_skipped(), 2);
        assert_eq!(report.total_errors(), 1);
    }

    #[test]
    fn test_unseen_category_counts_are_zero() {
        let report = RunReport::new("job-1");
        assert_eq!(report.counts(Category::Suggested), CategoryCounts::default());
    }
}
