//! Result Ledger: every outcome of a run, grouped by category

use serde::Serialize;

use super::outcome::{Category, Outcome};

/// Outcomes of one category in execution order
#[derive(Debug, Clone, Serialize)]
pub struct CategoryRecord {
    pub category: Category,
    pub passed: usize,
    pub failed: usize,
    pub outcomes: Vec<Outcome>,
}

/// Pass/fail counts of one category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub category: Category,
    pub passed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub per_category: Vec<CategorySummary>,
    pub total_passed: usize,
    pub total_failed: usize,
}

/// Categories appear in the order they were first opened or recorded
#[derive(Debug, Default, Clone, Serialize)]
pub struct Ledger {
    categories: Vec<CategoryRecord>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure a category is listed, even if it ends up with no outcomes
    pub fn open(&mut self, category: Category) {
        self.entry(category);
    }

    /// Append an outcome to its category and update the counters
    pub fn record(&mut self, outcome: Outcome) {
        let record = self.entry(outcome.category);
        if outcome.passed {
            record.passed += 1;
        } else {
            record.failed += 1;
        }
        record.outcomes.push(outcome);
    }

    fn entry(&mut self, category: Category) -> &mut CategoryRecord {
        let index = match self.categories.iter().position(|r| r.category == category) {
            Some(i) => i,
            None => {
                self.categories.push(CategoryRecord {
                    category,
                    passed: 0,
                    failed: 0,
                    outcomes: Vec::new(),
                });
                self.categories.len() - 1
            }
        };
        &mut self.categories[index]
    }

    pub fn categories(&self) -> &[CategoryRecord] {
        &self.categories
    }

    pub fn outcomes(&self) -> impl Iterator<Item = &Outcome> {
        self.categories.iter().flat_map(|r| r.outcomes.iter())
    }

    pub fn summary(&self) -> Summary {
        let per_category: Vec<CategorySummary> = self
            .categories
            .iter()
            .map(|r| CategorySummary {
                category: r.category,
                passed: r.passed,
                failed: r.failed,
            })
            .collect();

        Summary {
            total_passed: per_category.iter().map(|c| c.passed).sum(),
            total_failed: per_category.iter().map(|c| c.failed).sum(),
            per_category,
        }
    }

    /// Number of recorded outcomes
    pub fn len(&self) -> usize {
        self.categories.iter().map(|r| r.outcomes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn all_passed(&self) -> bool {
        self.categories.iter().all(|r| r.failed == 0)
    }
}
